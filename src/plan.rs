use crate::{
    assessment::VisionAssessment,
    error::TrainerError,
    model::{InferenceModel, ModelRequest, invoke},
};
use std::{fmt, path::Path};

/// Heading placed before the model's exercises when they are appended to the plan.
pub const ADDITIONS_HEADING: &str = "Additional exercises:";

/// The athlete's workout plan as free text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkoutPlan(String);

impl WorkoutPlan {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Reads a plan from a text file, rejecting blank files.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TrainerError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            TrainerError::InvalidInput(format!(
                "failed to read workout plan {}: {e}",
                path.display()
            ))
        })?;

        let plan = Self(text);
        if plan.is_blank() {
            return Err(TrainerError::InvalidInput(format!(
                "workout plan {} is empty",
                path.display()
            )));
        }
        Ok(plan)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Whether `other` reproduces this plan's text.
    pub(crate) fn is_kept_by(&self, other: &str) -> bool {
        other.contains(self.0.trim())
    }
}

impl From<String> for WorkoutPlan {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for WorkoutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prompt asking the text model to extend `plan` for the weaknesses in `assessment`.
pub fn augmentation_prompt(assessment: &VisionAssessment, plan: &WorkoutPlan) -> String {
    format!(
        "An athlete follows the workout plan below. An assessment of their physique found the \
lagging areas listed after it. Generate a set of additional exercises that address the lagging \
areas and add them to the plan. Keep every existing exercise and keep the structure of the \
original plan; the additions must not contradict the reasoning behind it. Return the complete \
updated plan.\n\nExisting plan:\n\n{}\n\nAssessment:\n\n{}",
        plan.as_str().trim(),
        assessment.as_str().trim()
    )
}

/// Makes sure the original plan survives in the result.
///
/// A reply that already contains the original plan is taken as the updated plan;
/// any other reply is appended to the original under [`ADDITIONS_HEADING`].
pub fn merge_additions(original: &WorkoutPlan, reply: &str) -> WorkoutPlan {
    if original.is_kept_by(reply) {
        return WorkoutPlan(reply.to_string());
    }

    WorkoutPlan(format!(
        "{}\n\n{ADDITIONS_HEADING}\n\n{}\n",
        original.as_str().trim_end(),
        reply.trim()
    ))
}

/// The text `augmented` adds to `original`, without the [`ADDITIONS_HEADING`].
///
/// When `augmented` no longer contains the original plan, all of it is treated
/// as additions.
pub fn additions(original: &WorkoutPlan, augmented: &WorkoutPlan) -> String {
    let kept = original.as_str().trim();
    let rest = if !kept.is_empty() && original.is_kept_by(augmented.as_str()) {
        augmented.as_str().replacen(kept, "", 1)
    } else {
        augmented.as_str().to_string()
    };

    let rest = rest.trim();
    rest.strip_prefix(ADDITIONS_HEADING)
        .unwrap_or(rest)
        .trim()
        .to_string()
}

/// Asks the text model for exercises targeting the assessed weaknesses.
pub fn augment_plan<M: InferenceModel>(
    model: &mut M,
    assessment: &VisionAssessment,
    plan: &WorkoutPlan,
) -> Result<WorkoutPlan, TrainerError> {
    if assessment.is_blank() {
        return Err(TrainerError::InvalidInput(
            "vision assessment is empty".to_string(),
        ));
    }
    if plan.is_blank() {
        return Err(TrainerError::InvalidInput("workout plan is empty".to_string()));
    }

    let reply = invoke(model, ModelRequest::text(augmentation_prompt(assessment, plan)))?;
    if reply.trim().is_empty() {
        return Err(TrainerError::EmptyResponse {
            model: model.name().to_string(),
        });
    }

    Ok(merge_additions(plan, &reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::{echo, fixed};

    const PLAN: &str = "Monday: squats 5x5\nThursday: bench press 5x5\n";

    #[test]
    fn blank_inputs_are_rejected_without_a_call() {
        let mut model = echo("gpt-oss:20b");

        let err = augment_plan(
            &mut model,
            &VisionAssessment::new(" "),
            &WorkoutPlan::new(PLAN),
        )
        .unwrap_err();
        assert!(matches!(err, TrainerError::InvalidInput(_)));

        let err = augment_plan(
            &mut model,
            &VisionAssessment::new("weak calves"),
            &WorkoutPlan::new(""),
        )
        .unwrap_err();
        assert!(matches!(err, TrainerError::InvalidInput(_)));

        assert!(model.calls.is_empty());
    }

    #[test]
    fn echoed_prompt_keeps_plan_and_assessment() -> Result<(), TrainerError> {
        let mut model = echo("gpt-oss:20b");
        let assessment = VisionAssessment::new("weak posterior chain");

        let updated = augment_plan(&mut model, &assessment, &WorkoutPlan::new(PLAN))?;

        assert_eq!(model.calls.len(), 1);
        assert!(model.calls[0].images.is_empty());
        assert!(updated.as_str().contains(PLAN.trim()));
        assert!(updated.as_str().contains("posterior chain"));
        Ok(())
    }

    #[test]
    fn reply_without_plan_is_appended() -> Result<(), TrainerError> {
        let mut model = fixed("gpt-oss:20b", "Saturday: Romanian deadlifts 3x8");

        let updated = augment_plan(
            &mut model,
            &VisionAssessment::new("weak hamstrings"),
            &WorkoutPlan::new(PLAN),
        )?;

        assert_eq!(
            updated.as_str(),
            "Monday: squats 5x5\nThursday: bench press 5x5\n\nAdditional exercises:\n\nSaturday: Romanian deadlifts 3x8\n"
        );
        Ok(())
    }

    #[test]
    fn additions_leave_out_the_original_plan() {
        let original = WorkoutPlan::new(PLAN);

        let appended = merge_additions(&original, "Saturday: calf raises 4x15");
        assert_eq!(additions(&original, &appended), "Saturday: calf raises 4x15");

        let rewritten = WorkoutPlan::new(format!("{PLAN}Saturday: calf raises 4x15\n"));
        assert_eq!(additions(&original, &rewritten), "Saturday: calf raises 4x15");

        let replaced = WorkoutPlan::new("Saturday: calf raises 4x15");
        assert_eq!(additions(&original, &replaced), "Saturday: calf raises 4x15");
    }

    #[test]
    fn blank_reply_is_an_error() {
        let mut model = fixed("gpt-oss:20b", "\n");
        let err = augment_plan(
            &mut model,
            &VisionAssessment::new("weak calves"),
            &WorkoutPlan::new(PLAN),
        )
        .unwrap_err();
        assert!(matches!(err, TrainerError::EmptyResponse { .. }));
    }

    #[test]
    fn missing_plan_file_is_invalid_input() {
        let err = WorkoutPlan::from_path("/nonexistent/plan.txt").unwrap_err();
        assert!(matches!(err, TrainerError::InvalidInput(_)));
    }
}
