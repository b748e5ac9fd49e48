use crate::{
    error::TrainerError,
    model::{InferenceModel, ModelRequest, invoke},
    photo::ImageTriplet,
    survey::{self, SurveyOptions},
};
use std::fmt;

/// Prompt for the single-call assessment; images follow in front, side, back order.
pub const ASSESSMENT_PROMPT: &str = "The three photos show the same person from the front, \
the side and the back, in that order. Analyze the physique and posture of the person and \
summarize the visible weaknesses in musculature and posture, naming the areas that lag \
behind the rest of the body.";

/// Free-text description of the weaknesses seen in the photographs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisionAssessment(String);

impl VisionAssessment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
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
}

impl From<String> for VisionAssessment {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for VisionAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the vision stage examines the photographs.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AssessmentMode {
    /// One request carrying all three images.
    #[default]
    Summary,
    /// Region-by-region ratings merged into a lagging-areas summary.
    Survey(SurveyOptions),
}

/// Sends all three photographs to the vision model in a single request.
pub fn assess_physique<M: InferenceModel>(
    model: &mut M,
    images: &ImageTriplet,
) -> Result<VisionAssessment, TrainerError> {
    let request = ModelRequest::with_images(ASSESSMENT_PROMPT, images.encoded());
    let text = invoke(model, request)?;

    Ok(VisionAssessment(text))
}

/// Runs the vision stage in the requested mode.
pub fn assess<M: InferenceModel>(
    model: &mut M,
    images: &ImageTriplet,
    mode: &AssessmentMode,
) -> Result<VisionAssessment, TrainerError> {
    match mode {
        AssessmentMode::Summary => assess_physique(model, images),
        AssessmentMode::Survey(options) => {
            let survey = survey::survey_physique(model, images, options)?;
            for rating in &survey.ratings {
                log::info!("{}: {}", rating.region, rating.summary);
            }
            Ok(survey.assessment)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::{fixed, refused};
    use crate::photo::testing::triplet;

    #[test]
    fn summary_sends_one_request_with_three_images() -> Result<(), TrainerError> {
        let mut model = fixed("llava", "weak posterior chain");
        let images = triplet();

        let assessment = assess(&mut model, &images, &AssessmentMode::Summary)?;

        assert_eq!(assessment.as_str(), "weak posterior chain");
        assert_eq!(model.calls.len(), 1);
        assert_eq!(model.calls[0].images, images.encoded());
        assert_eq!(model.calls[0].prompt, ASSESSMENT_PROMPT);
        Ok(())
    }

    #[test]
    fn unreachable_model_fails_the_stage() {
        let mut model = refused("llava");
        let err = assess_physique(&mut model, &triplet()).unwrap_err();
        assert!(matches!(err, TrainerError::ModelUnavailable { .. }));
    }

    #[test]
    fn blank_assessment_detection() {
        assert!(VisionAssessment::new("  \n").is_blank());
        assert!(!VisionAssessment::new("weak calves").is_blank());
    }
}
