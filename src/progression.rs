//! Progression check for the augmented plan.
//!
//! Exercises from the listed progressions should not come back as additions;
//! when the additions contain one, they are rewritten towards harder
//! variations of the same progression.

use crate::{
    error::TrainerError,
    model::{InferenceModel, ModelRequest, invoke},
    plan::{WorkoutPlan, additions, merge_additions},
};

const AFFIRMATIVES: [&str; 4] = ["Yes", "yes", "affirmative", "Affirmative"];

/// Related exercises along one calisthenic progression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressionGroup {
    pub exercises: Vec<String>,
}

impl ProgressionGroup {
    pub fn new<I, S>(exercises: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exercises: exercises.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a comma-separated list, skipping empty entries.
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|exercise| !exercise.is_empty()),
        )
    }
}

/// Leg-raise, push-up and pull-up progressions.
pub fn default_groups() -> Vec<ProgressionGroup> {
    vec![
        ProgressionGroup::new(["Hanging Leg Lifts", "Hanging Toes-To-Bar Leg Lifts"]),
        ProgressionGroup::new(["Standard Push-Ups", "One-Arm Push-Ups"]),
        ProgressionGroup::new(["Pull-Ups", "Chin-Ups", "Assisted One-Arm Pull-Ups"]),
    ]
}

pub fn presence_prompt(exercise: &str, workout: &str) -> String {
    format!(
        "Is the following exercise already in the workout below: {exercise}?  Please answer yes or \
no.\n\n{workout}"
    )
}

pub fn is_affirmative(answer: &str) -> bool {
    AFFIRMATIVES.iter().any(|word| answer.contains(word))
}

/// Collects the exercises of every group that appears in `workout`.
///
/// A single affirmative answer marks the whole group. The result keeps the
/// order groups and exercises were given in, without duplicates.
pub fn performed_exercises<M: InferenceModel>(
    model: &mut M,
    workout: &str,
    groups: &[ProgressionGroup],
) -> Result<Vec<String>, TrainerError> {
    let mut performed: Vec<String> = Vec::new();

    for group in groups {
        let mut found = false;
        for exercise in &group.exercises {
            let answer = invoke(model, ModelRequest::text(presence_prompt(exercise, workout)))?;
            log::debug!("{exercise} in the additions? {}", answer.trim());
            found = found || is_affirmative(&answer);
        }

        if found {
            for exercise in &group.exercises {
                if !performed.contains(exercise) {
                    performed.push(exercise.clone());
                }
            }
        }
    }

    Ok(performed)
}

pub fn rewrite_prompt(performed: &[String], workout: &str) -> String {
    format!(
        "The athlete is already doing the following exercises: {}.  Rewrite the workout below so \
that it doesn't contain any of the aforementioned exercises.  When an exercise is removed, \
replace it with a more intense exercise in the same category that will challenge the athlete.  \
When an exercise is removed, try to replace it with a more advanced exercise in a similar \
progression.  For instance, if hanging leg raises are to be removed then some potential \
replacements might be ice-cream makers or some other exercise starting a calisthenic \
progression to a front lever.  Replace exercises in the following workout:\n\n{workout}",
        performed.join(", ")
    )
}

/// Rewrites the additions in `augmented` that come from one of `groups`.
///
/// Only the text added to `original` is checked and rewritten; the original
/// plan is kept as is. `checker` answers the yes/no questions, `writer`
/// performs the rewrite. Returns `augmented` untouched when no group exercise
/// was added.
pub fn advance_progressions<C, W>(
    checker: &mut C,
    writer: &mut W,
    original: &WorkoutPlan,
    augmented: WorkoutPlan,
    groups: &[ProgressionGroup],
) -> Result<WorkoutPlan, TrainerError>
where
    C: InferenceModel,
    W: InferenceModel,
{
    let added = additions(original, &augmented);
    if added.is_empty() {
        log::info!("Nothing was added to the plan, skipping the progression check");
        return Ok(augmented);
    }

    let performed = performed_exercises(checker, &added, groups)?;
    if performed.is_empty() {
        log::info!("No progression exercise was added, plan unchanged");
        return Ok(augmented);
    }

    log::info!("Advancing past: {}", performed.join(", "));

    let reply = invoke(writer, ModelRequest::text(rewrite_prompt(&performed, &added)))?;
    if reply.trim().is_empty() {
        return Err(TrainerError::EmptyResponse {
            model: writer.name().to_string(),
        });
    }

    Ok(merge_additions(original, &reply))
}
