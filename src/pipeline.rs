use crate::{
    assessment::{self, AssessmentMode, VisionAssessment},
    error::TrainerError,
    model::InferenceModel,
    photo::ImageTriplet,
    plan::{self, WorkoutPlan},
    progression::{self, ProgressionGroup},
};
use std::{
    path::Path,
    time::{Duration, Instant},
};

/// The steps of a trainer run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrainerStage {
    VisionAssessment,
    PlanAugmentation,
    ProgressionCheck,
}

impl TrainerStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainerStage::VisionAssessment => "vision assessment",
            TrainerStage::PlanAugmentation => "plan augmentation",
            TrainerStage::ProgressionCheck => "progression check",
        }
    }
}

/// Timing of one completed stage.
#[derive(Clone, Debug)]
pub struct StageReport {
    pub stage: TrainerStage,
    /// Timestamp when the stage started.
    pub start_time: Instant,
    /// Total time taken by the stage.
    pub duration: Duration,
}

/// Everything a successful run produced.
#[derive(Clone, Debug)]
pub struct TrainerOutcome {
    pub assessment: VisionAssessment,
    pub plan: WorkoutPlan,
    pub stages: Vec<StageReport>,
}

#[derive(Clone, Debug, Default)]
pub struct TrainerOptions {
    pub mode: AssessmentMode,
    /// Progressions checked after augmentation; empty skips the check.
    pub progressions: Vec<ProgressionGroup>,
}

/// Runs the vision model and the text model one after the other.
///
/// The vision model also answers the survey's merge prompts and the
/// progression check's yes/no questions.
pub struct Trainer<V, T> {
    vision: V,
    text: T,
    options: TrainerOptions,
}

impl<V: InferenceModel, T: InferenceModel> Trainer<V, T> {
    pub fn new(vision: V, text: T) -> Self {
        Self {
            vision,
            text,
            options: TrainerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TrainerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn vision(&self) -> &V {
        &self.vision
    }

    pub fn text(&self) -> &T {
        &self.text
    }

    /// Loads the photographs from `image_dir` and the plan from `plan_path`, then runs.
    ///
    /// All inputs are validated before the first model call.
    pub fn run_from_files(
        &mut self,
        image_dir: impl AsRef<Path>,
        plan_path: impl AsRef<Path>,
    ) -> Result<TrainerOutcome, TrainerError> {
        let images = ImageTriplet::load(image_dir)?;
        let plan = WorkoutPlan::from_path(plan_path)?;
        self.run(&images, &plan)
    }

    pub fn run(
        &mut self,
        images: &ImageTriplet,
        plan: &WorkoutPlan,
    ) -> Result<TrainerOutcome, TrainerError> {
        if plan.is_blank() {
            return Err(TrainerError::InvalidInput("workout plan is empty".to_string()));
        }

        let mut stages = Vec::with_capacity(3);

        let (assessment, report) = timed(TrainerStage::VisionAssessment, || {
            assessment::assess(&mut self.vision, images, &self.options.mode)
        })?;
        stages.push(report);

        let (augmented, report) = timed(TrainerStage::PlanAugmentation, || {
            plan::augment_plan(&mut self.text, &assessment, plan)
        })?;
        stages.push(report);

        let plan = if self.options.progressions.is_empty() {
            augmented
        } else {
            let (checked, report) = timed(TrainerStage::ProgressionCheck, || {
                progression::advance_progressions(
                    &mut self.vision,
                    &mut self.text,
                    plan,
                    augmented,
                    &self.options.progressions,
                )
            })?;
            stages.push(report);
            checked
        };

        Ok(TrainerOutcome {
            assessment,
            plan,
            stages,
        })
    }
}

fn timed<R>(
    stage: TrainerStage,
    f: impl FnOnce() -> Result<R, TrainerError>,
) -> Result<(R, StageReport), TrainerError> {
    log::info!("Starting {}", stage.as_str());
    let start_time = Instant::now();

    let result = f()?;

    let report = StageReport {
        stage,
        start_time,
        duration: start_time.elapsed(),
    };
    log::info!("Finished {} in {:?}", stage.as_str(), report.duration);

    Ok((result, report))
}
