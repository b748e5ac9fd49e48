//! Two-stage personal trainer on top of a local inference server.
//!
//! Three posture photographs go to a vision model, which describes the
//! physique's weak points. That assessment and the athlete's workout plan go
//! to a text model, which adds exercises for the weak points to the plan.
//!
//! Both models are reached through the [`InferenceModel`] trait; [`OllamaModel`]
//! implements it for an Ollama-compatible server.
//!
//! AI-generated training advice can be wrong. Consult a doctor before starting
//! any exercise program.

pub mod assessment;
pub mod error;
pub mod model;
pub mod ollama;
pub mod photo;
pub mod pipeline;
pub mod plan;
pub mod progression;
pub mod survey;

pub use assessment::{AssessmentMode, VisionAssessment, assess_physique};
pub use error::TrainerError;
pub use model::{InferenceModel, ModelRequest, ModelResponse};
pub use ollama::{OllamaConfig, OllamaError, OllamaModel};
pub use photo::{ImageRole, ImageSize, ImageTriplet, MAX_IMAGE_DIMENSION, PostureImage};
pub use pipeline::{StageReport, Trainer, TrainerOptions, TrainerOutcome, TrainerStage};
pub use plan::{WorkoutPlan, augment_plan};
pub use progression::ProgressionGroup;
pub use survey::SurveyOptions;
