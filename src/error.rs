use crate::photo::ImageRole;
use std::path::PathBuf;

/// Errors that terminate a trainer run.
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    /// An input image is missing, unreadable or too large.
    #[error("invalid {role} image {}: {reason}", path.display())]
    InvalidImage {
        role: ImageRole,
        path: PathBuf,
        reason: String,
    },

    /// The workout plan or the assessment is blank or unreadable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The inference server could not be reached or rejected the request.
    #[error("model `{model}` unavailable: {source}")]
    ModelUnavailable {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// The model answered with blank text where text was required.
    #[error("model `{model}` returned an empty response")]
    EmptyResponse { model: String },

    #[error("failed to write output to {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
