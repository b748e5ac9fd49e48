use crate::error::TrainerError;
use std::time::Instant;

/// A single prompt sent to a model, optionally carrying base64-encoded images.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelRequest {
    pub prompt: String,
    pub images: Vec<String>,
}

impl ModelRequest {
    /// Creates a text-only request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }

    /// Creates a request that carries the given encoded images.
    pub fn with_images(prompt: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelResponse {
    pub response: String,
}

/// Trait for the models the trainer talks to.
///
/// The local inference server is one implementation; tests and other
/// backends implement it to plug into the pipeline without the network.
pub trait InferenceModel {
    /// The error type that can be returned during inference.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The model identifier, used in logs and errors.
    fn name(&self) -> &str;

    /// Runs inference on the given request and returns a response or error.
    fn run(&mut self, request: ModelRequest) -> Result<ModelResponse, Self::Error>;
}

/// Runs one request and maps backend failures to [`TrainerError::ModelUnavailable`].
pub(crate) fn invoke<M: InferenceModel>(
    model: &mut M,
    request: ModelRequest,
) -> Result<String, TrainerError> {
    log::debug!(
        "Invoking {} with {} image(s), prompt of {} chars",
        model.name(),
        request.images.len(),
        request.prompt.len()
    );

    let start_time = Instant::now();
    let response = model
        .run(request)
        .map_err(|e| TrainerError::ModelUnavailable {
            model: model.name().to_string(),
            source: Box::new(e),
        })?;

    log::debug!("{} answered in {:?}", model.name(), start_time.elapsed());

    Ok(response.response)
}
