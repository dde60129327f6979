mod tensorzero;

use std::future::Future;

pub use tensorzero::{LlmClient, LlmConfig, LlmError, LlmMessage, LlmResponse, LlmUsage};

/// Text generation backend: a structured prompt in, raw text out.
///
/// The text is expected, not guaranteed, to be a JSON object; callers own
/// parsing and must tolerate anything.
pub trait Generator: Send + Sync {
    fn generate(
        &self,
        system_message: &str,
        user_message: &str,
        model_hint: Option<&str>,
    ) -> impl Future<Output = Result<LlmResponse, LlmError>> + Send;
}
