//! Generative API integration
//!
//! The proxy talks to Gemini's `generateContent` endpoint through the
//! [`GenerativeService`] trait so handlers can be exercised against a scripted
//! mock.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::GeminiHttpClient;
pub use mock::MockGenerativeClient;

use crate::ai::gemini::types::{GenerateContentRequest, GenerateContentResponse};
use crate::error::UpstreamError;
use async_trait::async_trait;

#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Performs exactly one upstream call.
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, UpstreamError>;
}
