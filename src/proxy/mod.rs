//! Proxy request handling
//!
//! [`ProxyHandler`] owns the framework-independent request pipeline shared by
//! both operations:
//!
//! 1. Parse the JSON body (500 on failure)
//! 2. Check the API key is configured (500 when absent)
//! 3. Validate required fields (400)
//! 4. Build the upstream payload
//! 5. Call the upstream through the [`RetryingCaller`]
//! 6. Map the outcome to an artifact or a [`ProxyError`]

pub mod error;
pub mod request;

pub use error::ProxyError;
pub use request::{ComposeBody, ComposeRequest, SuggestionBody};

use crate::ai::gemini::{chat, image};
use crate::ai::GenerativeService;
use crate::models::{Config, ImageArtifact, TextArtifact};
use crate::retry::RetryingCaller;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub struct ProxyHandler {
    config: Arc<Config>,
    upstream: Arc<dyn GenerativeService>,
    retry: RetryingCaller,
}

impl ProxyHandler {
    pub fn new(config: Arc<Config>, upstream: Arc<dyn GenerativeService>) -> Self {
        let retry =
            RetryingCaller::new(config.retry.clone()).with_deadline(config.request_deadline);
        Self {
            config,
            upstream,
            retry,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn api_key(&self) -> Result<&str, ProxyError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(ProxyError::Configuration)
    }

    /// Generates a try-on image from a person image and a clothing item image.
    pub async fn compose_image(
        &self,
        body: &[u8],
        cancel: &CancellationToken,
    ) -> Result<ImageArtifact, ProxyError> {
        let span = info_span!("compose_image", request_id = %Uuid::new_v4());
        async {
            let parsed = ComposeBody::parse(body)?;
            let api_key = self.api_key()?;
            let compose = parsed.validate()?;

            info!(
                "Composing image (person: {}, item: {})",
                compose.model_image.mime_type, compose.item_image.mime_type
            );

            let request = image::composition_request(
                &compose.prompt,
                compose.model_image,
                compose.item_image,
            );
            let model = self.config.image_model.as_str();
            let upstream = self.upstream.as_ref();
            let request = &request;

            let base64_image = self
                .retry
                .call(cancel, || async move {
                    let response = upstream.generate_content(api_key, model, request).await?;
                    image::extract_image(&response)
                })
                .await?;

            info!("Image generated ({} base64 chars)", base64_image.len());
            Ok::<_, ProxyError>(ImageArtifact { base64_image })
        }
        .instrument(span)
        .await
    }

    /// Suggests a style and scene prompt for a try-on photo.
    pub async fn suggest(
        &self,
        body: &[u8],
        cancel: &CancellationToken,
    ) -> Result<TextArtifact, ProxyError> {
        let span = info_span!("suggest", request_id = %Uuid::new_v4());
        async {
            let parsed = SuggestionBody::parse(body)?;
            let api_key = self.api_key()?;
            let prompt = parsed.validate()?;

            info!("Requesting suggestion ({} chars)", prompt.len());

            let request = chat::suggestion_request(&prompt);
            let model = self.config.suggestion_model.as_str();
            let upstream = self.upstream.as_ref();
            let request = &request;

            let text = self
                .retry
                .call(cancel, || async move {
                    let response = upstream.generate_content(api_key, model, request).await?;
                    chat::extract_text(&response)
                })
                .await?;

            Ok::<_, ProxyError>(TextArtifact { text })
        }
        .instrument(span)
        .await
    }
}
