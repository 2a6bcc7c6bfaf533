use super::types::{ApiErrorEnvelope, GenerateContentRequest, GenerateContentResponse};
use crate::ai::GenerativeService;
use crate::error::UpstreamError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Lightweight Gemini REST client. One `generate_content` call is one POST.
pub struct GeminiHttpClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self::new_with_client(base_url, timeout, Client::new())
    }

    pub fn new_with_client(base_url: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// `model` may be given with or without the `models/` prefix.
    fn endpoint(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

fn error_details(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ if body.trim().is_empty() => "Unknown upstream error".to_string(),
        _ => body.trim().to_string(),
    }
}

#[async_trait]
impl GenerativeService for GeminiHttpClient {
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, UpstreamError> {
        let url = self.endpoint(model);
        tracing::debug!("Sending generateContent request to {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Gemini: {}", e);
                UpstreamError::transport(format!("Failed to reach Gemini API: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let details = error_details(&body);
            tracing::error!("Gemini API error (status {}): {}", status, details);
            return Err(UpstreamError::from_status(
                status.as_u16(),
                format!("Gemini API error (status {}): {}", status.as_u16(), details),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}\nBody: {}", e, body);
            UpstreamError::transport(format!("Failed to parse Gemini response: {}", e))
        })
    }
}
