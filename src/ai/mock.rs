use super::gemini::types::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, InlineData, Part,
};
use super::GenerativeService;
use crate::error::UpstreamError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// A request observed by [`MockGenerativeClient`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub api_key: String,
    pub model: String,
    pub request: GenerateContentRequest,
    pub at: Instant,
}

/// Scripted upstream. Replies are served in order and cycle once exhausted.
#[derive(Clone)]
pub struct MockGenerativeClient {
    responses: Arc<Mutex<Vec<Result<GenerateContentResponse, UpstreamError>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockGenerativeClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, response: Result<GenerateContentResponse, UpstreamError>) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_image_response(self, base64_image: &str) -> Self {
        self.with_response(Ok(response_with_parts(vec![Part::InlineData {
            inline_data: InlineData {
                mime_type: "image/png".to_string(),
                data: base64_image.to_string(),
            },
        }])))
    }

    pub fn with_text_response(self, text: &str) -> Self {
        self.with_response(Ok(response_with_parts(vec![Part::Text {
            text: text.to_string(),
        }])))
    }

    /// A 2xx response whose candidate carries no usable parts.
    pub fn with_empty_response(self) -> Self {
        self.with_response(Ok(response_with_parts(Vec::new())))
    }

    pub fn with_error(self, error: UpstreamError) -> Self {
        self.with_response(Err(error))
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockGenerativeClient {
    fn default() -> Self {
        Self::new()
    }
}

fn response_with_parts(parts: Vec<Part>) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content { role: None, parts }),
        }],
    }
}

#[async_trait]
impl GenerativeService for MockGenerativeClient {
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, UpstreamError> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                api_key: api_key.to_string(),
                model: model.to_string(),
                request: request.clone(),
                at: Instant::now(),
            });
            calls.len()
        };

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Default mock response
            Ok(response_with_parts(vec![Part::Text {
                text: "mock response".to_string(),
            }]))
        } else {
            let index = (count - 1) % responses.len();
            responses[index].clone()
        }
    }
}
