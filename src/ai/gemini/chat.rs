use super::types::{Content, GenerateContentRequest, GenerateContentResponse, Part};
use crate::error::UpstreamError;
use crate::prompts;

/// Builds the suggestion request: the caller's prompt under a fixed
/// fashion-photography system instruction, with no tools.
pub fn suggestion_request(prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::text(prompt)],
        system_instruction: Some(Content::text(prompts::SUGGESTION_SYSTEM.trim())),
        generation_config: None,
        tools: Some(Vec::new()),
    }
}

pub fn extract_text(response: &GenerateContentResponse) -> Result<String, UpstreamError> {
    response
        .first_parts()
        .iter()
        .find_map(|p| match p {
            Part::Text { text } if !text.trim().is_empty() => Some(text.clone()),
            _ => None,
        })
        .ok_or_else(|| UpstreamError::empty_content("Gemini returned an empty text response"))
}
