use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};
use crate::error::UpstreamError;

/// Builds the try-on request: prompt first, then the person and the item.
pub fn composition_request(
    prompt: &str,
    model_image: InlineData,
    item_image: InlineData,
) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![
                Part::Text {
                    text: prompt.to_string(),
                },
                Part::InlineData {
                    inline_data: model_image,
                },
                Part::InlineData {
                    inline_data: item_image,
                },
            ],
        }],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
        }),
        tools: None,
    }
}

/// Returns the base64 data of the first inline image, untouched.
pub fn extract_image(response: &GenerateContentResponse) -> Result<String, UpstreamError> {
    let image_data = response
        .first_parts()
        .iter()
        .find_map(|p| match p {
            Part::InlineData { inline_data } if !inline_data.data.is_empty() => Some(inline_data),
            _ => None,
        })
        .ok_or_else(|| {
            UpstreamError::empty_content("Gemini response did not contain valid image data")
        })?;

    tracing::debug!(
        "Gemini returned image with mime_type: {}",
        image_data.mime_type
    );

    Ok(image_data.data.clone())
}
