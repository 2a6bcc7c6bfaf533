//! Incoming request bodies and their validation.
//!
//! Parsing and validation are separate steps: a body that is not JSON (or has
//! fields of the wrong type) is a parse failure, while a well-formed body with
//! missing fields is a validation failure.

use super::ProxyError;
use crate::ai::gemini::types::InlineData;
use crate::ai::mime::{detect_base64_image_mime, split_data_url};
use crate::models::ImageInput;
use crate::prompts;
use serde::Deserialize;

/// Raw image-composition body. Accepts both the canonical shape
/// (`fullPrompt`, `modelImage`, `itemImage`) and the legacy shape
/// (`modelImageBase64`, `itemImageBase64`, `stylePrompt`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeBody {
    pub full_prompt: Option<String>,
    pub model_image: Option<ImageInput>,
    pub item_image: Option<ImageInput>,
    pub model_image_base64: Option<String>,
    pub item_image_base64: Option<String>,
    pub style_prompt: Option<String>,
}

/// Validated composition request, ready to become an upstream payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeRequest {
    pub prompt: String,
    pub model_image: InlineData,
    pub item_image: InlineData,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionBody {
    pub prompt: Option<String>,
}

impl ComposeBody {
    pub fn parse(body: &[u8]) -> Result<Self, ProxyError> {
        Ok(serde_json::from_slice(body)?)
    }

    fn is_legacy(&self) -> bool {
        self.model_image_base64.is_some() || self.item_image_base64.is_some()
    }

    pub fn validate(self) -> Result<ComposeRequest, ProxyError> {
        if self.is_legacy() {
            let model_image = legacy_image("modelImageBase64", self.model_image_base64)?;
            let item_image = legacy_image("itemImageBase64", self.item_image_base64)?;
            return Ok(ComposeRequest {
                prompt: prompts::composition_prompt(self.style_prompt.as_deref()),
                model_image,
                item_image,
            });
        }

        let model_image = canonical_image("modelImage", self.model_image)?;
        let item_image = canonical_image("itemImage", self.item_image)?;
        let prompt = self
            .full_prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| missing("fullPrompt"))?;

        Ok(ComposeRequest {
            prompt,
            model_image,
            item_image,
        })
    }
}

impl SuggestionBody {
    pub fn parse(body: &[u8]) -> Result<Self, ProxyError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn validate(self) -> Result<String, ProxyError> {
        self.prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| missing("prompt"))
    }
}

fn missing(field: &str) -> ProxyError {
    ProxyError::Validation(format!("Missing required field: {}", field))
}

fn canonical_image(field: &str, image: Option<ImageInput>) -> Result<InlineData, ProxyError> {
    let image = image.ok_or_else(|| missing(field))?;
    let (url_mime, data) = split_data_url(image.data.trim());
    if data.is_empty() {
        return Err(missing(&format!("{}.data", field)));
    }

    let mime_type = match image.mime_type.trim() {
        "" => url_mime
            .map(str::to_string)
            .unwrap_or_else(|| detect_base64_image_mime(data).to_string()),
        declared => declared.to_string(),
    };

    Ok(InlineData {
        mime_type,
        data: data.to_string(),
    })
}

fn legacy_image(field: &str, data: Option<String>) -> Result<InlineData, ProxyError> {
    let raw = data.unwrap_or_default();
    let (url_mime, data) = split_data_url(raw.trim());
    if data.is_empty() {
        return Err(missing(field));
    }

    Ok(InlineData {
        mime_type: url_mime
            .unwrap_or_else(|| detect_base64_image_mime(data))
            .to_string(),
        data: data.to_string(),
    })
}
