use base64::Engine as _;

pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        _ => {
            tracing::warn!(
                "Unrecognized image format (first 4 bytes: {:02X?}), falling back to image/png",
                &bytes[..bytes.len().min(4)]
            );
            "image/png"
        }
    }
}

/// Sniffs the MIME type of base64 image data from its first decoded bytes.
pub fn detect_base64_image_mime(data: &str) -> &'static str {
    // 16 base64 characters decode to the 12 bytes the WebP check needs.
    let prefix: String = data
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .take(16)
        .collect();
    let usable = prefix.len() - prefix.len() % 4;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&prefix[..usable])
        .unwrap_or_default();
    detect_image_mime(&bytes)
}

/// Splits a `data:<mime>;base64,<data>` URL into its MIME type and payload.
/// Plain base64 is returned unchanged with no MIME type.
pub fn split_data_url(data: &str) -> (Option<&str>, &str) {
    let Some(rest) = data.strip_prefix("data:") else {
        return (None, data);
    };
    match rest.split_once(',') {
        Some((meta, payload)) => {
            let mime = meta.strip_suffix(";base64").unwrap_or(meta);
            ((!mime.is_empty()).then_some(mime), payload)
        }
        None => (None, data),
    }
}
