use super::errors::{PayloadValidationError, ValidationFailureKind, ValidationResult};
use super::utils::require_non_empty_str;
use crate::domain::value_objects::EntityPayload;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Decoded upload body for an image record.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Validates an image payload and returns the decoded body on success.
pub fn validate_image_asset(
    payload: &EntityPayload,
    max_bytes: usize,
) -> ValidationResult<ImageUpload> {
    let mime_type = require_non_empty_str(payload, "mimeType")?;
    if !mime_type.starts_with("image/") {
        return Err(PayloadValidationError::invalid(
            "mimeType",
            format_args!("must start with image/ (got {mime_type})"),
        ));
    }

    let encoded = require_non_empty_str(payload, "data")?;
    let encoded = strip_data_url_prefix(encoded);
    let bytes = STANDARD.decode(encoded.trim()).map_err(|err| {
        PayloadValidationError::new(
            ValidationFailureKind::Encoding,
            format!("data is not valid base64: {err}"),
        )
    })?;
    if bytes.is_empty() {
        return Err(PayloadValidationError::missing("data"));
    }
    if bytes.len() > max_bytes {
        return Err(PayloadValidationError::new(
            ValidationFailureKind::PayloadTooLarge,
            format!("image is {} bytes (limit {max_bytes})", bytes.len()),
        ));
    }

    Ok(ImageUpload {
        mime_type: mime_type.to_string(),
        bytes,
    })
}

fn strip_data_url_prefix(encoded: &str) -> &str {
    if encoded.starts_with("data:") {
        if let Some((_, body)) = encoded.split_once(";base64,") {
            return body;
        }
    }
    encoded
}
