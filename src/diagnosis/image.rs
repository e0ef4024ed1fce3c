//! Image normalisation: raw bytes to a base64 payload and back.

use super::types::{ImagePayload, MediaType};
use crate::{Error, Result};
use base64::{Engine as _, engine::general_purpose};
use image::ImageFormat;
use tracing::{debug, warn};

/// Encodes raw image bytes for transport. The media type is taken from the
/// content; the bytes must decode as a PNG, JPEG or WebP image.
pub fn encode(bytes: &[u8]) -> Result<ImagePayload> {
    let mime_type = sniff(bytes)?;
    debug!("Encoding {} byte {} image", bytes.len(), mime_type);

    Ok(ImagePayload {
        data: general_purpose::STANDARD.encode(bytes),
        mime_type,
    })
}

/// Like [`encode`], for uploads that declare their own media type.
pub fn encode_declared(bytes: &[u8], declared: &str) -> Result<ImagePayload> {
    let declared_type = MediaType::from_mime(declared).ok_or_else(|| {
        Error::validation(format!(
            "Unsupported image type '{declared}'. Use PNG, JPG or WEBP."
        ))
    })?;

    let payload = encode(bytes)?;
    if payload.mime_type != declared_type {
        warn!(
            "Upload declared {} but content is {}, using content type",
            declared_type, payload.mime_type
        );
    }
    Ok(payload)
}

/// Accepts a base64 upload, optionally wrapped in a `data:` URL.
pub fn from_base64(data: &str, declared: &str) -> Result<ImagePayload> {
    let raw = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };

    let bytes = general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|e| Error::unreadable_image(format!("invalid base64: {e}")))?;

    encode_declared(&bytes, declared)
}

/// Inverse of [`encode`].
pub fn decode(payload: &ImagePayload) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(&payload.data)
        .map_err(|e| Error::unreadable_image(format!("invalid base64: {e}")))
}

fn sniff(bytes: &[u8]) -> Result<MediaType> {
    if bytes.is_empty() {
        return Err(Error::unreadable_image("image is empty"));
    }

    let format = image::guess_format(bytes)
        .map_err(|e| Error::unreadable_image(format!("unknown image format: {e}")))?;

    let mime_type = match format {
        ImageFormat::Png => MediaType::Png,
        ImageFormat::Jpeg => MediaType::Jpeg,
        ImageFormat::WebP => MediaType::Webp,
        other => {
            return Err(Error::unreadable_image(format!(
                "unsupported image format {other:?}"
            )));
        }
    };

    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| Error::unreadable_image(format!("failed to decode image: {e}")))?;

    Ok(mime_type)
}
