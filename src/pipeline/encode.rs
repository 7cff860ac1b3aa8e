//! Image encoding: raw image bytes → base64 `ImageData`.
//!
//! The upload is the user's file as-is. Re-encoding a photo of a drawing to
//! PNG would only make it larger; the model reads JPEG fine. The MIME type is
//! sniffed from the bytes rather than trusted from the file extension, since
//! uploads are frequently renamed.

use crate::error::ReportError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::ImageFormat;
use tracing::debug;

/// Base64-wrap an image for the vision API.
///
/// Fails with [`ReportError::ImageTooLarge`] above `max_bytes`. Unknown
/// formats are sent as `image/png`, which the API treats as a hint only.
pub fn encode_image(bytes: &[u8], max_bytes: usize) -> Result<ImageData, ReportError> {
    if bytes.len() > max_bytes {
        return Err(ReportError::ImageTooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    let mime = mime_type(bytes);
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime, b64.len());

    Ok(ImageData::new(b64, mime).with_detail("high"))
}

fn mime_type(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::WebP) => "image/webp",
        _ => "image/png",
    }
}
