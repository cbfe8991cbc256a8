//! Data URI parsing and header inspection.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;

use super::types::{ImageError, ImageKind, ImagePayload};

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Parse `data:<mime>;base64,<payload>` into an [`ImagePayload`].
/// Parameters after the subtype (`;charset=...`) are ignored.
///
/// Only the header is inspected for dimensions; the raster is not decoded.
pub fn classify(data_uri: &str) -> Result<ImagePayload, ImageError> {
    let data_uri = data_uri.trim();
    let marker = data_uri
        .find(BASE64_MARKER)
        .ok_or(ImageError::InvalidImageEncoding)?;
    let mime = data_uri[..marker]
        .strip_prefix(SCHEME)
        .ok_or(ImageError::InvalidImageEncoding)?;
    let subtype = mime
        .strip_prefix("image/")
        .and_then(|rest| rest.split(';').next())
        .filter(|subtype| !subtype.is_empty())
        .ok_or(ImageError::InvalidImageEncoding)?;
    let payload = &data_uri[marker + BASE64_MARKER.len()..];

    let bytes = STANDARD.decode(payload)?;
    let size = imagesize::blob_size(&bytes)
        .map_err(|_| ImageError::UnsupportedImageFormat(subtype.to_string()))?;

    let width = u32::try_from(size.width)
        .map_err(|_| ImageError::UnsupportedImageFormat(subtype.to_string()))?;
    let height = u32::try_from(size.height)
        .map_err(|_| ImageError::UnsupportedImageFormat(subtype.to_string()))?;

    Ok(ImagePayload {
        kind: ImageKind::from_subtype(subtype),
        bytes: Bytes::from(bytes),
        width,
        height,
    })
}
