use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image must be a base64 data URI (`data:image/<type>;base64,<payload>`)")]
    InvalidImageEncoding,
    #[error("image payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("unsupported image format `{0}`")]
    UnsupportedImageFormat(String),
    #[error("failed to {operation} {format} image: {source}")]
    Codec {
        operation: &'static str,
        format: String,
        #[source]
        source: image::ImageError,
    },
}

/// Image format as declared by the data URI's MIME subtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Other(String),
}

impl ImageKind {
    pub fn from_subtype(subtype: &str) -> Self {
        match subtype.trim().to_ascii_lowercase().as_str() {
            "png" => ImageKind::Png,
            "jpeg" | "jpg" => ImageKind::Jpeg,
            "gif" => ImageKind::Gif,
            other => ImageKind::Other(other.to_string()),
        }
    }

    pub fn subtype(&self) -> &str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
            ImageKind::Gif => "gif",
            ImageKind::Other(subtype) => subtype,
        }
    }

    /// File extension used for stored derivatives.
    pub fn extension(&self) -> &str {
        self.subtype()
    }

    pub fn content_type(&self) -> String {
        format!("image/{}", self.subtype())
    }
}

/// A decoded inline image, alive only for one ingestion call.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub kind: ImageKind,
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

/// An encoded derivative ready to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub kind: ImageKind,
    pub bytes: Bytes,
}

impl EncodedImage {
    pub fn new(kind: ImageKind, bytes: impl Into<Bytes>) -> Self {
        Self {
            kind,
            bytes: bytes.into(),
        }
    }

    pub fn content_type(&self) -> String {
        self.kind.content_type()
    }

    /// Re-wrap the encoded bytes as a `data:` URI.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}
