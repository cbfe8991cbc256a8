//! In-memory decode, resize and re-encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, first GIF frame) | `image::load_from_memory_with_format` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode | `DynamicImage::write_to` in the source format |

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use super::types::{EncodedImage, ImageError, ImageKind};

/// Resizes one raster per call; holds no state between calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageTransformer;

impl ImageTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Decode a png or jpeg raster. Anything else is unsupported.
    pub fn decode(&self, bytes: &[u8], kind: &ImageKind) -> Result<DynamicImage, ImageError> {
        let format = raster_format(kind)?;
        image::load_from_memory_with_format(bytes, format).map_err(|source| ImageError::Codec {
            operation: "decode",
            format: kind.subtype().to_string(),
            source,
        })
    }

    /// Decode `bytes` and produce one derivative `width` pixels wide.
    pub fn resize(
        &self,
        bytes: &[u8],
        kind: &ImageKind,
        width: u32,
    ) -> Result<EncodedImage, ImageError> {
        let decoded = self.decode(bytes, kind)?;
        self.render(&decoded, kind, width)
    }

    /// Resize an already decoded raster, keeping its aspect ratio, and encode
    /// it in `kind`. A `width` of 0 re-encodes at the natural size.
    pub fn render(
        &self,
        image: &DynamicImage,
        kind: &ImageKind,
        width: u32,
    ) -> Result<EncodedImage, ImageError> {
        let format = raster_format(kind)?;
        let sized = scaled(image, width);
        let sized = sized.as_ref().unwrap_or(image);
        encode(sized, format, kind)
    }

    /// Static thumbnail cut from the first frame of a gif.
    pub fn still_frame(&self, bytes: &[u8], width: u32) -> Result<EncodedImage, ImageError> {
        let kind = ImageKind::Gif;
        let first = image::load_from_memory_with_format(bytes, ImageFormat::Gif).map_err(
            |source| ImageError::Codec {
                operation: "decode",
                format: kind.subtype().to_string(),
                source,
            },
        )?;
        let sized = scaled(&first, width);
        let sized = sized.as_ref().unwrap_or(&first);
        encode(sized, ImageFormat::Gif, &kind)
    }
}

/// Height that keeps the source aspect ratio at `target_width`.
pub fn scaled_height(source: (u32, u32), target_width: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return src_h.max(1);
    }
    let height = (f64::from(target_width) * f64::from(src_h) / f64::from(src_w)).round();
    (height as u32).max(1)
}

fn scaled(image: &DynamicImage, width: u32) -> Option<DynamicImage> {
    if width == 0 || width == image.width() {
        return None;
    }
    let height = scaled_height((image.width(), image.height()), width);
    Some(image.resize_exact(width, height, FilterType::Lanczos3))
}

fn raster_format(kind: &ImageKind) -> Result<ImageFormat, ImageError> {
    match kind {
        ImageKind::Png => Ok(ImageFormat::Png),
        ImageKind::Jpeg => Ok(ImageFormat::Jpeg),
        other => Err(ImageError::UnsupportedImageFormat(
            other.subtype().to_string(),
        )),
    }
}

fn encode(
    image: &DynamicImage,
    format: ImageFormat,
    kind: &ImageKind,
) -> Result<EncodedImage, ImageError> {
    // The jpeg encoder has no alpha channel and the gif encoder wants rgba.
    let converted = match format {
        ImageFormat::Jpeg => Some(DynamicImage::ImageRgb8(image.to_rgb8())),
        ImageFormat::Gif => Some(DynamicImage::ImageRgba8(image.to_rgba8())),
        _ => None,
    };
    let image = converted.as_ref().unwrap_or(image);

    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), format)
        .map_err(|source| ImageError::Codec {
            operation: "encode",
            format: kind.subtype().to_string(),
            source,
        })?;
    Ok(EncodedImage::new(kind.clone(), buffer))
}
