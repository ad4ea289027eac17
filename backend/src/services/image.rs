//! Profile image downscaling.
//!
//! Images larger than [`MAX_DIMENSION`] on either side are shrunk so the
//! larger side equals it, keeping the aspect ratio, and re-encoded in their
//! original format.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_DIMENSION: u32 = 1200;
/// Quality factor 0.8 expressed on the JPEG encoder's 1-100 scale.
pub const JPEG_QUALITY: u8 = 80;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("only JPEG, PNG and GIF images are accepted")]
    UnsupportedFormat,

    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Png => Some(ImageKind::Png),
            ImageFormat::Gif => Some(ImageKind::Gif),
            _ => None,
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
            ImageKind::Gif => ImageFormat::Gif,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub kind: ImageKind,
}

/// Target size for an image of `width`×`height` so neither side exceeds `max`.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }

    let scale = |side: u32, larger: u32| -> u32 {
        let scaled = (side as u64 * max as u64 + larger as u64 / 2) / larger as u64;
        (scaled as u32).max(1)
    };

    if width >= height {
        (max, scale(height, width))
    } else {
        (scale(width, height), max)
    }
}

fn check_size(bytes: &[u8]) -> Result<(), ImageError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ImageError::TooLarge {
            size: bytes.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

fn decode(bytes: &[u8]) -> Result<(DynamicImage, ImageKind), ImageError> {
    let format = image::guess_format(bytes).map_err(ImageError::Decode)?;
    let kind = ImageKind::from_format(format).ok_or(ImageError::UnsupportedFormat)?;
    let img = image::load_from_memory_with_format(bytes, format).map_err(ImageError::Decode)?;
    Ok((img, kind))
}

fn encode(img: &DynamicImage, kind: ImageKind) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    match kind {
        ImageKind::Jpeg => {
            // JPEG has no alpha channel
            let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(ImageError::Encode)?;
        }
        ImageKind::Png | ImageKind::Gif => {
            img.write_to(&mut Cursor::new(&mut buf), kind.format())
                .map_err(ImageError::Encode)?;
        }
    }
    Ok(buf)
}

fn resize(img: DynamicImage) -> DynamicImage {
    let (width, height) = fit_within(img.width(), img.height(), MAX_DIMENSION);
    if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Triangle)
    }
}

/// Client-side preparation: decode, shrink to fit and always re-encode.
pub fn prepare_upload(bytes: &[u8]) -> Result<ProcessedImage, ImageError> {
    check_size(bytes)?;
    let (img, kind) = decode(bytes)?;
    let img = resize(img);

    Ok(ProcessedImage {
        bytes: encode(&img, kind)?,
        width: img.width(),
        height: img.height(),
        kind,
    })
}

/// Server-side check of an uploaded image. Bytes that already fit are stored
/// as received so an image prepared by a client is not compressed twice.
pub fn enforce_bounds(bytes: Vec<u8>) -> Result<ProcessedImage, ImageError> {
    check_size(&bytes)?;
    let (img, kind) = decode(&bytes)?;

    if img.width() <= MAX_DIMENSION && img.height() <= MAX_DIMENSION {
        return Ok(ProcessedImage {
            width: img.width(),
            height: img.height(),
            bytes,
            kind,
        });
    }

    tracing::debug!(
        "Downscaling {}x{} image to fit {}px",
        img.width(),
        img.height(),
        MAX_DIMENSION
    );
    let img = resize(img);
    Ok(ProcessedImage {
        bytes: encode(&img, kind)?,
        width: img.width(),
        height: img.height(),
        kind,
    })
}
