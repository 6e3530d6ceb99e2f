//! Autocrop and PNG export
//!
//! The enhancement service gets a tight crop of the drawing: the smallest
//! rectangle holding every non-background pixel, grown by a padding and
//! clamped to the canvas. A blank canvas exports whole.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::Rgba;

/// MIME type of [`EncodedImage::bytes`]
pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Cannot export an empty {width}x{height} canvas")]
    EmptyCanvas { width: u32, height: u32 },
    #[error("Pixel buffer holds {actual} pixels, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
    #[error("Region {region:?} is empty or outside the {width}x{height} canvas")]
    InvalidRegion {
        region: ExportRegion,
        width: u32,
        height: u32,
    },
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Inclusive bounds of the content pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

/// Crop rectangle with an exclusive upper edge: `min_x..max_x`, `min_y..max_y`
///
/// Only meaningful for the canvas state it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRegion {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub padding: u32,
    /// Unpadded content bounds, None when the canvas is blank
    pub content: Option<ContentBounds>,
}

impl ExportRegion {
    /// Region covering the whole canvas
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            min_x: 0,
            min_y: 0,
            max_x: width,
            max_y: height,
            padding: 0,
            content: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.max_x.saturating_sub(self.min_x)
    }

    pub fn height(&self) -> u32 {
        self.max_y.saturating_sub(self.min_y)
    }

    pub fn is_blank(&self) -> bool {
        self.content.is_none()
    }

    fn fits(&self, width: u32, height: u32) -> bool {
        self.min_x < self.max_x && self.min_y < self.max_y && self.max_x <= width && self.max_y <= height
    }
}

/// Encoded image ready for upload or saving
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn mime(&self) -> &'static str {
        PNG_MIME
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

fn check_buffer(pixels: &[Rgba], width: u32, height: u32) -> Result<(), ExportError> {
    if width == 0 || height == 0 {
        return Err(ExportError::EmptyCanvas { width, height });
    }
    let expected = width as usize * height as usize;
    if pixels.len() != expected {
        return Err(ExportError::BufferSize {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

/// Find the padded bounding box of every pixel whose RGB differs from
/// `background` (alpha is ignored). A blank canvas yields the full canvas.
pub fn compute_bounding_box(
    pixels: &[Rgba],
    width: u32,
    height: u32,
    background: Rgba,
    padding: u32,
) -> Result<ExportRegion, ExportError> {
    check_buffer(pixels, width, height)?;

    let mut bounds: Option<ContentBounds> = None;
    for (y, row) in pixels.chunks_exact(width as usize).enumerate() {
        for (x, pixel) in row.iter().enumerate() {
            if pixel[..3] == background[..3] {
                continue;
            }
            let (x, y) = (x as u32, y as u32);
            bounds = Some(match bounds {
                None => ContentBounds {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                },
                Some(b) => ContentBounds {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            });
        }
    }

    let Some(content) = bounds else {
        debug!("compute_bounding_box: blank canvas, exporting {}x{}", width, height);
        return Ok(ExportRegion::full(width, height));
    };

    let region = ExportRegion {
        min_x: content.min_x.saturating_sub(padding),
        min_y: content.min_y.saturating_sub(padding),
        max_x: content.max_x.saturating_add(padding).saturating_add(1).min(width),
        max_y: content.max_y.saturating_add(padding).saturating_add(1).min(height),
        padding,
        content: Some(content),
    };
    debug!("compute_bounding_box: content {:?} -> region {:?}", content, region);
    Ok(region)
}

/// Copy `region` out of the canvas
pub fn crop(pixels: &[Rgba], width: u32, height: u32, region: &ExportRegion) -> Result<RgbaImage, ExportError> {
    check_buffer(pixels, width, height)?;
    if !region.fits(width, height) {
        return Err(ExportError::InvalidRegion {
            region: *region,
            width,
            height,
        });
    }

    let mut raw = Vec::with_capacity(region.width() as usize * region.height() as usize * 4);
    for y in region.min_y..region.max_y {
        let start = (y * width + region.min_x) as usize;
        let end = (y * width + region.max_x) as usize;
        raw.extend_from_slice(bytemuck::cast_slice(&pixels[start..end]));
    }

    RgbaImage::from_raw(region.width(), region.height(), raw).ok_or(ExportError::InvalidRegion {
        region: *region,
        width,
        height,
    })
}

/// Crop `region` and encode it as PNG
pub fn encode(pixels: &[Rgba], width: u32, height: u32, region: &ExportRegion) -> Result<EncodedImage, ExportError> {
    let image = crop(pixels, width, height, region)?;
    encode_image(&image)
}

/// Encode the whole canvas as PNG (the download path, never cropped)
pub fn encode_full(pixels: &[Rgba], width: u32, height: u32) -> Result<EncodedImage, ExportError> {
    encode(pixels, width, height, &ExportRegion::full(width, height))
}

/// Encode an image buffer as PNG
pub fn encode_image(image: &RgbaImage) -> Result<EncodedImage, ExportError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    info!("Encoded {}x{} PNG ({} bytes)", image.width(), image.height(), bytes.len());
    Ok(EncodedImage {
        bytes,
        width: image.width(),
        height: image.height(),
    })
}
