//! Raster surface for painting - RGBA8 storage owned by one drawing session

use glam::Vec2;
use tracing::debug;

use crate::brush::{PixelRegion, blend_rgba, for_each_covered_pixel};
use crate::constants::ERASER_RADIUS;
use crate::history::Snapshot;
use crate::types::{Rgba, StrokeStyle, ToolMode};
use crate::validation::{SurfaceError, validate_dimensions};

/// Stroke currently being drawn
#[derive(Debug, Clone, Copy)]
struct ActiveStroke {
    style: StrokeStyle,
    last: Vec2,
}

/// The authoritative pixel buffer of a drawing session
///
/// Pixels are stored row-major as straight RGBA8. The buffer only changes
/// through the stroke, clear, resize and restore operations below.
pub struct RasterSurface {
    width: u32,
    height: u32,
    background: Rgba,
    pixels: Vec<Rgba>,
    active: Option<ActiveStroke>,
}

impl RasterSurface {
    /// Allocate a canvas filled with `background`
    pub fn new(width: u32, height: u32, background: Rgba) -> Result<Self, SurfaceError> {
        validate_dimensions(width, height)?;
        let pixel_count = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            background,
            pixels: vec![background; pixel_count],
            active: None,
        })
    }

    /// Reallocate and refill the canvas, discarding all content
    pub fn initialize(&mut self, width: u32, height: u32, background: Rgba) -> Result<(), SurfaceError> {
        *self = Self::new(width, height, background)?;
        Ok(())
    }

    /// Change the canvas size. Destructive: content is replaced by background.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        debug!("RasterSurface::resize {}x{} -> {}x{}", self.width, self.height, width, height);
        self.initialize(width, height, self.background)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color used by `clear` and the eraser
    #[inline]
    pub fn background(&self) -> Rgba {
        self.background
    }

    /// Start a stroke at `point`.
    ///
    /// Nothing is drawn until the stroke is extended. The caller is
    /// responsible for recording an undo snapshot before this call.
    pub fn begin_stroke(&mut self, point: Vec2, style: StrokeStyle) {
        debug!("begin_stroke at ({:.1}, {:.1}) {:?}", point.x, point.y, style.tool);
        self.active = Some(ActiveStroke { style, last: point });
    }

    /// Extend the active stroke to `point` and rasterize the new segment.
    ///
    /// Brush strokes cover a round-capped segment of the style width. The
    /// eraser instead stamps a disc of [`ERASER_RADIUS`] at `point`, painted
    /// with the background color. No-op without an active stroke.
    pub fn extend_stroke(&mut self, point: Vec2) -> Option<PixelRegion> {
        let Some(stroke) = self.active.as_mut() else {
            debug!("extend_stroke: no active stroke, ignoring");
            return None;
        };
        let from = stroke.last;
        stroke.last = point;
        let style = stroke.style;

        let (width, height) = (self.width, self.height);
        let row = width as usize;
        let pixels = &mut self.pixels;

        match style.tool {
            ToolMode::Brush => for_each_covered_pixel(from, point, style.width / 2.0, width, height, |x, y| {
                let index = y as usize * row + x as usize;
                pixels[index] = blend_rgba(style.color, pixels[index]);
            }),
            ToolMode::Eraser => {
                let background = self.background;
                for_each_covered_pixel(point, point, ERASER_RADIUS, width, height, |x, y| {
                    pixels[y as usize * row + x as usize] = background;
                })
            }
        }
    }

    /// Move the pen without drawing (pointer moved with the button released)
    pub fn move_to(&mut self, point: Vec2) {
        if let Some(stroke) = self.active.as_mut() {
            stroke.last = point;
        }
    }

    /// Finish the active stroke; later extends are no-ops
    pub fn end_stroke(&mut self) {
        self.active = None;
    }

    /// Check if a stroke is currently in progress
    pub fn is_stroking(&self) -> bool {
        self.active.is_some()
    }

    /// Fill the whole canvas with `background`, which also becomes the eraser color.
    ///
    /// The caller records the undo snapshot before clearing.
    pub fn clear(&mut self, background: Rgba) {
        self.background = background;
        self.pixels.fill(background);
    }

    /// Read-only view of the full pixel buffer
    #[inline]
    pub fn read_pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Raw RGBA8 bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Get a pixel at the given coordinates
    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y as usize) * (self.width as usize) + (x as usize)])
    }

    /// Independent copy of the current pixels
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.width, self.height, &self.pixels).with_background(self.background)
    }

    /// Overwrite the canvas with a snapshot taken from a same-sized canvas
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), SurfaceError> {
        if snapshot.width() != self.width || snapshot.height() != self.height {
            return Err(SurfaceError::SnapshotMismatch {
                snapshot_width: snapshot.width(),
                snapshot_height: snapshot.height(),
                width: self.width,
                height: self.height,
            });
        }
        self.pixels.copy_from_slice(snapshot.pixels());
        if let Some(background) = snapshot.background() {
            self.background = background;
        }
        self.active = None;
        Ok(())
    }
}
