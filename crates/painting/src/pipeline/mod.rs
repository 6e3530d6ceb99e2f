//! Drawing session pipeline
//!
//! [`Sketchpad`] is the explicit per-session context that ties together:
//! - Toolbar style state (color, width, brush/eraser)
//! - The raster surface the strokes mutate
//! - Undo history, fed with a snapshot before every stroke and clear
//! - Export of the autocropped sketch and the full-canvas download

mod stroke;
mod surface_ops;
mod undo;

use tracing::info;

use crate::constants::DEFAULT_EXPORT_PADDING;
use crate::history::HistoryStack;
use crate::surface::RasterSurface;
use crate::types::{Rgba, StrokeStyle, ToolMode};
use crate::validation::{ColorParseError, SurfaceError, clamp_line_width, parse_hex_color};

/// One drawing session: canvas, history and toolbar state
pub struct Sketchpad {
    pub(crate) surface: RasterSurface,
    pub(crate) history: HistoryStack,
    /// Style applied to the next stroke
    pub(crate) style: StrokeStyle,
    pub(crate) export_padding: u32,
}

impl Sketchpad {
    /// Create a canvas filled with `background`
    pub fn new(
        width: u32,
        height: u32,
        background: Rgba,
        history_capacity: Option<usize>,
    ) -> Result<Self, SurfaceError> {
        let surface = RasterSurface::new(width, height, background)?;
        info!("Sketchpad {}x{} (history capacity {:?})", width, height, history_capacity);
        Ok(Self {
            surface,
            history: HistoryStack::new(history_capacity),
            style: StrokeStyle::default(),
            export_padding: DEFAULT_EXPORT_PADDING,
        })
    }

    pub fn with_export_padding(mut self, padding: u32) -> Self {
        self.export_padding = padding;
        self
    }

    /// Start over on a fresh canvas. Content and history are discarded.
    pub fn initialize(&mut self, width: u32, height: u32, background: Rgba) -> Result<(), SurfaceError> {
        self.surface.initialize(width, height, background)?;
        self.history.clear();
        Ok(())
    }

    /// Resize the canvas. Destructive: content and history are discarded.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        self.surface.resize(width, height)?;
        self.history.clear();
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    /// Read-only access to the canvas
    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    /// Set the brush color
    pub fn set_color(&mut self, color: Rgba) {
        self.style.color = color;
    }

    /// Set the brush color from a toolbar `#rrggbb` string
    pub fn set_color_hex(&mut self, color: &str) -> Result<(), ColorParseError> {
        self.style.color = parse_hex_color(color)?;
        Ok(())
    }

    /// Set the brush width, clamped to the toolbar range
    pub fn set_line_width(&mut self, width: f32) {
        self.style.width = clamp_line_width(width);
    }

    pub fn set_tool(&mut self, tool: ToolMode) {
        self.style.tool = tool;
    }

    pub fn export_padding(&self) -> u32 {
        self.export_padding
    }
}
