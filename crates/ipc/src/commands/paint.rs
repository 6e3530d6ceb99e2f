//! Paint command types sent by the toolbar and the pointer handlers.

use serde::{Deserialize, Serialize};

/// Active drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToolMode {
    #[default]
    Brush,
    Eraser,
}

/// Quick line width presets offered by the toolbar.
pub const LINE_WIDTH_PRESETS: [f32; 10] = [2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0];

/// Commands for controlling the drawing surface.
///
/// Pointer coordinates are canvas pixels with the origin at the top left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PaintCommand {
    /// Set stroke color as `#rrggbb`
    SetStrokeColor { color: String },
    /// Set brush width in pixels (1-100)
    SetLineWidth { width: f32 },
    /// Switch between brush and eraser
    SetTool { tool: ToolMode },
    /// Primary button pressed: starts a stroke and records an undo checkpoint
    PointerDown { x: f32, y: f32 },
    /// Pointer moved; `pressed` is false when the primary button is not held
    PointerMove {
        x: f32,
        y: f32,
        #[serde(default = "pressed_default")]
        pressed: bool,
    },
    /// Primary button released
    PointerUp,
    /// Fill the canvas with the background color
    Clear,
    /// Restore the state before the last stroke or clear
    Undo,
    /// Save the full, uncropped canvas
    Download,
}

fn pressed_default() -> bool {
    true
}
