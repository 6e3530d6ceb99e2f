use serde::{Deserialize, Serialize};

use crate::constants::{BLACK, DEFAULT_LINE_WIDTH};

/// One canvas pixel as straight (non-premultiplied) RGBA8
pub type Rgba = [u8; 4];

/// Tool used by a stroke; the same type the UI sends in `SetTool`
pub use sketchmesh_ipc::ToolMode;

/// Style attributes captured when a stroke begins
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// Brush color; ignored by the eraser
    pub color: Rgba,
    /// Brush diameter in pixels
    pub width: f32,
    pub tool: ToolMode,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: BLACK,
            width: DEFAULT_LINE_WIDTH,
            tool: ToolMode::Brush,
        }
    }
}

impl StrokeStyle {
    pub fn brush(color: Rgba, width: f32) -> Self {
        Self {
            color,
            width,
            tool: ToolMode::Brush,
        }
    }

    pub fn eraser() -> Self {
        Self {
            tool: ToolMode::Eraser,
            ..Self::default()
        }
    }
}
