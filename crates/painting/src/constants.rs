/// Largest accepted canvas edge in pixels.
pub const MAX_CANVAS_SIZE: u32 = 8192;

/// Eraser disc radius. Fixed; unlike the brush width it is not user-configurable.
pub const ERASER_RADIUS: f32 = 20.0;

/// Brush width bounds offered by the toolbar.
pub const MIN_LINE_WIDTH: f32 = 1.0;
pub const MAX_LINE_WIDTH: f32 = 100.0;

/// Brush width before the toolbar changes it, and the padding around an
/// exported sketch. Both live in the config crate.
pub use sketchmesh_config::{DEFAULT_EXPORT_PADDING, DEFAULT_LINE_WIDTH};

/// Smallest radius a stroke rasterizes with, so 1px lines still cover pixels.
pub const MIN_STROKE_RADIUS: f32 = 0.5;

pub const WHITE: [u8; 4] = [255, 255, 255, 255];
pub const BLACK: [u8; 4] = [0, 0, 0, 255];
