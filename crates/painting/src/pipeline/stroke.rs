//! Stroke handling for the drawing session

use glam::Vec2;
use tracing::debug;

use crate::brush::PixelRegion;

use super::Sketchpad;

impl Sketchpad {
    /// Begin a stroke at canvas coordinates (x, y) with the current style.
    ///
    /// The pre-stroke canvas is pushed to the history first; this is the
    /// undo checkpoint for the whole stroke.
    pub fn begin_stroke(&mut self, x: f32, y: f32) {
        if self.surface.is_stroking() {
            debug!("begin_stroke: finishing previous stroke");
            self.end_stroke();
        }
        self.history.push(self.surface.snapshot());
        self.surface.begin_stroke(Vec2::new(x, y), self.style);
    }

    /// Continue the active stroke to (x, y)
    pub fn stroke_to(&mut self, x: f32, y: f32) -> Option<PixelRegion> {
        self.surface.extend_stroke(Vec2::new(x, y))
    }

    /// Move the pen without drawing; the next segment starts at (x, y)
    pub fn move_to(&mut self, x: f32, y: f32) {
        self.surface.move_to(Vec2::new(x, y));
    }

    /// End the current stroke
    pub fn end_stroke(&mut self) {
        self.surface.end_stroke();
    }

    /// Check if a stroke is currently in progress
    pub fn is_stroking(&self) -> bool {
        self.surface.is_stroking()
    }
}
