//! Undo functionality for the drawing session

use tracing::{debug, warn};

use super::Sketchpad;

impl Sketchpad {
    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Get the number of undo levels available
    pub fn undo_count(&self) -> usize {
        self.history.len()
    }

    /// Restore the canvas to its state before the last stroke or clear
    ///
    /// Returns true if an undo was performed, false if no undo available.
    /// An in-progress stroke is abandoned.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            debug!("Undo: no entries available");
            return false;
        };

        if let Err(e) = self.surface.restore(&snapshot) {
            warn!("Undo: dropping snapshot that no longer fits the canvas: {}", e);
            return false;
        }

        debug!("Undo restored {}x{} snapshot, {} left", snapshot.width(), snapshot.height(), self.history.len());
        true
    }
}
