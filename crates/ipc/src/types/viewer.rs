//! State consumed by the model viewer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The viewer only sees a mesh location and a visibility toggle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewerState {
    /// Where the last generated mesh was written
    pub mesh_path: Option<PathBuf>,
    pub show_model: bool,
}

impl ViewerState {
    /// Flip visibility. There is nothing to show until a mesh exists.
    pub fn toggle(&mut self) -> bool {
        self.show_model = !self.show_model && self.mesh_path.is_some();
        self.show_model
    }

    /// Forget the mesh and hide the viewer
    pub fn clear(&mut self) {
        self.mesh_path = None;
        self.show_model = false;
    }
}
