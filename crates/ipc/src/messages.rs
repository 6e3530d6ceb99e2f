//! Main IPC message enums for communication between the core and the UI.

use serde::{Deserialize, Serialize};

use crate::commands::{GenerationCommand, PaintCommand};
use crate::error::IpcError;
use crate::types::{GenerationStatus, ViewerState};

/// Messages from the UI to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UiToApp {
    /// Drawing surface and toolbar commands
    Paint(PaintCommand),
    /// Improve dialog and viewer commands
    Generation(GenerationCommand),
}

/// Messages from the core to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AppToUi {
    /// Generation phase or progress changed
    GenerationStatus(GenerationStatus),
    /// Viewer mesh or visibility changed
    ViewerChanged(ViewerState),
    /// Undo depth changed (enables/disables the undo button)
    HistoryChanged { depth: usize },
    /// A file was written (download, sketch export, generated assets)
    ArtifactSaved { kind: String, path: String },
    /// Error notification
    Error { code: String, message: String },
}

impl UiToApp {
    pub fn from_json(text: &str) -> Result<Self, IpcError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl AppToUi {
    pub fn to_json(&self) -> Result<String, IpcError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Parse a recorded session: a JSON array of [`UiToApp`] messages.
pub fn parse_script(text: &str) -> Result<Vec<UiToApp>, IpcError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_array() {
        return Err(IpcError::InvalidFormat(
            "session script must be a JSON array".to_string(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}
