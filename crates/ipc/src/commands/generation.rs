//! Commands driving the enhance and mesh jobs.

use serde::{Deserialize, Serialize};

/// Commands issued from the improve dialog and the viewer toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GenerationCommand {
    /// Export the cropped sketch and run enhance followed by mesh generation
    Improve {
        prompt: String,
        #[serde(default)]
        negative_prompt: Option<String>,
    },
    /// Dismiss the workflow and drop any in-flight job
    Reset,
    /// Show or hide the generated model
    ToggleModel,
}
