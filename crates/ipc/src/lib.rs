//! IPC message protocol for sketchmesh
//!
//! Defines the message types exchanged between the drawing core and the UI
//! collaborators (toolbar, improve dialog, model viewer).

pub mod commands;
pub mod error;
pub mod messages;
pub mod types;

pub use commands::*;
pub use error::IpcError;
pub use messages::*;
pub use types::*;
