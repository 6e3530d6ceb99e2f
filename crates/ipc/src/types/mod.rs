//! Shared state types reported to the UI.

mod generation;
mod viewer;

pub use generation::*;
pub use viewer::*;
