//! Command types for IPC messages.

mod generation;
mod paint;

pub use generation::*;
pub use paint::*;
