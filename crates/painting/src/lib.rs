//! sketchmesh painting system - raster canvas, undo history and export
//!
//! This crate provides the drawing core:
//! - [`surface`] - RGBA8 raster surface that strokes and erasures mutate
//! - [`brush`] - Rasterization of round-capped segments and discs
//! - [`history`] - Bounded snapshot stack for undo
//! - [`export`] - Autocrop bounding box and PNG encoding
//! - [`pipeline`] - [`Sketchpad`], the per-session drawing context
//! - [`validation`] - Error types and input checks

pub mod brush;
pub mod constants;
pub mod export;
pub mod history;
pub mod pipeline;
pub mod surface;
pub mod types;
pub mod validation;

pub use brush::*;
pub use constants::*;
pub use export::*;
pub use history::*;
pub use pipeline::*;
pub use surface::*;
pub use types::*;
pub use validation::*;
