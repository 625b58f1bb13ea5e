//! Shared plumbing for the geoproc tools: bounding boxes, pixel windows,
//! band statistics and a terminal progress bar.
//!
//! Everything geometric in here is bookkeeping around values produced by
//! GDAL; the actual geodesy lives in the external libraries.

pub mod progress;
pub mod types;

pub use types::{BandStats, GeoBBox, PixelWindow};
