//! The engines behind the geoproc command-line tools.
//!
//! Each module implements one tool as a thin orchestration layer over GDAL
//! (vector/raster I/O, OGR geometry operations, rasterization, CRS
//! transforms) and the georust crates (`geo`, `geojson`). There is
//! deliberately no geometry kernel, spatial index or raster codec in here;
//! the libraries do all of the genuinely hard work.

pub mod blocks;
pub mod delimited;
pub mod geometry;
pub mod srs;
pub mod summation;
pub mod topology;
pub mod zonal;
