//! Value types shared by the geoproc engines.

mod band_stats;
mod geo_bbox;
mod pixel_window;

pub use band_stats::BandStats;
pub use geo_bbox::GeoBBox;
pub use pixel_window::PixelWindow;
