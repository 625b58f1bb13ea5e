//! Exports the natural block layout of a raster band as vector polygons.

use crate::geometry::bbox_polygon;
use anyhow::{Context, Result};
use gdal::vector::{FieldValue, LayerAccess, LayerOptions, OGRFieldType, OGRwkbGeometryType};
use gdal::{Dataset, DriverManager, GeoTransformEx};
use geoproc_core::{GeoBBox, PixelWindow};
use std::path::Path;

/// Writes one polygon per block window of `band_index` to a new vector
/// dataset, georeferenced via the raster geotransform. Returns the number
/// of blocks written.
pub fn blocks_to_vector(raster: &Dataset, band_index: usize, output_path: &Path, driver_name: &str) -> Result<u64> {
	let geo_transform = raster.geo_transform().context("raster has no geotransform")?;
	let (width, height) = raster.raster_size();
	let (block_width, block_height) = raster.rasterband(band_index)?.block_size();

	let driver = DriverManager::get_driver_by_name(driver_name)
		.with_context(|| format!("unknown vector driver {driver_name:?}"))?;
	let path = output_path.to_str().context("output path is not valid UTF-8")?;
	let mut dataset = driver.create_vector_only(path)?;

	let srs = raster.spatial_ref().ok();
	let mut layer = dataset.create_layer(LayerOptions {
		name: "blocks",
		srs: srs.as_ref(),
		ty: OGRwkbGeometryType::wkbPolygon,
		..Default::default()
	})?;
	layer.create_defn_fields(&[
		("col_off", OGRFieldType::OFTInteger64),
		("row_off", OGRFieldType::OFTInteger64),
		("width", OGRFieldType::OFTInteger64),
		("height", OGRFieldType::OFTInteger64),
	])?;

	let mut written = 0;
	for y in (0..height).step_by(block_height) {
		for x in (0..width).step_by(block_width) {
			let window = PixelWindow::new(
				x as isize,
				y as isize,
				block_width.min(width - x),
				block_height.min(height - y),
			);

			let (x0, y0) = geo_transform.apply(x as f64, y as f64);
			let (x1, y1) = geo_transform.apply((x + window.width) as f64, (y + window.height) as f64);
			let bbox = GeoBBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))?;

			layer.create_feature_fields(
				bbox_polygon(&bbox)?,
				&["col_off", "row_off", "width", "height"],
				&[
					FieldValue::Integer64Value(window.x_off as i64),
					FieldValue::Integer64Value(window.y_off as i64),
					FieldValue::Integer64Value(window.width as i64),
					FieldValue::Integer64Value(window.height as i64),
				],
			)?;
			written += 1;
		}
	}

	log::debug!("wrote {written} block outlines ({block_width}x{block_height} blocks)");
	Ok(written)
}
