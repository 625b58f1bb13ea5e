//! Density / summation rasterization.
//!
//! Every input geometry is burned additively into a freshly created output
//! raster: a constant 1 per geometry (density) or the value of a numeric
//! attribute. Accumulation is plain addition via GDAL's rasterizer with the
//! `Add` merge algorithm; there is no other conflict resolution.

mod output_type;

pub use output_type::OutputType;

use anyhow::{Context, Result, bail, ensure};
use gdal::raster::{MergeAlgorithm, RasterCreationOptions, RasterizeOptions, rasterize};
use gdal::vector::{LayerAccess, OGRFieldType};
use gdal::{Dataset, DriverManager};
use geoproc_core::{GeoBBox, PixelWindow, progress::get_progress_bar};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SummationOptions {
	/// Output raster driver name.
	pub driver: String,
	/// Driver specific creation options as `NAME=VAL`.
	pub creation_options: Vec<String>,
	pub output_type: OutputType,
	/// Pixel size in georeferenced units as (x, y).
	pub resolution: (f64, f64),
	/// Value written to pixels no geometry ever touched.
	pub nodata: f64,
	/// Vector layer to process; default is the first one.
	pub layer: Option<String>,
	/// Numeric attribute to sum; `None` computes a plain geometry density.
	pub property: Option<String>,
	pub all_touched: bool,
}

impl Default for SummationOptions {
	fn default() -> Self {
		SummationOptions {
			driver: "GTiff".to_string(),
			creation_options: Vec::new(),
			output_type: OutputType::Float32,
			resolution: (1.0, 1.0),
			nodata: 0.0,
			layer: None,
			property: None,
			all_touched: false,
		}
	}
}

/// Rasterizes `vector` into a new single-band raster at `output_path`.
///
/// Returns the number of geometries burned.
pub fn summation_raster(vector: &Dataset, output_path: &Path, options: &SummationOptions) -> Result<usize> {
	let mut layer = match &options.layer {
		Some(name) => vector.layer_by_name(name)?,
		None => vector.layer(0)?,
	};

	let (x_res, y_res) = (options.resolution.0.abs(), options.resolution.1.abs());
	ensure!(x_res > 0.0 && y_res > 0.0, "target resolution must be non-zero");

	if let Some(property) = &options.property {
		validate_property(&layer, property)?;
	}

	let envelope = layer.get_extent().context("cannot compute the layer extent")?;
	let extent = GeoBBox::new(envelope.MinX, envelope.MinY, envelope.MaxX, envelope.MaxY)?;
	let width = (extent.width() / x_res).ceil().max(1.0) as usize;
	let height = (extent.height() / y_res).ceil().max(1.0) as usize;
	log::debug!("output raster: {width}x{height} pixels at {x_res}x{y_res}");

	let mut creation_options = RasterCreationOptions::new();
	for option in &options.creation_options {
		creation_options
			.add_string(option)
			.with_context(|| format!("invalid creation option {option:?}"))?;
	}

	let driver = DriverManager::get_driver_by_name(&options.driver)
		.with_context(|| format!("unknown raster driver {:?}", options.driver))?;
	let mut dataset = options
		.output_type
		.create_raster(&driver, output_path, width, height, &creation_options)?;

	dataset.set_geo_transform(&[extent.x_min, x_res, 0.0, extent.y_max, 0.0, -y_res])?;
	if let Some(srs) = layer.spatial_ref() {
		dataset.set_spatial_ref(&srs)?;
	}

	// Collect geometries and burn values, then let GDAL do all the work in
	// one additive rasterization pass.
	let mut geometries = Vec::new();
	let mut burn_values = Vec::new();
	for (index, feature) in layer.features().enumerate() {
		let Some(geometry) = feature.geometry() else {
			log::warn!("feature {index} has no geometry, skipping");
			continue;
		};
		let burn = match &options.property {
			None => 1.0,
			Some(property) => feature.field_as_double_by_name(property)?.unwrap_or(0.0),
		};
		geometries.push(geometry.clone());
		burn_values.push(burn);
	}

	if !geometries.is_empty() {
		rasterize(
			&mut dataset,
			&[1],
			&geometries,
			&burn_values,
			Some(RasterizeOptions {
				all_touched: options.all_touched,
				merge_algorithm: MergeAlgorithm::Add,
				..Default::default()
			}),
		)?;
	}

	write_nodata(&mut dataset, options.nodata)?;
	dataset.flush_cache()?;

	Ok(geometries.len())
}

fn validate_property(layer: &gdal::vector::Layer, property: &str) -> Result<()> {
	let defn = layer.defn();
	let field = defn
		.fields()
		.find(|field| field.name() == property)
		.with_context(|| format!("layer has no property {property:?}"))?;

	match field.field_type() {
		OGRFieldType::OFTInteger | OGRFieldType::OFTInteger64 | OGRFieldType::OFTReal => Ok(()),
		other => bail!("property {property:?} has a non-numeric field type ({other}) and cannot be summed"),
	}
}

/// Replaces never-touched pixels (still 0) with the nodata value, walking
/// the raster in its natural block windows.
fn write_nodata(dataset: &mut Dataset, nodata: f64) -> Result<()> {
	let (width, height) = dataset.raster_size();
	let mut band = dataset.rasterband(1)?;
	band.set_no_data_value(Some(nodata))?;

	if nodata == 0.0 {
		// untouched pixels already carry the nodata value
		return Ok(());
	}

	let (block_width, block_height) = band.block_size();
	let blocks = width.div_ceil(block_width) as u64 * height.div_ceil(block_height) as u64;
	let mut progress = get_progress_bar("writing nodata", blocks);

	for y in (0..height).step_by(block_height) {
		for x in (0..width).step_by(block_width) {
			let window = PixelWindow::new(
				x as isize,
				y as isize,
				block_width.min(width - x),
				block_height.min(height - y),
			);

			let mut buffer = band.read_as::<f64>(window.offset(), window.size(), window.size(), None)?;
			let mut dirty = false;
			for value in buffer.data_mut() {
				if *value == 0.0 {
					*value = nodata;
					dirty = true;
				}
			}
			if dirty {
				band.write(window.offset(), window.size(), &mut buffer)?;
			}
			progress.inc(1);
		}
	}
	progress.finish();

	Ok(())
}
