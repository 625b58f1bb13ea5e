use anyhow::{Context, Result};
use clap::Args;
use gdal::Dataset;
use geoproc_ops::blocks::blocks_to_vector;
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// input raster file
	#[arg(required = true)]
	raster: PathBuf,

	/// output vector file
	#[arg(required = true)]
	output: PathBuf,

	/// 1-based band number
	#[arg(long, short, default_value_t = 1)]
	band: usize,

	/// OGR driver of the output
	#[arg(long, short = 'f', default_value = "ESRI Shapefile")]
	driver: String,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let raster = Dataset::open(&arguments.raster).with_context(|| format!("cannot open {:?}", arguments.raster))?;
	let written = blocks_to_vector(&raster, arguments.band, &arguments.output, &arguments.driver)?;

	log::info!("wrote {written} block outlines to {:?}", arguments.output);
	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::tests::run_command;
	use anyhow::Result;
	use gdal::raster::RasterCreationOptions;
	use gdal::{Dataset, DriverManager};
	use gdal::vector::LayerAccess;

	#[test]
	fn blocks_of_a_small_raster() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let raster = dir.path().join("r.tif");
		let output = dir.path().join("blocks.json");

		let driver = DriverManager::get_driver_by_name("GTiff")?;
		let mut dataset =
			driver.create_with_band_type_with_options::<u8, _>(&raster, 8, 8, 1, &RasterCreationOptions::new())?;
		dataset.set_geo_transform(&[0.0, 1.0, 0.0, 8.0, 0.0, -1.0])?;
		drop(dataset);

		run_command(vec![
			"geoproc",
			"blocks",
			"-f",
			"GeoJSON",
			raster.to_str().unwrap(),
			output.to_str().unwrap(),
		])?;

		let dataset = Dataset::open(&output)?;
		assert!(dataset.layer(0)?.feature_count() > 0);
		Ok(())
	}

	#[test]
	fn missing_raster_fails() {
		assert!(run_command(vec!["geoproc", "blocks", "nope.tif", "out.shp"]).is_err());
	}
}
