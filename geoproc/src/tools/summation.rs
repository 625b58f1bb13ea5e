use anyhow::{Context, Result, ensure};
use clap::Args;
use gdal::Dataset;
use geoproc_ops::summation::{OutputType, SummationOptions, summation_raster};
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// vector file with the features to rasterize
	#[arg(required = true)]
	vector: PathBuf,

	/// output raster file
	#[arg(required = true)]
	output: PathBuf,

	/// pixel size; give once for square pixels or twice for x and y
	#[arg(long, short, value_name = "RESOLUTION", required = true)]
	resolution: Vec<f64>,

	/// numeric property to sum per pixel (default: count geometries)
	#[arg(long, short)]
	property: Option<String>,

	/// vector layer name (default: first layer)
	#[arg(long, short)]
	layer: Option<String>,

	/// pixel type: byte, uint16, int16, uint32, int32, float32 or float64
	#[arg(long, short = 't', default_value = "float32")]
	output_type: OutputType,

	/// output raster driver
	#[arg(long, short = 'f', default_value = "GTiff")]
	driver: String,

	/// driver creation option as NAME=VALUE (repeatable)
	#[arg(long = "creation-option", short = 'c', value_name = "NAME=VALUE")]
	creation_options: Vec<String>,

	/// value written to pixels no geometry touched
	#[arg(long, short, default_value_t = 0.0, allow_hyphen_values = true)]
	nodata: f64,

	/// burn every pixel touched by a geometry, not only those whose center is covered
	#[arg(long, short)]
	all_touched: bool,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	ensure!(
		(1..=2).contains(&arguments.resolution.len()),
		"--resolution takes one or two values"
	);
	let x_res = arguments.resolution[0];
	let y_res = arguments.resolution.get(1).copied().unwrap_or(x_res);

	let vector = Dataset::open(&arguments.vector).with_context(|| format!("cannot open {:?}", arguments.vector))?;

	let options = SummationOptions {
		driver: arguments.driver.clone(),
		creation_options: arguments.creation_options.clone(),
		output_type: arguments.output_type,
		resolution: (x_res, y_res),
		nodata: arguments.nodata,
		layer: arguments.layer.clone(),
		property: arguments.property.clone(),
		all_touched: arguments.all_touched,
	};
	let burned = summation_raster(&vector, &arguments.output, &options)?;

	log::info!("burned {burned} geometries into {:?}", arguments.output);
	Ok(())
}
