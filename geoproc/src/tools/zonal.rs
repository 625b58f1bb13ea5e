use anyhow::{Context, Result};
use clap::Args;
use gdal::Dataset;
use geoproc_ops::zonal::{ZonalOptions, zonal_stats};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// raster file with the values
	#[arg(required = true)]
	raster: PathBuf,

	/// vector file with the zone geometries
	#[arg(required = true)]
	vector: PathBuf,

	/// comma-separated 1-based band numbers (default: all bands)
	#[arg(long, short, value_name = "BANDS")]
	bands: Option<String>,

	/// include every pixel touched by a zone, not only those whose center is covered
	#[arg(long, short)]
	all_touched: bool,

	/// also report whether each zone lies completely inside the raster extent
	#[arg(long, short)]
	contained: bool,

	/// vector layer name (default: first layer)
	#[arg(long, short)]
	layer: Option<String>,

	/// write the JSON report to this file instead of stdout
	#[arg(long, short)]
	output: Option<PathBuf>,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let raster = Dataset::open(&arguments.raster).with_context(|| format!("cannot open {:?}", arguments.raster))?;
	let vector = Dataset::open(&arguments.vector).with_context(|| format!("cannot open {:?}", arguments.vector))?;

	let options = ZonalOptions {
		bands: arguments.bands.as_deref().map(parse_bands).transpose()?,
		all_touched: arguments.all_touched,
		contained: arguments.contained,
		layer: arguments.layer.clone(),
	};
	let stats = zonal_stats(&raster, &vector, &options)?;
	log::info!("computed statistics for {} features", stats.len());

	let mut output: Box<dyn Write> = match &arguments.output {
		Some(path) => Box::new(BufWriter::new(
			File::create(path).with_context(|| format!("cannot create {path:?}"))?,
		)),
		None => Box::new(io::stdout().lock()),
	};
	serde_json::to_writer_pretty(&mut output, &stats)?;
	writeln!(output)?;
	output.flush()?;

	Ok(())
}

fn parse_bands(text: &str) -> Result<Vec<usize>> {
	text
		.split(',')
		.map(|part| {
			part
				.trim()
				.parse::<usize>()
				.with_context(|| format!("invalid band number {part:?}"))
		})
		.collect()
}
