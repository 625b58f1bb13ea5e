mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{ErrorLevel, Verbosity};

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	propagate_version = true,
	disable_help_subcommand = true,
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[command(flatten)]
	verbose: Verbosity<ErrorLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Run topology operations on a stream of GeoJSON geometries
	Topology(tools::topology::Subcommand),

	/// Compute per-feature band statistics of a raster
	Zonal(tools::zonal::Subcommand),

	/// Rasterize vector features into a summation/density raster
	Summation(tools::summation::Subcommand),

	/// Convert delimited text into vector features
	Delimited(tools::delimited::Subcommand),

	/// Export the block layout of a raster band as polygons
	Blocks(tools::blocks::Subcommand),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(cli.verbose.log_level_filter())
		.format_timestamp(None)
		.init();

	run(cli)
}

fn run(cli: Cli) -> Result<()> {
	match &cli.command {
		Commands::Topology(arguments) => tools::topology::run(arguments),
		Commands::Zonal(arguments) => tools::zonal::run(arguments),
		Commands::Summation(arguments) => tools::summation::run(arguments),
		Commands::Delimited(arguments) => tools::delimited::run(arguments),
		Commands::Blocks(arguments) => tools::blocks::run(arguments),
	}
}
