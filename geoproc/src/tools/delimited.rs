use anyhow::{Context, Result, ensure};
use clap::Args;
use geoproc_ops::delimited::{GeometryField, PropertyDef, RowConverter, VectorSink, convert_records, open_reader};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// input delimited text file, or `-` for stdin
	#[arg(required = true)]
	input: String,

	/// output file, or `-` for newline-delimited GeoJSON on stdout
	#[arg(required = true)]
	output: String,

	/// geometry columns: wkt:<col>, geojson:<col> or xy:<x>,<y>[,<z>]
	#[arg(long, short, value_name = "DEFINITION", required = true)]
	geometry: GeometryField,

	/// property column with optional cast as <col>[=str|int|float]
	/// (repeatable; default: every other column as str)
	#[arg(long, short, value_name = "DEFINITION", verbatim_doc_comment)]
	property: Vec<PropertyDef>,

	/// field delimiter of the input
	#[arg(long, short, default_value_t = ',')]
	delimiter: char,

	/// OGR driver of the output (ignored when writing to stdout)
	#[arg(long, short = 'f', default_value = "GeoJSON")]
	driver: String,

	/// layer name of the output
	#[arg(long, short, default_value = "features")]
	layer: String,

	/// CRS assigned to the output layer
	#[arg(long, default_value = "EPSG:4326")]
	crs: String,

	/// layer creation option as NAME=VALUE (repeatable)
	#[arg(long = "layer-option", short = 'o', value_name = "NAME=VALUE")]
	layer_options: Vec<String>,

	/// log and drop rows that fail instead of aborting
	#[arg(long, short)]
	skip_failures: bool,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	ensure!(
		arguments.delimiter.is_ascii(),
		"delimiter must be a single ASCII character"
	);
	let delimiter = arguments.delimiter as u8;

	let input: Box<dyn Read> = if arguments.input == "-" {
		Box::new(io::stdin().lock())
	} else {
		Box::new(File::open(&arguments.input).with_context(|| format!("cannot open {:?}", arguments.input))?)
	};

	let mut reader = open_reader(input, delimiter);
	let converter = RowConverter::new(reader.headers()?, arguments.geometry.clone(), &arguments.property)?;

	let written = if arguments.output == "-" {
		let mut output = BufWriter::new(io::stdout().lock());
		let written = convert_records(&mut reader, &converter, arguments.skip_failures, |feature| {
			writeln!(output, "{}", serde_json::to_string(&feature)?)?;
			Ok(())
		})?;
		output.flush()?;
		written
	} else {
		let mut sink = VectorSink::create(
			&PathBuf::from(&arguments.output),
			&arguments.driver,
			&arguments.layer,
			&arguments.crs,
			&converter,
			&arguments.layer_options,
		)?;
		let written = convert_records(&mut reader, &converter, arguments.skip_failures, |feature| {
			sink.write(&feature)
		})?;
		sink.flush()?;
		written
	};

	log::info!("wrote {written} features");
	Ok(())
}
