use anyhow::{Context, Result};
use clap::Args;
use geoproc_ops::topology::{OpChain, OpSpec, process_stream};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// topology operation as `name[:arg=val[:arg=val...]]`, applied in order
	/// supported: buffer:distance=<d>[:quadsegs=<n>], centroid, convex_hull,
	/// envelope, make_valid, simplify:tolerance=<t>,
	/// simplify_preserve_topology:tolerance=<t>, transform:src=<crs>:dst=<crs>
	#[arg(long, short, value_name = "OPERATION", verbatim_doc_comment)]
	operation: Vec<OpSpec>,

	/// newline-delimited GeoJSON input file (default: stdin)
	input: Option<PathBuf>,

	/// output file (default: stdout)
	#[arg(long, short = 'O')]
	output: Option<PathBuf>,

	/// log and drop rows that fail instead of aborting
	#[arg(long, short)]
	skip_failures: bool,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let chain = OpChain::compile(&arguments.operation)?;

	let input: Box<dyn BufRead> = match &arguments.input {
		Some(path) => Box::new(BufReader::new(
			File::open(path).with_context(|| format!("cannot open {path:?}"))?,
		)),
		None => Box::new(io::stdin().lock()),
	};
	let mut output: Box<dyn Write> = match &arguments.output {
		Some(path) => Box::new(BufWriter::new(
			File::create(path).with_context(|| format!("cannot create {path:?}"))?,
		)),
		None => Box::new(io::stdout().lock()),
	};

	let written = process_stream(input, &mut output, &chain, arguments.skip_failures)?;
	output.flush()?;

	log::info!("wrote {written} rows");
	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::tests::run_command;
	use anyhow::Result;
	use std::fs;

	#[test]
	fn centroid_stream() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let input = dir.path().join("in.ndjson");
		let output = dir.path().join("out.ndjson");
		fs::write(
			&input,
			"{\"type\": \"LineString\", \"coordinates\": [[0, 0], [4, 0]]}\n",
		)?;

		run_command(vec![
			"geoproc",
			"topology",
			"-o",
			"centroid",
			"-O",
			output.to_str().unwrap(),
			input.to_str().unwrap(),
		])?;

		let text = fs::read_to_string(&output)?;
		assert!(text.contains("\"Point\""));
		Ok(())
	}

	#[test]
	fn unknown_operation_fails() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let input = dir.path().join("in.ndjson");
		fs::write(&input, "")?;

		let result = run_command(vec!["geoproc", "topology", "-o", "shrink", input.to_str().unwrap()]);
		assert!(result.is_err());
		Ok(())
	}
}
