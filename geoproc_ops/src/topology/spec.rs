use anyhow::{Context, Result, bail, ensure};
use std::collections::BTreeMap;
use std::str::FromStr;

const DEFAULT_QUADSEGS: u32 = 30;

/// A parsed topology operation definition of the form
/// `name[:arg=val[:arg=val...]]`.
///
/// This is pure data so that definitions can be validated (and unit tested)
/// before any input is consumed; compiling them into executable operations
/// happens in [`OpChain::compile`](super::OpChain::compile).
#[derive(Debug, Clone, PartialEq)]
pub enum OpSpec {
	Buffer { distance: f64, quadsegs: u32 },
	Centroid,
	ConvexHull,
	Envelope,
	MakeValid,
	Simplify { tolerance: f64 },
	SimplifyPreserveTopology { tolerance: f64 },
	Transform { source: String, target: String },
}

impl FromStr for OpSpec {
	type Err = anyhow::Error;

	fn from_str(definition: &str) -> Result<OpSpec> {
		let mut parts = definition.split(':');
		let name = parts.next().unwrap_or_default();
		let mut args = ArgMap::parse(parts)?;

		let spec = match name {
			"buffer" => OpSpec::Buffer {
				distance: args.take_f64("distance")?.context("buffer needs a `distance` argument")?,
				quadsegs: args.take_u32("quadsegs")?.unwrap_or(DEFAULT_QUADSEGS),
			},
			"centroid" => OpSpec::Centroid,
			"convex_hull" => OpSpec::ConvexHull,
			"envelope" => OpSpec::Envelope,
			"make_valid" => OpSpec::MakeValid,
			"simplify" => OpSpec::Simplify {
				tolerance: args
					.take_f64("tolerance")?
					.context("simplify needs a `tolerance` argument")?,
			},
			"simplify_preserve_topology" => OpSpec::SimplifyPreserveTopology {
				tolerance: args
					.take_f64("tolerance")?
					.context("simplify_preserve_topology needs a `tolerance` argument")?,
			},
			"transform" => OpSpec::Transform {
				source: args.take("src").context("transform needs a `src` CRS argument")?,
				target: args.take("dst").context("transform needs a `dst` CRS argument")?,
			},
			other => bail!("unknown topology operation {other:?}"),
		};

		args.finish(name)?;
		Ok(spec)
	}
}

/// Key/value arguments of an operation definition.
struct ArgMap(BTreeMap<String, String>);

impl ArgMap {
	fn parse<'a>(parts: impl Iterator<Item = &'a str>) -> Result<ArgMap> {
		let mut pairs: Vec<(String, String)> = Vec::new();
		for part in parts {
			match part.split_once('=') {
				Some((key, value)) => {
					ensure!(!key.is_empty(), "argument {part:?} has an empty key");
					pairs.push((key.to_string(), value.to_string()));
				}
				// A part without `=` continues the previous value; this keeps
				// colons inside argument values (e.g. `src=EPSG:4326`) intact.
				None => {
					let (_, value) = pairs
						.last_mut()
						.with_context(|| format!("argument {part:?} is not of the form `key=val`"))?;
					value.push(':');
					value.push_str(part);
				}
			}
		}

		let mut map = BTreeMap::new();
		for (key, value) in pairs {
			ensure!(map.insert(key.clone(), value).is_none(), "argument {key:?} given twice");
		}
		Ok(ArgMap(map))
	}

	fn take(&mut self, key: &str) -> Option<String> {
		self.0.remove(key)
	}

	fn take_f64(&mut self, key: &str) -> Result<Option<f64>> {
		self
			.take(key)
			.map(|v| v.parse::<f64>().with_context(|| format!("argument {key:?}: {v:?} is not a number")))
			.transpose()
	}

	fn take_u32(&mut self, key: &str) -> Result<Option<u32>> {
		self
			.take(key)
			.map(|v| {
				v.parse::<u32>()
					.with_context(|| format!("argument {key:?}: {v:?} is not a non-negative integer"))
			})
			.transpose()
	}

	fn finish(self, operation: &str) -> Result<()> {
		ensure!(
			self.0.is_empty(),
			"operation {operation:?} does not understand arguments: {}",
			self.0.keys().cloned().collect::<Vec<_>>().join(", ")
		);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn buffer_with_defaults() -> Result<()> {
		assert_eq!(
			"buffer:distance=15".parse::<OpSpec>()?,
			OpSpec::Buffer {
				distance: 15.0,
				quadsegs: 30
			}
		);
		assert_eq!(
			"buffer:distance=-2.5:quadsegs=8".parse::<OpSpec>()?,
			OpSpec::Buffer {
				distance: -2.5,
				quadsegs: 8
			}
		);
		Ok(())
	}

	#[rstest]
	#[case("centroid", OpSpec::Centroid)]
	#[case("convex_hull", OpSpec::ConvexHull)]
	#[case("envelope", OpSpec::Envelope)]
	#[case("make_valid", OpSpec::MakeValid)]
	fn argument_free_operations(#[case] input: &str, #[case] expected: OpSpec) {
		assert_eq!(input.parse::<OpSpec>().unwrap(), expected);
	}

	#[test]
	fn simplify_variants() -> Result<()> {
		assert_eq!(
			"simplify:tolerance=0.5".parse::<OpSpec>()?,
			OpSpec::Simplify { tolerance: 0.5 }
		);
		assert_eq!(
			"simplify_preserve_topology:tolerance=1".parse::<OpSpec>()?,
			OpSpec::SimplifyPreserveTopology { tolerance: 1.0 }
		);
		Ok(())
	}

	#[test]
	fn transform_takes_two_crs() -> Result<()> {
		assert_eq!(
			"transform:src=EPSG:4326:dst=EPSG:3857".parse::<OpSpec>()?,
			OpSpec::Transform {
				source: "EPSG:4326".to_string(),
				target: "EPSG:3857".to_string(),
			}
		);
		Ok(())
	}

	#[rstest]
	#[case("grow")]
	#[case("buffer")]
	#[case("buffer:distance=abc")]
	#[case("buffer:distance=1:width=2")]
	#[case("centroid:distance=1")]
	#[case("simplify")]
	#[case("buffer:distance")]
	fn invalid_definitions(#[case] input: &str) {
		assert!(input.parse::<OpSpec>().is_err());
	}
}
