//! Streaming topology operations on newline-delimited GeoJSON.
//!
//! Every operation is a pass-through to OGR (buffer, convex hull,
//! simplification, CRS transform) or to the `geo` crate (centroid); this
//! module only parses definitions and shovels geometries through them.

mod spec;

pub use spec::OpSpec;

use crate::geometry::{bbox_polygon, envelope_bbox};
use crate::srs;
use anyhow::{Context, Result};
use gdal::cpl::CslStringList;
use gdal::spatial_ref::CoordTransform;
use gdal::vector::{Geometry, OGRwkbGeometryType};
use geo::Centroid;
use serde_json::Value;
use std::io::{BufRead, Write};

enum Op {
	Buffer { distance: f64, quadsegs: u32 },
	Centroid,
	ConvexHull,
	Envelope,
	MakeValid,
	Simplify { tolerance: f64 },
	SimplifyPreserveTopology { tolerance: f64 },
	Transform(CoordTransform),
}

/// An ordered, ready-to-run chain of topology operations.
pub struct OpChain {
	ops: Vec<Op>,
}

impl OpChain {
	/// Compiles parsed definitions into executable operations.
	///
	/// CRS definitions of `transform` operations are resolved here so that a
	/// bad definition fails before any input is consumed.
	pub fn compile(specs: &[OpSpec]) -> Result<OpChain> {
		let ops = specs
			.iter()
			.map(|spec| {
				Ok(match spec {
					OpSpec::Buffer { distance, quadsegs } => Op::Buffer {
						distance: *distance,
						quadsegs: *quadsegs,
					},
					OpSpec::Centroid => Op::Centroid,
					OpSpec::ConvexHull => Op::ConvexHull,
					OpSpec::Envelope => Op::Envelope,
					OpSpec::MakeValid => Op::MakeValid,
					OpSpec::Simplify { tolerance } => Op::Simplify { tolerance: *tolerance },
					OpSpec::SimplifyPreserveTopology { tolerance } => {
						Op::SimplifyPreserveTopology { tolerance: *tolerance }
					}
					OpSpec::Transform { source, target } => {
						let source = srs::from_user_input(source)?;
						let target = srs::from_user_input(target)?;
						Op::Transform(CoordTransform::new(&source, &target)?)
					}
				})
			})
			.collect::<Result<Vec<_>>>()?;

		Ok(OpChain { ops })
	}

	pub fn len(&self) -> usize {
		self.ops.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ops.is_empty()
	}

	/// Runs the whole chain on one geometry.
	pub fn apply(&self, mut geometry: Geometry) -> Result<Geometry> {
		for op in &self.ops {
			geometry = match op {
				Op::Buffer { distance, quadsegs } => geometry.buffer(*distance, *quadsegs)?,
				Op::Centroid => {
					let geo_geometry = geo_types::Geometry::<f64>::try_from(&geometry)?;
					let centroid = geo_geometry
						.centroid()
						.context("cannot compute the centroid of an empty geometry")?;
					let mut point = Geometry::empty(OGRwkbGeometryType::wkbPoint)?;
					point.add_point_2d((centroid.x(), centroid.y()));
					point
				}
				Op::ConvexHull => geometry.convex_hull()?,
				Op::Envelope => bbox_polygon(&envelope_bbox(&geometry)?)?,
				Op::MakeValid => geometry.make_valid(&CslStringList::new())?,
				Op::Simplify { tolerance } => geometry.simplify(*tolerance)?,
				Op::SimplifyPreserveTopology { tolerance } => geometry.simplify_preserve_topology(*tolerance)?,
				Op::Transform(transform) => geometry.transform(transform)?,
			};
		}
		Ok(geometry)
	}

	/// Runs the chain on a GeoJSON geometry value.
	fn apply_geojson(&self, value: &Value) -> Result<Value> {
		let geometry = Geometry::from_geojson(&value.to_string()).context("invalid GeoJSON geometry")?;
		let transformed = self.apply(geometry)?;
		serde_json::from_str(&transformed.json()?).context("OGR produced invalid GeoJSON")
	}
}

/// Transforms one input line: either a GeoJSON Feature (only its `geometry`
/// member is replaced) or a bare geometry object.
fn transform_line(line: &str, chain: &OpChain) -> Result<String> {
	let mut value: Value = serde_json::from_str(line).context("line is not valid JSON")?;

	if value.get("type").and_then(Value::as_str) == Some("Feature") {
		let geometry = value
			.get_mut("geometry")
			.context("feature has no `geometry` member")?;
		*geometry = chain.apply_geojson(geometry)?;
		Ok(value.to_string())
	} else {
		Ok(chain.apply_geojson(&value)?.to_string())
	}
}

/// Streams newline-delimited GeoJSON through the chain.
///
/// With `skip_failures` a failing row is logged and dropped instead of
/// aborting the stream. Returns the number of rows written.
pub fn process_stream(
	input: impl BufRead,
	output: &mut impl Write,
	chain: &OpChain,
	skip_failures: bool,
) -> Result<u64> {
	let mut written = 0;

	for (row, line) in input.lines().enumerate() {
		let line = line.context("cannot read input line")?;
		if line.trim().is_empty() {
			continue;
		}

		match transform_line(&line, chain) {
			Ok(json) => {
				writeln!(output, "{json}")?;
				written += 1;
			}
			Err(error) if skip_failures => log::warn!("skipping row {row}: {error:#}"),
			Err(error) => return Err(error.context(format!("row {row}"))),
		}
	}

	Ok(written)
}
