//! Converts delimited text (CSV and friends) into vector features.
//!
//! One column (or an x/y column pair) carries the geometry, the remaining
//! columns become properties with an optional type cast. Rows stream through
//! one at a time; output goes either to newline-delimited GeoJSON or to any
//! OGR vector driver via [`VectorSink`].

mod field;

pub use field::{GeometryField, PropertyDef, PropertyType};

use crate::srs;
use anyhow::{Context, Result, ensure};
use gdal::vector::{Defn, Feature, LayerAccess, LayerOptions, OGRFieldType};
use gdal::{Dataset, DriverManager};
use geojson::feature::Id;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// A property column resolved against the input header.
struct Column {
	name: String,
	index: usize,
	cast: PropertyType,
}

/// Turns one delimited record into a GeoJSON feature.
pub struct RowConverter {
	geometry: GeometryField,
	geometry_indices: Vec<usize>,
	columns: Vec<Column>,
}

impl RowConverter {
	/// Resolves the geometry definition and property casts against the file
	/// header. Without explicit property definitions every non-geometry
	/// column is kept as a string.
	pub fn new(headers: &csv::StringRecord, geometry: GeometryField, properties: &[PropertyDef]) -> Result<RowConverter> {
		let positions: BTreeMap<&str, usize> = headers.iter().enumerate().map(|(i, name)| (name, i)).collect();
		let position = |name: &str| {
			positions
				.get(name)
				.copied()
				.with_context(|| format!("column {name:?} does not exist in the input header"))
		};

		let geometry_indices = geometry
			.field_names()
			.into_iter()
			.map(|name| position(name))
			.collect::<Result<Vec<_>>>()?;

		let columns = if properties.is_empty() {
			headers
				.iter()
				.enumerate()
				.filter(|(index, _)| !geometry_indices.contains(index))
				.map(|(index, name)| Column {
					name: name.to_string(),
					index,
					cast: PropertyType::Str,
				})
				.collect()
		} else {
			properties
				.iter()
				.map(|definition| {
					Ok(Column {
						name: definition.field.clone(),
						index: position(&definition.field)?,
						cast: definition.cast,
					})
				})
				.collect::<Result<Vec<_>>>()?
		};

		Ok(RowConverter {
			geometry,
			geometry_indices,
			columns,
		})
	}

	/// The resolved property columns as (name, cast) pairs, in output order.
	pub fn properties(&self) -> Vec<(&str, PropertyType)> {
		self.columns.iter().map(|c| (c.name.as_str(), c.cast)).collect()
	}

	pub fn geometry_field(&self) -> &GeometryField {
		&self.geometry
	}

	/// Converts one record. `row` becomes the feature id.
	pub fn convert(&self, record: &csv::StringRecord, row: u64) -> Result<geojson::Feature> {
		let geometry = self.parse_geometry(record)?;

		let mut properties = Map::new();
		for column in &self.columns {
			properties.insert(column.name.clone(), column.cast.cast(cell(record, column.index)?)?);
		}

		Ok(geojson::Feature {
			bbox: None,
			geometry,
			id: Some(Id::Number(row.into())),
			properties: Some(properties),
			foreign_members: None,
		})
	}

	fn parse_geometry(&self, record: &csv::StringRecord) -> Result<Option<geojson::Geometry>> {
		let value = match &self.geometry {
			GeometryField::Wkt(_) => {
				let wkt = cell(record, self.geometry_indices[0])?;
				if wkt.trim().is_empty() {
					return Ok(None);
				}
				let geometry = gdal::vector::Geometry::from_wkt(wkt).context("invalid WKT geometry")?;
				serde_json::from_str(&geometry.json()?)?
			}
			GeometryField::GeoJson(_) => {
				let json = cell(record, self.geometry_indices[0])?;
				if json.trim().is_empty() {
					return Ok(None);
				}
				serde_json::from_str::<geojson::Geometry>(json).context("invalid GeoJSON geometry")?
			}
			GeometryField::Xy { z, .. } => {
				let x = parse_coordinate(cell(record, self.geometry_indices[0])?, "x")?;
				let y = parse_coordinate(cell(record, self.geometry_indices[1])?, "y")?;
				let mut coordinates = vec![x, y];
				if z.is_some() {
					coordinates.push(parse_coordinate(cell(record, self.geometry_indices[2])?, "z")?);
				}
				geojson::Geometry::new(geojson::Value::Point(coordinates))
			}
		};
		Ok(Some(value))
	}
}

fn cell(record: &csv::StringRecord, index: usize) -> Result<&str> {
	record
		.get(index)
		.with_context(|| format!("row has only {} columns", record.len()))
}

fn parse_coordinate(value: &str, axis: &str) -> Result<f64> {
	value
		.trim()
		.parse::<f64>()
		.with_context(|| format!("{axis} coordinate {value:?} is not a number"))
}

/// Opens a delimited reader over any input stream.
pub fn open_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
	csv::ReaderBuilder::new().delimiter(delimiter).from_reader(reader)
}

/// Streams all remaining records of `reader` through `sink`.
///
/// With `skip_failures` a failing row is logged and dropped; sink errors
/// always abort. Returns the number of features written.
pub fn convert_records<R: Read>(
	reader: &mut csv::Reader<R>,
	converter: &RowConverter,
	skip_failures: bool,
	mut sink: impl FnMut(geojson::Feature) -> Result<()>,
) -> Result<u64> {
	let mut written = 0;
	for (row, record) in reader.records().enumerate() {
		let row = row as u64;
		let result = record
			.map_err(anyhow::Error::from)
			.and_then(|record| converter.convert(&record, row));
		match result {
			Ok(feature) => {
				sink(feature)?;
				written += 1;
			}
			Err(error) if skip_failures => log::warn!("skipping row {row}: {error:#}"),
			Err(error) => return Err(error.context(format!("row {row}"))),
		}
	}

	Ok(written)
}

/// Writes features through an OGR vector driver.
pub struct VectorSink {
	dataset: Dataset,
}

impl VectorSink {
	pub fn create(
		path: &Path,
		driver_name: &str,
		layer_name: &str,
		crs: &str,
		converter: &RowConverter,
		layer_options: &[String],
	) -> Result<VectorSink> {
		let driver = DriverManager::get_driver_by_name(driver_name)
			.with_context(|| format!("unknown vector driver {driver_name:?}"))?;
		let path = path.to_str().context("output path is not valid UTF-8")?;
		let mut dataset = driver.create_vector_only(path)?;

		let srs = srs::from_user_input(crs)?;
		let option_refs: Vec<&str> = layer_options.iter().map(String::as_str).collect();
		let mut layer = dataset.create_layer(LayerOptions {
			name: layer_name,
			srs: Some(&srs),
			ty: converter.geometry_field().wkb_type(),
			options: if option_refs.is_empty() { None } else { Some(&option_refs) },
		})?;

		let fields: Vec<(&str, u32)> = converter
			.properties()
			.into_iter()
			.map(|(name, cast)| {
				let field_type = match cast {
					PropertyType::Str => OGRFieldType::OFTString,
					PropertyType::Int => OGRFieldType::OFTInteger64,
					PropertyType::Float => OGRFieldType::OFTReal,
				};
				(name, field_type)
			})
			.collect();
		layer.create_defn_fields(&fields)?;

		Ok(VectorSink { dataset })
	}

	pub fn write(&mut self, feature: &geojson::Feature) -> Result<()> {
		let layer = self.dataset.layer(0)?;
		let defn = Defn::from_layer(&layer);
		let mut target = Feature::new(&defn)?;

		if let Some(geometry) = &feature.geometry {
			let geometry = gdal::vector::Geometry::from_geojson(&serde_json::to_string(geometry)?)?;
			target.set_geometry(geometry)?;
		}

		if let Some(properties) = &feature.properties {
			for (name, value) in properties {
				match value {
					Value::Null => {}
					Value::String(text) => target.set_field_string(name, text)?,
					Value::Number(number) if number.is_i64() => {
						target.set_field_integer64(name, number.as_i64().unwrap_or_default())?;
					}
					Value::Number(number) => {
						target.set_field_double(name, number.as_f64().context("non-finite property value")?)?;
					}
					other => target.set_field_string(name, &other.to_string())?,
				}
			}
		}

		target.create(&layer)?;
		Ok(())
	}

	pub fn flush(&mut self) -> Result<()> {
		self.dataset.flush_cache()?;
		Ok(())
	}
}
