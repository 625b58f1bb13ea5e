use anyhow::{Context, Result, bail, ensure};
use gdal::vector::OGRwkbGeometryType;
use serde_json::Value;
use std::str::FromStr;

/// Where the geometry of each row comes from, as `wkt:<col>`,
/// `geojson:<col>` or `xy:<x_col>,<y_col>[,<z_col>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryField {
	Wkt(String),
	GeoJson(String),
	Xy { x: String, y: String, z: Option<String> },
}

impl GeometryField {
	/// The input columns this definition consumes, in fixed order.
	pub fn field_names(&self) -> Vec<&str> {
		match self {
			GeometryField::Wkt(name) | GeometryField::GeoJson(name) => vec![name],
			GeometryField::Xy { x, y, z } => {
				let mut names = vec![x.as_str(), y.as_str()];
				if let Some(z) = z {
					names.push(z);
				}
				names
			}
		}
	}

	pub fn wkb_type(&self) -> OGRwkbGeometryType::Type {
		match self {
			GeometryField::Xy { .. } => OGRwkbGeometryType::wkbPoint,
			_ => OGRwkbGeometryType::wkbUnknown,
		}
	}
}

impl FromStr for GeometryField {
	type Err = anyhow::Error;

	fn from_str(definition: &str) -> Result<GeometryField> {
		let (kind, fields) = definition
			.split_once(':')
			.with_context(|| format!("geometry definition {definition:?} is not of the form `type:field`"))?;
		ensure!(!fields.is_empty(), "geometry definition {definition:?} names no column");

		Ok(match kind {
			"wkt" => GeometryField::Wkt(fields.to_string()),
			"geojson" => GeometryField::GeoJson(fields.to_string()),
			"xy" => {
				let parts: Vec<&str> = fields.split(',').collect();
				ensure!(
					(2..=3).contains(&parts.len()) && parts.iter().all(|p| !p.is_empty()),
					"`xy` needs two or three comma-separated column names, got {fields:?}"
				);
				GeometryField::Xy {
					x: parts[0].to_string(),
					y: parts[1].to_string(),
					z: parts.get(2).map(ToString::to_string),
				}
			}
			other => bail!("unknown geometry type {other:?} (expected wkt, geojson or xy)"),
		})
	}
}

/// Target type of a property column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyType {
	#[default]
	Str,
	Int,
	Float,
}

impl PropertyType {
	/// Casts one cell. Empty cells become `null` regardless of type.
	pub fn cast(self, value: &str) -> Result<Value> {
		if value.is_empty() {
			return Ok(Value::Null);
		}
		Ok(match self {
			PropertyType::Str => Value::String(value.to_string()),
			PropertyType::Int => {
				let number = value
					.trim()
					.parse::<i64>()
					.with_context(|| format!("{value:?} is not an integer"))?;
				Value::Number(number.into())
			}
			PropertyType::Float => {
				let number = value
					.trim()
					.parse::<f64>()
					.with_context(|| format!("{value:?} is not a number"))?;
				Value::Number(serde_json::Number::from_f64(number).context("non-finite numbers cannot be represented")?)
			}
		})
	}
}

impl FromStr for PropertyType {
	type Err = anyhow::Error;

	fn from_str(value: &str) -> Result<PropertyType> {
		Ok(match value {
			"str" => PropertyType::Str,
			"int" => PropertyType::Int,
			"float" => PropertyType::Float,
			other => bail!("unknown property type {other:?} (expected str, int or float)"),
		})
	}
}

/// A property column definition as `<col>[=<type>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
	pub field: String,
	pub cast: PropertyType,
}

impl FromStr for PropertyDef {
	type Err = anyhow::Error;

	fn from_str(definition: &str) -> Result<PropertyDef> {
		let (field, cast) = match definition.split_once('=') {
			Some((field, cast)) => (field, cast.parse()?),
			None => (definition, PropertyType::default()),
		};
		ensure!(!field.is_empty(), "property definition {definition:?} names no column");
		Ok(PropertyDef {
			field: field.to_string(),
			cast,
		})
	}
}
