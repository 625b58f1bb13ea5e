use anyhow::{Result, bail};
use gdal::raster::RasterCreationOptions;
use gdal::{Dataset, Driver};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Pixel type of the output raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
	Byte,
	UInt16,
	Int16,
	UInt32,
	Int32,
	#[default]
	Float32,
	Float64,
}

impl OutputType {
	/// Creates a single-band raster of this pixel type.
	pub fn create_raster(
		self,
		driver: &Driver,
		path: &Path,
		width: usize,
		height: usize,
		options: &RasterCreationOptions,
	) -> Result<Dataset> {
		Ok(match self {
			OutputType::Byte => driver.create_with_band_type_with_options::<u8, _>(path, width, height, 1, options)?,
			OutputType::UInt16 => driver.create_with_band_type_with_options::<u16, _>(path, width, height, 1, options)?,
			OutputType::Int16 => driver.create_with_band_type_with_options::<i16, _>(path, width, height, 1, options)?,
			OutputType::UInt32 => driver.create_with_band_type_with_options::<u32, _>(path, width, height, 1, options)?,
			OutputType::Int32 => driver.create_with_band_type_with_options::<i32, _>(path, width, height, 1, options)?,
			OutputType::Float32 => driver.create_with_band_type_with_options::<f32, _>(path, width, height, 1, options)?,
			OutputType::Float64 => driver.create_with_band_type_with_options::<f64, _>(path, width, height, 1, options)?,
		})
	}

	pub fn as_str(self) -> &'static str {
		match self {
			OutputType::Byte => "byte",
			OutputType::UInt16 => "uint16",
			OutputType::Int16 => "int16",
			OutputType::UInt32 => "uint32",
			OutputType::Int32 => "int32",
			OutputType::Float32 => "float32",
			OutputType::Float64 => "float64",
		}
	}
}

impl fmt::Display for OutputType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OutputType {
	type Err = anyhow::Error;

	fn from_str(value: &str) -> Result<OutputType> {
		Ok(match value.to_ascii_lowercase().as_str() {
			"byte" | "uint8" => OutputType::Byte,
			"uint16" => OutputType::UInt16,
			"int16" => OutputType::Int16,
			"uint32" => OutputType::UInt32,
			"int32" => OutputType::Int32,
			"float32" => OutputType::Float32,
			"float64" => OutputType::Float64,
			other => bail!("unknown output type {other:?}"),
		})
	}
}
