use anyhow::{Result, ensure};
use std::fmt::Debug;

/// An axis-aligned bounding box in georeferenced coordinates.
///
/// The box is defined by four `f64` values:
/// - `x_min` / `x_max`: minimum and maximum easting (or longitude),
/// - `y_min` / `y_max`: minimum and maximum northing (or latitude).
///
/// No assumption is made about the coordinate reference system; the box
/// lives in whatever CRS the dataset it was derived from uses.
#[derive(Clone, Copy, PartialEq)]
pub struct GeoBBox {
	pub x_min: f64,
	pub y_min: f64,
	pub x_max: f64,
	pub y_max: f64,
}

impl GeoBBox {
	/// Creates a new `GeoBBox` from `x_min, y_min, x_max, y_max`.
	///
	/// Fails if any value is not finite or if a minimum exceeds its maximum.
	pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<GeoBBox> {
		ensure!(
			x_min.is_finite() && y_min.is_finite() && x_max.is_finite() && y_max.is_finite(),
			"bounding box values must be finite: ({x_min}, {y_min}, {x_max}, {y_max})"
		);
		ensure!(x_min <= x_max, "x_min ({x_min}) must not exceed x_max ({x_max})");
		ensure!(y_min <= y_max, "y_min ({y_min}) must not exceed y_max ({y_max})");
		Ok(GeoBBox {
			x_min,
			y_min,
			x_max,
			y_max,
		})
	}

	/// Builds a bounding box from two arbitrary corner points.
	pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<GeoBBox> {
		GeoBBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
	}

	pub fn width(&self) -> f64 {
		self.x_max - self.x_min
	}

	pub fn height(&self) -> f64 {
		self.y_max - self.y_min
	}

	/// Grows this box to also cover `other`.
	pub fn extend(&mut self, other: &GeoBBox) {
		self.x_min = self.x_min.min(other.x_min);
		self.y_min = self.y_min.min(other.y_min);
		self.x_max = self.x_max.max(other.x_max);
		self.y_max = self.y_max.max(other.y_max);
	}

	/// Returns `true` if the two boxes overlap or touch.
	pub fn intersects(&self, other: &GeoBBox) -> bool {
		self.x_min <= other.x_max && other.x_min <= self.x_max && self.y_min <= other.y_max && other.y_min <= self.y_max
	}

	/// Returns `true` if `other` lies completely inside this box.
	pub fn contains(&self, other: &GeoBBox) -> bool {
		self.x_min <= other.x_min && other.x_max <= self.x_max && self.y_min <= other.y_min && other.y_max <= self.y_max
	}

	pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
		(self.x_min, self.y_min, self.x_max, self.y_max)
	}

	/// The box outline as a closed counter-clockwise coordinate ring,
	/// suitable for building a polygon geometry.
	pub fn as_ring(&self) -> Vec<(f64, f64)> {
		vec![
			(self.x_min, self.y_min),
			(self.x_max, self.y_min),
			(self.x_max, self.y_max),
			(self.x_min, self.y_max),
			(self.x_min, self.y_min),
		]
	}
}

impl Debug for GeoBBox {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"GeoBBox({}, {}, {}, {})",
			self.x_min, self.y_min, self.x_max, self.y_max
		)
	}
}

impl TryFrom<&[f64]> for GeoBBox {
	type Error = anyhow::Error;

	fn try_from(values: &[f64]) -> Result<GeoBBox> {
		ensure!(
			values.len() == 4,
			"a bounding box needs exactly 4 values, got {}",
			values.len()
		);
		GeoBBox::new(values[0], values[1], values[2], values[3])
	}
}
