use crate::types::GeoBBox;
use anyhow::{Context, Result, ensure};
use gdal::{GeoTransform, GeoTransformEx};

/// A rectangular window in raster pixel coordinates.
///
/// Offsets may be negative before the window has been clamped to a raster:
/// a window derived from a geometry that sticks out of the raster extent
/// simply starts before pixel (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
	pub x_off: isize,
	pub y_off: isize,
	pub width: usize,
	pub height: usize,
}

impl PixelWindow {
	pub fn new(x_off: isize, y_off: isize, width: usize, height: usize) -> PixelWindow {
		PixelWindow {
			x_off,
			y_off,
			width,
			height,
		}
	}

	/// Computes the pixel window covering `bbox` under `geo_transform`.
	///
	/// Inverting the transform and mapping all four corners keeps this
	/// correct for rotated/sheared rasters, not just north-up ones.
	pub fn from_bbox(bbox: &GeoBBox, geo_transform: &GeoTransform) -> Result<PixelWindow> {
		let inverse = geo_transform.invert().context("geotransform is not invertible")?;

		let corners = [
			(bbox.x_min, bbox.y_min),
			(bbox.x_min, bbox.y_max),
			(bbox.x_max, bbox.y_min),
			(bbox.x_max, bbox.y_max),
		];

		let mut col_min = f64::INFINITY;
		let mut col_max = f64::NEG_INFINITY;
		let mut row_min = f64::INFINITY;
		let mut row_max = f64::NEG_INFINITY;
		for (x, y) in corners {
			let (col, row) = inverse.apply(x, y);
			col_min = col_min.min(col);
			col_max = col_max.max(col);
			row_min = row_min.min(row);
			row_max = row_max.max(row);
		}

		let x_off = col_min.floor() as isize;
		let y_off = row_min.floor() as isize;
		let width = (col_max.ceil() as isize - x_off).max(0) as usize;
		let height = (row_max.ceil() as isize - y_off).max(0) as usize;

		Ok(PixelWindow::new(x_off, y_off, width, height))
	}

	/// Expands the window outwards so that it starts and ends on block
	/// boundaries of `block_size`.
	pub fn snap_to_blocks(&self, block_size: (usize, usize)) -> Result<PixelWindow> {
		let (bw, bh) = (block_size.0 as isize, block_size.1 as isize);
		ensure!(bw > 0 && bh > 0, "block size must be positive: {block_size:?}");

		let x0 = self.x_off.div_euclid(bw) * bw;
		let y0 = self.y_off.div_euclid(bh) * bh;
		let x1 = (self.x_off + self.width as isize).div_euclid(bw) * bw
			+ if (self.x_off + self.width as isize).rem_euclid(bw) > 0 { bw } else { 0 };
		let y1 = (self.y_off + self.height as isize).div_euclid(bh) * bh
			+ if (self.y_off + self.height as isize).rem_euclid(bh) > 0 { bh } else { 0 };

		Ok(PixelWindow::new(x0, y0, (x1 - x0) as usize, (y1 - y0) as usize))
	}

	/// Intersects the window with a raster of `raster_size` pixels.
	///
	/// Returns `None` if nothing remains.
	pub fn clamp(&self, raster_size: (usize, usize)) -> Option<PixelWindow> {
		let x0 = self.x_off.max(0);
		let y0 = self.y_off.max(0);
		let x1 = (self.x_off + self.width as isize).min(raster_size.0 as isize);
		let y1 = (self.y_off + self.height as isize).min(raster_size.1 as isize);

		if x0 >= x1 || y0 >= y1 {
			return None;
		}
		Some(PixelWindow::new(x0, y0, (x1 - x0) as usize, (y1 - y0) as usize))
	}

	pub fn is_empty(&self) -> bool {
		self.width == 0 || self.height == 0
	}

	/// Offset in the form GDAL's read/write calls expect.
	pub fn offset(&self) -> (isize, isize) {
		(self.x_off, self.y_off)
	}

	/// Size in the form GDAL's read/write calls expect.
	pub fn size(&self) -> (usize, usize) {
		(self.width, self.height)
	}

	pub fn pixel_count(&self) -> usize {
		self.width * self.height
	}

	/// The geotransform of a raster that covers exactly this window, derived
	/// from the geotransform of the parent raster.
	pub fn geo_transform(&self, parent: &GeoTransform) -> GeoTransform {
		let x = self.x_off as f64;
		let y = self.y_off as f64;
		[
			parent[0] + x * parent[1] + y * parent[2],
			parent[1],
			parent[2],
			parent[3] + x * parent[4] + y * parent[5],
			parent[4],
			parent[5],
		]
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	// 10m pixels, origin at (1000, 2000), north-up
	const GT: GeoTransform = [1000.0, 10.0, 0.0, 2000.0, 0.0, -10.0];

	#[test]
	fn bbox_to_window() -> Result<()> {
		let bbox = GeoBBox::new(1020.0, 1950.0, 1060.0, 1990.0)?;
		let window = PixelWindow::from_bbox(&bbox, &GT)?;
		assert_eq!(window, PixelWindow::new(2, 1, 4, 4));
		Ok(())
	}

	#[test]
	fn bbox_partially_outside() -> Result<()> {
		let bbox = GeoBBox::new(980.0, 1990.0, 1020.0, 2020.0)?;
		let window = PixelWindow::from_bbox(&bbox, &GT)?;
		assert_eq!(window, PixelWindow::new(-2, -2, 4, 3));
		assert_eq!(window.clamp((100, 100)), Some(PixelWindow::new(0, 0, 2, 1)));
		Ok(())
	}

	#[test]
	fn fractional_bbox_rounds_outwards() -> Result<()> {
		let bbox = GeoBBox::new(1001.0, 1981.0, 1019.0, 1999.0)?;
		let window = PixelWindow::from_bbox(&bbox, &GT)?;
		assert_eq!(window, PixelWindow::new(0, 0, 2, 2));
		Ok(())
	}

	#[rstest]
	#[case(PixelWindow::new(3, 5, 10, 10), (16, 16), PixelWindow::new(0, 0, 16, 16))]
	#[case(PixelWindow::new(0, 0, 16, 16), (16, 16), PixelWindow::new(0, 0, 16, 16))]
	#[case(PixelWindow::new(17, 0, 2, 16), (16, 16), PixelWindow::new(16, 0, 16, 16))]
	#[case(PixelWindow::new(-3, -3, 4, 4), (16, 16), PixelWindow::new(-16, -16, 32, 32))]
	fn snapping(#[case] input: PixelWindow, #[case] block: (usize, usize), #[case] expected: PixelWindow) {
		assert_eq!(input.snap_to_blocks(block).unwrap(), expected);
	}

	#[test]
	fn clamp_to_raster() {
		let window = PixelWindow::new(-5, 10, 20, 20);
		assert_eq!(window.clamp((10, 25)), Some(PixelWindow::new(0, 10, 10, 15)));
		assert_eq!(window.clamp((10, 10)), None);
		assert_eq!(PixelWindow::new(50, 0, 5, 5).clamp((10, 10)), None);
	}

	#[test]
	fn subset_geo_transform() {
		let window = PixelWindow::new(2, 3, 4, 4);
		let gt = window.geo_transform(&GT);
		assert_eq!(gt, [1020.0, 10.0, 0.0, 1970.0, 0.0, -10.0]);
	}
}
