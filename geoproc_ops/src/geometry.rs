//! Conversions between OGR geometries and the plain value types in
//! `geoproc_core`.

use anyhow::Result;
use gdal::vector::{Geometry, OGRwkbGeometryType};
use geoproc_core::GeoBBox;

/// The envelope of an OGR geometry as a `GeoBBox`.
pub fn envelope_bbox(geometry: &Geometry) -> Result<GeoBBox> {
	let envelope = geometry.envelope();
	GeoBBox::new(envelope.MinX, envelope.MinY, envelope.MaxX, envelope.MaxY)
}

/// Builds a rectangular OGR polygon from a bounding box.
pub fn bbox_polygon(bbox: &GeoBBox) -> Result<Geometry> {
	let mut ring = Geometry::empty(OGRwkbGeometryType::wkbLinearRing)?;
	for (x, y) in bbox.as_ring() {
		ring.add_point_2d((x, y));
	}

	let mut polygon = Geometry::empty(OGRwkbGeometryType::wkbPolygon)?;
	polygon.add_geometry(ring)?;
	Ok(polygon)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn polygon_round_trip() -> Result<()> {
		let bbox = GeoBBox::new(0.0, 0.0, 4.0, 2.0)?;
		let polygon = bbox_polygon(&bbox)?;
		assert_eq!(polygon.area(), 8.0);
		assert_eq!(envelope_bbox(&polygon)?, bbox);
		Ok(())
	}

	#[test]
	fn envelope_of_line() -> Result<()> {
		let line = Geometry::from_wkt("LINESTRING (1 2, 5 4)")?;
		assert_eq!(envelope_bbox(&line)?.as_tuple(), (1.0, 2.0, 5.0, 4.0));
		Ok(())
	}
}
