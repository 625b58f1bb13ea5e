//! Small helpers around OGR spatial references.

use anyhow::{Context, Result};
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};

/// Builds a spatial reference from any definition OGR understands
/// (`EPSG:4326`, proj4 strings, WKT, ...).
///
/// The axis mapping is forced to traditional GIS order (x = easting or
/// longitude) so that geographic CRS behave like every other one here.
pub fn from_user_input(definition: &str) -> Result<SpatialRef> {
	let mut srs =
		SpatialRef::from_definition(definition).with_context(|| format!("invalid CRS definition {definition:?}"))?;
	srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
	Ok(srs)
}

/// Returns a coordinate transform from `source` to `target`, or `None` when
/// the two describe the same CRS and no reprojection is needed.
pub fn transform_between(source: &SpatialRef, target: &SpatialRef) -> Result<Option<CoordTransform>> {
	if source.to_wkt()? == target.to_wkt()? {
		return Ok(None);
	}
	let transform = CoordTransform::new(source, target).context("cannot build coordinate transform")?;
	Ok(Some(transform))
}
