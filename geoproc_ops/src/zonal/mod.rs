//! Zonal statistics: per-feature aggregate pixel statistics over the raster
//! area a vector geometry overlaps.
//!
//! For every feature the geometry is reprojected to the raster CRS, its
//! envelope is turned into a block-aligned pixel window, that window is read
//! per band, the geometry is burned into a matching mask with GDAL's
//! rasterizer, and the unmasked pixels are reduced to min/max/mean/std/sum.

use crate::geometry::{bbox_polygon, envelope_bbox};
use crate::srs;
use anyhow::{Context, Result, bail, ensure};
use gdal::raster::{MergeAlgorithm, RasterizeOptions, rasterize};
use gdal::vector::{Geometry, LayerAccess};
use gdal::{Dataset, DriverManager, GeoTransform, GeoTransformEx};
use geoproc_core::{BandStats, GeoBBox, PixelWindow};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct ZonalOptions {
	/// 1-based band indices; `None` means all bands.
	pub bands: Option<Vec<usize>>,
	/// Burn all pixels touched by the geometry into the mask, not only those
	/// whose center is covered.
	pub all_touched: bool,
	/// Also report whether each geometry lies completely inside the raster
	/// extent. Costs one OGR `Contains` call per feature.
	pub contained: bool,
	/// Vector layer to process; default is the first one.
	pub layer: Option<String>,
}

/// Statistics for a single vector feature.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureStats {
	/// The geometry does not intersect the raster extent at all.
	pub outside: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub contained: Option<bool>,
	/// Per-band statistics; `None` when the mask excluded every pixel.
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub bands: BTreeMap<usize, Option<BandStats>>,
}

/// Computes zonal statistics for every feature of `vector` against `raster`.
///
/// The result maps feature ids (FIDs) to their statistics.
pub fn zonal_stats(raster: &Dataset, vector: &Dataset, options: &ZonalOptions) -> Result<BTreeMap<u64, FeatureStats>> {
	let mut layer = match &options.layer {
		Some(name) => vector.layer_by_name(name)?,
		None => vector.layer(0)?,
	};

	let geo_transform = raster.geo_transform().context("raster has no geotransform")?;
	let raster_size = raster.raster_size();
	let bands = select_bands(options.bands.as_deref(), raster.raster_count() as usize)?;
	let block_size = raster.rasterband(bands[0])?.block_size();

	let raster_bbox = raster_bbox(&geo_transform, raster_size)?;
	let bounds = bbox_polygon(&raster_bbox)?;

	// Reproject features only when both sides carry a CRS and they differ.
	let transform = match (layer.spatial_ref(), raster.spatial_ref().ok()) {
		(Some(vector_srs), Some(raster_srs)) => srs::transform_between(&vector_srs, &raster_srs)?,
		_ => None,
	};

	let mut stats = BTreeMap::new();

	for (index, feature) in layer.features().enumerate() {
		let fid = feature.fid().unwrap_or(index as u64);

		let Some(geometry) = feature.geometry() else {
			log::warn!("feature {fid} has no geometry, skipping");
			continue;
		};
		let mut geometry = geometry.clone();
		if let Some(transform) = &transform {
			geometry.transform_inplace(transform)?;
		}

		if !geometry.intersects(&bounds) {
			insert_stats(
				&mut stats,
				fid,
				FeatureStats {
					outside: true,
					contained: options.contained.then_some(false),
					bands: BTreeMap::new(),
				},
			)?;
			continue;
		}

		let contained = options.contained.then(|| bounds.contains(&geometry));

		let window = PixelWindow::from_bbox(&envelope_bbox(&geometry)?, &geo_transform)?
			.snap_to_blocks(block_size)?
			.clamp(raster_size);

		let mut band_stats = BTreeMap::new();
		if let Some(window) = window {
			let mask = rasterize_mask(&geometry, &window, &geo_transform, options.all_touched)?;

			for &band_index in &bands {
				let band = raster.rasterband(band_index)?;
				let pixels = band.read_as::<f64>(window.offset(), window.size(), window.size(), None)?;
				let nodata = band.no_data_value();

				let values = pixels
					.data()
					.iter()
					.zip(mask.iter())
					.filter(|&(value, &masked)| masked != 0 && Some(*value) != nodata && !value.is_nan())
					.map(|(value, _)| *value);

				band_stats.insert(band_index, BandStats::from_values(values));
			}
		} else {
			// intersecting bbox but empty pixel window: degenerate sliver
			for &band_index in &bands {
				band_stats.insert(band_index, None);
			}
		}

		insert_stats(
			&mut stats,
			fid,
			FeatureStats {
				outside: false,
				contained,
				bands: band_stats,
			},
		)?;
	}

	Ok(stats)
}

/// Keys the report by FID. A collision (a FID-less feature's fallback index
/// matching another feature's FID) is an error, not a silent overwrite.
fn insert_stats(report: &mut BTreeMap<u64, FeatureStats>, fid: u64, stats: FeatureStats) -> Result<()> {
	if report.insert(fid, stats).is_some() {
		bail!("duplicate feature id {fid} in report");
	}
	Ok(())
}

fn select_bands(requested: Option<&[usize]>, band_count: usize) -> Result<Vec<usize>> {
	ensure!(band_count > 0, "raster has no bands");

	match requested {
		None => Ok((1..=band_count).collect()),
		Some([]) => bail!("empty band selection"),
		Some(bands) => {
			for &band in bands {
				ensure!(
					band >= 1 && band <= band_count,
					"band {band} is out of range, the raster has {band_count} band(s)"
				);
			}
			Ok(bands.to_vec())
		}
	}
}

/// The full raster extent in georeferenced coordinates.
fn raster_bbox(geo_transform: &GeoTransform, raster_size: (usize, usize)) -> Result<GeoBBox> {
	let (width, height) = (raster_size.0 as f64, raster_size.1 as f64);
	let mut bbox: Option<GeoBBox> = None;
	for (col, row) in [(0.0, 0.0), (width, 0.0), (0.0, height), (width, height)] {
		let (x, y) = geo_transform.apply(col, row);
		let corner = GeoBBox::new(x, y, x, y)?;
		match &mut bbox {
			Some(bbox) => bbox.extend(&corner),
			None => bbox = Some(corner),
		}
	}
	Ok(bbox.unwrap())
}

/// Burns `geometry` into a `window`-shaped boolean mask using an in-memory
/// raster.
fn rasterize_mask(
	geometry: &Geometry,
	window: &PixelWindow,
	geo_transform: &GeoTransform,
	all_touched: bool,
) -> Result<Vec<u8>> {
	let driver = DriverManager::get_driver_by_name("MEM")?;
	let mut mask = driver.create_with_band_type::<u8, _>("", window.width, window.height, 1)?;
	mask.set_geo_transform(&window.geo_transform(geo_transform))?;

	rasterize(
		&mut mask,
		&[1],
		std::slice::from_ref(geometry),
		&[1.0],
		Some(RasterizeOptions {
			all_touched,
			merge_algorithm: MergeAlgorithm::Replace,
			..Default::default()
		}),
	)?;

	let buffer = mask.rasterband(1)?.read_as::<u8>((0, 0), window.size(), window.size(), None)?;
	Ok(buffer.data().to_vec())
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;
	use gdal::raster::Buffer;
	use std::path::Path;

	// 10x10 raster at origin (0, 100), 10m pixels, values = row index,
	// nodata = 255 burned into the top-left 2x2 corner
	fn create_raster(path: &Path, srs_def: &str) -> Result<()> {
		let driver = DriverManager::get_driver_by_name("GTiff")?;
		let mut dataset = driver.create_with_band_type::<f64, _>(path, 10, 10, 1)?;
		dataset.set_geo_transform(&[0.0, 10.0, 0.0, 100.0, 0.0, -10.0])?;
		dataset.set_spatial_ref(&srs::from_user_input(srs_def)?)?;

		let mut data = Vec::with_capacity(100);
		for row in 0..10 {
			for col in 0..10 {
				data.push(if row < 2 && col < 2 { 255.0 } else { row as f64 });
			}
		}
		let mut band = dataset.rasterband(1)?;
		band.set_no_data_value(Some(255.0))?;
		let mut buffer = Buffer::new((10, 10), data);
		band.write((0, 0), (10, 10), &mut buffer)?;
		Ok(())
	}

	fn create_vector(path: &Path, srs_def: &str, wkts: &[&str]) -> Result<()> {
		use gdal::vector::LayerOptions;

		let driver = DriverManager::get_driver_by_name("GeoJSON")?;
		let mut dataset = driver.create_vector_only(path.to_str().unwrap())?;
		let srs = srs::from_user_input(srs_def)?;
		let mut layer = dataset.create_layer(LayerOptions {
			name: "zones",
			srs: Some(&srs),
			..Default::default()
		})?;

		for wkt in wkts {
			layer.create_feature(Geometry::from_wkt(wkt)?)?;
		}
		Ok(())
	}

	#[test]
	fn constant_rows_inside_one_block() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let raster_path = dir.path().join("r.tif");
		let vector_path = dir.path().join("v.json");
		create_raster(&raster_path, "EPSG:32633")?;
		// covers pixel rows 5..7, columns 2..8, away from the nodata corner
		create_vector(&vector_path, "EPSG:32633", &["POLYGON ((20 30, 80 30, 80 50, 20 50, 20 30))"])?;

		let raster = Dataset::open(&raster_path)?;
		let vector = Dataset::open(&vector_path)?;
		let stats = zonal_stats(&raster, &vector, &ZonalOptions::default())?;

		assert_eq!(stats.len(), 1);
		let feature = stats.values().next().unwrap();
		assert!(!feature.outside);
		let band = feature.bands[&1].expect("stats expected");
		// rows 5 and 6 carry values 5 and 6
		assert_eq!(band.min, 5.0);
		assert_eq!(band.max, 6.0);
		assert_relative_eq!(band.mean, 5.5);
		assert_eq!(band.count, 12);
		Ok(())
	}

	#[test]
	fn feature_outside_raster() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let raster_path = dir.path().join("r.tif");
		let vector_path = dir.path().join("v.json");
		create_raster(&raster_path, "EPSG:32633")?;
		create_vector(&vector_path, "EPSG:32633", &["POLYGON ((500 500, 600 500, 600 600, 500 600, 500 500))"])?;

		let raster = Dataset::open(&raster_path)?;
		let vector = Dataset::open(&vector_path)?;
		let stats = zonal_stats(&raster, &vector, &ZonalOptions::default())?;

		let feature = stats.values().next().unwrap();
		assert!(feature.outside);
		assert!(feature.bands.is_empty());
		Ok(())
	}

	#[test]
	fn contained_flag() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let raster_path = dir.path().join("r.tif");
		let vector_path = dir.path().join("v.json");
		create_raster(&raster_path, "EPSG:32633")?;
		create_vector(
			&vector_path,
			"EPSG:32633",
			&[
				// fully inside
				"POLYGON ((20 30, 80 30, 80 50, 20 50, 20 30))",
				// pokes out to the left
				"POLYGON ((-20 30, 30 30, 30 50, -20 50, -20 30))",
			],
		)?;

		let raster = Dataset::open(&raster_path)?;
		let vector = Dataset::open(&vector_path)?;
		let options = ZonalOptions {
			contained: true,
			..Default::default()
		};
		let stats = zonal_stats(&raster, &vector, &options)?;

		let mut values = stats.values();
		assert_eq!(values.next().unwrap().contained, Some(true));
		assert_eq!(values.next().unwrap().contained, Some(false));
		Ok(())
	}

	#[test]
	fn nodata_pixels_are_excluded() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let raster_path = dir.path().join("r.tif");
		let vector_path = dir.path().join("v.json");
		create_raster(&raster_path, "EPSG:32633")?;
		// covers the full top-left 3x3 corner, including the 2x2 nodata patch
		create_vector(&vector_path, "EPSG:32633", &["POLYGON ((0 70, 30 70, 30 100, 0 100, 0 70))"])?;

		let raster = Dataset::open(&raster_path)?;
		let vector = Dataset::open(&vector_path)?;
		let stats = zonal_stats(&raster, &vector, &ZonalOptions::default())?;

		let band = stats.values().next().unwrap().bands[&1].expect("stats expected");
		// 9 pixels minus 4 nodata
		assert_eq!(band.count, 5);
		assert_eq!(band.max, 2.0);
		Ok(())
	}

	#[test]
	fn vector_in_different_crs_is_reprojected() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let raster_path = dir.path().join("r.tif");
		let vector_path = dir.path().join("v.json");
		create_raster(&raster_path, "EPSG:3857")?;
		// the 20..80 x 30..50 meter box from `constant_rows_inside_one_block`,
		// expressed in degrees
		create_vector(
			&vector_path,
			"EPSG:4326",
			&["POLYGON ((0.000179663 0.000269495, 0.000718652 0.000269495, 0.000718652 0.000449158, 0.000179663 0.000449158, 0.000179663 0.000269495))"],
		)?;

		let raster = Dataset::open(&raster_path)?;
		let vector = Dataset::open(&vector_path)?;
		let stats = zonal_stats(&raster, &vector, &ZonalOptions::default())?;

		let band = stats.values().next().unwrap().bands[&1].expect("stats expected");
		assert_eq!(band.min, 5.0);
		assert_eq!(band.max, 6.0);
		assert_eq!(band.count, 12);
		Ok(())
	}

	#[test]
	fn all_touched_widens_the_mask() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let raster_path = dir.path().join("r.tif");
		let vector_path = dir.path().join("v.json");
		create_raster(&raster_path, "EPSG:32633")?;
		// a sliver through pixel row 1 that covers no pixel center, clear of
		// the nodata corner
		create_vector(&vector_path, "EPSG:32633", &["POLYGON ((22 82, 48 82, 48 84, 22 84, 22 82))"])?;

		let raster = Dataset::open(&raster_path)?;
		let vector = Dataset::open(&vector_path)?;
		let stats = zonal_stats(&raster, &vector, &ZonalOptions::default())?;
		assert!(stats.values().next().unwrap().bands[&1].is_none());

		let vector = Dataset::open(&vector_path)?;
		let options = ZonalOptions {
			all_touched: true,
			..Default::default()
		};
		let stats = zonal_stats(&raster, &vector, &options)?;
		let band = stats.values().next().unwrap().bands[&1].expect("stats expected");
		// columns 2..4 of row 1, which carries the value 1
		assert_eq!(band.count, 3);
		assert_eq!(band.min, 1.0);
		assert_eq!(band.max, 1.0);
		Ok(())
	}

	#[test]
	fn duplicate_feature_ids_are_rejected() {
		let entry = FeatureStats {
			outside: true,
			contained: None,
			bands: BTreeMap::new(),
		};
		let mut report = BTreeMap::new();
		insert_stats(&mut report, 3, entry.clone()).unwrap();
		assert!(insert_stats(&mut report, 3, entry).is_err());
	}

	#[test]
	fn band_selection_is_validated() {
		assert_eq!(select_bands(None, 3).unwrap(), vec![1, 2, 3]);
		assert_eq!(select_bands(Some(&[2]), 3).unwrap(), vec![2]);
		assert!(select_bands(Some(&[0]), 3).is_err());
		assert!(select_bands(Some(&[4]), 3).is_err());
		assert!(select_bands(Some(&[]), 3).is_err());
	}

	#[test]
	fn raster_bbox_is_north_up_extent() -> Result<()> {
		let bbox = raster_bbox(&[0.0, 10.0, 0.0, 100.0, 0.0, -10.0], (10, 10))?;
		assert_eq!(bbox.as_tuple(), (0.0, 0.0, 100.0, 100.0));
		Ok(())
	}
}
