use serde::Serialize;

/// Aggregate statistics over the pixels of one raster band.
///
/// `std` is the population standard deviation, matching what GDAL itself
/// reports for band statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandStats {
	pub min: f64,
	pub max: f64,
	pub mean: f64,
	pub std: f64,
	pub sum: f64,
	pub count: u64,
}

impl BandStats {
	/// Reduces an iterator of pixel values in a single pass.
	///
	/// Returns `None` when no value contributes, e.g. when a geometry mask
	/// excluded every pixel of a window.
	pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<BandStats> {
		let mut min = f64::INFINITY;
		let mut max = f64::NEG_INFINITY;
		let mut sum = 0.0;
		let mut sum_squares = 0.0;
		let mut count = 0u64;

		for value in values {
			min = min.min(value);
			max = max.max(value);
			sum += value;
			sum_squares += value * value;
			count += 1;
		}

		if count == 0 {
			return None;
		}

		let mean = sum / count as f64;
		// guard against tiny negative values from floating point cancellation
		let variance = (sum_squares / count as f64 - mean * mean).max(0.0);

		Some(BandStats {
			min,
			max,
			mean,
			std: variance.sqrt(),
			sum,
			count,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;

	#[test]
	fn empty_input() {
		assert_eq!(BandStats::from_values([]), None);
	}

	#[test]
	fn single_value() {
		let stats = BandStats::from_values([7.5]).unwrap();
		assert_eq!(stats.min, 7.5);
		assert_eq!(stats.max, 7.5);
		assert_eq!(stats.mean, 7.5);
		assert_eq!(stats.std, 0.0);
		assert_eq!(stats.sum, 7.5);
		assert_eq!(stats.count, 1);
	}

	#[test]
	fn known_distribution() {
		let stats = BandStats::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
		assert_eq!(stats.min, 2.0);
		assert_eq!(stats.max, 9.0);
		assert_relative_eq!(stats.mean, 5.0);
		assert_relative_eq!(stats.std, 2.0);
		assert_relative_eq!(stats.sum, 40.0);
		assert_eq!(stats.count, 8);
	}

	#[test]
	fn constant_values_have_zero_std() {
		let stats = BandStats::from_values(std::iter::repeat_n(3.0, 1000)).unwrap();
		assert_eq!(stats.std, 0.0);
		assert_eq!(stats.mean, 3.0);
		assert_eq!(stats.sum, 3000.0);
	}

	#[test]
	fn serializes_to_json() {
		let stats = BandStats::from_values([1.0, 2.0, 3.0]).unwrap();
		let json = serde_json::to_value(stats).unwrap();
		assert_eq!(json["count"], 3);
		assert_eq!(json["sum"], 6.0);
	}
}
