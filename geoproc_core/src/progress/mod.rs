//! A small terminal progress bar without external UI dependencies.
//!
//! Renders message, bar, position/length, percentage, rate and ETA to
//! stderr, redrawing at most twice a second. Under `cfg(test)` nothing is
//! written, so tests stay quiet.

mod bar;

pub use bar::ProgressBar;

/// Creates a progress bar for a task of `max_value` steps.
pub fn get_progress_bar(message: &str, max_value: u64) -> ProgressBar {
	ProgressBar::new(message, max_value)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn basic_usage_does_not_panic() {
		let mut progress = get_progress_bar("testing", 100);
		progress.set_position(25);
		progress.inc(10);
		progress.finish();
	}
}
