use std::time::{Duration, Instant};

const REDRAW_INTERVAL: Duration = Duration::from_millis(500);

/// A terminal progress bar writing to stderr.
pub struct ProgressBar {
	message: String,
	len: u64,
	pos: u64,
	start: Instant,
	last_draw: Option<Instant>,
	finished: bool,
}

impl ProgressBar {
	pub fn new(message: &str, len: u64) -> ProgressBar {
		ProgressBar {
			message: message.to_string(),
			len,
			pos: 0,
			start: Instant::now(),
			last_draw: None,
			finished: false,
		}
	}

	pub fn set_position(&mut self, pos: u64) {
		self.pos = pos.min(self.len);
		self.redraw();
	}

	pub fn inc(&mut self, delta: u64) {
		self.set_position(self.pos + delta);
	}

	pub fn position(&self) -> u64 {
		self.pos
	}

	/// Draws the bar one last time at 100% and moves to a fresh line.
	pub fn finish(&mut self) {
		if self.finished {
			return;
		}
		self.pos = self.len;
		self.finished = true;
		self.redraw();
		write_terminal("\n");
	}

	fn redraw(&mut self) {
		if let Some(last) = self.last_draw {
			if last.elapsed() < REDRAW_INTERVAL && !self.finished {
				return;
			}
		}
		self.last_draw = Some(Instant::now());

		let len = self.len.max(1);
		let pos = self.pos.min(len);
		let percent = pos * 100 / len;
		let rate = format_rate(pos, self.start.elapsed());
		let eta = format_eta(pos, len, self.start.elapsed());

		let message = &self.message;
		let suffix = format!(" {pos}/{len} ({percent:>3}%) {rate:>7} {eta:>6}");
		let bar_width = terminal_width().saturating_sub(message.chars().count() + suffix.chars().count() + 2);
		let bar = make_bar(pos, len, bar_width);

		write_terminal(&format!("\r\x1b[2K{message}▕{bar}▏{suffix}"));
	}
}

#[allow(unused_variables)]
fn write_terminal(text: &str) {
	#[cfg(not(test))]
	{
		use std::io::Write;
		let mut stderr = std::io::stderr();
		let _ = write!(stderr, "{text}");
		let _ = stderr.flush();
	}
}

fn terminal_width() -> usize {
	match terminal_size::terminal_size() {
		Some((width, _)) => (width.0 as usize).max(20),
		None => 80,
	}
}

fn make_bar(pos: u64, len: u64, width: usize) -> String {
	let width = width.max(1);
	let filled = ((pos as f64 / len.max(1) as f64).clamp(0.0, 1.0) * width as f64).round() as usize;

	let mut bar = String::with_capacity(width * 3);
	for _ in 0..filled {
		bar.push('█');
	}
	for _ in filled..width {
		bar.push(' ');
	}
	bar
}

fn format_rate(pos: u64, elapsed: Duration) -> String {
	let secs = elapsed.as_secs_f64();
	if secs <= 0.0 {
		return "--/s".to_string();
	}
	format!("{}/s", human_number(pos as f64 / secs))
}

fn human_number(value: f64) -> String {
	let abs = value.abs();
	if abs >= 1_000_000.0 {
		format!("{:.1}M", value / 1_000_000.0)
	} else if abs >= 1_000.0 {
		format!("{:.1}k", value / 1_000.0)
	} else {
		format!("{value:.0}")
	}
}

fn format_eta(pos: u64, len: u64, elapsed: Duration) -> String {
	if pos == 0 {
		return "--".to_string();
	}
	let remaining = elapsed.as_secs_f64() * (len - pos) as f64 / pos as f64;
	let total = remaining as u64;
	let hours = total / 3_600;
	let minutes = (total % 3_600) / 60;
	let seconds = total % 60;

	if total < 60 {
		format!("{seconds}s")
	} else if total < 3_600 {
		format!("{minutes:02}:{seconds:02}")
	} else {
		format!("{hours}:{minutes:02}:{seconds:02}")
	}
}
