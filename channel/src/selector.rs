use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::descriptor::ChannelDescriptor;

/// Keeps the score function from blowing up when throughput is exactly zero,
/// which it is for every channel before its first successful exchange.
const EPSILON: f64 = 1e-6;

/// The latest (latency, throughput) sample recorded for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
	/// Last observed round-trip latency, in seconds. `f64::INFINITY` before
	/// any successful exchange.
	pub latency: f64,
	/// Last observed throughput, in bytes/second. `0.0` before any
	/// successful exchange.
	pub throughput: f64,
}

impl Measurement {
	const UNMEASURED: Self = Self { latency: f64::INFINITY, throughput: 0.0 };

	fn score(self) -> f64 {
		self.latency / (self.throughput + EPSILON)
	}
}

/// Scores [`ChannelDescriptor`]s by their latest latency/throughput
/// measurement and picks the preferred one for each outbound segment.
///
/// `score(c) = latency(c) / (throughput(c) + ε)`; lower is preferred.
/// Measurements are updated only on successful exchanges — a NACK or an I/O
/// error consumes retry budget without moving a channel's score (§4.3, and
/// see §9 for why this is a deliberate, if suboptimal, choice preserved
/// here).
pub struct ChannelSelector {
	/// Registration order, used both to dial and as the tie-break for equal
	/// scores.
	channels: Vec<ChannelDescriptor>,
	measurements: Mutex<HashMap<String, Measurement>>,
}

impl ChannelSelector {
	pub fn new(channels: Vec<ChannelDescriptor>) -> Self {
		Self { channels, measurements: Mutex::new(HashMap::new()) }
	}

	pub fn channels(&self) -> &[ChannelDescriptor] {
		&self.channels
	}

	/// Returns the channel with the lowest score, breaking ties by
	/// registration order. Deterministic even when every channel is still
	/// unmeasured, so the very first segment doesn't stall on an arbitrary
	/// choice.
	pub fn select(&self) -> ChannelDescriptor {
		let measurements = self.measurements.lock().unwrap();

		let mut best = &self.channels[0];
		let mut best_score = measurements.get(&best.name).copied().unwrap_or(Measurement::UNMEASURED).score();

		for channel in &self.channels[1..] {
			let score = measurements.get(&channel.name).copied().unwrap_or(Measurement::UNMEASURED).score();

			if score < best_score {
				best = channel;
				best_score = score;
			}
		}

		best.clone()
	}

	/// Records a successful exchange's latency and throughput for `name`.
	pub fn record_success(&self, name: &str, elapsed: Duration, bytes_sent: usize) {
		// Floor the elapsed time so a sub-microsecond round trip (common on
		// loopback) doesn't produce an unrepresentative near-infinite
		// throughput sample.
		let secs = elapsed.as_secs_f64().max(1e-6);
		let throughput = bytes_sent as f64 / secs;

		self.measurements.lock().unwrap().insert(name.to_string(), Measurement { latency: secs, throughput });
	}

	/// Returns the current measurement for `name`, if any.
	pub fn measurement(&self, name: &str) -> Option<Measurement> {
		self.measurements.lock().unwrap().get(name).copied()
	}
}
