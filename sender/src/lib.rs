//! Drives one end-to-end data transfer: encrypt, segment, fan out over
//! channels, retry, finalize with FIN.

use std::collections::HashMap;
use std::time::Duration;

use channel::{ChannelDescriptor, ChannelEndpoint, ChannelSelector};
use log::{info, warn};
use utils::error::{MpatError, Result};
use utils::time::unix_session_id;
use wire::{Frame, ACK};

/// Ciphertext bytes carried per DATA frame; the final segment may be shorter.
const DEFAULT_SEGMENT_SIZE: usize = 1024;
/// Attempts per segment before it is marked [`MpatError::RetryExhausted`] and abandoned.
const DEFAULT_RETRANSMISSION_LIMIT: u32 = 3;

/// Drives one `send` call: generates a session key, encrypts and segments the
/// payload, dispatches segments concurrently across the configured channels,
/// and finalizes with FIN. One `SenderSession` is used for exactly one
/// transfer (§3's sender lifecycle).
pub struct SenderSession {
	selector: ChannelSelector,
	endpoints: HashMap<String, ChannelEndpoint>,
	session_id: u32,
	segment_size: usize,
	retransmission_limit: u32,
	timeout: Option<Duration>,
}

impl SenderSession {
	/// Builds a session over `channels`, defaulting the session id to
	/// truncated Unix time (§3). Fails with [`MpatError::Configuration`] if
	/// the channel list is empty or any address fails to resolve.
	pub fn new(channels: Vec<ChannelDescriptor>) -> Result<Self> {
		ChannelDescriptor::validate_list(&channels)?;

		let endpoints = channels.iter().map(|c| (c.name.clone(), ChannelEndpoint::new(c.clone()))).collect();

		Ok(Self {
			selector: ChannelSelector::new(channels),
			endpoints,
			session_id: unix_session_id(),
			segment_size: DEFAULT_SEGMENT_SIZE,
			retransmission_limit: DEFAULT_RETRANSMISSION_LIMIT,
			timeout: None,
		})
	}

	/// Overrides the default truncated-Unix-time session id (§9: callers
	/// needing a stronger uniqueness guarantee than one-process-per-second
	/// should supply their own, e.g. a random-seeded counter).
	pub fn with_session_id(mut self, session_id: u32) -> Self {
		self.session_id = session_id;
		self
	}

	pub fn with_segment_size(mut self, segment_size: usize) -> Self {
		assert!(segment_size > 0, "segment_size must be positive");
		self.segment_size = segment_size;
		self
	}

	pub fn with_retransmission_limit(mut self, limit: u32) -> Self {
		assert!(limit > 0, "retransmission_limit must be positive");
		self.retransmission_limit = limit;
		self
	}

	/// Sets a per-attempt connect/write/read deadline on every channel
	/// endpoint. `None` (the default) waits indefinitely, matching the
	/// reference behavior (§4.2).
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;
		self.endpoints = self
			.endpoints
			.into_iter()
			.map(|(name, endpoint)| (name, endpoint.with_timeout(timeout)))
			.collect();
		self
	}

	pub fn session_id(&self) -> u32 {
		self.session_id
	}

	/// Encrypts, segments, and transmits `payload`. Blocks until every
	/// segment dispatch has resolved (success or retry exhaustion) and FIN
	/// has been sent to every channel.
	///
	/// Returns `Err` only for a structural failure: the key exchange must
	/// succeed on at least one channel, or the session never started. A
	/// segment exhausting its retry budget is logged and does not fail the
	/// call — the transfer is incomplete and the receiver will report
	/// `MissingSegments` at finalize (§4.4).
	pub fn send(&self, payload: &[u8]) -> Result<()> {
		let key = crypto::generate_key();
		let iv = crypto::generate_iv();

		let ciphertext = crypto::encrypt(payload, &key, &iv);

		self.send_key_to_all(&key, &iv)?;

		let segments = self.split_segments(&ciphertext);

		info!("session {}: dispatching {} segments across {} channels", self.session_id, segments.len(), self.endpoints.len());

		std::thread::scope(|scope| {
			let handles: Vec<_> = segments
				.iter()
				.map(|(segment_index, ciphertext)| scope.spawn(move || self.dispatch_segment(*segment_index, ciphertext)))
				.collect();

			for handle in handles {
				if let Err(err) = handle.join().expect("segment dispatch thread should not panic") {
					warn!("session {}: {err}", self.session_id);
				}
			}
		});

		self.send_fin_to_all();

		Ok(())
	}

	fn send_key_to_all(&self, key: &[u8; 16], iv: &[u8; 16]) -> Result<()> {
		let frame = Frame::Key { session_id: self.session_id, key: *key, iv: *iv };
		let bytes = frame.encode()?;

		let acked = std::thread::scope(|scope| {
			let handles: Vec<_> = self.endpoints.values().map(|endpoint| scope.spawn(|| self.exchange_control(endpoint, &bytes))).collect();

			handles.into_iter().map(|h| h.join().expect("key exchange thread should not panic")).filter(|r| r.is_ok()).count()
		});

		if acked == 0 {
			return Err(MpatError::Channel(format!("session {}: KEY exchange failed on every channel", self.session_id)));
		}

		info!("session {}: KEY ACKed on {}/{} channels", self.session_id, acked, self.endpoints.len());

		Ok(())
	}

	fn send_fin_to_all(&self) {
		let frame = Frame::Fin { session_id: self.session_id };
		let Ok(bytes) = frame.encode() else { return };

		std::thread::scope(|scope| {
			for endpoint in self.endpoints.values() {
				scope.spawn(|| {
					if let Err(err) = self.exchange_control(endpoint, &bytes) {
						warn!("session {}: FIN failed on channel {}: {err}", self.session_id, endpoint.descriptor().name);
					}
				});
			}
		});

		info!("session {}: FIN dispatched to all channels", self.session_id);
	}

	/// Sends a DATA frame on `endpoint` and records the exchange's
	/// latency/throughput with the selector on ACK — the selector's only
	/// measurement feed (§4.3). Returns `Err` on I/O failure or NACK;
	/// neither updates the selector's measurement.
	fn exchange_data(&self, endpoint: &ChannelEndpoint, frame_bytes: &[u8]) -> Result<()> {
		let exchange = endpoint.send_and_await(frame_bytes)?;

		if exchange.response == ACK {
			self.selector.record_success(&endpoint.descriptor().name, exchange.elapsed, frame_bytes.len());
			Ok(())
		} else {
			Err(MpatError::ChecksumMismatch)
		}
	}

	/// Sends a KEY or FIN frame on `endpoint`. Control frames go out to
	/// every channel before any data segment is dispatched, so feeding them
	/// into the selector would score every channel off a tiny control-frame
	/// round trip instead of real throughput; this never records a
	/// measurement, unlike [`Self::exchange_data`].
	fn exchange_control(&self, endpoint: &ChannelEndpoint, frame_bytes: &[u8]) -> Result<()> {
		let exchange = endpoint.send_and_await(frame_bytes)?;

		if exchange.response == ACK {
			Ok(())
		} else {
			Err(MpatError::UnexpectedResponse(format!(
				"channel {} replied {:?} to a control frame",
				endpoint.descriptor().name,
				exchange.response
			)))
		}
	}

	fn dispatch_segment(&self, segment_index: u32, ciphertext: &[u8]) -> Result<()> {
		let checksum = crypto::sha256(ciphertext);

		let frame = Frame::Data { session_id: self.session_id, segment_index, checksum, ciphertext: ciphertext.to_vec() };
		let bytes = frame.encode()?;

		for attempt in 1..=self.retransmission_limit {
			let channel = self.selector.select();
			let endpoint = &self.endpoints[&channel.name];

			match self.exchange_data(endpoint, &bytes) {
				Ok(()) => return Ok(()),
				Err(err) => warn!("session {}: segment {segment_index} attempt {attempt}/{} on {} failed: {err}", self.session_id, self.retransmission_limit, channel.name),
			}
		}

		Err(MpatError::RetryExhausted { segment_index })
	}

	/// Splits `ciphertext` into `(segment_index, bytes)` chunks of
	/// `self.segment_size`, skipping the two reserved indices (§4.1, §9) so
	/// a DATA frame is never encodable with a colliding tag.
	fn split_segments<'a>(&self, ciphertext: &'a [u8]) -> Vec<(u32, &'a [u8])> {
		let mut indices = SegmentIndices::default();

		ciphertext.chunks(self.segment_size).map(|chunk| (indices.next(), chunk)).collect()
	}
}

/// Yields 0, 1, 2, … skipping the two 32-bit values reserved for the KEY and
/// FIN control tags (§4.1's disambiguation rule, enforced here rather than
/// left as an open question — §9).
#[derive(Default)]
struct SegmentIndices {
	next: u32,
}

impl SegmentIndices {
	fn next(&mut self) -> u32 {
		while wire::is_reserved_index(self.next) {
			self.next = self.next.checked_add(1).expect("payload too large: segment index space exhausted");
		}

		let idx = self.next;
		self.next = self.next.checked_add(1).expect("payload too large: segment index space exhausted");
		idx
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn segment_indices_skip_reserved_values() {
		let mut indices = SegmentIndices::default();
		for _ in 0..10 {
			let idx = indices.next();
			assert!(!wire::is_reserved_index(idx));
		}
	}

	#[test]
	fn configuration_error_on_empty_channel_list() {
		assert!(matches!(SenderSession::new(vec![]), Err(MpatError::Configuration(_))));
	}

	#[test]
	fn split_segments_sizes_last_chunk_correctly() {
		let channels = vec![ChannelDescriptor::new("a", "127.0.0.1", 1)];
		let session = SenderSession::new(channels).unwrap().with_segment_size(16);

		let ciphertext = vec![0u8; 40];
		let segments = session.split_segments(&ciphertext);

		assert_eq!(segments.len(), 3);
		assert_eq!(segments[0].1.len(), 16);
		assert_eq!(segments[1].1.len(), 16);
		assert_eq!(segments[2].1.len(), 8);
	}
}
