use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{info, warn};
use utils::error::{MpatError, Result};

/// One session's mutable state: the key/iv pair once a KEY frame has
/// arrived, and the sparse segment_index → ciphertext map.
#[derive(Default)]
struct SessionState {
	key: Option<[u8; 16]>,
	iv: Option<[u8; 16]>,
	segments: HashMap<u32, Vec<u8>>,
}

/// Keyed by session_id. Each entry is its own `Mutex`, so finalizing one
/// session never blocks a segment store for another (§4.6).
#[derive(Default)]
pub struct SessionRegistry {
	sessions: Mutex<HashMap<u32, Arc<Mutex<SessionState>>>>,
}

impl SessionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	fn entry(&self, session_id: u32) -> Arc<Mutex<SessionState>> {
		self.sessions.lock().unwrap().entry(session_id).or_insert_with(|| Arc::new(Mutex::new(SessionState::default()))).clone()
	}

	/// Creates the session record if absent; otherwise overwrites the stored
	/// key/iv. Duplicate KEY writes with identical bytes are therefore
	/// idempotent, and conflicting bytes are accepted as the newer value
	/// rather than rejected (§9: the documented resolution for that open
	/// question).
	pub fn store_key(&self, session_id: u32, key: [u8; 16], iv: [u8; 16]) {
		let session = self.entry(session_id);
		let mut state = session.lock().unwrap();

		if state.key.is_some() && (state.key != Some(key) || state.iv != Some(iv)) {
			warn!("session {session_id}: KEY overwritten with a different key/iv");
		}

		state.key = Some(key);
		state.iv = Some(iv);

		info!("session {session_id}: KEY stored");
	}

	/// Inserts `ciphertext` at `index`, requiring the session record already
	/// exist (created by a prior KEY or segment). Duplicate index writes
	/// overwrite, since the ciphertext at a given index is deterministic
	/// under the session's key.
	pub fn store_segment(&self, session_id: u32, index: u32, ciphertext: Vec<u8>) {
		let session = self.entry(session_id);
		session.lock().unwrap().segments.insert(index, ciphertext);
	}

	/// Removes and returns the session's (key, iv, segments) for
	/// finalization, or `None` if the session never received a KEY.
	///
	/// Deletes the record from the registry regardless of outcome, matching
	/// §4.6's "finalize deletes the session record" — a session finalizes
	/// at most once. A `store_key`/`store_segment` call racing this one
	/// (the documented FIN/data race, §5, §9) still holds its own `Arc`
	/// clone of the entry at this point, so the state is drained through
	/// the session's mutex rather than requiring exclusive ownership of the
	/// `Arc` — a late write losing that race simply never observes the
	/// record again, instead of panicking this connection's thread.
	pub fn take(&self, session_id: u32) -> Result<([u8; 16], [u8; 16], HashMap<u32, Vec<u8>>)> {
		let session = self.sessions.lock().unwrap().remove(&session_id).ok_or(MpatError::MissingSegments { expected: 0, stored: 0 })?;

		let state = std::mem::take(&mut *session.lock().unwrap());

		let key = state.key.ok_or_else(|| MpatError::MissingSegments { expected: 0, stored: state.segments.len() })?;
		let iv = state.iv.ok_or_else(|| MpatError::MissingSegments { expected: 0, stored: state.segments.len() })?;

		Ok((key, iv, state.segments))
	}
}
