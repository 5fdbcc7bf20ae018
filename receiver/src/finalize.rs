use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use log::{error, info};
use utils::error::{MpatError, Result};

use crate::registry::SessionRegistry;

/// Receives a finalized session's plaintext. The default sink (see
/// [`file_sink`]) writes `session_<id>.dat`; callers may supply any
/// `Fn(u32, &[u8]) + Send + Sync` instead (§4.7).
pub type Sink = Arc<dyn Fn(u32, &[u8]) + Send + Sync>;

/// Writes `data` to `session_<session_id>.dat` in the working directory.
pub fn file_sink() -> Sink {
	Arc::new(|session_id, data| {
		let path = format!("session_{session_id}.dat");
		if let Err(err) = fs::write(&path, data) {
			error!("session {session_id}: failed to write {path}: {err}");
		} else {
			info!("session {session_id}: wrote {} bytes to {path}", data.len());
		}
	})
}

/// Takes the registry's record for `session_id`, reassembles, decrypts, and
/// hands the plaintext to `sink`. The session record is removed from the
/// registry regardless of outcome (§4.6, §4.7).
pub fn finalize(registry: &SessionRegistry, session_id: u32, sink: &Sink) -> Result<()> {
	let (key, iv, segments) = registry.take(session_id)?;

	let ciphertext = reassemble(session_id, &segments)?;

	let plaintext = crypto::decrypt(&ciphertext, &key, &iv).map_err(|err| {
		error!("session {session_id}: decryption failed: {err}");
		err
	})?;

	sink(session_id, &plaintext);
	info!("session {session_id}: finalized, {} plaintext bytes", plaintext.len());

	Ok(())
}

/// Concatenates `segments` in ascending index order, requiring the stored
/// indices be exactly `{0, .., N-1}` (§3, §4.7).
fn reassemble(session_id: u32, segments: &HashMap<u32, Vec<u8>>) -> Result<Vec<u8>> {
	let expected = segments.len() as u32;

	let mut out = Vec::new();
	for index in 0..expected {
		match segments.get(&index) {
			Some(chunk) => out.extend_from_slice(chunk),
			None => {
				error!("session {session_id}: missing segment {index} of {expected}");
				return Err(MpatError::MissingSegments { expected, stored: segments.len() });
			}
		}
	}

	Ok(out)
}
