use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch, truncated to 32 bits.
///
/// This is the sender's default session-id source: collision-tolerant only at
/// the scale of a single process, since two sessions started within the same
/// second collide. Callers that need a stronger guarantee should supply their
/// own id instead of relying on this helper.
pub fn unix_session_id() -> u32 {
	let secs = SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock should be after the Unix epoch").as_secs();

	secs as u32
}
