mod common;

use std::time::Duration;

use common::{channel, cleanup_session_file, free_port, read_session_file, RunningReceiver};
use mpat::SenderSession;

/// A second, entirely unreachable channel is registered alongside a live
/// one. Two unmeasured channels tie-break to the first by registration
/// order (§4.3), so the live channel — registered first — carries every
/// segment from the start and the dead one is never dialed at all; the
/// transfer completes without needing its retry budget.
#[test]
fn transfer_survives_one_dead_channel() {
	let live = channel("live", free_port());
	let dead = channel("dead", free_port());

	// Only the live channel gets a receiver; `dead`'s port has nothing bound.
	let receiver = RunningReceiver::spawn(vec![live.clone()]);

	let channels = vec![live, dead];
	let payload = vec![b'Z'; 4096];

	let session = SenderSession::new(channels)
		.unwrap()
		.with_segment_size(256)
		.with_retransmission_limit(8)
		.with_timeout(Some(Duration::from_millis(200)))
		.with_session_id(30_001);

	session.send(&payload).unwrap();

	std::thread::sleep(Duration::from_millis(300));

	assert_eq!(read_session_file(30_001), payload);

	cleanup_session_file(30_001);
	receiver.stop();
}
