mod common;

use common::{channel, cleanup_session_file, free_port, read_session_file, RunningReceiver};
use mpat::SenderSession;

/// Two ideal channels, one 4 KiB payload. The receiver's finalized file must
/// equal the original payload byte-for-byte.
#[test]
fn two_channels_round_trip() {
	let channels = vec![channel("a", free_port()), channel("b", free_port())];

	let receiver = RunningReceiver::spawn(channels.clone());

	let payload = vec![b'A'; 4096];
	let session = SenderSession::new(channels).unwrap().with_segment_size(256).with_session_id(10_001);
	let session_id = session.session_id();

	session.send(&payload).unwrap();

	// The receiver's FIN handler finalizes synchronously on its connection
	// thread, but that thread is joined asynchronously from this one; give
	// it a moment to land before reading the file back.
	std::thread::sleep(std::time::Duration::from_millis(200));

	let written = read_session_file(session_id);
	assert_eq!(written, payload);

	cleanup_session_file(session_id);
	receiver.stop();
}

/// One channel, a single-byte payload: after PKCS#7 padding this is one
/// 16-byte ciphertext block, carried in exactly one DATA frame.
#[test]
fn single_channel_single_byte_round_trip() {
	let channels = vec![channel("solo", free_port())];

	let receiver = RunningReceiver::spawn(channels.clone());

	let payload = vec![0x42u8];
	let session = SenderSession::new(channels).unwrap().with_session_id(10_002);
	let session_id = session.session_id();

	session.send(&payload).unwrap();

	std::thread::sleep(std::time::Duration::from_millis(200));

	let written = read_session_file(session_id);
	assert_eq!(written, payload);

	cleanup_session_file(session_id);
	receiver.stop();
}
