mod common;

use common::{channel, cleanup_session_file, free_port, read_session_file, RunningReceiver};
use mpat::SenderSession;

/// Two concurrent sessions with distinct session ids sharing the same
/// listeners must each produce their own output file, unmixed.
#[test]
fn two_sessions_share_listeners_without_mixing() {
	let channels = vec![channel("a", free_port()), channel("b", free_port())];

	let receiver = RunningReceiver::spawn(channels.clone());

	let first = SenderSession::new(channels.clone()).unwrap().with_session_id(20_001);
	let second = SenderSession::new(channels).unwrap().with_session_id(20_002);

	let first_payload = vec![b'X'; 2048];
	let second_payload = vec![b'Y'; 3000];

	std::thread::scope(|scope| {
		scope.spawn(|| first.send(&first_payload).unwrap());
		scope.spawn(|| second.send(&second_payload).unwrap());
	});

	std::thread::sleep(std::time::Duration::from_millis(200));

	assert_eq!(read_session_file(20_001), first_payload);
	assert_eq!(read_session_file(20_002), second_payload);

	cleanup_session_file(20_001);
	cleanup_session_file(20_002);
	receiver.stop();
}
