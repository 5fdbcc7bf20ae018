use std::fs;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use mpat::{ChannelDescriptor, ReceiverEndpoint};

/// Binds an ephemeral port and immediately releases it, for constructing a
/// [`ChannelDescriptor`] before the receiver binds the real listener.
pub fn free_port() -> u16 {
	TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

pub fn channel(name: &str, port: u16) -> ChannelDescriptor {
	ChannelDescriptor::new(name, "127.0.0.1", port)
}

/// Starts a [`ReceiverEndpoint`] on `channels` on a background thread and
/// returns a handle whose `stop()` clears the run flag and joins the thread.
pub struct RunningReceiver {
	running: Arc<AtomicBool>,
	handle: Option<JoinHandle<()>>,
}

impl RunningReceiver {
	pub fn spawn(channels: Vec<ChannelDescriptor>) -> Self {
		let running = Arc::new(AtomicBool::new(true));
		let running_clone = running.clone();

		let handle = thread::spawn(move || {
			ReceiverEndpoint::new().start(&channels, running_clone).unwrap();
		});

		// Give the listener threads a moment to bind before the sender dials.
		thread::sleep(Duration::from_millis(100));

		Self { running, handle: Some(handle) }
	}

	pub fn stop(mut self) {
		self.running.store(false, Ordering::SeqCst);
		if let Some(handle) = self.handle.take() {
			handle.join().unwrap();
		}
	}
}

/// Removes a `session_<id>.dat` file left by the default sink, ignoring a
/// missing file.
pub fn cleanup_session_file(session_id: u32) {
	let _ = fs::remove_file(format!("session_{session_id}.dat"));
}

pub fn read_session_file(session_id: u32) -> Vec<u8> {
	fs::read(format!("session_{session_id}.dat")).expect("expected session output file to exist")
}
