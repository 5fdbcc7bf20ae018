use std::io::{ErrorKind, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use channel::ChannelDescriptor;
use log::{error, info, warn};
use utils::error::{MpatError, Result};
use wire::{Frame, ACK, NACK};

use crate::finalize::{file_sink, finalize, Sink};
use crate::registry::SessionRegistry;

/// How long the per-channel accept loop sleeps between non-blocking accept
/// attempts while waiting for `running` to change.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Binds a listener on every channel's address, accepts connections
/// concurrently, and dispatches each frame to the [`SessionRegistry`] and
/// [`Finalizer`](crate::finalize) (§4.5).
pub struct ReceiverEndpoint {
	registry: Arc<SessionRegistry>,
	sink: Sink,
}

impl Default for ReceiverEndpoint {
	fn default() -> Self {
		Self { registry: Arc::new(SessionRegistry::new()), sink: file_sink() }
	}
}

impl ReceiverEndpoint {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the default `session_<id>.dat` file sink (§4.7).
	pub fn set_sink(&mut self, sink: Sink) {
		self.sink = sink;
	}

	/// Binds a listener on each of `channels`' addresses and serves until
	/// `running` is cleared. Each channel's accept loop, and each accepted
	/// connection, runs on its own thread (§4.5, §5).
	pub fn start(&self, channels: &[ChannelDescriptor], running: Arc<AtomicBool>) -> Result<()> {
		ChannelDescriptor::validate_list(channels)?;

		let listeners: Vec<(String, TcpListener)> = channels
			.iter()
			.map(|descriptor| {
				let addr = descriptor.socket_addr()?;
				let listener = TcpListener::bind(addr).map_err(MpatError::from)?;
				listener.set_nonblocking(true).map_err(MpatError::from)?;
				Ok((descriptor.name.clone(), listener))
			})
			.collect::<Result<_>>()?;

		info!("receiver listening on {} channel(s)", listeners.len());

		std::thread::scope(|scope| {
			for (name, listener) in &listeners {
				let running = running.clone();
				scope.spawn(move || self.accept_loop(name, listener, &running));
			}
		});

		info!("receiver shut down");
		Ok(())
	}

	/// Convenience wrapper that installs a `ctrlc` handler and serves until
	/// interrupted, for binaries that want the common case (§5).
	pub fn start_until_ctrl_c(&self, channels: &[ChannelDescriptor]) -> Result<()> {
		let running = Arc::new(AtomicBool::new(true));
		let handler_flag = running.clone();

		ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
			.map_err(|err| MpatError::Configuration(format!("failed to install Ctrl+C handler: {err}")))?;

		self.start(channels, running)
	}

	fn accept_loop(&self, name: &str, listener: &TcpListener, running: &AtomicBool) {
		while running.load(Ordering::Relaxed) {
			match listener.accept() {
				Ok((stream, peer)) => {
					info!("channel {name}: accepted connection from {peer}");

					let registry = self.registry.clone();
					let sink = self.sink.clone();
					let name = name.to_string();

					std::thread::spawn(move || handle_connection(&name, stream, &registry, &sink));
				}
				Err(err) if err.kind() == ErrorKind::WouldBlock => std::thread::sleep(POLL_INTERVAL),
				Err(err) => warn!("channel {name}: accept failed: {err}"),
			}
		}
	}
}

/// Reads frames from one accepted connection until the peer closes or a FIN
/// is observed. A single connection may carry multiple frames; the sender's
/// current behavior of one connection per frame is not assumed (§4.5).
fn handle_connection(name: &str, mut stream: TcpStream, registry: &SessionRegistry, sink: &Sink) {
	loop {
		let frame = match Frame::read_from(&mut stream) {
			Ok(frame) => frame,
			Err(MpatError::Framing(msg)) if msg.contains("closed") => {
				info!("channel {name}: connection closed by peer");
				return;
			}
			Err(err) => {
				warn!("channel {name}: connection error: {err}");
				return;
			}
		};

		match frame {
			Frame::Key { session_id, key, iv } => {
				registry.store_key(session_id, key, iv);
				if !respond(&mut stream, name, session_id, ACK) {
					return;
				}
			}
			Frame::Fin { session_id } => {
				let _ = respond(&mut stream, name, session_id, ACK);

				match finalize(registry, session_id, sink) {
					Ok(()) => info!("channel {name}: session {session_id} finalized"),
					Err(err) => error!("channel {name}: session {session_id} finalize failed: {err}"),
				}

				return;
			}
			Frame::Data { session_id, segment_index, checksum, ciphertext } => {
				if crypto::sha256(&ciphertext) == checksum {
					registry.store_segment(session_id, segment_index, ciphertext);
					if !respond(&mut stream, name, session_id, ACK) {
						return;
					}
				} else {
					warn!("channel {name}: session {session_id} segment {segment_index} checksum mismatch");
					if !respond(&mut stream, name, session_id, NACK) {
						return;
					}
				}
			}
		}
	}
}

/// Writes a 4-byte response, logging and returning `false` on I/O failure so
/// the caller can drop the connection.
fn respond(stream: &mut TcpStream, name: &str, session_id: u32, response: [u8; 4]) -> bool {
	match stream.write_all(&response) {
		Ok(()) => true,
		Err(err) => {
			warn!("channel {name}: session {session_id}: failed to write response: {err}");
			false
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Read;
	use std::net::TcpStream as ClientStream;
	use std::sync::atomic::AtomicUsize;
	use std::thread;

	#[test]
	fn key_data_fin_round_trip_over_loopback() {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();

		let key = crypto::generate_key();
		let iv = crypto::generate_iv();
		let ciphertext = crypto::encrypt(b"round trip payload", &key, &iv);

		let written = Arc::new(AtomicUsize::new(0));
		let written_clone = written.clone();

		let endpoint_registry = Arc::new(SessionRegistry::new());
		let registry_clone = endpoint_registry.clone();
		let sink: Sink = Arc::new(move |_session_id, data| {
			assert_eq!(data, b"round trip payload");
			written_clone.fetch_add(1, Ordering::SeqCst);
		});
		let sink_clone = sink.clone();

		let server = thread::spawn(move || {
			let (stream, _) = listener.accept().unwrap();
			handle_connection("test", stream, &registry_clone, &sink_clone);
		});

		let mut client = ClientStream::connect(addr).unwrap();

		let key_frame = Frame::Key { session_id: 99, key, iv };
		client.write_all(&key_frame.encode().unwrap()).unwrap();
		let mut ack = [0u8; 4];
		client.read_exact(&mut ack).unwrap();
		assert_eq!(ack, ACK);

		for (index, chunk) in ciphertext.chunks(4).enumerate() {
			let checksum = crypto::sha256(chunk);
			let frame = Frame::Data { session_id: 99, segment_index: index as u32, checksum, ciphertext: chunk.to_vec() };
			client.write_all(&frame.encode().unwrap()).unwrap();
			client.read_exact(&mut ack).unwrap();
			assert_eq!(ack, ACK);
		}

		let fin_frame = Frame::Fin { session_id: 99 };
		client.write_all(&fin_frame.encode().unwrap()).unwrap();
		client.read_exact(&mut ack).unwrap();
		assert_eq!(ack, ACK);

		server.join().unwrap();
		assert_eq!(written.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn corrupted_segment_is_nacked() {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();

		let registry = Arc::new(SessionRegistry::new());
		let registry_clone = registry.clone();
		let sink = file_sink();

		let server = thread::spawn(move || {
			let (stream, _) = listener.accept().unwrap();
			handle_connection("test", stream, &registry_clone, &sink);
		});

		let mut client = ClientStream::connect(addr).unwrap();
		let frame = Frame::Data { session_id: 1, segment_index: 0, checksum: [0xFF; 32], ciphertext: vec![1, 2, 3, 4] };
		client.write_all(&frame.encode().unwrap()).unwrap();

		let mut response = [0u8; 4];
		client.read_exact(&mut response).unwrap();
		assert_eq!(response, NACK);

		drop(client);
		server.join().unwrap();
	}
}
