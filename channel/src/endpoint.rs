use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use log::warn;
use utils::error::{MpatError, Result};

use crate::descriptor::ChannelDescriptor;

/// A single (host, port) link. Each exchange opens a fresh TCP connection,
/// writes one framed message, reads exactly 4 response bytes, and closes —
/// there is no connection reuse across frames in this revision (§4.2).
pub struct ChannelEndpoint {
	descriptor: ChannelDescriptor,
	timeout: Option<Duration>,
}

/// The outcome of one successful exchange, used by the caller to update the
/// selector's measurement table.
pub struct Exchange {
	pub response: [u8; 4],
	pub elapsed: Duration,
}

impl ChannelEndpoint {
	pub fn new(descriptor: ChannelDescriptor) -> Self {
		Self { descriptor, timeout: None }
	}

	/// Sets a wall-clock deadline applied to connect, write, and read. The
	/// reference behavior is to wait indefinitely on TCP; this is an ambient
	/// addition for callers that cannot afford to block forever on a
	/// half-open socket (§4.2). `None` (the default) preserves the reference
	/// behavior.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn descriptor(&self) -> &ChannelDescriptor {
		&self.descriptor
	}

	/// Opens a connection, writes `frame_bytes`, and reads exactly 4 response
	/// bytes. Fails with [`MpatError::Channel`] on any I/O error, connection
	/// failure, or short read.
	pub fn send_and_await(&self, frame_bytes: &[u8]) -> Result<Exchange> {
		let start = Instant::now();

		let addr = self.descriptor.socket_addr()?;

		let mut stream = match self.timeout {
			Some(timeout) => TcpStream::connect_timeout(&addr, timeout).map_err(connect_err(&self.descriptor))?,
			None => TcpStream::connect(addr).map_err(connect_err(&self.descriptor))?,
		};

		stream.set_read_timeout(self.timeout).map_err(MpatError::from)?;
		stream.set_write_timeout(self.timeout).map_err(MpatError::from)?;

		stream.write_all(frame_bytes).map_err(MpatError::from)?;

		let mut response = [0u8; 4];
		stream.read_exact(&mut response).map_err(|err| {
			warn!("short read awaiting response on channel {}: {err}", self.descriptor.name);
			MpatError::Channel(err.to_string())
		})?;

		Ok(Exchange { response, elapsed: start.elapsed() })
	}
}

fn connect_err(descriptor: &ChannelDescriptor) -> impl Fn(std::io::Error) -> MpatError + '_ {
	move |err| {
		warn!("failed to connect on channel {}: {err}", descriptor.name);
		MpatError::Channel(err.to_string())
	}
}
