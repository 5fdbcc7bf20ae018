use std::net::{SocketAddr, ToSocketAddrs};

use utils::error::{MpatError, Result};

/// An immutable description of one channel: a display name and a transport
/// address. `name` is display-only — `(host, port)` is what the endpoint
/// actually dials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDescriptor {
	pub name: String,
	pub host: String,
	pub port: u16,
}

impl ChannelDescriptor {
	pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
		Self { name: name.into(), host: host.into(), port }
	}

	/// Resolves this descriptor's `(host, port)` to a concrete socket address.
	pub fn socket_addr(&self) -> Result<SocketAddr> {
		(self.host.as_str(), self.port)
			.to_socket_addrs()
			.map_err(|err| MpatError::Configuration(format!("could not resolve {}:{}: {err}", self.host, self.port)))?
			.next()
			.ok_or_else(|| MpatError::Configuration(format!("{}:{} resolved to no addresses", self.host, self.port)))
	}

	/// Validates a channel list: non-empty, and every descriptor resolvable.
	///
	/// Surfaced synchronously at startup, matching the propagation policy for
	/// `ConfigurationError` — callers should not have to dispatch a segment
	/// before discovering a bad address.
	pub fn validate_list(channels: &[ChannelDescriptor]) -> Result<()> {
		if channels.is_empty() {
			return Err(MpatError::Configuration("channel list must not be empty".into()));
		}

		for channel in channels {
			channel.socket_addr()?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_list_is_configuration_error() {
		assert!(matches!(ChannelDescriptor::validate_list(&[]), Err(MpatError::Configuration(_))));
	}

	#[test]
	fn unresolvable_host_is_configuration_error() {
		let channels = vec![ChannelDescriptor::new("bad", "this.host.does.not.resolve.invalid", 1)];
		assert!(matches!(ChannelDescriptor::validate_list(&channels), Err(MpatError::Configuration(_))));
	}

	#[test]
	fn loopback_resolves() {
		let channels = vec![ChannelDescriptor::new("local", "127.0.0.1", 9001)];
		assert!(ChannelDescriptor::validate_list(&channels).is_ok());
	}
}
