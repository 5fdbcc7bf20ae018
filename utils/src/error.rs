use std::fmt;
use std::io;

/// The error taxonomy shared by every MPAT crate.
///
/// Each variant corresponds to one of the error kinds named by the transport's
/// propagation policy: transient transport errors are retried locally by the
/// caller, structural errors are surfaced synchronously, and receiver-side
/// errors are logged and scoped to the offending connection or session.
#[derive(Debug)]
pub enum MpatError {
	/// A frame was truncated, malformed, or would have collided with a reserved tag.
	Framing(String),
	/// A transport-level I/O failure: connect, read, write, or a configured timeout.
	Channel(String),
	/// A received DATA frame's ciphertext did not hash to its checksum.
	ChecksumMismatch,
	/// A KEY or FIN exchange got back something other than ACK — the
	/// receiver has no way to NACK a control frame, so anything else here
	/// is unexpected rather than a checksum failure.
	UnexpectedResponse(String),
	/// A segment exhausted its retransmission budget without being ACKed.
	RetryExhausted { segment_index: u32 },
	/// A session was finalized with a gap in its segment indices.
	MissingSegments { expected: u32, stored: usize },
	/// AES-CBC decryption or PKCS#7 unpadding failed.
	DecryptionFailure,
	/// The channel list or an individual channel address was invalid.
	Configuration(String),
}

impl fmt::Display for MpatError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Framing(msg) => write!(f, "framing error: {msg}"),
			Self::Channel(msg) => write!(f, "channel error: {msg}"),
			Self::ChecksumMismatch => write!(f, "checksum mismatch"),
			Self::UnexpectedResponse(msg) => write!(f, "unexpected response: {msg}"),
			Self::RetryExhausted { segment_index } => write!(f, "segment {segment_index} exhausted its retransmission budget"),
			Self::MissingSegments { expected, stored } => write!(f, "expected {expected} segments, found {stored}"),
			Self::DecryptionFailure => write!(f, "decryption failure"),
			Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
		}
	}
}

impl std::error::Error for MpatError {}

impl From<io::Error> for MpatError {
	fn from(value: io::Error) -> Self {
		Self::Channel(value.to_string())
	}
}

pub type Result<T = ()> = std::result::Result<T, MpatError>;

#[doc(hidden)]
pub trait Ext<T> {
	/// Logs `err` via `f` and discards it, keeping only whether the result was `Ok`.
	fn ok_or(self, f: impl FnOnce(&MpatError)) -> Option<T>;
}

impl<T> Ext<T> for Result<T> {
	fn ok_or(self, f: impl FnOnce(&MpatError)) -> Option<T> {
		match self {
			Ok(v) => Some(v),
			Err(e) => {
				f(&e);
				None
			}
		}
	}
}

pub use Ext as _;
