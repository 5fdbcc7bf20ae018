//! Wire framing for the three MPAT message shapes.
//!
//! Every frame shares an 8-byte prefix: a big-endian `session_id` followed by
//! a 4-byte tag. The tag is either one of the two reserved ASCII markers
//! (`KEY\0`, `FIN\0`) or, for DATA frames, the big-endian `segment_index`
//! itself — the tag space and the segment-index space are the same 32 bits.
//! See [`is_reserved_index`] for the consequence of that overlap.

use std::io::{self, Read, Write};

use log::warn;
use utils::endian::{read_u32, write_u32};
use utils::error::{MpatError, Result};

/// The literal tag bytes of a KEY frame.
pub const KEY_TAG: [u8; 4] = *b"KEY\0";
/// The literal tag bytes of a FIN frame.
pub const FIN_TAG: [u8; 4] = *b"FIN\0";

/// The 4-byte response sent when a frame was accepted.
pub const ACK: [u8; 4] = *b"ACK\0";
/// The 4-byte response sent when a DATA frame's checksum did not match.
pub const NACK: [u8; 4] = *b"NACK";

/// The length in bytes of a KEY frame's payload: a 16-byte key followed by a 16-byte IV.
pub const KEY_PAYLOAD_LEN: usize = 32;
/// The length in bytes of a SHA-256 checksum.
pub const CHECKSUM_LEN: usize = 32;

/// Returns whether `segment_index`'s big-endian encoding collides with a reserved tag.
///
/// The codec reserves the two 32-bit values whose bytes read `KEY\0` or `FIN\0`
/// so a DATA frame can never be mistaken for a control frame. A conforming
/// segmenter must skip these two values when assigning indices; this function
/// is also used by [`Frame::encode`] as a last-resort guard against a bug in
/// that skip logic.
pub fn is_reserved_index(segment_index: u32) -> bool {
	let bytes = segment_index.to_be_bytes();
	bytes == KEY_TAG || bytes == FIN_TAG
}

/// One of the three on-wire message shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
	/// Carries the session's symmetric key and initialization vector.
	Key { session_id: u32, key: [u8; 16], iv: [u8; 16] },
	/// Signals that no further DATA frames will be sent for this session.
	Fin { session_id: u32 },
	/// Carries one ciphertext segment and its checksum.
	Data { session_id: u32, segment_index: u32, checksum: [u8; 32], ciphertext: Vec<u8> },
}

impl Frame {
	/// Encodes this frame to its on-wire representation.
	///
	/// Fails with [`MpatError::Framing`] if this is a DATA frame whose
	/// `segment_index` collides with a reserved tag (see [`is_reserved_index`]).
	pub fn encode(&self) -> Result<Vec<u8>> {
		let mut out = Vec::new();

		match self {
			Self::Key { session_id, key, iv } => {
				write_u32(&mut out, *session_id);
				out.extend_from_slice(&KEY_TAG);
				write_u32(&mut out, KEY_PAYLOAD_LEN as u32);
				out.extend_from_slice(key);
				out.extend_from_slice(iv);
			}
			Self::Fin { session_id } => {
				write_u32(&mut out, *session_id);
				out.extend_from_slice(&FIN_TAG);
				write_u32(&mut out, 0);
			}
			Self::Data { session_id, segment_index, checksum, ciphertext } => {
				if is_reserved_index(*segment_index) {
					return Err(MpatError::Framing(format!("segment_index {segment_index:#x} collides with a reserved control tag")));
				}

				write_u32(&mut out, *session_id);
				write_u32(&mut out, *segment_index);
				out.extend_from_slice(checksum);
				write_u32(&mut out, ciphertext.len() as u32);
				out.extend_from_slice(ciphertext);
			}
		}

		Ok(out)
	}

	/// Writes the encoded frame to `w`.
	pub fn write_to(&self, w: &mut impl Write) -> Result<()> {
		let bytes = self.encode()?;
		w.write_all(&bytes)?;
		Ok(())
	}

	/// Reads one frame from `r`.
	///
	/// Returns [`MpatError::Framing`] on a truncated or malformed frame. A
	/// peer closing the connection before any bytes of a new frame arrive is
	/// reported via the underlying `io::Error` (typically `UnexpectedEof`),
	/// which callers should treat as ordinary connection termination, not a
	/// framing error, when it occurs at a frame boundary.
	pub fn read_from(r: &mut impl Read) -> Result<Frame> {
		let mut prefix = [0u8; 8];
		r.read_exact(&mut prefix).map_err(io_err)?;

		let session_id = read_u32(&prefix[..4]);
		let tag = &prefix[4..8];

		if tag == KEY_TAG {
			let mut len_buf = [0u8; 4];
			r.read_exact(&mut len_buf).map_err(io_err)?;
			let len = read_u32(&len_buf) as usize;

			if len != KEY_PAYLOAD_LEN {
				warn!("KEY frame for session {session_id} has invalid length {len}");
				return Err(MpatError::Framing(format!("KEY payload length must be {KEY_PAYLOAD_LEN}, got {len}")));
			}

			let mut payload = [0u8; KEY_PAYLOAD_LEN];
			r.read_exact(&mut payload).map_err(io_err)?;

			let mut key = [0u8; 16];
			let mut iv = [0u8; 16];
			key.copy_from_slice(&payload[..16]);
			iv.copy_from_slice(&payload[16..]);

			Ok(Frame::Key { session_id, key, iv })
		} else if tag == FIN_TAG {
			let mut len_buf = [0u8; 4];
			r.read_exact(&mut len_buf).map_err(io_err)?;
			let len = read_u32(&len_buf);

			if len != 0 {
				warn!("FIN frame for session {session_id} has non-zero length {len}");
				return Err(MpatError::Framing(format!("FIN payload length must be 0, got {len}")));
			}

			Ok(Frame::Fin { session_id })
		} else {
			let segment_index = read_u32(tag);

			let mut checksum = [0u8; CHECKSUM_LEN];
			r.read_exact(&mut checksum).map_err(io_err)?;

			let mut len_buf = [0u8; 4];
			r.read_exact(&mut len_buf).map_err(io_err)?;
			let len = read_u32(&len_buf) as usize;

			let mut ciphertext = vec![0u8; len];
			r.read_exact(&mut ciphertext).map_err(io_err)?;

			Ok(Frame::Data { session_id, segment_index, checksum, ciphertext })
		}
	}

	/// Returns this frame's session id.
	pub fn session_id(&self) -> u32 {
		match self {
			Self::Key { session_id, .. } | Self::Fin { session_id, .. } | Self::Data { session_id, .. } => *session_id,
		}
	}
}

fn io_err(err: io::Error) -> MpatError {
	if err.kind() == io::ErrorKind::UnexpectedEof {
		MpatError::Framing("connection closed mid-frame".into())
	} else {
		MpatError::Channel(err.to_string())
	}
}
