//! Big-endian integer helpers for the wire frame prefix and length fields.
//!
//! The on-wire format fixes every numeric field to network byte order; these
//! free functions are the single place that decision is encoded, so the codec
//! itself never calls `to_be_bytes`/`from_be_bytes` directly.

/// Reads a big-endian `u32` from the first 4 bytes of `buf`.
pub fn read_u32(buf: &[u8]) -> u32 {
	u32::from_be_bytes(buf[..4].try_into().expect("caller checked length"))
}

/// Writes `value` to `out` in big-endian order.
pub fn write_u32(out: &mut Vec<u8>, value: u32) {
	out.extend_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips() {
		let mut buf = Vec::new();
		write_u32(&mut buf, 0xDEAD_BEEF);
		assert_eq!(read_u32(&buf), 0xDEAD_BEEF);
	}
}
