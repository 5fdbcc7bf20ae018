/// Byte-order helpers for the wire frame's fixed-width fields.
pub mod endian;
/// The shared error taxonomy used across every MPAT crate.
pub mod error;
/// Session-id and timestamp helpers.
pub mod time;
