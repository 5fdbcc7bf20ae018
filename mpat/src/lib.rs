//! Public facade over the sender, receiver, and channel crates: a
//! session-oriented encrypted transport that stripes a payload across
//! several independent TCP channels and reassembles it on the other end.
//!
//! See [`sender::SenderSession`] and [`receiver::ReceiverEndpoint`] for the
//! two sides of a transfer; [`channel::ChannelDescriptor`] describes one
//! link.

pub use channel::ChannelDescriptor;
pub use receiver::{file_sink, ReceiverEndpoint, Sink};
pub use sender::SenderSession;
pub use utils::error::{MpatError, Result};
