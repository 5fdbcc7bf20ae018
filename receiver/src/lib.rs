//! Accepts connections, stores segments, and reassembles finished sessions.

mod finalize;
mod listener;
mod registry;

pub use finalize::{file_sink, Sink};
pub use listener::ReceiverEndpoint;
pub use registry::SessionRegistry;
