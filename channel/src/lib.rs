//! A single logical link between sender and receiver, and the scorer that
//! picks among a set of them.

mod descriptor;
mod endpoint;
mod selector;

pub use descriptor::ChannelDescriptor;
pub use endpoint::ChannelEndpoint;
pub use selector::{ChannelSelector, Measurement};
