//! Transport adapters.

mod in_memory;
mod ws;

pub use in_memory::{duplex_pair, ClientHandle, InMemoryTransport};
pub use ws::WsTransport;
