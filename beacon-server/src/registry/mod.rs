mod connection_handle;
mod connection_registry;

pub use connection_handle::*;
pub use connection_registry::*;
