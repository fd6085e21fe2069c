mod call_client;
mod signal_sink;
mod ws_relay;

pub use call_client::*;
pub use signal_sink::*;
pub use ws_relay::*;
