pub mod mock_transport;
pub mod test_peer;

pub use mock_transport::*;
pub use test_peer::*;
