mod call;
mod transport;

pub use call::*;
pub use transport::*;
