mod delivery;
mod signaling_router;

pub use delivery::*;
pub use signaling_router::*;
