mod negotiation_ledger;
mod session_coordinator;

pub use negotiation_ledger::*;
pub use session_coordinator::*;
