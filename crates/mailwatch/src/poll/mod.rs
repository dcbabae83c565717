//! Periodic polling: the scheduler dispatches one check per active account,
//! and every observed message passes the dedup gate before it is published.

pub mod gate;
pub mod scheduler;

pub use gate::{Admission, DedupGate};
pub use scheduler::PollScheduler;
