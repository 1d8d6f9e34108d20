//! Blocking queues that connect pipeline stages.

pub mod bounded;
pub mod iter;

pub use bounded::{ClosableQueue, Message};
pub use iter::QueueIter;
