//! Ready queue and dispatcher.
//!
//! Scheduling is strict FIFO and non-preemptive on a single processor.

pub mod dispatch;
pub mod ready_queue;

pub use dispatch::{select, Dispatch};
pub use ready_queue::ReadyQueue;
