#![no_std]
#![forbid(unsafe_code)]
#![forbid(unreachable_pub)]

//! Thread lifecycle manager and dispatcher for a discrete-event OS simulator.
//!
//! This library owns the status machine of simulated threads, from creation
//! through termination, and the non-preemptive FIFO policy that decides which
//! ready thread occupies the single simulated processor.
//!
//! Everything runs as atomic steps triggered by simulated events. "Waiting"
//! is a status value, never a real suspension of the host.
//!
//! # Quick Start
//!
//! ```ignore
//! use simthreads::machine::sim::{SimEvent, SimMachine};
//! use simthreads::Kernel;
//!
//! let mut machine = SimMachine::new(2);
//! let task = machine.tasks.spawn_task();
//! let kernel = Kernel::new(machine);
//! kernel.init()?;
//!
//! let a = kernel.create(task)?; // dispatched immediately
//! let b = kernel.create(task)?; // queued behind `a`
//!
//! let mut disk = SimEvent::new();
//! kernel.suspend(a, &mut disk)?; // `b` takes the processor
//! disk.notify(&kernel)?; // `a` is ready again
//! ```
//!
//! # Architecture
//!
//! - [`thread`]: thread control blocks and the status machine
//! - [`sched`]: the FIFO ready queue and the dispatch decision
//! - [`machine`]: interfaces to tasks, the MMU, devices, resources and
//!   events, plus an in-memory implementation
//! - [`kernel`]: the scheduler context tying them together

pub mod config;
pub mod errors;
pub mod kernel;
pub mod machine;
pub mod sched;
pub mod thread;

#[cfg(test)]
extern crate std;

extern crate alloc;

#[cfg(test)]
mod tests;

// ============================================================================
// Public API
// ============================================================================

pub use config::KernelConfig;
pub use errors::{ScheduleError, SpawnError, ThreadError, ThreadResult};
pub use kernel::Kernel;
pub use machine::{Event, Machine};
pub use sched::{Dispatch, ReadyQueue};
pub use thread::{TaskId, ThreadControlBlock, ThreadId, ThreadStatus};
