//! Error handling for the thread lifecycle manager.
//!
//! None of these errors are fatal to a simulation run. A failed `create`
//! produces no thread, a failed dispatch leaves the processor idle until
//! the next event, and caller mistakes are reported without side effects.

#![allow(clippy::uninlined_format_args)]

use core::fmt;

use crate::thread::ThreadId;

/// Result type for thread lifecycle operations.
pub type ThreadResult<T> = Result<T, ThreadError>;

/// Top-level error type for all lifecycle and scheduling operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadError {
    /// Thread creation errors
    Spawn(SpawnError),
    /// Dispatching errors
    Schedule(ScheduleError),
    /// Invalid operation errors
    InvalidOperation(InvalidOperationError),
    /// Configuration errors
    Config(ConfigError),
}

/// Errors that can occur during thread creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// `Kernel::init` has not been called
    NotInitialized,
    /// The task already holds the maximum number of threads
    TooManyThreads,
    /// The task refused to register the thread
    TaskRejected,
}

/// Errors related to dispatching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The processor is idle and the ready queue is empty
    NoThreadsAvailable,
    /// Scheduler bookkeeping no longer matches thread status
    InvalidState,
}

/// Caller errors. These never mutate any state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidOperationError {
    /// No thread with this id was ever created
    UnknownThread(ThreadId),
    /// Operation is not allowed in the thread's current status
    WrongState(ThreadId),
    /// `Kernel::init` was called twice
    AlreadyInitialized,
}

/// Kernel configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A per-task thread cap of zero would make `create` always fail
    ZeroThreadCap,
}

impl fmt::Display for ThreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadError::Spawn(e) => write!(f, "Thread creation error: {}", e),
            ThreadError::Schedule(e) => write!(f, "Scheduling error: {}", e),
            ThreadError::InvalidOperation(e) => write!(f, "Invalid operation: {}", e),
            ThreadError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::NotInitialized => write!(f, "Thread manager not initialized"),
            SpawnError::TooManyThreads => write!(f, "Maximum threads per task reached"),
            SpawnError::TaskRejected => write!(f, "Task rejected thread registration"),
        }
    }
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::NoThreadsAvailable => write!(f, "No ready threads available"),
            ScheduleError::InvalidState => write!(f, "Scheduler is in an invalid state"),
        }
    }
}

impl fmt::Display for InvalidOperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidOperationError::UnknownThread(id) => write!(f, "Unknown thread {}", id),
            InvalidOperationError::WrongState(id) => {
                write!(f, "Thread {} is in the wrong state for this operation", id)
            }
            InvalidOperationError::AlreadyInitialized => {
                write!(f, "Thread manager already initialized")
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroThreadCap => write!(f, "Maximum threads per task must be non-zero"),
        }
    }
}

impl From<SpawnError> for ThreadError {
    fn from(error: SpawnError) -> Self {
        ThreadError::Spawn(error)
    }
}

impl From<ScheduleError> for ThreadError {
    fn from(error: ScheduleError) -> Self {
        ThreadError::Schedule(error)
    }
}

impl From<InvalidOperationError> for ThreadError {
    fn from(error: InvalidOperationError) -> Self {
        ThreadError::InvalidOperation(error)
    }
}

impl From<ConfigError> for ThreadError {
    fn from(error: ConfigError) -> Self {
        ThreadError::Config(error)
    }
}

impl ThreadError {
    /// Create an invalid state error.
    pub fn invalid_state() -> Self {
        ThreadError::Schedule(ScheduleError::InvalidState)
    }

    /// Whether this is the capacity failure of `create`.
    pub fn is_capacity(&self) -> bool {
        matches!(self, ThreadError::Spawn(SpawnError::TooManyThreads))
    }
}
