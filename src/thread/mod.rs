//! Thread control blocks and their status machine.

use core::fmt;
use core::num::NonZeroUsize;

pub mod status;

pub use status::ThreadStatus;

/// Unique identifier of a simulated thread. Never zero, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(NonZeroUsize);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ThreadId {
    /// Create a thread ID, or `None` for zero.
    pub fn new(id: usize) -> Option<Self> {
        NonZeroUsize::new(id).map(Self)
    }

    /// Get the raw ID value.
    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// Identifier of a task as known to the task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The record representing one thread.
///
/// The owning task is recorded by id only; the task table owns the
/// membership list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadControlBlock {
    id: ThreadId,
    task: TaskId,
    priority: u8,
    status: ThreadStatus,
}

impl ThreadControlBlock {
    /// Create a new `Ready` thread belonging to `task`.
    pub fn new(id: ThreadId, task: TaskId, priority: u8) -> Self {
        Self {
            id,
            task,
            priority,
            status: ThreadStatus::Ready,
        }
    }

    /// Get the thread's unique identifier.
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Get the task this thread belongs to.
    pub fn task(&self) -> TaskId {
        self.task
    }

    /// Get the thread's priority.
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Set the thread's priority. Advisory only.
    pub fn set_priority(&mut self, priority: u8) {
        self.priority = priority;
    }

    /// Get the thread's current status.
    pub fn status(&self) -> ThreadStatus {
        self.status
    }

    /// Set the thread's status.
    pub fn set_status(&mut self, status: ThreadStatus) {
        self.status = status;
    }
}

impl fmt::Display for ThreadControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "thread {} (task {}, prio {}, {})",
            self.id, self.task, self.priority, self.status
        )
    }
}
