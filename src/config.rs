//! Kernel configuration.

use crate::errors::ConfigError;

/// Default cap on threads owned by a single task.
pub const MAX_THREADS_PER_TASK: usize = 10;

/// Priority given to every new thread. The dispatcher never reads it.
pub const DEFAULT_PRIORITY: u8 = 1;

/// Tunables for a [`Kernel`](crate::Kernel) instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Threads a task may own before `create` fails
    pub max_threads_per_task: usize,
    /// Priority assigned on creation
    pub default_priority: u8,
}

impl KernelConfig {
    /// Create a configuration with the default limits.
    pub const fn new() -> Self {
        Self {
            max_threads_per_task: MAX_THREADS_PER_TASK,
            default_priority: DEFAULT_PRIORITY,
        }
    }

    /// Set the per-task thread cap.
    pub const fn max_threads_per_task(mut self, max: usize) -> Self {
        self.max_threads_per_task = max;
        self
    }

    /// Set the priority assigned to new threads.
    pub const fn default_priority(mut self, priority: u8) -> Self {
        self.default_priority = priority;
        self
    }

    /// Check the configuration for values that make the kernel unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads_per_task == 0 {
            return Err(ConfigError::ZeroThreadCap);
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
