//! Test helper utilities and common functionality.

use crate::config::KernelConfig;
use crate::kernel::Kernel;
use crate::machine::sim::SimMachine;
use crate::thread::{TaskId, ThreadId};
use alloc::vec::Vec;

/// An initialized kernel over a simulated machine with some tasks.
pub(crate) struct TestEnvironment {
    pub(crate) kernel: Kernel<SimMachine>,
    pub(crate) tasks: Vec<TaskId>,
}

impl TestEnvironment {
    /// `tasks` tasks, `cap` threads per task, `devices` devices.
    pub(crate) fn new(tasks: usize, cap: usize, devices: usize) -> Self {
        let mut machine = SimMachine::new(devices);
        let tasks = (0..tasks).map(|_| machine.tasks.spawn_task()).collect();
        let config = KernelConfig::new().max_threads_per_task(cap);
        let kernel = Kernel::with_config(machine, config).expect("valid config");
        kernel.init().expect("fresh kernel");
        Self { kernel, tasks }
    }

    pub(crate) fn task(&self, index: usize) -> TaskId {
        self.tasks[index]
    }

    /// Create a thread that must succeed.
    pub(crate) fn spawn(&self, task: usize) -> ThreadId {
        self.kernel
            .create(self.task(task))
            .expect("Failed to create thread")
    }

    pub(crate) fn thread_count(&self, task: usize) -> usize {
        let task = self.task(task);
        self.kernel
            .with_machine(|m| m.tasks.get(task).map_or(0, |t| t.threads().len()))
    }

    pub(crate) fn task_alive(&self, task: usize) -> bool {
        let task = self.task(task);
        self.kernel
            .with_machine(|m| m.tasks.get(task).is_some_and(|t| t.is_alive()))
    }

    pub(crate) fn assert_invariants(&self) {
        if let Err(e) = self.kernel.verify() {
            self.kernel.at_error();
            panic!("invariant violated: {}", e);
        }
    }
}

/// Simple linear congruential generator for property testing.
pub(crate) struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state >> 33
    }

    pub(crate) fn gen_range(&mut self, min: u64, max: u64) -> u64 {
        min + (self.next_u64() % (max - min))
    }
}
