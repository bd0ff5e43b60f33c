//! Collaborator interfaces.
//!
//! The thread manager does not own tasks, the memory unit, devices,
//! resources or events. It reaches them through these traits, bundled
//! by [`Machine`]. [`sim`] provides an in-memory implementation.

use crate::errors::SpawnError;
use crate::thread::{TaskId, ThreadId};

pub mod sim;

/// Handle to a task's page table.
///
/// Only identity matters here: the page table tells the dispatcher
/// which task's address space is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTable {
    task: TaskId,
}

impl PageTable {
    pub fn new(task: TaskId) -> Self {
        Self { task }
    }

    /// Task whose address space this table maps.
    pub fn task(&self) -> TaskId {
        self.task
    }
}

/// Task bookkeeping: thread membership and the current-thread slot.
pub trait TaskTable {
    /// Number of live threads registered with `task`.
    fn thread_count(&self, task: TaskId) -> usize;

    /// Register a new thread with `task`.
    ///
    /// Fails if the task's own bookkeeping rejects it.
    fn add_thread(&mut self, task: TaskId, thread: ThreadId) -> Result<(), SpawnError>;

    /// Detach `thread` from `task`. Unconditional.
    fn remove_thread(&mut self, task: TaskId, thread: ThreadId);

    /// Thread occupying the processor on behalf of `task`, if any.
    fn current_thread(&self, task: TaskId) -> Option<ThreadId>;

    fn set_current_thread(&mut self, task: TaskId, thread: Option<ThreadId>);

    /// Page table used to program the memory unit when one of the task's
    /// threads runs.
    fn page_table(&self, task: TaskId) -> PageTable;

    /// Terminate `task`. Called once its last thread is killed.
    fn kill(&mut self, task: TaskId);
}

/// The memory unit's page-table-base register.
pub trait Mmu {
    fn page_table_base(&self) -> Option<PageTable>;

    fn set_page_table_base(&mut self, table: Option<PageTable>);
}

/// A device with a queue of pending I/O requests.
pub trait Device {
    /// Cancel every pending request issued by `thread`.
    fn cancel_pending_io(&mut self, thread: ThreadId);
}

/// The system device table.
pub trait DeviceTable {
    /// Visit every device in the table.
    fn for_each_device(&mut self, f: &mut dyn FnMut(&mut dyn Device));
}

/// Resource allocation bookkeeping.
pub trait ResourceManager {
    /// Give back every resource unit `thread` holds.
    fn release_all(&mut self, thread: ThreadId);
}

/// Something a thread can be suspended on.
pub trait Event {
    /// Add `thread` to this event's wait set.
    fn add_thread(&mut self, thread: ThreadId);
}

/// Everything the thread manager needs from the rest of the simulator.
pub trait Machine {
    type Tasks: TaskTable;
    type Mmu: Mmu;
    type Devices: DeviceTable;
    type Resources: ResourceManager;

    fn tasks(&self) -> &Self::Tasks;
    fn tasks_mut(&mut self) -> &mut Self::Tasks;
    fn mmu(&self) -> &Self::Mmu;
    fn mmu_mut(&mut self) -> &mut Self::Mmu;
    fn devices_mut(&mut self) -> &mut Self::Devices;
    fn resources_mut(&mut self) -> &mut Self::Resources;
}
