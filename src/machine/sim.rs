//! In-memory machine used by simulation drivers and tests.

use super::{Device, DeviceTable, Event, Machine, Mmu, PageTable, ResourceManager, TaskTable};
use crate::errors::{SpawnError, ThreadResult};
use crate::kernel::Kernel;
use crate::thread::{TaskId, ThreadId};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// A simulated task.
#[derive(Debug, Default, Clone)]
pub struct SimTask {
    threads: Vec<ThreadId>,
    current: Option<ThreadId>,
    alive: bool,
    reject_threads: bool,
}

impl SimTask {
    /// Threads registered with the task, in registration order.
    pub fn threads(&self) -> &[ThreadId] {
        &self.threads
    }

    pub fn current_thread(&self) -> Option<ThreadId> {
        self.current
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Table of simulated tasks.
#[derive(Debug, Default)]
pub struct SimTasks {
    tasks: BTreeMap<TaskId, SimTask>,
    next_id: usize,
}

impl SimTasks {
    /// Create a live task with no threads.
    pub fn spawn_task(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert(
            id,
            SimTask {
                alive: true,
                ..SimTask::default()
            },
        );
        id
    }

    pub fn get(&self, task: TaskId) -> Option<&SimTask> {
        self.tasks.get(&task)
    }

    /// Make `add_thread` fail for `task`.
    pub fn set_reject_threads(&mut self, task: TaskId, reject: bool) {
        if let Some(entry) = self.tasks.get_mut(&task) {
            entry.reject_threads = reject;
        }
    }
}

impl TaskTable for SimTasks {
    fn thread_count(&self, task: TaskId) -> usize {
        self.tasks.get(&task).map_or(0, |t| t.threads.len())
    }

    fn add_thread(&mut self, task: TaskId, thread: ThreadId) -> Result<(), SpawnError> {
        match self.tasks.get_mut(&task) {
            Some(entry) if entry.alive && !entry.reject_threads => {
                entry.threads.push(thread);
                Ok(())
            }
            _ => Err(SpawnError::TaskRejected),
        }
    }

    fn remove_thread(&mut self, task: TaskId, thread: ThreadId) {
        if let Some(entry) = self.tasks.get_mut(&task) {
            entry.threads.retain(|&t| t != thread);
        }
    }

    fn current_thread(&self, task: TaskId) -> Option<ThreadId> {
        self.tasks.get(&task).and_then(|t| t.current)
    }

    fn set_current_thread(&mut self, task: TaskId, thread: Option<ThreadId>) {
        if let Some(entry) = self.tasks.get_mut(&task) {
            entry.current = thread;
        }
    }

    fn page_table(&self, task: TaskId) -> PageTable {
        PageTable::new(task)
    }

    fn kill(&mut self, task: TaskId) {
        if let Some(entry) = self.tasks.get_mut(&task) {
            log::debug!("task {} terminated", task);
            entry.alive = false;
            entry.current = None;
        }
    }
}

#[derive(Debug, Default)]
pub struct SimMmu {
    page_table_base: Option<PageTable>,
}

impl Mmu for SimMmu {
    fn page_table_base(&self) -> Option<PageTable> {
        self.page_table_base
    }

    fn set_page_table_base(&mut self, table: Option<PageTable>) {
        self.page_table_base = table;
    }
}

/// A device with a FIFO of pending I/O requests, one entry per request.
#[derive(Debug, Default, Clone)]
pub struct SimDevice {
    pending: Vec<ThreadId>,
}

impl SimDevice {
    /// Queue an I/O request on behalf of `thread`.
    pub fn submit_io(&mut self, thread: ThreadId) {
        self.pending.push(thread);
    }

    /// Number of requests still pending for `thread`.
    pub fn pending_for(&self, thread: ThreadId) -> usize {
        self.pending.iter().filter(|&&t| t == thread).count()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Device for SimDevice {
    fn cancel_pending_io(&mut self, thread: ThreadId) {
        self.pending.retain(|&t| t != thread);
    }
}

#[derive(Debug, Default)]
pub struct SimDevices {
    devices: Vec<SimDevice>,
}

impl SimDevices {
    /// Create a table of `count` idle devices.
    pub fn with_devices(count: usize) -> Self {
        Self {
            devices: (0..count).map(|_| SimDevice::default()).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&SimDevice> {
        self.devices.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut SimDevice> {
        self.devices.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl DeviceTable for SimDevices {
    fn for_each_device(&mut self, f: &mut dyn FnMut(&mut dyn Device)) {
        for device in self.devices.iter_mut() {
            f(device);
        }
    }
}

/// Resource units held per thread.
#[derive(Debug, Default)]
pub struct SimResources {
    held: BTreeMap<ThreadId, usize>,
}

impl SimResources {
    pub fn acquire(&mut self, thread: ThreadId, units: usize) {
        *self.held.entry(thread).or_insert(0) += units;
    }

    pub fn held_by(&self, thread: ThreadId) -> usize {
        self.held.get(&thread).copied().unwrap_or(0)
    }
}

impl ResourceManager for SimResources {
    fn release_all(&mut self, thread: ThreadId) {
        if let Some(units) = self.held.remove(&thread) {
            log::debug!("released {} resource units held by thread {}", units, thread);
        }
    }
}

/// An event with a wait set.
#[derive(Debug, Default, Clone)]
pub struct SimEvent {
    waiters: Vec<ThreadId>,
}

impl SimEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waiters(&self) -> &[ThreadId] {
        &self.waiters
    }

    pub fn contains(&self, thread: ThreadId) -> bool {
        self.waiters.contains(&thread)
    }

    /// Fire the event: empty the wait set and resume every waiter once.
    ///
    /// A failed resume does not stop the others. Returns the number of
    /// threads notified, or the first error once every waiter was tried.
    pub fn notify<M: Machine>(&mut self, kernel: &Kernel<M>) -> ThreadResult<usize> {
        let waiters = core::mem::take(&mut self.waiters);
        let mut first_err = None;
        for &thread in &waiters {
            if let Err(e) = kernel.resume(thread) {
                log::warn!("failed to resume waiter {}: {}", thread, e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(waiters.len()),
        }
    }
}

impl Event for SimEvent {
    fn add_thread(&mut self, thread: ThreadId) {
        self.waiters.push(thread);
    }
}

/// A complete simulated machine.
#[derive(Debug, Default)]
pub struct SimMachine {
    pub tasks: SimTasks,
    pub mmu: SimMmu,
    pub devices: SimDevices,
    pub resources: SimResources,
}

impl SimMachine {
    /// Create a machine with `devices` devices and no tasks.
    pub fn new(devices: usize) -> Self {
        Self {
            devices: SimDevices::with_devices(devices),
            ..Self::default()
        }
    }
}

impl Machine for SimMachine {
    type Tasks = SimTasks;
    type Mmu = SimMmu;
    type Devices = SimDevices;
    type Resources = SimResources;

    fn tasks(&self) -> &SimTasks {
        &self.tasks
    }

    fn tasks_mut(&mut self) -> &mut SimTasks {
        &mut self.tasks
    }

    fn mmu(&self) -> &SimMmu {
        &self.mmu
    }

    fn mmu_mut(&mut self) -> &mut SimMmu {
        &mut self.mmu
    }

    fn devices_mut(&mut self) -> &mut SimDevices {
        &mut self.devices
    }

    fn resources_mut(&mut self) -> &mut SimResources {
        &mut self.resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InvalidOperationError;
    use crate::thread::ThreadStatus;

    fn tid(n: usize) -> ThreadId {
        ThreadId::new(n).unwrap()
    }

    #[test]
    fn test_task_membership() {
        let mut tasks = SimTasks::default();
        let task = tasks.spawn_task();

        tasks.add_thread(task, tid(1)).unwrap();
        tasks.add_thread(task, tid(2)).unwrap();
        assert_eq!(tasks.thread_count(task), 2);

        tasks.remove_thread(task, tid(1));
        assert_eq!(tasks.get(task).unwrap().threads(), [tid(2)]);
    }

    #[test]
    fn test_rejecting_task() {
        let mut tasks = SimTasks::default();
        let task = tasks.spawn_task();
        tasks.set_reject_threads(task, true);

        assert_eq!(tasks.add_thread(task, tid(1)), Err(SpawnError::TaskRejected));
        assert_eq!(tasks.add_thread(TaskId(99), tid(1)), Err(SpawnError::TaskRejected));
    }

    #[test]
    fn test_cancel_only_matching_requests() {
        let mut device = SimDevice::default();
        device.submit_io(tid(1));
        device.submit_io(tid(2));
        device.submit_io(tid(1));

        device.cancel_pending_io(tid(1));
        assert_eq!(device.pending_for(tid(1)), 0);
        assert_eq!(device.pending_len(), 1);
    }

    #[test]
    fn test_notify_resumes_past_unknown_waiter() {
        let mut machine = SimMachine::new(0);
        let task = machine.tasks.spawn_task();
        let kernel = Kernel::new(machine);
        kernel.init().unwrap();
        let a = kernel.create(task).unwrap();

        let mut event = SimEvent::new();
        let ghost = tid(999);
        event.add_thread(ghost);
        kernel.suspend(a, &mut event).unwrap();
        assert_eq!(event.waiters(), [ghost, a]);

        assert_eq!(
            event.notify(&kernel),
            Err(InvalidOperationError::UnknownThread(ghost).into())
        );
        assert!(event.waiters().is_empty());
        assert_eq!(kernel.status(a), Some(ThreadStatus::Running));
    }

    #[test]
    fn test_release_all() {
        let mut resources = SimResources::default();
        resources.acquire(tid(3), 2);
        resources.acquire(tid(3), 1);
        assert_eq!(resources.held_by(tid(3)), 3);

        resources.release_all(tid(3));
        assert_eq!(resources.held_by(tid(3)), 0);
    }
}
