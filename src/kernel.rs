//! Kernel abstraction for managing thread lifecycles.
//!
//! This module provides the `Kernel` struct: the scheduler context of one
//! simulation instance. It owns every thread control block and the ready
//! queue, and drives the collaborators in [`crate::machine`].

use crate::config::KernelConfig;
use crate::errors::{InvalidOperationError, ScheduleError, SpawnError, ThreadError, ThreadResult};
use crate::machine::{Device, DeviceTable, Event, Machine, Mmu, ResourceManager, TaskTable};
use crate::sched::{self, Dispatch, ReadyQueue};
use crate::thread::{TaskId, ThreadControlBlock, ThreadId, ThreadStatus};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

/// Main kernel handle for the thread manager.
///
/// Every lifecycle operation runs to completion under the state lock and
/// ends with a dispatch, so after any call returns: at most one thread is
/// `Running`, and the processor is busy whenever the ready queue is not
/// empty.
///
/// # Type Parameters
///
/// * `M` - The simulated machine providing tasks, MMU, devices and resources
pub struct Kernel<M: Machine> {
    state: spin::Mutex<KernelState<M>>,
    config: KernelConfig,
    /// Whether `init` has been called
    initialized: AtomicBool,
    /// Next thread ID to assign
    next_thread_id: AtomicUsize,
}

struct KernelState<M: Machine> {
    machine: M,
    threads: BTreeMap<ThreadId, ThreadControlBlock>,
    ready: ReadyQueue,
}

impl<M: Machine> Kernel<M> {
    /// Create a kernel with the default configuration.
    pub fn new(machine: M) -> Self {
        Self::build(machine, KernelConfig::default())
    }

    /// Create a kernel with a custom configuration.
    pub fn with_config(machine: M, config: KernelConfig) -> ThreadResult<Self> {
        config.validate()?;
        Ok(Self::build(machine, config))
    }

    fn build(machine: M, config: KernelConfig) -> Self {
        Self {
            state: spin::Mutex::new(KernelState {
                machine,
                threads: BTreeMap::new(),
                ready: ReadyQueue::new(),
            }),
            config,
            initialized: AtomicBool::new(false),
            next_thread_id: AtomicUsize::new(1), // Start from 1, never use 0
        }
    }

    /// Initialize the kernel. Called once at the start of a simulation.
    pub fn init(&self) -> ThreadResult<()> {
        self.initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| log::debug!("thread manager initialized"))
            .map_err(|_| InvalidOperationError::AlreadyInitialized.into())
    }

    /// Check if the kernel has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    fn next_thread_id(&self) -> ThreadResult<ThreadId> {
        let id = self.next_thread_id.fetch_add(1, Ordering::AcqRel);
        ThreadId::new(id).ok_or_else(ThreadError::invalid_state)
    }

    /// Create a new thread in `task` and queue it as `Ready`.
    ///
    /// Fails without touching any state if the task is at its thread cap
    /// or refuses the registration.
    pub fn create(&self, task: TaskId) -> ThreadResult<ThreadId> {
        if !self.is_initialized() {
            return Err(SpawnError::NotInitialized.into());
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;

        let count = state.machine.tasks().thread_count(task);
        if count >= self.config.max_threads_per_task {
            log::warn!(
                "task {} already has {} threads, refusing to create another",
                task,
                count
            );
            return Err(SpawnError::TooManyThreads.into());
        }

        let id = self.next_thread_id()?;
        if let Err(e) = state.machine.tasks_mut().add_thread(task, id) {
            log::warn!("task {} rejected thread {}: {}", task, id, e);
            return Err(e.into());
        }

        let tcb = ThreadControlBlock::new(id, task, self.config.default_priority);
        log::debug!("created {}", tcb);
        state.threads.insert(id, tcb);
        state.ready.append(id);

        state.settle()?;
        Ok(id)
    }

    /// Kill a thread, detach it from its task and release everything it
    /// holds.
    ///
    /// Killing an already killed thread is a no-op. If this was the last
    /// thread of its task, the task is terminated.
    pub fn kill(&self, id: ThreadId) -> ThreadResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let tcb = state
            .threads
            .get_mut(&id)
            .ok_or(InvalidOperationError::UnknownThread(id))?;
        let prior = tcb.status();
        if prior == ThreadStatus::Killed {
            log::warn!("thread {} is already killed", id);
            return Ok(());
        }
        tcb.set_status(ThreadStatus::Killed);
        let task = tcb.task();
        log::debug!("killing thread {} (was {})", id, prior);

        state.machine.tasks_mut().remove_thread(task, id);

        match prior {
            ThreadStatus::Ready => {
                state.ready.remove(id);
            }
            ThreadStatus::Running => state.release_processor(task),
            ThreadStatus::Waiting { .. } => {
                // The waiting depth does not record which device each wait
                // is on, so every device is purged.
                state
                    .machine
                    .devices_mut()
                    .for_each_device(&mut |device: &mut dyn Device| device.cancel_pending_io(id));
            }
            ThreadStatus::Killed => {}
        }

        state.machine.resources_mut().release_all(id);

        let settled = state.settle();

        if state.machine.tasks().thread_count(task) == 0 {
            log::debug!("thread {} was the last thread of task {}", id, task);
            state.machine.tasks_mut().kill(task);
        }
        settled
    }

    /// Suspend a thread on `event`.
    ///
    /// A running thread gives up the processor and starts waiting at depth
    /// zero. A thread that is already waiting goes one level deeper and
    /// needs one more resume before it is ready again. `Ready` and `Killed`
    /// threads cannot be suspended.
    pub fn suspend<E: Event + ?Sized>(&self, id: ThreadId, event: &mut E) -> ThreadResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let tcb = state
            .threads
            .get_mut(&id)
            .ok_or(InvalidOperationError::UnknownThread(id))?;
        let prior = tcb.status();
        let Some(next) = prior.suspended() else {
            log::warn!("attempt to suspend thread {}, which is {}", id, prior);
            return Err(InvalidOperationError::WrongState(id).into());
        };
        tcb.set_status(next);
        let task = tcb.task();
        log::debug!("suspending thread {}: {} -> {}", id, prior, next);

        if prior == ThreadStatus::Running {
            state.release_processor(task);
        }

        event.add_thread(id);

        state.settle()
    }

    /// Undo one suspension of a waiting thread.
    ///
    /// At depth zero the thread becomes `Ready` and joins the tail of the
    /// ready queue; deeper waits only lose one level. Resuming a thread that
    /// is not waiting logs a warning and changes nothing.
    pub fn resume(&self, id: ThreadId) -> ThreadResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let tcb = state
            .threads
            .get_mut(&id)
            .ok_or(InvalidOperationError::UnknownThread(id))?;
        let prior = tcb.status();
        match prior.resumed() {
            None => log::warn!("attempt to resume thread {}, which wasn't waiting", id),
            Some(next) => {
                log::debug!("resuming thread {}: {} -> {}", id, prior, next);
                tcb.set_status(next);
                if next == ThreadStatus::Ready {
                    state.ready.append(id);
                }
            }
        }

        state.settle()
    }

    /// Put the head of the ready queue on the processor if it is idle.
    ///
    /// Succeeds without doing anything if a thread is already running.
    /// Fails with [`ScheduleError::NoThreadsAvailable`] if the processor is
    /// idle and nothing is ready. Safe to call any number of times.
    pub fn dispatch(&self) -> ThreadResult<()> {
        self.state.lock().dispatch()
    }

    /// Check if a thread occupies the processor.
    pub fn is_busy(&self) -> bool {
        self.state.lock().is_busy()
    }

    /// Get a thread's status, including killed threads.
    pub fn status(&self, id: ThreadId) -> Option<ThreadStatus> {
        self.state.lock().threads.get(&id).map(ThreadControlBlock::status)
    }

    pub fn priority(&self, id: ThreadId) -> Option<u8> {
        self.state.lock().threads.get(&id).map(ThreadControlBlock::priority)
    }

    /// Change a thread's priority. Scheduling order is not affected.
    pub fn set_priority(&self, id: ThreadId, priority: u8) -> ThreadResult<()> {
        let mut state = self.state.lock();
        let tcb = state
            .threads
            .get_mut(&id)
            .ok_or(InvalidOperationError::UnknownThread(id))?;
        tcb.set_priority(priority);
        Ok(())
    }

    /// Get the task a thread was created in.
    pub fn task_of(&self, id: ThreadId) -> Option<TaskId> {
        self.state.lock().threads.get(&id).map(ThreadControlBlock::task)
    }

    /// The thread currently on the processor.
    pub fn running(&self) -> Option<ThreadId> {
        self.state.lock().running()
    }

    /// Drop the control blocks of killed threads.
    ///
    /// Killed threads stay in the thread table so their status can still be
    /// observed and stale event notifications resolve to a no-op resume.
    /// After reaping, those ids are unknown to every operation. Returns the
    /// number of blocks dropped.
    pub fn reap_killed(&self) -> usize {
        let mut state = self.state.lock();
        let before = state.threads.len();
        state
            .threads
            .retain(|_, tcb| tcb.status() != ThreadStatus::Killed);
        let reaped = before - state.threads.len();
        log::debug!("reaped {} killed threads", reaped);
        reaped
    }

    /// Number of control blocks held, killed ones included.
    pub fn thread_count(&self) -> usize {
        self.state.lock().threads.len()
    }

    /// Ready threads from head to tail.
    pub fn ready_threads(&self) -> Vec<ThreadId> {
        self.state.lock().ready.iter().collect()
    }

    /// Run `f` with exclusive access to the machine.
    ///
    /// `f` must not call back into this kernel.
    pub fn with_machine<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        f(&mut self.state.lock().machine)
    }

    /// Check the scheduling invariants.
    ///
    /// Holds after every lifecycle operation: at most one thread is
    /// `Running` and it is the thread installed in its task's slot and in
    /// the MMU; the ready queue holds exactly the `Ready` threads, each once;
    /// and the processor is busy whenever the ready queue is not empty.
    pub fn verify(&self) -> ThreadResult<()> {
        self.state.lock().verify()
    }

    /// Diagnostic hook for the simulator's error path. Logs the thread
    /// table and ready queue.
    pub fn at_error(&self) {
        self.state.lock().dump(log::Level::Error);
    }

    /// Diagnostic hook for the simulator's warning path.
    pub fn at_warning(&self) {
        self.state.lock().dump(log::Level::Warn);
    }
}

impl<M: Machine> KernelState<M> {
    fn is_busy(&self) -> bool {
        match self.machine.mmu().page_table_base() {
            Some(table) => self.machine.tasks().current_thread(table.task()).is_some(),
            None => false,
        }
    }

    /// The thread installed on the processor, read from the MMU and the
    /// owning task's slot.
    fn running(&self) -> Option<ThreadId> {
        let table = self.machine.mmu().page_table_base()?;
        self.machine.tasks().current_thread(table.task())
    }

    /// Dispatch at the end of a lifecycle operation.
    ///
    /// An idle processor with nothing ready is a normal outcome. Anything
    /// else means the bookkeeping is broken and is passed on.
    fn settle(&mut self) -> ThreadResult<()> {
        match self.dispatch() {
            Err(ThreadError::Schedule(ScheduleError::NoThreadsAvailable)) => Ok(()),
            other => other,
        }
    }

    /// Clear the MMU and the task's current-thread slot.
    fn release_processor(&mut self, task: TaskId) {
        self.machine.mmu_mut().set_page_table_base(None);
        self.machine.tasks_mut().set_current_thread(task, None);
    }

    fn dispatch(&mut self) -> ThreadResult<()> {
        match sched::select(self.is_busy(), &mut self.ready) {
            Dispatch::Busy => Ok(()),
            Dispatch::Idle => {
                log::debug!("no ready threads, processor idle");
                Err(ScheduleError::NoThreadsAvailable.into())
            }
            Dispatch::Switch(next) => {
                let tcb = self.threads.get_mut(&next).ok_or_else(|| {
                    log::error!("ready queue held unknown thread {}", next);
                    ThreadError::invalid_state()
                })?;
                let task = tcb.task();
                let table = self.machine.tasks().page_table(task);
                self.machine.mmu_mut().set_page_table_base(Some(table));
                self.machine.tasks_mut().set_current_thread(task, Some(next));
                tcb.set_status(ThreadStatus::Running);
                log::debug!("dispatched thread {} of task {}", next, task);
                Ok(())
            }
        }
    }

    fn verify(&self) -> ThreadResult<()> {
        let mut running = self
            .threads
            .values()
            .filter(|tcb| tcb.status() == ThreadStatus::Running);
        let current = running.next();
        if let Some(extra) = running.next() {
            log::error!("more than one running thread, including {}", extra.id());
            return Err(ThreadError::invalid_state());
        }

        match current {
            Some(tcb) => {
                let table = self.machine.mmu().page_table_base();
                let slot = self.machine.tasks().current_thread(tcb.task());
                if table.map(|t| t.task()) != Some(tcb.task()) || slot != Some(tcb.id()) {
                    log::error!("running {} is not installed on the processor", tcb);
                    return Err(ThreadError::invalid_state());
                }
            }
            None if self.is_busy() => {
                log::error!("processor is busy but no thread is running");
                return Err(ThreadError::invalid_state());
            }
            None if self.machine.mmu().page_table_base().is_some() => {
                log::error!("page table base left set with no thread running");
                return Err(ThreadError::invalid_state());
            }
            None => {}
        }

        for id in self.ready.iter() {
            let ready = self
                .threads
                .get(&id)
                .is_some_and(|tcb| tcb.status() == ThreadStatus::Ready);
            if !ready {
                log::error!("ready queue holds thread {}, which is not ready", id);
                return Err(ThreadError::invalid_state());
            }
        }
        let ready_count = self
            .threads
            .values()
            .filter(|tcb| tcb.status() == ThreadStatus::Ready)
            .count();
        if ready_count != self.ready.len() {
            log::error!(
                "{} ready threads but {} ready queue entries",
                ready_count,
                self.ready.len()
            );
            return Err(ThreadError::invalid_state());
        }

        if !self.ready.is_empty() && !self.is_busy() {
            log::error!("processor idle with {} ready threads", self.ready.len());
            return Err(ThreadError::invalid_state());
        }
        Ok(())
    }

    fn dump(&self, level: log::Level) {
        log::log!(level, "thread table ({} entries):", self.threads.len());
        for tcb in self.threads.values() {
            log::log!(level, "  {}", tcb);
        }
        log::log!(level, "ready queue: {:?}", self.ready.iter().collect::<Vec<_>>());
    }
}
