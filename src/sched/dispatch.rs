//! The dispatch decision.
//!
//! The decision is a pure function of processor occupancy and the ready
//! queue so it can be tested without a machine. Applying it (page table
//! base, current-thread slot, `Running` status) is left to the kernel.

use super::ReadyQueue;
use crate::thread::ThreadId;

/// Outcome of one dispatch decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A thread already occupies the processor. Nothing is preempted.
    Busy,
    /// The processor is idle and nothing is ready.
    Idle,
    /// The head of the ready queue must be installed on the processor.
    Switch(ThreadId),
}

/// Decide what the processor should run next.
///
/// Pops the ready queue only when returning [`Dispatch::Switch`].
pub fn select(busy: bool, ready: &mut ReadyQueue) -> Dispatch {
    if busy {
        return Dispatch::Busy;
    }
    match ready.pop_front() {
        Some(next) => Dispatch::Switch(next),
        None => Dispatch::Idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid(n: usize) -> ThreadId {
        ThreadId::new(n).unwrap()
    }

    #[test]
    fn test_busy_processor_is_never_preempted() {
        let mut ready = ReadyQueue::new();
        ready.append(tid(1));

        assert_eq!(select(true, &mut ready), Dispatch::Busy);
        assert_eq!(ready.len(), 1);
    }

    #[test]
    fn test_idle_with_empty_queue() {
        let mut ready = ReadyQueue::new();
        assert_eq!(select(false, &mut ready), Dispatch::Idle);
    }

    #[test]
    fn test_switch_takes_head() {
        let mut ready = ReadyQueue::new();
        ready.append(tid(4));
        ready.append(tid(2));

        assert_eq!(select(false, &mut ready), Dispatch::Switch(tid(4)));
        assert_eq!(ready.peek(), Some(tid(2)));
    }
}
