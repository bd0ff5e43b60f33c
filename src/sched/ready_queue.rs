//! FIFO ready queue.

use crate::thread::ThreadId;
use alloc::collections::VecDeque;

/// Threads eligible for the processor, in arrival order.
///
/// A thread is in this queue exactly when its status is `Ready`. No
/// reordering by priority or anything else ever happens.
#[derive(Debug, Default, Clone)]
pub struct ReadyQueue {
    queue: VecDeque<ThreadId>,
}

impl ReadyQueue {
    /// Create an empty ready queue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Insert a thread at the tail.
    pub fn append(&mut self, thread: ThreadId) {
        self.queue.push_back(thread);
    }

    /// Remove and return the head.
    pub fn pop_front(&mut self) -> Option<ThreadId> {
        self.queue.pop_front()
    }

    /// Remove a specific thread wherever it sits.
    ///
    /// Returns `true` if the thread was queued.
    pub fn remove(&mut self, thread: ThreadId) -> bool {
        match self.queue.iter().position(|&queued| queued == thread) {
            Some(index) => {
                self.queue.remove(index);
                true
            }
            None => false,
        }
    }

    /// Look at the head without removing it.
    pub fn peek(&self) -> Option<ThreadId> {
        self.queue.front().copied()
    }

    pub fn contains(&self, thread: ThreadId) -> bool {
        self.queue.contains(&thread)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Iterate from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.queue.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn tid(n: usize) -> ThreadId {
        ThreadId::new(n).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = ReadyQueue::new();
        assert!(queue.pop_front().is_none());
        assert!(queue.peek().is_none());

        for n in 1..=3 {
            queue.append(tid(n));
        }

        assert_eq!(queue.peek(), Some(tid(1)));
        assert_eq!(queue.pop_front(), Some(tid(1)));
        assert_eq!(queue.pop_front(), Some(tid(2)));
        assert_eq!(queue.pop_front(), Some(tid(3)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_from_middle() {
        let mut queue = ReadyQueue::new();
        for n in 1..=4 {
            queue.append(tid(n));
        }

        assert!(queue.remove(tid(3)));
        assert!(!queue.remove(tid(3)));
        assert!(!queue.contains(tid(3)));

        let order: Vec<_> = queue.iter().collect();
        assert_eq!(order, [tid(1), tid(2), tid(4)]);
    }
}
