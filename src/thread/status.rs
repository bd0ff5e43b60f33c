//! Thread status and the suspend/resume depth arithmetic.

use core::fmt;

/// Lifecycle status of a thread.
///
/// `Waiting { depth }` records `depth + 1` suspensions that have not yet
/// been matched by a resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    Ready,
    Running,
    Killed,
    Waiting { depth: u32 },
}

impl ThreadStatus {
    /// Check if the thread is waiting at any depth.
    pub fn is_waiting(self) -> bool {
        matches!(self, ThreadStatus::Waiting { .. })
    }

    /// Status after one more suspension.
    ///
    /// Returns `None` for `Ready` and `Killed`, which cannot be suspended.
    pub fn suspended(self) -> Option<Self> {
        match self {
            ThreadStatus::Running => Some(ThreadStatus::Waiting { depth: 0 }),
            ThreadStatus::Waiting { depth } => Some(ThreadStatus::Waiting {
                depth: depth.saturating_add(1),
            }),
            ThreadStatus::Ready | ThreadStatus::Killed => None,
        }
    }

    /// Status after one resume.
    ///
    /// Returns `None` if the thread is not waiting.
    pub fn resumed(self) -> Option<Self> {
        match self {
            ThreadStatus::Waiting { depth: 0 } => Some(ThreadStatus::Ready),
            ThreadStatus::Waiting { depth } => Some(ThreadStatus::Waiting { depth: depth - 1 }),
            _ => None,
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadStatus::Ready => write!(f, "ready"),
            ThreadStatus::Running => write!(f, "running"),
            ThreadStatus::Killed => write!(f, "killed"),
            ThreadStatus::Waiting { depth } => write!(f, "waiting({})", depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suspend_nests() {
        let first = ThreadStatus::Running.suspended().unwrap();
        assert_eq!(first, ThreadStatus::Waiting { depth: 0 });

        let second = first.suspended().unwrap();
        assert_eq!(second, ThreadStatus::Waiting { depth: 1 });
    }

    #[test]
    fn test_resume_unwinds_one_level() {
        let status = ThreadStatus::Waiting { depth: 1 };
        let once = status.resumed().unwrap();
        assert_eq!(once, ThreadStatus::Waiting { depth: 0 });
        assert_eq!(once.resumed(), Some(ThreadStatus::Ready));
    }

    #[test]
    fn test_invalid_transitions() {
        assert_eq!(ThreadStatus::Ready.suspended(), None);
        assert_eq!(ThreadStatus::Killed.suspended(), None);

        for status in [ThreadStatus::Ready, ThreadStatus::Running, ThreadStatus::Killed] {
            assert!(!status.is_waiting());
            assert_eq!(status.resumed(), None);
        }
    }
}
