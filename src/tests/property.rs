//! Property-based tests for verifying scheduling invariants.

use super::helpers::{SimpleRng, TestEnvironment};
use crate::machine::sim::SimEvent;
use crate::thread::{ThreadId, ThreadStatus};
use alloc::vec::Vec;

/// Drive random create/kill/suspend/resume/dispatch sequences and check
/// the invariants at every quiescent point.
fn run_random_operations(seed: u64, steps: usize) {
    let mut rng = SimpleRng::new(seed);
    let env = TestEnvironment::new(3, 4, 2);
    let mut events: Vec<SimEvent> = (0..3).map(|_| SimEvent::new()).collect();
    let mut threads: Vec<ThreadId> = Vec::new();

    for _ in 0..steps {
        match rng.gen_range(0, 6) {
            0 => {
                let task = env.task(rng.gen_range(0, 3) as usize);
                if let Ok(id) = env.kernel.create(task) {
                    threads.push(id);
                }
            }
            1 if !threads.is_empty() => {
                let id = threads[rng.gen_range(0, threads.len() as u64) as usize];
                env.kernel.kill(id).unwrap();
            }
            2 => {
                // Suspend the running thread, or nest a wait on a waiting one.
                let event = &mut events[rng.gen_range(0, 3) as usize];
                let waiting = threads
                    .iter()
                    .copied()
                    .find(|&t| env.kernel.status(t).is_some_and(ThreadStatus::is_waiting));
                let target = if rng.gen_range(0, 2) == 0 {
                    env.kernel.running().or(waiting)
                } else {
                    waiting.or_else(|| env.kernel.running())
                };
                if let Some(id) = target {
                    env.kernel.suspend(id, event).unwrap();
                }
            }
            3 => {
                let event = &mut events[rng.gen_range(0, 3) as usize];
                event.notify(&env.kernel).unwrap();
            }
            4 if !threads.is_empty() => {
                let id = threads[rng.gen_range(0, threads.len() as u64) as usize];
                env.kernel.resume(id).unwrap();
            }
            _ => {
                let _ = env.kernel.dispatch();
            }
        }
        env.assert_invariants();
    }
}

#[test]
fn property_invariants_hold_under_random_operations() {
    for seed in [0x1234_5678, 0xdead_beef, 42, 7, 0x0bad_cafe] {
        run_random_operations(seed, 400);
    }
}

#[test]
fn property_create_below_cap_always_succeeds() {
    let mut rng = SimpleRng::new(0x5eed);
    for _ in 0..20 {
        let cap = rng.gen_range(1, 6) as usize;
        let env = TestEnvironment::new(1, cap, 0);

        let created: Vec<_> = (0..cap).map(|_| env.spawn(0)).collect();
        assert!(env.kernel.create(env.task(0)).unwrap_err().is_capacity());

        assert_eq!(env.kernel.running(), Some(created[0]));
        assert_eq!(env.kernel.ready_threads(), created[1..]);
        env.assert_invariants();
    }
}

#[test]
fn property_wait_depth_requires_matching_resumes() {
    let mut rng = SimpleRng::new(99);
    for _ in 0..20 {
        let depth = rng.gen_range(1, 8) as u32;
        let env = TestEnvironment::new(1, 2, 0);
        let a = env.spawn(0);
        let mut ev = SimEvent::new();

        for _ in 0..depth {
            env.kernel.suspend(a, &mut ev).unwrap();
        }
        assert_eq!(
            env.kernel.status(a),
            Some(ThreadStatus::Waiting { depth: depth - 1 })
        );

        for _ in 0..depth - 1 {
            env.kernel.resume(a).unwrap();
            assert!(env.kernel.status(a).is_some_and(ThreadStatus::is_waiting));
        }
        env.kernel.resume(a).unwrap();
        assert_eq!(env.kernel.status(a), Some(ThreadStatus::Running));
        env.assert_invariants();
    }
}
