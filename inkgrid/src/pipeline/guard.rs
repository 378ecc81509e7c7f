//! Per-target concurrency guard.
//!
//! At most one job per target may be processing. The guard is a set of
//! targets with an active pipeline; [`TargetGuard::try_acquire`] inserts
//! atomically and hands back a [`TargetPermit`] whose `Drop` removes the
//! entry, so the target is released on every exit path, including unwinding.

use super::TargetId;
use dashmap::DashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Set of targets with a running pipeline.
#[derive(Debug, Default)]
pub struct TargetGuard {
    active: DashSet<TargetId>,
    acquired: AtomicU64,
    rejected: AtomicU64,
}

impl TargetGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `target`, or returns `None` if it is already claimed.
    pub fn try_acquire(self: &Arc<Self>, target: TargetId) -> Option<TargetPermit> {
        if self.active.insert(target) {
            self.acquired.fetch_add(1, Ordering::Relaxed);
            debug!(target = %target, active = self.active.len(), "Target guard acquired");
            Some(TargetPermit {
                guard: Arc::clone(self),
                target,
            })
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            debug!(target = %target, "Target guard contended");
            None
        }
    }

    /// Returns true while a pipeline holds `target`.
    #[inline]
    pub fn is_active(&self, target: TargetId) -> bool {
        self.active.contains(&target)
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Snapshot of guard counters.
    pub fn stats(&self) -> GuardStats {
        GuardStats {
            active: self.active.len(),
            acquired: self.acquired.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn release(&self, target: TargetId) {
        self.active.remove(&target);
        debug!(target = %target, active = self.active.len(), "Target guard released");
    }
}

/// Exclusive claim on one target. Dropping it releases the target.
#[derive(Debug)]
pub struct TargetPermit {
    guard: Arc<TargetGuard>,
    target: TargetId,
}

impl TargetPermit {
    #[inline]
    pub fn target(&self) -> TargetId {
        self.target
    }
}

impl Drop for TargetPermit {
    fn drop(&mut self) {
        self.guard.release(self.target);
    }
}

/// Guard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardStats {
    /// Targets currently held
    pub active: usize,
    /// Successful acquisitions (lifetime)
    pub acquired: u64,
    /// Rejected acquisitions (lifetime)
    pub rejected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::AssertUnwindSafe;

    #[test]
    fn test_second_acquire_rejected() {
        let guard = Arc::new(TargetGuard::new());
        let target = TargetId::new(1);

        let permit = guard.try_acquire(target);
        assert!(permit.is_some());
        assert!(guard.try_acquire(target).is_none());
        assert!(guard.is_active(target));
    }

    #[test]
    fn test_drop_releases() {
        let guard = Arc::new(TargetGuard::new());
        let target = TargetId::new(1);

        let permit = guard.try_acquire(target).unwrap();
        assert_eq!(permit.target(), target);
        drop(permit);

        assert!(!guard.is_active(target));
        assert!(guard.try_acquire(target).is_some());
    }

    #[test]
    fn test_targets_are_independent() {
        let guard = Arc::new(TargetGuard::new());
        let _a = guard.try_acquire(TargetId::new(1)).unwrap();
        let _b = guard.try_acquire(TargetId::new(2)).unwrap();
        assert_eq!(guard.active_count(), 2);
    }

    #[test]
    fn test_release_on_unwind() {
        let guard = Arc::new(TargetGuard::new());
        let target = TargetId::new(9);

        let cloned = Arc::clone(&guard);
        let result = std::panic::catch_unwind(AssertUnwindSafe(move || {
            let _permit = cloned.try_acquire(target).unwrap();
            panic!("pipeline fault");
        }));

        assert!(result.is_err());
        assert!(!guard.is_active(target));
    }

    #[test]
    fn test_stats() {
        let guard = Arc::new(TargetGuard::new());
        let target = TargetId::new(1);
        let _permit = guard.try_acquire(target).unwrap();
        let _ = guard.try_acquire(target);
        let _ = guard.try_acquire(target);

        assert_eq!(
            guard.stats(),
            GuardStats {
                active: 1,
                acquired: 1,
                rejected: 2,
            }
        );
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        let guard = Arc::new(TargetGuard::new());
        let target = TargetId::new(5);
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    guard.try_acquire(target).map(std::mem::forget).is_some()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
