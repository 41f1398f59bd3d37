//! In-place mutation race detection.
//!
//! # Responsibilities
//! - Remember which mutator first rewrote an object in place
//! - Flag any other mutator of the same object, whether or not the two
//!   overlap in time
//! - Flag overlapping mutation so that every overlapping mutator reports
//!
//! # Design Decisions
//! - Atomics only; detection never blocks the mutator
//! - Writer count and overlap flag share one word so leaving is a single
//!   atomic update
//! - Ownership is claimed once and never released; a clone starts unowned

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cluster::error::RaceDetected;
use crate::observability::metrics;

/// Overlap flag, top bit of the state word.
const CONTENDED: u64 = 1 << 63;
/// Writer count, remaining bits of the state word.
const WRITERS: u64 = CONTENDED - 1;

/// Identity of one unsynchronized mutator.
///
/// Every `ResourceBuilder` is its own mutator unless told otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutatorId(NonZeroU64);

impl MutatorId {
    /// A process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
    }

    fn get(self) -> u64 {
        self.0.get()
    }
}

/// Detects unsynchronized in-place mutation of one object.
#[derive(Debug, Default)]
pub struct RaceDetector {
    /// Active writers in the low bits, overlap flag in the top bit.
    state: AtomicU64,
    /// Id of the first mutator; 0 while unowned.
    owner: AtomicU64,
    /// Total races observed over the detector's lifetime.
    races: AtomicU64,
}

impl RaceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an in-place mutation of `target` on behalf of `mutator`.
    pub fn enter(&self, target: &'static str, mutator: MutatorId) -> MutationGuard<'_> {
        let id = mutator.get();
        let foreign = match self.owner.compare_exchange(0, id, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => false,
            Err(owner) => owner != id,
        };

        let prev = self.state.fetch_add(1, Ordering::AcqRel);
        let overlapped = prev & WRITERS > 0;
        if foreign || overlapped {
            // Cleared only once the writer count drops to zero, and this
            // writer is still counted.
            self.state.fetch_or(CONTENDED, Ordering::AcqRel);
        }

        MutationGuard {
            detector: self,
            target,
            raced: foreign || overlapped,
        }
    }

    /// The first mutator to touch the object, if any has.
    pub fn owner(&self) -> Option<MutatorId> {
        NonZeroU64::new(self.owner.load(Ordering::Acquire)).map(MutatorId)
    }

    /// Number of mutators currently active.
    pub fn active_writers(&self) -> usize {
        (self.state.load(Ordering::Acquire) & WRITERS) as usize
    }

    /// Races observed so far.
    pub fn races(&self) -> u64 {
        self.races.load(Ordering::Relaxed)
    }
}

/// An in-flight mutation. Leaves the detector on drop.
#[derive(Debug)]
#[must_use = "a mutation guard must be finished to learn whether a race occurred"]
pub struct MutationGuard<'a> {
    detector: &'a RaceDetector,
    target: &'static str,
    raced: bool,
}

impl MutationGuard<'_> {
    /// End the mutation, reporting whether another mutator raced with it.
    pub fn finish(self) -> Result<(), RaceDetected> {
        let raced = self.raced || self.detector.state.load(Ordering::Acquire) & CONTENDED != 0;
        let target = self.target;
        if raced {
            self.detector.races.fetch_add(1, Ordering::Relaxed);
            metrics::record_race(target);
            tracing::warn!(target_object = target, "Unsynchronized in-place mutation observed");
        }
        drop(self);

        if raced {
            Err(RaceDetected { target })
        } else {
            Ok(())
        }
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        // Never fails: the closure always returns Some.
        let _ = self
            .detector
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                let writers = (state & WRITERS).saturating_sub(1);
                if writers == 0 {
                    Some(0)
                } else {
                    Some((state & CONTENDED) | writers)
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_mutator_is_clean() {
        let detector = RaceDetector::new();
        let me = MutatorId::next();

        let guard = detector.enter("mapping", me);
        assert_eq!(detector.active_writers(), 1);
        assert!(guard.finish().is_ok());
        assert_eq!(detector.active_writers(), 0);

        // The same mutator coming back later is ordered with itself
        assert!(detector.enter("mapping", me).finish().is_ok());
        assert_eq!(detector.owner(), Some(me));
        assert_eq!(detector.races(), 0);
    }

    #[test]
    fn test_overlap_fails_both_writers() {
        let detector = RaceDetector::new();
        let first = detector.enter("mapping", MutatorId::next());
        let second = detector.enter("mapping", MutatorId::next());

        assert_eq!(first.finish(), Err(RaceDetected { target: "mapping" }));
        assert!(second.finish().is_err());
        assert_eq!(detector.races(), 2);
        assert_eq!(detector.active_writers(), 0);
    }

    #[test]
    fn test_second_mutator_races_without_overlap() {
        let detector = RaceDetector::new();
        let owner = MutatorId::next();
        assert!(detector.enter("mapping", owner).finish().is_ok());

        // Strictly after the owner, but nothing orders the two
        let late = detector.enter("mapping", MutatorId::next());
        assert!(late.finish().is_err());
        assert_eq!(detector.races(), 1);

        // The owner itself is still clean
        assert!(detector.enter("mapping", owner).finish().is_ok());
    }

    #[test]
    fn test_overlap_flag_survives_partial_exit() {
        let detector = RaceDetector::new();
        let owner = MutatorId::next();
        let a = detector.enter("mapping", owner);
        let b = detector.enter("mapping", owner);
        let c = detector.enter("mapping", owner);

        // Leaving writers never clear the flag while others are active
        drop(a);
        drop(b);
        assert_eq!(detector.active_writers(), 1);
        assert!(c.finish().is_err());

        assert!(detector.enter("mapping", owner).finish().is_ok());
    }

    #[test]
    fn test_dropped_guard_releases() {
        let detector = RaceDetector::new();
        let me = MutatorId::next();
        {
            let _guard = detector.enter("descriptor", me);
        }
        assert_eq!(detector.active_writers(), 0);
        assert!(detector.enter("descriptor", me).finish().is_ok());
    }

    #[test]
    fn test_mutator_ids_are_distinct() {
        assert_ne!(MutatorId::next(), MutatorId::next());
    }
}
