//! The value shared by every worker of a computation.
//!
//! A [`Shared`] is an upper bound on a minimisation objective. It only ever
//! tightens: a candidate replaces the current value when it is strictly
//! smaller. Propagation between workers is best effort, so any holder may act
//! on a stale bound for a while.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// An upper bound broadcast to all workers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shared {
    bound: f64,
}

impl Shared {
    pub fn new(bound: f64) -> Self {
        Self { bound }
    }

    pub fn get(&self) -> f64 {
        self.bound
    }

    /// Strict improvement ordering. Anything comparable is newer than an
    /// absent value; NaN is never newer.
    pub fn is_newer_than(&self, existing: Option<&Shared>) -> bool {
        if self.bound.is_nan() {
            return false;
        }
        match existing {
            Some(existing) => self.bound < existing.bound,
            None => true,
        }
    }
}

/// Bit pattern marking an empty cell. Never produced by `f64::to_bits` on a
/// value that `Shared::is_newer_than` accepts.
const UNSET: u64 = u64::MAX;

/// Lock-free holder of the current [`Shared`] value.
///
/// Updates go through a compare-and-swap loop on the bound's bit pattern, so
/// concurrent offers from many threads converge on the smallest bound and the
/// stored value never regresses.
#[derive(Debug)]
pub struct SharedCell {
    bits: AtomicU64,
    version: AtomicU64,
}

impl SharedCell {
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(UNSET),
            version: AtomicU64::new(0),
        }
    }

    pub fn with_value(shared: Shared) -> Self {
        let cell = Self::new();
        cell.offer(shared);
        cell
    }

    pub fn get(&self) -> Option<Shared> {
        decode(self.bits.load(Ordering::Acquire))
    }

    /// Number of values adopted so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Adopt `candidate` if it is newer than the current value.
    ///
    /// Returns `true` when the candidate was stored.
    pub fn offer(&self, candidate: Shared) -> bool {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            if !candidate.is_newer_than(decode(current).as_ref()) {
                return false;
            }
            match self.bits.compare_exchange_weak(
                current,
                candidate.bound.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.version.fetch_add(1, Ordering::AcqRel);
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for SharedCell {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(bits: u64) -> Option<Shared> {
    (bits != UNSET).then(|| Shared::new(f64::from_bits(bits)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn smaller_bound_is_newer() {
        let a = Shared::new(10.0);
        let b = Shared::new(12.5);
        assert!(a.is_newer_than(Some(&b)));
        assert!(!b.is_newer_than(Some(&a)));
        assert!(!a.is_newer_than(Some(&a)));
        assert!(b.is_newer_than(None));
    }

    #[test]
    fn nan_is_never_newer() {
        assert!(!Shared::new(f64::NAN).is_newer_than(None));
    }

    #[test]
    fn cell_starts_empty_and_adopts_first_offer() {
        let cell = SharedCell::new();
        assert_eq!(cell.get(), None);
        assert!(cell.offer(Shared::new(42.0)));
        assert_eq!(cell.get(), Some(Shared::new(42.0)));
        assert_eq!(cell.version(), 1);
    }

    #[test]
    fn cell_never_regresses() {
        let cell = SharedCell::with_value(Shared::new(5.0));
        assert!(!cell.offer(Shared::new(7.0)));
        assert!(!cell.offer(Shared::new(5.0)));
        assert!(cell.offer(Shared::new(3.0)));
        assert_eq!(cell.get().map(|s| s.get()), Some(3.0));
        assert_eq!(cell.version(), 2);
    }

    #[test]
    fn concurrent_offers_converge_on_minimum() {
        let cell = Arc::new(SharedCell::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || {
                    for i in (0..500).rev() {
                        cell.offer(Shared::new((i * 8 + t) as f64));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cell.get(), Some(Shared::new(0.0)));
    }
}
