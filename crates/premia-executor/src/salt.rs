//! Monotonic salt generation for quote issuance.
//!
//! Salts are issuance timestamps in milliseconds, bumped past the last value
//! so two quotes signed in the same millisecond never share one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of the current time, replaceable in tests.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;

    fn now_secs(&self) -> u64 {
        self.now_ms() / 1000
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// Fixed clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Acquire)
    }
}

/// Issues strictly increasing salts that track wall-clock milliseconds.
pub struct SaltGenerator {
    last: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl SaltGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            last: AtomicU64::new(0),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns `max(last + 1, now_ms)`.
    ///
    /// Thread-safe via CAS loop.
    pub fn next(&self) -> u64 {
        let target = self.clock.now_ms();

        loop {
            let current = self.last.load(Ordering::Acquire);
            let next_val = current.saturating_add(1).max(target);

            match self.last.compare_exchange_weak(
                current,
                next_val,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next_val,
                Err(_) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_salt_tracks_clock() {
        let clock = Arc::new(ManualClock::new(1_000));
        let salts = SaltGenerator::new(clock.clone());
        assert_eq!(salts.next(), 1_000);

        clock.set(5_000);
        assert_eq!(salts.next(), 5_000);
    }

    #[test]
    fn test_salt_monotonic_within_same_millisecond() {
        let salts = SaltGenerator::new(Arc::new(ManualClock::new(1_000)));
        assert_eq!(salts.next(), 1_000);
        assert_eq!(salts.next(), 1_001);
        assert_eq!(salts.next(), 1_002);
    }

    #[test]
    fn test_salt_never_goes_backwards() {
        let clock = Arc::new(ManualClock::new(10_000));
        let salts = SaltGenerator::new(clock.clone());
        let first = salts.next();

        clock.set(9_000);
        assert!(salts.next() > first);
    }

    #[test]
    fn test_salt_unique_across_threads() {
        let salts = Arc::new(SaltGenerator::new(Arc::new(ManualClock::new(42))));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let salts = salts.clone();
                thread::spawn(move || (0..250).map(|_| salts.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for salt in handle.join().unwrap() {
                assert!(seen.insert(salt), "duplicate salt {salt}");
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2023-01-01
        assert!(SystemClock.now_ms() > 1_672_531_200_000);
    }
}
