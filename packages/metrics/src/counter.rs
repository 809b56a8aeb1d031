//! A monotonically increasing counter.
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter.
///
/// Increments use relaxed ordering: counters are statistics, not
/// synchronization points.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.add(1);
    }

    pub fn add(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {

    mod counter {
        use crate::counter::Counter;

        #[test]
        fn it_should_start_at_zero() {
            assert_eq!(Counter::new().get(), 0);
        }

        #[test]
        fn it_should_accumulate_increments() {
            let counter = Counter::new();

            counter.inc();
            counter.add(41);

            assert_eq!(counter.get(), 42);
        }
    }
}
