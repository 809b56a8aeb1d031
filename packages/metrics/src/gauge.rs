//! A gauge that can be set to an arbitrary value.
use std::sync::atomic::{AtomicU64, Ordering};

/// A gauge holding a non-negative value that is replaced wholesale, the way
/// the periodic storage aggregation does.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: u64) {
        self.0.store(value, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
