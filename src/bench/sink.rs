//! Discard sink
//!
//! Measured operations hand their results to a [`Blackhole`] so the optimizer cannot
//! treat the map call as dead code.

use core::hint::black_box;

/// Per-thread sink for benchmark results
///
/// Every consumed value goes through [`black_box`]; whether it was present is
/// counted, which gives the caller an observable dependency on every result and a
/// cheap hit ratio for the report.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Blackhole {
    consumed: u64,
    present: u64,
}

impl Blackhole {
    /// Create an empty sink
    pub const fn new() -> Self {
        Self {
            consumed: 0,
            present: 0,
        }
    }

    /// Consume the result of one measured operation
    #[inline]
    pub fn consume<T>(&mut self, value: Option<T>) {
        let value = black_box(value);
        self.consumed += 1;
        self.present += u64::from(value.is_some());
    }

    /// Number of values consumed so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Number of consumed values that were `Some`
    pub fn present(&self) -> u64 {
        self.present
    }

    /// Fold another sink's counts into this one
    pub fn absorb(&mut self, other: &Blackhole) {
        self.consumed += other.consumed;
        self.present += other.present;
    }
}
