//! # contention-bench
//!
//! A throughput benchmark for concurrent hash maps under maximal single-key contention.
//!
//! Every thread touches exactly one key of one shared map. Two thread groups are
//! measured in separate runs:
//!
//! - **compute**: 6 threads `insert` the key while 6 threads delete it through a
//!   compute whose remapping function returns "absent"
//! - **remove**: 6 threads `insert` the key while 6 threads delete it with a direct `remove`
//!
//! The insert side is identical in both groups, so the deletion strategy is the only
//! independent variable.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use contention_bench::config::BenchConfig;
//! use contention_bench::runner::Runner;
//! use std::time::Duration;
//!
//! let mut config = BenchConfig::default();
//! config.forks = 0;
//! config.warmup_iterations = 1;
//! config.measurement_iterations = 2;
//! config.iteration_time = Duration::from_millis(200);
//!
//! let report = Runner::new(config).run()?;
//! for group in &report.groups {
//!     println!("{}: {:.3}", group.group, group.total.mean);
//! }
//! # Ok::<(), contention_bench::Error>(())
//! ```
//!
//! ## Harness
//!
//! The [`runner`] module is an explicit benchmark driver: it builds the shared state,
//! spawns the declared thread counts per operation, runs fixed-duration warmup and
//! measurement iterations, collects per-thread operation counts and turns them into
//! throughput. Forks are fresh child processes of the current executable.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod bench;
pub mod config;
pub mod map;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod state;

pub use crate::bench::{BenchmarkGroup, Blackhole, GroupName, Operation};
pub use crate::config::BenchConfig;
pub use crate::map::{ContendedMap, Identifier, MapKind};
pub use crate::runner::Runner;
pub use crate::state::SharedState;

/// Common utilities and helper types
pub mod util {
    /// Cache line size for alignment purposes
    pub const CACHE_LINE_SIZE: usize = 64;

    /// Pad a value to its own cache line
    ///
    /// Used for the runner's start and stop flags, which every worker polls
    /// between operations.
    #[repr(align(64))]
    #[derive(Debug, Default)]
    pub struct CachePadded<T> {
        value: T,
    }

    impl<T> CachePadded<T> {
        /// Create a new cache-padded value
        #[inline]
        pub const fn new(value: T) -> Self {
            Self { value }
        }

        /// Get the inner value
        #[inline]
        pub fn into_inner(self) -> T {
            self.value
        }
    }

    impl<T> core::ops::Deref for CachePadded<T> {
        type Target = T;

        #[inline]
        fn deref(&self) -> &T {
            &self.value
        }
    }
}

/// Error types for benchmark runs
///
/// None of these are domain errors: each one means the harness itself could not
/// produce a trustworthy measurement and the run is aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The configuration cannot describe a runnable benchmark
    InvalidConfig(String),
    /// The OS refused to start a worker thread
    ThreadSpawn(String),
    /// A worker thread panicked mid-iteration
    WorkerPanicked(String),
    /// The shared map was observed in a state no linearizable map can reach
    CorruptState(String),
    /// A forked child process failed or produced unreadable output
    ForkFailed(String),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::ThreadSpawn(msg) => write!(f, "Failed to spawn worker thread: {}", msg),
            Error::WorkerPanicked(name) => write!(f, "Worker thread {} panicked", name),
            Error::CorruptState(msg) => write!(f, "Shared map in impossible state: {}", msg),
            Error::ForkFailed(msg) => write!(f, "Forked run failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for benchmark operations
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_cache_padded_alignment() {
        assert_eq!(core::mem::align_of::<util::CachePadded<AtomicBool>>(), util::CACHE_LINE_SIZE);
        assert!(core::mem::size_of::<util::CachePadded<u8>>() >= util::CACHE_LINE_SIZE);
    }

    #[test]
    fn test_cache_padded_deref() {
        let flag = util::CachePadded::new(AtomicBool::new(false));
        flag.store(true, Ordering::Relaxed);
        assert!(flag.load(Ordering::Relaxed));
        assert!(flag.into_inner().into_inner());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::InvalidConfig("zero iterations".to_string()).to_string(),
            "Invalid configuration: zero iterations"
        );
        assert_eq!(
            Error::WorkerPanicked("compute-insert-0".to_string()).to_string(),
            "Worker thread compute-insert-0 panicked"
        );
        assert_eq!(
            Error::ForkFailed("exit status 1".to_string()).to_string(),
            "Forked run failed: exit status 1"
        );
    }
}
