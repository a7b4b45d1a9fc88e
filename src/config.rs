//! Benchmark configuration
//!
//! [`BenchConfig::default`] is the declared benchmark: throughput mode in ops/us,
//! 5 forks, 5 warmup and 5 measurement iterations of 10 seconds, and 6 threads per
//! group member. The command line overrides individual fields; forked children
//! receive the whole config as JSON.

use crate::bench::{BenchmarkGroup, GroupName, DEFAULT_GROUP_THREADS};
use crate::map::MapKind;
use crate::metrics::TimeUnit;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of forked processes per group
pub const DEFAULT_FORKS: usize = 5;
/// Default warmup iterations per fork
pub const DEFAULT_WARMUP_ITERATIONS: usize = 5;
/// Default measurement iterations per fork
pub const DEFAULT_MEASUREMENT_ITERATIONS: usize = 5;
/// Default length of one iteration
pub const DEFAULT_ITERATION_TIME: Duration = Duration::from_secs(10);

/// When the shared state is rebuilt
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SetupLevel {
    /// Fresh map and key for every warmup and measurement iteration
    #[default]
    Iteration,
    /// One map and key per fork, shared by all of its iterations
    Fork,
}

/// Full description of a benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Groups to run, each measured separately
    pub groups: Vec<GroupName>,
    /// Map backend under test
    pub map: MapKind,
    /// Forked processes per group; 0 runs in-process
    pub forks: usize,
    /// Warmup iterations per fork
    pub warmup_iterations: usize,
    /// Measurement iterations per fork
    pub measurement_iterations: usize,
    /// Length of one warmup iteration
    pub warmup_time: Duration,
    /// Length of one measurement iteration
    pub iteration_time: Duration,
    /// Threads for `insert` then for the group's delete operation
    pub thread_groups: Vec<usize>,
    /// Unit throughput is reported in
    pub time_unit: TimeUnit,
    /// When shared state is rebuilt
    pub setup_level: SetupLevel,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            groups: GroupName::ALL.to_vec(),
            map: MapKind::default(),
            forks: DEFAULT_FORKS,
            warmup_iterations: DEFAULT_WARMUP_ITERATIONS,
            measurement_iterations: DEFAULT_MEASUREMENT_ITERATIONS,
            warmup_time: DEFAULT_ITERATION_TIME,
            iteration_time: DEFAULT_ITERATION_TIME,
            thread_groups: vec![DEFAULT_GROUP_THREADS, DEFAULT_GROUP_THREADS],
            time_unit: TimeUnit::Microseconds,
            setup_level: SetupLevel::default(),
        }
    }
}

impl BenchConfig {
    /// Reject configurations that cannot produce a measurement
    pub fn validate(&self) -> Result<()> {
        if self.groups.is_empty() {
            return Err(Error::InvalidConfig("no benchmark groups selected".to_string()));
        }
        if self.measurement_iterations == 0 {
            return Err(Error::InvalidConfig(
                "measurement iterations must be at least 1".to_string(),
            ));
        }
        if self.iteration_time.is_zero() {
            return Err(Error::InvalidConfig("iteration time must be non-zero".to_string()));
        }
        if self.warmup_iterations > 0 && self.warmup_time.is_zero() {
            return Err(Error::InvalidConfig("warmup time must be non-zero".to_string()));
        }
        for &name in &self.groups {
            BenchmarkGroup::with_threads(name, &self.thread_groups)?;
        }
        Ok(())
    }

    /// Resolve the selected groups with the configured thread counts
    pub fn benchmark_groups(&self) -> Result<Vec<BenchmarkGroup>> {
        self.groups
            .iter()
            .map(|&name| BenchmarkGroup::with_threads(name, &self.thread_groups))
            .collect()
    }
}

/// Parse an iteration length such as `500ms`, `10s`, `2m` or `250us`
///
/// A bare number is read as seconds.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);

    let amount: u64 = digits
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("invalid duration '{}'", input)))?;

    match unit.trim() {
        "" | "s" => Ok(Duration::from_secs(amount)),
        "ms" => Ok(Duration::from_millis(amount)),
        "us" => Ok(Duration::from_micros(amount)),
        "ns" => Ok(Duration::from_nanos(amount)),
        "m" | "min" => amount.checked_mul(60).map(Duration::from_secs).ok_or_else(|| {
            Error::InvalidConfig(format!("duration '{}' is too large", input))
        }),
        other => Err(Error::InvalidConfig(format!(
            "unknown duration unit '{}' in '{}'",
            other, input
        ))),
    }
}
