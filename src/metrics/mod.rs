//! Throughput Metrics Module
//!
//! Unit conversion for throughput scores and the summary numbers printed per
//! operation: sample count, mean, standard deviation, min and max. Aggregation
//! across iterations and forks happens here; nothing more elaborate is attempted.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Time unit throughput is expressed in (operations per unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum TimeUnit {
    /// Operations per second
    #[serde(rename = "s")]
    #[value(name = "s")]
    Seconds,
    /// Operations per millisecond
    #[serde(rename = "ms")]
    #[value(name = "ms")]
    Milliseconds,
    /// Operations per microsecond
    #[serde(rename = "us")]
    #[value(name = "us")]
    Microseconds,
    /// Operations per nanosecond
    #[serde(rename = "ns")]
    #[value(name = "ns")]
    Nanoseconds,
}

impl TimeUnit {
    /// Length of one unit in nanoseconds
    pub const fn nanos(self) -> u64 {
        match self {
            TimeUnit::Seconds => 1_000_000_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Nanoseconds => 1,
        }
    }

    /// Short suffix, e.g. `us`
    pub const fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Microseconds => "us",
            TimeUnit::Nanoseconds => "ns",
        }
    }

    /// Throughput of `ops` operations completed in `elapsed`, in this unit
    ///
    /// Returns 0 for a zero-length window rather than infinity.
    pub fn throughput(self, ops: u64, elapsed: Duration) -> f64 {
        let elapsed_ns = elapsed.as_nanos();
        if elapsed_ns == 0 {
            return 0.0;
        }
        ops as f64 * self.nanos() as f64 / elapsed_ns as f64
    }
}

impl core::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ops/{}", self.suffix())
    }
}

/// Summary of a set of throughput samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Number of samples
    pub samples: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (0 with fewer than two samples)
    pub stddev: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
}

impl Statistics {
    /// Summarize `samples`; an empty slice yields all zeros
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let count = samples.len();
        let mean = samples.iter().sum::<f64>() / count as f64;
        let stddev = if count > 1 {
            let variance = samples
                .iter()
                .map(|sample| (sample - mean).powi(2))
                .sum::<f64>()
                / (count - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            samples: count,
            mean,
            stddev,
            min,
            max,
        }
    }

    /// Check every figure is a finite, non-negative number
    pub fn is_well_formed(&self) -> bool {
        [self.mean, self.stddev, self.min, self.max]
            .iter()
            .all(|value| value.is_finite() && *value >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput_conversion() {
        let second = Duration::from_secs(1);
        assert_eq!(TimeUnit::Seconds.throughput(5_000_000, second), 5_000_000.0);
        assert_eq!(TimeUnit::Milliseconds.throughput(5_000_000, second), 5_000.0);
        assert_eq!(TimeUnit::Microseconds.throughput(5_000_000, second), 5.0);
        assert_eq!(TimeUnit::Nanoseconds.throughput(5_000_000, second), 0.005);
        assert_eq!(TimeUnit::Microseconds.throughput(10, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_unit_display() {
        assert_eq!(TimeUnit::Microseconds.to_string(), "ops/us");
        assert_eq!(serde_json::to_string(&TimeUnit::Milliseconds).unwrap(), "\"ms\"");
    }

    #[test]
    fn test_statistics() {
        let stats = Statistics::from_samples(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.samples, 8);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.stddev - 2.138_089_935_299_395).abs() < 1e-9);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert!(stats.is_well_formed());
    }

    #[test]
    fn test_statistics_edge_cases() {
        assert_eq!(Statistics::from_samples(&[]), Statistics::default());

        let single = Statistics::from_samples(&[3.5]);
        assert_eq!(single.mean, 3.5);
        assert_eq!(single.stddev, 0.0);
        assert_eq!(single.min, single.max);

        let broken = Statistics::from_samples(&[f64::INFINITY]);
        assert!(!broken.is_well_formed());
    }
}
