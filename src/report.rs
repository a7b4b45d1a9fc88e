//! Result aggregation and output
//!
//! Measurement iterations from every fork of a group are pooled into one
//! [`Statistics`] per member plus one for the group total. Reports render either as
//! a JMH-style table or as JSON.

use crate::bench::{BenchmarkGroup, GroupName, Operation};
use crate::config::BenchConfig;
use crate::map::MapKind;
use crate::metrics::{Statistics, TimeUnit};
use crate::runner::ForkResult;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Output format for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned table
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Aggregated score of one group member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationReport {
    /// The member's operation
    pub operation: Operation,
    /// Threads that ran it
    pub threads: usize,
    /// Throughput across measurement iterations of every fork
    pub score: Statistics,
    /// Share of consumed results that were present
    pub present_ratio: f64,
}

/// Aggregated scores of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReport {
    /// Group name
    pub group: GroupName,
    /// Map backend measured
    pub map: MapKind,
    /// Unit of every score in this report
    pub unit: TimeUnit,
    /// Number of forks that contributed
    pub forks: usize,
    /// Group total (sum of member scores per iteration)
    pub total: Statistics,
    /// Per-member scores
    pub operations: Vec<OperationReport>,
}

impl GroupReport {
    /// Pool the measurement iterations of `forks`
    pub fn aggregate(group: &BenchmarkGroup, config: &BenchConfig, forks: &[ForkResult]) -> Self {
        let measured: Vec<_> = forks.iter().flat_map(|fork| fork.measured()).collect();

        let totals: Vec<f64> = measured.iter().map(|iteration| iteration.total).collect();

        let operations = group
            .members
            .iter()
            .map(|member| {
                let scores: Vec<_> = measured
                    .iter()
                    .flat_map(|iteration| iteration.operations.iter())
                    .filter(|score| score.operation == member.operation)
                    .collect();

                let samples: Vec<f64> = scores.iter().map(|score| score.throughput).collect();
                let ops: u64 = scores.iter().map(|score| score.ops).sum();
                let present: u64 = scores.iter().map(|score| score.present).sum();

                OperationReport {
                    operation: member.operation,
                    threads: member.threads,
                    score: Statistics::from_samples(&samples),
                    present_ratio: if ops == 0 {
                        0.0
                    } else {
                        present as f64 / ops as f64
                    },
                }
            })
            .collect();

        Self {
            group: group.name,
            map: config.map,
            unit: config.time_unit,
            forks: forks.len(),
            total: Statistics::from_samples(&totals),
            operations,
        }
    }
}

/// Results of a complete run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Configuration the run used
    pub config: BenchConfig,
    /// One report per group, in run order
    pub groups: Vec<GroupReport>,
}

impl RunReport {
    /// Render in the requested format
    pub fn render(&self, format: OutputFormat) -> serde_json::Result<String> {
        match format {
            OutputFormat::Text => Ok(render_text(self)),
            OutputFormat::Json => serde_json::to_string_pretty(self),
        }
    }
}

/// Render a JMH-style results table
pub fn render_text(report: &RunReport) -> String {
    let config = &report.config;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "# Map: {}, forks: {}, warmup: {} x {:?}, measurement: {} x {:?}, setup: {:?}",
        config.map,
        config.forks,
        config.warmup_iterations,
        config.warmup_time,
        config.measurement_iterations,
        config.iteration_time,
        config.setup_level,
    );
    let _ = writeln!(
        out,
        "{:<40} {:>5} {:>4} {:>12} {:>12} {:>12} {:>12} {:>8} {:>8}",
        "Benchmark", "Mode", "Cnt", "Score", "Error", "Min", "Max", "Units", "Present"
    );

    for group in &report.groups {
        write_row(&mut out, group.group.as_str(), &group.total, group.unit, None);
        for operation in &group.operations {
            let name = format!("{}:{}", group.group, operation.operation);
            write_row(
                &mut out,
                &name,
                &operation.score,
                group.unit,
                Some(operation.present_ratio),
            );
        }
    }

    out
}

fn write_row(out: &mut String, name: &str, stats: &Statistics, unit: TimeUnit, present: Option<f64>) {
    let present = present
        .map(|ratio| format!("{:.1}%", ratio * 100.0))
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "{:<40} {:>5} {:>4} {:>12.3} {:>12} {:>12.3} {:>12.3} {:>8} {:>8}",
        name,
        "thrpt",
        stats.samples,
        stats.mean,
        format!("± {:.3}", stats.stddev),
        stats.min,
        stats.max,
        unit.to_string(),
        present,
    );
}

/// List the benchmarks a configuration would run
pub fn render_list(config: &BenchConfig) -> crate::Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "Benchmarks:");
    for group in config.benchmark_groups()? {
        let _ = writeln!(out, "{} ({} threads)", group.name, group.total_threads());
        for member in &group.members {
            let _ = writeln!(
                out,
                "  {}:{} ({} threads)",
                group.name, member.operation, member.threads
            );
        }
    }
    Ok(out)
}
