//! Benchmark runner
//!
//! An explicit driver for the contention benchmark. For each selected group it:
//!
//! 1. builds a [`SharedState`] (per iteration or per fork, see [`SetupLevel`])
//! 2. spawns the declared number of OS threads for every group member
//! 3. releases them together, sleeps for the iteration time, then raises a stop flag
//! 4. collects per-thread operation counts and elapsed times
//! 5. turns them into throughput in the configured [`TimeUnit`]
//!
//! Warmup iterations run before measurement iterations and are excluded from
//! scores. With `forks > 0` every fork is a fresh child process (see [`fork`]).
//!
//! ## Throughput
//!
//! Each worker times its own measurement window. A member's score for one
//! iteration is the sum over its threads of `ops / elapsed`; the group total is
//! the sum over members.

use crate::bench::{self, BenchmarkGroup, Blackhole, Operation};
use crate::config::{BenchConfig, SetupLevel};
use crate::map::{ContendedMap, FlurryMap, Identifier, LockedHashMap, MapKind, ShardedMap};
use crate::metrics::TimeUnit;
use crate::report::{GroupReport, RunReport};
use crate::state::SharedState;
use crate::util::CachePadded;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub mod fork;

pub use self::fork::{ForkSpec, FORK_SPEC_ARG};

/// What one worker thread did during one iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkerSample {
    /// Operation the worker ran
    pub operation: Operation,
    /// Completed operations
    pub ops: u64,
    /// Operations whose result was present
    pub present: u64,
    /// Length of the worker's measurement window
    pub elapsed: Duration,
}

/// Score of one group member for one iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationScore {
    /// The member's operation
    pub operation: Operation,
    /// Threads that ran it
    pub threads: usize,
    /// Completed operations across those threads
    pub ops: u64,
    /// Operations whose result was present
    pub present: u64,
    /// Sum of per-thread throughput
    pub throughput: f64,
}

/// Scores for one warmup or measurement iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    /// Position within its phase, starting at 1
    pub index: usize,
    /// Whether this was a warmup iteration
    pub warmup: bool,
    /// Per-member scores, in member order
    pub operations: Vec<OperationScore>,
    /// Sum of the member scores
    pub total: f64,
}

impl IterationResult {
    /// Aggregate worker samples into per-member throughput
    pub fn from_samples(
        index: usize,
        warmup: bool,
        group: &BenchmarkGroup,
        samples: &[WorkerSample],
        unit: TimeUnit,
    ) -> Self {
        let operations: Vec<OperationScore> = group
            .members
            .iter()
            .map(|member| {
                let mine = samples
                    .iter()
                    .filter(|sample| sample.operation == member.operation);
                let mut score = OperationScore {
                    operation: member.operation,
                    threads: 0,
                    ops: 0,
                    present: 0,
                    throughput: 0.0,
                };
                for sample in mine {
                    score.threads += 1;
                    score.ops += sample.ops;
                    score.present += sample.present;
                    score.throughput += unit.throughput(sample.ops, sample.elapsed);
                }
                score
            })
            .collect();
        let total = operations.iter().map(|score| score.throughput).sum();

        Self {
            index,
            warmup,
            operations,
            total,
        }
    }
}

/// Every iteration one fork ran for one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForkResult {
    /// Fork number, starting at 0
    pub fork: usize,
    /// Warmup then measurement iterations
    pub iterations: Vec<IterationResult>,
}

impl ForkResult {
    /// Measurement iterations only
    pub fn measured(&self) -> impl Iterator<Item = &IterationResult> {
        self.iterations.iter().filter(|iteration| !iteration.warmup)
    }
}

/// Benchmark driver
#[derive(Debug, Clone)]
pub struct Runner {
    config: BenchConfig,
    executable: Option<PathBuf>,
}

impl Runner {
    /// Create a runner for `config`
    pub fn new(config: BenchConfig) -> Self {
        Self {
            config,
            executable: None,
        }
    }

    /// Executable re-invoked for each fork
    ///
    /// Required when `forks > 0`; it must accept [`FORK_SPEC_ARG`].
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    /// The configuration this runner executes
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run every selected group, each in its own set of forks
    pub fn run(&self) -> Result<RunReport> {
        self.config.validate()?;
        let groups = self.config.benchmark_groups()?;

        let executable = match (self.config.forks, &self.executable) {
            (0, _) => None,
            (_, Some(path)) => Some(path.as_path()),
            (_, None) => {
                return Err(Error::InvalidConfig(
                    "forked runs need an executable to re-invoke".to_string(),
                ))
            }
        };

        let mut reports = Vec::with_capacity(groups.len());
        for group in &groups {
            info!(
                group = %group.name,
                map = %self.config.map,
                threads = group.total_threads(),
                forks = self.config.forks,
                "running benchmark group"
            );

            let forks = match executable {
                None => vec![self.run_fork(group, 0)?],
                Some(path) => (0..self.config.forks)
                    .map(|index| {
                        let spec = ForkSpec {
                            config: self.config.clone(),
                            group: group.name,
                            fork: index,
                        };
                        fork::spawn(path, &spec)
                    })
                    .collect::<Result<Vec<_>>>()?,
            };

            reports.push(GroupReport::aggregate(group, &self.config, &forks));
        }

        Ok(RunReport {
            config: self.config.clone(),
            groups: reports,
        })
    }

    /// Run warmup and measurement iterations of one group in this process
    pub fn run_fork(&self, group: &BenchmarkGroup, fork: usize) -> Result<ForkResult> {
        match self.config.map {
            MapKind::Flurry => run_fork_with::<FlurryMap>(&self.config, group, fork),
            MapKind::Dashmap => run_fork_with::<ShardedMap>(&self.config, group, fork),
            MapKind::Locked => {
                run_fork_with::<LockedHashMap<Identifier, Identifier>>(&self.config, group, fork)
            }
        }
    }
}

fn run_fork_with<M>(config: &BenchConfig, group: &BenchmarkGroup, fork: usize) -> Result<ForkResult>
where
    M: ContendedMap<Identifier, Identifier>,
{
    let retained = match config.setup_level {
        SetupLevel::Fork => Some(SharedState::<M>::setup()),
        SetupLevel::Iteration => None,
    };

    let warmup = (1..=config.warmup_iterations).map(|index| (index, true, config.warmup_time));
    let measurement = (1..=config.measurement_iterations)
        .map(|index| (index, false, config.iteration_time));

    let mut iterations = Vec::with_capacity(config.warmup_iterations + config.measurement_iterations);
    for (index, is_warmup, duration) in warmup.chain(measurement) {
        let fresh;
        let state = match retained.as_ref() {
            Some(state) => state,
            None => {
                fresh = SharedState::<M>::setup();
                &fresh
            }
        };

        let samples = run_iteration(state, group, duration)?;
        state.verify()?;

        let result = IterationResult::from_samples(index, is_warmup, group, &samples, config.time_unit);
        let phase = if is_warmup { "warmup" } else { "measurement" };
        info!(
            group = %group.name,
            fork,
            phase,
            iteration = index,
            total = format_args!("{:.3} {}", result.total, config.time_unit),
            "iteration complete"
        );
        for score in &result.operations {
            debug!(
                operation = %score.operation,
                ops = score.ops,
                present = score.present,
                throughput = format_args!("{:.3}", score.throughput),
                "member score"
            );
        }
        iterations.push(result);
    }

    Ok(ForkResult { fork, iterations })
}

/// Run one fixed-duration iteration of `group` against `state`
///
/// All workers are spawned before any of them starts; they run until the stop
/// flag is raised and are joined before this returns.
pub fn run_iteration<M>(
    state: &SharedState<M>,
    group: &BenchmarkGroup,
    duration: Duration,
) -> Result<Vec<WorkerSample>>
where
    M: ContendedMap<Identifier, Identifier>,
{
    let start = CachePadded::new(AtomicBool::new(false));
    let stop = CachePadded::new(AtomicBool::new(false));

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(group.total_threads());
        let mut spawn_error = None;

        'spawn: for member in &group.members {
            for n in 0..member.threads {
                let name = format!("{}-{}-{}", group.name, member.operation, n);
                let operation = member.operation;
                let (start, stop) = (&start, &stop);

                let spawned = thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(scope, move || worker(state, operation, start, stop));
                match spawned {
                    Ok(handle) => handles.push((name, handle)),
                    Err(err) => {
                        warn!(thread = %name, error = %err, "worker spawn failed, aborting iteration");
                        spawn_error = Some(Error::ThreadSpawn(format!("{}: {}", name, err)));
                        break 'spawn;
                    }
                }
            }
        }

        start.store(true, Ordering::Release);
        if spawn_error.is_none() {
            thread::sleep(duration);
        }
        stop.store(true, Ordering::Release);

        let mut samples = Vec::with_capacity(handles.len());
        let mut panicked = None;
        for (name, handle) in handles {
            match handle.join() {
                Ok(sample) => samples.push(sample),
                Err(_) => {
                    panicked.get_or_insert(name);
                }
            }
        }

        if let Some(err) = spawn_error {
            return Err(err);
        }
        if let Some(name) = panicked {
            return Err(Error::WorkerPanicked(name));
        }
        Ok(samples)
    })
}

fn worker<M>(
    state: &SharedState<M>,
    operation: Operation,
    start: &AtomicBool,
    stop: &AtomicBool,
) -> WorkerSample
where
    M: ContendedMap<Identifier, Identifier>,
{
    // One monomorphized loop per operation
    match operation {
        Operation::Insert => drive(state, operation, start, stop, bench::insert::<M>),
        Operation::DeleteViaConditionalUpdate => drive(
            state,
            operation,
            start,
            stop,
            bench::delete_via_conditional_update::<M>,
        ),
        Operation::DeleteViaDirectRemoval => drive(
            state,
            operation,
            start,
            stop,
            bench::delete_via_direct_removal::<M>,
        ),
    }
}

#[inline(always)]
fn drive<M, F>(
    state: &SharedState<M>,
    operation: Operation,
    start: &AtomicBool,
    stop: &AtomicBool,
    measured: F,
) -> WorkerSample
where
    F: Fn(&SharedState<M>, &mut Blackhole),
{
    let mut sink = Blackhole::new();

    while !start.load(Ordering::Acquire) {
        thread::yield_now();
    }

    let began = Instant::now();
    while !stop.load(Ordering::Relaxed) {
        measured(state, &mut sink);
    }
    let elapsed = began.elapsed();

    let sink = std::hint::black_box(sink);
    WorkerSample {
        operation,
        ops: sink.consumed(),
        present: sink.present(),
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::GroupName;

    fn quick_config(map: MapKind) -> BenchConfig {
        BenchConfig {
            map,
            forks: 0,
            warmup_iterations: 1,
            measurement_iterations: 2,
            warmup_time: Duration::from_millis(10),
            iteration_time: Duration::from_millis(20),
            thread_groups: vec![2, 2],
            ..BenchConfig::default()
        }
    }

    #[test]
    fn test_run_iteration_collects_every_worker() {
        let state = SharedState::<ShardedMap>::setup();
        let group = BenchmarkGroup::declared(GroupName::Remove);

        let samples = run_iteration(&state, &group, Duration::from_millis(20)).unwrap();

        assert_eq!(samples.len(), 12);
        let inserts = samples
            .iter()
            .filter(|sample| sample.operation == Operation::Insert)
            .count();
        assert_eq!(inserts, 6);
        let total_ops: u64 = samples.iter().map(|sample| sample.ops).sum();
        assert!(total_ops > 0);
        assert!(samples.iter().all(|sample| sample.present <= sample.ops));
        assert!(samples.iter().all(|sample| sample.elapsed > Duration::ZERO));
        assert!(state.verify().is_ok());
    }

    #[test]
    fn test_compute_deletes_never_report_present() {
        let state = SharedState::<FlurryMap>::setup();
        let group = BenchmarkGroup::with_threads(GroupName::Compute, &[2, 2]).unwrap();

        let samples = run_iteration(&state, &group, Duration::from_millis(20)).unwrap();

        for sample in &samples {
            if sample.operation == Operation::DeleteViaConditionalUpdate {
                assert_eq!(sample.present, 0);
            }
        }
    }

    /// Behaves like the locked map but panics on every direct removal
    #[derive(Debug)]
    struct PanicOnRemove(LockedHashMap<Identifier, Identifier>);

    impl ContendedMap<Identifier, Identifier> for PanicOnRemove {
        fn new_map() -> Self {
            Self(LockedHashMap::new())
        }

        fn insert(&self, key: Identifier, value: Identifier) -> Option<Identifier> {
            self.0.insert(key, value)
        }

        fn compute_to_absent(&self, key: &Identifier) -> Option<Identifier> {
            self.0.compute_to_absent(key)
        }

        fn remove(&self, _key: &Identifier) -> Option<Identifier> {
            panic!("remove failed");
        }

        fn get(&self, key: &Identifier) -> Option<Identifier> {
            self.0.get(key)
        }

        fn len(&self) -> usize {
            self.0.len()
        }
    }

    #[test]
    fn test_run_iteration_reports_panicked_worker() {
        let state = SharedState::<PanicOnRemove>::setup();
        let group = BenchmarkGroup::with_threads(GroupName::Remove, &[2, 2]).unwrap();

        let err = run_iteration(&state, &group, Duration::from_millis(20)).unwrap_err();

        assert_eq!(
            err,
            Error::WorkerPanicked("remove-delete_via_direct_removal-0".to_string())
        );
        // Insert workers were still joined and left the map consistent
        assert!(state.verify().is_ok());
    }

    #[test]
    fn test_iteration_result_sums_per_thread_throughput() {
        let group = BenchmarkGroup::with_threads(GroupName::Compute, &[2, 1]).unwrap();
        let second = Duration::from_secs(1);
        let samples = [
            WorkerSample {
                operation: Operation::Insert,
                ops: 1_000_000,
                present: 10,
                elapsed: second,
            },
            WorkerSample {
                operation: Operation::Insert,
                ops: 3_000_000,
                present: 20,
                elapsed: second * 2,
            },
            WorkerSample {
                operation: Operation::DeleteViaConditionalUpdate,
                ops: 4_000_000,
                present: 0,
                elapsed: second,
            },
        ];

        let result = IterationResult::from_samples(1, false, &group, &samples, TimeUnit::Microseconds);

        assert_eq!(result.operations[0].threads, 2);
        assert_eq!(result.operations[0].ops, 4_000_000);
        assert!((result.operations[0].throughput - 2.5).abs() < 1e-9);
        assert!((result.operations[1].throughput - 4.0).abs() < 1e-9);
        assert!((result.total - 6.5).abs() < 1e-9);
    }

    #[test]
    fn test_run_fork_runs_warmup_then_measurement() {
        let runner = Runner::new(quick_config(MapKind::Locked));
        let group = BenchmarkGroup::with_threads(GroupName::Compute, &[2, 2]).unwrap();

        let result = runner.run_fork(&group, 0).unwrap();

        let phases: Vec<_> = result.iterations.iter().map(|it| (it.warmup, it.index)).collect();
        assert_eq!(phases, [(true, 1), (false, 1), (false, 2)]);
        assert_eq!(result.measured().count(), 2);
    }

    #[test]
    fn test_fork_level_setup_reuses_state() {
        let mut config = quick_config(MapKind::Dashmap);
        config.setup_level = SetupLevel::Fork;
        let group = BenchmarkGroup::with_threads(GroupName::Remove, &[1, 1]).unwrap();

        let result = Runner::new(config).run_fork(&group, 3).unwrap();
        assert_eq!(result.fork, 3);
        assert_eq!(result.iterations.len(), 3);
    }

    #[test]
    fn test_forked_run_requires_executable() {
        let mut config = quick_config(MapKind::Flurry);
        config.forks = 2;
        assert!(matches!(
            Runner::new(config).run(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_running() {
        let mut config = quick_config(MapKind::Flurry);
        config.thread_groups = vec![0, 2];
        assert!(matches!(
            Runner::new(config).run(),
            Err(Error::InvalidConfig(_))
        ));
    }
}
