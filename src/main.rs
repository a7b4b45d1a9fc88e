use anyhow::Context;
use clap::Parser;
use contention_bench::bench::GroupName;
use contention_bench::config::{parse_duration, BenchConfig, SetupLevel};
use contention_bench::map::MapKind;
use contention_bench::metrics::TimeUnit;
use contention_bench::report::{render_list, OutputFormat};
use contention_bench::runner::{ForkSpec, Runner};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const DEFAULT_TRACE_FILTER: &str = "contention_bench=info";

#[derive(Debug, Parser)]
#[command(
    name = "contention-bench",
    version,
    about = "Single-key contention benchmark: compute-to-absent vs remove under insert pressure",
    long_about = None
)]
struct CliArgs {
    /// Groups to run (default: all)
    #[arg(short = 'g', long = "group", value_enum)]
    groups: Vec<GroupName>,

    /// Map backend under test
    #[arg(short, long, value_enum)]
    map: Option<MapKind>,

    /// Forked processes per group; 0 runs in this process
    #[arg(short, long)]
    forks: Option<usize>,

    /// Warmup iterations per fork
    #[arg(short = 'w', long)]
    warmup_iterations: Option<usize>,

    /// Measurement iterations per fork
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Measurement iteration time, e.g. 500ms, 10s, 1m
    #[arg(short = 'r', long = "time", value_parser = duration_arg)]
    iteration_time: Option<Duration>,

    /// Warmup iteration time
    #[arg(long, value_parser = duration_arg)]
    warmup_time: Option<Duration>,

    /// Threads for insert and for the delete operation, e.g. 6,6
    #[arg(long, value_delimiter = ',')]
    thread_groups: Option<Vec<usize>>,

    /// Unit throughput is reported in
    #[arg(short = 'u', long, value_enum)]
    time_unit: Option<TimeUnit>,

    /// When shared state is rebuilt
    #[arg(long, value_enum)]
    setup_level: Option<SetupLevel>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write results to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// List benchmarks and exit
    #[arg(short, long)]
    list: bool,

    /// Run a single fork described by JSON (used by the parent process)
    #[arg(long = "fork-spec", hide = true, value_name = "JSON")]
    fork_spec: Option<String>,
}

impl CliArgs {
    fn to_config(&self) -> BenchConfig {
        let mut config = BenchConfig::default();
        if !self.groups.is_empty() {
            config.groups = self.groups.clone();
        }
        if let Some(map) = self.map {
            config.map = map;
        }
        if let Some(forks) = self.forks {
            config.forks = forks;
        }
        if let Some(warmup) = self.warmup_iterations {
            config.warmup_iterations = warmup;
        }
        if let Some(iterations) = self.iterations {
            config.measurement_iterations = iterations;
        }
        if let Some(time) = self.iteration_time {
            config.iteration_time = time;
        }
        if let Some(time) = self.warmup_time {
            config.warmup_time = time;
        }
        if let Some(threads) = &self.thread_groups {
            config.thread_groups = threads.clone();
        }
        if let Some(unit) = self.time_unit {
            config.time_unit = unit;
        }
        if let Some(level) = self.setup_level {
            config.setup_level = level;
        }
        config
    }
}

fn duration_arg(value: &str) -> Result<Duration, String> {
    parse_duration(value).map_err(|err| err.to_string())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TRACE_FILTER));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn run_fork_child(payload: &str) -> anyhow::Result<()> {
    let spec = ForkSpec::from_json(payload)?;
    let result = spec
        .execute()
        .with_context(|| format!("fork {} of group {} failed", spec.fork, spec.group))?;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = CliArgs::parse();

    if let Some(payload) = &args.fork_spec {
        return run_fork_child(payload);
    }

    let config = args.to_config();
    config.validate().context("invalid benchmark configuration")?;

    if args.list {
        print!("{}", render_list(&config)?);
        return Ok(());
    }

    let executable = std::env::current_exe().context("cannot locate executable to fork")?;
    let report = Runner::new(config)
        .with_executable(executable)
        .run()
        .context("benchmark run aborted")?;
    let rendered = report.render(args.format)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("cannot write results to {}", path.display()))?;
            info!(path = %path.display(), "results written");
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
