//! Forked runs
//!
//! A fork is a fresh process: the current executable is re-invoked with
//! [`FORK_SPEC_ARG`] followed by a JSON [`ForkSpec`]. The child runs one group
//! in-process and prints one JSON [`ForkResult`] line on stdout. Its stderr is
//! inherited, so child logs interleave with the parent's.

use super::{ForkResult, Runner};
use crate::bench::{BenchmarkGroup, GroupName};
use crate::config::BenchConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Hidden command line flag that turns the executable into a fork child
pub const FORK_SPEC_ARG: &str = "--fork-spec";

/// Everything a child process needs to run one fork of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForkSpec {
    /// Full run configuration
    pub config: BenchConfig,
    /// Group to run
    pub group: GroupName,
    /// Fork number, starting at 0
    pub fork: usize,
}

impl ForkSpec {
    /// Decode a spec passed on the command line
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload)
            .map_err(|err| Error::ForkFailed(format!("malformed fork spec: {}", err)))
    }

    /// Run this fork in the current process
    pub fn execute(&self) -> Result<ForkResult> {
        self.config.validate()?;
        let group = BenchmarkGroup::with_threads(self.group, &self.config.thread_groups)?;
        Runner::new(self.config.clone()).run_fork(&group, self.fork)
    }
}

/// Run one fork in a child process of `executable` and collect its result
pub fn spawn(executable: &Path, spec: &ForkSpec) -> Result<ForkResult> {
    let payload = serde_json::to_string(spec)
        .map_err(|err| Error::ForkFailed(format!("cannot encode fork spec: {}", err)))?;

    debug!(
        executable = %executable.display(),
        group = %spec.group,
        fork = spec.fork,
        "spawning fork"
    );

    let output = Command::new(executable)
        .arg(FORK_SPEC_ARG)
        .arg(&payload)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|err| {
            Error::ForkFailed(format!("cannot start {}: {}", executable.display(), err))
        })?;

    if !output.status.success() {
        return Err(Error::ForkFailed(format!(
            "fork {} of group {} exited with {}",
            spec.fork, spec.group, output.status
        )));
    }

    parse_child_output(&String::from_utf8_lossy(&output.stdout))
}

/// Extract the result line from a child's stdout
///
/// The result is the last non-empty line.
pub fn parse_child_output(stdout: &str) -> Result<ForkResult> {
    let line = stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| Error::ForkFailed("child produced no result".to_string()))?;

    serde_json::from_str(line)
        .map_err(|err| Error::ForkFailed(format!("unreadable child result: {}", err)))
}
