//! Benchmark definition
//!
//! The measured operations and the two thread groups that pit them against each
//! other. Groups are always measured in separate runs, each against its own
//! [`SharedState`].
//!
//! | Group     | Member                          | Threads |
//! |-----------|---------------------------------|---------|
//! | `compute` | `insert`                        | 6       |
//! | `compute` | `delete_via_conditional_update` | 6       |
//! | `remove`  | `insert`                        | 6       |
//! | `remove`  | `delete_via_direct_removal`     | 6       |
//!
//! The `insert` member is identical in both groups; only the deletion strategy varies.

use crate::map::{ContendedMap, Identifier};
use crate::state::SharedState;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

pub mod sink;

pub use self::sink::Blackhole;

/// Threads per group member, as declared by the benchmark
pub const DEFAULT_GROUP_THREADS: usize = 6;

/// Unconditionally map the fixed key to itself
#[inline]
pub fn insert<M>(state: &SharedState<M>, sink: &mut Blackhole)
where
    M: ContendedMap<Identifier, Identifier>,
{
    sink.consume(state.map().insert(state.key(), state.key()));
}

/// Delete the fixed key through a compute whose function always yields absent
#[inline]
pub fn delete_via_conditional_update<M>(state: &SharedState<M>, sink: &mut Blackhole)
where
    M: ContendedMap<Identifier, Identifier>,
{
    sink.consume(state.map().compute_to_absent(&state.key()));
}

/// Delete the fixed key with a direct remove
#[inline]
pub fn delete_via_direct_removal<M>(state: &SharedState<M>, sink: &mut Blackhole)
where
    M: ContendedMap<Identifier, Identifier>,
{
    sink.consume(state.map().remove(&state.key()));
}

/// One measured operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// [`insert`]
    Insert,
    /// [`delete_via_conditional_update`]
    DeleteViaConditionalUpdate,
    /// [`delete_via_direct_removal`]
    DeleteViaDirectRemoval,
}

impl Operation {
    /// Name used in thread names and reports
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::DeleteViaConditionalUpdate => "delete_via_conditional_update",
            Operation::DeleteViaDirectRemoval => "delete_via_direct_removal",
        }
    }

    /// Run the operation once against `state`
    #[inline]
    pub fn apply<M>(self, state: &SharedState<M>, sink: &mut Blackhole)
    where
        M: ContendedMap<Identifier, Identifier>,
    {
        match self {
            Operation::Insert => insert(state, sink),
            Operation::DeleteViaConditionalUpdate => delete_via_conditional_update(state, sink),
            Operation::DeleteViaDirectRemoval => delete_via_direct_removal(state, sink),
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a benchmark group
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GroupName {
    /// `insert` vs `delete_via_conditional_update`
    Compute,
    /// `insert` vs `delete_via_direct_removal`
    Remove,
}

impl GroupName {
    /// Both groups, in run order
    pub const ALL: [GroupName; 2] = [GroupName::Compute, GroupName::Remove];

    /// Name used on the command line and in reports
    pub fn as_str(self) -> &'static str {
        match self {
            GroupName::Compute => "compute",
            GroupName::Remove => "remove",
        }
    }

    /// The deletion strategy this group measures
    pub fn delete_operation(self) -> Operation {
        match self {
            GroupName::Compute => Operation::DeleteViaConditionalUpdate,
            GroupName::Remove => Operation::DeleteViaDirectRemoval,
        }
    }
}

impl core::fmt::Display for GroupName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A group member: one operation and how many threads run it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    /// The operation every thread of this member runs
    pub operation: Operation,
    /// Number of threads running it
    pub threads: usize,
}

/// Operations that run concurrently against one shared state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkGroup {
    /// Group name
    pub name: GroupName,
    /// Members, in declaration order
    pub members: Vec<GroupMember>,
}

impl BenchmarkGroup {
    /// Build a group with explicit per-member thread counts
    ///
    /// `threads` lists counts for `insert` then the group's delete operation.
    pub fn with_threads(name: GroupName, threads: &[usize]) -> Result<Self> {
        let operations = [Operation::Insert, name.delete_operation()];
        if threads.len() != operations.len() {
            return Err(Error::InvalidConfig(format!(
                "group {} needs {} thread counts, got {}",
                name,
                operations.len(),
                threads.len()
            )));
        }
        if let Some(position) = threads.iter().position(|&count| count == 0) {
            return Err(Error::InvalidConfig(format!(
                "group {} member {} has zero threads",
                name, operations[position]
            )));
        }

        let members = operations
            .iter()
            .zip(threads)
            .map(|(&operation, &threads)| GroupMember { operation, threads })
            .collect();
        Ok(Self { name, members })
    }

    /// The declared group: 6 insert threads against 6 delete threads
    pub fn declared(name: GroupName) -> Self {
        Self {
            name,
            members: vec![
                GroupMember {
                    operation: Operation::Insert,
                    threads: DEFAULT_GROUP_THREADS,
                },
                GroupMember {
                    operation: name.delete_operation(),
                    threads: DEFAULT_GROUP_THREADS,
                },
            ],
        }
    }

    /// Total number of worker threads in the group
    pub fn total_threads(&self) -> usize {
        self.members.iter().map(|member| member.threads).sum()
    }
}
