// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test run identities.
//!
//! A suite name has at most one *current* run, which accumulates results, and any number of
//! *committed* runs, each frozen under a [`RunHash`]. The two states are separate types so that
//! a committed run can never be mistaken for the one being written to.

use serde::{Deserialize, Serialize};
use newtype_uuid::{TypedUuid, TypedUuidKind, TypedUuidTag};
use std::fmt;

/// The repository-assigned identifier of a run. Larger ids are newer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RunId(u64);

impl RunId {
    /// Creates a new `RunId`.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The hash a run is frozen under when it is committed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RunHash(String);

impl RunHash {
    /// Creates a run hash from an existing string.
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Creates a fresh, random run hash.
    pub fn random() -> Self {
        Self(TypedUuid::<RunHashKind>::new_v4().to_string())
    }

    /// Returns the hash as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The kind tag for the UUIDs behind [`RunHash::random`].
enum RunHashKind {}

impl TypedUuidKind for RunHashKind {
    #[inline]
    fn tag() -> TypedUuidTag {
        const TAG: TypedUuidTag = TypedUuidTag::new("run");
        TAG
    }
}

impl fmt::Display for RunHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The run that is currently accumulating results for a suite.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CurrentRun {
    /// The run id.
    pub id: RunId,

    /// The suite name.
    pub name: String,
}

/// A run that has been committed and is now immutable.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommittedRun {
    /// The run id.
    pub id: RunId,

    /// The suite name.
    pub name: String,

    /// The hash the run was committed under.
    pub hash: RunHash,
}

/// A test run, either current or committed.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum TestRun {
    /// The run currently accumulating results.
    Current(CurrentRun),

    /// A frozen historical run.
    Committed(CommittedRun),
}

impl TestRun {
    /// Returns the run id.
    pub fn id(&self) -> RunId {
        match self {
            Self::Current(run) => run.id,
            Self::Committed(run) => run.id,
        }
    }

    /// Returns the suite name.
    pub fn name(&self) -> &str {
        match self {
            Self::Current(run) => &run.name,
            Self::Committed(run) => &run.name,
        }
    }

    /// Returns the commit hash, or `None` for the current run.
    pub fn hash(&self) -> Option<&RunHash> {
        match self {
            Self::Current(_) => None,
            Self::Committed(run) => Some(&run.hash),
        }
    }

    /// Returns true if this run has been committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

impl From<CurrentRun> for TestRun {
    fn from(run: CurrentRun) -> Self {
        Self::Current(run)
    }
}

impl From<CommittedRun> for TestRun {
    fn from(run: CommittedRun) -> Self {
        Self::Committed(run)
    }
}
