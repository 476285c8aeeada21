// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository state shared by the in-memory and on-disk repositories.
//!
//! Result rows are content-addressed by [`ResultId`] and shared between runs: a run that
//! reproduces an earlier outcome references the existing row. Per-run placement (ordering, tags,
//! timing) lives on the association between a run and a result.

use super::{
    CommittedRun, CurrentRun, InsertOutcome, PruneResult, RetentionPolicy, RunHash, RunId, TestRun,
};
use crate::{
    errors::RepositoryError,
    identity::{CaseHash, ResultId},
    result::{TestResult, TestResultRecord},
};
use chrono::{DateTime, FixedOffset, Local};
use hindsight_metadata::Label;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, btree_map::Entry},
    fmt,
};
use tracing::debug;

macro_rules! define_format_version {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident;
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
        #[serde(transparent)]
        $vis struct $name(u32);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "`.")]
            pub const fn new(version: u32) -> Self {
                Self(version)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_format_version! {
    /// Version of the on-disk store format.
    ///
    /// Increment this when adding semantically important fields. Readers can read newer
    /// versions (assuming append-only evolution with serde defaults), but writers must refuse to
    /// write if the file version is higher than this.
    pub struct StoreFormatVersion;
}

/// The current store format version.
pub const STORE_FORMAT_VERSION: StoreFormatVersion = StoreFormatVersion::new(1);

/// A stored result row, shared by every run that produced the same outcome.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoredResult {
    /// The identity of the outcome.
    pub id: ResultId,

    /// The identity of the case.
    pub hash_test_case: CaseHash,

    /// The outcome label.
    pub label: Label,

    /// The input, as JSON.
    pub input: Value,

    /// The program output, as JSON.
    pub result: Value,

    /// The expected output, as JSON.
    pub expected: Value,
}

/// The placement of a result within a run.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunAssociation {
    /// The run.
    pub run_id: RunId,

    /// The result.
    pub result_id: ResultId,

    /// The position of the case in the run.
    pub ordering: usize,

    /// Tags carried over from the case.
    pub tags: Vec<String>,

    /// Wall-clock time of the program call, in milliseconds.
    pub time_millis: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct RunRow {
    pub(crate) id: RunId,
    pub(crate) name: String,
    pub(crate) hash: Option<RunHash>,
    pub(crate) created_at: DateTime<FixedOffset>,
}

impl RunRow {
    fn to_run(&self) -> TestRun {
        match &self.hash {
            None => TestRun::Current(CurrentRun {
                id: self.id,
                name: self.name.clone(),
            }),
            Some(hash) => TestRun::Committed(CommittedRun {
                id: self.id,
                name: self.name.clone(),
                hash: hash.clone(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
struct Placement {
    ordering: usize,
    tags: Vec<String>,
    time_millis: f64,
}

/// The full contents of a repository.
#[derive(Clone, Debug, Default)]
pub(crate) struct StoreState {
    last_run_id: u64,
    runs: BTreeMap<RunId, RunRow>,
    results: BTreeMap<ResultId, StoredResult>,
    associations: BTreeMap<RunId, BTreeMap<ResultId, Placement>>,
}

pub(crate) fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

impl StoreState {
    fn current_run_row(&self, name: &str) -> Option<&RunRow> {
        self.runs
            .values()
            .find(|run| run.name == name && run.hash.is_none())
    }

    fn create_run(&mut self, name: &str, now: DateTime<FixedOffset>) -> RunId {
        self.last_run_id += 1;
        let id = RunId::new(self.last_run_id);
        self.runs.insert(
            id,
            RunRow {
                id,
                name: name.to_owned(),
                hash: None,
                created_at: now,
            },
        );
        debug!(name, %id, "created current run");
        id
    }

    pub(crate) fn get_or_create_current_run(
        &mut self,
        name: &str,
        now: DateTime<FixedOffset>,
    ) -> CurrentRun {
        let id = match self.current_run_row(name) {
            Some(run) => run.id,
            None => self.create_run(name, now),
        };
        CurrentRun {
            id,
            name: name.to_owned(),
        }
    }

    pub(crate) fn has_results(&self, run_id: RunId) -> bool {
        self.associations
            .get(&run_id)
            .is_some_and(|results| !results.is_empty())
    }

    /// Removes all results from a run. Result rows still referenced by other runs are kept.
    pub(crate) fn clear_run(&mut self, run_id: RunId) -> Result<usize, RepositoryError> {
        if !self.runs.contains_key(&run_id) {
            return Err(RepositoryError::RunNotFound { run_id });
        }
        let removed = self
            .associations
            .remove(&run_id)
            .map_or(0, |results| results.len());
        self.collect_garbage();
        Ok(removed)
    }

    pub(crate) fn clear_uncommitted(&mut self, name: &str) -> usize {
        let Some(run_id) = self.current_run_row(name).map(|run| run.id) else {
            return 0;
        };
        let removed = self
            .associations
            .remove(&run_id)
            .map_or(0, |results| results.len());
        self.collect_garbage();
        removed
    }

    pub(crate) fn insert_result(
        &mut self,
        record: &TestResultRecord,
        name: &str,
        now: DateTime<FixedOffset>,
    ) -> InsertOutcome {
        let run_id = self.get_or_create_current_run(name, now).id;

        self.results
            .entry(record.id.clone())
            .or_insert_with(|| StoredResult {
                id: record.id.clone(),
                hash_test_case: record.hash_test_case.clone(),
                label: record.label,
                input: record.input.clone(),
                result: record.result.clone(),
                expected: record.expected.clone(),
            });

        match self
            .associations
            .entry(run_id)
            .or_default()
            .entry(record.id.clone())
        {
            Entry::Occupied(_) => InsertOutcome::AlreadyPresent,
            Entry::Vacant(entry) => {
                entry.insert(Placement {
                    ordering: record.ordering,
                    tags: record.tags.clone(),
                    time_millis: record.time_millis,
                });
                InsertOutcome::Inserted
            }
        }
    }

    pub(crate) fn insert_results(
        &mut self,
        records: &[TestResultRecord],
        name: &str,
        now: DateTime<FixedOffset>,
    ) -> Vec<InsertOutcome> {
        records
            .iter()
            .map(|record| self.insert_result(record, name, now))
            .collect()
    }

    /// Returns the results of a run, sorted by ordering.
    pub(crate) fn results(&self, run_id: RunId) -> Result<Vec<TestResultRecord>, RepositoryError> {
        if !self.runs.contains_key(&run_id) {
            return Err(RepositoryError::RunNotFound { run_id });
        }

        let mut records: Vec<_> = self
            .associations
            .get(&run_id)
            .into_iter()
            .flatten()
            .filter_map(|(result_id, placement)| {
                let row = self.results.get(result_id)?;
                Some(TestResult {
                    id: row.id.clone(),
                    hash_test_case: row.hash_test_case.clone(),
                    ordering: placement.ordering,
                    label: row.label,
                    input: row.input.clone(),
                    result: row.result.clone(),
                    expected: row.expected.clone(),
                    tags: placement.tags.clone(),
                    time_millis: placement.time_millis,
                })
            })
            .collect();
        records.sort_by(|a, b| (a.ordering, &a.id).cmp(&(b.ordering, &b.id)));
        Ok(records)
    }

    /// Returns the most recent committed run for `name`.
    pub(crate) fn previous_run(&self, name: &str) -> Option<CommittedRun> {
        self.runs
            .values()
            .rev()
            .find_map(|run| match (&run.hash, run.name == name) {
                (Some(hash), true) => Some(CommittedRun {
                    id: run.id,
                    name: run.name.clone(),
                    hash: hash.clone(),
                }),
                _ => None,
            })
    }

    /// Freezes the current run under `hash` and opens a fresh current run.
    pub(crate) fn commit_current_run(
        &mut self,
        name: &str,
        hash: RunHash,
        now: DateTime<FixedOffset>,
    ) -> Result<CommittedRun, RepositoryError> {
        let run_id = self
            .current_run_row(name)
            .map(|run| run.id)
            .ok_or_else(|| RepositoryError::NoCurrentRun {
                name: name.to_owned(),
            })?;
        let run = self
            .runs
            .get_mut(&run_id)
            .ok_or(RepositoryError::RunNotFound { run_id })?;
        run.hash = Some(hash.clone());

        let next = self.create_run(name, now);
        debug!(name, %run_id, %hash, %next, "committed run");

        Ok(CommittedRun {
            id: run_id,
            name: name.to_owned(),
            hash,
        })
    }

    /// Deletes committed runs for `name` beyond those `policy` keeps, then deletes result rows
    /// no run references any more.
    pub(crate) fn clear_stale(&mut self, name: &str, policy: &RetentionPolicy) -> PruneResult {
        let committed: Vec<_> = self
            .runs
            .values()
            .filter(|run| run.name == name && run.hash.is_some())
            .collect();
        let deleted_runs = policy.compute_runs_to_delete(&committed);

        for run_id in &deleted_runs {
            self.runs.remove(run_id);
            self.associations.remove(run_id);
        }
        let deleted_results = self.collect_garbage();

        debug!(
            name,
            deleted_runs = deleted_runs.len(),
            deleted_results,
            "cleared stale runs"
        );
        PruneResult {
            deleted_runs,
            deleted_results,
        }
    }

    /// Deletes result rows that no run references. Returns the number deleted.
    fn collect_garbage(&mut self) -> usize {
        let associations = &self.associations;
        let before = self.results.len();
        self.results.retain(|result_id, _| {
            associations
                .values()
                .any(|results| results.contains_key(result_id))
        });
        before - self.results.len()
    }

    pub(crate) fn all_runs(&self) -> Vec<TestRun> {
        self.runs.values().map(RunRow::to_run).collect()
    }

    pub(crate) fn all_results(&self) -> Vec<StoredResult> {
        self.results.values().cloned().collect()
    }

    pub(crate) fn all_associations(&self) -> Vec<RunAssociation> {
        self.associations
            .iter()
            .flat_map(|(run_id, results)| {
                results.iter().map(|(result_id, placement)| RunAssociation {
                    run_id: *run_id,
                    result_id: result_id.clone(),
                    ordering: placement.ordering,
                    tags: placement.tags.clone(),
                    time_millis: placement.time_millis,
                })
            })
            .collect()
    }
}

/// Whether a store file can be written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StoreWritePermission {
    /// Writing is allowed.
    Allowed,
    /// Writing is not allowed because the file has a newer format version.
    Denied {
        file_version: StoreFormatVersion,
        max_supported_version: StoreFormatVersion,
    },
}

/// The serialization format of the store file.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct StoreFile {
    format_version: StoreFormatVersion,
    last_run_id: u64,
    #[serde(default)]
    runs: Vec<RunRow>,
    #[serde(default)]
    results: Vec<StoredResult>,
    #[serde(default)]
    associations: Vec<RunAssociation>,
}

impl StoreFile {
    pub(crate) fn from_state(state: &StoreState) -> Self {
        Self {
            format_version: STORE_FORMAT_VERSION,
            last_run_id: state.last_run_id,
            runs: state.runs.values().cloned().collect(),
            results: state.all_results(),
            associations: state.all_associations(),
        }
    }

    pub(crate) fn into_state(self) -> StoreState {
        let mut associations: BTreeMap<RunId, BTreeMap<ResultId, Placement>> = BTreeMap::new();
        for association in self.associations {
            associations.entry(association.run_id).or_default().insert(
                association.result_id,
                Placement {
                    ordering: association.ordering,
                    tags: association.tags,
                    time_millis: association.time_millis,
                },
            );
        }

        StoreState {
            last_run_id: self.last_run_id,
            runs: self.runs.into_iter().map(|run| (run.id, run)).collect(),
            results: self
                .results
                .into_iter()
                .map(|result| (result.id.clone(), result))
                .collect(),
            associations,
        }
    }

    /// Returns whether this file can be written to.
    ///
    /// If the file has a newer format version than we support, writing is denied to avoid data
    /// loss.
    pub(crate) fn write_permission(&self) -> StoreWritePermission {
        if self.format_version > STORE_FORMAT_VERSION {
            StoreWritePermission::Denied {
                file_version: self.format_version,
                max_supported_version: STORE_FORMAT_VERSION,
            }
        } else {
            StoreWritePermission::Allowed
        }
    }
}
