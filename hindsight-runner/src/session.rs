// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running suites against a repository.
//!
//! [`Harness`] ties the pieces together: it executes a suite (or replays its cached results),
//! persists results to the current run, collects them, and diffs them against the most recent
//! committed run.

use crate::{
    collect::{RunCollector, TestRunResults},
    config::HarnessConfig,
    diff::diff,
    errors::{CaseFailure, HarnessError, RepositoryError},
    record::{
        CommittedRun, FileRepository, InsertOutcome, PruneResult, RetentionPolicy, RunHash,
        TestRepository, TestRun,
    },
    runner::{RunnerOptions, run_all},
    suite::{Program, TestSuite},
    time::stopwatch,
};
use futures::prelude::*;
use hindsight_metadata::Diff;
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, pin::pin};
use tracing::{debug, info, warn};

/// How [`Harness::run`] obtains results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Clear the current run and execute every case.
    #[default]
    Fresh,

    /// Replay the current run's results if it has any, otherwise execute like
    /// [`Fresh`](Self::Fresh).
    Cached,
}

/// Where the results in a [`RunReport`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunSource {
    /// The program was called for every case.
    Executed,

    /// Results were replayed from the repository.
    Replayed,
}

/// The outcome of [`Harness::run`].
#[derive(Debug)]
pub struct RunReport<I, O, T, E> {
    /// The results of the current run.
    pub current: TestRunResults<I, O, T>,

    /// The most recent committed run, if there is one.
    pub previous: Option<TestRunResults<I, O, T>>,

    /// The delta of `current` against `previous`.
    pub diff: Diff,

    /// Cases that produced no result. These are not persisted and not counted in the stats.
    pub failures: Vec<CaseFailure<E>>,

    /// Where the current results came from.
    pub source: RunSource,
}

/// The outcome of [`Harness::commit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The run that was committed.
    pub run: CommittedRun,

    /// Runs and results removed by retention afterwards.
    pub pruned: PruneResult,
}

/// Runs suites and manages their history in a repository.
#[derive(Debug)]
pub struct Harness<R> {
    repository: R,
    options: RunnerOptions,
    retention: RetentionPolicy,
}

impl Harness<FileRepository> {
    /// Creates a harness over the on-disk store described by `config`.
    pub fn from_config(config: &HarnessConfig) -> Result<Self, RepositoryError> {
        let repository = FileRepository::open(config.store_dir())?;
        Ok(Self::new(repository)
            .with_runner_options(config.runner_options())
            .with_retention(config.retention_policy()))
    }
}

impl<R: TestRepository> Harness<R> {
    /// Creates a harness over `repository` with default options.
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            options: RunnerOptions::default(),
            retention: RetentionPolicy::default(),
        }
    }

    /// Sets the execution engine options.
    pub fn with_runner_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the retention policy applied after each commit.
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Returns the repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Runs `suite` and compares it against the most recent committed run.
    pub async fn run<I, T, P>(
        &self,
        suite: &TestSuite<I, T, P>,
        mode: RunMode,
    ) -> Result<RunReport<I, P::Output, T, P::Error>, HarnessError>
    where
        I: Clone + Serialize + DeserializeOwned,
        T: Clone + Serialize + DeserializeOwned,
        P: Program<I>,
        P::Output: Serialize + DeserializeOwned,
        P::Error: fmt::Display,
    {
        let name = suite.name();
        let current_run = self.repository.get_or_create_current_run(name)?;
        debug!(suite = name, run_id = %current_run.id, ?mode, "resolved current run");

        let (current, failures, source) =
            if mode == RunMode::Cached && self.repository.has_results(current_run.id)? {
                debug!(suite = name, run_id = %current_run.id, "replaying cached results");
                let current = self.load(current_run.into())?;
                (current, Vec::new(), RunSource::Replayed)
            } else {
                debug!(suite = name, run_id = %current_run.id, "executing suite");
                self.repository.clear_run(current_run.id)?;
                let (current, failures) = self.execute(suite, current_run.into()).await?;
                (current, failures, RunSource::Executed)
            };

        let previous = self.previous(name)?;
        let diff = diff(&current, previous.as_ref());

        Ok(RunReport {
            current,
            previous,
            diff,
            failures,
            source,
        })
    }

    /// Runs `suite` on a current-thread Tokio runtime, blocking until it is done.
    pub fn run_blocking<I, T, P>(
        &self,
        suite: &TestSuite<I, T, P>,
        mode: RunMode,
    ) -> Result<RunReport<I, P::Output, T, P::Error>, HarnessError>
    where
        I: Clone + Serialize + DeserializeOwned,
        T: Clone + Serialize + DeserializeOwned,
        P: Program<I>,
        P::Output: Serialize + DeserializeOwned,
        P::Error: fmt::Display,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(HarnessError::RuntimeCreate)?;
        runtime.block_on(self.run(suite, mode))
    }

    /// Loads the most recent committed run for `name`, if there is one.
    pub fn previous<I, O, T>(
        &self,
        name: &str,
    ) -> Result<Option<TestRunResults<I, O, T>>, HarnessError>
    where
        I: DeserializeOwned,
        O: DeserializeOwned,
        T: DeserializeOwned,
    {
        match self.repository.previous_run(name)? {
            Some(run) => Ok(Some(self.load(run.into())?)),
            None => Ok(None),
        }
    }

    /// Commits the current run for `name` under a fresh hash, then prunes old runs according to
    /// the retention policy.
    pub fn commit(&self, name: &str) -> Result<CommitOutcome, HarnessError> {
        let run = self
            .repository
            .commit_current_run(name, RunHash::random())?;
        let pruned = self.repository.clear_stale(name, &self.retention)?;

        info!(
            suite = name,
            run_id = %run.id,
            hash = %run.hash,
            deleted_runs = pruned.deleted_runs.len(),
            deleted_results = pruned.deleted_results,
            "committed run",
        );
        Ok(CommitOutcome { run, pruned })
    }

    fn load<I, O, T>(&self, run: TestRun) -> Result<TestRunResults<I, O, T>, HarnessError>
    where
        I: DeserializeOwned,
        O: DeserializeOwned,
        T: DeserializeOwned,
    {
        let records = self.repository.results(run.id())?;
        let mut collector = RunCollector::new(run);
        for record in records {
            collector.push(record.decode()?);
        }
        Ok(collector.finish())
    }

    async fn execute<I, T, P>(
        &self,
        suite: &TestSuite<I, T, P>,
        run: TestRun,
    ) -> Result<
        (
            TestRunResults<I, P::Output, T>,
            Vec<CaseFailure<P::Error>>,
        ),
        HarnessError,
    >
    where
        I: Clone + Serialize,
        T: Clone + Serialize,
        P: Program<I>,
        P::Output: Serialize,
        P::Error: fmt::Display,
    {
        let name = suite.name();
        let stopwatch = stopwatch();
        let mut collector = RunCollector::new(run);
        let mut records = Vec::new();
        let mut failures = Vec::new();

        // Program calls are timed while the stream is polled, so nothing on this path may block.
        // Results are persisted in one batch once every call has finished.
        let mut outcomes = pin!(run_all(suite, &self.options));
        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Ok(result) => {
                    let record = result.to_record().map_err(|error| HarnessError::Encode {
                        ordering: result.ordering,
                        error,
                    })?;
                    records.push(record);
                    collector.push(result);
                }
                Err(failure) => {
                    let hash = failure
                        .hash_test_case
                        .as_ref()
                        .map_or("(unknown)", |hash| hash.as_str());
                    warn!(suite = name, hash, "{failure}: {}", failure.kind);
                    failures.push(failure);
                }
            }
        }

        let inserted = self.repository.insert_results(&records, name)?;
        for (record, outcome) in records.iter().zip(inserted) {
            if outcome == InsertOutcome::AlreadyPresent {
                warn!(
                    suite = name,
                    id = %record.id,
                    "result already present in current run, skipping",
                );
            }
        }

        let current = collector.finish();
        let snapshot = stopwatch.snapshot();
        info!(
            suite = name,
            started = %snapshot.start_time,
            finished = %snapshot.end_time(),
            results = current.len(),
            failures = failures.len(),
            "ran suite in {:.3?}",
            snapshot.duration,
        );
        Ok((current, failures))
    }
}
