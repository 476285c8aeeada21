// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    CommittedRun, CurrentRun, PruneResult, RetentionPolicy, RunAssociation, RunHash, RunId,
    StoredResult, TestRun,
};
use crate::{errors::RepositoryError, result::TestResultRecord};

/// Whether [`TestRepository::insert_result`] added a new association.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The result was associated with the current run.
    Inserted,

    /// The current run already had a result with the same id. Nothing was changed.
    AlreadyPresent,
}

/// The persistence boundary for test runs and their results.
///
/// Every method is a single atomic unit of work. Implementations must be safe to share between
/// the concurrently running cases of a suite.
pub trait TestRepository {
    /// Returns the current run for `name`, creating one if there is none.
    ///
    /// Repeated calls without an intervening commit return the same run.
    fn get_or_create_current_run(&self, name: &str) -> Result<CurrentRun, RepositoryError>;

    /// Returns true if the run has at least one result.
    fn has_results(&self, run_id: RunId) -> Result<bool, RepositoryError>;

    /// Removes all results from a run. Result rows referenced by other runs are kept.
    fn clear_run(&self, run_id: RunId) -> Result<(), RepositoryError>;

    /// Removes all results from the current run for `name`, if there is one.
    fn clear_uncommitted(&self, name: &str) -> Result<(), RepositoryError>;

    /// Associates a result with the current run for `name`, creating the run if needed.
    ///
    /// Re-inserting a result whose id is already associated with the current run changes nothing
    /// and returns [`InsertOutcome::AlreadyPresent`].
    fn insert_result(
        &self,
        result: &TestResultRecord,
        name: &str,
    ) -> Result<InsertOutcome, RepositoryError>;

    /// Associates every result in `results` with the current run for `name`, as a single unit
    /// of work.
    ///
    /// Returns one outcome per result, in the same order. Within a batch, a result whose id
    /// appeared earlier in the batch is [`InsertOutcome::AlreadyPresent`].
    fn insert_results(
        &self,
        results: &[TestResultRecord],
        name: &str,
    ) -> Result<Vec<InsertOutcome>, RepositoryError> {
        results
            .iter()
            .map(|result| self.insert_result(result, name))
            .collect()
    }

    /// Returns the results of a run, sorted by ordering.
    fn results(&self, run_id: RunId) -> Result<Vec<TestResultRecord>, RepositoryError>;

    /// Returns the most recent committed run for `name`.
    fn previous_run(&self, name: &str) -> Result<Option<CommittedRun>, RepositoryError>;

    /// Returns the hash of the most recent committed run for `name`.
    fn last_run_hash(&self, name: &str) -> Result<Option<RunHash>, RepositoryError> {
        Ok(self.previous_run(name)?.map(|run| run.hash))
    }

    /// Atomically freezes the current run for `name` under `hash` and opens a fresh current run.
    ///
    /// Returns [`RepositoryError::NoCurrentRun`] if `name` has no current run.
    fn commit_current_run(
        &self,
        name: &str,
        hash: RunHash,
    ) -> Result<CommittedRun, RepositoryError>;

    /// Deletes the committed runs for `name` that `policy` does not keep, along with result rows
    /// that are no longer referenced by any run.
    fn clear_stale(
        &self,
        name: &str,
        policy: &RetentionPolicy,
    ) -> Result<PruneResult, RepositoryError>;

    /// Returns every run, current and committed, in creation order.
    fn all_runs(&self) -> Result<Vec<TestRun>, RepositoryError>;

    /// Returns every stored result row.
    fn all_results(&self) -> Result<Vec<StoredResult>, RepositoryError>;

    /// Returns every association between a run and a result.
    fn all_associations(&self) -> Result<Vec<RunAssociation>, RepositoryError>;
}

impl<R: TestRepository + ?Sized> TestRepository for &R {
    fn get_or_create_current_run(&self, name: &str) -> Result<CurrentRun, RepositoryError> {
        (**self).get_or_create_current_run(name)
    }

    fn has_results(&self, run_id: RunId) -> Result<bool, RepositoryError> {
        (**self).has_results(run_id)
    }

    fn clear_run(&self, run_id: RunId) -> Result<(), RepositoryError> {
        (**self).clear_run(run_id)
    }

    fn clear_uncommitted(&self, name: &str) -> Result<(), RepositoryError> {
        (**self).clear_uncommitted(name)
    }

    fn insert_result(
        &self,
        result: &TestResultRecord,
        name: &str,
    ) -> Result<InsertOutcome, RepositoryError> {
        (**self).insert_result(result, name)
    }

    fn insert_results(
        &self,
        results: &[TestResultRecord],
        name: &str,
    ) -> Result<Vec<InsertOutcome>, RepositoryError> {
        (**self).insert_results(results, name)
    }

    fn results(&self, run_id: RunId) -> Result<Vec<TestResultRecord>, RepositoryError> {
        (**self).results(run_id)
    }

    fn previous_run(&self, name: &str) -> Result<Option<CommittedRun>, RepositoryError> {
        (**self).previous_run(name)
    }

    fn last_run_hash(&self, name: &str) -> Result<Option<RunHash>, RepositoryError> {
        (**self).last_run_hash(name)
    }

    fn commit_current_run(
        &self,
        name: &str,
        hash: RunHash,
    ) -> Result<CommittedRun, RepositoryError> {
        (**self).commit_current_run(name, hash)
    }

    fn clear_stale(
        &self,
        name: &str,
        policy: &RetentionPolicy,
    ) -> Result<PruneResult, RepositoryError> {
        (**self).clear_stale(name, policy)
    }

    fn all_runs(&self) -> Result<Vec<TestRun>, RepositoryError> {
        (**self).all_runs()
    }

    fn all_results(&self) -> Result<Vec<StoredResult>, RepositoryError> {
        (**self).all_results()
    }

    fn all_associations(&self) -> Result<Vec<RunAssociation>, RepositoryError> {
        (**self).all_associations()
    }
}
