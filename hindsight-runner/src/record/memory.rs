// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    CommittedRun, CurrentRun, InsertOutcome, PruneResult, RetentionPolicy, RunAssociation,
    RunHash, RunId, StoredResult, TestRepository, TestRun,
    state::{StoreState, now},
};
use crate::{errors::RepositoryError, result::TestResultRecord};
use std::sync::{Mutex, PoisonError};

/// A repository that keeps everything in memory.
///
/// Useful for tests and for one-off runs where history is not needed.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<StoreState>,
}

impl MemoryRepository {
    /// Creates a new, empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        // State methods don't panic partway through an update, so a poisoned lock is usable.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

impl TestRepository for MemoryRepository {
    fn get_or_create_current_run(&self, name: &str) -> Result<CurrentRun, RepositoryError> {
        Ok(self.with_state(|state| state.get_or_create_current_run(name, now())))
    }

    fn has_results(&self, run_id: RunId) -> Result<bool, RepositoryError> {
        Ok(self.with_state(|state| state.has_results(run_id)))
    }

    fn clear_run(&self, run_id: RunId) -> Result<(), RepositoryError> {
        self.with_state(|state| state.clear_run(run_id))?;
        Ok(())
    }

    fn clear_uncommitted(&self, name: &str) -> Result<(), RepositoryError> {
        self.with_state(|state| state.clear_uncommitted(name));
        Ok(())
    }

    fn insert_result(
        &self,
        result: &TestResultRecord,
        name: &str,
    ) -> Result<InsertOutcome, RepositoryError> {
        Ok(self.with_state(|state| state.insert_result(result, name, now())))
    }

    fn insert_results(
        &self,
        results: &[TestResultRecord],
        name: &str,
    ) -> Result<Vec<InsertOutcome>, RepositoryError> {
        Ok(self.with_state(|state| state.insert_results(results, name, now())))
    }

    fn results(&self, run_id: RunId) -> Result<Vec<TestResultRecord>, RepositoryError> {
        self.with_state(|state| state.results(run_id))
    }

    fn previous_run(&self, name: &str) -> Result<Option<CommittedRun>, RepositoryError> {
        Ok(self.with_state(|state| state.previous_run(name)))
    }

    fn commit_current_run(
        &self,
        name: &str,
        hash: RunHash,
    ) -> Result<CommittedRun, RepositoryError> {
        self.with_state(|state| state.commit_current_run(name, hash, now()))
    }

    fn clear_stale(
        &self,
        name: &str,
        policy: &RetentionPolicy,
    ) -> Result<PruneResult, RepositoryError> {
        Ok(self.with_state(|state| state.clear_stale(name, policy)))
    }

    fn all_runs(&self) -> Result<Vec<TestRun>, RepositoryError> {
        Ok(self.with_state(|state| state.all_runs()))
    }

    fn all_results(&self) -> Result<Vec<StoredResult>, RepositoryError> {
        Ok(self.with_state(|state| state.all_results()))
    }

    fn all_associations(&self) -> Result<Vec<RunAssociation>, RepositoryError> {
        Ok(self.with_state(|state| state.all_associations()))
    }
}
