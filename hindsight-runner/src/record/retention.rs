// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retention policies and pruning for committed runs.

use super::{RunId, state::RunRow};
use crate::config::RetentionConfig;
use serde::Serialize;

/// How many committed runs to keep for each suite.
///
/// Only committed runs are subject to retention. The current run is never pruned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// The number of most recent committed runs to keep.
    pub keep: usize,
}

impl RetentionPolicy {
    /// Creates a policy that keeps the `keep` most recent committed runs.
    pub fn new(keep: usize) -> Self {
        Self { keep }
    }

    /// Computes which of the given committed runs should be deleted.
    ///
    /// Runs are ranked newest first by run id, which increases with every run a repository
    /// creates. The first `keep` are kept and the rest are returned, newest first.
    pub(crate) fn compute_runs_to_delete(&self, runs: &[&RunRow]) -> Vec<RunId> {
        let mut run_ids: Vec<_> = runs.iter().map(|run| run.id).collect();
        run_ids.sort_by(|a, b| b.cmp(a));
        run_ids.into_iter().skip(self.keep).collect()
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { keep: 1 }
    }
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        Self { keep: config.keep }
    }
}

/// The result of a pruning operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PruneResult {
    /// The runs that were deleted, newest first.
    pub deleted_runs: Vec<RunId>,

    /// Number of result rows that were no longer referenced by any run and were deleted.
    pub deleted_results: usize,
}

impl PruneResult {
    /// Returns true if nothing was deleted.
    pub fn is_empty(&self) -> bool {
        self.deleted_runs.is_empty() && self.deleted_results == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RunHash;
    use chrono::{DateTime, FixedOffset};
    use test_case::test_case;

    fn committed(id: u64, created_at: &str) -> RunRow {
        RunRow {
            id: RunId::new(id),
            name: "suite".to_owned(),
            hash: Some(RunHash::new(format!("hash-{id}"))),
            created_at: DateTime::<FixedOffset>::parse_from_rfc3339(created_at).unwrap(),
        }
    }

    #[test_case(0, &[3, 2, 1] ; "keep none")]
    #[test_case(1, &[2, 1] ; "keep one")]
    #[test_case(3, &[] ; "keep all")]
    #[test_case(10, &[] ; "keep more than exist")]
    fn newest_are_kept(keep: usize, expected: &[u64]) {
        let runs = [
            committed(1, "2024-01-01T00:00:00Z"),
            committed(3, "2024-01-03T00:00:00Z"),
            committed(2, "2024-01-02T00:00:00Z"),
        ];
        let refs: Vec<_> = runs.iter().collect();

        let to_delete = RetentionPolicy::new(keep).compute_runs_to_delete(&refs);
        let expected: Vec<_> = expected.iter().copied().map(RunId::new).collect();
        assert_eq!(to_delete, expected);
    }

    #[test]
    fn ranks_by_id_not_timestamp() {
        // Clocks can go backwards; the run id cannot.
        let runs = [
            committed(1, "2024-01-02T00:00:00Z"),
            committed(2, "2024-01-01T00:00:00Z"),
        ];
        let refs: Vec<_> = runs.iter().collect();
        assert_eq!(
            RetentionPolicy::default().compute_runs_to_delete(&refs),
            vec![RunId::new(1)]
        );
    }
}
