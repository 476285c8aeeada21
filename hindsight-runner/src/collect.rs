// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folding a stream of results into an aggregate for a run.
//!
//! Results can come from the execution engine or be replayed from a repository. Either way, the
//! collector keeps them in the order it receives them and counts each test case once.

use crate::{
    errors::DuplicateTestCase, filter::ResultFilter, identity::CaseHash, record::TestRun,
    result::TestResult,
};
use futures::prelude::*;
use hindsight_metadata::Stats;
use indexmap::IndexMap;
use tracing::warn;

/// The collected results of a single run, keyed by case hash.
#[derive(Clone, Debug, PartialEq)]
pub struct TestRunResults<I, O, T> {
    /// The run these results belong to.
    pub run: TestRun,

    /// Results in the order they were received, keyed by case hash.
    pub results: IndexMap<CaseHash, TestResult<I, O, T>>,

    /// Finalized statistics over `results`.
    pub stats: Stats,

    /// Results that were skipped because their case had already been seen.
    pub duplicates: Vec<DuplicateTestCase>,
}

impl<I, O, T> TestRunResults<I, O, T> {
    /// Returns the case hashes in the order their results were received.
    pub fn test_case_hashes(&self) -> impl ExactSizeIterator<Item = &CaseHash> {
        self.results.keys()
    }

    /// Returns the result for a case, if there is one.
    pub fn get(&self, hash: &CaseHash) -> Option<&TestResult<I, O, T>> {
        self.results.get(hash)
    }

    /// Iterates over results in the order they were received.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TestResult<I, O, T>> {
        self.results.values()
    }

    /// Returns the number of results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if there are no results.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<I: Clone, O: Clone, T: Clone> TestRunResults<I, O, T> {
    /// Returns a copy with only the results that match `filter`, in the same order.
    ///
    /// The stats are those of the whole run, not of the filtered subset.
    pub fn filtered(&self, filter: &ResultFilter) -> Self {
        self.retain_clone(|result| filter.matches(result))
    }

    /// Returns a copy with only the results that are new or different compared to `previous`.
    ///
    /// A result is kept if its case does not appear in `previous`, or if it does but the outcome
    /// identity changed. The stats are those of the whole run.
    pub fn changed_since<PI, PO, PT>(&self, previous: &TestRunResults<PI, PO, PT>) -> Self {
        self.retain_clone(|result| {
            previous
                .get(&result.hash_test_case)
                .is_none_or(|prev| prev.id != result.id)
        })
    }

    fn retain_clone(&self, mut keep: impl FnMut(&TestResult<I, O, T>) -> bool) -> Self {
        Self {
            run: self.run.clone(),
            results: self
                .results
                .iter()
                .filter(|(_, result)| keep(result))
                .map(|(hash, result)| (hash.clone(), result.clone()))
                .collect(),
            stats: self.stats.clone(),
            duplicates: self.duplicates.clone(),
        }
    }
}

/// Accumulates results for a single run.
///
/// Confined to one fold: feed it with [`push`](Self::push) or [`Extend`], then call
/// [`finish`](Self::finish).
#[derive(Debug)]
pub struct RunCollector<I, O, T> {
    run: TestRun,
    results: IndexMap<CaseHash, TestResult<I, O, T>>,
    stats: Stats,
    times_millis: Vec<f64>,
    duplicates: Vec<DuplicateTestCase>,
}

impl<I, O, T> RunCollector<I, O, T> {
    /// Creates an empty collector for `run`.
    pub fn new(run: impl Into<TestRun>) -> Self {
        Self {
            run: run.into(),
            results: IndexMap::new(),
            stats: Stats::default(),
            times_millis: Vec::new(),
            duplicates: Vec::new(),
        }
    }

    /// Adds a result. Returns false if the result's case had already been seen, in which case
    /// the result is skipped and a duplicate is recorded.
    pub fn push(&mut self, result: TestResult<I, O, T>) -> bool {
        if let Some(first) = self.results.get(&result.hash_test_case) {
            let duplicate = DuplicateTestCase {
                hash: result.hash_test_case.clone(),
                first_ordering: first.ordering,
                ordering: result.ordering,
            };
            warn!(run = %self.run.name(), "{duplicate}");
            self.duplicates.push(duplicate);
            return false;
        }

        self.stats.on_label(result.label);
        self.times_millis.push(result.time_millis);
        self.results.insert(result.hash_test_case.clone(), result);
        true
    }

    /// Finalizes statistics and returns the collected results.
    pub fn finish(self) -> TestRunResults<I, O, T> {
        let mut stats = self.stats;
        stats.finalize(&self.times_millis);
        TestRunResults {
            run: self.run,
            results: self.results,
            stats,
            duplicates: self.duplicates,
        }
    }
}

impl<I, O, T> Extend<TestResult<I, O, T>> for RunCollector<I, O, T> {
    fn extend<It: IntoIterator<Item = TestResult<I, O, T>>>(&mut self, iter: It) {
        for result in iter {
            self.push(result);
        }
    }
}

/// Collects a stream of results for `run`.
pub async fn collect<I, O, T>(
    run: impl Into<TestRun>,
    results: impl Stream<Item = TestResult<I, O, T>>,
) -> TestRunResults<I, O, T> {
    results
        .fold(RunCollector::new(run), |mut collector, result| async move {
            collector.push(result);
            collector
        })
        .await
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CurrentRun, RunId};
    use hindsight_metadata::Label;
    use pretty_assertions::assert_eq;

    fn current_run() -> CurrentRun {
        CurrentRun {
            id: RunId::new(1),
            name: "collect".to_owned(),
        }
    }

    fn result(ordering: usize, input: i32, output: i32, expected: i32) -> TestResult<i32, i32, i32> {
        let label = if output == expected {
            Label::TruePositive
        } else {
            Label::FalsePositive
        };
        TestResult::from_outcome(
            ordering,
            label,
            input,
            output,
            expected,
            vec![],
            ordering as f64 + 1.0,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn collects_in_received_order() {
        let results = vec![result(2, 3, 4, 4), result(0, 1, 2, 2), result(1, 2, 9, 3)];
        let collected = collect(current_run(), stream::iter(results.clone())).await;

        let orderings: Vec<_> = collected.iter().map(|result| result.ordering).collect();
        assert_eq!(orderings, vec![2, 0, 1]);
        let hashes: Vec<_> = collected.test_case_hashes().cloned().collect();
        let expected_hashes: Vec<_> = results.iter().map(|r| r.hash_test_case.clone()).collect();
        assert_eq!(hashes, expected_hashes);

        assert_eq!(collected.stats.true_positive, 2);
        assert_eq!(collected.stats.false_positive, 1);
        assert_eq!(collected.stats.total, 3);
        assert_eq!(collected.stats.precision, 2.0 / 3.0);
        assert_eq!(collected.stats.recall, 1.0);
        assert_eq!(collected.stats.time_min, Some(1.0));
        assert_eq!(collected.stats.time_max, Some(3.0));
        assert_eq!(collected.stats.time_median, Some(2.0));
        assert!(collected.duplicates.is_empty());
    }

    #[test]
    fn duplicate_cases_are_skipped() {
        let mut collector = RunCollector::new(current_run());
        assert!(collector.push(result(0, 1, 2, 2)));
        // Same input and expected value, different output: same case.
        assert!(!collector.push(result(1, 1, 5, 2)));
        let collected = collector.finish();

        assert_eq!(collected.len(), 1);
        assert_eq!(collected.test_case_hashes().len(), 1);
        assert_eq!(collected.stats.total, 1);
        assert_eq!(collected.stats.true_positive, 1);
        assert_eq!(
            collected.duplicates,
            vec![DuplicateTestCase {
                hash: CaseHash::new(&1, &2).unwrap(),
                first_ordering: 0,
                ordering: 1,
            }]
        );
    }

    #[test]
    fn empty_run_has_no_times() {
        let collected = RunCollector::<i32, i32, i32>::new(current_run()).finish();
        assert!(collected.is_empty());
        assert_eq!(collected.stats, Stats::default());
        assert_eq!(collected.stats.time_summary(), None);
    }

    #[test]
    fn collection_is_deterministic() {
        let results = vec![result(0, 1, 2, 2), result(1, 2, 4, 3), result(2, 1, 2, 2)];
        let collect_once = || {
            let mut collector = RunCollector::new(current_run());
            collector.extend(results.clone());
            collector.finish()
        };
        assert_eq!(collect_once(), collect_once());
    }

    #[test]
    fn filtered_keeps_order_and_stats() {
        let mut collector = RunCollector::new(current_run());
        collector.extend([result(0, 1, 2, 2), result(1, 2, 9, 3), result(2, 3, 4, 4)]);
        let collected = collector.finish();

        let filter = ResultFilter::new().with_labels([Label::TruePositive]);
        let filtered = collected.filtered(&filter);
        let orderings: Vec<_> = filtered.iter().map(|result| result.ordering).collect();
        assert_eq!(orderings, vec![0, 2]);
        assert_eq!(filtered.stats, collected.stats);
    }

    #[test]
    fn changed_since_keeps_new_and_changed() {
        let mut previous = RunCollector::new(current_run());
        previous.extend([result(0, 1, 2, 2), result(1, 2, 3, 3)]);
        let previous = previous.finish();

        let mut current = RunCollector::new(current_run());
        current.extend([
            // Unchanged.
            result(0, 1, 2, 2),
            // Same case, different outcome.
            result(1, 2, 4, 3),
            // New case.
            result(2, 3, 4, 4),
        ]);
        let current = current.finish();

        let changed = current.changed_since(&previous);
        let orderings: Vec<_> = changed.iter().map(|result| result.ordering).collect();
        assert_eq!(orderings, vec![1, 2]);
        assert!(current.changed_since(&current).is_empty());
    }
}
