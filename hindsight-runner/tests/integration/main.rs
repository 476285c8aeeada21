// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end runs against an on-disk store.

use camino_tempfile::Utf8TempDir;
use hindsight_metadata::{Diff, Label};
use hindsight_runner::{
    config::HarnessConfig,
    filter::ResultFilter,
    record::{FileRepository, TestRepository},
    session::{Harness, RunMode, RunSource},
    suite::{TestCase, TestSuite, infallible},
};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn add_cases() -> Vec<TestCase<i64, i64>> {
    vec![
        TestCase::new(1, 2).with_tags(["small"]),
        TestCase::new(2, 3).with_tags(["small"]),
        TestCase::new(3, 4).with_tags(["large"]),
    ]
}

fn harness(dir: &Utf8TempDir) -> Harness<FileRepository> {
    std::fs::create_dir_all(dir.path().join(".config")).unwrap();
    std::fs::write(
        dir.path().join(HarnessConfig::CONFIG_PATH),
        indoc! {r#"
            [store]
            dir = "history"

            [run]
            concurrency = 2
        "#},
    )
    .unwrap();

    let config = HarnessConfig::from_sources(dir.path(), None).unwrap();
    Harness::from_config(&config).unwrap()
}

#[test]
fn add_regression() {
    let dir = Utf8TempDir::new().unwrap();
    let harness = harness(&dir);
    assert_eq!(harness.repository().dir(), dir.path().join("history"));

    let plus_one = TestSuite::new("add", add_cases(), infallible(|n: i64| async move { n + 1 }));
    let first = harness.run_blocking(&plus_one, RunMode::Fresh).unwrap();
    assert!(first.previous.is_none());
    assert!(
        first
            .current
            .iter()
            .all(|result| result.label == Label::TruePositive)
    );
    assert_eq!(first.current.stats.true_positive, 3);
    assert_eq!(first.current.stats.true_negative, 0);
    assert_eq!(first.current.stats.false_positive, 0);
    assert_eq!(first.current.stats.false_negative, 0);
    assert_eq!(first.current.stats.precision, 1.0);
    assert_eq!(first.current.stats.recall, 1.0);
    harness.commit("add").unwrap();

    // A second harness over the same directory sees the committed history.
    let harness = Harness::from_config(&HarnessConfig::from_sources(dir.path(), None).unwrap())
        .unwrap();
    let plus_two = TestSuite::new("add", add_cases(), infallible(|n: i64| async move { n + 2 }));
    let second = harness.run_blocking(&plus_two, RunMode::Fresh).unwrap();
    assert!(
        second
            .current
            .iter()
            .all(|result| result.label == Label::FalsePositive)
    );
    assert_eq!(second.current.stats.precision, 0.0);
    assert_eq!(second.current.stats.recall, 0.0);
    assert_eq!(
        second.diff,
        Diff {
            true_positive: -3,
            true_negative: 0,
            false_positive: 3,
            false_negative: 0,
            precision: -1.0,
            recall: -1.0,
        }
    );

    // Case identities survive the change of program; outcome identities do not.
    let previous = second.previous.as_ref().unwrap();
    let first_hashes: Vec<_> = previous.test_case_hashes().collect();
    let second_hashes: Vec<_> = second.current.test_case_hashes().collect();
    assert_eq!(first_hashes, second_hashes);
    assert_eq!(second.current.changed_since(previous).len(), 3);

    let large = second
        .current
        .filtered(&ResultFilter::new().with_any_tags(["large"]));
    let inputs: Vec<_> = large.iter().map(|result| result.input).collect();
    assert_eq!(inputs, vec![3]);
}

#[test]
fn cached_run_replays_from_disk() {
    let dir = Utf8TempDir::new().unwrap();
    let harness = harness(&dir);
    let suite = TestSuite::new("add", add_cases(), infallible(|n: i64| async move { n + 1 }));
    let executed = harness.run_blocking(&suite, RunMode::Cached).unwrap();
    assert_eq!(executed.source, RunSource::Executed);

    // A program that would fail every case: replay must not call it.
    let broken = TestSuite::new("add", add_cases(), infallible(|_: i64| async move { 0 }));
    let replayed = harness.run_blocking(&broken, RunMode::Cached).unwrap();
    assert_eq!(replayed.source, RunSource::Replayed);
    assert_eq!(replayed.current.stats.true_positive, 3);

    let orderings: Vec<_> = replayed.current.iter().map(|result| result.ordering).collect();
    assert_eq!(orderings, vec![0, 1, 2]);
    let tags: Vec<_> = replayed
        .current
        .iter()
        .map(|result| result.tags.clone())
        .collect();
    assert_eq!(
        tags,
        vec![
            vec!["small".to_owned()],
            vec!["small".to_owned()],
            vec!["large".to_owned()]
        ]
    );
}

#[test]
fn retention_prunes_old_history() {
    let dir = Utf8TempDir::new().unwrap();
    let harness = harness(&dir);

    for delta in 1..=3 {
        let suite = TestSuite::new(
            "add",
            add_cases(),
            infallible(move |n: i64| async move { n + delta }),
        );
        harness.run_blocking(&suite, RunMode::Fresh).unwrap();
        harness.commit("add").unwrap();
    }

    let runs = harness.repository().all_runs().unwrap();
    let committed: Vec<_> = runs.iter().filter(|run| run.is_committed()).collect();
    assert_eq!(committed.len(), 1, "default retention keeps one committed run");
    assert_eq!(
        harness.repository().last_run_hash("add").unwrap().as_ref(),
        committed[0].hash()
    );

    // Only the kept run's results remain.
    assert_eq!(harness.repository().all_results().unwrap().len(), 3);
}
