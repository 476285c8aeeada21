// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Behavior every [`TestRepository`] implementation must share.

use super::{InsertOutcome, RetentionPolicy, RunAssociation, RunHash, RunId, TestRepository};
use crate::{
    classify::Classifier,
    result::{TestResult, TestResultRecord},
};
use serde_json::{Value, json};

/// Runs every contract check, each against a fresh repository from `make`.
///
/// `make` is passed the name of the check, which file-backed repositories can use to pick a
/// directory.
pub(crate) fn check_contract<R, F>(make: F)
where
    R: TestRepository + Sync,
    F: Fn(&str) -> R,
{
    check_current_run_is_idempotent(&make("current-run"));
    check_commit_atomicity(&make("commit"));
    check_replay_order(&make("replay"));
    check_duplicate_insert(&make("duplicate"));
    check_batch_insert(&make("batch"));
    check_clear_uncommitted(&make("clear-uncommitted"));
    check_clear_stale(&make("clear-stale"));
    check_concurrent_inserts(&make("concurrent"));
}

pub(crate) fn record(ordering: usize, input: Value, output: Value, expected: Value) -> TestResultRecord {
    let label = Classifier::<Value, Value>::structural().classify(&output, &expected);
    TestResult::from_outcome(ordering, label, input, output, expected, vec![], 1.0)
        .expect("JSON values always serialize")
}

fn check_current_run_is_idempotent(repo: &impl TestRepository) {
    let a = repo.get_or_create_current_run("idempotent").unwrap();
    let b = repo.get_or_create_current_run("idempotent").unwrap();
    assert_eq!(a, b);

    repo.commit_current_run("idempotent", RunHash::new("idempotent-1"))
        .unwrap();
    let c = repo.get_or_create_current_run("idempotent").unwrap();
    assert_ne!(a.id, c.id);
}

fn check_commit_atomicity(repo: &impl TestRepository) {
    let name = "commit";
    let current = repo.get_or_create_current_run(name).unwrap();
    repo.insert_result(&record(0, json!(1), json!(2), json!(2)), name)
        .unwrap();

    let committed = repo
        .commit_current_run(name, RunHash::new("commit-1"))
        .unwrap();
    assert_eq!(committed.id, current.id);
    assert_eq!(repo.previous_run(name).unwrap(), Some(committed.clone()));
    assert_eq!(
        repo.last_run_hash(name).unwrap(),
        Some(RunHash::new("commit-1"))
    );
    assert!(repo.has_results(committed.id).unwrap());

    let fresh = repo.get_or_create_current_run(name).unwrap();
    assert_ne!(fresh.id, committed.id);
    assert!(!repo.has_results(fresh.id).unwrap());

    // A suite that was never run has nothing to commit.
    assert!(repo.previous_run("never-run").unwrap().is_none());
    assert!(
        repo.commit_current_run("never-run", RunHash::new("x"))
            .is_err()
    );
}

fn check_replay_order(repo: &impl TestRepository) {
    let name = "replay";
    for ordering in [3, 1, 0, 2] {
        let n = ordering as i64;
        repo.insert_result(&record(ordering, json!(n), json!(n + 1), json!(n + 1)), name)
            .unwrap();
    }
    let run = repo.get_or_create_current_run(name).unwrap();
    let orderings: Vec<_> = repo
        .results(run.id)
        .unwrap()
        .into_iter()
        .map(|result| result.ordering)
        .collect();
    assert_eq!(orderings, vec![0, 1, 2, 3]);
}

fn check_duplicate_insert(repo: &impl TestRepository) {
    let name = "duplicate";
    let result = record(0, json!("a"), json!("A"), json!("A"));
    assert_eq!(
        repo.insert_result(&result, name).unwrap(),
        InsertOutcome::Inserted
    );
    assert_eq!(
        repo.insert_result(&result, name).unwrap(),
        InsertOutcome::AlreadyPresent
    );

    let run = repo.get_or_create_current_run(name).unwrap();
    assert_eq!(repo.results(run.id).unwrap(), vec![result]);
}

fn check_batch_insert(repo: &impl TestRepository) {
    let name = "batch";
    assert!(repo.insert_results(&[], name).unwrap().is_empty());

    let first = record(1, json!(2), json!(3), json!(3));
    let second = record(0, json!(1), json!(2), json!(2));
    let outcomes = repo
        .insert_results(&[first.clone(), second.clone(), first.clone()], name)
        .unwrap();
    assert_eq!(
        outcomes,
        vec![
            InsertOutcome::Inserted,
            InsertOutcome::Inserted,
            InsertOutcome::AlreadyPresent,
        ]
    );

    // A batch mixes with single inserts on the same current run.
    assert_eq!(
        repo.insert_result(&second, name).unwrap(),
        InsertOutcome::AlreadyPresent
    );
    let run = repo.get_or_create_current_run(name).unwrap();
    assert_eq!(repo.results(run.id).unwrap(), vec![second, first]);
}

fn check_clear_uncommitted(repo: &impl TestRepository) {
    let name = "clear-uncommitted";
    // No current run yet: nothing to do.
    repo.clear_uncommitted(name).unwrap();

    let kept = record(0, json!(1), json!(2), json!(2));
    repo.insert_result(&kept, name).unwrap();
    repo.commit_current_run(name, RunHash::new("clear-1"))
        .unwrap();
    repo.insert_result(&kept, name).unwrap();
    repo.insert_result(&record(1, json!(2), json!(4), json!(3)), name)
        .unwrap();

    repo.clear_uncommitted(name).unwrap();
    let current = repo.get_or_create_current_run(name).unwrap();
    assert!(!repo.has_results(current.id).unwrap());
    // The committed run still references the shared row.
    assert_eq!(repo.all_results().unwrap().len(), 1);
    assert_eq!(repo.all_associations().unwrap().len(), 1);
}

fn check_clear_stale(repo: &impl TestRepository) {
    let to_clear = "to-be-cleared";
    let keep = "dont-clear-me";
    let run = |name: &str, input: Value, output: Value, expected: Value| {
        repo.insert_result(&record(0, input, output, expected), name)
            .unwrap();
    };

    // Runs for another suite, which must survive.
    run(keep, json!("a"), json!("A"), json!("A!"));
    repo.commit_current_run(keep, RunHash::new("dont-clear-me-1"))
        .unwrap();
    run(keep, json!("a"), json!("A!"), json!("A!"));
    repo.commit_current_run(keep, RunHash::new("dont-clear-me-2"))
        .unwrap();
    run(keep, json!("a"), json!("A!!"), json!("A!"));

    run(to_clear, json!(1), json!(2), json!(10));
    repo.commit_current_run(to_clear, RunHash::new("to-be-cleared-1"))
        .unwrap();
    run(to_clear, json!(1), json!(3), json!(10));
    repo.commit_current_run(to_clear, RunHash::new("to-be-cleared-2"))
        .unwrap();
    run(to_clear, json!(1), json!(10), json!(10));

    let pruned = repo
        .clear_stale(to_clear, &RetentionPolicy::default())
        .unwrap();
    assert_eq!(pruned.deleted_runs, vec![RunId::new(4)]);
    assert_eq!(pruned.deleted_results, 1);

    let results = repo.all_results().unwrap();
    let mut remaining: Vec<_> = repo
        .all_associations()
        .unwrap()
        .iter()
        .map(|RunAssociation { run_id, result_id, .. }| {
            let row = results
                .iter()
                .find(|row| &row.id == result_id)
                .expect("association refers to a stored result");
            let hash = repo
                .all_runs()
                .unwrap()
                .into_iter()
                .find(|run| run.id() == *run_id)
                .expect("association refers to a stored run")
                .hash()
                .map(|hash| hash.to_string());
            (run_id.get(), row.result.clone(), hash)
        })
        .collect();
    remaining.sort_by_key(|(run_id, ..)| *run_id);

    assert_eq!(
        remaining,
        vec![
            (1, json!("A"), Some("dont-clear-me-1".to_owned())),
            (2, json!("A!"), Some("dont-clear-me-2".to_owned())),
            (3, json!("A!!"), None),
            (5, json!(3), Some("to-be-cleared-2".to_owned())),
            (6, json!(10), None),
        ]
    );

    // Pruning again is a no-op.
    assert!(
        repo.clear_stale(to_clear, &RetentionPolicy::default())
            .unwrap()
            .is_empty()
    );
}

fn check_concurrent_inserts(repo: &(impl TestRepository + Sync)) {
    let name = "concurrent";
    std::thread::scope(|scope| {
        for thread in 0..4 {
            scope.spawn(move || {
                for i in 0..5 {
                    let ordering = thread * 5 + i;
                    let n = ordering as i64;
                    repo.insert_result(&record(ordering, json!(n), json!(n), json!(n)), name)
                        .unwrap();
                }
            });
        }
    });

    let run = repo.get_or_create_current_run(name).unwrap();
    let orderings: Vec<_> = repo
        .results(run.id)
        .unwrap()
        .into_iter()
        .map(|result| result.ordering)
        .collect();
    assert_eq!(orderings, (0..20).collect::<Vec<_>>());
}
