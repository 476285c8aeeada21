// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::Resequence;
use crate::{
    errors::{CaseFailure, CaseFailureKind},
    identity::CaseHash,
    result::TestResult,
    suite::{Program, TestCase, TestSuite},
    time::stopwatch,
};
use debug_ignore::DebugIgnore;
use futures::prelude::*;
use serde::Serialize;
use std::{num::NonZeroUsize, sync::Arc};
use tracing::{debug, info};

/// The outcome of running a single case: a result, or the reason there is none.
pub type CaseOutcome<I, O, T, E> = Result<TestResult<I, O, T>, CaseFailure<E>>;

/// A callback invoked with progress updates.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Execution engine options.
#[derive(Clone, Debug)]
pub struct RunnerOptions {
    concurrency: NonZeroUsize,
    on_progress: DebugIgnore<Option<ProgressCallback>>,
}

impl RunnerOptions {
    /// Creates options with the given number of in-flight program calls.
    pub fn new(concurrency: NonZeroUsize) -> Self {
        Self {
            concurrency,
            on_progress: DebugIgnore(None),
        }
    }

    /// Sets a callback that is invoked at the progress cadence (the first and last case, and
    /// every 5% in between).
    pub fn on_progress(mut self, callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.on_progress = DebugIgnore(Some(Arc::new(callback)));
        self
    }

    /// Returns the maximum number of in-flight program calls.
    pub fn concurrency(&self) -> NonZeroUsize {
        self.concurrency
    }
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self::new(NonZeroUsize::MIN)
    }
}

/// How far along a run is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// The number of cases that have finished, successfully or not.
    pub completed: usize,

    /// The total number of cases.
    pub total: usize,
}

impl Progress {
    /// Returns true if this update falls on the reporting cadence: the first case, the last
    /// case, and every `max(1, total / 20)` cases.
    pub fn is_reportable(&self) -> bool {
        let step = (self.total / 20).max(1);
        self.completed == 1 || self.completed == self.total || self.completed % step == 0
    }
}

/// Runs every case in `suite`, with at most `options.concurrency()` program calls in flight.
///
/// Program calls may start and finish in any order, but the returned stream always yields
/// outcomes in case order: the outcome with `ordering == k` is yielded `k`th. A failing case
/// yields an `Err` in its own slot and does not affect any other case.
///
/// Outcomes that finish ahead of a slow earlier case are buffered until that case finishes, so
/// a case that never finishes lets the buffer grow to the size of the suite.
///
/// The stream is lazy: nothing runs until it is polled.
pub fn run_all<'a, I, T, P>(
    suite: &'a TestSuite<I, T, P>,
    options: &RunnerOptions,
) -> impl Stream<Item = CaseOutcome<I, P::Output, T, P::Error>> + use<'a, I, T, P>
where
    I: Clone + Serialize + 'a,
    T: Clone + Serialize + 'a,
    P: Program<I> + 'a,
    P::Output: Serialize,
{
    let total = suite.cases().len();
    let concurrency = options.concurrency.get();
    let on_progress = options.on_progress.0.clone();
    debug!(suite = suite.name(), total, concurrency, "running test suite");

    let mut completed = 0;
    let finished = stream::iter(suite.cases().iter().enumerate())
        .map(move |(ordering, case)| async move {
            let outcome = run_case(suite, ordering, case).await;
            (ordering, outcome)
        })
        // Calls start in case order but finish in any order.
        .buffer_unordered(concurrency)
        .inspect(move |_| {
            completed += 1;
            let progress = Progress { completed, total };
            if progress.is_reportable() {
                info!(suite = suite.name(), "{completed}/{total} cases completed");
                if let Some(callback) = &on_progress {
                    callback(progress);
                }
            }
        });

    Resequence::new(finished)
}

async fn run_case<I, T, P>(
    suite: &TestSuite<I, T, P>,
    ordering: usize,
    case: &TestCase<I, T>,
) -> CaseOutcome<I, P::Output, T, P::Error>
where
    I: Clone + Serialize,
    T: Clone + Serialize,
    P: Program<I>,
    P::Output: Serialize,
{
    let stopwatch = stopwatch();
    let output = suite.program().call(case.input.clone()).await;
    let time_millis = stopwatch.snapshot().millis();

    match output {
        Ok(output) => {
            let label = suite.classifier().classify(&output, &case.expected);
            TestResult::from_outcome(
                ordering,
                label,
                case.input.clone(),
                output,
                case.expected.clone(),
                case.tags.clone(),
                time_millis,
            )
            .map_err(|error| CaseFailure {
                ordering,
                hash_test_case: CaseHash::new(&case.input, &case.expected).ok(),
                kind: CaseFailureKind::Encode(error),
            })
        }
        Err(error) => Err(CaseFailure {
            ordering,
            hash_test_case: CaseHash::new(&case.input, &case.expected).ok(),
            kind: CaseFailureKind::Program(error),
        }),
    }
}
