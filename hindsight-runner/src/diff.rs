// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comparing a run against a previous one.

use crate::collect::TestRunResults;
use hindsight_metadata::Diff;

/// Computes the statistical delta of `current` against `previous`.
///
/// Without a previous run, the diff is the current run's totals.
pub fn diff<I, O, T, PI, PO, PT>(
    current: &TestRunResults<I, O, T>,
    previous: Option<&TestRunResults<PI, PO, PT>>,
) -> Diff {
    Diff::between(&current.stats, previous.map(|previous| &previous.stats))
}
