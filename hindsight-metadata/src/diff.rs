// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Label, Stats};
use serde::{Deserialize, Serialize};

/// The statistical delta between two runs (current minus previous).
///
/// Negative deltas are regressions and are kept as-is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Diff {
    /// Change in true positives.
    pub true_positive: i64,
    /// Change in true negatives.
    pub true_negative: i64,
    /// Change in false positives.
    pub false_positive: i64,
    /// Change in false negatives.
    pub false_negative: i64,
    /// Change in precision.
    pub precision: f64,
    /// Change in recall.
    pub recall: f64,
}

impl Diff {
    /// Computes the delta of `current` against `previous`.
    ///
    /// Without a previous run, the diff is the current totals.
    pub fn between(current: &Stats, previous: Option<&Stats>) -> Self {
        let Some(previous) = previous else {
            return Self::from(current);
        };

        Self {
            true_positive: delta(current.true_positive, previous.true_positive),
            true_negative: delta(current.true_negative, previous.true_negative),
            false_positive: delta(current.false_positive, previous.false_positive),
            false_negative: delta(current.false_negative, previous.false_negative),
            precision: current.precision - previous.precision,
            recall: current.recall - previous.recall,
        }
    }

    /// Returns the delta for the given label.
    pub fn count(&self, label: Label) -> i64 {
        match label {
            Label::TruePositive => self.true_positive,
            Label::TrueNegative => self.true_negative,
            Label::FalsePositive => self.false_positive,
            Label::FalseNegative => self.false_negative,
        }
    }

    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        Label::ALL.into_iter().all(|label| self.count(label) == 0)
            && self.precision == 0.0
            && self.recall == 0.0
    }
}

impl From<&Stats> for Diff {
    fn from(stats: &Stats) -> Self {
        Self {
            true_positive: to_signed(stats.true_positive),
            true_negative: to_signed(stats.true_negative),
            false_positive: to_signed(stats.false_positive),
            false_negative: to_signed(stats.false_negative),
            precision: stats.precision,
            recall: stats.recall,
        }
    }
}

fn to_signed(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn delta(current: usize, previous: usize) -> i64 {
    to_signed(current) - to_signed(previous)
}
