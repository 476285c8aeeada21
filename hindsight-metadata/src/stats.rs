// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Label;
use serde::{Deserialize, Serialize};

/// Aggregate statistics over the results of a test run.
///
/// Label counts are accumulated one result at a time through [`Stats::on_label`]. The derived
/// fields (`precision`, `recall` and the timing summary) are filled in by [`Stats::finalize`]
/// once all results have been seen.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Stats {
    /// The number of true positives.
    pub true_positive: usize,

    /// The number of true negatives.
    pub true_negative: usize,

    /// The number of false positives.
    pub false_positive: usize,

    /// The number of false negatives.
    pub false_negative: usize,

    /// `TP / (TP + FP)`, or 0 if there are no positive predictions.
    pub precision: f64,

    /// `TP / (TP + FN)`, or 0 if nothing positive was expected.
    pub recall: f64,

    /// The total number of results counted.
    pub total: usize,

    /// The fastest per-result time in milliseconds. Absent for empty runs.
    #[serde(default)]
    pub time_min: Option<f64>,

    /// The slowest per-result time in milliseconds. Absent for empty runs.
    #[serde(default)]
    pub time_max: Option<f64>,

    /// The mean per-result time in milliseconds. Absent for empty runs.
    #[serde(default)]
    pub time_mean: Option<f64>,

    /// The median per-result time in milliseconds. Absent for empty runs.
    #[serde(default)]
    pub time_median: Option<f64>,
}

impl Stats {
    /// Computes finalized statistics from a sequence of labels and their times.
    pub fn from_labels(
        labels: impl IntoIterator<Item = Label>,
        times_millis: &[f64],
    ) -> Self {
        let mut stats = Self::default();
        for label in labels {
            stats.on_label(label);
        }
        stats.finalize(times_millis);
        stats
    }

    /// Returns the count for the given label.
    pub fn count(&self, label: Label) -> usize {
        match label {
            Label::TruePositive => self.true_positive,
            Label::TrueNegative => self.true_negative,
            Label::FalsePositive => self.false_positive,
            Label::FalseNegative => self.false_negative,
        }
    }

    /// Counts a single result with the given label.
    pub fn on_label(&mut self, label: Label) {
        match label {
            Label::TruePositive => self.true_positive += 1,
            Label::TrueNegative => self.true_negative += 1,
            Label::FalsePositive => self.false_positive += 1,
            Label::FalseNegative => self.false_negative += 1,
        }
        self.total += 1;
    }

    /// Fills in the derived fields from the current label counts and the per-result times.
    pub fn finalize(&mut self, times_millis: &[f64]) {
        self.precision = ratio(self.true_positive, self.true_positive + self.false_positive);
        self.recall = ratio(self.true_positive, self.true_positive + self.false_negative);

        let summary = TimeSummary::from_samples(times_millis);
        self.time_min = summary.map(|s| s.min);
        self.time_max = summary.map(|s| s.max);
        self.time_mean = summary.map(|s| s.mean);
        self.time_median = summary.map(|s| s.median);
    }

    /// Returns the timing summary, if any results were counted.
    pub fn time_summary(&self) -> Option<TimeSummary> {
        Some(TimeSummary {
            min: self.time_min?,
            max: self.time_max?,
            mean: self.time_mean?,
            median: self.time_median?,
        })
    }
}

/// Returns `numerator / denominator`, or 0 if the denominator is 0.
pub fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Summary statistics over a non-empty set of timings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeSummary {
    /// The smallest sample.
    pub min: f64,

    /// The largest sample.
    pub max: f64,

    /// The arithmetic mean.
    pub mean: f64,

    /// The median. For an even number of samples, this is the mean of the two middle samples.
    pub median: f64,
}

impl TimeSummary {
    /// Summarizes the given samples, returning `None` if there are none.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            median,
        })
    }
}
