// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filtering results by label and tag.

use crate::result::TestResult;
use hindsight_metadata::Label;
use std::collections::BTreeSet;

/// Selects results by label and tags.
///
/// Each part of the filter is ignored when empty; otherwise a result must satisfy all parts:
///
/// * `labels`: the result has one of these labels.
/// * `any_tags`: the result has at least one of these tags.
/// * `all_tags`: the result has every one of these tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultFilter {
    /// Labels to keep.
    pub labels: BTreeSet<Label>,

    /// Keep results with any of these tags.
    pub any_tags: BTreeSet<String>,

    /// Keep results with all of these tags.
    pub all_tags: BTreeSet<String>,
}

impl ResultFilter {
    /// Creates a filter that matches every result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the filter to results with any of the given labels.
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = Label>) -> Self {
        self.labels.extend(labels);
        self
    }

    /// Restricts the filter to results with at least one of the given tags.
    pub fn with_any_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.any_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Restricts the filter to results with all of the given tags.
    pub fn with_all_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.all_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Returns true if the filter matches every result.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.any_tags.is_empty() && self.all_tags.is_empty()
    }

    /// Returns true if `result` passes the filter.
    pub fn matches<I, O, T>(&self, result: &TestResult<I, O, T>) -> bool {
        let has_tag = |tag: &String| result.tags.contains(tag);

        (self.labels.is_empty() || self.labels.contains(&result.label))
            && (self.any_tags.is_empty() || self.any_tags.iter().any(has_tag))
            && self.all_tags.iter().all(has_tag)
    }
}
