// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// The outcome label assigned to a single test result.
///
/// Exactly one label applies to each result. The labels follow the usual
/// binary-classification taxonomy, where a "nil" value stands for "no
/// prediction":
///
/// * `TP`: the output is present and equal to the (present) expected value.
/// * `TN`: both the output and the expected value are nil.
/// * `FP`: the output is present, and either nothing was expected or the
///   output differs from what was expected.
/// * `FN`: the output is nil but a value was expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum Label {
    /// True positive.
    #[serde(rename = "TP")]
    TruePositive,

    /// True negative.
    #[serde(rename = "TN")]
    TrueNegative,

    /// False positive.
    #[serde(rename = "FP")]
    FalsePositive,

    /// False negative.
    #[serde(rename = "FN")]
    FalseNegative,
}

impl Label {
    /// All labels, in display order.
    pub const ALL: [Label; 4] = [
        Label::TruePositive,
        Label::TrueNegative,
        Label::FalsePositive,
        Label::FalseNegative,
    ];

    /// Returns the two-letter token for this label.
    pub fn as_str(self) -> &'static str {
        match self {
            Label::TruePositive => "TP",
            Label::TrueNegative => "TN",
            Label::FalsePositive => "FP",
            Label::FalseNegative => "FN",
        }
    }

    /// Returns the list of known tokens, for error messages.
    pub fn variants() -> [&'static str; 4] {
        Self::ALL.map(Label::as_str)
    }

    /// Returns true if this label counts as a correct prediction.
    pub fn is_correct(self) -> bool {
        matches!(self, Label::TruePositive | Label::TrueNegative)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| LabelParseError::new(s))
    }
}

/// Error returned while parsing a [`Label`] from a string.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(
    "unrecognized label: {input}\n(known values: {})",
    Label::variants().join(", ")
)]
pub struct LabelParseError {
    input: String,
}

impl LabelParseError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the input that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}
