// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content-addressed identities for test cases and test results.
//!
//! Identities are SHA-256 digests over a canonical JSON rendering: values are converted to
//! [`serde_json::Value`], object keys are sorted at every level, and the compact JSON text is
//! hashed. Two structurally equal values therefore always hash identically, regardless of the
//! order in which their fields were produced.
//!
//! * [`CaseHash`] covers `(input, expected)`. It identifies a scenario and survives re-ordering
//!   or re-tagging the suite, and re-running it with a different program.
//! * [`ResultId`] covers `(label, input, result, expected)`. It changes whenever the program's
//!   outcome for a scenario changes.

use hindsight_metadata::Label;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::fmt;

macro_rules! define_content_hash {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident;
    ) => {
        $(#[$attr])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
        #[serde(transparent)]
        $vis struct $name(String);

        impl $name {
            /// Returns the hex-encoded digest.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_content_hash! {
    /// The identity of a test case: a digest of its input and expected value.
    pub struct CaseHash;
}

define_content_hash! {
    /// The identity of a test result: a digest of its label, input, output and expected value.
    pub struct ResultId;
}

impl CaseHash {
    /// Computes the case hash from already-converted JSON values.
    pub fn from_values(input: &Value, expected: &Value) -> Self {
        Self(digest(&json!({
            "input": input,
            "expected": expected,
        })))
    }

    /// Computes the case hash for a typed input and expected value.
    pub fn new<I, T>(input: &I, expected: &T) -> Result<Self, serde_json::Error>
    where
        I: Serialize + ?Sized,
        T: Serialize + ?Sized,
    {
        Ok(Self::from_values(
            &serde_json::to_value(input)?,
            &serde_json::to_value(expected)?,
        ))
    }
}

impl ResultId {
    /// Computes the result id from already-converted JSON values.
    pub fn from_values(label: Label, input: &Value, result: &Value, expected: &Value) -> Self {
        Self(digest(&json!({
            "label": label,
            "input": input,
            "result": result,
            "expected": expected,
        })))
    }

    /// Computes the result id for a typed outcome.
    pub fn new<I, O, T>(
        label: Label,
        input: &I,
        result: &O,
        expected: &T,
    ) -> Result<Self, serde_json::Error>
    where
        I: Serialize + ?Sized,
        O: Serialize + ?Sized,
        T: Serialize + ?Sized,
    {
        Ok(Self::from_values(
            label,
            &serde_json::to_value(input)?,
            &serde_json::to_value(result)?,
            &serde_json::to_value(expected)?,
        ))
    }
}

/// Returns a copy of `value` with the keys of every object sorted.
///
/// `serde_json` only keeps maps sorted when its `preserve_order` feature is off, and feature
/// unification can turn it on from anywhere in the dependency graph, so sorting is explicit.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key.clone(), canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn digest(value: &Value) -> String {
    let canonical = canonicalize(value).to_string();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}
