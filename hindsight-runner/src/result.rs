// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test results: the labeled outcome of running one case.

use crate::{
    errors::ResultDecodeError,
    identity::{CaseHash, ResultId},
};
use hindsight_metadata::Label;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// The outcome of running the program under test against a single case.
///
/// `I`, `O` and `T` are the input, output and expected types of the suite.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestResult<I, O, T> {
    /// The identity of this outcome. Changes whenever the label, input, output or expected value
    /// changes.
    pub id: ResultId,

    /// The identity of the case this result is for.
    pub hash_test_case: CaseHash,

    /// The position of the case in its suite.
    pub ordering: usize,

    /// How the output compares to the expected value.
    pub label: Label,

    /// The input the program was called with.
    pub input: I,

    /// The program's output.
    pub result: O,

    /// The expected output.
    pub expected: T,

    /// Tags carried over from the case.
    pub tags: Vec<String>,

    /// Wall-clock time of the program call, in milliseconds.
    pub time_millis: f64,
}

/// A type-erased test result, with input, output and expected value stored as JSON.
///
/// This is the shape test repositories store and return.
pub type TestResultRecord = TestResult<Value, Value, Value>;

impl<I, O, T> TestResult<I, O, T>
where
    I: Serialize,
    O: Serialize,
    T: Serialize,
{
    /// Builds a result from an outcome, computing both identities.
    pub fn from_outcome(
        ordering: usize,
        label: Label,
        input: I,
        result: O,
        expected: T,
        tags: Vec<String>,
        time_millis: f64,
    ) -> Result<Self, serde_json::Error> {
        let input_value = serde_json::to_value(&input)?;
        let result_value = serde_json::to_value(&result)?;
        let expected_value = serde_json::to_value(&expected)?;

        Ok(Self {
            id: ResultId::from_values(label, &input_value, &result_value, &expected_value),
            hash_test_case: CaseHash::from_values(&input_value, &expected_value),
            ordering,
            label,
            input,
            result,
            expected,
            tags,
            time_millis,
        })
    }

    /// Converts this result into its type-erased form.
    pub fn to_record(&self) -> Result<TestResultRecord, serde_json::Error> {
        Ok(TestResult {
            id: self.id.clone(),
            hash_test_case: self.hash_test_case.clone(),
            ordering: self.ordering,
            label: self.label,
            input: serde_json::to_value(&self.input)?,
            result: serde_json::to_value(&self.result)?,
            expected: serde_json::to_value(&self.expected)?,
            tags: self.tags.clone(),
            time_millis: self.time_millis,
        })
    }
}

impl TestResultRecord {
    /// Decodes a stored record into concrete input, output and expected types.
    pub fn decode<I, O, T>(self) -> Result<TestResult<I, O, T>, ResultDecodeError>
    where
        I: DeserializeOwned,
        O: DeserializeOwned,
        T: DeserializeOwned,
    {
        let input = decode_field(&self.id, "input", self.input)?;
        let result = decode_field(&self.id, "result", self.result)?;
        let expected = decode_field(&self.id, "expected", self.expected)?;

        Ok(TestResult {
            id: self.id,
            hash_test_case: self.hash_test_case,
            ordering: self.ordering,
            label: self.label,
            input,
            result,
            expected,
            tags: self.tags,
            time_millis: self.time_millis,
        })
    }
}

fn decode_field<X: DeserializeOwned>(
    id: &ResultId,
    field: &'static str,
    value: Value,
) -> Result<X, ResultDecodeError> {
    serde_json::from_value(value).map_err(|error| ResultDecodeError {
        id: id.clone(),
        field,
        error,
    })
}
