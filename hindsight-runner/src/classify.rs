// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of program outputs against expected values.

use hindsight_metadata::Label;
use serde::Serialize;
use serde_json::Value;
use std::{fmt, sync::Arc};

/// Maps the nil/equality truth table of a result to its [`Label`].
///
/// Rules are checked in order, first match wins:
///
/// 1. both nil: `TN`
/// 2. neither nil and equal: `TP`
/// 3. output present and either nothing expected or not equal: `FP`
/// 4. otherwise (output nil, something expected): `FN`
///
/// `is_equal` is only consulted when neither side is nil.
pub fn label_for(
    output_nil: bool,
    expected_nil: bool,
    is_equal: impl FnOnce() -> bool,
) -> Label {
    if output_nil && expected_nil {
        Label::TrueNegative
    } else if !output_nil && !expected_nil && is_equal() {
        Label::TruePositive
    } else if !output_nil {
        Label::FalsePositive
    } else {
        Label::FalseNegative
    }
}

/// Returns true if `value` serializes to JSON `null`.
///
/// `None`, `()` and `Value::Null` are nil; a value that fails to serialize is not.
pub fn default_is_nil<X: Serialize + ?Sized>(value: &X) -> bool {
    matches!(serde_json::to_value(value), Ok(Value::Null))
}

/// Structural equality: true if both values serialize to the same JSON value.
pub fn default_is_equal<O, T>(output: &O, expected: &T) -> bool
where
    O: Serialize + ?Sized,
    T: Serialize + ?Sized,
{
    match (serde_json::to_value(output), serde_json::to_value(expected)) {
        (Ok(output), Ok(expected)) => output == expected,
        _ => false,
    }
}

type EqualFn<O, T> = Arc<dyn Fn(&O, &T) -> bool + Send + Sync>;
type NilFn<X> = Arc<dyn Fn(&X) -> bool + Send + Sync>;

/// Classifies outputs of type `O` against expected values of type `T`.
///
/// The equality and nil predicates are pluggable, so domain-specific tolerances ("within 0.2")
/// can be expressed. Predicates should stay the same over the lifetime of a suite: stored
/// results are not re-classified when they change.
pub struct Classifier<O: ?Sized, T: ?Sized> {
    is_equal: EqualFn<O, T>,
    is_output_nil: NilFn<O>,
    is_expected_nil: NilFn<T>,
}

impl<O, T> Classifier<O, T>
where
    O: Serialize + ?Sized + 'static,
    T: Serialize + ?Sized + 'static,
{
    /// Creates a classifier with structural equality and JSON-null nil checks.
    pub fn structural() -> Self {
        Self::with_equality(default_is_equal::<O, T>)
    }

    /// Creates a classifier with a custom equality predicate and JSON-null nil checks.
    pub fn with_equality(is_equal: impl Fn(&O, &T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            is_equal: Arc::new(is_equal),
            is_output_nil: Arc::new(default_is_nil::<O>),
            is_expected_nil: Arc::new(default_is_nil::<T>),
        }
    }
}

impl<O: ?Sized, T: ?Sized> Classifier<O, T> {
    /// Creates a classifier from all three predicates.
    pub fn new(
        is_equal: impl Fn(&O, &T) -> bool + Send + Sync + 'static,
        is_output_nil: impl Fn(&O) -> bool + Send + Sync + 'static,
        is_expected_nil: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            is_equal: Arc::new(is_equal),
            is_output_nil: Arc::new(is_output_nil),
            is_expected_nil: Arc::new(is_expected_nil),
        }
    }

    /// Replaces the predicate deciding whether an output is nil.
    pub fn output_nil(mut self, is_nil: impl Fn(&O) -> bool + Send + Sync + 'static) -> Self {
        self.is_output_nil = Arc::new(is_nil);
        self
    }

    /// Replaces the predicate deciding whether an expected value is nil.
    pub fn expected_nil(mut self, is_nil: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.is_expected_nil = Arc::new(is_nil);
        self
    }

    /// Labels a single output.
    pub fn classify(&self, output: &O, expected: &T) -> Label {
        label_for(
            (self.is_output_nil)(output),
            (self.is_expected_nil)(expected),
            || (self.is_equal)(output, expected),
        )
    }
}

impl<O, T> Default for Classifier<O, T>
where
    O: Serialize + ?Sized + 'static,
    T: Serialize + ?Sized + 'static,
{
    fn default() -> Self {
        Self::structural()
    }
}

impl<O: ?Sized, T: ?Sized> Clone for Classifier<O, T> {
    fn clone(&self) -> Self {
        Self {
            is_equal: self.is_equal.clone(),
            is_output_nil: self.is_output_nil.clone(),
            is_expected_nil: self.is_expected_nil.clone(),
        }
    }
}

impl<O: ?Sized, T: ?Sized> fmt::Debug for Classifier<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier").finish_non_exhaustive()
    }
}
