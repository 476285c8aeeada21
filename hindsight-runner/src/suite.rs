// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test suites: named sets of labeled cases together with the program under test.

use crate::classify::Classifier;
use futures::prelude::*;
use serde::Serialize;
use std::{convert::Infallible, fmt};

/// A single scenario: an input and the value the program is expected to produce for it.
#[derive(Clone, Debug, PartialEq)]
pub struct TestCase<I, T> {
    /// The input passed to the program.
    pub input: I,

    /// The expected output.
    pub expected: T,

    /// Free-form tags, used for filtering only. Tags do not contribute to the case identity.
    pub tags: Vec<String>,
}

impl<I, T> TestCase<I, T> {
    /// Creates a new, untagged test case.
    pub fn new(input: I, expected: T) -> Self {
        Self {
            input,
            expected,
            tags: Vec::new(),
        }
    }

    /// Adds tags to this test case.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

impl<I, T> From<(I, T)> for TestCase<I, T> {
    fn from((input, expected): (I, T)) -> Self {
        Self::new(input, expected)
    }
}

/// The program under test.
///
/// Implemented for any `Fn(I) -> impl Future<Output = Result<O, E>>`. Each call may suspend
/// (network, disk, ...). A returned error is terminal for that case; retries, if desired, are
/// up to the program itself.
pub trait Program<I> {
    /// The output produced for an input.
    type Output;

    /// The error produced when the program fails for an input.
    type Error;

    /// Runs the program for a single input.
    fn call(&self, input: I) -> impl Future<Output = Result<Self::Output, Self::Error>>;
}

impl<I, O, E, F, Fut> Program<I> for F
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    type Output = O;
    type Error = E;

    fn call(&self, input: I) -> impl Future<Output = Result<O, E>> {
        self(input)
    }
}

/// Adapts a program that cannot fail.
pub fn infallible<I, O, F, Fut>(f: F) -> impl Program<I, Output = O, Error = Infallible>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = O>,
{
    move |input: I| f(input).map(Ok::<O, Infallible>)
}

/// A named set of test cases and the program they exercise.
///
/// The name keys all persisted runs: two suites with the same name share run history.
pub struct TestSuite<I, T, P: Program<I>> {
    name: String,
    cases: Vec<TestCase<I, T>>,
    program: P,
    classifier: Classifier<P::Output, T>,
}

impl<I, T, P> TestSuite<I, T, P>
where
    P: Program<I>,
    P::Output: Serialize + 'static,
    T: Serialize + 'static,
{
    /// Creates a new suite using structural equality to classify outputs.
    pub fn new(
        name: impl Into<String>,
        cases: impl IntoIterator<Item = impl Into<TestCase<I, T>>>,
        program: P,
    ) -> Self {
        Self {
            name: name.into(),
            cases: cases.into_iter().map(Into::into).collect(),
            program,
            classifier: Classifier::structural(),
        }
    }
}

impl<I, T, P: Program<I>> TestSuite<I, T, P> {
    /// Replaces the classifier used for this suite.
    pub fn with_classifier(mut self, classifier: Classifier<P::Output, T>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Returns the name of this suite.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the cases, in their original order.
    pub fn cases(&self) -> &[TestCase<I, T>] {
        &self.cases
    }

    /// Returns the program under test.
    pub fn program(&self) -> &P {
        &self.program
    }

    /// Returns the classifier.
    pub fn classifier(&self) -> &Classifier<P::Output, T> {
        &self.classifier
    }
}

impl<I: fmt::Debug, T: fmt::Debug, P: Program<I>> fmt::Debug for TestSuite<I, T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSuite")
            .field("name", &self.name)
            .field("cases", &self.cases)
            .finish_non_exhaustive()
    }
}
