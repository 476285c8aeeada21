// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for hindsight, a prediction-testing harness.
//!
//! A [`TestSuite`](suite::TestSuite) pairs labeled cases with a program under test. Running it
//! classifies each outcome as a true or false positive or negative, identifies cases and
//! outcomes by content hash, persists results against the suite's current run in a
//! [`TestRepository`](record::TestRepository), and diffs the run's statistics against the most
//! recent committed run.
//!
//! Most callers want [`Harness`](session::Harness), which wires all of this together.

pub mod classify;
pub mod collect;
pub mod config;
pub mod diff;
pub mod errors;
pub mod filter;
pub mod identity;
pub mod record;
pub mod result;
pub mod runner;
pub mod session;
pub mod suite;
mod time;
