// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Machine-readable data shapes for hindsight test runs.
//!
//! These types cross the boundary between the runner and whatever presents its results: the
//! outcome [`Label`] of a single result, the aggregate [`Stats`] of a run, and the [`Diff`]
//! between two runs. All of them serialize to JSON with kebab-case keys.

mod diff;
mod label;
mod stats;

pub use diff::*;
pub use label::*;
pub use stats::*;
