// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The execution engine.
//!
//! The main entry point in this module is [`run_all`], which runs every case of a
//! [`TestSuite`](crate::suite::TestSuite) with bounded concurrency and yields outcomes in case
//! order.

mod imp;
mod resequence;

pub use imp::*;
pub(crate) use resequence::*;
