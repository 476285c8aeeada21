// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence of test runs and their results.
//!
//! The main abstraction is the [`TestRepository`] trait. Two implementations are provided:
//! [`MemoryRepository`] and the on-disk [`FileRepository`].

mod memory;
mod repository;
mod retention;
mod run;
mod state;
mod store;
#[cfg(test)]
mod test_helpers;

pub use memory::*;
pub use repository::*;
pub use retention::*;
pub use run::*;
pub use state::{RunAssociation, STORE_FORMAT_VERSION, StoreFormatVersion, StoredResult};
pub use store::*;
