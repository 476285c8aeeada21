// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by hindsight.

use crate::{
    identity::{CaseHash, ResultId},
    record::{RunId, StoreFormatVersion},
};
use camino::{Utf8Path, Utf8PathBuf};
use config::ConfigError;
use std::io;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse hindsight config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing the config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error that occurred while reading from or writing to a test repository.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepositoryError {
    /// An error occurred while creating the store directory.
    #[error("error creating store directory `{path}`")]
    StoreDirCreate {
        /// The path to the store directory.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// An error occurred while opening the lock file.
    #[error("error opening lock file `{path}`")]
    FileLockOpen {
        /// The path to the lock file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// An error occurred while acquiring the lock.
    #[error("error acquiring lock on `{path}`")]
    FileLock {
        /// The path to the lock file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Timed out waiting for another process to release the lock.
    #[error("timed out acquiring lock on `{path}` after {timeout_secs}s (is another process using the store?)")]
    FileLockTimeout {
        /// The path to the lock file.
        path: Utf8PathBuf,

        /// How long we waited.
        timeout_secs: u64,
    },

    /// An error occurred while reading the store state.
    #[error("error reading store state from `{path}`")]
    StateRead {
        /// The path to the state file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// An error occurred while deserializing the store state.
    #[error("error deserializing store state from `{path}`")]
    StateDeserialize {
        /// The path to the state file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// An error occurred while writing the store state.
    #[error("error writing store state to `{path}`")]
    StateWrite {
        /// The path to the state file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: atomicwrites::Error<io::Error>,
    },

    /// The state file was written by a newer version of hindsight, so it cannot be written to.
    #[error(
        "store state at `{path}` has format version {file_version}, \
         but this version of hindsight only supports up to {max_supported_version}"
    )]
    FormatVersionTooNew {
        /// The path to the state file.
        path: Utf8PathBuf,

        /// The format version found in the file.
        file_version: StoreFormatVersion,

        /// The maximum format version this version of hindsight can write.
        max_supported_version: StoreFormatVersion,
    },

    /// A commit was requested, but the suite has no current run.
    #[error("suite `{name}` has no current run to commit")]
    NoCurrentRun {
        /// The suite name.
        name: String,
    },

    /// A run was referenced that does not exist in the repository.
    #[error("run {run_id} not found in repository")]
    RunNotFound {
        /// The run that was referenced.
        run_id: RunId,
    },
}

/// A stored result could not be decoded into the caller's input, output or expected types.
#[derive(Debug, Error)]
#[error("failed to decode {field} of stored result `{id}`")]
#[non_exhaustive]
pub struct ResultDecodeError {
    /// The identity of the stored result.
    pub id: ResultId,

    /// The field that failed to decode: `input`, `result` or `expected`.
    pub field: &'static str,

    /// The underlying error.
    #[source]
    pub error: serde_json::Error,
}

/// An error that occurred while running a suite through the [`Harness`](crate::session::Harness).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HarnessError {
    /// The repository failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A stored result could not be decoded.
    #[error(transparent)]
    Decode(#[from] ResultDecodeError),

    /// A result could not be encoded for storage.
    #[error("failed to encode result for case {ordering}")]
    Encode {
        /// The ordering of the case.
        ordering: usize,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// An error occurred while creating the Tokio runtime.
    #[error("error creating Tokio runtime")]
    RuntimeCreate(#[source] io::Error),
}

/// A test case was seen more than once while collecting a run. Only the first occurrence is kept.
///
/// This is a warning, not an error: collection continues.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("test case {hash} appears more than once (orderings {first_ordering} and {ordering}), skipping")]
#[non_exhaustive]
pub struct DuplicateTestCase {
    /// The case hash shared by both occurrences.
    pub hash: CaseHash,

    /// The ordering of the occurrence that was kept.
    pub first_ordering: usize,

    /// The ordering of the occurrence that was skipped.
    pub ordering: usize,
}

/// A single test case could not produce a result.
///
/// Failures are per-case: other cases in the same run are unaffected.
#[derive(Debug, Error)]
#[error("test case {ordering} failed")]
#[non_exhaustive]
pub struct CaseFailure<E> {
    /// The ordering of the failed case within its suite.
    pub ordering: usize,

    /// The case hash, if it could be computed.
    pub hash_test_case: Option<CaseHash>,

    /// What went wrong.
    #[source]
    pub kind: CaseFailureKind<E>,
}

/// The reason a test case could not produce a result.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaseFailureKind<E> {
    /// The program under test returned an error.
    #[error("program returned an error: {0}")]
    Program(E),

    /// The case or its outcome could not be converted to JSON for hashing.
    #[error("failed to encode case for hashing")]
    Encode(#[source] serde_json::Error),
}

impl<E> CaseFailureKind<E> {
    /// Returns the program error, if this failure came from the program under test.
    pub fn program_error(&self) -> Option<&E> {
        match self {
            Self::Program(error) => Some(error),
            Self::Encode(_) => None,
        }
    }
}
