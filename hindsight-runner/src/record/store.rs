// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The on-disk repository.
//!
//! The store is a directory holding a lock file and a single zstd-compressed JSON state file.
//! Each repository operation takes the lock (shared for reads, exclusive for writes), reads the
//! state, and for writes, replaces the state file atomically before releasing the lock. Every
//! operation is therefore a transaction, including commits.

use super::{
    CommittedRun, CurrentRun, InsertOutcome, PruneResult, RetentionPolicy, RunAssociation,
    RunHash, RunId, StoredResult, TestRepository, TestRun,
    state::{StoreFile, StoreState, StoreWritePermission, now},
};
use crate::{errors::RepositoryError, result::TestResultRecord};
use camino::{Utf8Path, Utf8PathBuf};
use debug_ignore::DebugIgnore;
use std::{
    fs::{File, TryLockError},
    io,
    thread,
    time::{Duration, Instant},
};
use tracing::debug;

static STORE_LOCK_FILE_NAME: &str = "store.lock";
static STORE_FILE_NAME: &str = "store.json.zst";

/// A repository persisted to a directory on disk.
///
/// Multiple processes can share a store directory: access is serialized through a lock file.
#[derive(Clone, Debug)]
pub struct FileRepository {
    dir: Utf8PathBuf,
}

impl FileRepository {
    /// Opens the store at `dir`, creating the directory if it doesn't exist.
    pub fn open(dir: impl Into<Utf8PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|error| RepositoryError::StoreDirCreate {
            path: dir.clone(),
            error,
        })?;
        debug!(%dir, "opened store");
        Ok(Self { dir })
    }

    /// Returns the store directory.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    fn lock(&self, kind: LockKind) -> Result<StoreLock, RepositoryError> {
        let lock_file_path = self.dir.join(STORE_LOCK_FILE_NAME);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_file_path)
            .map_err(|error| RepositoryError::FileLockOpen {
                path: lock_file_path.clone(),
                error,
            })?;

        acquire_lock_with_retry(&file, &lock_file_path, kind)?;
        Ok(StoreLock {
            locked_file: DebugIgnore(file),
        })
    }

    /// Runs `f` against the state under a shared lock.
    fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> Result<R, RepositoryError> {
        let _lock = self.lock(LockKind::Shared)?;
        let (state, _) = read_store_file(&self.dir)?;
        Ok(f(&state))
    }

    /// Runs `f` against the state under an exclusive lock, then writes the state back.
    fn write<R>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<R, RepositoryError>,
    ) -> Result<R, RepositoryError> {
        let _lock = self.lock(LockKind::Exclusive)?;
        let (mut state, write_permission) = read_store_file(&self.dir)?;
        if let StoreWritePermission::Denied {
            file_version,
            max_supported_version,
        } = write_permission
        {
            return Err(RepositoryError::FormatVersionTooNew {
                path: self.dir.join(STORE_FILE_NAME),
                file_version,
                max_supported_version,
            });
        }

        let value = f(&mut state)?;
        write_store_file(&self.dir, &state)?;
        Ok(value)
    }
}

impl TestRepository for FileRepository {
    fn get_or_create_current_run(&self, name: &str) -> Result<CurrentRun, RepositoryError> {
        self.write(|state| Ok(state.get_or_create_current_run(name, now())))
    }

    fn has_results(&self, run_id: RunId) -> Result<bool, RepositoryError> {
        self.read(|state| state.has_results(run_id))
    }

    fn clear_run(&self, run_id: RunId) -> Result<(), RepositoryError> {
        self.write(|state| state.clear_run(run_id).map(|_| ()))
    }

    fn clear_uncommitted(&self, name: &str) -> Result<(), RepositoryError> {
        self.write(|state| {
            state.clear_uncommitted(name);
            Ok(())
        })
    }

    fn insert_result(
        &self,
        result: &TestResultRecord,
        name: &str,
    ) -> Result<InsertOutcome, RepositoryError> {
        self.write(|state| Ok(state.insert_result(result, name, now())))
    }

    fn insert_results(
        &self,
        results: &[TestResultRecord],
        name: &str,
    ) -> Result<Vec<InsertOutcome>, RepositoryError> {
        if results.is_empty() {
            return Ok(Vec::new());
        }
        self.write(|state| Ok(state.insert_results(results, name, now())))
    }

    fn results(&self, run_id: RunId) -> Result<Vec<TestResultRecord>, RepositoryError> {
        self.read(|state| state.results(run_id))?
    }

    fn previous_run(&self, name: &str) -> Result<Option<CommittedRun>, RepositoryError> {
        self.read(|state| state.previous_run(name))
    }

    fn commit_current_run(
        &self,
        name: &str,
        hash: RunHash,
    ) -> Result<CommittedRun, RepositoryError> {
        self.write(|state| state.commit_current_run(name, hash, now()))
    }

    fn clear_stale(
        &self,
        name: &str,
        policy: &RetentionPolicy,
    ) -> Result<PruneResult, RepositoryError> {
        self.write(|state| Ok(state.clear_stale(name, policy)))
    }

    fn all_runs(&self) -> Result<Vec<TestRun>, RepositoryError> {
        self.read(|state| state.all_runs())
    }

    fn all_results(&self) -> Result<Vec<StoredResult>, RepositoryError> {
        self.read(|state| state.all_results())
    }

    fn all_associations(&self) -> Result<Vec<RunAssociation>, RepositoryError> {
        self.read(|state| state.all_associations())
    }
}

/// A held lock on the store. Released on drop.
#[derive(Debug)]
struct StoreLock {
    #[expect(dead_code, reason = "held for lock duration")]
    locked_file: DebugIgnore<File>,
}

/// Reads and deserializes the state file, or returns empty state if it doesn't exist yet.
fn read_store_file(
    dir: &Utf8Path,
) -> Result<(StoreState, StoreWritePermission), RepositoryError> {
    let path = dir.join(STORE_FILE_NAME);
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(error) => {
            if error.kind() == io::ErrorKind::NotFound {
                // The file doesn't exist yet, so we can write a new one.
                return Ok((StoreState::default(), StoreWritePermission::Allowed));
            } else {
                return Err(RepositoryError::StateRead { path, error });
            }
        }
    };

    let decoder = zstd::stream::Decoder::new(file).map_err(|error| RepositoryError::StateRead {
        path: path.clone(),
        error,
    })?;

    let store_file: StoreFile = serde_json::from_reader(decoder)
        .map_err(|error| RepositoryError::StateDeserialize { path, error })?;
    let write_permission = store_file.write_permission();
    Ok((store_file.into_state(), write_permission))
}

/// Serializes and atomically replaces the state file.
fn write_store_file(dir: &Utf8Path, state: &StoreState) -> Result<(), RepositoryError> {
    let path = dir.join(STORE_FILE_NAME);
    let store_file = StoreFile::from_state(state);

    atomicwrites::AtomicFile::new(&path, atomicwrites::AllowOverwrite)
        .write(|file| {
            let mut encoder = zstd::stream::Encoder::new(file, 3)?;
            serde_json::to_writer(&mut encoder, &store_file)?;
            encoder.finish()?;
            Ok(())
        })
        .map_err(|error| RepositoryError::StateWrite { path, error })?;

    Ok(())
}

/// The kind of lock to acquire.
#[derive(Clone, Copy)]
enum LockKind {
    Shared,
    Exclusive,
}

/// Acquires a file lock with retries, timing out after 5 seconds.
///
/// This handles both brief contention (another process finishing an operation) and filesystems
/// where locking may not work properly.
fn acquire_lock_with_retry(
    file: &File,
    lock_file_path: &Utf8Path,
    kind: LockKind,
) -> Result<(), RepositoryError> {
    const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
    const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

    let start = Instant::now();
    loop {
        let result = match kind {
            LockKind::Shared => file.try_lock_shared(),
            LockKind::Exclusive => file.try_lock(),
        };

        match result {
            Ok(()) => return Ok(()),
            Err(TryLockError::WouldBlock) => {
                if start.elapsed() >= LOCK_TIMEOUT {
                    return Err(RepositoryError::FileLockTimeout {
                        path: lock_file_path.to_owned(),
                        timeout_secs: LOCK_TIMEOUT.as_secs(),
                    });
                }
                thread::sleep(LOCK_RETRY_INTERVAL);
            }
            Err(TryLockError::Error(error)) => {
                return Err(RepositoryError::FileLock {
                    path: lock_file_path.to_owned(),
                    error,
                });
            }
        }
    }
}
