// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-writer advisory lock with owner metadata.
//!
//! One process per repository root may hold the lock; it protects every
//! journaled store. The claim is an `O_EXCL` create of `writer.lock`
//! with the owner metadata written and fsynced into it.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Metadata recorded by the lock holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriterLockOwner {
    pub owner_id: String,
    pub repo_root: PathBuf,
    pub acquired_at_ms: u64,
}

/// Errors from writer lock operations.
#[derive(Debug, Error)]
pub enum WriterLockError {
    /// Another writer holds the lock (`writer_lock_busy`).
    #[error("writer lock busy: held by {}", .owner.as_ref().map(|o| o.owner_id.as_str()).unwrap_or("<unreadable>"))]
    Busy { owner: Option<WriterLockOwner> },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Held writer lock. Released on `release()` or drop.
#[derive(Debug)]
pub struct WriterLock {
    path: PathBuf,
    owner: WriterLockOwner,
    released: bool,
}

impl WriterLock {
    /// Claim the lock at `path` for `owner_id`.
    ///
    /// A losing claim returns [`WriterLockError::Busy`] carrying the
    /// incumbent's metadata when it is readable.
    pub fn acquire(
        path: &Path,
        owner_id: impl Into<String>,
        repo_root: &Path,
        now_ms: u64,
    ) -> Result<Self, WriterLockError> {
        let owner = WriterLockOwner {
            owner_id: owner_id.into(),
            repo_root: repo_root.to_owned(),
            acquired_at_ms: now_ms,
        };

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let incumbent = std::fs::read(path)
                    .ok()
                    .and_then(|bytes| serde_json::from_slice(&bytes).ok());
                return Err(WriterLockError::Busy { owner: incumbent });
            }
            Err(e) => return Err(e.into()),
        };

        let bytes = serde_json::to_vec(&owner)?;
        file.write_all(&bytes)?;
        file.sync_all()?;

        Ok(Self {
            path: path.to_owned(),
            owner,
            released: false,
        })
    }

    pub fn owner(&self) -> &WriterLockOwner {
        &self.owner
    }

    /// Release the lock by deleting the lock file.
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        std::fs::remove_file(&self.path)
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
#[path = "writer_lock_tests.rs"]
mod tests;
