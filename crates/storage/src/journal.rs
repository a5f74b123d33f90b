// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic append-only JSONL journal with group commit support.
//!
//! Entries are buffered in memory and flushed to disk with a single
//! fsync; `flush()` is the durability point. Each entry is one line of
//! JSON. Loads are tolerant: a corrupt tail stops the scan with a
//! warning rather than refusing the whole journal.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Corrupt entry at line {line}: {message}")]
    Corrupt { line: usize, message: String },
}

/// Append-only JSONL journal for one store.
pub struct Journal<T> {
    file: File,
    path: PathBuf,
    write_buffer: Vec<Vec<u8>>,
    _entry: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> Journal<T> {
    /// Open or create a journal at the given path.
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            file,
            path: path.to_owned(),
            write_buffer: Vec::new(),
            _entry: PhantomData,
        })
    }

    /// Append an entry to the write buffer.
    ///
    /// The entry is NOT durable until `flush()` is called.
    pub fn append(&mut self, entry: &T) -> Result<(), JournalError> {
        let json_bytes = serde_json::to_vec(entry)?;
        self.write_buffer.push(json_bytes);
        Ok(())
    }

    /// Flush all buffered entries to disk with a single fsync.
    pub fn flush(&mut self) -> Result<(), JournalError> {
        if self.write_buffer.is_empty() {
            return Ok(());
        }

        for mut json_bytes in self.write_buffer.drain(..) {
            json_bytes.push(b'\n');
            self.file.write_all(&json_bytes)?;
        }

        self.file.sync_all()?;
        Ok(())
    }

    /// Append and immediately flush a single entry.
    pub fn append_flush(&mut self, entry: &T) -> Result<(), JournalError> {
        self.append(entry)?;
        self.flush()
    }

    /// Read all entries from disk in file order.
    ///
    /// Stops at the first corrupt line with a warning; entries before the
    /// corruption point are returned.
    pub fn load(path: &Path) -> Result<Vec<T>, JournalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        let reader = BufReader::new(file);

        for (idx, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str(trimmed) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        line = idx + 1,
                        error = %e,
                        "Corrupt journal entry, stopping at corruption point",
                    );
                    break;
                }
            }
        }

        Ok(entries)
    }

    /// Atomically rewrite the journal with the given entries.
    ///
    /// Used by compaction passes. Writes a temp file, fsyncs, then
    /// renames over the journal.
    pub fn rewrite(&mut self, entries: &[T]) -> Result<(), JournalError> {
        self.flush()?;

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp_file = File::create(&tmp_path)?;
            for entry in entries {
                let mut json_bytes = serde_json::to_vec(entry)?;
                json_bytes.push(b'\n');
                tmp_file.write_all(&json_bytes)?;
            }
            tmp_file.sync_all()?;
        }

        std::fs::rename(&tmp_path, &self.path)?;

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
