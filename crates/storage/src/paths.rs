// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-repository storage layout.

use std::io;
use std::path::{Path, PathBuf};

/// Resolved control-plane paths for one repository root.
///
/// All journaled stores live under `<repo_root>/.mu/control_plane/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPlanePaths {
    pub repo_root: PathBuf,
    pub control_plane_dir: PathBuf,
    pub commands: PathBuf,
    pub idempotency: PathBuf,
    pub outbox: PathBuf,
    pub identities: PathBuf,
    pub adapter_audit: PathBuf,
    pub telegram_ingress: PathBuf,
    pub writer_lock: PathBuf,
}

impl ControlPlanePaths {
    /// Resolve the fixed layout for a repository root.
    pub fn resolve(repo_root: &Path) -> Self {
        let control_plane_dir = repo_root.join(".mu").join("control_plane");
        Self {
            repo_root: repo_root.to_owned(),
            commands: control_plane_dir.join("commands.jsonl"),
            idempotency: control_plane_dir.join("idempotency.jsonl"),
            outbox: control_plane_dir.join("outbox.jsonl"),
            identities: control_plane_dir.join("identities.jsonl"),
            adapter_audit: control_plane_dir.join("adapter_audit.jsonl"),
            telegram_ingress: control_plane_dir.join("telegram_ingress.jsonl"),
            writer_lock: control_plane_dir.join("writer.lock"),
            control_plane_dir,
        }
    }

    /// Create the control-plane directory if missing.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.control_plane_dir)
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
