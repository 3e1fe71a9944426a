//! Run-scoped artifact storage on the local filesystem.
//!
//! Layout: `{root}/{run_id}/{artifact}`. A run directory is owned by the
//! run that created it; nothing else writes into it. Removal happens
//! through [`ArtifactStore::discard`] or [`ArtifactStore::purge_older_than`].

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{Result, TilerError};
use crate::manifest::{RunManifest, MANIFEST_FILE};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a run, whether or not it exists.
    pub fn run_dir(&self, run_id: &Uuid) -> PathBuf {
        self.root.join(run_id.to_string())
    }

    /// Allocate a fresh, empty run directory.
    pub fn create_run(&self) -> Result<(Uuid, PathBuf)> {
        fs::create_dir_all(&self.root)?;
        let run_id = Uuid::new_v4();
        let dir = self.run_dir(&run_id);
        fs::create_dir(&dir)?;
        debug!(run_id = %run_id, dir = %dir.display(), "Created run directory");
        Ok((run_id, dir))
    }

    /// Path to an existing artifact of a run.
    pub fn artifact_path(&self, run_id: &Uuid, name: &str) -> Result<PathBuf> {
        if !is_plain_file_name(name) {
            return Err(TilerError::ArtifactNotFound(name.to_string()));
        }
        let path = self.run_dir(run_id).join(name);
        if !path.is_file() {
            return Err(TilerError::ArtifactNotFound(format!("{}/{}", run_id, name)));
        }
        Ok(path)
    }

    /// Read an artifact of a run.
    pub fn open(&self, run_id: &Uuid, name: &str) -> Result<Vec<u8>> {
        let path = self.artifact_path(run_id, name)?;
        fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                TilerError::ArtifactNotFound(format!("{}/{}", run_id, name))
            }
            _ => TilerError::from(e),
        })
    }

    /// Read the manifest of a completed run.
    pub fn manifest(&self, run_id: &Uuid) -> Result<RunManifest> {
        let bytes = self.open(run_id, MANIFEST_FILE)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            TilerError::Storage(format!("corrupt manifest for run {}: {}", run_id, e))
        })
    }

    /// Ids of every run directory under the root.
    pub fn list_runs(&self) -> Result<Vec<Uuid>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut runs = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| TilerError::Storage(e.to_string()))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            if let Some(run_id) = entry.file_name().to_str().and_then(|s| s.parse().ok()) {
                runs.push(run_id);
            }
        }
        runs.sort();
        Ok(runs)
    }

    /// When a run was created: from its manifest, else the directory mtime.
    fn created_at(&self, run_id: &Uuid) -> Option<DateTime<Utc>> {
        if let Ok(manifest) = self.manifest(run_id) {
            return Some(manifest.created_at);
        }
        fs::metadata(self.run_dir(run_id))
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from)
    }

    /// Remove runs created more than `age` ago. Returns how many were removed.
    pub fn purge_older_than(&self, age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - age;
        let mut removed = 0;

        for run_id in self.list_runs()? {
            let Some(created) = self.created_at(&run_id) else {
                continue;
            };
            if created >= cutoff {
                continue;
            }
            match self.discard(&run_id) {
                Ok(()) => removed += 1,
                Err(e) => warn!(run_id = %run_id, error = %e, "Failed to purge run"),
            }
        }

        if removed > 0 {
            info!(removed, cutoff = %cutoff, "Purged expired runs");
        }
        Ok(removed)
    }

    /// Remove a run directory and everything in it.
    pub fn discard(&self, run_id: &Uuid) -> Result<()> {
        let dir = self.run_dir(run_id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Parse a client-supplied run id; malformed ids cannot name any run.
pub fn parse_run_id(s: &str) -> Result<Uuid> {
    s.parse()
        .map_err(|_| TilerError::ArtifactNotFound(format!("run {}", s)))
}

/// A single path component that is not `.`/`..` and not a staging file.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control)
        && !name.ends_with(".partial")
}
