// Disk snapshot store.
// Persists the repository snapshot and the resolved account owner as JSON files
// and reads them back best-effort.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

use super::types::CacheSnapshot;

const OWNER_FILE: &str = "owner.json";

/// Account login remembered across restarts.
#[derive(Debug, Serialize, Deserialize)]
struct SavedOwner {
    login: String,
}

/// Durable backing for the repository cache.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    max_repositories: usize,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, max_repositories: usize) -> Self {
        Self {
            path: path.into(),
            max_repositories,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the saved owner, next to the snapshot file.
    pub fn owner_path(&self) -> PathBuf {
        self.path.with_file_name(OWNER_FILE)
    }

    /// Read the snapshot, treating a missing, unreadable, or invalid file as absent.
    pub fn load(&self) -> Option<CacheSnapshot> {
        let contents = read_optional(&self.path)?;

        let snapshot: CacheSnapshot = match serde_json::from_str(&contents) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "malformed snapshot");
                return None;
            }
        };

        if let Err(e) = snapshot.validate(self.max_repositories, Utc::now().timestamp()) {
            warn!(path = %self.path.display(), error = %e, "discarding snapshot");
            return None;
        }

        debug!(
            path = %self.path.display(),
            count = snapshot.count(),
            updated = snapshot.last_refreshed_at(),
            "loaded snapshot"
        );
        Some(snapshot)
    }

    /// Write the snapshot as JSON.
    pub fn save(&self, snapshot: &CacheSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        write_atomic(&self.path, &json)
    }

    /// Read the saved owner login, if one was recorded.
    pub fn load_owner(&self) -> Option<String> {
        let path = self.owner_path();
        let contents = read_optional(&path)?;
        match serde_json::from_str::<SavedOwner>(&contents) {
            Ok(saved) if !saved.login.trim().is_empty() => Some(saved.login),
            Ok(_) => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed owner file");
                None
            }
        }
    }

    /// Record the owner login so it is known without upstream on the next start.
    pub fn save_owner(&self, login: &str) -> Result<()> {
        let json = serde_json::to_string(&SavedOwner {
            login: login.to_string(),
        })?;
        write_atomic(&self.owner_path(), &json)
    }
}

fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "nothing on disk");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read cache file");
            None
        }
    }
}

/// Write via a temp file and rename, so readers never see a partial file.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}
