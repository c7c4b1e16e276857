//! Whole-state snapshot persistence
//!
//! Three independent key-value snapshots (pending requests, dispatch
//! entries, resolution records) written as JSON files. Writes overwrite the
//! whole file via a temp-file rename, so a failed write leaves the previous
//! snapshot intact. Durability is advisory: the process keeps operating
//! in-memory if a write fails, and a missing or malformed file loads as
//! empty state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::domain::{DispatchEntry, RequestToken, SubmissionRequest};
use crate::error::{RelayError, Result};

const PENDING_FILE: &str = "pending.json";
const DISPATCH_FILE: &str = "dispatch.json";
const RESOLVED_FILE: &str = "resolved.json";

/// Full registry state as persisted and reloaded across restarts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub pending: HashMap<RequestToken, SubmissionRequest>,
    pub dispatch: HashMap<RequestToken, Vec<DispatchEntry>>,
    /// token -> resolution summary string (see `ResolutionRecord::summary`)
    pub resolved: HashMap<RequestToken, String>,
}

#[derive(Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Overwrite all three snapshot files from the given state.
    pub fn save(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        self.write_file(PENDING_FILE, &snapshot.pending)?;
        self.write_file(DISPATCH_FILE, &snapshot.dispatch)?;
        self.write_file(RESOLVED_FILE, &snapshot.resolved)?;
        Ok(())
    }

    /// Best-effort load: each missing or malformed file yields its empty
    /// section rather than failing startup.
    pub fn load(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            pending: self.read_file(PENDING_FILE),
            dispatch: self.read_file(DISPATCH_FILE),
            resolved: self.read_file(RESOLVED_FILE),
        }
    }

    fn write_file<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{}.tmp", name));
        let data = serde_json::to_vec(value)?;
        fs::write(&tmp, data)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| {
                RelayError::Persistence(format!("snapshot write {} failed: {}", name, e))
            })
    }

    fn read_file<T: for<'de> Deserialize<'de> + Default>(&self, name: &str) -> T {
        let path = self.dir.join(name);
        if !Path::new(&path).exists() {
            return T::default();
        }
        match fs::read(&path) {
            Ok(data) => match serde_json::from_slice(&data) {
                Ok(value) => value,
                Err(e) => {
                    warn!(file = name, error = %e, "malformed snapshot file, starting empty");
                    T::default()
                }
            },
            Err(e) => {
                warn!(file = name, error = %e, "unreadable snapshot file, starting empty");
                T::default()
            }
        }
    }
}
