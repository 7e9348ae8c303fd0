// ABOUTME: Run lock to prevent concurrent pipeline runs for the same workload.
// ABOUTME: Atomic create-new of <state_dir>/<workload>.lock holding JSON lock info.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::WorkloadName;

/// Errors acquiring or releasing the run lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("deploy of {workload} already running on {holder} (pid {pid}) since {since}")]
    Held {
        workload: String,
        holder: String,
        pid: u32,
        since: DateTime<Utc>,
    },

    #[error("lock file {} could not be {action}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("lock for {0} acquired by another process while breaking it")]
    Contended(String),
}

/// Information about who holds a run lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// After this the holder cannot still be running within its bounds.
    pub expires_at: DateTime<Utc>,
    /// Workload being deployed.
    pub workload: String,
}

impl LockInfo {
    /// Lock info for this process, valid for `lease`.
    pub fn new(workload: &WorkloadName, lease: Duration) -> Self {
        let started_at = Utc::now();
        let expires_at = chrono::Duration::from_std(lease)
            .ok()
            .and_then(|lease| started_at.checked_add_signed(lease))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at,
            expires_at,
            workload: workload.to_string(),
        }
    }

    /// A lock past its lease is assumed abandoned.
    pub fn is_stale(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn lock_path(state_dir: &Path, workload: &WorkloadName) -> PathBuf {
        state_dir.join(format!("{workload}.lock"))
    }
}

/// A held run lock that releases on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    info: LockInfo,
    released: bool,
}

impl RunLock {
    /// Acquire the lock for `workload`, held for at most `lease`.
    ///
    /// Locks past their lease are broken with a warning; `force` breaks any
    /// lock.
    pub fn acquire(
        state_dir: &Path,
        workload: &WorkloadName,
        lease: Duration,
        force: bool,
    ) -> Result<Self, LockError> {
        std::fs::create_dir_all(state_dir).map_err(|source| LockError::Io {
            action: "created",
            path: state_dir.to_path_buf(),
            source,
        })?;

        let path = LockInfo::lock_path(state_dir, workload);
        let info = LockInfo::new(workload, lease);

        match Self::try_create(&path, &info) {
            Ok(()) => return Ok(Self::held(path, info)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(source) => {
                return Err(LockError::Io {
                    action: "created",
                    path,
                    source,
                });
            }
        }

        if let Some(existing) = Self::should_keep(&path, force) {
            return Err(LockError::Held {
                workload: workload.to_string(),
                holder: existing.holder,
                pid: existing.pid,
                since: existing.started_at,
            });
        }

        tracing::debug!(path = %path.display(), "removing stale or forced lock");
        if let Err(source) = std::fs::remove_file(&path)
            && source.kind() != ErrorKind::NotFound
        {
            return Err(LockError::Io {
                action: "removed",
                path,
                source,
            });
        }

        match Self::try_create(&path, &info) {
            Ok(()) => Ok(Self::held(path, info)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(LockError::Contended(workload.to_string()))
            }
            Err(source) => Err(LockError::Io {
                action: "created",
                path,
                source,
            }),
        }
    }

    fn held(path: PathBuf, info: LockInfo) -> Self {
        tracing::debug!(path = %path.display(), "run lock acquired");
        Self {
            path,
            info,
            released: false,
        }
    }

    fn try_create(path: &Path, info: &LockInfo) -> std::io::Result<()> {
        let json = serde_json::to_string(info)?;
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()
    }

    /// Returns the existing holder when the lock must be respected.
    fn should_keep(path: &Path, force: bool) -> Option<LockInfo> {
        let existing = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => {
                tracing::warn!("lock info unreadable, breaking lock");
                return None;
            }
        };

        let Ok(existing) = serde_json::from_str::<LockInfo>(&existing) else {
            tracing::warn!("lock info corrupted, breaking lock");
            return None;
        };

        if force {
            tracing::warn!(
                holder = %existing.holder,
                pid = existing.pid,
                since = %existing.started_at,
                "breaking lock on request"
            );
            None
        } else if existing.is_stale() {
            tracing::warn!(
                holder = %existing.holder,
                pid = existing.pid,
                since = %existing.started_at,
                expired = %existing.expires_at,
                "auto-breaking stale lock"
            );
            None
        } else {
            Some(existing)
        }
    }

    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release explicitly, surfacing removal errors.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LockError::Io {
                action: "removed",
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release run lock");
        }
    }
}
