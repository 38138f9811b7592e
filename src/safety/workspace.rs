/// Per-request workspaces
///
/// Every submission gets a fresh private directory under the workspace root,
/// named `<seq>-<uuid>`. Two in-flight requests can never share a directory,
/// and the directory is removed when the [`Workspace`] is released or dropped.
use crate::config::types::{Result, RunnerError};
use crate::safety::safe_cleanup;
use std::fs;
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Directory owned by exactly one execution.
#[derive(Debug)]
pub struct Workspace {
    run_id: String,
    dir: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a new file directly inside the workspace.
    pub fn write_file(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\0')
        {
            return Err(RunnerError::Filesystem(format!(
                "Invalid workspace file name: {:?}",
                name
            )));
        }

        let path = self.dir.join(name);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&path)
            .map_err(|e| {
                RunnerError::Filesystem(format!("Failed to create {}: {}", path.display(), e))
            })?;
        file.write_all(bytes).map_err(|e| {
            RunnerError::Filesystem(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }

    /// Remove the directory and everything in it. Idempotent.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        safe_cleanup::remove_tree_secure(&self.dir)?;
        self.released = true;
        log::debug!("Released workspace {}", self.run_id);
        Ok(())
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!(
                "Failed to remove workspace {}: {}",
                self.dir.display(),
                e
            );
        }
    }
}

/// Hands out workspaces under a single root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// Create the manager, creating `root` (mode 0700) if it does not exist.
    ///
    /// The root is stored canonicalized: toolchains receive absolute paths
    /// while running with the workspace as their cwd.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&root)
            .map_err(|e| {
                RunnerError::Resource(format!(
                    "Failed to create workspace root {}: {}",
                    root.display(),
                    e
                ))
            })?;
        let root = fs::canonicalize(&root).map_err(|e| {
            RunnerError::Resource(format!(
                "Failed to resolve workspace root {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a fresh, empty, exclusively-owned workspace.
    pub fn acquire(&self) -> Result<Workspace> {
        let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        let run_id = format!("{}-{}", seq, Uuid::new_v4());
        let dir = self.root.join(&run_id);

        // Non-recursive create fails if the name somehow exists already.
        fs::DirBuilder::new()
            .mode(0o700)
            .create(&dir)
            .map_err(|e| {
                RunnerError::Resource(format!(
                    "Failed to create workspace {}: {}",
                    dir.display(),
                    e
                ))
            })?;

        log::debug!("Acquired workspace {}", dir.display());
        Ok(Workspace {
            run_id,
            dir,
            released: false,
        })
    }

    /// Remove workspaces older than `max_age`, left behind by a crashed
    /// process. Returns how many were removed.
    pub fn sweep_stale(&self, max_age: Duration) -> Result<usize> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(RunnerError::Filesystem(format!(
                    "Failed to read workspace root {}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries.flatten() {
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_dir() {
                continue;
            }
            let age = meta
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < max_age {
                continue;
            }
            match safe_cleanup::remove_tree_secure(&entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!(
                    "Failed to remove stale workspace {}: {}",
                    entry.path().display(),
                    e
                ),
            }
        }
        Ok(removed)
    }
}
