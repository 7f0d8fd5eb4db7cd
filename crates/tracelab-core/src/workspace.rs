//! Per-request scratch workspaces.
//!
//! Every request gets its own uniquely named directory holding the submitted
//! source, instrumented source and any compiled artifacts. The directory is
//! removed when the workspace is dropped, on every exit path; removal
//! failures are logged and swallowed, never surfaced to the caller.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

use crate::errors::EngineError;

pub struct ScratchWorkspace {
    // Option so Drop can take ownership and log cleanup failures.
    dir: Option<TempDir>,
    request_id: String,
}

impl ScratchWorkspace {
    /// Create a fresh workspace under `root` (or the system temp directory).
    pub fn create(root: Option<&Path>) -> Result<Self, EngineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("trace-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(|e| {
                    EngineError::Workspace(format!(
                        "cannot create scratch root {}: {}",
                        root.display(),
                        e
                    ))
                })?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| EngineError::Workspace(format!("cannot create scratch dir: {}", e)))?;

        let request_id = Uuid::new_v4().simple().to_string();
        log::debug!(
            "created scratch workspace {} for request {}",
            dir.path().display(),
            request_id
        );
        Ok(Self {
            dir: Some(dir),
            request_id,
        })
    }

    /// Request-scoped identifier; used to build collision-proof artifact
    /// names (generated class names, executables).
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn path(&self) -> &Path {
        self.dir.as_ref().expect("workspace already closed").path()
    }

    /// Write an artifact into the workspace and return its absolute path.
    pub fn write_file(&self, file_name: &str, contents: &str) -> Result<PathBuf, EngineError> {
        let path = self.path().join(file_name);
        std::fs::write(&path, contents).map_err(|e| {
            EngineError::Workspace(format!("cannot write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }

    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.path().join(file_name)
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                log::warn!("failed to remove scratch workspace {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspaces_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let a = ScratchWorkspace::create(Some(root.path())).unwrap();
        let b = ScratchWorkspace::create(Some(root.path())).unwrap();
        assert_ne!(a.path(), b.path());
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn artifacts_are_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let source_path;
        {
            let ws = ScratchWorkspace::create(Some(root.path())).unwrap();
            source_path = ws.write_file("main.py", "print(1)\n").unwrap();
            assert!(source_path.exists());
        }
        assert!(!source_path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
