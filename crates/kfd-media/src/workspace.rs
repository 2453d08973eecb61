//! Per-invocation temporary filesystem state.
//!
//! Both types remove what they created when closed or dropped, so early
//! returns and failures cannot leak temp files. Removal errors are logged
//! and never returned.

use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile, TempDir};
use tracing::{debug, warn};

use crate::error::MediaResult;

const PREFIX: &str = "kfd-";

/// Uniquely named temp directory owned by one pipeline invocation.
#[derive(Debug)]
pub struct ScopedWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScopedWorkspace {
    /// Create a fresh workspace under `base`.
    pub fn create_in(base: impl AsRef<Path>) -> MediaResult<Self> {
        let base = base.as_ref();
        std::fs::create_dir_all(base)?;
        let dir = Builder::new().prefix(PREFIX).tempdir_in(base)?;
        let path = dir.path().to_path_buf();
        debug!(workspace = %path.display(), "Created scoped workspace");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the workspace.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Write `bytes` to `name` inside the workspace.
    pub async fn write_file(&self, name: impl AsRef<Path>, bytes: &[u8]) -> MediaResult<PathBuf> {
        let path = self.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Remove the workspace now.
    pub fn close(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => debug!(workspace = %self.path.display(), "Removed scoped workspace"),
                Err(e) => warn!(
                    workspace = %self.path.display(),
                    error = %e,
                    "Error cleaning up temp files"
                ),
            }
        }
    }
}

impl Drop for ScopedWorkspace {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Single temp file holding an uploaded still image.
#[derive(Debug)]
pub struct ScratchFile {
    file: Option<NamedTempFile>,
    path: PathBuf,
}

impl ScratchFile {
    /// Create a temp file under `base` containing `bytes`.
    ///
    /// `suffix` keeps the original extension (e.g. `.png`) so downstream
    /// consumers that sniff by name still work.
    pub async fn create_in(base: impl AsRef<Path>, suffix: &str, bytes: &[u8]) -> MediaResult<Self> {
        let base = base.as_ref();
        std::fs::create_dir_all(base)?;
        let file = Builder::new().prefix(PREFIX).suffix(suffix).tempfile_in(base)?;
        let path = file.path().to_path_buf();
        let scratch = Self {
            file: Some(file),
            path,
        };
        tokio::fs::write(&scratch.path, bytes).await?;
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now.
    pub fn close(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = file.close() {
                warn!(
                    file = %self.path.display(),
                    error = %e,
                    "Error cleaning up temp file"
                );
            }
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        self.remove();
    }
}
