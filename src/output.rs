//! Output paths: the overwrite gate, staging, and the final file handle.
//!
//! Tools never write to the caller's path directly. They write to a hidden
//! staging file next to it, which is moved into place only after a
//! successful exit. Without overwrite the move is a hard link, so a file that
//! appeared at the target while the tool ran is never replaced.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{MediaError, Result};

/// A file the external tool produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFileHandle {
    pub path: PathBuf,
    /// Bytes
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
}

impl OutputFileHandle {
    /// Stat `path`; a missing file means the tool lied about success.
    pub async fn resolve(path: &Path) -> Result<Self> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MediaError::MissingOutput(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            return Err(MediaError::MissingOutput(path.display().to_string()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            created: metadata.created().ok().map(DateTime::<Utc>::from),
        })
    }
}

/// Result of a command that may decline to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum Outcome<T = OutputFileHandle> {
    Completed(T),
    /// Output already existed and overwrite was not requested.
    Skipped { path: PathBuf },
}

impl<T> Outcome<T> {
    pub fn skipped<P: AsRef<Path>>(path: P) -> Self {
        Outcome::Skipped { path: path.as_ref().to_path_buf() }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Skipped { .. } => None,
        }
    }
}

/// The overwrite gate: may a command write to `target`?
pub fn may_write(target: &Path, overwrite: bool) -> bool {
    if overwrite || !target.exists() {
        return true;
    }
    warn!(
        "Output {} already exists; skipping (use overwrite to replace it)",
        target.display()
    );
    false
}

/// A hidden sibling path the tool writes to before the result is moved into place.
/// Removed on drop unless committed.
#[derive(Debug)]
pub struct StagedOutput {
    target: PathBuf,
    staging: PathBuf,
    overwrite: bool,
    committed: bool,
}

impl StagedOutput {
    /// Pure path computation; touches nothing on disk.
    pub fn plan<P: AsRef<Path>>(target: P, overwrite: bool) -> Self {
        let target = target.as_ref().to_path_buf();
        let staging = staging_path(&target);
        Self {
            target,
            staging,
            overwrite,
            committed: false,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// The path to hand to the tool.
    pub fn path(&self) -> &Path {
        &self.staging
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// Create the output directory if it does not exist yet.
    pub async fn prepare(&self) -> Result<()> {
        if let Some(parent) = self.target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Move the staged file into place and describe it.
    pub async fn commit(mut self) -> Result<Outcome> {
        if !self.staging.is_file() {
            return Err(MediaError::MissingOutput(self.target.display().to_string()));
        }

        if self.overwrite {
            tokio::fs::rename(&self.staging, &self.target).await?;
        } else {
            match tokio::fs::hard_link(&self.staging, &self.target).await {
                Ok(()) => {
                    tokio::fs::remove_file(&self.staging).await?;
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    warn!(
                        "Output {} appeared while the tool was running; keeping the existing file",
                        self.target.display()
                    );
                    // Drop removes the staged file.
                    return Ok(Outcome::skipped(&self.target));
                }
                Err(e) => {
                    // Filesystems without hard links fall back to check-then-rename.
                    debug!("hard link unavailable ({}), falling back to rename", e);
                    if self.target.exists() {
                        return Ok(Outcome::skipped(&self.target));
                    }
                    tokio::fs::rename(&self.staging, &self.target).await?;
                }
            }
        }

        self.committed = true;
        let handle = OutputFileHandle::resolve(&self.target).await?;
        Ok(Outcome::Completed(handle))
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.staging) {
            Ok(()) => debug!("Removed staged output {}", self.staging.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staged output {}: {}", self.staging.display(), e),
        }
    }
}

/// `dir/name.ext` → `dir/.name.<id>.part.ext`; the extension is kept so
/// ffmpeg still picks the muxer from it.
fn staging_path(target: &Path) -> PathBuf {
    let id = Uuid::new_v4().simple().to_string();
    let id = &id[..12];
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let name = match target.extension() {
        Some(ext) => format!(".{}.{}.part.{}", stem, id, ext.to_string_lossy()),
        None => format!(".{}.{}.part", stem, id),
    };
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_staging_path_keeps_extension_and_directory() {
        let staged = StagedOutput::plan("/videos/out/final.mp4", false);
        let staging = staged.path();
        assert_eq!(staging.parent(), Some(Path::new("/videos/out")));
        let name = staging.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(".final."), "{}", name);
        assert!(name.ends_with(".part.mp4"), "{}", name);
        assert_ne!(staging, StagedOutput::plan("/videos/out/final.mp4", false).path());
    }

    #[test]
    fn test_gate() {
        let temp = assert_fs::TempDir::new().unwrap();
        let existing = temp.child("existing.mp4");
        existing.touch().unwrap();

        assert!(!may_write(existing.path(), false));
        assert!(may_write(existing.path(), true));
        assert!(may_write(&temp.path().join("new.mp4"), false));
    }

    #[tokio::test]
    async fn test_commit_moves_file_into_place() {
        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.child("out.mkv");
        let staged = StagedOutput::plan(target.path(), false);
        std::fs::write(staged.path(), b"encoded").unwrap();
        let staging = staged.path().to_path_buf();

        let handle = staged.commit().await.unwrap().completed().unwrap();
        assert_eq!(handle.path, target.path());
        assert_eq!(handle.size, 7);
        assert!(handle.modified.is_some());
        assert!(!staging.exists());
    }

    #[tokio::test]
    async fn test_commit_without_artifact_is_inconsistency() {
        let temp = assert_fs::TempDir::new().unwrap();
        let staged = StagedOutput::plan(temp.path().join("out.mp4"), false);
        let err = staged.commit().await.unwrap_err();
        assert!(matches!(err, MediaError::MissingOutput(_)));
    }

    #[tokio::test]
    async fn test_commit_does_not_clobber_late_arrival() {
        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.child("race.mp4");
        let staged = StagedOutput::plan(target.path(), false);
        std::fs::write(staged.path(), b"ours").unwrap();
        let staging = staged.path().to_path_buf();
        target.write_str("theirs").unwrap();

        let outcome = staged.commit().await.unwrap();
        assert!(outcome.is_skipped());
        assert_eq!(std::fs::read_to_string(target.path()).unwrap(), "theirs");
        assert!(!staging.exists());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_target() {
        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.child("replace.mp4");
        target.write_str("old").unwrap();
        let staged = StagedOutput::plan(target.path(), true);
        std::fs::write(staged.path(), b"new!").unwrap();

        let handle = staged.commit().await.unwrap().completed().unwrap();
        assert_eq!(handle.size, 4);
        assert_eq!(std::fs::read_to_string(target.path()).unwrap(), "new!");
    }

    #[test]
    fn test_uncommitted_stage_is_removed_on_drop() {
        let temp = assert_fs::TempDir::new().unwrap();
        let staged = StagedOutput::plan(temp.path().join("drop.mp4"), false);
        std::fs::write(staged.path(), b"partial").unwrap();
        let staging = staged.path().to_path_buf();
        drop(staged);
        assert!(!staging.exists());
    }
}
