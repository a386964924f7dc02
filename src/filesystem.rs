//! Staged writes.
//!
//! Every output of a run is collected here first and flushed to disk only
//! once the whole run has succeeded, so a failure in one job never leaves a
//! half-updated set of files behind.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};

/// A file waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub content: String,
}

impl StagedFile {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// True when `path` already holds exactly this content.
    pub fn matches_disk(&self, path: &Path) -> bool {
        fs::read_to_string(path).is_ok_and(|current| current == self.content)
    }
}

/// Pending output files keyed by path, in path order.
#[derive(Debug, Clone, Default)]
pub struct StagedWrites {
    files: BTreeMap<PathBuf, StagedFile>,
}

impl StagedWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `content` for `path`, replacing anything staged earlier.
    pub fn stage(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files
            .insert(path.as_ref().to_path_buf(), StagedFile::new(content));
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&StagedFile> {
        self.files.get(path.as_ref())
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files.contains_key(path.as_ref())
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths whose staged content differs from what is on disk.
    pub fn changed(&self) -> Vec<&Path> {
        self.files
            .iter()
            .filter(|(path, file)| !file.matches_disk(path))
            .map(|(path, _)| path.as_path())
            .collect()
    }

    /// Write every changed file, creating parent directories as needed.
    ///
    /// Returns the paths actually written.
    pub fn commit(&self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (path, file) in &self.files {
            if file.matches_disk(path) {
                debug!("{} is unchanged", path.display());
                continue;
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
                    message: format!("Failed to create directory {}: {}", parent.display(), e),
                })?;
            }
            fs::write(path, &file.content).map_err(|e| Error::Filesystem {
                message: format!("Failed to write {}: {}", path.display(), e),
            })?;
            written.push(path.clone());
        }
        info!("Wrote {} of {} staged file(s)", written.len(), self.files.len());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_replaces_previous_content() {
        let mut staged = StagedWrites::new();
        staged.stage("a/.env", "A=1\n");
        staged.stage("a/.env", "A=2\n");
        assert_eq!(staged.len(), 1);
        assert_eq!(staged.get("a/.env").unwrap().content, "A=2\n");
    }

    #[test]
    fn test_commit_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/env/.env");
        let mut staged = StagedWrites::new();
        staged.stage(&path, "A=1\n");

        let written = staged.commit().unwrap();
        assert_eq!(written, vec![path.clone()]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "A=1\n");
    }

    #[test]
    fn test_commit_skips_unchanged_files() {
        let temp_dir = TempDir::new().unwrap();
        let same = temp_dir.path().join("same");
        let different = temp_dir.path().join("different");
        fs::write(&same, "X=1\n").unwrap();
        fs::write(&different, "old\n").unwrap();

        let mut staged = StagedWrites::new();
        staged.stage(&same, "X=1\n");
        staged.stage(&different, "new\n");
        assert_eq!(staged.changed(), vec![different.as_path()]);

        let written = staged.commit().unwrap();
        assert_eq!(written, vec![different.clone()]);
        assert_eq!(fs::read_to_string(&different).unwrap(), "new\n");
    }

    #[test]
    fn test_empty_commit_writes_nothing() {
        let staged = StagedWrites::new();
        assert!(staged.is_empty());
        assert!(staged.commit().unwrap().is_empty());
    }
}
