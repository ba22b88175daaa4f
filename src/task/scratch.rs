use crate::error::{Result, WorkerError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Per-archive staging area inside the output directory.
///
/// Layout:
/// - `files/` - extraction destination
/// - `extractor.log` - extractor stdout/stderr in poll mode
///
/// The directory is removed when dropped, so error paths never leak it.
pub struct ScratchDirectory {
    temp_dir: TempDir,
    extract_path: PathBuf,
    log_path: PathBuf,
}

impl ScratchDirectory {
    pub fn create_in<P: AsRef<Path>>(parent: P) -> Result<Self> {
        let parent = parent.as_ref();
        let temp_dir = tempfile::Builder::new()
            .prefix("extract_")
            .tempdir_in(parent)
            .map_err(|e| WorkerError::DirectoryCreation {
                path: parent.display().to_string(),
                source: e,
            })?;

        let extract_path = temp_dir.path().join("files");
        let log_path = temp_dir.path().join("extractor.log");

        Ok(Self {
            temp_dir,
            extract_path,
            log_path,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn extract_path(&self) -> &Path {
        &self.extract_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Remove the directory, reporting failures instead of ignoring them.
    pub fn close(self) -> Result<()> {
        let path = self.temp_dir.path().to_path_buf();
        self.temp_dir.close().map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove scratch directory");
            WorkerError::Io(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scratch_directories_are_unique() {
        let output = TempDir::new().unwrap();
        let first = ScratchDirectory::create_in(output.path()).unwrap();
        let second = ScratchDirectory::create_in(output.path()).unwrap();

        assert_ne!(first.path(), second.path());
        assert!(first.path().starts_with(output.path()));
        assert!(first
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("extract_"));
        assert_eq!(first.extract_path(), first.path().join("files"));
    }

    #[test]
    fn test_close_removes_contents() {
        let output = TempDir::new().unwrap();
        let scratch = ScratchDirectory::create_in(output.path()).unwrap();
        fs::create_dir_all(scratch.extract_path().join("dir")).unwrap();
        fs::write(scratch.extract_path().join("dir").join("left.txt"), "x").unwrap();
        let path = scratch.path().to_path_buf();

        scratch.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let output = TempDir::new().unwrap();
        let path = {
            let scratch = ScratchDirectory::create_in(output.path()).unwrap();
            fs::write(scratch.log_path(), "log").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_parent() {
        let result = ScratchDirectory::create_in("/nonexistent/output/path");
        assert!(matches!(result, Err(WorkerError::DirectoryCreation { .. })));
    }
}
