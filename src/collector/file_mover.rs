use crate::error::{Result, WorkerError};
use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Component, Path};

/// Relocates extracted files into the managed output directory.
pub struct FileMover {
    buffer_size: usize,
}

impl FileMover {
    pub fn new() -> Self {
        Self {
            buffer_size: 64 * 1024, // 64KB buffer
        }
    }

    /// Move `source` to `dest`, returning the number of bytes relocated.
    /// Falls back to copy and delete when a rename is not possible. An
    /// existing destination is never replaced.
    pub fn move_file(&self, source: &Path, dest: &Path) -> Result<u64> {
        if !source.is_file() {
            return Err(WorkerError::InvalidPath {
                path: format!("Source is not a file: {}", source.display()),
            });
        }

        self.validate_destination_path(dest)?;

        if dest.exists() {
            return Err(WorkerError::InvalidPath {
                path: format!("Destination already exists: {}", dest.display()),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| WorkerError::DirectoryCreation {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let size = fs::metadata(source)?.len();
        match fs::rename(source, dest) {
            Ok(()) => Ok(size),
            Err(e) => {
                tracing::debug!(
                    source = %source.display(),
                    error = %e,
                    "rename failed, copying instead"
                );
                let copied = self.copy_file_with_buffer(source, dest)?;
                fs::remove_file(source)?;
                Ok(copied)
            }
        }
    }

    fn copy_file_with_buffer(&self, source: &Path, dest: &Path) -> Result<u64> {
        let source_file = fs::File::open(source)?;
        let dest_file = fs::File::create(dest)?;

        let mut reader = BufReader::with_capacity(self.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.buffer_size, dest_file);

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; 8192];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            writer.write_all(&buffer[..bytes_read])?;
            total_bytes += bytes_read as u64;
        }

        writer.flush()?;

        // Keep the timestamp the archive recorded.
        if let Ok(modified_time) = fs::metadata(source).and_then(|m| m.modified()) {
            let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(modified_time));
        }

        Ok(total_bytes)
    }

    fn validate_destination_path(&self, path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();

        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(WorkerError::InvalidPath {
                path: format!("Directory traversal not allowed: {}", path_str),
            });
        }

        if path_str.len() > 4096 {
            return Err(WorkerError::InvalidPath {
                path: format!("Path too long: {} characters", path_str.len()),
            });
        }

        Ok(())
    }
}

impl Default for FileMover {
    fn default() -> Self {
        Self::new()
    }
}
