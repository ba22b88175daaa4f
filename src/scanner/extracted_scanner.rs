use crate::error::{Result, WorkerError};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// A regular file found under an extraction root.
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    pub source_path: PathBuf,
    pub relative_path: PathBuf,
    pub filename: String,
    pub extension: String,
    pub size: u64,
}

impl ExtractedFile {
    pub fn new(source_path: PathBuf, relative_path: PathBuf, size: u64) -> Self {
        let filename = relative_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let extension = relative_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            source_path,
            relative_path,
            filename,
            extension,
            size,
        }
    }

    /// Relative path inside the archive with `/` separators on every platform.
    pub fn original_path(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Enumerates the regular files an extractor left in a directory.
pub struct ExtractedScanner {
    follow_links: bool,
}

impl ExtractedScanner {
    pub fn new() -> Self {
        Self {
            follow_links: false,
        }
    }

    /// Walk `root` recursively. Returns an empty list when nothing was
    /// extracted; deciding whether that is an error is up to the caller.
    pub fn scan_directory<P: AsRef<Path>>(&self, root: P) -> Result<Vec<ExtractedFile>> {
        let root_path = root.as_ref();

        if !root_path.is_dir() {
            return Err(WorkerError::InvalidPath {
                path: format!("{} is not a directory", root_path.display()),
            });
        }

        let mut files = Vec::new();
        let mut scan_errors = Vec::new();

        let walker = WalkDir::new(root_path)
            .follow_links(self.follow_links)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    scan_errors.push(format!("Scan error: {}", err));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| WorkerError::Io(e.into()))?;
            let relative_path = calculate_relative_path(entry.path(), root_path)?;
            files.push(ExtractedFile::new(
                entry.path().to_path_buf(),
                relative_path,
                metadata.len(),
            ));
        }

        if !scan_errors.is_empty() {
            if files.is_empty() {
                return Err(WorkerError::InvalidPath {
                    path: format!("Multiple scan errors: {}", scan_errors.join(", ")),
                });
            }
            for error in &scan_errors {
                tracing::warn!(root = %root_path.display(), "{}", error);
            }
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        Ok(files)
    }

    pub fn get_statistics(&self, files: &[ExtractedFile]) -> ScanStatistics {
        let mut files_by_extension = BTreeMap::new();
        for file in files {
            let ext = if file.extension.is_empty() {
                "no_extension".to_string()
            } else {
                file.extension.to_lowercase()
            };
            *files_by_extension.entry(ext).or_insert(0) += 1;
        }

        ScanStatistics {
            total_files: files.len(),
            total_size: files.iter().map(|f| f.size).sum(),
            files_by_extension,
        }
    }
}

impl Default for ExtractedScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn calculate_relative_path(file_path: &Path, root_path: &Path) -> Result<PathBuf> {
    let relative = file_path
        .strip_prefix(root_path)
        .map_err(|_| WorkerError::InvalidPath {
            path: format!(
                "Cannot calculate relative path for {} from root {}",
                file_path.display(),
                root_path.display()
            ),
        })?;

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(WorkerError::InvalidPath {
            path: format!("Unexpected path component in {}", relative.display()),
        });
    }

    Ok(relative.to_path_buf())
}

#[derive(Debug, Default)]
pub struct ScanStatistics {
    pub total_files: usize,
    pub total_size: u64,
    pub files_by_extension: BTreeMap<String, usize>,
}

impl ScanStatistics {
    pub fn display_summary(&self) -> String {
        let mut summary = format!(
            "Extracted {} files ({})",
            self.total_files,
            format_bytes(self.total_size)
        );

        if !self.files_by_extension.is_empty() {
            let by_type: Vec<String> = self
                .files_by_extension
                .iter()
                .map(|(ext, count)| format!("{}: {}", ext, count))
                .collect();
            summary.push_str(&format!(" [{}]", by_type.join(", ")));
        }

        summary
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
