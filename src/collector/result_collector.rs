use crate::collector::FileMover;
use crate::error::{Result, WorkerError};
use crate::scanner::ExtractedScanner;
use crate::task::{InputFile, OutputFile};
use std::fs;
use std::path::{Path, PathBuf};

/// Turns a finished extraction directory into output-file descriptors and
/// moves the files they describe into the output directory.
pub struct ResultCollector {
    output_path: PathBuf,
    data_type_prefix: String,
    fail_on_empty: bool,
    scanner: ExtractedScanner,
    mover: FileMover,
}

impl ResultCollector {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(output_path: P, data_type_prefix: S) -> Self {
        Self {
            output_path: output_path.into(),
            data_type_prefix: data_type_prefix.into(),
            fail_on_empty: true,
            scanner: ExtractedScanner::new(),
            mover: FileMover::new(),
        }
    }

    pub fn with_fail_on_empty(mut self, fail_on_empty: bool) -> Self {
        self.fail_on_empty = fail_on_empty;
        self
    }

    pub fn file_data_type(&self) -> String {
        format!("{}:file", self.data_type_prefix)
    }

    pub fn log_data_type(&self) -> String {
        format!("{}:log", self.data_type_prefix)
    }

    pub fn collect(&self, extraction_root: &Path, source: &InputFile) -> Result<Vec<OutputFile>> {
        let files = self.scanner.scan_directory(extraction_root)?;

        if files.is_empty() {
            if self.fail_on_empty {
                return Err(WorkerError::NoFilesExtracted {
                    archive: source.name(),
                });
            }
            tracing::warn!(archive = %source.name(), "archive produced no files");
            return Ok(Vec::new());
        }

        tracing::debug!(
            archive = %source.name(),
            summary = %self.scanner.get_statistics(&files).display_summary(),
            "scanned extraction directory"
        );

        let data_type = self.file_data_type();
        let planned = files
            .into_iter()
            .map(|file| {
                let descriptor = OutputFile::new(
                    &self.output_path,
                    &file.filename,
                    &file.original_path(),
                    &data_type,
                    &source.id,
                );
                (file.source_path, descriptor)
            })
            .collect();

        self.relocate(planned)
    }

    /// Move each source to its descriptor's path. If any move fails, the
    /// files already moved are removed before the error is returned.
    fn relocate(&self, planned: Vec<(PathBuf, OutputFile)>) -> Result<Vec<OutputFile>> {
        let mut moved = Vec::with_capacity(planned.len());

        for (source, descriptor) in planned {
            if let Err(e) = self.mover.move_file(&source, &descriptor.path) {
                discard_outputs(&moved);
                return Err(e);
            }
            moved.push(descriptor);
        }

        Ok(moved)
    }

    /// Wrap a captured extractor log, dropping it when empty.
    pub fn collect_log(&self, log_path: &Path, source: &InputFile) -> Result<Option<OutputFile>> {
        let size = match fs::metadata(log_path) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if size == 0 {
            fs::remove_file(log_path)?;
            return Ok(None);
        }

        let display_name = format!("{}.log", source.name());
        let descriptor = OutputFile::new(
            &self.output_path,
            &display_name,
            &display_name,
            &self.log_data_type(),
            &source.id,
        );
        self.mover.move_file(log_path, &descriptor.path)?;

        Ok(Some(descriptor))
    }
}

/// Delete files that were placed in the output directory but will not be
/// reported.
pub fn discard_outputs(files: &[OutputFile]) {
    for file in files {
        if let Err(e) = fs::remove_file(&file.path) {
            tracing::warn!(path = %file.path.display(), error = %e, "could not remove collected file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_input() -> InputFile {
        InputFile::new("/tmp/sample.zip", "sample.zip", "abc")
    }

    #[test]
    fn test_collect_builds_descriptors_and_moves_files() {
        let output = TempDir::new().unwrap();
        let root = output.path().join("extract_test").join("files");
        fs::create_dir_all(root.join("dir")).unwrap();
        fs::write(root.join("a.txt"), "alpha").unwrap();
        fs::write(root.join("dir").join("b.txt"), "bravo").unwrap();

        let collector = ResultCollector::new(output.path(), "archive:unzip");
        let files = collector.collect(&root, &sample_input()).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].original_path, "a.txt");
        assert_eq!(files[1].original_path, "dir/b.txt");
        assert_eq!(files[1].display_name, "b.txt");
        assert!(files.iter().all(|f| f.data_type == "archive:unzip:file"));
        assert!(files.iter().all(|f| f.source_file_id == "abc"));

        assert_eq!(fs::read_to_string(&files[1].path).unwrap(), "bravo");
        assert_eq!(files[1].path.parent(), Some(output.path()));
        assert!(!root.join("a.txt").exists());
    }

    #[test]
    fn test_empty_extraction_is_fatal_by_default() {
        let output = TempDir::new().unwrap();
        let root = output.path().join("files");
        fs::create_dir_all(root.join("empty-dir")).unwrap();

        let collector = ResultCollector::new(output.path(), "archive:unzip");
        let result = collector.collect(&root, &sample_input());
        match result {
            Err(WorkerError::NoFilesExtracted { archive }) => assert_eq!(archive, "sample.zip"),
            other => panic!("expected NoFilesExtracted, got {:?}", other),
        }

        let lenient = ResultCollector::new(output.path(), "archive:unzip").with_fail_on_empty(false);
        assert!(lenient.collect(&root, &sample_input()).unwrap().is_empty());
    }

    #[test]
    fn test_failed_move_removes_files_already_moved() {
        let output = TempDir::new().unwrap();
        let root = output.path().join("files");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.txt"), "alpha").unwrap();

        let collector = ResultCollector::new(output.path(), "archive:unzip");
        let input = sample_input();
        let first = OutputFile::new(output.path(), "a.txt", "a.txt", "archive:unzip:file", &input.id);
        let second = OutputFile::new(output.path(), "b.txt", "b.txt", "archive:unzip:file", &input.id);
        let first_dest = first.path.clone();

        let result = collector.relocate(vec![
            (root.join("a.txt"), first),
            (root.join("vanished.txt"), second),
        ]);

        assert!(matches!(result, Err(WorkerError::InvalidPath { .. })));
        assert!(!first_dest.exists());
        let leftovers: Vec<_> = fs::read_dir(output.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_file())
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_collect_log() {
        let output = TempDir::new().unwrap();
        let collector = ResultCollector::new(output.path(), "archive:7zip");

        let empty_log = output.path().join("empty.log");
        fs::write(&empty_log, "").unwrap();
        assert!(collector.collect_log(&empty_log, &sample_input()).unwrap().is_none());
        assert!(!empty_log.exists());

        let missing = output.path().join("missing.log");
        assert!(collector.collect_log(&missing, &sample_input()).unwrap().is_none());

        let log = output.path().join("run.log");
        fs::write(&log, "Everything is Ok\n").unwrap();
        let descriptor = collector.collect_log(&log, &sample_input()).unwrap().unwrap();

        assert_eq!(descriptor.display_name, "sample.zip.log");
        assert_eq!(descriptor.data_type, "archive:7zip:log");
        assert_eq!(descriptor.extension, "log");
        assert_eq!(fs::read_to_string(&descriptor.path).unwrap(), "Everything is Ok\n");
    }
}
