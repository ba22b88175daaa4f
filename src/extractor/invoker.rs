use crate::error::{Result, WorkerError};
use crate::extractor::{ExtractionCommand, ExtractorKind, ProcessMonitor, WaitMode};
use std::fs;
use std::path::{Path, PathBuf};

/// What a finished extractor run left behind.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub command: ExtractionCommand,
    pub exit_code: Option<i32>,
    /// Captured stdout/stderr, present in poll mode only.
    pub log_path: Option<PathBuf>,
}

/// Runs the configured extraction binary against one archive at a time.
pub struct ExtractorInvoker {
    kind: ExtractorKind,
    program: PathBuf,
    wait: WaitMode,
    overwrite: bool,
    monitor: ProcessMonitor,
}

impl ExtractorInvoker {
    pub fn new<P: Into<PathBuf>>(kind: ExtractorKind, program: P) -> Self {
        Self {
            kind,
            program: program.into(),
            wait: WaitMode::Block,
            overwrite: true,
            monitor: ProcessMonitor::new(),
        }
    }

    pub fn with_wait(mut self, wait: WaitMode) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_monitor(mut self, monitor: ProcessMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn kind(&self) -> ExtractorKind {
        self.kind
    }

    pub fn wait_mode(&self) -> WaitMode {
        self.wait
    }

    pub fn monitor(&self) -> &ProcessMonitor {
        &self.monitor
    }

    pub fn command_for(&self, archive: &Path, destination: &Path) -> ExtractionCommand {
        ExtractionCommand::new(self.kind, &self.program, archive, destination)
            .with_overwrite(self.overwrite)
    }

    /// Base command string reported in task results.
    pub fn base_command_string(&self) -> String {
        self.command_for(Path::new(""), Path::new("")).base_command_string()
    }

    /// Extract `archive` into `destination`. In poll mode the extractor's
    /// output goes to `log_path`.
    pub fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        log_path: &Path,
    ) -> Result<ExtractionOutcome> {
        ensure_destination(destination)?;

        let command = self.command_for(archive, destination);
        tracing::info!(command = %command.invocation_string(), mode = ?self.wait, "running extractor");

        match self.wait {
            WaitMode::Poll => {
                let status = self.monitor.run_polling(&command, log_path)?;
                if !status.success() {
                    tracing::warn!(
                        archive = %archive.display(),
                        %status,
                        "extractor reported a non-zero exit status"
                    );
                }

                Ok(ExtractionOutcome {
                    command,
                    exit_code: status.code(),
                    log_path: Some(log_path.to_path_buf()),
                })
            }
            WaitMode::Block => {
                let (status, stderr) = self.monitor.run_captured(&command)?;
                let stderr = stderr.trim().to_string();

                if !status.success() {
                    if !self.kind.is_warning_exit(status.code()) {
                        return Err(WorkerError::ExtractionProcess {
                            archive: archive.display().to_string(),
                            code: status.code(),
                            stderr,
                        });
                    }
                    tracing::warn!(
                        archive = %archive.display(),
                        %status,
                        stderr = %stderr,
                        "extractor finished with warnings"
                    );
                }

                Ok(ExtractionOutcome {
                    command,
                    exit_code: status.code(),
                    log_path: None,
                })
            }
        }
    }
}

fn ensure_destination(destination: &Path) -> Result<()> {
    if destination.is_dir() {
        return Ok(());
    }

    if destination.exists() {
        return Err(WorkerError::DirectoryCreation {
            path: destination.display().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "destination exists and is not a directory",
            ),
        });
    }

    fs::create_dir_all(destination).map_err(|e| WorkerError::DirectoryCreation {
        path: destination.display().to_string(),
        source: e,
    })
}
