pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod extractor;
pub mod scanner;
pub mod task;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ExtractorConfig, OutputConfig, TaskConfig};
pub use error::{Result, UserFriendlyError, WorkerError};

// Core functionality re-exports
pub use collector::{FileMover, ResultCollector};
pub use extractor::{
    ExtractionCommand, ExtractorInvoker, ExtractorKind, ProcessMonitor, TaskProgress, WaitMode,
};
pub use scanner::{ExtractedFile, ExtractedScanner};
pub use task::{
    encode_task_result, get_input_files, task_metadata, InputFile, OutputFile, TaskMetadata,
    TaskRequest, TaskResult, TaskRunner,
};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use std::path::Path;
use std::time::Instant;
use tokio::task as tokio_task;

/// Main library interface: runs extraction tasks with progress, cancellation
/// and user-facing output wired in.
pub struct ArchiveWorker {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl ArchiveWorker {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create an ArchiveWorker for testing (no signal handler conflicts)
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
            OutputFormat::Pipeline => OutputMode::Pipeline,
        };

        Self::new(config, output_mode, cli_args.verbosity_level(), cli_args.quiet)
    }

    /// Extract every archive of `request` and report the produced files.
    pub async fn run_task(&self, request: TaskRequest) -> Result<TaskResult> {
        self.shutdown.check_shutdown()?;

        let request = self.resolve_inputs(request)?;
        let archives = request.input_files.len();
        self.output_formatter.start_operation(&format!(
            "Extracting {} archive(s) with {}",
            archives, self.config.extractor.kind
        ));

        let spinner = self.progress_manager.create_extraction_spinner(archives);
        let progress_callback = {
            let pb = spinner.clone();
            move |progress: TaskProgress| {
                ui::progress::update_task_progress(&pb, &progress);
            }
        };

        let monitor = TaskRunner::monitor_for(&self.config)
            .with_progress(progress_callback)
            .with_cancel_flag(self.shutdown.cancel_flag());
        let runner = TaskRunner::from_config(&self.config).with_monitor(monitor);

        let start_time = Instant::now();
        let outcome = tokio_task::spawn_blocking(move || runner.run(&request))
            .await
            .map_err(|e| WorkerError::Config {
                message: format!("Extraction task failed: {}", e),
            })?;

        match outcome {
            Ok(result) => {
                let extracted = result.extracted_files().count();
                ui::progress::finish_progress_with_summary(
                    &spinner,
                    &format!("Extracted {} files", extracted),
                    start_time.elapsed(),
                );
                self.output_formatter.success(&format!(
                    "Extracted {} files into {}",
                    extracted,
                    self.config.output.base_directory.display()
                ));
                if extracted == 0 {
                    self.output_formatter
                        .warning("No files were extracted; every archive was empty");
                }
                self.output_formatter
                    .debug(&format!("Reported command: {}", result.command));
                Ok(result)
            }
            Err(e) => {
                spinner.abandon_with_message("Extraction failed");
                Err(e)
            }
        }
    }

    /// Validate the request and list the extractor invocations it would run.
    pub fn plan(&self, request: TaskRequest) -> Result<Vec<ExtractionCommand>> {
        let request = self.resolve_inputs(request)?;
        let runner = TaskRunner::from_config(&self.config);
        runner.validate_inputs(&request.input_files)?;

        let destination = request.output_path.join("extract_*").join("files");
        Ok(request
            .input_files
            .iter()
            .map(|input| runner.invoker().command_for(Path::new(&input.path), &destination))
            .collect())
    }

    /// Decode any upstream payload once so the task sees a plain input list.
    fn resolve_inputs(&self, request: TaskRequest) -> Result<TaskRequest> {
        let input_files = get_input_files(request.pipe_result.as_deref(), &request.input_files)?;
        Ok(TaskRequest {
            input_files,
            pipe_result: None,
            ..request
        })
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        Config::default().save_to_file(output_path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress_manager
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub fn handle_error(&self, error: &WorkerError) {
        self.progress_manager.clear();
        self.output_formatter.print_user_friendly_error(error);
    }
}

pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "archive-worker {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        ArchiveWorker::generate_sample_config(&config_path).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[extractor]"));
        assert!(content.contains("[task]"));
        assert!(content.contains("[output]"));
    }

    #[test]
    fn test_build_info_display() {
        let build_info = build_info();
        assert!(!version_info().is_empty());
        assert!(build_info.to_string().contains("archive-worker"));
        assert!(build_info.to_string().contains(build_info.version));
    }

    #[test]
    fn test_plan_validates_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("sample.zip");
        fs::write(&archive, "PK").unwrap();

        let worker = ArchiveWorker::new_for_test(Config::default(), OutputMode::Plain, 0, true);

        let request = TaskRequest::new(temp_dir.path().join("out"))
            .with_input_files(vec![InputFile::from_path(&archive)]);
        let commands = worker.plan(request).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].archive(), archive.as_path());

        let request = TaskRequest::new(temp_dir.path().join("out"))
            .with_input_files(vec![InputFile::from_path(temp_dir.path().join("notes.rar"))]);
        assert!(matches!(worker.plan(request), Err(WorkerError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_task() {
        let worker = ArchiveWorker::new_for_test(Config::default(), OutputMode::Plain, 0, true);
        assert!(worker.is_running());

        worker.request_shutdown();
        assert!(!worker.is_running());

        let result = worker.run_task(TaskRequest::new("/tmp/unused")).await;
        assert!(matches!(result, Err(WorkerError::Cancelled)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_task_with_fake_extractor() {
        use crate::extractor::testing::{fake_extractor, FakeBehaviour};

        let tools = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let archive = work.path().join("sample.zip");
        fs::write(&archive, "PK").unwrap();
        let output = work.path().join("out");

        let mut config = Config::default();
        config.extractor.unzip.path = fake_extractor(tools.path(), FakeBehaviour::TwoFiles);
        config.output.base_directory = output.clone();

        let worker = ArchiveWorker::new_for_test(config, OutputMode::Plain, 0, true);
        let request = TaskRequest::new(&output)
            .with_input_files(vec![InputFile::from_path(&archive)])
            .with_workflow_id(Some("wf-7"));

        let result = worker.run_task(request).await.unwrap();
        assert_eq!(result.command, "unzip -o");
        assert_eq!(result.output_files.len(), 2);
        assert_eq!(result.workflow_id.as_deref(), Some("wf-7"));
        assert!(result.output_files.iter().all(|f| f.path.starts_with(&output)));
    }
}
