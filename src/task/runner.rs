use crate::collector::{discard_outputs, ResultCollector};
use crate::config::Config;
use crate::error::{Result, WorkerError};
use crate::extractor::{ExtractorInvoker, ProcessMonitor};
use crate::task::{payload, InputFile, OutputFile, ScratchDirectory, TaskRequest, TaskResult};
use std::fs;
use std::path::Path;

/// Runs one extraction task: every input archive is extracted into its own
/// scratch directory and its files are collected into the output directory.
pub struct TaskRunner {
    invoker: ExtractorInvoker,
    data_type_prefix: String,
    fail_on_empty: bool,
    keep_logs: bool,
}

impl TaskRunner {
    pub fn new<S: Into<String>>(invoker: ExtractorInvoker, data_type_prefix: S) -> Self {
        Self {
            invoker,
            data_type_prefix: data_type_prefix.into(),
            fail_on_empty: true,
            keep_logs: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let kind = config.extractor.kind;
        let binary = config.extractor.active();

        let invoker = ExtractorInvoker::new(kind, &binary.path)
            .with_wait(binary.wait)
            .with_overwrite(config.extractor.overwrite)
            .with_monitor(Self::monitor_for(config));

        Self::new(invoker, &binary.data_type)
            .with_fail_on_empty(config.task.fail_on_empty)
            .with_keep_logs(config.output.keep_logs)
    }

    /// A process monitor carrying the configured tick interval and timeout.
    pub fn monitor_for(config: &Config) -> ProcessMonitor {
        ProcessMonitor::new()
            .with_poll_interval(config.poll_interval())
            .with_timeout(config.timeout_duration())
    }

    pub fn with_monitor(mut self, monitor: ProcessMonitor) -> Self {
        self.invoker = self.invoker.with_monitor(monitor);
        self
    }

    pub fn with_fail_on_empty(mut self, fail_on_empty: bool) -> Self {
        self.fail_on_empty = fail_on_empty;
        self
    }

    pub fn with_keep_logs(mut self, keep_logs: bool) -> Self {
        self.keep_logs = keep_logs;
        self
    }

    pub fn invoker(&self) -> &ExtractorInvoker {
        &self.invoker
    }

    pub fn run(&self, request: &TaskRequest) -> Result<TaskResult> {
        let inputs = payload::get_input_files(request.pipe_result.as_deref(), &request.input_files)?;
        self.validate_inputs(&inputs)?;

        for key in request.task_config.keys() {
            tracing::debug!(option = %key, "ignoring unrecognized task option");
        }

        let output_path = request.output_path.as_path();
        fs::create_dir_all(output_path).map_err(|e| WorkerError::DirectoryCreation {
            path: output_path.display().to_string(),
            source: e,
        })?;

        let mut output_files = Vec::new();
        for input in &inputs {
            let collected = if self.invoker.monitor().is_running() {
                self.process_archive(input, output_path)
            } else {
                Err(WorkerError::Cancelled)
            };

            match collected {
                Ok(files) => output_files.extend(files),
                Err(e) => {
                    // A failed task reports nothing, so nothing it moved may stay behind.
                    discard_outputs(&output_files);
                    return Err(e);
                }
            }
        }

        let files_extracted = output_files
            .iter()
            .filter(|f| !f.data_type.ends_with(":log"))
            .count();
        tracing::info!(
            archives = inputs.len(),
            files = files_extracted,
            output = %output_path.display(),
            "extraction task finished"
        );

        Ok(TaskResult::new(
            output_files,
            request.workflow_id.clone(),
            self.invoker.base_command_string(),
        )
        .with_meta("extractor", self.invoker.kind().name())
        .with_meta("archives", inputs.len())
        .with_meta("files_extracted", files_extracted)
        .with_meta("finished_at", chrono::Utc::now().to_rfc3339()))
    }

    /// Reject the whole batch before any extractor is spawned.
    pub fn validate_inputs(&self, inputs: &[InputFile]) -> Result<()> {
        if inputs.is_empty() {
            return Err(WorkerError::InvalidInput {
                path: String::new(),
                reason: "no input files were provided".to_string(),
            });
        }

        for input in inputs {
            if input.path.trim().is_empty() {
                return Err(WorkerError::InvalidInput {
                    path: String::new(),
                    reason: format!("input {} has no path", input.name()),
                });
            }

            let path = Path::new(&input.path);
            if let Some(required) = self.invoker.kind().required_extension() {
                let matches = path
                    .extension()
                    .map(|e| e.to_string_lossy().eq_ignore_ascii_case(required))
                    .unwrap_or(false);
                if !matches {
                    return Err(WorkerError::InvalidInput {
                        path: input.path.clone(),
                        reason: format!("expected a .{} archive", required),
                    });
                }
            }

            if !path.is_file() {
                return Err(WorkerError::InvalidInput {
                    path: input.path.clone(),
                    reason: "file does not exist".to_string(),
                });
            }
        }

        Ok(())
    }

    fn process_archive(&self, input: &InputFile, output_path: &Path) -> Result<Vec<OutputFile>> {
        let scratch = ScratchDirectory::create_in(output_path)?;
        tracing::debug!(archive = %input.name(), scratch = %scratch.path().display(), "extracting archive");

        let outcome = self
            .invoker
            .extract(Path::new(&input.path), scratch.extract_path(), scratch.log_path())
            .map_err(|e| {
                if let WorkerError::Timeout { limit } = &e {
                    if let Some(tail) = log_tail(scratch.log_path(), LOG_TAIL_LINES) {
                        tracing::warn!(archive = %input.name(), ?limit, output = %tail, "extractor output before timeout");
                    }
                }
                e
            })?;

        let collector = ResultCollector::new(output_path, self.data_type_prefix.as_str())
            .with_fail_on_empty(self.fail_on_empty);
        let mut files = collector.collect(scratch.extract_path(), input)?;

        if let Some(log_path) = outcome.log_path.filter(|_| self.keep_logs) {
            if let Some(log) = collector.collect_log(&log_path, input)? {
                files.push(log);
            }
        }

        scratch.close()?;
        Ok(files)
    }
}

const LOG_TAIL_LINES: usize = 20;

/// Last `lines` lines of a captured extractor log, if it has any content.
fn log_tail(log_path: &Path, lines: usize) -> Option<String> {
    let content = fs::read_to_string(log_path).ok()?;
    let all: Vec<&str> = content.lines().collect();
    if all.is_empty() {
        return None;
    }
    Some(all[all.len().saturating_sub(lines)..].join("\n"))
}
