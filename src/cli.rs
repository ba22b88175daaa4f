use crate::config::{CliOverrides, Config};
use crate::error::{Result, WorkerError};
use crate::extractor::{ExtractorKind, WaitMode};
use crate::task::{InputFile, TaskRequest};
use clap::{Parser, ValueEnum};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "archive-worker")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract archives for a processing pipeline")]
#[command(
    long_about = "archive-worker runs unzip or 7-Zip on each input archive, moves every \
                  extracted file into the output directory under a generated name and \
                  reports the files as a task result for the next pipeline step."
)]
#[command(after_help = "EXAMPLES:\n  \
    archive-worker evidence.zip -o ./out\n  \
    archive-worker bundle.7z --extractor 7zip -o ./out --output-format json\n  \
    archive-worker --pipe-result \"$PREVIOUS\" -o ./out --output-format pipeline\n  \
    archive-worker --input-files inputs.json --workflow-id wf-42 -o ./out")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Archives to extract
    pub archives: Vec<PathBuf>,

    /// JSON file holding an array of input file descriptors
    #[arg(long, value_name = "FILE")]
    pub input_files: Option<PathBuf>,

    /// Base64 result of the previous pipeline task (takes precedence over other inputs)
    #[arg(long, env = "ARCHIVE_WORKER_PIPE_RESULT", hide_env_values = true)]
    pub pipe_result: Option<String>,

    /// Directory receiving the extracted files
    #[arg(short, long, value_name = "DIR")]
    pub output_path: Option<PathBuf>,

    /// Workflow identifier echoed in the task result
    #[arg(long)]
    pub workflow_id: Option<String>,

    /// Task options as a JSON object
    #[arg(long, value_name = "JSON", value_parser = parse_task_config)]
    pub task_config: Option<Map<String, Value>>,

    /// Extraction tool to run
    #[arg(short, long, value_enum)]
    pub extractor: Option<ExtractorKind>,

    /// Path to the extraction binary
    #[arg(long, value_name = "PATH")]
    pub binary: Option<PathBuf>,

    /// How to wait for the extractor process
    #[arg(long, value_enum)]
    pub wait: Option<WaitMode>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Extractor timeout in seconds
    #[arg(long, help = "Kill the extractor after this many seconds")]
    pub timeout: Option<u64>,

    /// Poll interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub poll_interval: Option<u64>,

    /// Succeed even when an archive yields no files
    #[arg(long)]
    pub allow_empty: bool,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be done without executing)
    #[arg(long, help = "Validate inputs and show the extraction plan without running it")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,

    /// Print the task registration metadata as JSON
    #[arg(long)]
    pub task_metadata: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
    /// Base64 task result for the next pipeline step
    Pipeline,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_extractor(self.extractor)
            .with_binary(self.binary.clone())
            .with_wait(self.wait)
            .with_output_dir(self.output_path.clone())
            .with_timeout(self.timeout)
            .with_poll_interval(self.poll_interval)
            .with_allow_empty(self.allow_empty)
    }

    /// Assemble the task request from the command line and the merged config.
    pub fn build_request(&self, config: &Config) -> Result<TaskRequest> {
        let mut input_files: Vec<InputFile> = self.archives.iter().map(InputFile::from_path).collect();

        if let Some(ref list) = self.input_files {
            input_files.extend(load_input_files(list)?);
        }

        Ok(TaskRequest::new(config.output.base_directory.clone())
            .with_input_files(input_files)
            .with_pipe_result(self.pipe_result.clone())
            .with_workflow_id(self.workflow_id.clone())
            .with_task_config(self.task_config.clone().unwrap_or_default()))
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

pub fn load_input_files(path: &Path) -> Result<Vec<InputFile>> {
    let content = std::fs::read_to_string(path).map_err(|e| WorkerError::InvalidInput {
        path: path.display().to_string(),
        reason: format!("cannot read input list: {}", e),
    })?;

    serde_json::from_str(&content).map_err(|e| WorkerError::InvalidInput {
        path: path.display().to_string(),
        reason: format!("not a JSON array of input files: {}", e),
    })
}

pub fn parse_task_config(s: &str) -> std::result::Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("Task config must be a JSON object".to_string()),
        Err(e) => Err(format!("Invalid JSON: {}", e)),
    }
}
