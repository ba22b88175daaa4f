use crate::error::{Result, WorkerError};
use crate::extractor::{ExtractorKind, WaitMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub extractor: ExtractorConfig,
    pub task: TaskConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(from = "ExtractorConfigFile")]
pub struct ExtractorConfig {
    pub kind: ExtractorKind,
    pub overwrite: bool,
    pub unzip: BinaryConfig,
    pub sevenzip: BinaryConfig,
}

/// Location and behaviour of one extraction binary.
#[derive(Debug, Clone, Serialize)]
pub struct BinaryConfig {
    pub path: PathBuf,
    pub wait: WaitMode,
    pub data_type: String,
}

/// `[extractor]` as written in a file. Every key is optional and anything
/// left out keeps the default for that extractor kind.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExtractorConfigFile {
    kind: Option<ExtractorKind>,
    overwrite: Option<bool>,
    unzip: BinaryConfigFile,
    sevenzip: BinaryConfigFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BinaryConfigFile {
    path: Option<PathBuf>,
    wait: Option<WaitMode>,
    data_type: Option<String>,
}

impl BinaryConfigFile {
    fn apply_to(self, binary: &mut BinaryConfig) {
        if let Some(path) = self.path {
            binary.path = path;
        }
        if let Some(wait) = self.wait {
            binary.wait = wait;
        }
        if let Some(data_type) = self.data_type {
            binary.data_type = data_type;
        }
    }
}

impl From<ExtractorConfigFile> for ExtractorConfig {
    fn from(file: ExtractorConfigFile) -> Self {
        let mut config = Self::default();
        if let Some(kind) = file.kind {
            config.kind = kind;
        }
        if let Some(overwrite) = file.overwrite {
            config.overwrite = overwrite;
        }
        file.unzip.apply_to(&mut config.unzip);
        file.sevenzip.apply_to(&mut config.sevenzip);
        config
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TaskConfig {
    pub poll_interval_ms: u64,
    pub timeout: u64,
    pub fail_on_empty: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub base_directory: PathBuf,
    pub keep_logs: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            kind: ExtractorKind::Unzip,
            overwrite: true,
            unzip: BinaryConfig {
                path: PathBuf::from("unzip"),
                wait: WaitMode::Block,
                data_type: "archive:unzip".to_string(),
            },
            sevenzip: BinaryConfig {
                path: PathBuf::from("7zz"),
                wait: WaitMode::Poll,
                data_type: "archive:7zip".to_string(),
            },
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            timeout: 3600, // 1 hour
            fail_on_empty: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            keep_logs: true,
        }
    }
}

impl ExtractorConfig {
    pub fn binary(&self, kind: ExtractorKind) -> &BinaryConfig {
        match kind {
            ExtractorKind::Unzip => &self.unzip,
            ExtractorKind::SevenZip => &self.sevenzip,
        }
    }

    pub fn binary_mut(&mut self, kind: ExtractorKind) -> &mut BinaryConfig {
        match kind {
            ExtractorKind::Unzip => &mut self.unzip,
            ExtractorKind::SevenZip => &mut self.sevenzip,
        }
    }

    pub fn active(&self) -> &BinaryConfig {
        self.binary(self.kind)
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(WorkerError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| WorkerError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| WorkerError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["archive-worker.toml", ".archive-worker.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(kind) = cli_args.extractor {
            self.extractor.kind = kind;
        }

        if let Some(ref binary) = cli_args.binary {
            let kind = self.extractor.kind;
            self.extractor.binary_mut(kind).path = binary.clone();
        }

        if let Some(wait) = cli_args.wait {
            let kind = self.extractor.kind;
            self.extractor.binary_mut(kind).wait = wait;
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.output.base_directory = output_dir.clone();
        }

        if let Some(timeout) = cli_args.timeout {
            self.task.timeout = timeout;
        }

        if let Some(interval) = cli_args.poll_interval_ms {
            self.task.poll_interval_ms = interval;
        }

        if cli_args.allow_empty {
            self.task.fail_on_empty = false;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| WorkerError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| WorkerError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for kind in [ExtractorKind::Unzip, ExtractorKind::SevenZip] {
            let binary = self.extractor.binary(kind);
            if binary.path.as_os_str().is_empty() {
                return Err(WorkerError::Config {
                    message: format!("Binary path for {} must not be empty", kind),
                });
            }
            if binary.data_type.trim().is_empty() {
                return Err(WorkerError::Config {
                    message: format!("Data type prefix for {} must not be empty", kind),
                });
            }
        }

        if self.task.poll_interval_ms == 0 {
            return Err(WorkerError::Config {
                message: "Poll interval must be greater than 0".to_string(),
            });
        }

        if self.task.timeout == 0 {
            return Err(WorkerError::Config {
                message: "Extraction timeout must be greater than 0".to_string(),
            });
        }

        if let Some(parent) = self.output.base_directory.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(WorkerError::Config {
                    message: format!("Parent directory does not exist: {}", parent.display()),
                });
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.task.poll_interval_ms)
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.task.timeout)
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub extractor: Option<ExtractorKind>,
    pub binary: Option<PathBuf>,
    pub wait: Option<WaitMode>,
    pub output_dir: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub allow_empty: bool,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extractor(mut self, extractor: Option<ExtractorKind>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_binary(mut self, binary: Option<PathBuf>) -> Self {
        self.binary = binary;
        self
    }

    pub fn with_wait(mut self, wait: Option<WaitMode>) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval_ms: Option<u64>) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    pub fn with_allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }
}
