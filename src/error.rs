use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input file: {path} ({reason})")]
    InvalidInput { path: String, reason: String },

    #[error("Extraction failed for {archive}: {stderr}")]
    ExtractionProcess {
        archive: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("No files were extracted from the archive: {archive}")]
    NoFilesExtracted { archive: String },

    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch extractor: {program}")]
    ProcessSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pipeline payload: {message}")]
    Payload { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Operation timed out after {limit:?}")]
    Timeout { limit: std::time::Duration },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for WorkerError {
    fn user_message(&self) -> String {
        match self {
            WorkerError::InvalidInput { path, reason } => {
                if path.is_empty() {
                    format!("Invalid input: {}", reason)
                } else {
                    format!("Invalid input file {}: {}", path, reason)
                }
            }
            WorkerError::ExtractionProcess {
                archive,
                code,
                stderr,
            } => {
                let code = code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                if stderr.is_empty() {
                    format!("Extractor exited with {} for {}", code, archive)
                } else {
                    format!("Extractor exited with {} for {}: {}", code, archive, stderr)
                }
            }
            WorkerError::NoFilesExtracted { archive } => {
                format!("No files were extracted from {}", archive)
            }
            WorkerError::DirectoryCreation { path, source } => {
                format!("Could not create directory {}: {}", path, source)
            }
            WorkerError::ProcessSpawn { program, source } => {
                format!("Could not start {}: {}", program, source)
            }
            WorkerError::Payload { message } => {
                format!("Could not decode pipeline payload: {}", message)
            }
            WorkerError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            WorkerError::Cancelled => "Operation was cancelled by user".to_string(),
            WorkerError::Timeout { limit } => {
                format!("Extraction timed out after {:?}", limit)
            }
            WorkerError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            WorkerError::InvalidInput { .. } => Some(
                "Check that every input path exists and, when extracting with unzip, ends in .zip. Use --extractor 7zip for other formats.".to_string()
            ),
            WorkerError::ExtractionProcess { .. } => Some(
                "The archive may be corrupt, encrypted or split into volumes. Try opening it manually with the same extractor.".to_string()
            ),
            WorkerError::NoFilesExtracted { .. } => Some(
                "The archive appears to be empty. Pass --allow-empty or set fail_on_empty = false in the [task] section to accept empty archives.".to_string()
            ),
            WorkerError::ProcessSpawn { .. } => Some(
                "Install the extractor or point extractor.unzip.path / extractor.sevenzip.path at the binary in your configuration file.".to_string()
            ),
            WorkerError::Payload { .. } => Some(
                "The --pipe-result value must be the base64 output of a previous task (see --output-format pipeline).".to_string()
            ),
            WorkerError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            WorkerError::DirectoryCreation { .. } => Some(
                "Ensure you have the necessary write permissions for the output directory.".to_string()
            ),
            WorkerError::Timeout { .. } => Some(
                "The extractor took longer than expected. Increase the limit with --timeout.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for WorkerError {
    fn from(error: toml::de::Error) -> Self {
        WorkerError::Config {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for WorkerError {
    fn from(error: serde_json::Error) -> Self {
        WorkerError::Payload {
            message: error.to_string(),
        }
    }
}

impl From<base64::DecodeError> for WorkerError {
    fn from(error: base64::DecodeError) -> Self {
        WorkerError::Payload {
            message: format!("not valid base64: {}", error),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
