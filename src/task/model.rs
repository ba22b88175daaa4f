use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// An archive handed to the worker by the pipeline.
///
/// Upstream output-file objects carry more fields than this; they are ignored
/// so a previous task's output can be fed in unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    pub path: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub id: String,
}

impl InputFile {
    pub fn new<P: Into<String>, N: Into<String>, I: Into<String>>(path: P, display_name: N, id: I) -> Self {
        Self {
            path: path.into(),
            display_name: display_name.into(),
            id: id.into(),
        }
    }

    /// Build a descriptor for a local archive, naming it after its file name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        Self {
            path: path.display().to_string(),
            display_name: base_name(path),
            id: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Display name, falling back to the path's last segment.
    pub fn name(&self) -> String {
        if self.display_name.is_empty() {
            base_name(Path::new(&self.path))
        } else {
            self.display_name.clone()
        }
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One file produced by the task, handed over to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    pub id: String,
    pub display_name: String,
    pub extension: String,
    pub data_type: String,
    pub path: PathBuf,
    pub original_path: String,
    pub source_file_id: String,
}

impl OutputFile {
    /// Allocate a managed location `<output_path>/<uuid>[.ext]` for a file.
    pub fn new(
        output_path: &Path,
        display_name: &str,
        original_path: &str,
        data_type: &str,
        source_file_id: &str,
    ) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        let extension = Path::new(display_name)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file_name = if extension.is_empty() {
            id.clone()
        } else {
            format!("{}.{}", id, extension)
        };

        Self {
            path: output_path.join(file_name),
            id,
            display_name: display_name.to_string(),
            extension,
            data_type: data_type.to_string(),
            original_path: original_path.to_string(),
            source_file_id: source_file_id.to_string(),
        }
    }
}

/// Terminal artifact of one task invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub output_files: Vec<OutputFile>,
    pub workflow_id: Option<String>,
    pub command: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl TaskResult {
    pub fn new(output_files: Vec<OutputFile>, workflow_id: Option<String>, command: String) -> Self {
        Self {
            output_files,
            workflow_id,
            command,
            meta: Map::new(),
        }
    }

    pub fn with_meta<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Files extracted from archives, without extractor logs.
    pub fn extracted_files(&self) -> impl Iterator<Item = &OutputFile> {
        self.output_files
            .iter()
            .filter(|f| !f.data_type.ends_with(":log"))
    }
}

/// Everything one task invocation needs from its caller.
#[derive(Debug, Clone, Default)]
pub struct TaskRequest {
    pub input_files: Vec<InputFile>,
    pub pipe_result: Option<String>,
    pub output_path: PathBuf,
    pub workflow_id: Option<String>,
    pub task_config: Map<String, Value>,
}

impl TaskRequest {
    pub fn new<P: Into<PathBuf>>(output_path: P) -> Self {
        Self {
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    pub fn with_input_files(mut self, input_files: Vec<InputFile>) -> Self {
        self.input_files = input_files;
        self
    }

    pub fn with_pipe_result<S: Into<String>>(mut self, pipe_result: Option<S>) -> Self {
        self.pipe_result = pipe_result.map(Into::into);
        self
    }

    pub fn with_workflow_id<S: Into<String>>(mut self, workflow_id: Option<S>) -> Self {
        self.workflow_id = workflow_id.map(Into::into);
        self
    }

    pub fn with_task_config(mut self, task_config: Map<String, Value>) -> Self {
        self.task_config = task_config;
        self
    }
}
