pub mod metadata;
pub mod model;
pub mod payload;
pub mod runner;
pub mod scratch;

pub use metadata::{task_metadata, TaskConfigOption, TaskMetadata, TASK_NAME};
pub use model::{InputFile, OutputFile, TaskRequest, TaskResult};
pub use payload::{decode_pipe_result, encode_task_result, get_input_files};
pub use runner::TaskRunner;
pub use scratch::ScratchDirectory;
