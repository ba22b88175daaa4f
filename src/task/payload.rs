//! Base64 JSON payloads passed between pipeline tasks.
//!
//! A task's result is handed to the next task as `base64(json(TaskResult))`.
//! The receiving task only needs the `output_files` array, whose entries it
//! reads as [`InputFile`]s.

use crate::error::{Result, WorkerError};
use crate::task::{InputFile, TaskResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PipeResult {
    #[serde(default)]
    output_files: Vec<InputFile>,
}

pub fn encode_task_result(result: &TaskResult) -> Result<String> {
    let json = serde_json::to_vec(result)?;
    Ok(STANDARD.encode(json))
}

pub fn decode_pipe_result(payload: &str) -> Result<Vec<InputFile>> {
    let bytes = STANDARD.decode(payload.trim())?;
    let pipe_result: PipeResult = serde_json::from_slice(&bytes).map_err(|e| WorkerError::Payload {
        message: format!("not a task result: {}", e),
    })?;
    Ok(pipe_result.output_files)
}

/// The upstream payload wins over directly supplied files when present.
pub fn get_input_files(pipe_result: Option<&str>, input_files: &[InputFile]) -> Result<Vec<InputFile>> {
    match pipe_result.map(str::trim).filter(|p| !p.is_empty()) {
        Some(payload) => decode_pipe_result(payload),
        None => Ok(input_files.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::OutputFile;
    use std::path::Path;

    #[test]
    fn test_output_of_one_task_feeds_the_next() {
        let file = OutputFile::new(Path::new("/out"), "nested.zip", "inner/nested.zip", "archive:unzip:file", "abc");
        let result = TaskResult::new(vec![file.clone()], Some("wf".to_string()), "unzip -o".to_string());

        let payload = encode_task_result(&result).unwrap();
        let inputs = decode_pipe_result(&payload).unwrap();

        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].path, file.path.display().to_string());
        assert_eq!(inputs[0].display_name, "nested.zip");
        assert_eq!(inputs[0].id, file.id);
    }

    #[test]
    fn test_pipe_result_takes_precedence() {
        let payload = STANDARD.encode(r#"{"output_files": [{"path": "/up/a.zip", "display_name": "a.zip", "id": "1"}]}"#);
        let direct = vec![InputFile::new("/local/b.zip", "b.zip", "2")];

        let inputs = get_input_files(Some(&payload), &direct).unwrap();
        assert_eq!(inputs, vec![InputFile::new("/up/a.zip", "a.zip", "1")]);

        let inputs = get_input_files(Some("  "), &direct).unwrap();
        assert_eq!(inputs, direct);

        let inputs = get_input_files(None, &direct).unwrap();
        assert_eq!(inputs, direct);
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(matches!(
            decode_pipe_result("not base64!!"),
            Err(WorkerError::Payload { .. })
        ));

        let not_json = STANDARD.encode("plain text");
        assert!(matches!(
            decode_pipe_result(&not_json),
            Err(WorkerError::Payload { .. })
        ));
    }
}
