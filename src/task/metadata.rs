use serde::Serialize;

/// Name the task is registered and routed under.
pub const TASK_NAME: &str = "archive-worker.tasks.extract";

#[derive(Debug, Clone, Serialize)]
pub struct TaskConfigOption {
    pub name: String,
    pub label: String,
    pub description: String,
}

/// Registration data published to the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct TaskMetadata {
    pub name: &'static str,
    pub display_name: String,
    pub description: String,
    pub task_config: Vec<TaskConfigOption>,
}

pub fn task_metadata() -> TaskMetadata {
    TaskMetadata {
        name: TASK_NAME,
        display_name: "Extract archive".to_string(),
        description: "Extract files from ZIP archives with unzip, or any 7-Zip supported archive"
            .to_string(),
        // No user options are recognized yet.
        task_config: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_serializes() {
        let json = serde_json::to_value(task_metadata()).unwrap();
        assert_eq!(json["name"], TASK_NAME);
        assert!(json["task_config"].as_array().unwrap().is_empty());
    }
}
