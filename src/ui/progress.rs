use crate::extractor::TaskProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    /// Spinner shown while an extractor process runs. The position counts
    /// liveness ticks.
    pub fn create_extraction_spinner(&self, archives: usize) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.set_message(match archives {
            1 => "Extracting 1 archive...".to_string(),
            n => format!("Extracting {} archives...", n),
        });
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn clear(&self) {
        if self.enabled {
            self.multi_progress.clear().ok();
        }
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

pub fn update_task_progress(pb: &ProgressBar, progress: &TaskProgress) {
    pb.set_position(progress.tick);
    pb.set_message(format!(
        "Extractor running for {}",
        format_duration(progress.elapsed)
    ));
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::TASK_PROGRESS_EVENT;

    #[test]
    fn test_disabled_progress_bars() {
        let manager = ProgressManager::new(false);
        assert!(manager.create_extraction_spinner(2).is_hidden());
        manager.clear();
    }

    #[test]
    fn test_task_progress_updates_spinner() {
        let manager = ProgressManager::new(true);
        let pb = manager.create_extraction_spinner(1);

        update_task_progress(
            &pb,
            &TaskProgress {
                event: TASK_PROGRESS_EVENT,
                tick: 3,
                elapsed: Duration::from_secs(3),
            },
        );

        assert_eq!(pb.position(), 3);
        assert_eq!(pb.message(), "Extractor running for 3s");
        finish_progress_with_summary(&pb, "Extracted 2 files", Duration::from_secs(3));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
    }
}
