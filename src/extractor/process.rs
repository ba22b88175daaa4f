use crate::error::{Result, WorkerError};
use crate::extractor::ExtractionCommand;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::{Child, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Name of the liveness event emitted while an extractor is running.
pub const TASK_PROGRESS_EVENT: &str = "task-progress";

#[derive(Debug, Clone)]
pub struct TaskProgress {
    pub event: &'static str,
    pub tick: u64,
    pub elapsed: Duration,
}

impl TaskProgress {
    fn tick(tick: u64, elapsed: Duration) -> Self {
        Self {
            event: TASK_PROGRESS_EVENT,
            tick,
            elapsed,
        }
    }
}

/// Waits on extractor processes with a liveness tick, a bounded runtime and
/// cooperative cancellation.
pub struct ProcessMonitor {
    poll_interval: Duration,
    timeout: Duration,
    progress_callback: Option<Box<dyn Fn(TaskProgress) + Send + Sync>>,
    running: Arc<AtomicBool>,
}

impl ProcessMonitor {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(3600),
            progress_callback: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(TaskProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Share a cancellation flag, e.g. the one flipped by the Ctrl+C handler.
    pub fn with_cancel_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn cancel(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the command with stdout and stderr appended to `log_path` and
    /// poll it to completion.
    pub fn run_polling(&self, command: &ExtractionCommand, log_path: &Path) -> Result<ExitStatus> {
        let log = File::create(log_path)?;
        let log_err = log.try_clone()?;

        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|e| WorkerError::ProcessSpawn {
                program: command.program().display().to_string(),
                source: e,
            })?;

        self.wait(&mut child)
    }

    /// Spawn the command with stderr piped and wait for it under the same
    /// tick, timeout and cancellation rules as [`run_polling`]. Returns the
    /// exit status and the captured stderr.
    ///
    /// [`run_polling`]: ProcessMonitor::run_polling
    pub fn run_captured(&self, command: &ExtractionCommand) -> Result<(ExitStatus, String)> {
        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WorkerError::ProcessSpawn {
                program: command.program().display().to_string(),
                source: e,
            })?;

        // Read concurrently with the wait loop.
        let reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut captured = Vec::new();
                let _ = stderr.read_to_end(&mut captured);
                captured
            })
        });

        let status = self.wait(&mut child)?;
        let stderr = reader
            .and_then(|handle| handle.join().ok())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();

        Ok((status, stderr))
    }

    /// Poll `child` until it exits, invoking the progress callback once per
    /// tick. The child is killed on timeout or cancellation.
    pub fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let start_time = Instant::now();
        let mut tick = 0u64;

        loop {
            if let Some(status) = child.try_wait()? {
                tracing::debug!(ticks = tick, elapsed = ?start_time.elapsed(), %status, "extractor exited");
                return Ok(status);
            }

            if !self.is_running() {
                terminate(child);
                return Err(WorkerError::Cancelled);
            }

            if start_time.elapsed() > self.timeout {
                tracing::warn!(timeout = ?self.timeout, pid = child.id(), "killing extractor after timeout");
                terminate(child);
                return Err(WorkerError::Timeout {
                    limit: self.timeout,
                });
            }

            tick += 1;
            tracing::trace!(event = TASK_PROGRESS_EVENT, tick, "extractor still running");
            if let Some(ref callback) = self.progress_callback {
                callback(TaskProgress::tick(tick, start_time.elapsed()));
            }

            thread::sleep(self.poll_interval);
        }
    }
}

impl Default for ProcessMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;
    use std::sync::atomic::AtomicU64;

    fn sleeper(seconds: &str) -> Child {
        Command::new("sleep").arg(seconds).spawn().unwrap()
    }

    #[test]
    fn test_wait_reports_exit_status() {
        let monitor = ProcessMonitor::new().with_poll_interval(Duration::from_millis(10));
        let mut child = Command::new("sh").args(["-c", "exit 3"]).spawn().unwrap();

        let status = monitor.wait(&mut child).unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn test_progress_ticks_while_running() {
        let ticks = Arc::new(AtomicU64::new(0));
        let seen = ticks.clone();
        let monitor = ProcessMonitor::new()
            .with_poll_interval(Duration::from_millis(10))
            .with_progress(move |progress| {
                assert_eq!(progress.event, TASK_PROGRESS_EVENT);
                seen.store(progress.tick, Ordering::SeqCst);
            });

        let mut child = Command::new("sleep").arg("0.3").spawn().unwrap();
        let status = monitor.wait(&mut child).unwrap();

        assert!(status.success());
        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_timeout_kills_child() {
        let monitor = ProcessMonitor::new()
            .with_poll_interval(Duration::from_millis(10))
            .with_timeout(Duration::from_millis(100));
        let mut child = sleeper("30");

        let start = Instant::now();
        let result = monitor.wait(&mut child);

        assert!(matches!(result, Err(WorkerError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(child.try_wait().unwrap().is_some());
        if let Err(e) = result {
            assert_eq!(e.to_string(), "Operation timed out after 100ms");
        }
    }

    #[test]
    fn test_cancellation_stops_wait() {
        let monitor = ProcessMonitor::new().with_poll_interval(Duration::from_millis(10));
        monitor.cancel();
        assert!(!monitor.is_running());

        let mut child = sleeper("30");
        let result = monitor.wait(&mut child);
        assert!(matches!(result, Err(WorkerError::Cancelled)));
    }

    #[test]
    fn test_shared_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(true));
        let monitor = ProcessMonitor::new().with_cancel_flag(flag.clone());
        assert!(monitor.is_running());

        flag.store(false, Ordering::SeqCst);
        assert!(!monitor.is_running());
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let command = crate::extractor::ExtractionCommand::new(
            crate::extractor::ExtractorKind::Unzip,
            "/nonexistent/bin/unzip",
            "a.zip",
            "out",
        );
        let result = ProcessMonitor::new().run_captured(&command);
        assert!(matches!(result, Err(WorkerError::ProcessSpawn { .. })));
    }

    fn shell_command(dir: &Path, body: &str) -> ExtractionCommand {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("extractor.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        crate::extractor::ExtractionCommand::new(
            crate::extractor::ExtractorKind::Unzip,
            script,
            "a.zip",
            "out",
        )
    }

    #[test]
    fn test_captured_run_collects_stderr() {
        let dir = tempfile::TempDir::new().unwrap();
        let command = shell_command(dir.path(), "echo listing\necho 'bad CRC' >&2\nexit 2");
        let monitor = ProcessMonitor::new().with_poll_interval(Duration::from_millis(10));

        let (status, stderr) = monitor.run_captured(&command).unwrap();
        assert_eq!(status.code(), Some(2));
        assert_eq!(stderr.trim(), "bad CRC");
    }

    #[test]
    fn test_captured_run_honours_timeout() {
        let dir = tempfile::TempDir::new().unwrap();
        let command = shell_command(dir.path(), "exec sleep 30");
        let monitor = ProcessMonitor::new()
            .with_poll_interval(Duration::from_millis(10))
            .with_timeout(Duration::from_millis(150));

        let start = Instant::now();
        let result = monitor.run_captured(&command);

        match result {
            Err(WorkerError::Timeout { limit }) => assert_eq!(limit, Duration::from_millis(150)),
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_captured_run_honours_cancellation() {
        let dir = tempfile::TempDir::new().unwrap();
        let command = shell_command(dir.path(), "exec sleep 30");
        let monitor = ProcessMonitor::new().with_poll_interval(Duration::from_millis(10));
        monitor.cancel();

        let result = monitor.run_captured(&command);
        assert!(matches!(result, Err(WorkerError::Cancelled)));
    }
}
