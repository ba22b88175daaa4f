pub mod command;
pub mod invoker;
pub mod process;

#[cfg(all(test, unix))]
pub(crate) mod testing;

pub use command::{ExtractionCommand, ExtractorKind, WaitMode};
pub use invoker::{ExtractionOutcome, ExtractorInvoker};
pub use process::{ProcessMonitor, TaskProgress, TASK_PROGRESS_EVENT};
