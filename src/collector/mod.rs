pub mod file_mover;
pub mod result_collector;

pub use file_mover::FileMover;
pub use result_collector::{discard_outputs, ResultCollector};
