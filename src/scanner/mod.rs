pub mod extracted_scanner;

pub use extracted_scanner::{ExtractedFile, ExtractedScanner, ScanStatistics};
