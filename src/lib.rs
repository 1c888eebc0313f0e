// Library exports for reuse by the binary and other front ends
pub mod cli;
pub mod config_file;
pub mod error;
pub mod extraction;
pub mod image_processing;
pub mod json_output;
pub mod prompt;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use error::{ProcessingError, Result};
pub use extraction::{extract_tree, CommandExtractor, ExtractionOptions, ExtractionRequest, Extractor};
pub use image_processing::{
    BatchSummary, ExportSpec, FileAction, FileOutcome, FileReport, PixelBuffer, ProcessingConfig,
    ProcessingEngine,
};
pub use json_output::JsonMessage;
