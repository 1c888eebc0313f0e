//! JSON line output for wrapping tools
//!
//! When --json-progress is enabled, progress and completion events are emitted
//! as one JSON object per line on stdout instead of styled console output.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Last progress emission timestamp (milliseconds since epoch)
/// Used for throttling progress updates to ~25 FPS (40ms between updates)
static LAST_PROGRESS_MS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonMessage {
    /// Progress update
    Progress {
        current: usize,
        total: usize,
        message: String,
    },
    /// File processing completed
    FileCompleted {
        input_path: String,
        output_paths: Vec<String>,
        processing_time_ms: u128,
    },
    /// File processing failed
    FileFailed {
        input_path: String,
        kind: String,
        error: String,
    },
    /// Every file of a directory has been attempted
    DirectoryCompleted {
        path: String,
        files: usize,
        failed: usize,
    },
    /// Extractor finished for one source directory
    ExtractionCompleted {
        source_dir: String,
        destination_dir: String,
    },
    /// Extractor failed for one source directory
    ExtractionFailed { source_dir: String, error: String },
    /// Processing summary
    Summary {
        total_files: usize,
        processed: usize,
        failed: usize,
        duration_secs: f64,
    },
}

impl JsonMessage {
    /// Emit JSON message to stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Create and emit progress message (throttled to ~25 FPS).
    /// The final progress (current == total) is always emitted.
    pub fn progress(current: usize, total: usize, message: impl Into<String>) {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let last_ms = LAST_PROGRESS_MS.load(Ordering::Relaxed);

        if now_ms.saturating_sub(last_ms) >= 40 || current == total {
            LAST_PROGRESS_MS.store(now_ms, Ordering::Relaxed);
            Self::Progress {
                current,
                total,
                message: message.into(),
            }
            .emit();
        }
    }

    pub fn file_completed(input_path: &Path, output_paths: &[PathBuf], processing_time_ms: u128) {
        Self::FileCompleted {
            input_path: input_path.display().to_string(),
            output_paths: output_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            processing_time_ms,
        }
        .emit();
    }

    pub fn file_failed(input_path: &Path, kind: &str, error: impl Into<String>) {
        Self::FileFailed {
            input_path: input_path.display().to_string(),
            kind: kind.to_string(),
            error: error.into(),
        }
        .emit();
    }

    pub fn directory_completed(path: &Path, files: usize, failed: usize) {
        Self::DirectoryCompleted {
            path: path.display().to_string(),
            files,
            failed,
        }
        .emit();
    }

    pub fn extraction_completed(source_dir: &Path, destination_dir: &Path) {
        Self::ExtractionCompleted {
            source_dir: source_dir.display().to_string(),
            destination_dir: destination_dir.display().to_string(),
        }
        .emit();
    }

    pub fn extraction_failed(source_dir: &Path, error: impl Into<String>) {
        Self::ExtractionFailed {
            source_dir: source_dir.display().to_string(),
            error: error.into(),
        }
        .emit();
    }

    /// Create and emit summary message
    pub fn summary(total_files: usize, processed: usize, failed: usize, duration_secs: f64) {
        Self::Summary {
            total_files,
            processed,
            failed,
            duration_secs,
        }
        .emit();
    }
}
