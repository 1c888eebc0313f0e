//! Error type shared by the trimming, resizing, extraction and batch stages.
//!
//! Every variant except [`ProcessingError::RootNotFound`] is scoped to a single
//! file or directory: the batch pipeline records it and moves on.
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid source dimensions {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    #[error("Invalid target size {width}x{height}")]
    InvalidTarget { width: u32, height: u32 },

    #[error("Failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Extraction failed for {dir}: {reason}")]
    Collaborator { dir: PathBuf, reason: String },

    #[error("Root path does not exist or is not a directory: {0}")]
    RootNotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Failed to initialize thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ProcessingError {
    pub fn write<E: std::fmt::Display>(path: impl Into<PathBuf>, e: E) -> Self {
        ProcessingError::Write {
            path: path.into(),
            reason: e.to_string(),
        }
    }

    pub fn resample<E: std::fmt::Display>(e: E) -> Self {
        ProcessingError::Resample(e.to_string())
    }

    /// Only a missing root aborts a whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProcessingError::RootNotFound(_))
    }

    /// Short machine-friendly name used in reports and JSON lines
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::Decode { .. } => "DecodeFailure",
            ProcessingError::InvalidDimension { .. } => "InvalidDimension",
            ProcessingError::InvalidTarget { .. } => "InvalidTarget",
            ProcessingError::Write { .. } => "WriteFailure",
            ProcessingError::Collaborator { .. } => "CollaboratorFailure",
            ProcessingError::RootNotFound(_) => "RootNotFound",
            ProcessingError::Io { .. } => "Io",
            ProcessingError::Resample(_) => "Resample",
            ProcessingError::ThreadPool(_) => "ThreadPool",
        }
    }
}
