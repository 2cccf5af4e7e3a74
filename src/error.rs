//! Run-level errors.
//!
//! Per-file problems never surface here: they become `CodeIssue` records.
//! These are the conditions that stop a run before or around analysis.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("no supported source files found under {path} ({total_files} files scanned)")]
    NoSupportedFiles { path: String, total_files: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
