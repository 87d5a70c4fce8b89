// ============================================================================
// reframe-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error Types for the Reframe Core Library
//
// Every fallible operation in the core returns `CoreResult<T>`. Probe-layer
// oddities that have a defined sentinel (unknown bitrate, missing primaries)
// never reach this type; only failures the caller must act on do.
//
// `SwapFailed` means the original is back at its path. `RollbackFailed`
// means it is not.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors produced by the reframe core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to probe {attribute} of {path}: {message}")]
    ProbeFailed {
        path: PathBuf,
        attribute: String,
        message: String,
    },

    #[error("Malformed probe value: {0}")]
    ProbeParse(String),

    #[error("Failed to start {0}: {1}")]
    CommandStart(String, std::io::Error),

    #[error("{0} exited with {1}: {2}")]
    CommandFailed(String, ExitStatus, String),

    #[error("Transcode step '{step}' failed: {message}")]
    TranscodeFailed { step: String, message: String },

    #[error("{failed} of {total} scene encodes failed; completed scenes were kept for resume")]
    SceneBatchFailed { failed: usize, total: usize },

    #[error("Could not move {staged} into place ({source}); original restored")]
    SwapFailed {
        staged: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "FATAL: could not move {staged} into place and could not restore {backup} to {original}: {source}"
    )]
    RollbackFailed {
        original: PathBuf,
        backup: PathBuf,
        staged: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Required dependency '{0}' not found")]
    DependencyNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("No media assets found")]
    NoAssetsFound,

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl CoreError {
    /// True when the asset may have been left without a live file.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoreError::RollbackFailed { .. })
    }
}

/// Result type for reframe core operations.
pub type CoreResult<T> = Result<T, CoreError>;

// ============================================================================
// CONSTRUCTION HELPERS
// ============================================================================

pub fn command_start_error(cmd: impl Into<String>, err: std::io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(cmd.into(), status, stderr.into())
}
