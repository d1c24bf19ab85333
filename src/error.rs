//! Error types
//!
//! Errors raised while loading recordings or managing the broadcaster
//! lifecycle. Per-recording failures never cross the ingest boundary; they
//! are logged by the pacing engine and the recording is skipped.

use std::path::PathBuf;

/// Error type for broadcaster operations
#[derive(Debug)]
pub enum BroadcastError {
    /// Reading the recording content failed
    RecordingRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Recording file does not exist
    RecordingNotFound(PathBuf),
    /// Recording content was read but holds no bytes
    EmptyRecording,
    /// `start()` was called outside of a tokio runtime
    NoRuntime,
}

impl std::fmt::Display for BroadcastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BroadcastError::RecordingRead { path, source } => {
                write!(f, "Error reading recording {}: {}", path.display(), source)
            }
            BroadcastError::RecordingNotFound(path) => {
                write!(f, "Recording not found: {}", path.display())
            }
            BroadcastError::EmptyRecording => write!(f, "Recording is empty"),
            BroadcastError::NoRuntime => write!(f, "No tokio runtime available"),
        }
    }
}

impl std::error::Error for BroadcastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BroadcastError::RecordingRead { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result alias for broadcaster operations
pub type Result<T> = std::result::Result<T, BroadcastError>;
