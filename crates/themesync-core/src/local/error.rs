//! Local filesystem error handling
//!
//! Provides typed errors for theme directory operations with descriptive
//! messages and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing the local theme tree
#[derive(Error, Debug)]
pub enum LocalError {
    /// Failed to create a directory for an asset
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error("Disk full or quota exceeded while writing to '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to walk the theme directory
    #[error("Failed to list '{path}': {details}")]
    WalkError { path: PathBuf, details: String },

    /// Asset key escapes the theme root or is otherwise unusable
    #[error("Invalid asset path '{key}': {reason}")]
    InvalidPath { key: String, reason: &'static str },

    /// File not found (when expected to exist)
    #[error("File not found: '{path}'")]
    NotFound { path: PathBuf },

    /// Atomic write failed during rename
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LocalError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => LocalError::PermissionDenied {
                path,
                source: error,
            },
            io::ErrorKind::NotFound => LocalError::NotFound { path },
            _ if is_disk_full_error(&error) => LocalError::DiskFull {
                path,
                source: error,
            },
            _ => LocalError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Like `from_io`, but unclassified failures are reported as reads
    pub fn from_read_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound => {
                Self::from_io(error, path)
            }
            _ => LocalError::ReadError {
                path,
                source: error,
            },
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            LocalError::DiskFull { .. } => Some("Free up disk space and try again."),
            LocalError::PermissionDenied { .. } => {
                Some("Check file and directory permissions in the theme directory.")
            }
            LocalError::CreateDirectory { .. } => {
                Some("Check that the theme root exists and you have write permissions.")
            }
            LocalError::InvalidPath { .. } => {
                Some("Rename or remove the asset so its key stays inside the theme root.")
            }
            _ => None,
        }
    }

    /// Error text followed by its recovery suggestion, if any
    pub fn describe(&self) -> String {
        match self.recovery_suggestion() {
            Some(hint) => format!("{}. {}", self, hint),
            None => self.to_string(),
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for local filesystem operations
pub type LocalResult<T> = Result<T, LocalError>;
