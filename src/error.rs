// Error types for the sync engine
// Distinguishes fatal configuration problems from per-entry failures

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error type covering every failure mode of a sync run.
///
/// `Configuration` aborts the run before any entry is processed. The
/// per-entry variants (`RemoteLookup`, `LocalRead`, `Transfer`) are caught
/// at the unit-of-work boundary and collected into the run's failure list.
/// `Cache` never fails anything; callers log it and move on.
#[derive(Debug)]
pub enum SyncError {
    /// Bad or missing strategy/backend selection, fatal before the run starts
    Configuration { message: String },

    /// Backend unreachable or returned a malformed response while probing
    /// for a remote hash. "Object not found" is not an error and is
    /// reported as an absent hash instead.
    RemoteLookup { key: String, reason: String },

    /// Local file could not be read while hashing or preparing an upload
    LocalRead { path: PathBuf, operation: String, source: io::Error },

    /// Upload failed after a copy decision was already made
    Transfer { key: String, reason: String },

    /// Lookup-cache read or write failed; non-fatal by contract
    Cache { message: String },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyncError::Configuration { message } => {
                write!(f, "Configuration error: {}\n", message)?;
                write!(f, "Suggestion: Check the strategy and backend settings before re-running")
            }
            SyncError::RemoteLookup { key, reason } => {
                write!(f, "Remote hash lookup failed for '{}': {}\n", key, reason)?;
                write!(f, "Suggestion: Check network connectivity and backend credentials")
            }
            SyncError::LocalRead { path, operation, source } => {
                write!(f, "I/O error while {} {}: {}\n", operation, path.display(), source)?;
                write!(f, "Suggestion: Check that the file exists and is readable")
            }
            SyncError::Transfer { key, reason } => {
                write!(f, "Failed to upload to '{}': {}\n", key, reason)?;
                write!(f, "Suggestion: Re-run to retry the failed subset; completed files will be skipped")
            }
            SyncError::Cache { message } => {
                write!(f, "Lookup cache error: {}", message)
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::LocalRead { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl SyncError {
    /// Wrap an io::Error with the operation being attempted and the file it hit
    pub fn local_read(err: io::Error, operation: &str, path: PathBuf) -> Self {
        SyncError::LocalRead {
            path,
            operation: operation.to_string(),
            source: err,
        }
    }

    /// True for errors that abort the whole run rather than one entry
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Configuration { .. })
    }
}
