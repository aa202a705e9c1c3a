/// Error types for the walk and scan pipeline.
///
/// Only failures that prevent a scan from starting (bad root, bad config,
/// pool construction) or an explicit cancellation surface as `ScanError`.
/// Per-directory and per-file problems are absorbed into the data: pruned
/// subtrees, skipped counts, and `ScanProgress::Error` messages.
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors returned by the walker and the scan coordinator.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The root path does not exist.
    #[error("Root path not found: {path}")]
    InvalidRoot { path: PathBuf },

    /// The root path exists but is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The access gate refused to let us list the root.
    #[error("Root directory is not listable: {path}")]
    RootInaccessible { path: PathBuf },

    /// Generic I/O error on the root.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An extension glob failed to compile.
    #[error("Invalid extension pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The bounded worker pool could not be created.
    #[error("Failed to build scan worker pool: {0}")]
    ThreadPool(String),

    /// The caller requested cancellation.
    #[error("Scan cancelled")]
    Cancelled,
}

impl ScanError {
    /// Wrap an I/O error raised while inspecting the root.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::InvalidRoot { path },
            std::io::ErrorKind::PermissionDenied => Self::RootInaccessible { path },
            _ => Self::Io { path, source },
        }
    }

    /// `true` if this error came from a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
