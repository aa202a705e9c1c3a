/// Scan progress reporting — lightweight messages sent from the scan
/// workers to the caller via a crossbeam channel.
///
/// Every send is `let _ = tx.send(..)`: a dropped receiver must never stall
/// or fail a worker.
use crate::model::ScanResult;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum ScanProgress {
    /// The directory walk has started.
    Walking,
    /// The walk finished and candidates were enumerated.
    DirectoriesFound {
        directories: u64,
        /// Directories with at least one file to classify.
        with_candidates: u64,
    },
    /// One directory's files have all been classified.
    DirectoryDone { path: PathBuf, files: u64 },
    /// A non-fatal error (e.g. one unreadable file).
    Error { path: PathBuf, message: String },
    /// Scanning completed successfully.
    Complete { result: ScanResult },
    /// Scan was cancelled by the caller.
    Cancelled,
    /// Scan could not start or finish.
    Failed { error: String },
}

impl ScanProgress {
    /// `true` for the last message a scan sends.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete { .. } | Self::Cancelled | Self::Failed { .. }
        )
    }
}
