/// Scanner module — orchestrates the walk and the parallel classification.
///
/// [`scan`] runs synchronously against the native access gate.
/// [`start_scan`] runs the same pipeline on a background thread and streams
/// [`ScanProgress`] messages through a bounded channel.
pub mod aggregate;
pub mod coordinator;
pub mod progress;

pub use aggregate::ResultAggregator;
pub use coordinator::ScanSession;
pub use progress::ScanProgress;

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::model::ScanResult;
use crate::platform::native_gate;
use crossbeam_channel::{Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

/// Maximum number of progress messages that may queue up in the channel.
///
/// Workers block briefly on a full channel instead of consuming unbounded
/// heap when the consumer falls behind.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Scan `root` with the native gate, no cancellation and no progress.
pub fn scan(root: &Path, config: ScanConfig) -> Result<ScanResult, ScanError> {
    let cancel = AtomicBool::new(false);
    run_native(root, config, &cancel, None)
}

fn run_native(
    root: &Path,
    config: ScanConfig,
    cancel: &AtomicBool,
    progress: Option<&Sender<ScanProgress>>,
) -> Result<ScanResult, ScanError> {
    let gate = native_gate(config.acl_precedence).map_err(|e| ScanError::Io {
        path: root.to_path_buf(),
        source: e,
    })?;
    ScanSession::new(config, gate)?.run(root, cancel, progress)
}

/// Handle to a running or completed scan. Allows cancellation and
/// receiving progress updates.
pub struct ScanHandle {
    /// Receiver for progress updates from the scan thread.
    pub progress_rx: Receiver<ScanProgress>,
    /// Flag to request cancellation.
    cancel_flag: Arc<AtomicBool>,
    /// Join handle for the scan thread.
    thread: Option<thread::JoinHandle<Result<ScanResult, ScanError>>>,
}

impl ScanHandle {
    /// Request the scan to stop as soon as possible.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// Block until the scan thread exits and return its outcome.
    ///
    /// Progress not yet received is drained and discarded so the scan thread
    /// never stalls on a full channel.
    pub fn wait(mut self) -> Result<ScanResult, ScanError> {
        // Ends once the scan thread drops its sender.
        for _ in self.progress_rx.iter() {}
        match self.thread.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(ScanError::ThreadPool("scanner thread panicked".into()))),
            None => Err(ScanError::Cancelled),
        }
    }
}

/// Start a new scan on a background thread.
///
/// The thread always finishes by sending exactly one of
/// [`ScanProgress::Complete`], [`ScanProgress::Cancelled`] or
/// [`ScanProgress::Failed`].
pub fn start_scan(root_path: PathBuf, config: ScanConfig) -> Result<ScanHandle, ScanError> {
    let (progress_tx, progress_rx) =
        crossbeam_channel::bounded::<ScanProgress>(PROGRESS_CHANNEL_CAPACITY);
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_clone = cancel_flag.clone();

    let thread = thread::Builder::new()
        .name("encsleuth-scanner".into())
        .spawn(move || {
            info!("Starting background scan of {}", root_path.display());
            let outcome = run_native(&root_path, config, &cancel_clone, Some(&progress_tx));
            let last = match &outcome {
                Ok(result) => ScanProgress::Complete {
                    result: result.clone(),
                },
                Err(ScanError::Cancelled) => ScanProgress::Cancelled,
                Err(err) => {
                    error!("Scan of {} failed: {err}", root_path.display());
                    ScanProgress::Failed {
                        error: err.to_string(),
                    }
                }
            };
            let _ = progress_tx.send(last);
            outcome
        })
        .map_err(|e| ScanError::ThreadPool(e.to_string()))?;

    Ok(ScanHandle {
        progress_rx,
        cancel_flag,
        thread: Some(thread),
    })
}
