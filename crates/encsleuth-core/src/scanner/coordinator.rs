/// Scan coordinator. Walks, enumerates candidates, then classifies in a bounded pool.
///
/// One unit of work per directory that has at least one candidate. Units
/// run on a dedicated rayon pool sized from the config, classify their files
/// sequentially, and feed a shared [`ResultAggregator`]. The rayon scope is
/// the barrier: the result is snapshotted only after every unit has returned.
use crate::config::ScanConfig;
use crate::encoding::classify_file;
use crate::error::ScanError;
use crate::model::{DirectoryTree, FileCandidate, ScanResult};
use crate::platform::{AccessGate, AccessRight};
use crate::scanner::aggregate::ResultAggregator;
use crate::scanner::progress::ScanProgress;
use crate::walker::walk_cancellable;
use crossbeam_channel::Sender;
use globset::GlobSet;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Context for a single scan invocation.
///
/// Owns the gate (and therefore its decision cache), a fresh aggregator and
/// the compiled extension matcher. Consumed by [`run`](Self::run).
pub struct ScanSession<G> {
    config: ScanConfig,
    gate: G,
    matcher: GlobSet,
    aggregator: ResultAggregator,
}

/// Files to classify in one directory.
struct WorkUnit {
    dir: PathBuf,
    files: Vec<FileCandidate>,
}

impl<G: AccessGate> ScanSession<G> {
    /// Fails if the config is out of range or an extension glob does not
    /// compile.
    pub fn new(config: ScanConfig, gate: G) -> Result<Self, ScanError> {
        config.validate()?;
        let matcher = config.extension_matcher()?;
        Ok(Self {
            config,
            gate,
            matcher,
            aggregator: ResultAggregator::new(),
        })
    }

    /// Run the scan rooted at `root`.
    ///
    /// `cancel` is checked before every directory during the walk, before
    /// every directory's enumeration and before every file. Progress is sent
    /// when `progress` is given.
    pub fn run(
        self,
        root: &Path,
        cancel: &AtomicBool,
        progress: Option<&Sender<ScanProgress>>,
    ) -> Result<ScanResult, ScanError> {
        let start = Instant::now();
        let emit = |msg: ScanProgress| {
            if let Some(tx) = progress {
                let _ = tx.send(msg);
            }
        };

        info!("Starting encoding scan of {}", root.display());
        emit(ScanProgress::Walking);
        let tree = walk_cancellable(root, &self.gate, AccessRight::List, cancel)?;

        let threads = self.config.effective_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("encsleuth-worker-{i}"))
            .build()
            .map_err(|e| ScanError::ThreadPool(e.to_string()))?;
        debug!("Scan pool started with {threads} threads");

        let units = pool.install(|| self.enumerate(&tree, cancel));
        if cancel.load(Ordering::Relaxed) {
            return Err(ScanError::Cancelled);
        }
        emit(ScanProgress::DirectoriesFound {
            directories: tree.len() as u64,
            with_candidates: units.len() as u64,
        });

        pool.scope(|s| {
            for unit in units {
                let session = &self;
                let emit = &emit;
                s.spawn(move |_| session.classify_unit(unit, cancel, emit));
            }
        });

        if cancel.load(Ordering::Relaxed) {
            info!("Scan of {} cancelled", root.display());
            return Err(ScanError::Cancelled);
        }

        let result = self
            .aggregator
            .snapshot(tree.len() as u64, start.elapsed());
        info!(
            "Scan complete: {} files in {} directories ({} skipped) in {:.2?}",
            result.total, result.directories, result.skipped, result.duration
        );
        Ok(result)
    }

    /// Candidate files of every directory, in parallel. Empty directories
    /// produce no unit.
    fn enumerate(&self, tree: &DirectoryTree, cancel: &AtomicBool) -> Vec<WorkUnit> {
        tree.nodes
            .par_iter()
            .filter_map(|node| {
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
                let files = self.candidates(&node.path);
                (!files.is_empty()).then(|| WorkUnit {
                    dir: node.path.clone(),
                    files,
                })
            })
            .collect()
    }

    /// Direct children of `dir` that are regular, non-empty and match a glob.
    fn candidates(&self, dir: &Path) -> Vec<FileCandidate> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Cannot enumerate files in {}: {err}", dir.display());
                return Vec::new();
            }
        };

        entries
            .filter_map(Result::ok)
            .filter(|entry| self.matcher.is_match(entry.file_name()))
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                (meta.is_file() && meta.len() > 0)
                    .then(|| FileCandidate::new(entry.path(), meta.len()))
            })
            .collect()
    }

    fn classify_unit<F>(&self, unit: WorkUnit, cancel: &AtomicBool, emit: &F)
    where
        F: Fn(ScanProgress),
    {
        let mut done: u64 = 0;
        let mut bytes: u64 = 0;
        for file in &unit.files {
            if cancel.load(Ordering::Relaxed) {
                debug!("Unit {} stopped by cancellation", unit.dir.display());
                return;
            }
            match classify_file(&file.path, self.config.max_prefix_bytes) {
                Ok(Some(label)) => self.aggregator.increment(label),
                Ok(None) => self.aggregator.record_skipped(),
                Err(err) => {
                    warn!("Cannot read {}: {err}", file.path.display());
                    self.aggregator.record_skipped();
                    emit(ScanProgress::Error {
                        path: file.path.clone(),
                        message: err.to_string(),
                    });
                }
            }
            done += 1;
            bytes += file.len;
        }

        debug!("Classified {done} files ({bytes} bytes) in {}", unit.dir.display());
        emit(ScanProgress::DirectoryDone {
            path: unit.dir,
            files: done,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EncodingLabel;
    use crate::platform::{AclAccessGate, AclPrecedence, MemoryAclSource, Principal};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn gate() -> Arc<AclAccessGate<MemoryAclSource>> {
        Arc::new(AclAccessGate::new(
            MemoryAclSource::allow_all(Principal::new("tester", ["users"])),
            AclPrecedence::DenyWins,
        ))
    }

    fn session(config: ScanConfig) -> ScanSession<Arc<AclAccessGate<MemoryAclSource>>> {
        ScanSession::new(config, gate()).unwrap()
    }

    #[test]
    fn counts_match_files_and_skip_filtered_ones() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(tmp.path().join("root.txt"), b"hello").unwrap();
        fs::write(sub.join("a.TXT"), [0xEF, 0xBB, 0xBF, b'x']).unwrap();
        fs::write(sub.join("empty.txt"), b"").unwrap();
        fs::write(sub.join("image.png"), [0x89, b'P', b'N', b'G']).unwrap();

        let cancel = AtomicBool::new(false);
        let result = session(ScanConfig::default().with_threads(2))
            .run(tmp.path(), &cancel, None)
            .unwrap();

        assert_eq!(result.count(EncodingLabel::Ascii), 1, "root directory is scanned");
        assert_eq!(result.count(EncodingLabel::Utf8Bom), 1);
        assert_eq!(result.total, 2, "empty and non-matching files are not candidates");
        assert_eq!(result.skipped, 0);
        assert_eq!(result.directories, 2);
        assert!(result.is_consistent());
    }

    #[test]
    fn pruned_directories_contribute_nothing() {
        let tmp = TempDir::new().unwrap();
        let secret = tmp.path().join("secret");
        fs::create_dir(&secret).unwrap();
        fs::write(secret.join("hidden.txt"), b"hidden").unwrap();
        fs::write(tmp.path().join("open.txt"), b"open").unwrap();

        let source = MemoryAclSource::allow_all(Principal::new("tester", ["users"]))
            .with_entries(&secret, Vec::new());
        let gate = AclAccessGate::new(source, AclPrecedence::DenyWins);
        let cancel = AtomicBool::new(false);
        let result = ScanSession::new(ScanConfig::default(), gate)
            .unwrap()
            .run(tmp.path(), &cancel, None)
            .unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.directories, 1);
    }

    #[test]
    fn progress_reports_each_directory() {
        let tmp = TempDir::new().unwrap();
        for name in ["one", "two", "three"] {
            let dir = tmp.path().join(name);
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("f.txt"), b"text").unwrap();
        }
        fs::create_dir(tmp.path().join("empty")).unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let cancel = AtomicBool::new(false);
        session(ScanConfig::default())
            .run(tmp.path(), &cancel, Some(&tx))
            .unwrap();
        drop(tx);

        let messages: Vec<ScanProgress> = rx.iter().collect();
        assert!(matches!(messages.first(), Some(ScanProgress::Walking)));
        assert!(messages.iter().any(|m| matches!(
            m,
            ScanProgress::DirectoriesFound {
                directories: 5,
                with_candidates: 3
            }
        )));
        let done = messages
            .iter()
            .filter(|m| matches!(m, ScanProgress::DirectoryDone { files: 1, .. }))
            .count();
        assert_eq!(done, 3);
    }

    #[test]
    fn dropped_receiver_does_not_fail_the_scan() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        let cancel = AtomicBool::new(false);
        let result = session(ScanConfig::default())
            .run(tmp.path(), &cancel, Some(&tx))
            .unwrap();
        assert_eq!(result.total, 1);
    }

    #[test]
    fn cancellation_before_start_is_reported() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        let cancel = AtomicBool::new(true);
        let err = session(ScanConfig::default())
            .run(tmp.path(), &cancel, None)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    /// The flag is raised by the progress consumer after the first finished
    /// directory. The rendezvous channel means no other directory can report
    /// before the flag is set.
    #[test]
    fn cancellation_during_classification_is_reported() {
        let tmp = TempDir::new().unwrap();
        let dirs = 50;
        for i in 0..dirs {
            let dir = tmp.path().join(format!("d{i}"));
            fs::create_dir(&dir).unwrap();
            for j in 0..5 {
                fs::write(dir.join(format!("f{j}.txt")), b"text").unwrap();
            }
        }

        let (tx, rx) = crossbeam_channel::bounded(0);
        let cancel = AtomicBool::new(false);
        let (outcome, reported) = std::thread::scope(|s| {
            let consumer = s.spawn(|| {
                let mut reported = 0;
                for msg in rx.iter() {
                    if matches!(msg, ScanProgress::DirectoryDone { .. }) {
                        reported += 1;
                        cancel.store(true, Ordering::Relaxed);
                    }
                }
                reported
            });
            let outcome = session(ScanConfig::default().with_threads(1))
                .run(tmp.path(), &cancel, Some(&tx));
            drop(tx);
            (outcome, consumer.join().unwrap())
        });

        assert!(outcome.unwrap_err().is_cancelled());
        assert!(reported < dirs, "every directory finished despite cancellation");
    }

    #[test]
    fn invalid_glob_fails_session_creation() {
        let config = ScanConfig::default().with_extensions(["[z-a]"]);
        assert!(matches!(
            ScanSession::new(config, gate()),
            Err(ScanError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn zero_prefix_fails_session_creation() {
        let config = ScanConfig::default().with_max_prefix_bytes(0);
        assert!(matches!(
            ScanSession::new(config, gate()),
            Err(ScanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn prefix_limit_is_honoured() {
        let tmp = TempDir::new().unwrap();
        // ASCII within the first 8 bytes, invalid UTF-8 after.
        let mut bytes = b"abcdefgh".to_vec();
        bytes.push(0x98);
        fs::write(tmp.path().join("long.txt"), &bytes).unwrap();

        let cancel = AtomicBool::new(false);
        let short = session(ScanConfig::default().with_max_prefix_bytes(8))
            .run(tmp.path(), &cancel, None)
            .unwrap();
        assert_eq!(short.count(EncodingLabel::Ascii), 1);

        let full = session(ScanConfig::default())
            .run(tmp.path(), &cancel, None)
            .unwrap();
        assert_eq!(full.count(EncodingLabel::Koi8R), 1);
    }
}
