/// Finalized scan results and candidate files.
use super::label::EncodingLabel;
use super::size::format_count;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A file selected for classification.
///
/// Transient: created during a directory's enumeration pass and dropped
/// once its label has been recorded.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub path: PathBuf,
    /// Byte length at enumeration time. Always > 0.
    pub len: u64,
}

impl FileCandidate {
    pub fn new(path: PathBuf, len: u64) -> Self {
        Self { path, len }
    }
}

/// Aggregated outcome of one scan.
///
/// `counts` holds only labels seen at least once. The invariant
/// `counts.values().sum() + skipped == total` holds for every snapshot taken
/// after the workers have joined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub counts: BTreeMap<EncodingLabel, u64>,
    /// Files that were empty at read time or could not be read.
    pub skipped: u64,
    /// Files examined (classified + skipped).
    pub total: u64,
    /// Accessible directories the walk produced.
    pub directories: u64,
    /// Wall-clock duration of walk + classification.
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl ScanResult {
    /// Count for `label`, zero if never seen.
    pub fn count(&self, label: EncodingLabel) -> u64 {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    /// Number of files that received a label (Undetermined included).
    pub fn classified(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Check the counting invariant.
    pub fn is_consistent(&self) -> bool {
        self.classified() + self.skipped == self.total
    }

    /// Iterate `(label, count)` pairs in report order.
    pub fn iter(&self) -> impl Iterator<Item = (EncodingLabel, u64)> + '_ {
        self.counts.iter().map(|(&l, &c)| (l, c))
    }

    /// Pretty-printed JSON rendering.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Plain-text report: one line per label, then the grand total.
impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, count) in self.iter() {
            writeln!(f, "{label} - {} files", format_count(count))?;
        }
        writeln!(f)?;
        write!(
            f,
            "Total: {} files ({} skipped)",
            format_count(self.total),
            format_count(self.skipped)
        )
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
