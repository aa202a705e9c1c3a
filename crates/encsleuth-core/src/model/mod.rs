/// Data model for EncSleuth.
///
/// Re-exports the directory arena, encoding labels, and scan results.
pub mod directory;
pub mod label;
pub mod result;
pub mod size;

pub use directory::{DirectoryNode, DirectoryTree, NodeIndex};
pub use label::EncodingLabel;
pub use result::{FileCandidate, ScanResult};
