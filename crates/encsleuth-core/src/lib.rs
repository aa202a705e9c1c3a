/// EncSleuth Core — access-gated walking, encoding classification, and
/// concurrent scan aggregation.
///
/// This crate contains all business logic with zero UI dependencies.
/// The `encsleuth` binary is a thin shell over [`scanner::scan`].
///
/// # Modules
///
/// - [`model`] — Directory arena, encoding labels, and scan results.
/// - [`platform`] — Principals, ACL sources, and the caching access gate.
/// - [`walker`] — Permission-aware depth-first directory walk.
/// - [`encoding`] — BOM sniffing and strict trial decoding.
/// - [`scanner`] — Bounded worker pool, result aggregation, and progress.
/// - [`config`] — Scan settings and extension globs.
/// - [`error`] — Fatal scan errors.
pub mod config;
pub mod encoding;
pub mod error;
pub mod model;
pub mod platform;
pub mod scanner;
pub mod walker;

pub use config::ScanConfig;
pub use error::ScanError;
pub use model::{EncodingLabel, ScanResult};
pub use scanner::{scan, start_scan, ScanHandle, ScanProgress, ScanSession};
