/// Scan configuration.
///
/// Everything is passed explicitly; no configuration files are read.
use crate::encoding::MAX_PREFIX_BYTES;
use crate::error::ScanError;
use crate::platform::AclPrecedence;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

/// File-name globs classified when no others are given.
pub const DEFAULT_EXTENSIONS: [&str; 11] = [
    "*.txt", "*.cs", "*.xml", "*.xaml", "*.htm", "*.html", "*.c", "*.cpp", "*.h", "*.js",
    "*.asm",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Glob patterns matched case-insensitively against file names.
    pub extensions: Vec<String>,
    /// Leading bytes read per file.
    pub max_prefix_bytes: usize,
    /// Worker pool size; 0 uses one thread per logical CPU.
    pub threads: usize,
    pub acl_precedence: AclPrecedence,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_prefix_bytes: MAX_PREFIX_BYTES,
            threads: 0,
            acl_precedence: AclPrecedence::default(),
        }
    }
}

impl ScanConfig {
    pub fn with_extensions<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_prefix_bytes(mut self, max: usize) -> Self {
        self.max_prefix_bytes = max;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_acl_precedence(mut self, precedence: AclPrecedence) -> Self {
        self.acl_precedence = precedence;
        self
    }

    /// Pool size after resolving `0` to the CPU count.
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.threads
        }
    }

    /// Reject settings no scan can run with.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.max_prefix_bytes == 0 {
            return Err(ScanError::InvalidConfig(
                "max_prefix_bytes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Compile the extension globs.
    pub fn extension_matcher(&self) -> Result<GlobSet, ScanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.extensions {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .map_err(|source| ScanError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ScanError::InvalidPattern {
            pattern: self.extensions.join(" "),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matcher_is_case_insensitive() {
        let matcher = ScanConfig::default().extension_matcher().unwrap();
        assert!(matcher.is_match("readme.txt"));
        assert!(matcher.is_match("INDEX.HTML"));
        assert!(matcher.is_match("Program.cs"));
        assert!(!matcher.is_match("image.png"));
        assert!(!matcher.is_match("notes.txt.bak"));
    }

    #[test]
    fn custom_patterns_replace_defaults() {
        let config = ScanConfig::default().with_extensions(["*.md", "Makefile"]);
        let matcher = config.extension_matcher().unwrap();
        assert!(matcher.is_match("README.md"));
        assert!(matcher.is_match("makefile"));
        assert!(!matcher.is_match("a.txt"));
    }

    #[test]
    fn bad_glob_is_reported_with_its_pattern() {
        let err = ScanConfig::default()
            .with_extensions(["*.{txt"])
            .extension_matcher()
            .unwrap_err();
        match err {
            ScanError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "*.{txt"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_prefix_is_rejected() {
        assert!(ScanConfig::default().validate().is_ok());
        assert!(ScanConfig::default().with_max_prefix_bytes(1).validate().is_ok());
        let err = ScanConfig::default()
            .with_max_prefix_bytes(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
        assert!(err.to_string().contains("max_prefix_bytes"));
    }

    #[test]
    fn zero_threads_resolves_to_cpu_count() {
        assert!(ScanConfig::default().effective_threads() >= 1);
        assert_eq!(ScanConfig::default().with_threads(3).effective_threads(), 3);
    }

    #[test]
    fn deserializes_partial_json_over_defaults() {
        let config: ScanConfig =
            serde_json::from_str(r#"{"threads": 2, "acl_precedence": "independent"}"#).unwrap();
        assert_eq!(config.threads, 2);
        assert_eq!(config.acl_precedence, AclPrecedence::Independent);
        assert_eq!(config.max_prefix_bytes, MAX_PREFIX_BYTES);
        assert_eq!(config.extensions.len(), DEFAULT_EXTENSIONS.len());
    }
}
