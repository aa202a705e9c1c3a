/// In-memory [`AclSource`] for tests and dry runs.
///
/// Entries, failures and listing-probe answers are configured per path.
/// Every `entries` call is recorded so tests can prove a directory was never
/// examined.
use super::access::{AccessEntry, AccessMask, AclSource, Principal, Trustee};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct MemoryAclSource {
    principal: Principal,
    entries: HashMap<PathBuf, Vec<AccessEntry>>,
    fallback: Option<Vec<AccessEntry>>,
    failures: HashSet<PathBuf>,
    listable: HashSet<PathBuf>,
    queries: Mutex<Vec<PathBuf>>,
}

impl MemoryAclSource {
    /// Unknown paths fail with `NotFound`.
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            ..Self::default()
        }
    }

    /// Unknown paths grant the principal's account full control.
    pub fn allow_all(principal: Principal) -> Self {
        let owner = Trustee::Account(principal.user.clone());
        Self::new(principal).with_fallback(vec![AccessEntry::allow(owner, AccessMask::FULL_CONTROL)])
    }

    pub fn with_entries(mut self, dir: impl Into<PathBuf>, entries: Vec<AccessEntry>) -> Self {
        self.entries.insert(dir.into(), entries);
        self
    }

    /// Entries returned for paths with no explicit configuration.
    pub fn with_fallback(mut self, entries: Vec<AccessEntry>) -> Self {
        self.fallback = Some(entries);
        self
    }

    /// Make the ACL query for `dir` fail with `PermissionDenied`.
    pub fn with_failure(mut self, dir: impl Into<PathBuf>) -> Self {
        self.failures.insert(dir.into());
        self
    }

    /// Make the listing probe succeed for `dir`.
    pub fn with_listable(mut self, dir: impl Into<PathBuf>) -> Self {
        self.listable.insert(dir.into());
        self
    }

    /// Every path queried so far, in call order.
    pub fn queries(&self) -> Vec<PathBuf> {
        self.queries.lock().clone()
    }

    pub fn query_count(&self, dir: &Path) -> usize {
        self.queries.lock().iter().filter(|p| p.as_path() == dir).count()
    }

    /// `true` if `dir` or anything below it was ever queried.
    pub fn queried_under(&self, dir: &Path) -> bool {
        self.queries.lock().iter().any(|p| p.starts_with(dir))
    }
}

impl AclSource for MemoryAclSource {
    fn principal(&self) -> &Principal {
        &self.principal
    }

    fn entries(&self, dir: &Path) -> io::Result<Vec<AccessEntry>> {
        self.queries.lock().push(dir.to_path_buf());

        if self.failures.contains(dir) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permissions unreadable",
            ));
        }
        self.entries
            .get(dir)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such directory"))
    }

    fn probe_list(&self, dir: &Path) -> bool {
        self.listable.contains(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_queries_and_falls_back() {
        let source = MemoryAclSource::allow_all(Principal::new("u", ["g"]));
        assert_eq!(source.entries(Path::new("/a")).unwrap().len(), 1);
        assert_eq!(source.entries(Path::new("/a/b")).unwrap().len(), 1);
        assert_eq!(source.queries(), vec![PathBuf::from("/a"), PathBuf::from("/a/b")]);
        assert!(source.queried_under(Path::new("/a")));
        assert!(!source.queried_under(Path::new("/c")));
    }

    #[test]
    fn unknown_paths_fail_without_fallback() {
        let source = MemoryAclSource::new(Principal::default()).with_failure("/x");
        assert_eq!(
            source.entries(Path::new("/x")).unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
        assert_eq!(
            source.entries(Path::new("/y")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert!(!source.probe_list(Path::new("/x")));
    }
}
