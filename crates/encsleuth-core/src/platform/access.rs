/// Access gating — decides whether the current principal may perform an
/// operation on a directory.
///
/// The rights vocabulary is the Windows `FileSystemRights` bit layout; the
/// POSIX source translates mode bits into it so one evaluator serves every
/// platform. ACL metadata is treated as a heuristic: for `List` the gate falls
/// back to actually opening the directory, since that is what the walker
/// needs and what the OS will enforce.
///
/// # Caching
///
/// A directory whose ACL query fails is remembered as inaccessible for the
/// lifetime of the gate and denied for every right without re-querying.
/// Successful evaluations are cached per `(path, right)`. Nothing is ever
/// invalidated; permissions are assumed stable for one scan.
use compact_str::CompactString;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ── Rights masks ─────────────────────────────────────────────────────────────

/// A 32-bit access mask in `FileSystemRights` layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct AccessMask(pub u32);

impl AccessMask {
    pub const LIST_DIRECTORY: Self = Self(0x0000_0001);
    pub const READ_DATA: Self = Self(0x0000_0001);
    pub const WRITE_DATA: Self = Self(0x0000_0002);
    pub const APPEND_DATA: Self = Self(0x0000_0004);
    pub const READ_EXTENDED_ATTRIBUTES: Self = Self(0x0000_0008);
    pub const WRITE_EXTENDED_ATTRIBUTES: Self = Self(0x0000_0010);
    pub const TRAVERSE: Self = Self(0x0000_0020);
    pub const EXECUTE_FILE: Self = Self(0x0000_0020);
    pub const DELETE_SUBDIRECTORIES_AND_FILES: Self = Self(0x0000_0040);
    pub const READ_ATTRIBUTES: Self = Self(0x0000_0080);
    pub const WRITE_ATTRIBUTES: Self = Self(0x0000_0100);
    pub const DELETE: Self = Self(0x0001_0000);
    pub const READ_PERMISSIONS: Self = Self(0x0002_0000);
    pub const CHANGE_PERMISSIONS: Self = Self(0x0004_0000);
    pub const TAKE_OWNERSHIP: Self = Self(0x0008_0000);
    pub const SYNCHRONIZE: Self = Self(0x0010_0000);
    pub const FULL_CONTROL: Self = Self(0x001F_01FF);

    pub const GENERIC_ALL: Self = Self(0x1000_0000);
    pub const GENERIC_EXECUTE: Self = Self(0x2000_0000);
    pub const GENERIC_WRITE: Self = Self(0x4000_0000);
    pub const GENERIC_READ: Self = Self(0x8000_0000);

    /// Raw mask with every bit set; such entries are ignored.
    pub const ALL_BITS: Self = Self(u32::MAX);

    pub const READ: Self = Self(
        Self::READ_DATA.0
            | Self::READ_EXTENDED_ATTRIBUTES.0
            | Self::READ_ATTRIBUTES.0
            | Self::READ_PERMISSIONS.0,
    );
    pub const WRITE: Self = Self(
        Self::WRITE_DATA.0
            | Self::APPEND_DATA.0
            | Self::WRITE_EXTENDED_ATTRIBUTES.0
            | Self::WRITE_ATTRIBUTES.0,
    );
    pub const MODIFY: Self =
        Self(Self::READ.0 | Self::WRITE.0 | Self::EXECUTE_FILE.0 | Self::DELETE.0);

    const GENERIC_MASK: u32 = Self::GENERIC_ALL.0
        | Self::GENERIC_EXECUTE.0
        | Self::GENERIC_WRITE.0
        | Self::GENERIC_READ.0;

    /// `true` if every bit of `other` is set in `self`.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Expand generic bits into the concrete rights they stand for.
    ///
    /// If any generic bit is present the expansion replaces the mask
    /// entirely; otherwise the mask is returned unchanged.
    pub fn expand_generic(self) -> Self {
        if self.0 & Self::GENERIC_MASK == 0 {
            return self;
        }
        let mut mapped = 0u32;
        if self.contains(Self::GENERIC_EXECUTE) {
            mapped |= Self::EXECUTE_FILE.0
                | Self::READ_PERMISSIONS.0
                | Self::READ_ATTRIBUTES.0
                | Self::SYNCHRONIZE.0;
        }
        if self.contains(Self::GENERIC_READ) {
            mapped |= Self::READ_ATTRIBUTES.0
                | Self::READ_DATA.0
                | Self::READ_EXTENDED_ATTRIBUTES.0
                | Self::READ_PERMISSIONS.0
                | Self::SYNCHRONIZE.0;
        }
        if self.contains(Self::GENERIC_WRITE) {
            mapped |= Self::APPEND_DATA.0
                | Self::WRITE_ATTRIBUTES.0
                | Self::WRITE_DATA.0
                | Self::WRITE_EXTENDED_ATTRIBUTES.0
                | Self::READ_PERMISSIONS.0
                | Self::SYNCHRONIZE.0;
        }
        if self.contains(Self::GENERIC_ALL) {
            mapped |= Self::FULL_CONTROL.0;
        }
        Self(mapped)
    }
}

impl std::ops::BitOr for AccessMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for AccessMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Operation a caller wants to perform on a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessRight {
    List,
    Read,
    Write,
    Execute,
    Modify,
    FullControl,
}

impl AccessRight {
    pub const COUNT: usize = 6;

    /// Concrete mask an entry must fully contain to grant this right.
    pub fn mask(self) -> AccessMask {
        match self {
            Self::List => AccessMask::LIST_DIRECTORY,
            Self::Read => AccessMask::READ,
            Self::Write => AccessMask::WRITE,
            Self::Execute => AccessMask::EXECUTE_FILE,
            Self::Modify => AccessMask::MODIFY,
            Self::FullControl => AccessMask::FULL_CONTROL,
        }
    }

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

// ── Entries and principals ───────────────────────────────────────────────────

/// Identity an access entry applies to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Trustee {
    /// A user account.
    Account(CompactString),
    /// A group, alias or well-known identity.
    Group(CompactString),
}

impl Trustee {
    pub fn id(&self) -> &str {
        match self {
            Self::Account(id) | Self::Group(id) => id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AceKind {
    Allow,
    Deny,
}

/// One access-control entry as reported by an [`AclSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessEntry {
    pub trustee: Trustee,
    pub kind: AceKind,
    pub mask: AccessMask,
}

impl AccessEntry {
    pub fn allow(trustee: Trustee, mask: AccessMask) -> Self {
        Self {
            trustee,
            kind: AceKind::Allow,
            mask,
        }
    }

    pub fn deny(trustee: Trustee, mask: AccessMask) -> Self {
        Self {
            trustee,
            kind: AceKind::Deny,
            mask,
        }
    }
}

/// The identity the scan runs as: one account plus its group memberships.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Principal {
    pub user: CompactString,
    pub groups: HashSet<CompactString>,
}

impl Principal {
    pub fn new<I, S>(user: impl Into<CompactString>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        Self {
            user: user.into(),
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_member(&self, id: &str) -> bool {
        self.groups.contains(id)
    }

    /// Direct-principal match: accounts by identity, groups by membership.
    fn matches_directly(&self, trustee: &Trustee) -> bool {
        match trustee {
            Trustee::Account(id) => *id == self.user,
            Trustee::Group(id) => self.is_member(id),
        }
    }
}

// ── Seams ────────────────────────────────────────────────────────────────────

/// Capability check used by the walker and the scanner.
///
/// Implementations never panic and never fail: any problem answering the
/// question is an answer of `false`.
pub trait AccessGate: Send + Sync {
    fn can_access(&self, dir: &Path, right: AccessRight) -> bool;

    /// Shorthand for `can_access(dir, AccessRight::List)`.
    fn is_listable(&self, dir: &Path) -> bool {
        self.can_access(dir, AccessRight::List)
    }
}

/// Platform-specific provider of principals and access-control entries.
pub trait AclSource: Send + Sync {
    /// The identity evaluated against every entry.
    fn principal(&self) -> &Principal;

    /// Fetch the entries attached to `dir`.
    fn entries(&self, dir: &Path) -> io::Result<Vec<AccessEntry>>;

    /// Cheap empirical check that `dir` can be listed.
    fn probe_list(&self, dir: &Path) -> bool {
        std::fs::read_dir(dir).is_ok()
    }
}

/// How the direct-principal and group-inherited passes combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AclPrecedence {
    /// Each pass nets its own allows and denies; the passes are OR'd.
    Independent,
    /// A counted deny in either pass overrides every allow.
    #[default]
    DenyWins,
}

// ── Evaluation ───────────────────────────────────────────────────────────────

/// Allow/deny presence for one evaluation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassOutcome {
    pub allow: bool,
    pub deny: bool,
}

impl PassOutcome {
    fn record(&mut self, kind: AceKind) {
        match kind {
            AceKind::Allow => self.allow = true,
            AceKind::Deny => self.deny = true,
        }
    }

    pub fn granted(self) -> bool {
        self.allow && !self.deny
    }
}

/// Outcome of evaluating an entry list, before the listing probe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AclVerdict {
    pub direct: PassOutcome,
    pub group: PassOutcome,
}

impl AclVerdict {
    pub fn granted(self, precedence: AclPrecedence) -> bool {
        match precedence {
            AclPrecedence::Independent => self.direct.granted() || self.group.granted(),
            AclPrecedence::DenyWins => {
                (self.direct.allow || self.group.allow) && !(self.direct.deny || self.group.deny)
            }
        }
    }
}

/// Evaluate `entries` for `principal` requesting `wanted`.
///
/// Direct pass: entries addressed to the account or one of its groups, with
/// generic bits expanded first. Group pass: entries whose identity is one of
/// the principal's groups, comparing the raw mask. In both passes an entry
/// counts only if it carries every bit of `wanted`, and all-ones masks are
/// skipped.
pub fn evaluate(principal: &Principal, entries: &[AccessEntry], wanted: AccessMask) -> AclVerdict {
    let mut verdict = AclVerdict::default();
    for entry in entries.iter().filter(|e| e.mask != AccessMask::ALL_BITS) {
        if principal.matches_directly(&entry.trustee) && entry.mask.expand_generic().contains(wanted)
        {
            verdict.direct.record(entry.kind);
        }
        if principal.is_member(entry.trustee.id()) && entry.mask.contains(wanted) {
            verdict.group.record(entry.kind);
        }
    }
    verdict
}

// ── Gate ─────────────────────────────────────────────────────────────────────

/// ACL-evaluating [`AccessGate`] over any [`AclSource`], with permanent caching.
pub struct AclAccessGate<S> {
    source: S,
    precedence: AclPrecedence,
    inaccessible: RwLock<HashSet<PathBuf>>,
    decisions: RwLock<HashMap<PathBuf, [Option<bool>; AccessRight::COUNT]>>,
}

impl<S: AclSource> AclAccessGate<S> {
    pub fn new(source: S, precedence: AclPrecedence) -> Self {
        Self {
            source,
            precedence,
            inaccessible: RwLock::new(HashSet::new()),
            decisions: RwLock::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn precedence(&self) -> AclPrecedence {
        self.precedence
    }

    /// `true` once an ACL query on `dir` has failed.
    pub fn is_marked_inaccessible(&self, dir: &Path) -> bool {
        self.inaccessible.read().contains(dir)
    }

    /// Number of directories in the permanent negative cache.
    pub fn inaccessible_count(&self) -> usize {
        self.inaccessible.read().len()
    }

    fn cached(&self, dir: &Path, right: AccessRight) -> Option<bool> {
        self.decisions
            .read()
            .get(dir)
            .and_then(|slots| slots[right.slot()])
    }

    fn store(&self, dir: &Path, right: AccessRight, allowed: bool) {
        let mut decisions = self.decisions.write();
        let slots = decisions
            .entry(dir.to_path_buf())
            .or_insert([None; AccessRight::COUNT]);
        // First writer wins so a decision never changes once observed.
        slots[right.slot()].get_or_insert(allowed);
    }

    fn decide(&self, dir: &Path, right: AccessRight) -> bool {
        let entries = match self.source.entries(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "Access check: cannot read permissions of {}: {err}",
                    dir.display()
                );
                self.inaccessible.write().insert(dir.to_path_buf());
                return false;
            }
        };

        let verdict = evaluate(self.source.principal(), &entries, right.mask());
        if verdict.granted(self.precedence) {
            return true;
        }

        let probed = right == AccessRight::List && self.source.probe_list(dir);
        if probed {
            debug!(
                "Access check: ACL denies listing {} but the probe succeeded",
                dir.display()
            );
        }
        probed
    }
}

impl<S: AclSource> AccessGate for AclAccessGate<S> {
    fn can_access(&self, dir: &Path, right: AccessRight) -> bool {
        if self.is_marked_inaccessible(dir) {
            return false;
        }
        if let Some(allowed) = self.cached(dir, right) {
            return allowed;
        }
        let allowed = self.decide(dir, right);
        if !self.is_marked_inaccessible(dir) {
            self.store(dir, right, allowed);
        }
        allowed
    }
}

impl<G: AccessGate + ?Sized> AccessGate for std::sync::Arc<G> {
    fn can_access(&self, dir: &Path, right: AccessRight) -> bool {
        (**self).can_access(dir, right)
    }
}
