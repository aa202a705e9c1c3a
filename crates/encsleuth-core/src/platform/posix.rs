/// POSIX [`AclSource`]: translates mode bits into access entries.
///
/// POSIX picks exactly one permission class per caller: owner if the
/// effective uid owns the directory, else group if the owning gid is among
/// the caller's groups, else other. The source performs that selection and
/// emits a single allow entry for the chosen class, so the shared evaluator
/// sees the same answer the kernel would give.
use super::access::{AccessEntry, AccessMask, AclSource, Principal, Trustee};
use compact_str::{format_compact, CompactString};
use std::collections::HashSet;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// Well-known group every principal belongs to; carries the "other" bits.
pub const EVERYONE: &str = "everyone";

const READ_BIT: u32 = 0o4;
const WRITE_BIT: u32 = 0o2;
const EXEC_BIT: u32 = 0o1;

pub struct PosixAclSource {
    principal: Principal,
    euid: u32,
    gids: HashSet<u32>,
}

impl PosixAclSource {
    /// Identity of the running process: effective uid, effective gid and
    /// supplementary groups.
    pub fn current() -> Self {
        // SAFETY: geteuid/getegid cannot fail and touch no memory.
        let (euid, egid) = unsafe { (libc::geteuid(), libc::getegid()) };
        let mut gids = supplementary_groups();
        gids.push(egid);
        Self::with_identity(euid, gids)
    }

    /// Explicit identity, used by tests.
    pub fn with_identity(euid: u32, gids: impl IntoIterator<Item = u32>) -> Self {
        let gids: HashSet<u32> = gids.into_iter().collect();
        let mut groups: Vec<CompactString> = gids.iter().map(|g| group_id(*g)).collect();
        groups.push(CompactString::new(EVERYONE));
        Self {
            principal: Principal::new(user_id(euid), groups),
            euid,
            gids,
        }
    }

    /// Entries for a directory with the given owner, group and mode.
    pub fn entries_for(&self, owner: u32, group: u32, mode: u32) -> Vec<AccessEntry> {
        if self.euid == 0 {
            return vec![AccessEntry::allow(
                Trustee::Account(user_id(0)),
                AccessMask::FULL_CONTROL,
            )];
        }

        let (trustee, bits, is_owner) = if owner == self.euid {
            (Trustee::Account(user_id(owner)), (mode >> 6) & 0o7, true)
        } else if self.gids.contains(&group) {
            (Trustee::Group(group_id(group)), (mode >> 3) & 0o7, false)
        } else {
            (Trustee::Group(CompactString::new(EVERYONE)), mode & 0o7, false)
        };

        vec![AccessEntry::allow(trustee, mode_bits_to_mask(bits, is_owner))]
    }
}

impl AclSource for PosixAclSource {
    fn principal(&self) -> &Principal {
        &self.principal
    }

    fn entries(&self, dir: &Path) -> io::Result<Vec<AccessEntry>> {
        let meta = std::fs::metadata(dir)?;
        if !meta.is_dir() {
            return Err(io::Error::other(format!("{} is not a directory", dir.display())));
        }
        Ok(self.entries_for(meta.uid(), meta.gid(), meta.mode()))
    }
}

/// Map one rwx triplet onto concrete rights.
///
/// Attribute and permission reads are always granted; the owner also gets
/// the rights that `chmod`/`chown`/`rm` imply.
pub fn mode_bits_to_mask(bits: u32, is_owner: bool) -> AccessMask {
    let mut mask =
        AccessMask::READ_ATTRIBUTES | AccessMask::READ_PERMISSIONS | AccessMask::SYNCHRONIZE;
    if bits & READ_BIT != 0 {
        mask |= AccessMask::LIST_DIRECTORY | AccessMask::READ_EXTENDED_ATTRIBUTES;
    }
    if bits & WRITE_BIT != 0 {
        mask |= AccessMask::WRITE_DATA
            | AccessMask::APPEND_DATA
            | AccessMask::WRITE_EXTENDED_ATTRIBUTES
            | AccessMask::DELETE_SUBDIRECTORIES_AND_FILES;
    }
    if bits & EXEC_BIT != 0 {
        mask |= AccessMask::TRAVERSE;
    }
    if is_owner {
        mask |= AccessMask::WRITE_ATTRIBUTES
            | AccessMask::DELETE
            | AccessMask::CHANGE_PERMISSIONS
            | AccessMask::TAKE_OWNERSHIP;
    }
    mask
}

fn user_id(uid: u32) -> CompactString {
    format_compact!("uid:{uid}")
}

fn group_id(gid: u32) -> CompactString {
    format_compact!("gid:{gid}")
}

fn supplementary_groups() -> Vec<u32> {
    // SAFETY: a zero-length call only reports the group count.
    let count = unsafe { libc::getgroups(0, std::ptr::null_mut()) };
    if count <= 0 {
        return Vec::new();
    }
    let mut groups: Vec<libc::gid_t> = vec![0; count as usize];
    // SAFETY: `groups` has room for exactly `count` entries.
    let written = unsafe { libc::getgroups(count, groups.as_mut_ptr()) };
    if written < 0 {
        return Vec::new();
    }
    groups.truncate(written as usize);
    groups.into_iter().map(|g| g as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::access::{evaluate, AccessGate, AccessRight, AclAccessGate, AclPrecedence};

    fn granted(source: &PosixAclSource, owner: u32, group: u32, mode: u32, right: AccessRight) -> bool {
        let entries = source.entries_for(owner, group, mode);
        evaluate(source.principal(), &entries, right.mask()).granted(AclPrecedence::DenyWins)
    }

    #[test]
    fn owner_with_rwx_has_full_control() {
        assert_eq!(mode_bits_to_mask(0o7, true), AccessMask::FULL_CONTROL);
    }

    #[test]
    fn owner_class_applies_even_when_group_is_wider() {
        let me = PosixAclSource::with_identity(1000, [100]);
        // Owner has no bits, group has rwx: POSIX still denies the owner.
        assert!(!granted(&me, 1000, 100, 0o070, AccessRight::List));
        assert!(granted(&me, 1000, 100, 0o500, AccessRight::List));
        assert!(!granted(&me, 1000, 100, 0o500, AccessRight::Write));
    }

    #[test]
    fn group_and_other_classes() {
        let me = PosixAclSource::with_identity(1000, [100]);
        assert!(granted(&me, 0, 100, 0o750, AccessRight::List));
        assert!(!granted(&me, 0, 100, 0o705, AccessRight::List));
        assert!(granted(&me, 0, 200, 0o705, AccessRight::List));
        assert!(granted(&me, 0, 200, 0o705, AccessRight::Execute));
        assert!(!granted(&me, 0, 200, 0o700, AccessRight::List));
    }

    #[test]
    fn root_is_never_refused() {
        let root = PosixAclSource::with_identity(0, [0]);
        assert!(granted(&root, 1000, 1000, 0o000, AccessRight::FullControl));
    }

    #[test]
    fn real_directory_is_listable_by_its_owner() {
        let tmp = tempfile::TempDir::new().unwrap();
        let gate = AclAccessGate::new(PosixAclSource::current(), AclPrecedence::DenyWins);
        assert!(gate.can_access(tmp.path(), AccessRight::List));
        assert!(gate.can_access(tmp.path(), AccessRight::Read));
    }

    #[test]
    fn vanished_directory_is_denied_and_remembered() {
        let tmp = tempfile::TempDir::new().unwrap();
        let gone = tmp.path().join("gone");
        let gate = AclAccessGate::new(PosixAclSource::current(), AclPrecedence::DenyWins);
        assert!(!gate.can_access(&gone, AccessRight::List));
        assert!(gate.is_marked_inaccessible(&gone));
    }
}
