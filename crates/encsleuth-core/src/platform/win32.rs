/// Windows [`AclSource`]: process token for the principal, the directory
/// DACL for the entries.
///
/// SIDs are rendered in their string form (`S-1-5-…`). Domain and local
/// accounts (`S-1-5-21-…`) become account trustees; every other SID is
/// treated as a group or well-known alias.
use super::access::{AccessEntry, AccessMask, AclSource, Principal, Trustee};
use compact_str::CompactString;
use std::ffi::c_void;
use std::io;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{CloseHandle, LocalFree, ERROR_SUCCESS, HANDLE, HLOCAL};
use windows::Win32::Security::Authorization::{
    ConvertSidToStringSidW, GetNamedSecurityInfoW, SE_FILE_OBJECT,
};
use windows::Win32::Security::{
    GetAce, GetTokenInformation, TokenGroups, TokenUser, ACCESS_ALLOWED_ACE, ACE_HEADER, ACL,
    DACL_SECURITY_INFORMATION, PSECURITY_DESCRIPTOR, PSID, TOKEN_GROUPS, TOKEN_QUERY, TOKEN_USER,
    TOKEN_INFORMATION_CLASS,
};
use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

const ACCESS_ALLOWED_ACE_TYPE: u8 = 0;
const ACCESS_DENIED_ACE_TYPE: u8 = 1;
const ACCOUNT_SID_PREFIX: &str = "S-1-5-21-";

pub struct WindowsAclSource {
    principal: Principal,
}

impl WindowsAclSource {
    /// Identity of the current process token.
    pub fn current() -> io::Result<Self> {
        unsafe {
            let mut token = HANDLE::default();
            OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token)
                .map_err(|e| io::Error::other(e.to_string()))?;

            let principal = read_principal(token);
            let _ = CloseHandle(token);
            Ok(Self {
                principal: principal?,
            })
        }
    }
}

impl AclSource for WindowsAclSource {
    fn principal(&self) -> &Principal {
        &self.principal
    }

    fn entries(&self, dir: &Path) -> io::Result<Vec<AccessEntry>> {
        let wide: Vec<u16> = dir.as_os_str().encode_wide().chain(Some(0)).collect();
        unsafe {
            let mut dacl: *mut ACL = std::ptr::null_mut();
            let mut descriptor = PSECURITY_DESCRIPTOR::default();
            let status = GetNamedSecurityInfoW(
                PCWSTR(wide.as_ptr()),
                SE_FILE_OBJECT,
                DACL_SECURITY_INFORMATION,
                None,
                None,
                Some(&mut dacl as *mut *mut ACL),
                None,
                &mut descriptor,
            );
            if status != ERROR_SUCCESS {
                return Err(io::Error::from_raw_os_error(status.0 as i32));
            }

            let entries = read_dacl(dacl);
            let _ = LocalFree(HLOCAL(descriptor.0));
            entries
        }
    }
}

// ── Token ────────────────────────────────────────────────────────────────────

unsafe fn read_principal(token: HANDLE) -> io::Result<Principal> {
    let user_buf = token_information(token, TokenUser)?;
    let user = &*(user_buf.as_ptr() as *const TOKEN_USER);
    let user_sid = sid_string(user.User.Sid)?;

    let groups_buf = token_information(token, TokenGroups)?;
    let groups = &*(groups_buf.as_ptr() as *const TOKEN_GROUPS);
    let members =
        std::slice::from_raw_parts(groups.Groups.as_ptr(), groups.GroupCount as usize);
    let mut sids = Vec::with_capacity(members.len());
    for member in members {
        sids.push(sid_string(member.Sid)?);
    }

    Ok(Principal::new(user_sid, sids))
}

/// Variable-length token query; the buffer is `u64`-backed for alignment.
unsafe fn token_information(
    token: HANDLE,
    class: TOKEN_INFORMATION_CLASS,
) -> io::Result<Vec<u64>> {
    let mut needed = 0u32;
    let _ = GetTokenInformation(token, class, None, 0, &mut needed);
    if needed == 0 {
        return Err(io::Error::last_os_error());
    }

    let mut buf = vec![0u64; (needed as usize).div_ceil(8)];
    GetTokenInformation(
        token,
        class,
        Some(buf.as_mut_ptr() as *mut c_void),
        needed,
        &mut needed,
    )
    .map_err(|e| io::Error::other(e.to_string()))?;
    Ok(buf)
}

// ── DACL ─────────────────────────────────────────────────────────────────────

unsafe fn read_dacl(dacl: *mut ACL) -> io::Result<Vec<AccessEntry>> {
    // A null DACL grants everyone everything.
    if dacl.is_null() {
        return Ok(vec![AccessEntry::allow(
            Trustee::Group(CompactString::new("S-1-1-0")),
            AccessMask::FULL_CONTROL,
        )]);
    }

    let count = (*dacl).AceCount as u32;
    let mut entries = Vec::with_capacity(count as usize);
    for index in 0..count {
        let mut ace: *mut c_void = std::ptr::null_mut();
        if GetAce(dacl, index, &mut ace).is_err() || ace.is_null() {
            continue;
        }
        let header = &*(ace as *const ACE_HEADER);
        if header.AceType != ACCESS_ALLOWED_ACE_TYPE && header.AceType != ACCESS_DENIED_ACE_TYPE {
            continue;
        }

        // Allowed and denied ACEs share one layout.
        let body = &*(ace as *const ACCESS_ALLOWED_ACE);
        let sid = PSID(&body.SidStart as *const u32 as *mut c_void);
        let id = sid_string(sid)?;
        let trustee = trustee_for(id);
        let mask = AccessMask(body.Mask);

        entries.push(if header.AceType == ACCESS_ALLOWED_ACE_TYPE {
            AccessEntry::allow(trustee, mask)
        } else {
            AccessEntry::deny(trustee, mask)
        });
    }
    Ok(entries)
}

fn trustee_for(sid: CompactString) -> Trustee {
    if sid.starts_with(ACCOUNT_SID_PREFIX) {
        Trustee::Account(sid)
    } else {
        Trustee::Group(sid)
    }
}

unsafe fn sid_string(sid: PSID) -> io::Result<CompactString> {
    let mut raw = PWSTR::null();
    ConvertSidToStringSidW(sid, &mut raw).map_err(|e| io::Error::other(e.to_string()))?;
    let text = raw.to_string();
    let _ = LocalFree(HLOCAL(raw.0 as *mut c_void));
    text.map(CompactString::from)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::access::{AccessGate, AccessRight, AclAccessGate, AclPrecedence};

    #[test]
    fn account_sids_become_account_trustees() {
        let account = trustee_for(CompactString::new("S-1-5-21-1-2-3-1001"));
        assert!(matches!(account, Trustee::Account(_)));
        let builtin = trustee_for(CompactString::new("S-1-5-32-544"));
        assert!(matches!(builtin, Trustee::Group(_)));
    }

    #[test]
    fn current_user_can_list_own_temp_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = WindowsAclSource::current().unwrap();
        assert!(source.principal().user.starts_with("S-1-"));
        let gate = AclAccessGate::new(source, AclPrecedence::DenyWins);
        assert!(gate.can_access(tmp.path(), AccessRight::List));
    }
}
