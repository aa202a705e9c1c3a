/// Platform-specific functionality — principals, ACL sources, and the
/// access gate built over them.
pub mod access;
pub mod memory;
#[cfg(unix)]
pub mod posix;
#[cfg(windows)]
pub mod win32;

pub use access::{
    evaluate, AccessEntry, AccessGate, AccessMask, AccessRight, AceKind, AclAccessGate,
    AclPrecedence, AclSource, AclVerdict, Principal, Trustee,
};
pub use memory::MemoryAclSource;

#[cfg(unix)]
pub type NativeAclSource = posix::PosixAclSource;
#[cfg(windows)]
pub type NativeAclSource = win32::WindowsAclSource;

/// Build the access gate for the running process.
#[cfg(unix)]
pub fn native_gate(precedence: AclPrecedence) -> std::io::Result<AclAccessGate<NativeAclSource>> {
    Ok(AclAccessGate::new(posix::PosixAclSource::current(), precedence))
}

/// Build the access gate for the running process.
///
/// Fails only if the process token cannot be queried.
#[cfg(windows)]
pub fn native_gate(precedence: AclPrecedence) -> std::io::Result<AclAccessGate<NativeAclSource>> {
    Ok(AclAccessGate::new(
        win32::WindowsAclSource::current()?,
        precedence,
    ))
}
