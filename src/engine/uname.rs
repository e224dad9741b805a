//! uname interception
//!
//! On a hit the genuine identity is snapshotted and only `sysname` is
//! replaced, so the rest of the structure stays consistent with the host.

use std::ffi::OsStr;
use std::sync::Arc;

use crate::engine::hooks::HookRegistry;
use crate::engine::{SyscallCall, SyscallHandler, SyscallResult};
use crate::error::Result;
use crate::rules::Rule;
use crate::syscalls::SYS_UNAME;

/// Bytes per `new_utsname` field, including the terminating NUL
pub const UTS_FIELD_LEN: usize = 65;

/// Size of the marshalled structure
pub const UTSNAME_SIZE: usize = UTS_FIELD_LEN * 6;

/// System identity as returned by uname(2)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UtsName {
    pub sysname: String,
    pub nodename: String,
    pub release: String,
    pub version: String,
    pub machine: String,
    pub domainname: String,
}

impl UtsName {
    fn fields(&self) -> [&str; 6] {
        [
            &self.sysname,
            &self.nodename,
            &self.release,
            &self.version,
            &self.machine,
            &self.domainname,
        ]
    }

    /// Marshal into the fixed `new_utsname` layout.
    ///
    /// Over-long values are truncated so every field stays NUL-terminated.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; UTSNAME_SIZE];
        for (i, field) in self.fields().iter().enumerate() {
            let bytes = field.as_bytes();
            let len = bytes.len().min(UTS_FIELD_LEN - 1);
            let start = i * UTS_FIELD_LEN;
            out[start..start + len].copy_from_slice(&bytes[..len]);
        }
        out
    }

    /// Parse the fixed layout back, e.g. from a caller's buffer
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < UTSNAME_SIZE {
            return None;
        }

        let field = |i: usize| {
            let raw = &bytes[i * UTS_FIELD_LEN..(i + 1) * UTS_FIELD_LEN];
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            String::from_utf8_lossy(&raw[..end]).into_owned()
        };

        Some(Self {
            sysname: field(0),
            nodename: field(1),
            release: field(2),
            version: field(3),
            machine: field(4),
            domainname: field(5),
        })
    }

    /// Overwrite `sysname` if the replacement fits the field
    fn apply(&mut self, replacement: Option<&str>) {
        if let Some(replacement) = replacement {
            if replacement.len() < UTS_FIELD_LEN - 1 {
                self.sysname = replacement.to_string();
            } else {
                log::warn!(
                    "replacement of {} bytes does not fit sysname; keeping genuine value",
                    replacement.len()
                );
            }
        }
    }
}

/// Where the genuine identity comes from
pub trait UtsSource: Send + Sync {
    fn snapshot(&self) -> Result<UtsName>;
}

/// A fixed identity
impl UtsSource for UtsName {
    fn snapshot(&self) -> Result<UtsName> {
        Ok(self.clone())
    }
}

/// The running kernel's identity, straight from uname(2)
#[derive(Debug, Default, Clone, Copy)]
pub struct HostUts;

impl UtsSource for HostUts {
    fn snapshot(&self) -> Result<UtsName> {
        let uts = nix::sys::utsname::uname()?;
        let field = |s: &OsStr| s.to_string_lossy().into_owned();

        Ok(UtsName {
            sysname: field(uts.sysname()),
            nodename: field(uts.nodename()),
            release: field(uts.release()),
            version: field(uts.version()),
            machine: field(uts.machine()),
            domainname: field(uts.domainname()),
        })
    }
}

/// Handler for uname(2)
pub struct UnameHandler {
    source: Box<dyn UtsSource>,
}

impl UnameHandler {
    pub fn new(source: impl UtsSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

impl SyscallHandler for UnameHandler {
    fn name(&self) -> &'static str {
        "uname"
    }

    fn call_real(&self, call: &mut SyscallCall<'_>) -> SyscallResult {
        let uts = self.source.snapshot()?;
        call.user.copy_to_user(&uts.to_bytes())?;
        Ok(0)
    }

    fn substitute(&self, rule: &Rule, call: &mut SyscallCall<'_>) -> SyscallResult {
        let mut uts = self.source.snapshot()?;
        uts.apply(rule.replacement());
        call.user.copy_to_user(&uts.to_bytes())?;
        Ok(0)
    }
}

/// Hook uname with the given identity source
pub fn install(registry: &HookRegistry, source: impl UtsSource + 'static) -> Result<()> {
    registry.install_hook(SYS_UNAME, Arc::new(UnameHandler::new(source)))
}
