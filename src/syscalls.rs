//! Syscall numbers for the host architecture
//!
//! Only the calls a deception rule is likely to target are named; anything
//! else is shown by number.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::rules::SyscallId;

/// Highest syscall number the hook registry accepts (exclusive)
pub const MAX_SYSCALL: SyscallId = 512;

#[cfg(target_arch = "aarch64")]
const KNOWN_SYSCALLS: &[(SyscallId, &str)] = &[
    (17, "getcwd"),
    (56, "openat"),
    (57, "close"),
    (61, "getdents64"),
    (63, "read"),
    (64, "write"),
    (78, "readlinkat"),
    (79, "newfstatat"),
    (117, "ptrace"),
    (129, "kill"),
    (160, "uname"),
    (172, "getpid"),
    (174, "getuid"),
    (179, "sysinfo"),
    (221, "execve"),
];

#[cfg(not(target_arch = "aarch64"))]
const KNOWN_SYSCALLS: &[(SyscallId, &str)] = &[
    (0, "read"),
    (1, "write"),
    (2, "open"),
    (3, "close"),
    (4, "stat"),
    (39, "getpid"),
    (59, "execve"),
    (62, "kill"),
    (63, "uname"),
    (79, "getcwd"),
    (89, "readlink"),
    (99, "sysinfo"),
    (101, "ptrace"),
    (102, "getuid"),
    (217, "getdents64"),
    (257, "openat"),
];

#[cfg(target_arch = "aarch64")]
pub const SYS_UNAME: SyscallId = 160;

#[cfg(not(target_arch = "aarch64"))]
pub const SYS_UNAME: SyscallId = 63;

static NAMES: Lazy<HashMap<SyscallId, &'static str>> =
    Lazy::new(|| KNOWN_SYSCALLS.iter().copied().collect());

/// Name of a well-known syscall, if we have one
pub fn name(syscall_id: SyscallId) -> Option<&'static str> {
    NAMES.get(&syscall_id).copied()
}

/// Number of a well-known syscall by name
pub fn number(name: &str) -> Option<SyscallId> {
    KNOWN_SYSCALLS
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(id, _)| *id)
}
