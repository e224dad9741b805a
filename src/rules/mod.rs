//! Deception rules
//!
//! A [`Rule`] describes one substitution policy: which syscall it applies to,
//! how it is scoped (container, pid, argument pattern) and what value it
//! substitutes. Rules are immutable once the [`table::RuleTable`] has assigned
//! them an id.

pub mod table;

use bitflags::bitflags;
use serde::Serialize;
use std::fmt;

use crate::error::{DeceptionError, Result};

/// Syscall number as seen by the interception mechanism
pub type SyscallId = u32;

/// Process identifier (0 means "any process" in rule scope)
pub type Pid = u32;

/// Unique rule identifier, assigned once by the table and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RuleId(pub u64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Behavior modifiers carried by a rule.
    ///
    /// Not consulted by matching. Unknown bits are retained as given.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RuleFlags: u64 {
        const LOG_ONLY = 1 << 0;
        const DENY = 1 << 1;
        const ONE_SHOT = 1 << 2;
    }
}

/// Opaque identity of an isolation boundary; only equality is meaningful
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContainerToken(String);

impl ContainerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unvalidated rule fields, as handed to [`table::RuleTable::add`].
///
/// Strings are borrowed from the caller; the table copies them into the
/// rule it owns. Empty strings are treated as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSpec<'a> {
    pub syscall_id: Option<SyscallId>,
    pub pattern: Option<&'a str>,
    pub replacement: Option<&'a str>,
    pub container: Option<&'a str>,
    pub pid: Pid,
    pub flags: RuleFlags,
}

impl<'a> RuleSpec<'a> {
    /// Start a spec for the given syscall
    pub fn for_syscall(syscall_id: SyscallId) -> Self {
        Self {
            syscall_id: Some(syscall_id),
            ..Self::default()
        }
    }

    pub fn pattern(mut self, pattern: &'a str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn replacement(mut self, replacement: &'a str) -> Self {
        self.replacement = Some(replacement);
        self
    }

    pub fn container(mut self, container: &'a str) -> Self {
        self.container = Some(container);
        self
    }

    pub fn pid(mut self, pid: Pid) -> Self {
        self.pid = pid;
        self
    }

    pub fn flags(mut self, flags: RuleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Validate and copy the fields into owned storage.
    ///
    /// Runs before the table lock is taken, so all allocation happens
    /// outside the critical section.
    pub(crate) fn prepare(&self) -> Result<PendingRule> {
        let syscall_id = self
            .syscall_id
            .ok_or_else(|| DeceptionError::invalid("syscall_id is required"))?;

        Ok(PendingRule {
            syscall_id,
            pattern: owned_field(self.pattern)?,
            replacement: owned_field(self.replacement)?,
            target_container: owned_field(self.container)?.map(ContainerToken),
            target_pid: (self.pid != 0).then_some(self.pid),
            flags: self.flags,
        })
    }
}

/// Copy an optional field, reporting exhaustion instead of aborting
fn owned_field(value: Option<&str>) -> Result<Option<String>> {
    match value {
        None | Some("") => Ok(None),
        Some(s) => {
            let mut owned = String::new();
            owned.try_reserve_exact(s.len())?;
            owned.push_str(s);
            Ok(Some(owned))
        }
    }
}

/// A validated rule waiting for its id
#[derive(Debug)]
pub(crate) struct PendingRule {
    syscall_id: SyscallId,
    pattern: Option<String>,
    replacement: Option<String>,
    target_container: Option<ContainerToken>,
    target_pid: Option<Pid>,
    flags: RuleFlags,
}

impl PendingRule {
    pub(crate) fn into_rule(self, rule_id: RuleId) -> Rule {
        Rule {
            rule_id,
            syscall_id: self.syscall_id,
            pattern: self.pattern,
            replacement: self.replacement,
            target_container: self.target_container,
            target_pid: self.target_pid,
            flags: self.flags,
        }
    }
}

/// A live substitution policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    rule_id: RuleId,
    syscall_id: SyscallId,
    pattern: Option<String>,
    replacement: Option<String>,
    target_container: Option<ContainerToken>,
    target_pid: Option<Pid>,
    flags: RuleFlags,
}

impl Rule {
    pub fn id(&self) -> RuleId {
        self.rule_id
    }

    pub fn syscall_id(&self) -> SyscallId {
        self.syscall_id
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }

    pub fn target_container(&self) -> Option<&ContainerToken> {
        self.target_container.as_ref()
    }

    /// Target pid; `None` matches any process
    pub fn target_pid(&self) -> Option<Pid> {
        self.target_pid
    }

    pub fn flags(&self) -> RuleFlags {
        self.flags
    }
}
