//! JSONL audit logging for syscall-deception
//!
//! Records every deception hit and every administrative change to the rule
//! table, one JSON object per line.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::rules::{ContainerToken, Pid, Rule, RuleId, SyscallId};

/// Kind of audited event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEvent {
    Hit,
    RuleAdded,
    RuleRemoved,
    Cleared,
    Enabled,
    Disabled,
    Rejected,
}

/// An audit log entry
#[derive(Debug, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,

    pub event: AuditEvent,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<RuleId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub syscall: Option<SyscallId>,

    /// Calling process, for hits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<Pid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerToken>,

    pub detail: String,
}

impl AuditEntry {
    fn new(event: AuditEvent, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
            rule_id: None,
            syscall: None,
            pid: None,
            container: None,
            detail: detail.into(),
        }
    }

    /// A rule matched an intercepted call
    pub fn hit(
        rule: &Rule,
        syscall: SyscallId,
        pid: Pid,
        container: Option<&ContainerToken>,
        handler: &str,
    ) -> Self {
        Self {
            rule_id: Some(rule.id()),
            syscall: Some(syscall),
            pid: Some(pid),
            container: container.cloned(),
            ..Self::new(AuditEvent::Hit, format!("{} substituted", handler))
        }
    }

    pub fn rule_added(rule_id: RuleId, syscall: SyscallId) -> Self {
        Self {
            rule_id: Some(rule_id),
            syscall: Some(syscall),
            ..Self::new(AuditEvent::RuleAdded, "rule added")
        }
    }

    pub fn rule_removed(rule_id: RuleId) -> Self {
        Self {
            rule_id: Some(rule_id),
            ..Self::new(AuditEvent::RuleRemoved, "rule removed")
        }
    }

    pub fn cleared(count: usize) -> Self {
        Self::new(AuditEvent::Cleared, format!("{} rules cleared", count))
    }

    pub fn toggled(enabled: bool) -> Self {
        if enabled {
            Self::new(AuditEvent::Enabled, "deception enabled")
        } else {
            Self::new(AuditEvent::Disabled, "deception disabled")
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::new(AuditEvent::Rejected, reason)
    }
}

/// Audit logger
#[derive(Debug, Default)]
pub struct AuditLogger {
    writer: Option<BufWriter<File>>,
}

impl AuditLogger {
    /// Create a new audit logger; `None` or an unopenable path disables it
    pub fn new(path: Option<&Path>) -> Self {
        let writer = path.and_then(|p| {
            if let Some(parent) = p.parent() {
                let _ = std::fs::create_dir_all(parent);
            }

            match OpenOptions::new().create(true).append(true).open(p) {
                Ok(file) => Some(BufWriter::new(file)),
                Err(e) => {
                    log::warn!("audit log {} unavailable: {}", p.display(), e);
                    None
                }
            }
        });

        Self { writer }
    }

    /// Log an audit entry
    pub fn log(&mut self, entry: &AuditEntry) -> Result<(), std::io::Error> {
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(entry)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }
}
