//! Administrative control commands
//!
//! Commands are colon-delimited lines:
//!
//! ```text
//! add:<syscall>:<pattern>:<replacement>:<container>[:<pid>[:<flags>]]
//! remove:<rule_id>
//! clear
//! enable
//! disable
//! ```
//!
//! `<syscall>` is a decimal number or a well-known syscall name. Empty
//! optional fields are absent. A command either applies completely or leaves
//! the table untouched.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use syscall_deception::{ControlInterface, DeceptionEngine};
//!
//! let control = ControlInterface::new(Arc::new(DeceptionEngine::default()));
//! let consumed = control.write(b"add:63::Linux-Fake:\n").unwrap();
//! assert_eq!(consumed, 20);
//! assert!(control.read().contains("rules: 1"));
//! ```

use log::{error, info};
use std::sync::Arc;

use crate::audit::AuditEntry;
use crate::engine::DeceptionEngine;
use crate::error::{DeceptionError, Result};
use crate::output::{render_listing, CommandOutcome};
use crate::rules::{Pid, RuleFlags, RuleId, RuleSpec, SyscallId};
use crate::syscalls;

/// Most fields an `add` command may carry, verb included
const MAX_ADD_FIELDS: usize = 7;

/// A parsed control command, borrowing its strings from the input
#[derive(Debug, Clone, Copy)]
pub enum ControlCommand<'a> {
    Add(RuleSpec<'a>),
    Remove(RuleId),
    Clear,
    Enable,
    Disable,
}

impl<'a> ControlCommand<'a> {
    /// Parse one command line; a trailing newline is ignored
    pub fn parse(input: &'a str) -> Result<Self> {
        let line = input.trim_end_matches(['\n', '\r']);
        let fields: Vec<&str> = line.split(':').collect();

        match fields[0] {
            "add" => parse_add(&fields),
            "remove" => parse_remove(&fields),
            "clear" => Ok(ControlCommand::Clear),
            "enable" => Ok(ControlCommand::Enable),
            "disable" => Ok(ControlCommand::Disable),
            other => Err(DeceptionError::InvalidCommand(other.to_string())),
        }
    }
}

fn field<'a>(fields: &[&'a str], index: usize) -> Option<&'a str> {
    fields.get(index).copied().filter(|f| !f.is_empty())
}

fn parse_add<'a>(fields: &[&'a str]) -> Result<ControlCommand<'a>> {
    if fields.len() > MAX_ADD_FIELDS {
        return Err(DeceptionError::invalid(format!(
            "add takes at most {} fields",
            MAX_ADD_FIELDS - 1
        )));
    }

    let syscall = field(fields, 1)
        .ok_or_else(|| DeceptionError::invalid("add requires a syscall"))?;

    Ok(ControlCommand::Add(RuleSpec {
        syscall_id: Some(parse_syscall(syscall)?),
        pattern: field(fields, 2),
        replacement: field(fields, 3),
        container: field(fields, 4),
        pid: field(fields, 5).map(parse_pid).transpose()?.unwrap_or(0),
        flags: field(fields, 6)
            .map(parse_flags)
            .transpose()?
            .unwrap_or_default(),
    }))
}

fn parse_remove<'a>(fields: &[&'a str]) -> Result<ControlCommand<'a>> {
    if fields.len() > 2 {
        return Err(DeceptionError::invalid("remove takes one rule id"));
    }

    let id = field(fields, 1).ok_or_else(|| DeceptionError::invalid("remove requires a rule id"))?;
    id.parse::<u64>()
        .map(|id| ControlCommand::Remove(RuleId(id)))
        .map_err(|_| DeceptionError::invalid(format!("bad rule id {:?}", id)))
}

fn parse_syscall(value: &str) -> Result<SyscallId> {
    value
        .parse::<SyscallId>()
        .ok()
        .or_else(|| syscalls::number(value))
        .ok_or_else(|| DeceptionError::invalid(format!("bad syscall {:?}", value)))
}

fn parse_pid(value: &str) -> Result<Pid> {
    value
        .parse::<Pid>()
        .map_err(|_| DeceptionError::invalid(format!("bad pid {:?}", value)))
}

fn parse_flags(value: &str) -> Result<RuleFlags> {
    let bits = match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    }
    .map_err(|_| DeceptionError::invalid(format!("bad flags {:?}", value)))?;

    Ok(RuleFlags::from_bits_retain(bits))
}

/// Write/read surface over the engine's rule table
pub struct ControlInterface {
    engine: Arc<DeceptionEngine>,
}

impl ControlInterface {
    pub fn new(engine: Arc<DeceptionEngine>) -> Self {
        Self { engine }
    }

    /// Apply a parsed command
    pub fn execute(&self, command: ControlCommand<'_>) -> Result<CommandOutcome> {
        let table = self.engine.table();

        let (outcome, entry) = match command {
            ControlCommand::Add(spec) => {
                let rule_id = table.add(spec)?;
                // syscall_id is known to be present once add succeeded
                let syscall = spec.syscall_id.unwrap_or_default();
                (
                    CommandOutcome::Added { rule_id },
                    AuditEntry::rule_added(rule_id, syscall),
                )
            }
            ControlCommand::Remove(rule_id) => {
                table.remove(rule_id)?;
                (
                    CommandOutcome::Removed { rule_id },
                    AuditEntry::rule_removed(rule_id),
                )
            }
            ControlCommand::Clear => {
                let count = table.clear()?;
                (CommandOutcome::Cleared { count }, AuditEntry::cleared(count))
            }
            ControlCommand::Enable | ControlCommand::Disable => {
                let enabled = matches!(command, ControlCommand::Enable);
                table.set_enabled(enabled);
                (
                    CommandOutcome::Toggled { enabled },
                    AuditEntry::toggled(enabled),
                )
            }
        };

        self.engine.record(&entry);
        Ok(outcome)
    }

    /// Parse and apply one command line
    pub fn submit(&self, line: &str) -> Result<CommandOutcome> {
        let result = ControlCommand::parse(line).and_then(|command| self.execute(command));

        match &result {
            Ok(outcome) => info!("control: {}", outcome.message()),
            Err(e) => {
                error!("control command rejected: {}", e);
                self.engine.record(&AuditEntry::rejected(e.to_string()));
            }
        }

        result
    }

    /// Transport-style write: returns the number of bytes consumed
    pub fn write(&self, buffer: &[u8]) -> Result<usize> {
        let line = std::str::from_utf8(buffer)
            .map_err(|_| DeceptionError::invalid("command is not valid UTF-8"))?;
        self.submit(line)?;
        Ok(buffer.len())
    }

    /// Transport-style read: the current rule listing
    pub fn read(&self) -> String {
        render_listing(self.engine.table())
    }
}
