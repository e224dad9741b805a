//! Human-readable output for the control surface
//!
//! Renders the rule listing served on reads and the one-line responses to
//! administrative commands.

use std::fmt::Write;

use crate::rules::table::RuleTable;
use crate::rules::{Rule, RuleId};
use crate::syscalls;

/// Result of a successfully applied control command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// A rule was inserted
    Added { rule_id: RuleId },

    /// A rule was released
    Removed { rule_id: RuleId },

    /// The table was emptied
    Cleared { count: usize },

    /// The global switch was set
    Toggled { enabled: bool },
}

impl CommandOutcome {
    /// Id of the rule the command created or removed
    pub fn rule_id(&self) -> Option<RuleId> {
        match self {
            CommandOutcome::Added { rule_id } => Some(*rule_id),
            CommandOutcome::Removed { rule_id } => Some(*rule_id),
            CommandOutcome::Cleared { .. } => None,
            CommandOutcome::Toggled { .. } => None,
        }
    }

    /// One-line response text
    pub fn message(&self) -> String {
        match self {
            CommandOutcome::Added { rule_id } => format!("added rule {}", rule_id),
            CommandOutcome::Removed { rule_id } => format!("removed rule {}", rule_id),
            CommandOutcome::Cleared { count } => format!("cleared {} rules", count),
            CommandOutcome::Toggled { enabled: true } => "deception enabled".to_string(),
            CommandOutcome::Toggled { enabled: false } => "deception disabled".to_string(),
        }
    }
}

fn optional(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("{:?}", v),
        None => "-".to_string(),
    }
}

/// One listing line for `rule`
pub fn format_rule(rule: &Rule) -> String {
    let syscall = match syscalls::name(rule.syscall_id()) {
        Some(name) => format!("{} ({})", rule.syscall_id(), name),
        None => rule.syscall_id().to_string(),
    };
    let container = rule
        .target_container()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "*".to_string());
    let pid = rule
        .target_pid()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "*".to_string());

    format!(
        "#{} syscall={} pattern={} replacement={} container={} pid={} flags={:#x}",
        rule.id(),
        syscall,
        optional(rule.pattern()),
        optional(rule.replacement()),
        container,
        pid,
        rule.flags().bits()
    )
}

/// Full listing of the table
pub fn render_listing(table: &RuleTable) -> String {
    let rules = table.snapshot();
    let mut out = String::new();

    let _ = writeln!(out, "Deception Rules:");
    let _ = writeln!(out, "================");
    let _ = writeln!(
        out,
        "enabled: {}",
        if table.is_enabled() { "yes" } else { "no" }
    );
    let _ = writeln!(out, "matcher: {}", table.matcher_name());
    let _ = writeln!(out, "rules: {}", rules.len());

    if rules.is_empty() {
        let _ = writeln!(out, "No rules configured.");
    }
    for rule in &rules {
        let _ = writeln!(out, "  {}", format_rule(rule));
    }

    out
}
