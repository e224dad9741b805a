//! Deception engine for syscall-deception
//!
//! [`DeceptionEngine`] is the process-wide context: it owns the rule table,
//! the container resolver and the audit log, and it implements the dispatch
//! protocol every hooked syscall follows:
//!
//! 1. resolve the caller's container (failure means "no container");
//! 2. look up the first matching rule;
//! 3. on a miss, run the real implementation untouched;
//! 4. on a hit, audit the hit, then let the handler build a substituted
//!    result from the genuine state and deliver it to the caller.

pub mod hooks;
pub mod memory;
pub mod uname;

use log::info;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::audit::{AuditEntry, AuditLogger};
use crate::config::Config;
use crate::container::{ContainerResolver, NoContainer};
use crate::error::Result;
use crate::rules::table::RuleTable;
use crate::rules::{Pid, Rule, SyscallId};

use self::memory::UserMemory;

/// Result of a syscall: the return value, or an error reported as errno
pub type SyscallResult = Result<i64>;

/// The process making an intercepted call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub pid: Pid,
}

impl Task {
    pub fn new(pid: Pid) -> Self {
        Self { pid }
    }
}

/// One intercepted invocation
pub struct SyscallCall<'a> {
    pub task: Task,

    /// The argument a rule pattern is matched against, if the syscall has one
    pub argument: Option<&'a str>,

    /// Where the result structure is delivered
    pub user: &'a mut dyn UserMemory,
}

impl<'a> SyscallCall<'a> {
    pub fn new(task: Task, argument: Option<&'a str>, user: &'a mut dyn UserMemory) -> Self {
        Self {
            task,
            argument,
            user,
        }
    }
}

/// Per-syscall behavior plugged into the dispatcher
pub trait SyscallHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run the genuine implementation
    fn call_real(&self, call: &mut SyscallCall<'_>) -> SyscallResult;

    /// Build and deliver the substituted result for `rule`
    fn substitute(&self, rule: &Rule, call: &mut SyscallCall<'_>) -> SyscallResult;
}

/// Process-wide deception context
pub struct DeceptionEngine {
    table: Arc<RuleTable>,
    resolver: Box<dyn ContainerResolver>,
    audit: Mutex<AuditLogger>,
}

impl Default for DeceptionEngine {
    fn default() -> Self {
        Self::new(Arc::new(RuleTable::new()))
    }
}

impl DeceptionEngine {
    /// Engine over `table` with no container resolution and no audit log
    pub fn new(table: Arc<RuleTable>) -> Self {
        Self {
            table,
            resolver: Box::new(NoContainer),
            audit: Mutex::new(AuditLogger::default()),
        }
    }

    /// Build the table, resolver and audit log described by `config`
    pub fn from_config(config: &Config) -> Self {
        let table = RuleTable::with_matcher(config.matching.pattern_matcher.build());
        table.set_enabled(config.general.enabled);

        let audit_path = config.audit_path();
        Self::new(Arc::new(table))
            .with_resolver(config.container.resolver.build())
            .with_audit(AuditLogger::new(audit_path.as_deref()))
    }

    pub fn with_resolver(mut self, resolver: Box<dyn ContainerResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Mutex::new(audit);
        self
    }

    pub fn table(&self) -> &Arc<RuleTable> {
        &self.table
    }

    /// Decide between the real and the substituted result for one call
    pub fn dispatch(
        &self,
        syscall_id: SyscallId,
        handler: &dyn SyscallHandler,
        call: &mut SyscallCall<'_>,
    ) -> SyscallResult {
        let container = self.resolver.resolve(&call.task);

        let Some(rule) =
            self.table
                .find_match(syscall_id, call.argument, container.as_ref(), call.task.pid)
        else {
            return handler.call_real(call);
        };

        info!(
            "intercepted {} from pid {} (rule {})",
            handler.name(),
            call.task.pid,
            rule.id()
        );
        self.record(&AuditEntry::hit(
            &rule,
            syscall_id,
            call.task.pid,
            container.as_ref(),
            handler.name(),
        ));

        handler.substitute(&rule, call)
    }

    /// Append to the audit log; failures are logged, never propagated
    pub fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.audit.lock().log(entry) {
            log::warn!("failed to write audit log: {}", e);
        }
    }

    /// Release every rule at shutdown
    pub fn shutdown(&self) {
        self.table.teardown();
    }
}
