//! The live rule table
//!
//! Rules are stored in a map keyed by [`RuleId`]. Ids are handed out from a
//! counter that only ever grows, and they are assigned while the write lock
//! is held, so ascending id order is exactly insertion order. Lookups walk the
//! map in that order and return the first qualifying rule.
//!
//! One `RwLock` guards the map, the counter and the open/closed state.
//! Lookups share it for reading; add, remove, clear and teardown hold it
//! exclusively, so a lookup never sees a half-applied mutation. Rule fields are
//! copied before the lock is taken, and removed rules are dropped after it
//! is released.

use log::info;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{DeceptionError, Result};
use crate::matcher::{argument_match, container_match, pid_match, ExactMatcher, PatternMatcher};
use crate::rules::{ContainerToken, Pid, Rule, RuleId, RuleSpec, SyscallId};

#[derive(Debug)]
struct TableState {
    rules: BTreeMap<RuleId, Rule>,
    next_id: u64,
    open: bool,
}

impl TableState {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(DeceptionError::invalid("rule table has been torn down"))
        }
    }
}

/// Concurrent, insertion-ordered rule table
#[derive(Debug)]
pub struct RuleTable {
    state: RwLock<TableState>,
    enabled: AtomicBool,
    matcher: Box<dyn PatternMatcher>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleTable {
    /// Create an empty, enabled table using exact pattern matching
    pub fn new() -> Self {
        Self::with_matcher(Box::new(ExactMatcher))
    }

    /// Create an empty, enabled table with a custom argument matcher
    pub fn with_matcher(matcher: Box<dyn PatternMatcher>) -> Self {
        Self {
            state: RwLock::new(TableState {
                rules: BTreeMap::new(),
                next_id: 1,
                open: true,
            }),
            enabled: AtomicBool::new(true),
            matcher,
        }
    }

    /// Validate `spec`, take ownership of a copy and append it
    pub fn add(&self, spec: RuleSpec<'_>) -> Result<RuleId> {
        let pending = spec.prepare()?;
        let syscall_id = pending.syscall_id;

        let rule_id = {
            let mut state = self.state.write();
            state.ensure_open()?;

            let rule_id = RuleId(state.next_id);
            state.next_id += 1;
            state.rules.insert(rule_id, pending.into_rule(rule_id));
            rule_id
        };

        info!("added rule {} for syscall {}", rule_id, syscall_id);
        Ok(rule_id)
    }

    /// Remove one rule by id
    pub fn remove(&self, rule_id: RuleId) -> Result<()> {
        let removed = {
            let mut state = self.state.write();
            state.ensure_open()?;
            state.rules.remove(&rule_id)
        };

        match removed {
            Some(_) => {
                info!("removed rule {}", rule_id);
                Ok(())
            }
            None => Err(DeceptionError::NotFound(rule_id)),
        }
    }

    /// Remove every rule; returns how many were released
    pub fn clear(&self) -> Result<usize> {
        let drained = {
            let mut state = self.state.write();
            state.ensure_open()?;
            std::mem::take(&mut state.rules)
        };

        info!("cleared {} rules", drained.len());
        Ok(drained.len())
    }

    /// First rule, in insertion order, whose scope covers this event.
    ///
    /// Returns a copy so the caller never holds a reference into the table.
    pub fn find_match(
        &self,
        syscall_id: SyscallId,
        argument: Option<&str>,
        container: Option<&ContainerToken>,
        pid: Pid,
    ) -> Option<Rule> {
        if !self.is_enabled() {
            return None;
        }

        let state = self.state.read();
        if !state.open {
            return None;
        }

        state
            .rules
            .values()
            .find(|rule| {
                rule.syscall_id() == syscall_id
                    && container_match(container, rule.target_container())
                    && pid_match(pid, rule.target_pid())
                    && argument_match(self.matcher.as_ref(), rule.pattern(), argument)
            })
            .cloned()
    }

    /// Turn matching on or off without touching the rules.
    ///
    /// Returns the previous setting.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let previous = self.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!("deception {}", if enabled { "enabled" } else { "disabled" });
        }
        previous
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.state.read().rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all live rules in insertion order
    pub fn snapshot(&self) -> Vec<Rule> {
        self.state.read().rules.values().cloned().collect()
    }

    /// Name of the argument matcher in use
    pub fn matcher_name(&self) -> &'static str {
        self.matcher.name()
    }

    /// Release every rule and refuse further mutation
    pub fn teardown(&self) {
        let drained = {
            let mut state = self.state.write();
            state.open = false;
            std::mem::take(&mut state.rules)
        };

        info!("rule table torn down ({} rules released)", drained.len());
    }

    pub fn is_open(&self) -> bool {
        self.state.read().open
    }
}
