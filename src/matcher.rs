//! Scope predicates used by the rule table during lookup
//!
//! All predicates are total: they never fail and never block on I/O.

use parking_lot::RwLock;
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::rules::{ContainerToken, Pid};

/// Upper bound on cached compiled patterns
const REGEX_CACHE_LIMIT: usize = 1024;

/// Does a task in `task_container` fall inside `rule_container`?
pub fn container_match(
    task_container: Option<&ContainerToken>,
    rule_container: Option<&ContainerToken>,
) -> bool {
    match (task_container, rule_container) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(task), Some(rule)) => task == rule,
    }
}

/// Does `task_pid` fall inside the rule's pid scope? Absent or zero is any.
pub fn pid_match(task_pid: Pid, rule_pid: Option<Pid>) -> bool {
    match rule_pid {
        None | Some(0) => true,
        Some(pid) => pid == task_pid,
    }
}

/// Exact-equality placeholder: true only when both sides are present and equal
pub fn pattern_match(pattern: Option<&str>, value: Option<&str>) -> bool {
    match (pattern, value) {
        (Some(pattern), Some(value)) => pattern == value,
        _ => false,
    }
}

/// Pluggable argument matcher.
///
/// Only called when both a rule pattern and a syscall argument exist; an
/// absent pattern is decided by the table (it matches without inspection).
pub trait PatternMatcher: Send + Sync + fmt::Debug {
    fn matches(&self, pattern: &str, value: &str) -> bool;

    /// Short name for listings and logs
    fn name(&self) -> &'static str;
}

/// Default matcher: exact string equality
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactMatcher;

impl PatternMatcher for ExactMatcher {
    fn matches(&self, pattern: &str, value: &str) -> bool {
        pattern_match(Some(pattern), Some(value))
    }

    fn name(&self) -> &'static str {
        "exact"
    }
}

/// Compiled patterns, evicted oldest-first once full
#[derive(Debug, Default)]
struct RegexCache {
    compiled: HashMap<String, Option<Regex>>,
    order: VecDeque<String>,
}

impl RegexCache {
    fn insert(&mut self, pattern: &str, regex: Option<Regex>, capacity: usize) {
        if self.compiled.contains_key(pattern) {
            return;
        }
        while self.order.len() >= capacity.max(1) {
            if let Some(oldest) = self.order.pop_front() {
                self.compiled.remove(&oldest);
            }
        }
        self.order.push_back(pattern.to_string());
        self.compiled.insert(pattern.to_string(), regex);
    }
}

/// Regular-expression matcher (unanchored, like `Regex::is_match`).
///
/// Compiled patterns are cached. A pattern that fails to compile never
/// matches.
#[derive(Debug)]
pub struct RegexMatcher {
    cache: RwLock<RegexCache>,
    capacity: usize,
}

impl Default for RegexMatcher {
    fn default() -> Self {
        Self::with_capacity(REGEX_CACHE_LIMIT)
    }
}

impl RegexMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher that keeps at most `capacity` compiled patterns
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: RwLock::new(RegexCache::default()),
            capacity,
        }
    }

    fn compile(pattern: &str) -> Option<Regex> {
        match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                log::warn!("ignoring invalid rule pattern {:?}: {}", pattern, e);
                None
            }
        }
    }
}

impl PatternMatcher for RegexMatcher {
    fn matches(&self, pattern: &str, value: &str) -> bool {
        if let Some(cached) = self.cache.read().compiled.get(pattern) {
            return cached.as_ref().is_some_and(|re| re.is_match(value));
        }

        let compiled = Self::compile(pattern);
        let result = compiled.as_ref().is_some_and(|re| re.is_match(value));
        self.cache.write().insert(pattern, compiled, self.capacity);

        result
    }

    fn name(&self) -> &'static str {
        "regex"
    }
}

/// Apply the rule's argument pattern, if it has one
pub(crate) fn argument_match(
    matcher: &dyn PatternMatcher,
    pattern: Option<&str>,
    argument: Option<&str>,
) -> bool {
    match (pattern, argument) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(pattern), Some(value)) => matcher.matches(pattern, value),
    }
}
