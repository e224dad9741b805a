//! Configuration loading for syscall-deception
//!
//! Supports TOML configuration with embedded defaults.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::container::{CgroupResolver, ContainerResolver, NoContainer};
use crate::matcher::{ExactMatcher, PatternMatcher, RegexMatcher};

/// Which argument matcher the rule table uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    /// Exact string equality
    #[default]
    Exact,

    /// Unanchored regular expression
    Regex,
}

impl MatcherKind {
    pub fn build(self) -> Box<dyn PatternMatcher> {
        match self {
            MatcherKind::Exact => Box::new(ExactMatcher),
            MatcherKind::Regex => Box::new(RegexMatcher::new()),
        }
    }
}

/// How the dispatcher finds a caller's container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Every caller is uncontained
    #[default]
    None,

    /// cgroup path from /proc/<pid>/cgroup
    Cgroup,
}

impl ResolverKind {
    pub fn build(self) -> Box<dyn ContainerResolver> {
        match self {
            ResolverKind::None => Box::new(NoContainer),
            ResolverKind::Cgroup => Box::new(CgroupResolver::default()),
        }
    }
}

/// General configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Whether lookups may return a hit at startup
    pub enabled: bool,

    /// Enable audit logging
    pub audit_log: bool,

    /// Path to audit log file
    pub audit_path: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            audit_log: true,
            audit_path: Some("~/.local/state/syscall-deception/audit.jsonl".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MatchingConfig {
    pub pattern_matcher: MatcherKind,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ContainerConfig {
    pub resolver: ResolverKind,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub matching: MatchingConfig,
    pub container: ContainerConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("syscall-deception/config.toml")),
            Some(PathBuf::from("/etc/syscall-deception/config.toml")),
        ];

        for path in config_paths.into_iter().flatten() {
            if path.exists() {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    match toml::from_str(&content) {
                        Ok(config) => return config,
                        Err(e) => {
                            log::warn!("failed to parse {}: {}", path.display(), e);
                        }
                    }
                }
            }
        }

        Config::default()
    }

    /// Load from a specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply DECEPTION_DISABLED and DECEPTION_AUDIT_PATH
    pub fn apply_env_overrides(&mut self) {
        if env::var("DECEPTION_DISABLED").is_ok_and(|v| v == "1") {
            self.general.enabled = false;
        }
        if let Ok(path) = env::var("DECEPTION_AUDIT_PATH") {
            self.general.audit_path = Some(path);
        }
    }

    /// Expand ~ in path strings
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Audit log path, if auditing is on
    pub fn audit_path(&self) -> Option<PathBuf> {
        if !self.general.audit_log {
            return None;
        }
        self.general.audit_path.as_ref().map(|p| Self::expand_path(p))
    }
}

/// Embedded default configuration
pub const DEFAULT_CONFIG_TOML: &str = r#"
[general]
enabled = true
audit_log = true
audit_path = "~/.local/state/syscall-deception/audit.jsonl"

[matching]
pattern_matcher = "exact"

[container]
resolver = "none"
"#;
