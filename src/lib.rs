//! syscall-deception - Rule-driven syscall deception for honeypot hosts
//!
//! This library decides, for every intercepted syscall, whether the caller
//! gets the genuine result or a fabricated one, based on a runtime-mutable
//! table of deception rules.
//!
//! # Features
//!
//! - **Rule table**: concurrent add / remove / clear / first-match lookup
//! - **Scoping**: rules target a syscall, optionally a container and a pid
//! - **Pluggable matching**: exact or regex argument patterns, custom resolvers
//! - **Surgical substitution**: only the targeted field of a result is faked
//! - **Kill switch**: disable all deception without losing rules
//! - **Audit logging**: JSONL log of every hit and every rule change
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use syscall_deception::engine::memory::UserBuffer;
//! use syscall_deception::engine::uname::{self, UtsName, UTSNAME_SIZE};
//! use syscall_deception::engine::{SyscallCall, Task};
//! use syscall_deception::{ControlInterface, DeceptionEngine, HookRegistry};
//! use syscall_deception::syscalls::SYS_UNAME;
//!
//! let engine = Arc::new(DeceptionEngine::default());
//! let hooks = HookRegistry::new();
//! uname::install(&hooks, UtsName { sysname: "Linux".into(), ..Default::default() }).unwrap();
//!
//! let control = ControlInterface::new(engine.clone());
//! control.submit(&format!("add:{}::Linux-Fake:", SYS_UNAME)).unwrap();
//!
//! let mut buf = UserBuffer::new(UTSNAME_SIZE);
//! let mut call = SyscallCall::new(Task::new(7), None, &mut buf);
//! hooks.invoke(&engine, SYS_UNAME, &mut call).unwrap();
//!
//! let seen = UtsName::from_bytes(buf.as_bytes()).unwrap();
//! assert_eq!(seen.sysname, "Linux-Fake");
//! ```

pub mod audit;
pub mod command;
pub mod config;
pub mod container;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod output;
pub mod rules;
pub mod syscalls;

// Re-exports for convenience
pub use command::{ControlCommand, ControlInterface};
pub use config::Config;
pub use engine::hooks::HookRegistry;
pub use engine::DeceptionEngine;
pub use error::DeceptionError;
pub use rules::table::RuleTable;
pub use rules::{Rule, RuleId, RuleSpec};
