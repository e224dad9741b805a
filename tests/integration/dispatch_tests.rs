//! Integration tests for interception dispatch

use std::sync::Arc;

use syscall_deception::audit::AuditLogger;
use syscall_deception::engine::memory::UserBuffer;
use syscall_deception::engine::uname::{self, UtsName, UTSNAME_SIZE};
use syscall_deception::engine::{SyscallCall, Task};
use syscall_deception::rules::ContainerToken;
use syscall_deception::syscalls::SYS_UNAME;
use syscall_deception::{ControlInterface, DeceptionEngine, DeceptionError, HookRegistry};
use tempfile::NamedTempFile;

fn host() -> UtsName {
    UtsName {
        sysname: "Linux".to_string(),
        nodename: "prod-db-01".to_string(),
        release: "6.8.0-45-generic".to_string(),
        version: "#45-Ubuntu SMP".to_string(),
        machine: "x86_64".to_string(),
        domainname: "(none)".to_string(),
    }
}

struct Harness {
    engine: Arc<DeceptionEngine>,
    hooks: HookRegistry,
    control: ControlInterface,
}

impl Harness {
    fn new(engine: DeceptionEngine) -> Self {
        let engine = Arc::new(engine);
        let hooks = HookRegistry::new();
        uname::install(&hooks, host()).unwrap();
        let control = ControlInterface::new(Arc::clone(&engine));
        Self {
            engine,
            hooks,
            control,
        }
    }

    fn uname_as(&self, pid: u32) -> Result<UtsName, DeceptionError> {
        let mut buf = UserBuffer::new(UTSNAME_SIZE);
        let mut call = SyscallCall::new(Task::new(pid), None, &mut buf);
        self.hooks.invoke(&self.engine, SYS_UNAME, &mut call)?;
        Ok(UtsName::from_bytes(buf.as_bytes()).unwrap())
    }
}

// ============================================================================
// uname Tests
// ============================================================================

#[test]
fn test_miss_returns_genuine_identity() {
    let h = Harness::new(DeceptionEngine::default());
    assert_eq!(h.uname_as(7).unwrap(), host());
}

#[test]
fn test_hit_replaces_only_sysname() {
    let h = Harness::new(DeceptionEngine::default());
    h.control
        .submit(&format!("add:{}::Linux-Fake:", SYS_UNAME))
        .unwrap();

    let seen = h.uname_as(7).unwrap();
    assert_eq!(seen.sysname, "Linux-Fake");
    assert_eq!(
        UtsName {
            sysname: "Linux".to_string(),
            ..seen
        },
        host()
    );
}

#[test]
fn test_rule_without_replacement_returns_genuine() {
    let h = Harness::new(DeceptionEngine::default());
    h.control.submit(&format!("add:{}", SYS_UNAME)).unwrap();
    assert_eq!(h.uname_as(7).unwrap(), host());
}

#[test]
fn test_pid_scoped_deception() {
    let h = Harness::new(DeceptionEngine::default());
    h.control
        .submit(&format!("add:{}::Windows::1337", SYS_UNAME))
        .unwrap();

    assert_eq!(h.uname_as(1337).unwrap().sysname, "Windows");
    assert_eq!(h.uname_as(1338).unwrap().sysname, "Linux");
}

#[test]
fn test_container_scoped_deception() {
    let engine = DeceptionEngine::default().with_resolver(Box::new(|task: &Task| {
        (task.pid >= 1000).then(|| ContainerToken::new("/docker/honeypot"))
    }));
    let h = Harness::new(engine);
    h.control
        .submit(&format!("add:{}::FreeBSD:/docker/honeypot", SYS_UNAME))
        .unwrap();

    assert_eq!(h.uname_as(1001).unwrap().sysname, "FreeBSD");
    assert_eq!(h.uname_as(10).unwrap().sysname, "Linux");
}

#[test]
fn test_unresolved_container_degrades_to_wildcard() {
    let h = Harness::new(DeceptionEngine::default());
    h.control
        .submit(&format!("add:{}::Scoped:/docker/honeypot", SYS_UNAME))
        .unwrap();
    h.control
        .submit(&format!("add:{}::Wildcard:", SYS_UNAME))
        .unwrap();

    assert_eq!(h.uname_as(1).unwrap().sysname, "Wildcard");
}

#[test]
fn test_disable_switch_passes_through() {
    let h = Harness::new(DeceptionEngine::default());
    h.control
        .submit(&format!("add:{}::Linux-Fake:", SYS_UNAME))
        .unwrap();

    h.control.submit("disable").unwrap();
    assert_eq!(h.uname_as(7).unwrap().sysname, "Linux");

    h.control.submit("enable").unwrap();
    assert_eq!(h.uname_as(7).unwrap().sysname, "Linux-Fake");
}

#[test]
fn test_fault_reported_as_efault() {
    let h = Harness::new(DeceptionEngine::default());
    h.control
        .submit(&format!("add:{}::Linux-Fake:", SYS_UNAME))
        .unwrap();

    let mut buf = UserBuffer::unmapped();
    let mut call = SyscallCall::new(Task::new(7), None, &mut buf);
    let err = h.hooks.invoke(&h.engine, SYS_UNAME, &mut call).unwrap_err();

    assert_eq!(err, DeceptionError::TransportFault);
    assert_eq!(err.as_syscall_return(), -14);

    // the table is untouched and the next call succeeds
    assert_eq!(h.engine.table().len(), 1);
    assert_eq!(h.uname_as(7).unwrap().sysname, "Linux-Fake");
}

#[test]
fn test_unhooked_call_rejected() {
    let h = Harness::new(DeceptionEngine::default());
    h.hooks.remove_hook(SYS_UNAME);
    assert!(h.uname_as(7).is_err());

    // idempotent
    assert!(!h.hooks.remove_hook(SYS_UNAME));
}

#[test]
fn test_hits_are_audited() {
    let temp = NamedTempFile::new().unwrap();
    let engine = DeceptionEngine::default().with_audit(AuditLogger::new(Some(temp.path())));
    let h = Harness::new(engine);
    h.control
        .submit(&format!("add:{}::Linux-Fake::4242", SYS_UNAME))
        .unwrap();

    h.uname_as(4242).unwrap();
    h.uname_as(1).unwrap();

    let content = std::fs::read_to_string(temp.path()).unwrap();
    let hits: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .filter(|v: &serde_json::Value| v["event"] == "HIT")
        .collect();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["pid"], 4242);
    assert_eq!(hits[0]["rule_id"], 1);
    assert_eq!(hits[0]["syscall"], SYS_UNAME);
}
