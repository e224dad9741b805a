//! Integration tests for the control surface

use std::sync::Arc;

use syscall_deception::audit::AuditLogger;
use syscall_deception::output::CommandOutcome;
use syscall_deception::{ControlInterface, DeceptionEngine, DeceptionError, RuleId};
use tempfile::NamedTempFile;

fn setup() -> (Arc<DeceptionEngine>, ControlInterface) {
    let engine = Arc::new(DeceptionEngine::default());
    let control = ControlInterface::new(Arc::clone(&engine));
    (engine, control)
}

// ============================================================================
// Command Tests
// ============================================================================

#[test]
fn test_add_reports_rule_id() {
    let (engine, control) = setup();

    let outcome = control.submit("add:63::Linux-Fake:").unwrap();
    assert_eq!(outcome.rule_id(), Some(RuleId(1)));

    let rule = engine.table().find_match(63, None, None, 1).unwrap();
    assert_eq!(rule.replacement(), Some("Linux-Fake"));
    assert!(rule.pattern().is_none());
    assert!(rule.target_container().is_none());
}

#[test]
fn test_add_with_scope_fields() {
    let (engine, control) = setup();
    control.submit("add:63::Linux-Fake:/docker/web:42:0x4").unwrap();

    let rules = engine.table().snapshot();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].target_container().unwrap().as_str(), "/docker/web");
    assert_eq!(rules[0].target_pid(), Some(42));
    assert_eq!(rules[0].flags().bits(), 0x4);
}

#[test]
fn test_malformed_add_does_not_mutate() {
    let (engine, control) = setup();
    control.submit("add:63::Linux-Fake:").unwrap();

    for bad in ["add", "add:", "add::p:r:c", "add:x:p:r:c", "add:63::r::-1"] {
        let err = control.submit(bad).unwrap_err();
        assert!(
            matches!(err, DeceptionError::InvalidArgument(_)),
            "{}: {:?}",
            bad,
            err
        );
    }

    assert_eq!(engine.table().len(), 1);
}

#[test]
fn test_unknown_verb_does_not_mutate() {
    let (engine, control) = setup();
    control.submit("add:63::Linux-Fake:").unwrap();

    let err = control.submit("drop:1").unwrap_err();
    assert_eq!(err, DeceptionError::InvalidCommand("drop".to_string()));
    assert_eq!(engine.table().len(), 1);
}

#[test]
fn test_clear_command() {
    let (engine, control) = setup();
    control.submit("add:63::a:").unwrap();
    control.submit("add:63::b:").unwrap();

    assert_eq!(
        control.submit("clear").unwrap(),
        CommandOutcome::Cleared { count: 2 }
    );
    assert!(engine.table().is_empty());

    // clearing an empty table still succeeds
    assert_eq!(
        control.submit("clear\n").unwrap(),
        CommandOutcome::Cleared { count: 0 }
    );
}

#[test]
fn test_write_and_read_transport() {
    let (_engine, control) = setup();

    let command = b"add:63::Linux-Fake:\n";
    assert_eq!(control.write(command).unwrap(), command.len());

    let listing = control.read();
    assert!(listing.contains("rules: 1"));
    assert!(listing.contains("#1 syscall=63"));
    assert!(listing.contains("replacement=\"Linux-Fake\""));

    assert!(control.write(b"remove:9").is_err());
    assert!(control.read().contains("rules: 1"));
}

#[test]
fn test_errors_carry_errno() {
    let (_engine, control) = setup();
    assert_eq!(control.submit("remove:9").unwrap_err().errno(), 2);
    assert_eq!(control.submit("add:").unwrap_err().errno(), 22);
    assert_eq!(control.submit("bogus").unwrap_err().errno(), 22);
}

// ============================================================================
// Audit Tests
// ============================================================================

#[test]
fn test_commands_are_audited() {
    let temp = NamedTempFile::new().unwrap();
    let engine = Arc::new(
        DeceptionEngine::default().with_audit(AuditLogger::new(Some(temp.path()))),
    );
    let control = ControlInterface::new(Arc::clone(&engine));

    control.submit("add:63::Linux-Fake:").unwrap();
    control.submit("disable").unwrap();
    control.submit("remove:1").unwrap();
    let _ = control.submit("remove:1");
    control.submit("clear").unwrap();

    let content = std::fs::read_to_string(temp.path()).unwrap();
    let events: Vec<String> = content
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["event"].as_str().unwrap().to_string()
        })
        .collect();

    assert_eq!(
        events,
        vec!["RULE_ADDED", "DISABLED", "RULE_REMOVED", "REJECTED", "CLEARED"]
    );
}
