//! Integration tests for the rule table

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use syscall_deception::rules::ContainerToken;
use syscall_deception::{DeceptionError, RuleId, RuleSpec, RuleTable};

// ============================================================================
// Id Allocation Tests
// ============================================================================

#[test]
fn test_ids_unique_across_remove_and_clear() {
    let table = RuleTable::new();
    let mut seen = HashSet::new();

    for round in 0..5 {
        for _ in 0..10 {
            let id = table.add(RuleSpec::for_syscall(1)).unwrap();
            assert!(seen.insert(id), "id {} reused", id);
        }
        if round % 2 == 0 {
            table.remove(RuleId(seen.len() as u64)).unwrap();
        } else {
            table.clear().unwrap();
        }
    }

    assert_eq!(seen.len(), 50);
}

#[test]
fn test_add_after_clear_gets_fresh_id() {
    let table = RuleTable::new();
    table.add(RuleSpec::for_syscall(1)).unwrap();
    table.add(RuleSpec::for_syscall(1)).unwrap();
    table.clear().unwrap();

    assert!(table.find_match(1, None, None, 1).is_none());
    let id = table.add(RuleSpec::for_syscall(1)).unwrap();
    assert_ne!(id, RuleId(1));
    assert_eq!(id, RuleId(3));
}

// ============================================================================
// Matching Tests
// ============================================================================

#[test]
fn test_scenario_add_match_remove() {
    let table = RuleTable::new();
    let id = table
        .add(RuleSpec::for_syscall(1).replacement("Linux-Fake").pid(0))
        .unwrap();
    assert_eq!(id, RuleId(1));

    let hit = table.find_match(1, Some("anything"), None, 7).unwrap();
    assert_eq!(hit.id(), RuleId(1));
    assert_eq!(hit.replacement(), Some("Linux-Fake"));

    table.remove(RuleId(1)).unwrap();
    assert!(table.find_match(1, Some("anything"), None, 7).is_none());
}

#[test]
fn test_scenario_first_of_two_wins() {
    let table = RuleTable::new();
    let first = table.add(RuleSpec::for_syscall(2)).unwrap();
    let second = table.add(RuleSpec::for_syscall(2)).unwrap();
    assert_eq!((first, second), (RuleId(1), RuleId(2)));

    let web = ContainerToken::new("/docker/web");
    assert_eq!(table.find_match(2, None, None, 1).unwrap().id(), first);
    assert_eq!(table.find_match(2, None, Some(&web), 99).unwrap().id(), first);

    // removing the first exposes the second
    table.remove(first).unwrap();
    assert_eq!(table.find_match(2, None, None, 1).unwrap().id(), second);
}

#[test]
fn test_pid_scoped_rule_never_matches_other_pids() {
    let table = RuleTable::new();
    table.add(RuleSpec::for_syscall(1).pid(42)).unwrap();

    for pid in [0, 1, 41, 43, 4242] {
        assert!(table.find_match(1, None, None, pid).is_none());
    }
    assert!(table.find_match(1, None, None, 42).is_some());
}

#[test]
fn test_wildcard_container_matches_any_lookup() {
    let table = RuleTable::new();
    table.add(RuleSpec::for_syscall(1)).unwrap();

    let tokens = [
        None,
        Some(ContainerToken::new("/docker/a")),
        Some(ContainerToken::new("/docker/b")),
    ];
    for token in &tokens {
        assert!(table.find_match(1, None, token.as_ref(), 1).is_some());
    }
}

#[test]
fn test_other_syscall_never_matches() {
    let table = RuleTable::new();
    table.add(RuleSpec::for_syscall(1)).unwrap();
    assert!(table.find_match(2, None, None, 1).is_none());
}

#[test]
fn test_disable_then_enable_restores_matching() {
    let table = RuleTable::new();
    table.add(RuleSpec::for_syscall(1)).unwrap();
    table.add(RuleSpec::for_syscall(2).pid(5)).unwrap();

    table.set_enabled(false);
    assert!(table.find_match(1, None, None, 1).is_none());
    assert!(table.find_match(2, None, None, 5).is_none());

    table.set_enabled(true);
    assert!(table.find_match(1, None, None, 1).is_some());
    assert!(table.find_match(2, None, None, 5).is_some());
}

#[test]
fn test_removed_rule_never_returned() {
    let table = RuleTable::new();
    let id = table.add(RuleSpec::for_syscall(1)).unwrap();
    table.remove(id).unwrap();

    assert_eq!(table.remove(id), Err(DeceptionError::NotFound(id)));
    assert!(table.find_match(1, None, None, 1).is_none());
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[test]
fn test_concurrent_adds_get_distinct_ids() {
    let table = Arc::new(RuleTable::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                (0..100)
                    .map(|_| table.add(RuleSpec::for_syscall(1)).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id));
        }
    }

    assert_eq!(ids.len(), 800);
    assert_eq!(table.len(), 800);

    // ascending ids are insertion order
    let snapshot: Vec<_> = table.snapshot().iter().map(|r| r.id()).collect();
    let mut sorted = snapshot.clone();
    sorted.sort();
    assert_eq!(snapshot, sorted);
}

#[test]
fn test_lookups_during_mutation_see_whole_rules() {
    let table = Arc::new(RuleTable::new());

    let writer = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            for i in 0..500 {
                let replacement = format!("fake-{}", i);
                let id = table
                    .add(RuleSpec::for_syscall(1).replacement(&replacement))
                    .unwrap();
                if i % 3 == 0 {
                    table.remove(id).unwrap();
                }
                if i % 50 == 0 {
                    table.clear().unwrap();
                }
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for _ in 0..2000 {
                    if let Some(rule) = table.find_match(1, None, None, 1) {
                        let expected = format!("fake-{}", rule.id().0 - 1);
                        assert_eq!(rule.replacement(), Some(expected.as_str()));
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
