//! Balancing engine tests
//!
//! Greedy count-minimizing choice with lowest-index tie-break, stratified
//! on factor values and restricted to kept sessions.

use condition_balancer::balance::{choose, least_used, tally};
use condition_balancer::catalog::ConditionCatalog;
use condition_balancer::session::{FactorValues, SessionRecord};
use std::fs;
use tempfile::TempDir;

fn catalog(dir: &TempDir, conditions: usize) -> ConditionCatalog {
    let path = dir.path().join("conditions.csv");
    let mut content = String::from("stimulus\n");
    for i in 1..=conditions {
        content.push_str(&format!("s{i}.png\n"));
    }
    fs::write(&path, content).unwrap();
    ConditionCatalog::load(&path, false).unwrap()
}

fn factors(pairs: &[(&str, &str)]) -> FactorValues {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn kept(condition: usize, pairs: &[(&str, &str)]) -> SessionRecord {
    SessionRecord::builder("P", condition)
        .factors(factors(pairs))
        .kept(true)
        .build()
}

// =============================================================================
// Tie-break
// =============================================================================

#[test]
fn test_tie_break_lowest_index_among_minima() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog(&dir, 4);
    let young = [("age", "young")];

    // counts [2, 2, 1, 1]
    let records = vec![
        kept(1, &young),
        kept(1, &young),
        kept(2, &young),
        kept(2, &young),
        kept(3, &young),
        kept(4, &young),
    ];

    let report = choose(&catalog, &records, &factors(&young)).unwrap();
    assert_eq!(report.counts(), &[2, 2, 1, 1]);
    assert_eq!(report.condition(), 3);
}

#[test]
fn test_empty_history_picks_first() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog(&dir, 3);

    let report = choose(&catalog, &[], &factors(&[("age", "young")])).unwrap();
    assert_eq!(report.condition(), 1);
    assert_eq!(report.counts(), &[0, 0, 0]);
}

// =============================================================================
// Stratification
// =============================================================================

#[test]
fn test_other_strata_do_not_count() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog(&dir, 2);
    let records = vec![kept(1, &[("age", "old")]), kept(1, &[("age", "old")])];

    let report = choose(&catalog, &records, &factors(&[("age", "young")])).unwrap();
    assert_eq!(report.condition(), 1);
}

#[test]
fn test_all_factors_must_match() {
    let records = vec![
        kept(1, &[("age", "young"), ("site", "A")]),
        kept(2, &[("age", "young"), ("site", "B")]),
        kept(2, &[("age", "old"), ("site", "A")]),
    ];

    let counts = tally(&records, 2, &factors(&[("age", "young"), ("site", "A")]));
    assert_eq!(counts, vec![1, 0]);
}

#[test]
fn test_unkept_sessions_do_not_count() {
    let young = [("age", "young")];
    let abandoned = SessionRecord::builder("P", 1)
        .factors(factors(&young))
        .kept(false)
        .build();

    let counts = tally(&[abandoned, kept(2, &young)], 2, &factors(&young));
    assert_eq!(least_used(&counts), Some(1));
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_repeated_runs_agree() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog(&dir, 5);
    let young = [("age", "young")];
    let records: Vec<_> = [3, 1, 4, 1, 5, 2].iter().map(|&c| kept(c, &young)).collect();

    let first = choose(&catalog, &records, &factors(&young)).unwrap();
    for _ in 0..10 {
        assert_eq!(choose(&catalog, &records, &factors(&young)).unwrap(), first);
    }
}
