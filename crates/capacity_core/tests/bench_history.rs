use capacity_core::{
    is_active, Allocation, AllocationEngine, AllocationState, EngineError, Engineer, ErrorKind,
    FixedClock, HistoryKey, MemoryStore, Outcome, Project,
};
use chrono::NaiveDate;

fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

fn allocation(
    id: &str,
    engineer: &str,
    project: &str,
    percentage: u32,
    start: &str,
    end: &str,
) -> Allocation {
    Allocation {
        id: id.to_string(),
        engineer_id: engineer.to_string(),
        project_id: project.to_string(),
        percentage,
        start_date: start.to_string(),
        end_date: end.to_string(),
    }
}

fn store() -> MemoryStore {
    MemoryStore::new(
        vec![
            Engineer::new("eng-001", "Alice Smith", "Backend Engineer"),
            Engineer::new("eng-002", "Bob Jones", "Frontend Engineer"),
            Engineer::new("eng-003", "Carol White", "QA Engineer"),
        ],
        vec![Project::new("proj-001", "Apollo"), Project::new("proj-002", "Borealis")],
    )
    .with_allocations(vec![
        allocation("alloc-a0000003", "eng-001", "proj-002", 30, "2024-02-01", "2024-12-31"),
        allocation("alloc-a0000001", "eng-001", "proj-001", 50, "2023-01-01", "2023-06-30"),
        allocation("alloc-a0000002", "eng-001", "proj-001", 60, "2024-01-01", "2024-12-31"),
        allocation("alloc-b0000001", "eng-002", "proj-001", 100, "2023-01-01", "2024-03-14"),
    ])
}

fn engine_at(today: &str) -> AllocationEngine<MemoryStore, FixedClock> {
    AllocationEngine::with_clock(store(), FixedClock(day(today)))
}

#[test]
fn end_allocations_backdates_every_active_allocation() {
    let mut engine = engine_at("2024-03-15");
    assert_eq!(engine.active_capacity("eng-001").unwrap(), 90);

    let transition = engine.end_allocations("eng-001").unwrap();
    assert_eq!(transition.count(), 2);
    assert_eq!(
        transition.ended_ids,
        vec!["alloc-a0000003".to_string(), "alloc-a0000002".to_string()]
    );
    assert_eq!(transition.end_date.as_deref(), Some("2024-03-14"));
    assert_eq!(
        transition.message(),
        "Moved Alice Smith to bench. Ended 2 active allocation(s): alloc-a0000003, alloc-a0000002."
    );

    assert_eq!(engine.active_capacity("eng-001").unwrap(), 0);
    assert_eq!(engine.available_capacity("eng-001").unwrap(), 100);
    assert_eq!(engine.store().allocations().len(), 4);
    assert_eq!(engine.store().save_count(), 1);

    let history = engine
        .history(HistoryKey::Engineer("eng-001".to_string()))
        .unwrap();
    assert_eq!(history.len(), 3);
    for entry in &history {
        assert_eq!(entry.state, AllocationState::Past);
    }
    let ended = history
        .iter()
        .find(|entry| entry.allocation.id == "alloc-a0000002")
        .unwrap();
    assert_eq!(ended.allocation.end_date, "2024-03-14");
    assert_eq!(ended.allocation.percentage, 60);
}

#[test]
fn end_allocations_leaves_already_past_records_untouched() {
    let mut engine = engine_at("2024-03-15");
    engine.end_allocations("eng-001").unwrap();

    let old = engine
        .store()
        .allocations()
        .iter()
        .find(|allocation| allocation.id == "alloc-a0000001")
        .unwrap();
    assert_eq!(old.end_date, "2023-06-30");
}

#[test]
fn end_allocations_with_nothing_active_is_a_noop_without_a_write() {
    let mut engine = engine_at("2024-03-15");
    let before = engine.store().allocations().to_vec();

    let transition = engine.end_allocations("eng-003").unwrap();
    assert_eq!(transition.count(), 0);
    assert_eq!(transition.end_date, None);
    assert_eq!(
        transition.message(),
        "Engineer 'Carol White' has no active allocations. Nothing to end (0 removed)."
    );
    assert_eq!(engine.store().save_count(), 0);
    assert_eq!(engine.store().allocations(), before.as_slice());

    let transition = engine.end_allocations("eng-001").unwrap();
    assert_eq!(transition.count(), 2);
    let transition = engine.end_allocations("eng-001").unwrap();
    assert_eq!(transition.count(), 0);
    assert_eq!(engine.store().save_count(), 1);
}

#[test]
fn end_allocations_for_unknown_engineer_is_not_found() {
    let mut engine = engine_at("2024-03-15");
    let err = engine.end_allocations("eng-404").unwrap_err();
    assert!(matches!(err, EngineError::EngineerNotFound(_)));
    assert_eq!(engine.store().save_count(), 0);
}

#[test]
fn allocation_ending_today_is_still_active() {
    let engine = engine_at("2024-03-14");
    assert_eq!(engine.active_capacity("eng-002").unwrap(), 100);

    let engine = engine_at("2024-03-15");
    assert_eq!(engine.active_capacity("eng-002").unwrap(), 0);
}

#[test]
fn future_allocation_is_active_before_it_starts() {
    let store = store().with_allocations(vec![allocation(
        "alloc-c0000001",
        "eng-003",
        "proj-002",
        40,
        "2025-01-01",
        "2025-06-30",
    )]);
    let engine = AllocationEngine::with_clock(store, FixedClock(day("2024-03-15")));
    assert_eq!(engine.active_capacity("eng-003").unwrap(), 40);
}

#[test]
fn activity_is_monotonic_in_time() {
    let end = "2024-06-30";
    let mut was_active = true;
    let mut current = day("2024-06-01");
    while current <= day("2024-07-31") {
        let active = is_active(end, current);
        assert!(was_active || !active, "re-activated on {current}");
        was_active = active;
        current = current.succ_opt().unwrap();
    }
    assert!(!was_active);
}

#[test]
fn bench_lists_engineers_with_zero_active_capacity_in_stored_order() {
    let engine = engine_at("2024-03-15");
    let bench: Vec<String> = engine
        .bench()
        .unwrap()
        .into_iter()
        .map(|engineer| engineer.id)
        .collect();
    assert_eq!(bench, vec!["eng-002".to_string(), "eng-003".to_string()]);

    let mut engine = engine_at("2024-03-15");
    engine.end_allocations("eng-001").unwrap();
    assert_eq!(engine.bench().unwrap().len(), 3);
}

#[test]
fn history_orders_by_start_date_and_derives_state() {
    let engine = engine_at("2024-03-15");
    let history = engine
        .history(HistoryKey::Engineer("eng-001".to_string()))
        .unwrap();

    let rows: Vec<(&str, AllocationState)> = history
        .iter()
        .map(|entry| (entry.allocation.id.as_str(), entry.state))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("alloc-a0000001", AllocationState::Past),
            ("alloc-a0000002", AllocationState::Current),
            ("alloc-a0000003", AllocationState::Current),
        ]
    );
    assert_eq!(history.evaluated_on(), day("2024-03-15"));

    let first_pass: Vec<_> = history.iter().collect();
    let second_pass: Vec<_> = history.iter().collect();
    assert_eq!(first_pass, second_pass);
    assert_eq!(history.iter().len(), 3);
}

#[test]
fn history_by_project_spans_engineers() {
    let engine = engine_at("2024-03-15");
    let history = engine
        .history(HistoryKey::Project("proj-001".to_string()))
        .unwrap();
    let ids: Vec<&str> = history
        .iter()
        .map(|entry| entry.allocation.id.as_str())
        .collect();
    assert_eq!(ids, vec!["alloc-a0000001", "alloc-b0000001", "alloc-a0000002"]);

    let borealis = engine
        .history(HistoryKey::Project("proj-002".to_string()))
        .unwrap();
    assert_eq!(borealis.len(), 1);
}

#[test]
fn history_for_unknown_key_is_not_found() {
    let engine = engine_at("2024-03-15");
    let err = engine
        .history(HistoryKey::Project("proj-404".to_string()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "Project with ID 'proj-404' not found.");
}

#[test]
fn history_serializes_entries_with_state() {
    let engine = engine_at("2024-03-15");
    let history = engine
        .history(HistoryKey::Engineer("eng-002".to_string()))
        .unwrap();
    let value = serde_json::to_value(&history).unwrap();
    assert_eq!(value["evaluated_on"], "2024-03-15");
    assert_eq!(value["entries"][0]["state"], "PAST");
    assert_eq!(value["entries"][0]["allocation"]["allocationPercentage"], 100);

    let history = engine
        .history(HistoryKey::Engineer("eng-001".to_string()))
        .unwrap();
    let value = serde_json::to_value(&history).unwrap();
    let states: Vec<&str> = value["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["state"].as_str().unwrap())
        .collect();
    assert_eq!(states, vec!["PAST", "CURRENT", "CURRENT"]);
}
