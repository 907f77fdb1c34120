use capacity_core::{
    ActionResponse, AllocateRequest, Allocation, AllocationEngine, AllocationUpdate,
    AllocationValidationError, EngineError, Engineer, ErrorKind, FixedClock, MemoryStore, Project,
};
use chrono::NaiveDate;

fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

fn seeded_store() -> MemoryStore {
    MemoryStore::new(
        vec![
            Engineer::new("eng-001", "Alice Smith", "Backend Engineer").with_skills(["rust", "sql"]),
            Engineer::new("eng-002", "Bob Jones", "Frontend Engineer"),
        ],
        vec![
            Project::new("proj-001", "Apollo").with_status("Active"),
            Project::new("proj-002", "Borealis").with_status("Planning"),
        ],
    )
}

fn engine_at(store: MemoryStore, today: &str) -> AllocationEngine<MemoryStore, FixedClock> {
    AllocationEngine::with_clock(store, FixedClock(day(today)))
}

fn request(engineer: &str, project: &str, percentage: i64, start: &str, end: &str) -> AllocateRequest {
    AllocateRequest {
        engineer_id: engineer.to_string(),
        project_id: project.to_string(),
        percentage,
        start_date: start.to_string(),
        end_date: end.to_string(),
    }
}

fn stored(id: &str, engineer: &str, percentage: u32, start: &str, end: &str) -> Allocation {
    Allocation {
        id: id.to_string(),
        engineer_id: engineer.to_string(),
        project_id: "proj-001".to_string(),
        percentage,
        start_date: start.to_string(),
        end_date: end.to_string(),
    }
}

#[test]
fn allocate_then_reject_over_allocation() {
    let mut engine = engine_at(seeded_store(), "2024-03-01");

    let created = engine
        .allocate(&request("eng-001", "proj-001", 60, "2024-01-01", "2024-12-31"))
        .unwrap();
    assert_eq!(created.allocation.percentage, 60);
    assert_eq!(created.active_percentage, 60);
    assert!(created.allocation.id.starts_with("alloc-"));
    assert_eq!(engine.active_capacity("eng-001").unwrap(), 60);

    let err = engine
        .allocate(&request("eng-001", "proj-002", 50, "2024-02-01", "2024-06-01"))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::CapacityExceeded {
            total_percentage: 110,
            ..
        }
    ));
    assert!(err.to_string().contains("would be over-allocated (110%)"));
    assert_eq!(engine.active_capacity("eng-001").unwrap(), 60);
    assert_eq!(engine.store().allocations().len(), 1);
    assert_eq!(engine.store().save_count(), 1);
}

#[test]
fn allocation_up_to_exactly_the_ceiling_is_admitted() {
    let mut engine = engine_at(seeded_store(), "2024-03-01");
    engine
        .allocate(&request("eng-001", "proj-001", 40, "2024-01-01", "2024-12-31"))
        .unwrap();
    engine
        .allocate(&request("eng-001", "proj-002", 60, "2024-01-01", "2024-12-31"))
        .unwrap();

    assert_eq!(engine.active_capacity("eng-001").unwrap(), 100);
    assert_eq!(engine.available_capacity("eng-001").unwrap(), 0);

    let err = engine
        .allocate(&request("eng-001", "proj-002", 1, "2024-01-01", "2024-12-31"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
}

#[test]
fn expired_allocations_do_not_count_against_the_ceiling() {
    let store = seeded_store().with_allocations(vec![stored(
        "alloc-old00001",
        "eng-001",
        100,
        "2023-01-01",
        "2023-12-31",
    )]);
    let mut engine = engine_at(store, "2024-03-01");

    engine
        .allocate(&request("eng-001", "proj-002", 100, "2024-03-01", "2024-12-31"))
        .unwrap();
    assert_eq!(engine.active_capacity("eng-001").unwrap(), 100);
    assert_eq!(engine.store().allocations().len(), 2);
}

#[test]
fn unparseable_end_date_counts_as_active_capacity() {
    let store = seeded_store().with_allocations(vec![stored(
        "alloc-bad00001",
        "eng-001",
        70,
        "2023-01-01",
        "someday",
    )]);
    let mut engine = engine_at(store, "2030-01-01");

    assert_eq!(engine.active_capacity("eng-001").unwrap(), 70);
    let err = engine
        .allocate(&request("eng-001", "proj-001", 40, "2030-01-01", "2030-06-30"))
        .unwrap_err();
    assert!(err.to_string().contains("(110%)"));
}

#[test]
fn percentage_out_of_range_is_rejected_before_any_lookup() {
    let mut engine = engine_at(seeded_store(), "2024-03-01");

    let err = engine
        .allocate(&request("eng-001", "proj-001", 150, "2024-01-01", "2024-12-31"))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(AllocationValidationError::PercentageOutOfRange(150))
    ));
    assert_eq!(
        err.to_string(),
        "Allocation percentage must be between 0 and 100."
    );

    let err = engine
        .allocate(&request("eng-404", "proj-001", -5, "2024-01-01", "2024-12-31"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(engine.store().allocations().is_empty());
    assert_eq!(engine.store().save_count(), 0);
}

#[test]
fn unknown_engineer_or_project_is_rejected_naming_the_id() {
    let mut engine = engine_at(seeded_store(), "2024-03-01");

    let err = engine
        .allocate(&request("eng-999", "proj-001", 10, "2024-01-01", "2024-12-31"))
        .unwrap_err();
    assert!(matches!(&err, EngineError::EngineerNotFound(id) if id == "eng-999"));
    assert_eq!(err.to_string(), "Engineer with ID 'eng-999' not found.");

    let err = engine
        .allocate(&request("eng-001", "proj-999", 10, "2024-01-01", "2024-12-31"))
        .unwrap_err();
    assert!(matches!(&err, EngineError::ProjectNotFound(id) if id == "proj-999"));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(engine.store().allocations().is_empty());
}

#[test]
fn zero_percent_allocation_is_valid_and_recorded() {
    let mut engine = engine_at(seeded_store(), "2024-03-01");
    let created = engine
        .allocate(&request("eng-002", "proj-001", 0, "2024-01-01", "2024-12-31"))
        .unwrap();
    assert_eq!(created.allocation.percentage, 0);
    assert_eq!(engine.active_capacity("eng-002").unwrap(), 0);
}

#[test]
fn update_excludes_the_allocation_being_changed_from_its_own_sum() {
    let mut engine = engine_at(seeded_store(), "2024-03-01");
    let created = engine
        .allocate(&request("eng-001", "proj-001", 60, "2024-01-01", "2024-12-31"))
        .unwrap();

    let updated = engine
        .update(
            &created.allocation.id,
            &AllocationUpdate::default().percentage(90),
        )
        .unwrap();
    assert_eq!(updated.previous.percentage, 60);
    assert_eq!(updated.allocation.percentage, 90);
    assert_eq!(engine.active_capacity("eng-001").unwrap(), 90);

    engine
        .update(
            &created.allocation.id,
            &AllocationUpdate::default().percentage(100),
        )
        .unwrap();
    assert_eq!(engine.active_capacity("eng-001").unwrap(), 100);
}

#[test]
fn update_rejects_percentage_that_breaks_the_ceiling() {
    let mut engine = engine_at(seeded_store(), "2024-03-01");
    let first = engine
        .allocate(&request("eng-001", "proj-001", 50, "2024-01-01", "2024-12-31"))
        .unwrap();
    engine
        .allocate(&request("eng-001", "proj-002", 40, "2024-01-01", "2024-12-31"))
        .unwrap();
    let saves_before = engine.store().save_count();
    let before = engine.store().allocations().to_vec();

    let err = engine
        .update(
            &first.allocation.id,
            &AllocationUpdate::default().percentage(70).end_date("2025-06-30"),
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot update. Engineer would be over-allocated (110%)."
    );
    assert_eq!(engine.store().allocations(), before.as_slice());
    assert_eq!(engine.store().save_count(), saves_before);
}

#[test]
fn update_validates_range_and_existence() {
    let mut engine = engine_at(seeded_store(), "2024-03-01");
    let created = engine
        .allocate(&request("eng-001", "proj-001", 50, "2024-01-01", "2024-12-31"))
        .unwrap();

    let err = engine
        .update(
            &created.allocation.id,
            &AllocationUpdate::default().percentage(101),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = engine
        .update("alloc-missing", &AllocationUpdate::default().percentage(10))
        .unwrap_err();
    assert!(matches!(&err, EngineError::AllocationNotFound(id) if id == "alloc-missing"));
    assert_eq!(err.to_string(), "Allocation with ID 'alloc-missing' not found.");
}

#[test]
fn date_only_update_overwrites_without_ceiling_check() {
    let store = seeded_store().with_allocations(vec![
        stored("alloc-past0001", "eng-001", 80, "2023-01-01", "2023-12-31"),
        stored("alloc-live0001", "eng-001", 60, "2024-01-01", "2024-12-31"),
    ]);
    let mut engine = engine_at(store, "2024-03-01");

    let updated = engine
        .update(
            "alloc-past0001",
            &AllocationUpdate::default()
                .start_date("2024-02-01")
                .end_date("2024-12-31"),
        )
        .unwrap();
    assert_eq!(updated.allocation.start_date, "2024-02-01");
    assert_eq!(updated.allocation.end_date, "2024-12-31");
    assert_eq!(updated.allocation.percentage, 80);
    assert_eq!(engine.active_capacity("eng-001").unwrap(), 140);
}

#[test]
fn update_never_touches_identifiers() {
    let mut engine = engine_at(seeded_store(), "2024-03-01");
    let created = engine
        .allocate(&request("eng-001", "proj-001", 50, "2024-01-01", "2024-12-31"))
        .unwrap();

    let updated = engine
        .update(
            &created.allocation.id,
            &AllocationUpdate::default().start_date("2024-02-01"),
        )
        .unwrap();
    assert_eq!(updated.allocation.id, created.allocation.id);
    assert_eq!(updated.allocation.engineer_id, "eng-001");
    assert_eq!(updated.allocation.project_id, "proj-001");
}

#[test]
fn ceiling_holds_across_a_sequence_of_writes() {
    let mut engine = engine_at(seeded_store(), "2024-03-01");
    let attempts = [30_i64, 30, 50, 40, 10, 1, 0];
    for percentage in attempts {
        let _ = engine.allocate(&request(
            "eng-002",
            "proj-001",
            percentage,
            "2024-01-01",
            "2024-12-31",
        ));
        assert!(engine.active_capacity("eng-002").unwrap() <= 100);
    }
    let ids: Vec<String> = engine
        .store()
        .allocations()
        .iter()
        .map(|allocation| allocation.id.clone())
        .collect();
    for (id, percentage) in ids.iter().zip([100_i64, 70, 45]) {
        let _ = engine.update(id, &AllocationUpdate::default().percentage(percentage));
        assert!(engine.active_capacity("eng-002").unwrap() <= 100);
    }
    assert_eq!(engine.active_capacity("eng-002").unwrap(), 100);
}

#[test]
fn storage_failure_is_propagated_as_storage_error() {
    let mut store = seeded_store();
    store.set_fail_saves(true);
    let mut engine = engine_at(store, "2024-03-01");

    let err = engine
        .allocate(&request("eng-001", "proj-001", 10, "2024-01-01", "2024-12-31"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(engine.store().allocations().is_empty());
}

#[test]
fn action_response_carries_message_and_payload() {
    let mut engine = engine_at(seeded_store(), "2024-03-01");

    let ok = ActionResponse::from(engine.allocate(&request(
        "eng-001",
        "proj-001",
        60,
        "2024-01-01",
        "2024-12-31",
    )));
    assert!(ok.ok);
    assert_eq!(
        ok.message,
        "Successfully allocated Alice Smith to Apollo at 60%."
    );
    assert!(ok.payload.is_some());

    let rejected = ActionResponse::from(engine.allocate(&request(
        "eng-001",
        "proj-002",
        50,
        "2024-01-01",
        "2024-12-31",
    )));
    assert!(!rejected.ok);
    assert_eq!(rejected.error_kind, Some(ErrorKind::CapacityExceeded));
    assert_eq!(
        rejected.message,
        "Cannot allocate. Engineer 'Alice Smith' would be over-allocated (110%)."
    );
    assert!(rejected.payload.is_none());
}
