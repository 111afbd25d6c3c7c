//! Project-id based modes

use std::sync::Arc;

use usersync_core::domain::{EventType, UserRecord};
use usersync_core::ports::{PlatformError, RecordingReporter, ReportLevel};
use usersync_engine::SyncError;

use crate::common::{dispatcher, record, settings, PlatformBuilder};

#[tokio::test]
async fn test_multiple_projects_are_partitioned_by_pid() {
    let platform = PlatformBuilder::new().project("p1").project("p2").build();
    let records = vec![
        record("a@x.com", "p1"),
        record("b@x.com", "p2"),
        record("c@x.com", "p1"),
    ];

    let events = dispatcher(
        &platform,
        Arc::new(RecordingReporter::new()),
        settings("sync_multiple_projects_based_on_pid"),
    )
    .dispatch(&records)
    .await
    .unwrap();

    assert_eq!(
        platform.project_ref("p1").imported(),
        vec![vec!["a@x.com", "c@x.com"]]
    );
    assert_eq!(platform.project_ref("p2").imported(), vec![vec!["b@x.com"]]);
    let partitions: Vec<_> = events.iter().filter_map(|e| e.partition.as_deref()).collect();
    assert_eq!(partitions, vec!["p1", "p1", "p2"]);
}

#[tokio::test]
async fn test_parallel_partitions_keep_partition_order() {
    let platform = PlatformBuilder::new()
        .project("p1")
        .project("p2")
        .project("p3")
        .build();
    let mut settings = settings("sync_multiple_projects_based_on_pid");
    settings.concurrency = 3;
    let records = vec![
        record("a@x.com", "p3"),
        record("b@x.com", "p1"),
        record("c@x.com", "p2"),
    ];

    let events = dispatcher(&platform, Arc::new(RecordingReporter::new()), settings)
        .dispatch(&records)
        .await
        .unwrap();

    let subjects: Vec<_> = events.iter().map(|e| e.subject.as_str()).collect();
    assert_eq!(subjects, vec!["a@x.com", "b@x.com", "c@x.com"]);
}

#[tokio::test]
async fn test_unknown_project_aborts_strict_run() {
    let platform = PlatformBuilder::new().project("p1").build();
    let records = vec![record("a@x.com", "p1"), record("b@x.com", "nope")];

    let err = dispatcher(
        &platform,
        Arc::new(RecordingReporter::new()),
        settings("sync_multiple_projects_based_on_pid"),
    )
    .dispatch(&records)
    .await
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Project \"nope\" was not found. Please check your project ids in the source file"
    );
}

#[tokio::test]
async fn test_access_errors_name_the_runner() {
    let platform = PlatformBuilder::new()
        .failing_project("p1", PlatformError::Gone("p1".into()))
        .failing_project("p2", PlatformError::Forbidden("p2".into()))
        .build();

    let err = dispatcher(
        &platform,
        Arc::new(RecordingReporter::new()),
        settings("sync_multiple_projects_based_on_pid"),
    )
    .dispatch(&[record("a@x.com", "p1")])
    .await
    .unwrap_err();
    assert!(matches!(err, SyncError::AccessRevoked { ref login, .. } if login == "runner@acme.com"));

    let err = dispatcher(
        &platform,
        Arc::new(RecordingReporter::new()),
        settings("sync_multiple_projects_based_on_pid"),
    )
    .dispatch(&[record("a@x.com", "p2")])
    .await
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "User runner@acme.com is not enabled within project \"p2\""
    );
}

#[tokio::test]
async fn test_tolerant_run_turns_unreachable_project_into_error_event() {
    let platform = PlatformBuilder::new().project("p1").build();
    let mut settings = settings("sync_multiple_projects_based_on_pid");
    settings.ignore_failures = true;
    let records = vec![record("a@x.com", "nope"), record("b@x.com", "p1")];

    let events = dispatcher(&platform, Arc::new(RecordingReporter::new()), settings)
        .dispatch(&records)
        .await
        .unwrap();

    assert_eq!(events[0].event_type, EventType::Error);
    assert_eq!(events[0].subject, "nope");
    assert_eq!(events[1].event_type, EventType::Created);
}

#[tokio::test]
async fn test_one_project_by_pid_keeps_matching_rows() {
    let platform = PlatformBuilder::new().project("p1").build();
    let mut settings = settings("sync_one_project_based_on_pid");
    settings.project_id = Some("p1".to_string());
    let records = vec![
        record("a@x.com", "p1"),
        record("b@x.com", "p2"),
        record("c@x.com", "p1"),
    ];

    dispatcher(&platform, Arc::new(RecordingReporter::new()), settings)
        .dispatch(&records)
        .await
        .unwrap();

    assert_eq!(
        platform.project_ref("p1").imported(),
        vec![vec!["a@x.com", "c@x.com"]]
    );
}

#[tokio::test]
async fn test_sync_project_imports_every_record() {
    let platform = PlatformBuilder::new().project("p1").build();
    let mut settings = settings("sync_project");
    settings.project_id = Some("p1".to_string());

    dispatcher(&platform, Arc::new(RecordingReporter::new()), settings)
        .dispatch(&[UserRecord::with_login("a@x.com"), UserRecord::with_login("b@x.com")])
        .await
        .unwrap();

    assert_eq!(
        platform.project_ref("p1").imported(),
        vec![vec!["a@x.com", "b@x.com"]]
    );
    assert!(platform.domain.create_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_custom_id_comes_from_project_metadata() {
    let platform = PlatformBuilder::new()
        .project_with_metadata("p1", "GOODOT_CUSTOM_PROJECT_ID", "acme-east")
        .build();
    let mut settings = settings("sync_one_project_based_on_custom_id");
    settings.project_id = Some("p1".to_string());
    let records = vec![
        record("a@x.com", "acme-east"),
        record("b@x.com", "acme-west"),
    ];

    dispatcher(&platform, Arc::new(RecordingReporter::new()), settings)
        .dispatch(&records)
        .await
        .unwrap();

    assert_eq!(platform.project_ref("p1").imported(), vec![vec!["a@x.com"]]);
}

#[tokio::test]
async fn test_client_owning_the_project_overrides_metadata() {
    let platform = PlatformBuilder::new()
        .project_with_metadata("p1", "GOODOT_CUSTOM_PROJECT_ID", "acme-east")
        .client("acme-west", "basic", Some("p1"))
        .build();
    let mut settings = settings("sync_one_project_based_on_custom_id");
    settings.project_id = Some("p1".to_string());
    let records = vec![
        record("a@x.com", "acme-east"),
        record("b@x.com", "acme-west"),
    ];

    dispatcher(&platform, Arc::new(RecordingReporter::new()), settings)
        .dispatch(&records)
        .await
        .unwrap();

    assert_eq!(platform.project_ref("p1").imported(), vec![vec!["b@x.com"]]);
}

#[tokio::test]
async fn test_custom_id_without_match_warns_and_imports_nobody() {
    let platform = PlatformBuilder::new()
        .project_with_metadata("p1", "GOODOT_CUSTOM_PROJECT_ID", "acme-north")
        .build();
    let reporter = Arc::new(RecordingReporter::new());
    let mut settings = settings("sync_one_project_based_on_custom_id");
    settings.project_id = Some("p1".to_string());

    dispatcher(&platform, reporter.clone(), settings)
        .dispatch(&[record("a@x.com", "acme-east")])
        .await
        .unwrap();

    assert!(reporter.contains(ReportLevel::Warn, "does not match with any client ids"));
    assert_eq!(platform.project_ref("p1").imported(), vec![Vec::<String>::new()]);
}

#[tokio::test]
async fn test_custom_id_unresolvable_is_fatal() {
    let platform = PlatformBuilder::new().project("p1").build();
    let mut settings = settings("sync_one_project_based_on_custom_id");
    settings.project_id = Some("p1".to_string());

    let err = dispatcher(&platform, Arc::new(RecordingReporter::new()), settings)
        .dispatch(&[record("a@x.com", "acme-east")])
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::CustomIdUnresolved { .. }));
    assert!(platform.project_ref("p1").imported().is_empty());
}
