//! Organization-level modes and the end-to-end use case

use std::sync::Arc;

use usersync_core::config::ConfigBuilder;
use usersync_core::domain::{EventType, UserRecord};
use usersync_core::ports::{IPlatformClient, InMemorySource, RecordingReporter, ReportLevel};
use usersync_engine::{SyncError, SyncUsersUseCase};

use crate::common::{dispatcher, settings, PlatformBuilder, RUNNER};

fn rows(logins: &[&str]) -> Vec<Vec<String>> {
    logins.iter().map(|l| vec![l.to_string()]).collect()
}

#[tokio::test]
async fn test_duplicate_rows_produce_one_create_call_with_one_record() {
    let platform = PlatformBuilder::new().build();
    let config = ConfigBuilder::new()
        .domain("acme")
        .sync_mode("add_to_organization")
        .build();
    let use_case = SyncUsersUseCase::new(
        Arc::clone(&platform) as Arc<dyn IPlatformClient>,
        Arc::new(RecordingReporter::new()),
        &config,
    );
    let mut source = InMemorySource::new(["login"], rows(&["a@x.com", "a@x.com"]));

    let summary = use_case.execute(&mut source).await.unwrap();

    let calls = platform.domain.create_calls.lock().unwrap().clone();
    assert_eq!(calls, vec![vec!["a@x.com".to_string()]]);
    assert_eq!(summary.count(EventType::Created), 1);
    assert!(summary.is_success());
}

#[tokio::test]
async fn test_unknown_mode_stops_use_case_before_loading() {
    let platform = PlatformBuilder::new().build();
    let config = ConfigBuilder::new()
        .domain("acme")
        .sync_mode("sync_everything")
        .build();
    let use_case = SyncUsersUseCase::new(
        Arc::clone(&platform) as Arc<dyn IPlatformClient>,
        Arc::new(RecordingReporter::new()),
        &config,
    );
    let mut source = InMemorySource::new(["login"], rows(&["a@x.com"]));

    let err = use_case.execute(&mut source).await.unwrap_err();

    assert!(matches!(err, SyncError::Domain(_)));
    assert!(platform.journal().is_empty());
}

#[tokio::test]
async fn test_remove_reports_missing_users_and_keeps_whitelisted() {
    let platform = PlatformBuilder::new()
        .user("a@x.com")
        .user("boss@x.com")
        .user(RUNNER)
        .build();
    let reporter = Arc::new(RecordingReporter::new());
    let mut settings = settings("remove_from_organization");
    settings.whitelists = vec!["BOSS@x.com".to_string()];
    let records = vec![
        UserRecord::with_login("a@x.com"),
        UserRecord::with_login("ghost@x.com"),
        UserRecord::with_login("boss@x.com"),
        UserRecord::with_login(RUNNER),
        UserRecord::with_login("a@x.com"),
    ];

    let events = dispatcher(&platform, reporter.clone(), settings)
        .dispatch(&records)
        .await
        .unwrap();

    assert_eq!(*platform.domain.deleted.lock().unwrap(), vec!["a@x.com"]);
    let deleted: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == EventType::Deleted)
        .map(|e| e.subject.as_str())
        .collect();
    assert_eq!(deleted, vec!["a@x.com"]);
    let skipped = events
        .iter()
        .filter(|e| e.event_type == EventType::Skipped)
        .count();
    assert_eq!(skipped, 3);
    assert!(!events.iter().any(|e| e.is_failure()));

    assert!(reporter.contains(
        ReportLevel::Info,
        "1 users were not found (or were deleted) in domain acme"
    ));
    assert!(reporter.contains(ReportLevel::Warn, "Deleting 1 users from domain acme"));
}

#[tokio::test]
async fn test_domain_and_project_creates_before_importing() {
    let platform = PlatformBuilder::new().project("p1").build();
    let mut settings = settings("sync_domain_and_project");
    settings.project_id = Some("p1".to_string());
    let records = vec![UserRecord::with_login("a@x.com"), UserRecord::with_login("b@x.com")];

    let events = dispatcher(&platform, Arc::new(RecordingReporter::new()), settings)
        .dispatch(&records)
        .await
        .unwrap();

    assert_eq!(platform.journal(), vec!["create_users:2", "import:p1:2"]);
    assert_eq!(events.len(), 4);
    assert_eq!(events[2].partition.as_deref(), Some("p1"));
}

#[tokio::test]
async fn test_failing_events_fail_the_run_once() {
    let platform = PlatformBuilder::new().project("p1").build();
    let config = ConfigBuilder::new()
        .domain("acme")
        .sync_mode("sync_multiple_projects_based_on_pid")
        .multiple_projects_column("pid")
        .ignore_failures(true)
        .build();
    let reporter = Arc::new(RecordingReporter::new());
    let use_case = SyncUsersUseCase::new(
        Arc::clone(&platform) as Arc<dyn IPlatformClient>,
        reporter.clone(),
        &config,
    );
    let mut source = InMemorySource::new(
        ["login", "pid"],
        vec![
            vec!["a@x.com".to_string(), "p1".to_string()],
            vec!["b@x.com".to_string(), "missing".to_string()],
        ],
    );

    let err = use_case.execute(&mut source).await.unwrap_err();

    assert_eq!(err.to_string(), "There was an error syncing users");
    let summary = err.summary().unwrap();
    assert_eq!(summary.count(EventType::Created), 1);
    assert_eq!(summary.count(EventType::Error), 1);
    assert!(reporter.contains(ReportLevel::Info, "Printing 10 first errors"));
    assert_eq!(platform.project_ref("p1").imported(), vec![vec!["a@x.com"]]);
}
