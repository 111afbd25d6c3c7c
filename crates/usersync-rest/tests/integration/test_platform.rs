//! Integration tests for the platform entry point

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use usersync_core::domain::ProjectId;
use usersync_core::ports::{IPlatformClient, PlatformError};

use crate::common;

#[tokio::test]
async fn test_current_login() {
    let (_server, platform) = common::setup_platform_mock().await;

    let login = platform.current_login().await.expect("current_login failed");

    assert_eq!(login, "runner@acme.com");
}

#[tokio::test]
async fn test_project_lookup() {
    let (server, platform) = common::setup_platform_mock().await;

    Mock::given(method("GET"))
        .and(path("/gdc/projects/old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "project": { "content": { "state": "DELETED" } }
        })))
        .mount(&server)
        .await;

    let project = platform
        .project(&ProjectId::new("p1").unwrap())
        .await
        .unwrap()
        .expect("project p1 should exist");
    assert_eq!(project.pid().as_str(), "p1");
    assert!(!project.is_deleted());
    assert_eq!(project.uri(), "/gdc/projects/p1");

    let old = platform
        .project(&ProjectId::new("old").unwrap())
        .await
        .unwrap()
        .expect("project old should exist");
    assert!(old.is_deleted());
}

#[tokio::test]
async fn test_unknown_project_is_none() {
    let (_server, platform) = common::setup_platform_mock().await;

    let project = platform
        .project(&ProjectId::new("missing").unwrap())
        .await
        .unwrap();

    assert!(project.is_none());
}

#[tokio::test]
async fn test_unreachable_project_is_classified() {
    let (server, platform) = common::setup_platform_mock().await;

    Mock::given(method("GET"))
        .and(path("/gdc/projects/p2"))
        .respond_with(ResponseTemplate::new(410).set_body_json(json!({
            "error": { "message": "Project %s was archived", "parameters": ["p2"] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gdc/projects/p3"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let gone = platform
        .project(&ProjectId::new("p2").unwrap())
        .await
        .err()
        .expect("gone project should fail");
    assert_eq!(
        PlatformError::find(&gone),
        Some(&PlatformError::Gone(
            "/gdc/projects/p2: Project p2 was archived".into()
        ))
    );

    let forbidden = platform
        .project(&ProjectId::new("p3").unwrap())
        .await
        .err()
        .expect("forbidden project should fail");
    assert!(matches!(
        PlatformError::find(&forbidden),
        Some(PlatformError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_create_returns_object_uri() {
    let (server, platform) = common::setup_platform_mock().await;

    Mock::given(method("POST"))
        .and(path("/gdc/md/p1/obj"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uri": "/gdc/md/p1/obj/1001"
        })))
        .mount(&server)
        .await;

    let uri = platform
        .create("/gdc/md/p1/obj", &json!({ "userFilter": {} }))
        .await
        .expect("create failed");

    assert_eq!(uri.as_str(), "/gdc/md/p1/obj/1001");
    assert_eq!(uri.object_id(), "1001");
}

#[tokio::test]
async fn test_delete_passes_through() {
    let (server, platform) = common::setup_platform_mock().await;

    Mock::given(method("DELETE"))
        .and(path("/gdc/md/p1/obj/900"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    platform
        .delete("/gdc/md/p1/obj/900")
        .await
        .expect("delete failed");
}

#[tokio::test]
async fn test_throttled_request_is_retried() {
    let (server, platform) = common::setup_platform_mock().await;

    Mock::given(method("GET"))
        .and(path("/gdc/md/p1/userfilters"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gdc/md/p1/userfilters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userFilters": { "items": [] }
        })))
        .mount(&server)
        .await;

    let body = platform
        .get("/gdc/md/p1/userfilters")
        .await
        .expect("throttled call should be retried");

    assert_eq!(body["userFilters"]["items"], json!([]));
    assert_eq!(common::received(&server, "GET", "/gdc/md/p1/userfilters").await.len(), 2);
}
