//! Integration tests for the project and label adapters

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use usersync_core::domain::{EventType, ProjectId, UserRecord};
use usersync_core::ports::{IPlatformClient, IProject, ImportOptions};
use usersync_rest::RestPlatform;

use crate::common::{self, ROLE_ADMIN, ROLE_VIEWER};

async fn open_p1(platform: &RestPlatform) -> Arc<dyn IProject> {
    platform
        .project(&ProjectId::new("p1").unwrap())
        .await
        .unwrap()
        .expect("project p1 should exist")
}

async fn mount_standard_roster(server: &MockServer) {
    common::mount_members(
        server,
        vec![
            common::member("john@acme.com", "/gdc/account/profile/john", ROLE_VIEWER, "ENABLED"),
            common::member("old@acme.com", "/gdc/account/profile/old", ROLE_VIEWER, "ENABLED"),
            common::member("gone@acme.com", "/gdc/account/profile/gone", ROLE_VIEWER, "DISABLED"),
        ],
    )
    .await;
}

async fn mount_user_groups(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/gdc/userGroups"))
        .and(query_param("project", "p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userGroups": {
                "items": [
                    { "userGroup": { "content": { "name": "Sales" }, "links": { "self": "/gdc/userGroups/g1" } } }
                ]
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_users_lists_members() {
    let (server, platform) = common::setup_platform_mock().await;
    mount_standard_roster(&server).await;

    let users = open_p1(&platform).await.users().await.expect("users failed");

    assert_eq!(users.len(), 3);
    assert_eq!(users[0].login, "john@acme.com");
    assert_eq!(users[0].role_uri.as_deref(), Some(ROLE_VIEWER));
    assert!(users[0].enabled);
    assert!(!users[2].enabled);
}

#[tokio::test]
async fn test_import_adds_changes_and_disables() {
    let (server, platform) = common::setup_platform_mock().await;
    mount_standard_roster(&server).await;
    common::mount_domain_user(&server, "jane@acme.com", Some("/gdc/account/profile/jane")).await;
    common::mount_membership_write(&server, &[]).await;

    let records = vec![
        UserRecord::with_login("john@acme.com").with_role("adminRole"),
        UserRecord::with_login("jane@acme.com"),
    ];
    let events = open_p1(&platform)
        .await
        .import_users(&records, &ImportOptions::default())
        .await
        .expect("import failed");

    let summary: Vec<(EventType, &str)> = events
        .iter()
        .map(|e| (e.event_type, e.subject.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (EventType::Created, "jane@acme.com"),
            (EventType::Updated, "john@acme.com"),
            (EventType::Deleted, "old@acme.com"),
        ]
    );
    assert_eq!(events[0].detail, "Viewer");
    assert_eq!(events[2].detail, "disabled in project p1");

    let writes = common::received(&server, "POST", "/gdc/projects/p1/users").await;
    assert_eq!(writes.len(), 2);

    let added = writes[0]["users"].as_array().unwrap();
    assert_eq!(added.len(), 2);
    assert_eq!(added[0]["user"]["links"]["self"], "/gdc/account/profile/jane");
    assert_eq!(added[0]["user"]["content"]["userRoles"][0], ROLE_VIEWER);
    assert_eq!(added[1]["user"]["links"]["self"], "/gdc/account/profile/john");
    assert_eq!(added[1]["user"]["content"]["userRoles"][0], ROLE_ADMIN);

    let disabled = writes[1]["users"].as_array().unwrap();
    assert_eq!(disabled.len(), 1);
    assert_eq!(disabled[0]["user"]["links"]["self"], "/gdc/account/profile/old");
    assert_eq!(disabled[0]["user"]["content"]["status"], "DISABLED");
}

#[tokio::test]
async fn test_import_removes_members_when_asked() {
    let (server, platform) = common::setup_platform_mock().await;
    mount_standard_roster(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/gdc/projects/p1/users/old"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let options = ImportOptions {
        remove_users_from_project: true,
        ..ImportOptions::default()
    };
    let events = open_p1(&platform)
        .await
        .import_users(&[UserRecord::with_login("john@acme.com")], &options)
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Deleted);
    assert_eq!(events[0].detail, "removed from project p1");
    assert!(common::received(&server, "POST", "/gdc/projects/p1/users").await.is_empty());
}

#[tokio::test]
async fn test_import_leaves_unmentioned_members_alone() {
    let (server, platform) = common::setup_platform_mock().await;
    mount_standard_roster(&server).await;

    let options = ImportOptions {
        do_not_touch_users_that_are_not_mentioned: true,
        ..ImportOptions::default()
    };
    let events = open_p1(&platform)
        .await
        .import_users(&[UserRecord::with_login("john@acme.com")], &options)
        .await
        .unwrap();

    assert!(events.is_empty());
    assert!(common::received(&server, "POST", "/gdc/projects/p1/users").await.is_empty());
}

#[tokio::test]
async fn test_unknown_role_fails_strict_import() {
    let (server, platform) = common::setup_platform_mock().await;
    mount_standard_roster(&server).await;

    let err = open_p1(&platform)
        .await
        .import_users(
            &[UserRecord::with_login("john@acme.com").with_role("ownerRole")],
            &ImportOptions::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to import user john@acme.com: Role \"ownerRole\" does not exist in the project"
    );
}

#[tokio::test]
async fn test_tolerant_import_records_failures() {
    let (server, platform) = common::setup_platform_mock().await;
    mount_standard_roster(&server).await;
    common::mount_domain_user(&server, "ghost@acme.com", None).await;
    common::mount_domain_user(&server, "jane@acme.com", Some("/gdc/account/profile/jane")).await;
    common::mount_membership_write(&server, &["/gdc/account/profile/jane"]).await;

    let options = ImportOptions {
        ignore_failures: true,
        do_not_touch_users_that_are_not_mentioned: true,
        ..ImportOptions::default()
    };
    let records = vec![
        UserRecord::with_login("ghost@acme.com"),
        UserRecord::with_login("jane@acme.com"),
        UserRecord::with_login("john@acme.com").with_role("ownerRole"),
    ];
    let events = open_p1(&platform)
        .await
        .import_users(&records, &options)
        .await
        .unwrap();

    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.event_type == EventType::Failed));
    let detail_of = |login: &str| {
        events
            .iter()
            .find(|e| e.subject == login)
            .map(|e| e.detail.clone())
            .unwrap()
    };
    assert_eq!(detail_of("ghost@acme.com"), "User ghost@acme.com was not found in domain acme");
    assert_eq!(detail_of("jane@acme.com"), "User cannot be added");
    assert!(detail_of("john@acme.com").contains("ownerRole"));
}

#[tokio::test]
async fn test_import_assigns_user_groups() {
    let (server, platform) = common::setup_platform_mock().await;
    mount_standard_roster(&server).await;
    mount_user_groups(&server).await;
    Mock::given(method("POST"))
        .and(path("/gdc/userGroups"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "uri": "/gdc/userGroups/g2" })))
        .expect(1)
        .mount(&server)
        .await;
    for group in ["g1", "g2"] {
        Mock::given(method("POST"))
            .and(path(format!("/gdc/userGroups/{group}/modifyMembers")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }

    let options = ImportOptions {
        do_not_touch_users_that_are_not_mentioned: true,
        ..ImportOptions::default()
    };
    let records = vec![UserRecord::with_login("john@acme.com")
        .with_user_groups(vec!["Sales".into(), "Support".into()])];
    let events = open_p1(&platform)
        .await
        .import_users(&records, &options)
        .await
        .expect("import failed");

    assert!(events.is_empty());

    let created = common::received(&server, "POST", "/gdc/userGroups").await;
    assert_eq!(created[0]["userGroup"]["content"]["name"], "Support");
    assert_eq!(created[0]["userGroup"]["content"]["project"], "/gdc/projects/p1");

    let sales = common::received(&server, "POST", "/gdc/userGroups/g1/modifyMembers").await;
    assert_eq!(
        sales[0],
        json!({ "modifyMembers": { "operation": "ADD", "items": ["/gdc/account/profile/john"] } })
    );
}

#[tokio::test]
async fn test_missing_group_without_auto_creation_fails() {
    let (server, platform) = common::setup_platform_mock().await;
    mount_standard_roster(&server).await;
    mount_user_groups(&server).await;

    let options = ImportOptions {
        do_not_touch_users_that_are_not_mentioned: true,
        create_non_existing_user_groups: false,
        ..ImportOptions::default()
    };
    let records =
        vec![UserRecord::with_login("john@acme.com").with_user_groups(vec!["Support".into()])];
    let err = open_p1(&platform)
        .await
        .import_users(&records, &options)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("User group \"Support\" does not exist"));
}

#[tokio::test]
async fn test_metadata() {
    let (server, platform) = common::setup_platform_mock().await;
    Mock::given(method("GET"))
        .and(path("/gdc/projects/p1/dataload/metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadataItems": {
                "items": [
                    { "metadataItem": { "key": "GOODOT_CUSTOM_PROJECT_ID", "value": "north" } }
                ]
            }
        })))
        .mount(&server)
        .await;

    let metadata = open_p1(&platform).await.metadata().await.unwrap();

    assert_eq!(metadata.get("GOODOT_CUSTOM_PROJECT_ID").map(String::as_str), Some("north"));
}

#[tokio::test]
async fn test_metadata_absent_is_empty() {
    let (_server, platform) = common::setup_platform_mock().await;

    let metadata = open_p1(&platform).await.metadata().await.unwrap();

    assert!(metadata.is_empty());
}

#[tokio::test]
async fn test_label_by_identifier_resolves_values() {
    let (server, platform) = common::setup_platform_mock().await;
    Mock::given(method("POST"))
        .and(path("/gdc/md/p1/identifiers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identifiers": [ { "identifier": "label.state", "uri": "/gdc/md/p1/obj/270" } ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gdc/md/p1/obj/270"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "attributeDisplayForm": {
                "content": { "formOf": "/gdc/md/p1/obj/269" },
                "meta": { "identifier": "label.state", "title": "State", "uri": "/gdc/md/p1/obj/270" }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gdc/md/p1/obj/270/elements"))
        .and(query_param("filter", "Ohio"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "attributeElements": {
                "elements": [
                    { "title": "Ohio River", "uri": "/gdc/md/p1/obj/269/elements?id=7" },
                    { "title": "Ohio", "uri": "/gdc/md/p1/obj/269/elements?id=2" }
                ]
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gdc/md/p1/obj/270/elements"))
        .and(query_param("filter", "Atlantis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "attributeElements": { "elements": [] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gdc/md/p1/obj/270/elements"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "attributeElements": {
                "elements": [ { "title": "Alabama", "uri": "/gdc/md/p1/obj/269/elements?id=1" } ],
                "paging": { "total": "51" }
            }
        })))
        .mount(&server)
        .await;

    let label = open_p1(&platform)
        .await
        .label("label.state")
        .await
        .unwrap()
        .expect("label should resolve");

    assert_eq!(label.identifier(), "label.state");
    assert_eq!(label.uri(), "/gdc/md/p1/obj/270");
    assert_eq!(label.attribute_uri(), "/gdc/md/p1/obj/269");
    assert_eq!(
        label.find_value_uri("Ohio").await.unwrap().as_deref(),
        Some("/gdc/md/p1/obj/269/elements?id=2")
    );
    assert!(label.find_value_uri("Atlantis").await.unwrap().is_none());
    assert_eq!(label.values_count().await.unwrap(), 51);
}

#[tokio::test]
async fn test_unknown_label_is_none() {
    let (server, platform) = common::setup_platform_mock().await;
    Mock::given(method("POST"))
        .and(path("/gdc/md/p1/identifiers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "identifiers": [] })))
        .mount(&server)
        .await;

    let project = open_p1(&platform).await;

    assert!(project.label("label.unknown").await.unwrap().is_none());
    assert!(project.label("/gdc/md/p1/obj/404").await.unwrap().is_none());
}

#[tokio::test]
async fn test_data_permissions_carry_assignments() {
    let (server, platform) = common::setup_platform_mock().await;
    Mock::given(method("GET"))
        .and(path("/gdc/md/p1/query/userfilters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {
                "entries": [ { "link": "/gdc/md/p1/obj/900" }, { "link": "/gdc/md/p1/obj/901" } ]
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gdc/md/p1/userfilters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userFilters": {
                "items": [
                    { "user": "/gdc/account/profile/john", "userFilters": ["/gdc/md/p1/obj/900"] }
                ]
            }
        })))
        .mount(&server)
        .await;
    for (id, value) in [("900", "2"), ("901", "1")] {
        Mock::given(method("GET"))
            .and(path(format!("/gdc/md/p1/obj/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "userFilter": {
                    "content": {
                        "expression": format!("[/gdc/md/p1/obj/269] IN ([/gdc/md/p1/obj/269/elements?id={value}])")
                    },
                    "meta": { "title": "User filter - john@acme.com", "uri": format!("/gdc/md/p1/obj/{id}") }
                }
            })))
            .mount(&server)
            .await;
    }

    let filters = open_p1(&platform).await.data_permissions().await.unwrap();

    assert_eq!(filters.len(), 2);
    assert_eq!(filters[0].uri.as_str(), "/gdc/md/p1/obj/900");
    assert_eq!(
        filters[0].related_user_uri.as_ref().map(|u| u.as_str()),
        Some("/gdc/account/profile/john")
    );
    assert!(filters[0].matches_expression(
        "[/gdc/md/p1/obj/269]  IN ([/gdc/md/p1/obj/269/elements?id=2])"
    ));
    assert!(filters[1].related_user_uri.is_none());
}
