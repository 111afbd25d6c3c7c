//! Integration tests for the domain adapter

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use usersync_core::domain::{EventType, ObjectUri, PlatformUser, UserRecord};
use usersync_core::ports::{CreateUsersOptions, IPlatformClient};

use crate::common::{self, DOMAIN};

fn users_path() -> String {
    format!("/gdc/account/domains/{DOMAIN}/users")
}

#[tokio::test]
async fn test_missing_account_is_created() {
    let (server, platform) = common::setup_platform_mock().await;
    common::mount_domain_user(&server, "new@acme.com", None).await;
    Mock::given(method("POST"))
        .and(path(users_path()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "uri": "/gdc/account/profile/new"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let domain = platform.domain(DOMAIN).await.unwrap();
    let record = UserRecord {
        first_name: Some("New".into()),
        ..UserRecord::with_login("new@acme.com")
    };
    let events = domain
        .create_users(&[record], &CreateUsersOptions::default())
        .await
        .expect("create_users failed");

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Created);
    assert_eq!(events[0].subject, "new@acme.com");

    let bodies = common::received(&server, "POST", &users_path()).await;
    let account = &bodies[0]["accountSetting"];
    assert_eq!(account["login"], "new@acme.com");
    assert_eq!(account["firstName"], "New");
    assert_eq!(account["lastName"], "new@acme.com");
    assert!(account["password"].as_str().is_some_and(|p| !p.is_empty()));
}

#[tokio::test]
async fn test_unchanged_account_is_left_alone() {
    let (server, platform) = common::setup_platform_mock().await;
    common::mount_domain_user(&server, "john@acme.com", Some("/gdc/account/profile/john")).await;

    let domain = platform.domain(DOMAIN).await.unwrap();
    let record = UserRecord {
        first_name: Some("First".into()),
        last_name: Some("Last".into()),
        ..UserRecord::with_login("john@acme.com")
    };
    let events = domain
        .create_users(&[record.clone(), record], &CreateUsersOptions::default())
        .await
        .unwrap();

    assert!(events.is_empty());
    assert!(common::received(&server, "POST", &users_path()).await.is_empty());
    assert!(common::received(&server, "PUT", "/gdc/account/profile/john").await.is_empty());
}

#[tokio::test]
async fn test_changed_account_is_updated() {
    let (server, platform) = common::setup_platform_mock().await;
    common::mount_domain_user(&server, "john@acme.com", Some("/gdc/account/profile/john")).await;
    Mock::given(method("PUT"))
        .and(path("/gdc/account/profile/john"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let domain = platform.domain(DOMAIN).await.unwrap();
    let record = UserRecord {
        first_name: Some("Johnny".into()),
        last_name: Some("Last".into()),
        ..UserRecord::with_login("john@acme.com")
    };
    let events = domain
        .create_users(&[record], &CreateUsersOptions::default())
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Updated);
    let bodies = common::received(&server, "PUT", "/gdc/account/profile/john").await;
    assert_eq!(bodies[0]["accountSetting"]["firstName"], "Johnny");
    assert!(bodies[0]["accountSetting"].get("password").is_none());
}

#[tokio::test]
async fn test_rejected_account_with_and_without_tolerance() {
    let (server, platform) = common::setup_platform_mock().await;
    common::mount_domain_user(&server, "bad@acme.com", None).await;
    common::mount_domain_user(&server, "good@acme.com", None).await;
    Mock::given(method("POST"))
        .and(path(users_path()))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": { "message": "Login %s is already taken", "parameters": ["bad@acme.com"] }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(users_path()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "uri": "/gdc/account/profile/good" })))
        .mount(&server)
        .await;

    let domain = platform.domain(DOMAIN).await.unwrap();
    let records = [
        UserRecord::with_login("bad@acme.com"),
        UserRecord::with_login("good@acme.com"),
    ];
    let events = domain
        .create_users(&records, &CreateUsersOptions { ignore_failures: true })
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, EventType::Failed);
    assert!(events[0].detail.contains("Login bad@acme.com is already taken"));
    assert_eq!(events[1].event_type, EventType::Created);

    server.reset().await;
    common::mount_domain_user(&server, "bad@acme.com", None).await;
    Mock::given(method("POST"))
        .and(path(users_path()))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let err = domain
        .create_users(&records[..1], &CreateUsersOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to create or update user bad@acme.com"));
}

#[tokio::test]
async fn test_clients_follow_paging() {
    let (server, platform) = common::setup_platform_mock().await;
    let first = format!("/gdc/domains/{DOMAIN}/dataproducts/dp1/clients");
    let second = format!("/gdc/domains/{DOMAIN}/dataproducts/dp1/clients/page2");
    Mock::given(method("GET"))
        .and(path(first.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "clients": {
                "items": [
                    { "client": { "id": "north", "segment": "/segments/basic", "project": "/gdc/projects/p1" } },
                    { "client": { "id": "south", "segment": "/segments/basic" } }
                ],
                "paging": { "next": second }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(second.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "clients": {
                "items": [ { "client": { "id": "west", "project": "/gdc/projects/p2" } } ],
                "paging": {}
            }
        })))
        .mount(&server)
        .await;

    let domain = platform.domain(DOMAIN).await.unwrap();
    let clients = domain.clients(Some("dp1")).await.expect("clients failed");

    let ids: Vec<&str> = clients.iter().map(|c| c.client_id.as_str()).collect();
    assert_eq!(ids, vec!["north", "south", "west"]);
    assert_eq!(clients[0].project_id().unwrap().as_str(), "p1");
    assert!(clients[1].project_id().is_none());
    assert_eq!(clients[2].segment_uri, None);
}

#[tokio::test]
async fn test_clients_default_data_product() {
    let (server, platform) = common::setup_platform_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/gdc/domains/{DOMAIN}/dataproducts/default/clients")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "clients": { "items": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let domain = platform.domain(DOMAIN).await.unwrap();
    assert!(domain.clients(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_find_and_delete_user() {
    let (server, platform) = common::setup_platform_mock().await;
    common::mount_domain_user(&server, "john@acme.com", Some("/gdc/account/profile/john")).await;
    common::mount_domain_user(&server, "ghost@acme.com", None).await;
    Mock::given(method("DELETE"))
        .and(path("/gdc/account/profile/john"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let domain = platform.domain(DOMAIN).await.unwrap();
    let john = domain
        .find_user_by_login("john@acme.com")
        .await
        .unwrap()
        .expect("john should exist");
    assert_eq!(john.profile_uri.as_str(), "/gdc/account/profile/john");
    assert!(domain.find_user_by_login("ghost@acme.com").await.unwrap().is_none());

    domain.delete_user(&john).await.expect("delete failed");

    let stranger = PlatformUser::new(
        "stranger@acme.com",
        ObjectUri::new("/gdc/account/profile/stranger").unwrap(),
    );
    assert!(domain.delete_user(&stranger).await.is_err());
}

#[tokio::test]
async fn test_lookup_sends_login_query() {
    let (server, platform) = common::setup_platform_mock().await;
    Mock::given(method("GET"))
        .and(path(users_path()))
        .and(query_param("login", "a+b@acme.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accountSettings": { "items": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let domain = platform.domain(DOMAIN).await.unwrap();
    assert!(domain.find_user_by_login("a+b@acme.com").await.unwrap().is_none());
}
