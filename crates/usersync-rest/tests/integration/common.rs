//! Shared test helpers for platform API integration tests
//!
//! Provides wiremock-based mock server setup for the platform endpoints.
//! Each helper mounts the necessary mock endpoints and returns a configured
//! RestPlatform pointing at the mock server.

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use usersync_rest::{RestClient, RestPlatform};

pub const DOMAIN: &str = "acme";
pub const ROLE_ADMIN: &str = "/gdc/projects/p1/roles/1";
pub const ROLE_VIEWER: &str = "/gdc/projects/p1/roles/3";

/// Sets up a mock server with the common platform endpoints and returns
/// a (MockServer, RestPlatform) tuple.
///
/// Pre-configured endpoints:
/// - GET /gdc/account/profile/current → runner profile
/// - GET /gdc/projects/p1 → enabled project
/// - GET /gdc/projects/p1/roles (+ each role) → Admin and Viewer
pub async fn setup_platform_mock() -> (MockServer, RestPlatform) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gdc/account/profile/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accountSetting": {
                "login": "runner@acme.com",
                "email": "runner@acme.com",
                "firstName": "Run",
                "lastName": "Ner",
                "links": { "self": "/gdc/account/profile/runner" }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gdc/projects/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "project": { "content": { "state": "ENABLED" }, "meta": { "title": "Sales" } }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gdc/projects/p1/roles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projectRoles": { "roles": [ROLE_ADMIN, ROLE_VIEWER] }
        })))
        .mount(&server)
        .await;

    mount_role(&server, ROLE_ADMIN, "adminRole", "Admin").await;
    mount_role(&server, ROLE_VIEWER, "readOnlyUserRole", "Viewer").await;

    let client = RestClient::with_base_url("test-token", server.uri());
    let platform = RestPlatform::new(client).with_domain(DOMAIN);

    (server, platform)
}

async fn mount_role(server: &MockServer, uri: &str, identifier: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(uri))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projectRole": { "meta": { "identifier": identifier, "title": title, "uri": uri } }
        })))
        .mount(server)
        .await;
}

/// A project member entry as returned by `GET /gdc/projects/{pid}/users`
pub fn member(login: &str, profile: &str, role: &str, status: &str) -> Value {
    json!({
        "user": {
            "content": {
                "login": login,
                "email": login,
                "firstname": "First",
                "lastname": "Last",
                "status": status,
                "userRoles": [role]
            },
            "links": { "self": profile }
        }
    })
}

/// Mounts the member listing of project p1
pub async fn mount_members(server: &MockServer, members: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/gdc/projects/p1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": members })))
        .mount(server)
        .await;
}

/// Mounts a membership write endpoint reporting `failed` profile URIs
pub async fn mount_membership_write(server: &MockServer, failed: &[&str]) {
    let failed: Vec<Value> = failed
        .iter()
        .map(|uri| json!({ "user": uri, "message": "User cannot be added" }))
        .collect();
    Mock::given(method("POST"))
        .and(path("/gdc/projects/p1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projectUsersUpdateResult": { "successful": [], "failed": failed }
        })))
        .mount(server)
        .await;
}

/// Mounts the domain lookup of `login`; `None` answers with no account
pub async fn mount_domain_user(server: &MockServer, login: &str, profile: Option<&str>) {
    let items: Vec<Value> = profile
        .map(|uri| {
            vec![json!({
                "accountSetting": {
                    "login": login,
                    "email": login,
                    "firstName": "First",
                    "lastName": "Last",
                    "links": { "self": uri }
                }
            })]
        })
        .unwrap_or_default();
    Mock::given(method("GET"))
        .and(path(format!("/gdc/account/domains/{DOMAIN}/users")))
        .and(query_param("login", login))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accountSettings": { "items": items }
        })))
        .mount(server)
        .await;
}

/// JSON bodies of the requests received for `verb` and `request_path`
pub async fn received(server: &MockServer, verb: &str, request_path: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == request_path)
        .map(|r| r.body_json::<Value>().unwrap_or(Value::Null))
        .collect()
}
