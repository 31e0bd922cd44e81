mod common;

use common::{not_found, ok, tester};
use hemmer_provider_fivetran::testing::ProviderTester;
use hemmer_provider_fivetran::{FivetranClient, FivetranError, ProviderError};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn group(name: &str) -> serde_json::Value {
    json!({
        "id": "group_id",
        "name": name,
        "created_at": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn test_create_group_returns_upstream_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/groups"))
        .and(body_json(json!({"name": "test_group_name"})))
        .respond_with(ok(group("test_group_name")))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester
        .apply_create("fivetran_group", json!({"name": "test_group_name"}))
        .await
        .unwrap();

    assert_eq!(state["id"], "group_id");
    assert_eq!(state["name"], "test_group_name");
}

#[tokio::test]
async fn test_rename_issues_exactly_one_patch() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/groups/group_id"))
        .and(body_json(json!({"name": "new_test_group_name"})))
        .respond_with(ok(group("new_test_group_name")))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester
        .apply_update(
            "fivetran_group",
            group("test_group_name"),
            json!({"name": "new_test_group_name"}),
        )
        .await
        .unwrap();

    assert_eq!(state["name"], "new_test_group_name");
}

#[tokio::test]
async fn test_update_without_changes_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/groups/group_id"))
        .respond_with(ok(group("x")))
        .expect(0)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let prior = group("test_group_name");
    let state = tester
        .update("fivetran_group", prior.clone(), prior.clone())
        .await
        .unwrap();
    assert_eq!(state, prior);
}

#[tokio::test]
async fn test_read_of_deleted_group_drops_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups/group_id"))
        .respond_with(not_found())
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/groups/group_id"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester.read("fivetran_group", group("test_group_name")).await.unwrap();
    assert!(state.is_null());
    tester.delete("fivetran_group", group("test_group_name")).await.unwrap();
}

#[tokio::test]
async fn test_import_and_data_sources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups/group_id"))
        .respond_with(ok(group("test_group_name")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ok(json!({
            "items": [group("test_group_name")],
            "next_cursor": "page_two"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .and(query_param("cursor", "page_two"))
        .respond_with(ok(json!({
            "items": [{"id": "other_group", "name": "other"}]
        })))
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let imported = tester.import("fivetran_group", "group_id").await.unwrap();
    assert_eq!(imported, group("test_group_name"));

    let one = tester
        .read_data_source("fivetran_group", json!({"id": "group_id"}))
        .await
        .unwrap();
    assert_eq!(one["name"], "test_group_name");

    let all = tester.read_data_source("fivetran_groups", json!({})).await.unwrap();
    let ids: Vec<&str> = all["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["group_id", "other_group"]);
}

#[tokio::test]
async fn test_unconfigured_provider_refuses_crud() {
    let tester = ProviderTester::new();
    let err = tester
        .create("fivetran_group", json!({"name": "test_group_name"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotConfigured));
    let diagnostics = err.into_diagnostics();
    assert!(diagnostics[0].summary.contains("not configured"));
}

fn client(server: &MockServer) -> FivetranClient {
    FivetranClient::with_base_url("key".to_string(), "secret".to_string(), server.uri()).unwrap()
}

#[tokio::test]
async fn test_html_not_found_page_is_still_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups/group_id"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string("<html><body>Not Found</body></html>"),
        )
        .mount(&server)
        .await;

    let err = client(&server).get_group("group_id").await.unwrap_err();
    assert!(err.is_not_found());
    match err {
        FivetranError::Api { status, code, message } => {
            assert_eq!(status, 404);
            assert_eq!(code, "Unknown");
            assert!(message.contains("<html>"));
        }
        other => panic!("expected an API error, got {:?}", other),
    }

    // A vanished group reads as gone rather than failing the refresh.
    let tester = tester(&server).await;
    let state = tester
        .read("fivetran_group", json!({"id": "group_id", "name": "analytics"}))
        .await
        .unwrap();
    assert!(state.is_null());
}

#[tokio::test]
async fn test_plain_text_conflict_is_still_a_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/groups/group_id"))
        .respond_with(ResponseTemplate::new(409).set_body_string("upstream busy"))
        .mount(&server)
        .await;

    let err = client(&server).update_group("group_id", "renamed").await.unwrap_err();
    assert!(err.is_conflict());
    assert!(err.to_string().contains("upstream busy"));
}
