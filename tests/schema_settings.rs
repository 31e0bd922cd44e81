mod common;

use common::{api_error, not_found, ok, tester};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer};

const TYPE: &str = "fivetran_connection_schema_settings";

fn config(audit_enabled: bool) -> Value {
    json!({
        "schema_change_handling": "ALLOW_ALL",
        "schemas": {
            "public": {"enabled": true, "tables": {}},
            "audit": {"enabled": audit_enabled, "tables": {}}
        }
    })
}

fn desired() -> Value {
    json!({
        "connection_id": "connection_id",
        "schema_change_handling": "ALLOW_ALL",
        "disabled_schemas": ["audit"]
    })
}

#[tokio::test]
async fn test_only_diverging_schemas_are_patched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections/connection_id/schemas"))
        .respond_with(ok(config(true)))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/connections/connection_id/schemas"))
        .and(body_json(json!({"schemas": {"audit": {"enabled": false}}})))
        .respond_with(ok(config(false)))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester.create(TYPE, desired()).await.unwrap();
    assert_eq!(state["id"], "connection_id");
    assert_eq!(state["disabled_schemas"], json!(["audit"]));
    assert!(state["enabled_schemas"].is_null());
}

#[tokio::test]
async fn test_in_sync_settings_send_no_patch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections/connection_id/schemas"))
        .respond_with(ok(config(false)))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/connections/connection_id/schemas"))
        .respond_with(ok(config(false)))
        .expect(0)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    tester.create(TYPE, desired()).await.unwrap();
}

#[tokio::test]
async fn test_conflict_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections/connection_id/schemas"))
        .respond_with(ok(config(true)))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/connections/connection_id/schemas"))
        .respond_with(api_error(409, "Conflict", "schema is being reloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/connections/connection_id/schemas"))
        .respond_with(ok(config(false)))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester.create(TYPE, desired()).await.unwrap();
    assert_eq!(state["disabled_schemas"], json!(["audit"]));
}

#[tokio::test]
async fn test_missing_config_triggers_reload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections/connection_id/schemas"))
        .respond_with(not_found())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/connections/connection_id/schemas/reload"))
        .and(body_json(json!({"exclude_mode": "PRESERVE"})))
        .respond_with(ok(config(false)))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester.create(TYPE, desired()).await.unwrap();
    assert_eq!(state["disabled_schemas"], json!(["audit"]));
}

#[tokio::test]
async fn test_unknown_schema_rejected_when_validating() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections/connection_id/schemas"))
        .respond_with(ok(config(true)))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/connections/connection_id/schemas"))
        .respond_with(ok(config(true)))
        .expect(0)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let err = tester
        .create(
            TYPE,
            json!({
                "connection_id": "connection_id",
                "schema_change_handling": "ALLOW_ALL",
                "disabled_schemas": ["missing"],
                "validation_level": "TABLES"
            }),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("missing"));
}

#[tokio::test]
async fn test_table_config_sends_table_patch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections/connection_id/schemas"))
        .respond_with(ok(json!({
            "schema_change_handling": "ALLOW_ALL",
            "schemas": {
                "public": {
                    "enabled": true,
                    "tables": {
                        "users": {"enabled": true, "sync_mode": "SOFT_DELETE"},
                        "logs": {"enabled": true, "sync_mode": "HISTORY"}
                    }
                }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/connections/connection_id/schemas/public"))
        .and(body_json(json!({"tables": {"logs": {"enabled": false}}})))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    tester
        .create(
            "fivetran_connection_table_config",
            json!({
                "connection_id": "connection_id",
                "schema": "public",
                "disabled_tables": ["logs"]
            }),
        )
        .await
        .unwrap();
}
