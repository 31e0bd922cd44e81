mod common;

use common::{ok, tester};
use hemmer_provider_fivetran::testing::{
    assert_diagnostic_contains, assert_no_errors, assert_plan_no_changes,
};
use hemmer_provider_fivetran::ProviderService;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer};

fn remote_destination(host: &str) -> Value {
    json!({
        "id": "destination_id",
        "group_id": "group_id",
        "service": "postgres_warehouse",
        "region": "GCP_US_EAST4",
        "time_zone_offset": "-5",
        "setup_status": "connected",
        "config": {"host": host, "port": 5432, "password": "******"}
    })
}

fn planned_destination(host: &str) -> Value {
    json!({
        "group_id": "group_id",
        "service": "postgres_warehouse",
        "region": "GCP_US_EAST4",
        "time_zone_offset": "-5",
        "config": {"host": host, "port": 5432, "password": "hunter2"}
    })
}

#[tokio::test]
async fn test_destination_keeps_secrets_across_read() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/destinations"))
        .and(body_partial_json(json!({"config": {"password": "hunter2"}})))
        .respond_with(ok(remote_destination("db.example.com")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/destinations/destination_id"))
        .respond_with(ok(remote_destination("db.example.com")))
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let created = tester
        .create("fivetran_destination", planned_destination("db.example.com"))
        .await
        .unwrap();
    assert_eq!(created["config"]["password"], "hunter2");

    let read = tester.read("fivetran_destination", created.clone()).await.unwrap();
    assert_eq!(read, created);
}

#[tokio::test]
async fn test_destination_update_sends_only_changed_keys() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/destinations/destination_id"))
        .and(body_json(json!({"config": {"host": "replica.example.com"}})))
        .respond_with(ok(remote_destination("replica.example.com")))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let mut prior = planned_destination("db.example.com");
    prior["id"] = json!("destination_id");
    let mut planned = planned_destination("replica.example.com");
    planned["id"] = json!("destination_id");

    let state = tester.update("fivetran_destination", prior, planned).await.unwrap();
    assert_eq!(state["config"]["host"], "replica.example.com");
    assert_eq!(state["config"]["password"], "hunter2");
}

#[tokio::test]
async fn test_destination_v0_state_upgrade() {
    let tester = hemmer_provider_fivetran::testing::ProviderTester::new();
    let upgraded = tester
        .upgrade(
            "fivetran_destination",
            0,
            json!({
                "id": "destination_id",
                "last_updated": "2024-01-01T00:00:00Z",
                "config": [{"host": "db.example.com"}]
            }),
        )
        .await
        .unwrap();
    assert_eq!(upgraded["config"], json!({"host": "db.example.com"}));
    assert!(upgraded.get("last_updated").is_none());
}

#[tokio::test]
async fn test_connection_is_created_paused_with_destination_schema() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connections"))
        .and(body_partial_json(json!({
            "group_id": "group_id",
            "service": "postgres",
            "paused": true,
            "config": {"schema": "postgres_main", "host": "source.example.com"}
        })))
        .respond_with(ok(json!({
            "id": "connection_id",
            "group_id": "group_id",
            "service": "postgres",
            "schema": "postgres_main",
            "paused": true,
            "connected_by": "user_id",
            "created_at": "2024-01-01T00:00:00Z",
            "config": {"schema": "postgres_main", "host": "source.example.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester
        .create(
            "fivetran_connection",
            json!({
                "group_id": "group_id",
                "service": "postgres",
                "destination_schema": {"name": "postgres_main"},
                "config": {"host": "source.example.com"}
            }),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], "connection_id");
    assert_eq!(state["destination_schema"]["name"], "postgres_main");
}

#[tokio::test]
async fn test_connection_import_recovers_destination_schema() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections/connection_id"))
        .respond_with(ok(json!({
            "id": "connection_id",
            "group_id": "group_id",
            "service": "google_sheets",
            "schema": "sheets.budget",
            "config": {}
        })))
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester.import("fivetran_connection", "connection_id").await.unwrap();
    assert_eq!(state["destination_schema"]["name"], "sheets");
    assert_eq!(state["destination_schema"]["table"], "budget");
}

#[tokio::test]
async fn test_group_webhook_goes_to_group_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhooks/group/group_id"))
        .and(body_partial_json(json!({"url": "https://example.com/hook", "secret": "s3cret"})))
        .respond_with(ok(json!({
            "id": "webhook_id",
            "type": "group",
            "group_id": "group_id",
            "url": "https://example.com/hook",
            "events": ["sync_start", "sync_end"],
            "active": true,
            "secret": "******"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhooks/account"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester
        .create(
            "fivetran_webhook",
            json!({
                "type": "group",
                "group_id": "group_id",
                "url": "https://example.com/hook",
                "events": ["sync_end", "sync_start"],
                "active": true,
                "secret": "s3cret",
                "run_tests": false
            }),
        )
        .await
        .unwrap();
    assert_eq!(state["secret"], "s3cret");
    assert_eq!(state["events"], json!(["sync_end", "sync_start"]));
}

#[tokio::test]
async fn test_user_update_sends_changed_fields_only() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/users/user_id"))
        .and(body_json(json!({"family_name": "Hopper"})))
        .respond_with(ok(json!({
            "id": "user_id",
            "email": "grace@example.com",
            "given_name": "Grace",
            "family_name": "Hopper",
            "verified": true,
            "invited": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let prior = json!({
        "id": "user_id",
        "email": "grace@example.com",
        "given_name": "Grace",
        "family_name": "Murray"
    });
    let mut planned = prior.clone();
    planned["family_name"] = json!("Hopper");

    let state = tester.update("fivetran_user", prior, planned).await.unwrap();
    assert_eq!(state["family_name"], "Hopper");
    assert_eq!(state["verified"], true);
}

#[tokio::test]
async fn test_connector_membership_upgrade_renames_block() {
    let tester = hemmer_provider_fivetran::testing::ProviderTester::new();
    let upgraded = tester
        .upgrade(
            "fivetran_user_connector_membership",
            -1,
            json!({
                "user_id": "user_id",
                "connector": [{"id": "c1", "role": "Connection Administrator"}]
            }),
        )
        .await
        .unwrap();
    assert!(upgraded.get("connector").is_none());
    assert_eq!(upgraded["connection"][0]["id"], "c1");
}

#[tokio::test]
async fn test_connection_without_config_stays_without_config() {
    let server = MockServer::start().await;
    let remote = json!({
        "id": "connection_id",
        "group_id": "group_id",
        "service": "google_sheets",
        "schema": "sheets",
        "paused": true,
        "config": {"schema": "sheets", "sheet_id": "x", "auth_type": "ServiceAccount"}
    });
    Mock::given(method("POST"))
        .and(path("/connections"))
        .respond_with(ok(remote.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/connections/connection_id"))
        .respond_with(ok(remote))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/connections/connection_id"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let config = json!({
        "group_id": "group_id",
        "service": "google_sheets",
        "destination_schema": {"name": "sheets"}
    });
    let created = tester.apply_create("fivetran_connection", config.clone()).await.unwrap();
    assert!(created["config"].is_null());

    let read = tester.read("fivetran_connection", created.clone()).await.unwrap();
    assert_eq!(read, created);

    let plan = tester
        .plan_update("fivetran_connection", read.clone(), config.clone())
        .await
        .unwrap();
    assert_plan_no_changes(&plan);
    tester.apply_update("fivetran_connection", read, config).await.unwrap();
}

#[tokio::test]
async fn test_destination_without_config_stays_without_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/destinations"))
        .respond_with(ok(remote_destination("db.example.com")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/destinations/destination_id"))
        .respond_with(ok(remote_destination("db.example.com")))
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let config = json!({
        "group_id": "group_id",
        "service": "postgres_warehouse",
        "region": "GCP_US_EAST4",
        "time_zone_offset": "-5"
    });
    let created = tester.apply_create("fivetran_destination", config.clone()).await.unwrap();
    assert!(created["config"].is_null());

    let read = tester.read("fivetran_destination", created.clone()).await.unwrap();
    assert_eq!(read, created);
    let plan = tester.plan_update("fivetran_destination", read, config).await.unwrap();
    assert_plan_no_changes(&plan);
}

#[tokio::test]
async fn test_unpausing_keeps_echoed_daily_sync_time() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/connections/connection_id"))
        .and(body_json(json!({"paused": false})))
        .respond_with(ok(json!({
            "id": "connection_id",
            "group_id": "group_id",
            "service": "postgres",
            "paused": false,
            "sync_frequency": 360,
            "schedule_type": "auto",
            "daily_sync_time": "03:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let config = json!({"connection_id": "connection_id", "paused": false});
    let diagnostics = tester
        .provider()
        .validate_resource_config("fivetran_connection_schedule", config.clone())
        .await
        .unwrap();
    assert_no_errors(&diagnostics);

    let prior = json!({
        "id": "connection_id",
        "connection_id": "connection_id",
        "sync_frequency": 360,
        "schedule_type": "auto",
        "paused": true,
        "daily_sync_time": "03:00"
    });
    let state = tester
        .apply_update("fivetran_connection_schedule", prior, config)
        .await
        .unwrap();
    assert_eq!(state["paused"], false);
    assert_eq!(state["daily_sync_time"], "03:00");
}

#[tokio::test]
async fn test_daily_sync_time_with_other_frequency_is_still_rejected() {
    let server = MockServer::start().await;
    let tester = tester(&server).await;
    let prior = json!({
        "id": "connection_id",
        "connection_id": "connection_id",
        "sync_frequency": 1440,
        "daily_sync_time": "03:00"
    });
    let err = tester
        .update(
            "fivetran_connection_schedule",
            prior,
            json!({
                "id": "connection_id",
                "connection_id": "connection_id",
                "sync_frequency": 60,
                "daily_sync_time": "04:00"
            }),
        )
        .await
        .unwrap_err();
    assert_diagnostic_contains(&err.into_diagnostics(), "sync_frequency is 1440");
}
