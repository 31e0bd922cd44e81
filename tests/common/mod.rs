#![allow(dead_code)]

use hemmer_provider_fivetran::testing::ProviderTester;
use serde_json::{json, Value};
use wiremock::{MockServer, ResponseTemplate};

/// A success envelope around `data`.
pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": "Success",
        "data": data,
    }))
}

pub fn api_error(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "code": code,
        "message": message,
    }))
}

pub fn not_found() -> ResponseTemplate {
    api_error(404, "NotFound", "Object not found")
}

pub async fn tester(server: &MockServer) -> ProviderTester {
    ProviderTester::connected(&server.uri())
        .await
        .expect("provider should configure against the mock server")
}
