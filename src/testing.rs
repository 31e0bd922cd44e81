//! Test harness that drives [`FivetranProvider`] the way the host does,
//! without a gRPC server in between.
//!
//! ```ignore
//! let server = wiremock::MockServer::start().await;
//! let tester = ProviderTester::connected(&server.uri()).await?;
//! let state = tester.apply_create("fivetran_group", json!({"name": "test_group_name"})).await?;
//! ```

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;

use crate::error::ProviderError;
use crate::provider::FivetranProvider;
use crate::schema::{Diagnostic, DiagnosticSeverity};
use crate::server::ProviderService;
use crate::types::PlanResult;

/// Failure of a harness call.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("{}", render(.0))]
    Diagnostics(Vec<Diagnostic>),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| {
            let mut line = format!("[{:?}] {}", d.severity, d.summary);
            if let Some(detail) = &d.detail {
                line.push_str(&format!(": {}", detail));
            }
            if let Some(attr) = &d.attribute {
                line.push_str(&format!(" (at {})", attr));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn errors_only(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<Diagnostic> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

pub struct ProviderTester {
    provider: FivetranProvider,
}

impl Default for ProviderTester {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderTester {
    /// Unconfigured provider; conflict retries do not sleep.
    pub fn new() -> Self {
        Self {
            provider: FivetranProvider::new().with_retry_delay(Duration::ZERO),
        }
    }

    /// Provider configured against `api_url` with dummy credentials.
    pub async fn connected(api_url: &str) -> Result<Self, TestError> {
        let tester = Self::new();
        tester
            .configure(json!({
                "api_key": "test_key",
                "api_secret": "test_secret",
                "api_url": api_url,
            }))
            .await?;
        Ok(tester)
    }

    pub fn provider(&self) -> &FivetranProvider {
        &self.provider
    }

    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        errors_only(self.provider.configure(config).await?)
    }

    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        errors_only(self.provider.validate_resource_config(resource_type, config).await?)
    }

    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed.clone(), proposed)
            .await
    }

    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior: Value,
        proposed: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior), proposed.clone(), proposed)
            .await
    }

    pub async fn create(
        &self,
        resource_type: &str,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned).await
    }

    /// `Value::Null` when the object is gone upstream.
    pub async fn read(&self, resource_type: &str, state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, state).await
    }

    pub async fn update(
        &self,
        resource_type: &str,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.update(resource_type, prior, planned).await
    }

    pub async fn delete(&self, resource_type: &str, state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, state).await
    }

    /// State of the single resource an import ID resolves to.
    pub async fn import(&self, resource_type: &str, id: &str) -> Result<Value, ProviderError> {
        let mut imported = self.provider.import_resource(resource_type, id).await?;
        imported
            .pop()
            .map(|r| r.state)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    pub async fn upgrade(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.upgrade_resource_state(resource_type, version, state).await
    }

    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read_data_source(data_source_type, config).await
    }

    /// Plan then create, as the host does for a new resource.
    pub async fn apply_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        self.create(resource_type, plan.planned_state).await
    }

    /// Plan then update. Like the host, skips the update call when the
    /// plan is empty.
    pub async fn apply_update(
        &self,
        resource_type: &str,
        prior: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_update(resource_type, prior.clone(), config).await?;
        if !plan.has_changes() {
            return Ok(prior);
        }
        self.update(resource_type, prior, plan.planned_state).await
    }
}

/// Panics unless `diagnostics` carries no error.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(errors.is_empty(), "expected no errors, got: {:?}", errors);
}

/// Panics unless some diagnostic mentions `needle` in its summary or detail.
pub fn assert_diagnostic_contains(diagnostics: &[Diagnostic], needle: &str) {
    let hit = diagnostics
        .iter()
        .any(|d| {
            d.summary.contains(needle) || d.detail.as_deref().is_some_and(|x| x.contains(needle))
        });
    assert!(hit, "no diagnostic mentions '{}': {}", needle, render(diagnostics));
}

/// Number of diagnostics of `severity`.
pub fn count_severity(diagnostics: &[Diagnostic], severity: DiagnosticSeverity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(!plan.has_changes(), "expected no changes, got {:?}", plan.changes);
}

pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(plan.requires_replace, "expected replacement, got {:?}", plan.changes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_validation_errors_surface_as_diagnostics() {
        let tester = ProviderTester::new();
        let err = tester
            .validate_resource_config("fivetran_webhook", json!({"type": "group", "url": "u"}))
            .await
            .unwrap_err();
        match err {
            TestError::Diagnostics(diagnostics) => {
                assert_diagnostic_contains(&diagnostics, "group_id")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_plan_helpers() {
        let tester = ProviderTester::new();
        let prior = json!({"id": "group_id", "name": "a", "created_at": "t"});
        let plan = tester
            .plan_update("fivetran_group", prior.clone(), json!({"name": "a"}))
            .await
            .unwrap();
        assert_plan_no_changes(&plan);

        let plan = tester
            .plan_update(
                "fivetran_destination",
                json!({
                    "id": "d",
                    "group_id": "g",
                    "service": "snowflake",
                    "time_zone_offset": "0"
                }),
                json!({"group_id": "g", "service": "postgres", "time_zone_offset": "0"}),
            )
            .await
            .unwrap();
        assert_plan_replaces(&plan);
    }

    #[test]
    fn test_render_and_count() {
        let diagnostics = vec![
            Diagnostic::error("Failed").with_detail("boom").with_attribute("name"),
            Diagnostic::warning("Reverted"),
        ];
        assert_eq!(count_severity(&diagnostics, DiagnosticSeverity::Warning), 1);
        assert!(render(&diagnostics).contains("Failed: boom (at name)"));
    }
}
