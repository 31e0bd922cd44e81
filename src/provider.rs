//! The Fivetran provider: dispatches protocol calls to resource and data
//! source handlers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::FivetranClient;
use crate::config::ProviderConfig;
use crate::core::SchemaLocks;
use crate::data_sources::{self, DataSourceHandler};
use crate::error::ProviderError;
use crate::plan;
use crate::resources::{self, ProviderContext, ResourceHandler};
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// Hemmer provider for the Fivetran API.
pub struct FivetranProvider {
    resources: BTreeMap<&'static str, Arc<dyn ResourceHandler>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSourceHandler>>,
    context: RwLock<Option<Arc<ProviderContext>>>,
    retry_delay: Option<Duration>,
}

impl Default for FivetranProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FivetranProvider {
    pub fn new() -> Self {
        Self {
            resources: resources::all().into_iter().map(|h| (h.type_name(), h)).collect(),
            data_sources: data_sources::all().into_iter().map(|h| (h.type_name(), h)).collect(),
            context: RwLock::new(None),
            retry_delay: None,
        }
    }

    /// Override the base delay of the schema conflict retry loop.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn ResourceHandler>, ProviderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(
        &self,
        data_source_type: &str,
    ) -> Result<&Arc<dyn DataSourceHandler>, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }

    /// The configured context; every upstream call goes through here.
    async fn context(&self) -> Result<Arc<ProviderContext>, ProviderError> {
        self.context
            .read()
            .await
            .clone()
            .ok_or(ProviderError::NotConfigured)
    }

    fn check(&self, handler: &dyn ResourceHandler, value: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = validation::validate(&handler.schema(), value);
        diagnostics.extend(handler.validate(value));
        diagnostics
    }

    /// Reject an invalid planned state before anything is sent upstream.
    ///
    /// Types are checked on the whole planned state. Resource rules only see
    /// what the user supplied: optional + computed values carried over
    /// unchanged from `prior` came from the API and are left out.
    fn ensure_valid(
        &self,
        handler: &dyn ResourceHandler,
        prior: Option<&Value>,
        planned: &Value,
    ) -> Result<(), ProviderError> {
        let schema = handler.schema();
        let mut diagnostics = validation::validate(&schema, planned);
        let supplied = match prior {
            Some(prior) => without_echoed(&schema, prior, planned),
            None => planned.clone(),
        };
        diagnostics.extend(handler.validate(&supplied));
        if crate::schema::has_errors(&diagnostics) {
            return Err(ProviderError::Invalid(diagnostics));
        }
        Ok(())
    }
}

/// `planned` minus the optional + computed attributes whose value equals
/// the prior state's.
fn without_echoed(schema: &Schema, prior: &Value, planned: &Value) -> Value {
    let mut supplied = planned.clone();
    if let Some(obj) = supplied.as_object_mut() {
        obj.retain(|name, value| match schema.attribute(name) {
            Some(attr) if attr.flags.optional && attr.flags.computed => {
                prior.get(name) != Some(value)
            }
            _ => true,
        });
    }
    supplied
}

#[async_trait::async_trait]
impl ProviderService for FivetranProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        let schema = self
            .resources
            .iter()
            .fold(schema, |schema, (name, h)| schema.with_resource(*name, h.schema()));
        self.data_sources
            .iter()
            .fold(schema, |schema, (name, h)| schema.with_data_source(*name, h.schema()))
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validation::validate(&ProviderConfig::schema(), &config);
        if diagnostics.is_empty() {
            if let Err(e) = ProviderConfig::from_value(config) {
                diagnostics.extend(e.into_diagnostics());
            }
        }
        Ok(diagnostics)
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = ProviderConfig::from_value(config)?;
        debug!(config = ?config, "Configuring provider");

        let client = FivetranClient::with_base_url(
            config.api_key.clone(),
            config.api_secret.clone(),
            config.api_url.clone(),
        )
        .map_err(|e| ProviderError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        let context = ProviderContext {
            client,
            schema_locks: SchemaLocks::new(),
            retry: config.retry_policy(self.retry_delay),
        };
        *self.context.write().await = Some(Arc::new(context));

        info!(api_url = %config.api_url, "Provider configured");
        Ok(vec![])
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.context.write().await.take();
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let handler = self.resource(resource_type)?;
        Ok(self.check(handler.as_ref(), &config))
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.resource(resource_type)?;
        let current = handler.schema().version as i64;
        if version > current {
            return Err(ProviderError::Validation(format!(
                "state of {} was written by schema version {}, newer than this provider's {}",
                resource_type, version, current
            )));
        }
        if version == current {
            return Ok(state);
        }
        debug!(resource_type, from = version, to = current, "Upgrading state");
        handler.upgrade_state(version, state)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let handler = self.resource(resource_type)?;
        let prior = prior_state.filter(|v| !v.is_null());
        Ok(plan::plan(&handler.schema(), prior.as_ref(), &proposed_state))
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.resource(resource_type)?;
        let ctx = self.context().await?;
        self.ensure_valid(handler.as_ref(), None, &planned_state)?;
        handler.create(&ctx, planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.resource(resource_type)?;
        let ctx = self.context().await?;
        Ok(handler.read(&ctx, current_state).await?.unwrap_or(Value::Null))
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.resource(resource_type)?;
        let ctx = self.context().await?;
        self.ensure_valid(handler.as_ref(), Some(&prior_state), &planned_state)?;
        handler.update(&ctx, prior_state, planned_state).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let handler = self.resource(resource_type)?;
        let ctx = self.context().await?;
        handler.delete(&ctx, current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let handler = self.resource(resource_type)?;
        let ctx = self.context().await?;
        let state = handler.import(&ctx, id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let handler = self.data_source(data_source_type)?;
        Ok(validation::validate(&handler.schema(), &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.data_source(data_source_type)?;
        let ctx = self.context().await?;
        handler.read(&ctx, config).await
    }
}
