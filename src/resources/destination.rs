//! Destination resource. The API redacts secrets on read, so state keeps
//! the configured values.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{found, ignore_not_found, ProviderContext, ResourceHandler};
use crate::client::models::{Destination, DestinationRequest};
use crate::core::values::{changed, decode, is_empty_object, merge_remote, object_diff};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::validation::one_of;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct DestinationState {
    #[serde(default)]
    id: Option<String>,
    group_id: String,
    service: String,
    #[serde(default)]
    region: Option<String>,
    time_zone_offset: String,
    #[serde(default)]
    config: Value,
    #[serde(default)]
    trust_certificates: Option<bool>,
    #[serde(default)]
    trust_fingerprints: Option<bool>,
    #[serde(default)]
    run_setup_tests: Option<bool>,
    #[serde(default)]
    daylight_saving_time_enabled: Option<bool>,
    #[serde(default)]
    hybrid_deployment_agent_id: Option<String>,
    #[serde(default)]
    networking_method: Option<String>,
    #[serde(default)]
    setup_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeouts: Option<Value>,
}

impl DestinationState {
    fn id(&self) -> Result<&str, ProviderError> {
        self.id
            .as_deref()
            .ok_or_else(|| ProviderError::Validation("destination state has no id".to_string()))
    }

    /// State after a call: upstream values, with write-only flags and
    /// redacted secrets taken from `local`.
    fn from_api(remote: Destination, local: Option<&DestinationState>) -> Self {
        let config = match local {
            Some(local) if is_empty_object(&local.config) => local.config.clone(),
            Some(local) => merge_remote(&local.config, &remote.config),
            None => remote.config.clone(),
        };
        Self {
            id: Some(remote.id),
            group_id: remote.group_id,
            service: remote.service,
            region: remote.region,
            time_zone_offset: remote.time_zone_offset.unwrap_or_default(),
            config,
            trust_certificates: local.and_then(|l| l.trust_certificates),
            trust_fingerprints: local.and_then(|l| l.trust_fingerprints),
            run_setup_tests: local.and_then(|l| l.run_setup_tests).or(Some(false)),
            daylight_saving_time_enabled: remote.daylight_saving_time_enabled,
            hybrid_deployment_agent_id: remote.hybrid_deployment_agent_id,
            networking_method: remote.networking_method,
            setup_status: remote.setup_status,
            timeouts: local.and_then(|l| l.timeouts.clone()),
        }
    }
}

fn create_request(planned: &DestinationState) -> DestinationRequest {
    DestinationRequest {
        group_id: Some(planned.group_id.clone()),
        service: Some(planned.service.clone()),
        region: planned.region.clone(),
        time_zone_offset: Some(planned.time_zone_offset.clone()),
        config: Some(planned.config.clone()).filter(|c| !is_empty_object(c)),
        trust_certificates: planned.trust_certificates,
        trust_fingerprints: planned.trust_fingerprints,
        run_setup_tests: planned.run_setup_tests,
        daylight_saving_time_enabled: planned.daylight_saving_time_enabled,
        hybrid_deployment_agent_id: planned.hybrid_deployment_agent_id.clone(),
        networking_method: planned.networking_method.clone(),
    }
}

fn update_request(prior: &DestinationState, planned: &DestinationState) -> DestinationRequest {
    DestinationRequest {
        region: changed(&prior.region, &planned.region).flatten(),
        time_zone_offset: changed(&prior.time_zone_offset, &planned.time_zone_offset),
        config: object_diff(&prior.config, &planned.config),
        trust_certificates: changed(&prior.trust_certificates, &planned.trust_certificates)
            .flatten(),
        trust_fingerprints: changed(&prior.trust_fingerprints, &planned.trust_fingerprints)
            .flatten(),
        run_setup_tests: changed(&prior.run_setup_tests, &planned.run_setup_tests).flatten(),
        daylight_saving_time_enabled: changed(
            &prior.daylight_saving_time_enabled,
            &planned.daylight_saving_time_enabled,
        )
        .flatten(),
        hybrid_deployment_agent_id: changed(
            &prior.hybrid_deployment_agent_id,
            &planned.hybrid_deployment_agent_id,
        )
        .flatten(),
        networking_method: changed(&prior.networking_method, &planned.networking_method).flatten(),
        ..Default::default()
    }
}

/// `fivetran_destination`: the warehouse a group loads into.
pub struct DestinationResource;

#[async_trait::async_trait]
impl ResourceHandler for DestinationResource {
    fn type_name(&self) -> &'static str {
        "fivetran_destination"
    }

    fn schema(&self) -> Schema {
        Schema::new(1)
            .with_description("The destination of a Fivetran group")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("group_id", Attribute::required_string().with_force_new())
            .with_attribute(
                "service",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Destination type, e.g. postgres_warehouse or snowflake"),
            )
            .with_attribute("region", Attribute::optional_computed_string())
            .with_attribute(
                "time_zone_offset",
                Attribute::required_string().with_description("Offset from UTC, e.g. -5 or +3"),
            )
            .with_attribute(
                "config",
                Attribute::optional_dynamic()
                    .sensitive()
                    .with_description("Service-specific settings; secrets are never read back"),
            )
            .with_attribute("trust_certificates", Attribute::optional_bool())
            .with_attribute("trust_fingerprints", Attribute::optional_bool())
            .with_attribute(
                "run_setup_tests",
                Attribute::optional_bool().with_default(json!(false)),
            )
            .with_attribute("daylight_saving_time_enabled", Attribute::optional_computed_bool())
            .with_attribute("hybrid_deployment_agent_id", Attribute::optional_string())
            .with_attribute("networking_method", Attribute::optional_computed_string())
            .with_attribute("setup_status", Attribute::computed_string())
            .with_timeouts()
    }

    fn validate(&self, config: &Value) -> Vec<crate::schema::Diagnostic> {
        one_of(config, "networking_method", &["Directly", "SshTunnel", "ProxyAgent", "PrivateLink"])
            .into_iter()
            .collect()
    }

    async fn create(&self, ctx: &ProviderContext, planned: Value) -> Result<Value, ProviderError> {
        let planned: DestinationState = decode(planned)?;
        let destination = ctx.client.create_destination(&create_request(&planned)).await?;
        Ok(serde_json::to_value(DestinationState::from_api(destination, Some(&planned)))?)
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let state: DestinationState = decode(state)?;
        match found(ctx.client.get_destination(state.id()?).await)? {
            Some(destination) => Ok(Some(serde_json::to_value(DestinationState::from_api(
                destination,
                Some(&state),
            ))?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior: DestinationState = decode(prior)?;
        let planned: DestinationState = decode(planned)?;

        let request = update_request(&prior, &planned);
        if request == DestinationRequest::default() {
            let mut state = prior;
            state.timeouts = planned.timeouts;
            return Ok(serde_json::to_value(state)?);
        }
        let destination = ctx.client.update_destination(prior.id()?, &request).await?;
        Ok(serde_json::to_value(DestinationState::from_api(destination, Some(&planned)))?)
    }

    async fn delete(&self, ctx: &ProviderContext, state: Value) -> Result<(), ProviderError> {
        let state: DestinationState = decode(state)?;
        ignore_not_found(ctx.client.delete_destination(state.id()?).await)
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError> {
        let destination = ctx.client.get_destination(id).await?;
        Ok(serde_json::to_value(DestinationState::from_api(destination, None))?)
    }

    fn upgrade_state(&self, version: i64, state: Value) -> Result<Value, ProviderError> {
        match version {
            0 => Ok(upgrade_v0(state)),
            1 => Ok(state),
            other => Err(ProviderError::Validation(format!(
                "unknown fivetran_destination state version {}",
                other
            ))),
        }
    }
}

/// v0 stored `config` as a single-element list and kept a local
/// `last_updated` timestamp.
fn upgrade_v0(mut state: Value) -> Value {
    if let Some(obj) = state.as_object_mut() {
        obj.remove("last_updated");
        if let Some(Value::Array(items)) = obj.get("config") {
            let config = items.first().cloned().unwrap_or(Value::Null);
            obj.insert("config".to_string(), config);
        }
        obj.entry("run_setup_tests").or_insert(json!(false));
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> Destination {
        serde_json::from_value(json!({
            "id": "destination_id",
            "group_id": "group_id",
            "service": "postgres_rds_warehouse",
            "region": "GCP_US_EAST4",
            "time_zone_offset": "0",
            "setup_status": "connected",
            "config": {
                "host": "db.example.com",
                "port": 5432,
                "password": "******",
                "connection_type": "Directly"
            }
        }))
        .unwrap()
    }

    fn planned() -> DestinationState {
        decode(json!({
            "group_id": "group_id",
            "service": "postgres_rds_warehouse",
            "time_zone_offset": "0",
            "run_setup_tests": false,
            "config": {"host": "db.example.com", "port": 5432, "password": "hunter2"}
        }))
        .unwrap()
    }

    #[test]
    fn test_redacted_password_keeps_plaintext() {
        let state = DestinationState::from_api(remote(), Some(&planned()));
        assert_eq!(state.config["password"], "hunter2");
        assert!(state.config.get("connection_type").is_none());
        assert_eq!(state.setup_status.as_deref(), Some("connected"));
    }

    #[test]
    fn test_import_takes_remote_config() {
        let state = DestinationState::from_api(remote(), None);
        assert_eq!(state.config["password"], "******");
        assert_eq!(state.config["connection_type"], "Directly");
    }

    #[test]
    fn test_update_sends_only_changed_config_keys() {
        let prior = DestinationState::from_api(remote(), Some(&planned()));
        let mut next = prior.clone();
        next.config["port"] = json!(5433);

        let request = update_request(&prior, &next);
        assert_eq!(request.config, Some(json!({"port": 5433})));
        assert!(request.time_zone_offset.is_none());
        assert!(update_request(&prior, &prior) == DestinationRequest::default());
    }

    #[test]
    fn test_upgrade_v0() {
        let v0 = json!({
            "id": "destination_id",
            "group_id": "group_id",
            "service": "snowflake",
            "time_zone_offset": "0",
            "last_updated": "2023-01-01",
            "config": [{"host": "acct.snowflakecomputing.com"}]
        });
        let v1 = DestinationResource.upgrade_state(0, v0).unwrap();
        assert_eq!(v1["config"], json!({"host": "acct.snowflakecomputing.com"}));
        assert!(v1.get("last_updated").is_none());
        assert_eq!(v1["run_setup_tests"], json!(false));
        assert!(decode::<DestinationState>(v1).is_ok());
    }

    #[test]
    fn test_networking_method_enum() {
        let diagnostics =
            DestinationResource.validate(&json!({"networking_method": "Carrier pigeon"}));
        assert_eq!(diagnostics.len(), 1);
    }
}
