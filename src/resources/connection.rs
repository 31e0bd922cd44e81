//! `fivetran_connection`: a source connection inside a group.
//!
//! New connections are created paused. The destination schema name is
//! write-once upstream, so `destination_schema` forces replacement.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{found, ignore_not_found, ProviderContext, ResourceHandler};
use crate::client::models::{Connection, ConnectionRequest};
use crate::core::values::{changed, decode, is_empty_object, merge_remote, object_diff};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::validation::one_of;

/// Where the connection lands in the destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct DestinationSchema {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    table: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
}

impl DestinationSchema {
    /// Inject into the outgoing config the way the API expects it.
    fn apply(&self, config: &mut Map<String, Value>) {
        if let Some(name) = &self.name {
            config.insert("schema".to_string(), json!(name));
        }
        if let Some(table) = &self.table {
            config.insert("table".to_string(), json!(table));
        }
        if let Some(prefix) = &self.prefix {
            config.insert("schema_prefix".to_string(), json!(prefix));
        }
    }

    /// Recover from an upstream connection (import).
    fn from_remote(remote: &Connection) -> Self {
        let get = |key: &str| remote.config.get(key).and_then(Value::as_str).map(str::to_string);
        let mut schema = Self {
            name: get("schema"),
            table: get("table"),
            prefix: get("schema_prefix"),
        };
        if schema.name.is_none() && schema.prefix.is_none() {
            if let Some(reported) = &remote.schema {
                match reported.split_once('.') {
                    Some((name, table)) => {
                        schema.name = Some(name.to_string());
                        schema.table = Some(table.to_string());
                    }
                    None => schema.name = Some(reported.clone()),
                }
            }
        }
        schema
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ConnectionState {
    #[serde(default)]
    id: Option<String>,
    group_id: String,
    service: String,
    #[serde(default)]
    destination_schema: Option<DestinationSchema>,
    #[serde(default)]
    config: Value,
    #[serde(default)]
    auth: Value,
    #[serde(default)]
    trust_certificates: Option<bool>,
    #[serde(default)]
    trust_fingerprints: Option<bool>,
    #[serde(default)]
    run_setup_tests: Option<bool>,
    #[serde(default)]
    networking_method: Option<String>,
    #[serde(default)]
    hybrid_deployment_agent_id: Option<String>,
    #[serde(default)]
    proxy_agent_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    connected_by: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeouts: Option<Value>,
}

impl ConnectionState {
    fn id(&self) -> Result<&str, ProviderError> {
        self.id
            .as_deref()
            .ok_or_else(|| ProviderError::Validation("connection state has no id".to_string()))
    }

    fn from_api(remote: Connection, local: Option<&ConnectionState>) -> Self {
        let destination_schema = match local {
            Some(local) => local.destination_schema.clone(),
            None => Some(DestinationSchema::from_remote(&remote)),
        };
        // Only an import adopts the upstream config wholesale; a config the
        // user left unset stays unset.
        let config = match local {
            Some(local) if is_empty_object(&local.config) => local.config.clone(),
            Some(local) => merge_remote(&local.config, &remote.config),
            None => strip_destination_keys(remote.config.clone()),
        };

        Self {
            id: Some(remote.id),
            group_id: remote.group_id,
            service: remote.service,
            destination_schema,
            config,
            auth: local.map(|l| l.auth.clone()).unwrap_or(Value::Null),
            trust_certificates: local.and_then(|l| l.trust_certificates),
            trust_fingerprints: local.and_then(|l| l.trust_fingerprints),
            run_setup_tests: local.and_then(|l| l.run_setup_tests).or(Some(false)),
            networking_method: remote.networking_method,
            hybrid_deployment_agent_id: remote.hybrid_deployment_agent_id,
            proxy_agent_id: remote.proxy_agent_id,
            name: remote.schema,
            connected_by: remote.connected_by,
            created_at: remote.created_at,
            timeouts: local.and_then(|l| l.timeouts.clone()),
        }
    }
}

fn strip_destination_keys(mut config: Value) -> Value {
    if let Some(obj) = config.as_object_mut() {
        for key in ["schema", "table", "schema_prefix"] {
            obj.remove(key);
        }
    }
    config
}

fn create_request(planned: &ConnectionState) -> ConnectionRequest {
    let mut config = planned.config.as_object().cloned().unwrap_or_default();
    if let Some(destination_schema) = &planned.destination_schema {
        destination_schema.apply(&mut config);
    }

    ConnectionRequest {
        group_id: Some(planned.group_id.clone()),
        service: Some(planned.service.clone()),
        config: Some(Value::Object(config)),
        auth: Some(planned.auth.clone()).filter(|a| !is_empty_object(a)),
        // Syncing starts only once a schedule resource unpauses it.
        paused: Some(true),
        trust_certificates: planned.trust_certificates,
        trust_fingerprints: planned.trust_fingerprints,
        run_setup_tests: planned.run_setup_tests,
        networking_method: planned.networking_method.clone(),
        hybrid_deployment_agent_id: planned.hybrid_deployment_agent_id.clone(),
        proxy_agent_id: planned.proxy_agent_id.clone(),
        ..Default::default()
    }
}

fn update_request(prior: &ConnectionState, planned: &ConnectionState) -> ConnectionRequest {
    ConnectionRequest {
        config: object_diff(&prior.config, &planned.config),
        auth: object_diff(&prior.auth, &planned.auth),
        trust_certificates: changed(&prior.trust_certificates, &planned.trust_certificates)
            .flatten(),
        trust_fingerprints: changed(&prior.trust_fingerprints, &planned.trust_fingerprints)
            .flatten(),
        run_setup_tests: changed(&prior.run_setup_tests, &planned.run_setup_tests).flatten(),
        networking_method: changed(&prior.networking_method, &planned.networking_method).flatten(),
        hybrid_deployment_agent_id: changed(
            &prior.hybrid_deployment_agent_id,
            &planned.hybrid_deployment_agent_id,
        )
        .flatten(),
        proxy_agent_id: changed(&prior.proxy_agent_id, &planned.proxy_agent_id).flatten(),
        ..Default::default()
    }
}

/// `fivetran_connection`: a source feeding a group's destination.
pub struct ConnectionResource;

#[async_trait::async_trait]
impl ResourceHandler for ConnectionResource {
    fn type_name(&self) -> &'static str {
        "fivetran_connection"
    }

    fn schema(&self) -> Schema {
        Schema::new(1)
            .with_description("A Fivetran connection. New connections are created paused.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("group_id", Attribute::required_string().with_force_new())
            .with_attribute(
                "service",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Source type, e.g. postgres or google_sheets"),
            )
            .with_attribute(
                "destination_schema",
                Attribute::new(
                    AttributeType::object([
                        ("name", AttributeType::String),
                        ("table", AttributeType::String),
                        ("prefix", AttributeType::String),
                    ]),
                    AttributeFlags::optional(),
                )
                .with_force_new()
                .with_description("Schema (and table) the connection writes to"),
            )
            .with_attribute("config", Attribute::optional_dynamic().sensitive())
            .with_attribute("auth", Attribute::optional_dynamic().sensitive())
            .with_attribute("trust_certificates", Attribute::optional_bool())
            .with_attribute("trust_fingerprints", Attribute::optional_bool())
            .with_attribute(
                "run_setup_tests",
                Attribute::optional_bool().with_default(json!(false)),
            )
            .with_attribute("networking_method", Attribute::optional_computed_string())
            .with_attribute("hybrid_deployment_agent_id", Attribute::optional_string())
            .with_attribute("proxy_agent_id", Attribute::optional_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("connected_by", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string())
            .with_timeouts()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let methods = ["Directly", "SshTunnel", "ProxyAgent", "PrivateLink"];
        let mut diagnostics: Vec<Diagnostic> =
            one_of(config, "networking_method", &methods).into_iter().collect();

        if let Some(schema) = config.get("destination_schema").filter(|v| !v.is_null()) {
            let has = |key: &str| schema.get(key).is_some_and(|v| !v.is_null());
            if !has("name") && !has("prefix") {
                diagnostics.push(
                    Diagnostic::error("Invalid destination_schema")
                        .with_detail("Either name or prefix must be set")
                        .with_attribute("destination_schema"),
                );
            }
            if has("name") && has("prefix") {
                diagnostics.push(
                    Diagnostic::error("Invalid destination_schema")
                        .with_detail("name and prefix cannot be set together")
                        .with_attribute("destination_schema.prefix"),
                );
            }
        }
        diagnostics
    }

    async fn create(&self, ctx: &ProviderContext, planned: Value) -> Result<Value, ProviderError> {
        let planned: ConnectionState = decode(planned)?;
        let connection = ctx.client.create_connection(&create_request(&planned)).await?;
        Ok(serde_json::to_value(ConnectionState::from_api(connection, Some(&planned)))?)
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let state: ConnectionState = decode(state)?;
        match found(ctx.client.get_connection(state.id()?).await)? {
            Some(connection) => Ok(Some(serde_json::to_value(ConnectionState::from_api(
                connection,
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
        let prior: ConnectionState = decode(prior)?;
        let planned: ConnectionState = decode(planned)?;

        let request = update_request(&prior, &planned);
        if request.is_empty() {
            let mut state = prior;
            state.timeouts = planned.timeouts;
            return Ok(serde_json::to_value(state)?);
        }
        let connection = ctx.client.update_connection(prior.id()?, &request).await?;
        Ok(serde_json::to_value(ConnectionState::from_api(connection, Some(&planned)))?)
    }

    async fn delete(&self, ctx: &ProviderContext, state: Value) -> Result<(), ProviderError> {
        let state: ConnectionState = decode(state)?;
        ignore_not_found(ctx.client.delete_connection(state.id()?).await)
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError> {
        let connection = ctx.client.get_connection(id).await?;
        Ok(serde_json::to_value(ConnectionState::from_api(connection, None))?)
    }

    fn upgrade_state(&self, version: i64, mut state: Value) -> Result<Value, ProviderError> {
        match version {
            0 => {
                // v0 stored destination_schema as a single-element list.
                if let Some(obj) = state.as_object_mut() {
                    if let Some(Value::Array(items)) = obj.get("destination_schema") {
                        let schema = items.first().cloned().unwrap_or(Value::Null);
                        obj.insert("destination_schema".to_string(), schema);
                    }
                }
                Ok(state)
            }
            1 => Ok(state),
            other => Err(ProviderError::Validation(format!(
                "unknown fivetran_connection state version {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> Connection {
        serde_json::from_value(json!({
            "id": "connection_id",
            "group_id": "group_id",
            "service": "postgres",
            "schema": "pg_source",
            "paused": true,
            "connected_by": "user_id",
            "created_at": "2024-01-01T00:00:00Z",
            "config": {
                "host": "pg.example.com",
                "password": "******",
                "schema_prefix": "pg_source",
                "update_method": "XMIN"
            }
        }))
        .unwrap()
    }

    fn planned() -> ConnectionState {
        decode(json!({
            "group_id": "group_id",
            "service": "postgres",
            "destination_schema": {"prefix": "pg_source"},
            "config": {"host": "pg.example.com", "password": "secret"},
            "run_setup_tests": false
        }))
        .unwrap()
    }

    #[test]
    fn test_create_request_is_paused_with_destination_schema() {
        let body = serde_json::to_value(create_request(&planned())).unwrap();
        assert_eq!(body["paused"], json!(true));
        assert_eq!(body["config"]["schema_prefix"], "pg_source");
        assert_eq!(body["config"]["password"], "secret");
        assert!(body.get("auth").is_none());
    }

    #[test]
    fn test_state_keeps_secrets_and_drops_server_keys() {
        let state = ConnectionState::from_api(remote(), Some(&planned()));
        assert_eq!(state.config, json!({"host": "pg.example.com", "password": "secret"}));
        assert_eq!(state.name.as_deref(), Some("pg_source"));
        assert_eq!(state.destination_schema, planned().destination_schema);
    }

    #[test]
    fn test_import_recovers_destination_schema() {
        let state = ConnectionState::from_api(remote(), None);
        assert_eq!(state.destination_schema.unwrap().prefix.as_deref(), Some("pg_source"));
        assert!(state.config.get("schema_prefix").is_none());
        assert_eq!(state.config["update_method"], "XMIN");
    }

    #[test]
    fn test_no_change_no_request() {
        let state = ConnectionState::from_api(remote(), Some(&planned()));
        assert!(update_request(&state, &state).is_empty());
    }

    #[test]
    fn test_upgrade_v0_destination_schema() {
        let v0 = json!({
            "id": "connection_id",
            "group_id": "group_id",
            "service": "postgres",
            "destination_schema": [{"name": "pg", "table": null, "prefix": null}]
        });
        let v1 = ConnectionResource.upgrade_state(0, v0).unwrap();
        assert_eq!(v1["destination_schema"]["name"], "pg");
        assert!(decode::<ConnectionState>(v1).is_ok());
    }

    #[test]
    fn test_destination_schema_rules() {
        let both = json!({"destination_schema": {"name": "a", "prefix": "b"}});
        assert_eq!(ConnectionResource.validate(&both).len(), 1);
        let neither = json!({"destination_schema": {"table": "t"}});
        assert_eq!(ConnectionResource.validate(&neither).len(), 1);
        let named = json!({"destination_schema": {"name": "a"}});
        assert!(ConnectionResource.validate(&named).is_empty());
    }
}
