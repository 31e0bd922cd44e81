//! `fivetran_connection_table_config`: table enable flags and sync modes
//! inside one schema of a connection.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::schema_config::{load_or_reload, policy_of, report_exceptions, to_set};
use super::{found, split_id, ProviderContext, ResourceHandler};
use crate::client::models::{SchemaConfig, SchemaDetails, SchemaPatch, TablePatch};
use crate::core::reconcile::{reconcile, select_exceptions, ExceptionKind};
use crate::core::retry::retry_on_conflict;
use crate::core::values::decode;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::mutually_exclusive;

const SYNC_MODES: [&str; 3] = ["SOFT_DELETE", "HISTORY", "LIVE"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct TableConfigState {
    #[serde(default)]
    id: Option<String>,
    connection_id: String,
    schema: String,
    #[serde(default)]
    disabled_tables: Option<Vec<String>>,
    #[serde(default)]
    enabled_tables: Option<Vec<String>>,
    #[serde(default)]
    sync_mode: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeouts: Option<Value>,
}

impl TableConfigState {
    fn import_id(&self) -> String {
        format!("{}:{}", self.connection_id, self.schema)
    }

    fn exceptions(&self, config: &SchemaConfig) -> Result<BTreeSet<String>, ProviderError> {
        select_exceptions(
            policy_of(config)?,
            "tables",
            to_set(&self.disabled_tables).as_ref(),
            to_set(&self.enabled_tables).as_ref(),
        )
    }

    fn observed(
        local: &TableConfigState,
        config: &SchemaConfig,
        schema: &SchemaDetails,
    ) -> Result<Self, ProviderError> {
        let policy = policy_of(config)?;
        let missing: BTreeSet<String> = local
            .exceptions(config)
            .unwrap_or_default()
            .into_iter()
            .filter(|name| !schema.tables.contains_key(name))
            .collect();

        let (disabled_tables, enabled_tables) = report_exceptions(
            policy,
            schema.tables.iter().map(|(name, t)| (name, t.enabled)),
            &missing,
            local.disabled_tables.as_deref(),
            local.enabled_tables.as_deref(),
        );

        // Only the tables the user pinned are reported.
        let sync_mode = local.sync_mode.as_ref().map(|modes| {
            modes
                .iter()
                .map(|(table, mode)| {
                    let upstream = schema.tables.get(table).and_then(|t| t.sync_mode.clone());
                    (table.clone(), upstream.unwrap_or_else(|| mode.clone()))
                })
                .collect()
        });

        Ok(Self {
            id: Some(local.import_id()),
            connection_id: local.connection_id.clone(),
            schema: local.schema.clone(),
            disabled_tables,
            enabled_tables,
            sync_mode,
            timeouts: local.timeouts.clone(),
        })
    }
}

fn schema_details<'a>(
    config: &'a SchemaConfig,
    desired: &TableConfigState,
) -> Result<&'a SchemaDetails, ProviderError> {
    config.schemas.get(&desired.schema).ok_or_else(|| {
        ProviderError::Validation(format!(
            "schema '{}' does not exist in the source of connection {}",
            desired.schema, desired.connection_id
        ))
    })
}

/// Per-table changes needed to reach `desired`.
fn tables_patch(
    desired: &TableConfigState,
    config: &SchemaConfig,
) -> Result<BTreeMap<String, TablePatch>, ProviderError> {
    let schema = schema_details(config, desired)?;
    let exceptions = desired.exceptions(config)?;

    let mut patch: BTreeMap<String, TablePatch> = reconcile(
        policy_of(config)?,
        &exceptions,
        schema.tables.iter().map(|(name, t)| (name, t.enabled)),
    )
    .into_iter()
    .map(|(name, enabled)| {
        (
            name,
            TablePatch {
                enabled: Some(enabled),
                ..Default::default()
            },
        )
    })
    .collect();

    for (table, mode) in desired.sync_mode.iter().flatten() {
        let upstream = schema.tables.get(table).ok_or_else(|| {
            ProviderError::Validation(format!(
                "sync_mode names table '{}' which does not exist in schema '{}'",
                table, desired.schema
            ))
        })?;
        if upstream.sync_mode.as_deref() != Some(mode.as_str()) {
            patch.entry(table.clone()).or_default().sync_mode = Some(mode.clone());
        }
    }
    Ok(patch)
}

pub struct TableConfigResource;

impl TableConfigResource {
    async fn apply(
        &self,
        ctx: &ProviderContext,
        desired: TableConfigState,
    ) -> Result<Value, ProviderError> {
        let connection_id = desired.connection_id.clone();
        let _guard = ctx.schema_locks.lock(&connection_id).await;

        let mut config = load_or_reload(ctx, &connection_id).await?;
        let tables = tables_patch(&desired, &config)?;

        if tables.is_empty() {
            debug!(
                connection_id = %connection_id,
                schema = %desired.schema,
                "Tables already up to date"
            );
        } else {
            info!(
                connection_id = %connection_id,
                schema = %desired.schema,
                tables = tables.len(),
                "Patching table config"
            );
            let patch = SchemaPatch {
                enabled: None,
                tables,
            };
            retry_on_conflict(&ctx.retry, "update table config", || {
                ctx.client.update_schema(&connection_id, &desired.schema, &patch)
            })
            .await?;
            config = ctx.client.get_schema_config(&connection_id).await?;
        }

        let schema = schema_details(&config, &desired)?;
        Ok(serde_json::to_value(TableConfigState::observed(&desired, &config, schema)?)?)
    }
}

#[async_trait::async_trait]
impl ResourceHandler for TableConfigResource {
    fn type_name(&self) -> &'static str {
        "fivetran_connection_table_config"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description(
                "Tables of one schema of a connection. The connection's schema change handling \
                 decides whether tables are listed as disabled or as enabled.",
            )
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("connection_id", Attribute::required_string().with_force_new())
            .with_attribute("schema", Attribute::required_string().with_force_new())
            .with_attribute("disabled_tables", Attribute::optional_string_set())
            .with_attribute("enabled_tables", Attribute::optional_string_set())
            .with_attribute(
                "sync_mode",
                Attribute::optional_string_map()
                    .with_description("Table name to SOFT_DELETE, HISTORY or LIVE"),
            )
            .with_timeouts()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> =
            mutually_exclusive(config, &["disabled_tables", "enabled_tables"])
                .into_iter()
                .collect();

        if let Some(modes) = config.get("sync_mode").and_then(Value::as_object) {
            for (table, mode) in modes {
                let valid = mode.as_str().is_some_and(|m| SYNC_MODES.contains(&m));
                if !valid {
                    diagnostics.push(
                        Diagnostic::error("Invalid value for 'sync_mode'")
                            .with_detail(format!(
                                "Table '{}': expected one of {}, got {}",
                                table,
                                SYNC_MODES.join(", "),
                                mode
                            ))
                            .with_attribute("sync_mode"),
                    );
                }
            }
        }
        diagnostics
    }

    async fn create(&self, ctx: &ProviderContext, planned: Value) -> Result<Value, ProviderError> {
        self.apply(ctx, decode(planned)?).await
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let state: TableConfigState = decode(state)?;
        let Some(config) = found(ctx.client.get_schema_config(&state.connection_id).await)? else {
            return Ok(None);
        };
        match config.schemas.get(&state.schema) {
            Some(schema) => {
                let observed = TableConfigState::observed(&state, &config, schema)?;
                Ok(Some(serde_json::to_value(observed)?))
            }
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.apply(ctx, decode(planned)?).await
    }

    async fn delete(&self, _ctx: &ProviderContext, state: Value) -> Result<(), ProviderError> {
        let state: TableConfigState = decode(state)?;
        debug!(id = %state.import_id(), "Forgetting table config; upstream is left as is");
        Ok(())
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError> {
        let parts = split_id(id, 2, "<connection_id>:<schema>")?;
        let config = ctx.client.get_schema_config(&parts[0]).await?;
        let mut local = TableConfigState {
            connection_id: parts[0].clone(),
            schema: parts[1].clone(),
            ..Default::default()
        };
        let schema = schema_details(&config, &local)?;

        let modes: BTreeMap<String, String> = schema
            .tables
            .iter()
            .filter_map(|(name, t)| t.sync_mode.clone().map(|m| (name.clone(), m)))
            .collect();
        local.sync_mode = (!modes.is_empty()).then_some(modes);
        match policy_of(&config)?.exception_kind() {
            ExceptionKind::Disabled => local.disabled_tables = Some(Vec::new()),
            ExceptionKind::Enabled => local.enabled_tables = Some(Vec::new()),
        }

        Ok(serde_json::to_value(TableConfigState::observed(&local, &config, schema)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upstream() -> SchemaConfig {
        serde_json::from_value(json!({
            "schema_change_handling": "BLOCK_ALL",
            "schemas": {
                "public": {
                    "enabled": true,
                    "tables": {
                        "orders": {"enabled": true, "sync_mode": "SOFT_DELETE"},
                        "users": {"enabled": false, "sync_mode": "SOFT_DELETE"},
                        "events": {"enabled": true}
                    }
                }
            }
        }))
        .unwrap()
    }

    fn desired(enabled: &[&str], modes: &[(&str, &str)]) -> TableConfigState {
        TableConfigState {
            connection_id: "connection_id".into(),
            schema: "public".into(),
            enabled_tables: Some(enabled.iter().map(|s| s.to_string()).collect()),
            sync_mode: (!modes.is_empty())
                .then(|| modes.iter().map(|(t, m)| (t.to_string(), m.to_string())).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_patch_reconciles_and_sets_sync_mode() {
        let wanted = desired(&["orders", "users"], &[("orders", "HISTORY")]);
        let patch = tables_patch(&wanted, &upstream()).unwrap();
        let body = serde_json::to_value(SchemaPatch {
            enabled: None,
            tables: patch,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"tables": {
                "events": {"enabled": false},
                "orders": {"sync_mode": "HISTORY"},
                "users": {"enabled": true}
            }})
        );
    }

    #[test]
    fn test_matching_upstream_is_empty_patch() {
        let wanted = desired(&["orders", "events"], &[("users", "SOFT_DELETE")]);
        let patch = tables_patch(&wanted, &upstream()).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_disabled_set_rejected_under_block_all() {
        let mut state = desired(&[], &[]);
        state.enabled_tables = None;
        state.disabled_tables = Some(vec!["orders".into()]);
        assert!(tables_patch(&state, &upstream()).is_err());
    }

    #[test]
    fn test_unknown_schema_is_an_error() {
        let mut state = desired(&["orders"], &[]);
        state.schema = "missing".into();
        assert!(tables_patch(&state, &upstream()).is_err());
    }

    #[test]
    fn test_observed_reports_only_pinned_sync_modes() {
        let config = upstream();
        let local = desired(&["orders", "events"], &[("orders", "SOFT_DELETE")]);
        let state = TableConfigState::observed(&local, &config, &config.schemas["public"]).unwrap();
        assert_eq!(state.id.as_deref(), Some("connection_id:public"));
        assert_eq!(state.enabled_tables, Some(vec!["orders".to_string(), "events".to_string()]));
        assert_eq!(state.sync_mode.unwrap().len(), 1);
    }

    #[test]
    fn test_validate_sync_mode_values() {
        let resource = TableConfigResource;
        assert!(resource.validate(&json!({"sync_mode": {"orders": "LIVE"}})).is_empty());
        assert_eq!(resource.validate(&json!({"sync_mode": {"orders": "SOMETIMES"}})).len(), 1);
    }
}
