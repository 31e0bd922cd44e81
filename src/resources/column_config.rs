//! `fivetran_connection_column_config`: column enable and hashing flags of
//! one table.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::schema_config::{load_or_reload, policy_of, report_exceptions, to_set};
use super::{found, split_id, ProviderContext, ResourceHandler};
use crate::client::models::{ColumnPatch, SchemaConfig, TableDetails, TablePatch};
use crate::core::reconcile::{reconcile, select_exceptions, stabilize_order, ExceptionKind};
use crate::core::retry::retry_on_conflict;
use crate::core::values::decode;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::mutually_exclusive;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ColumnConfigState {
    #[serde(default)]
    id: Option<String>,
    connection_id: String,
    schema: String,
    table: String,
    #[serde(default)]
    disabled_columns: Option<Vec<String>>,
    #[serde(default)]
    enabled_columns: Option<Vec<String>>,
    #[serde(default)]
    hashed_columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeouts: Option<Value>,
}

impl ColumnConfigState {
    fn import_id(&self) -> String {
        format!("{}:{}:{}", self.connection_id, self.schema, self.table)
    }

    fn exceptions(&self, config: &SchemaConfig) -> Result<BTreeSet<String>, ProviderError> {
        select_exceptions(
            policy_of(config)?,
            "columns",
            to_set(&self.disabled_columns).as_ref(),
            to_set(&self.enabled_columns).as_ref(),
        )
    }

    fn observed(
        local: &ColumnConfigState,
        config: &SchemaConfig,
        table: &TableDetails,
    ) -> Result<Self, ProviderError> {
        let missing: BTreeSet<String> = local
            .exceptions(config)
            .unwrap_or_default()
            .into_iter()
            .filter(|name| !table.columns.contains_key(name))
            .collect();

        let (disabled_columns, enabled_columns) = report_exceptions(
            policy_of(config)?,
            table.columns.iter().map(|(name, c)| (name, c.enabled)),
            &missing,
            local.disabled_columns.as_deref(),
            local.enabled_columns.as_deref(),
        );

        let hashed_columns = local.hashed_columns.as_deref().map(|prior| {
            let hashed: BTreeSet<String> = table
                .columns
                .iter()
                .filter(|(_, c)| c.hashed == Some(true))
                .map(|(name, _)| name.clone())
                .collect();
            stabilize_order(prior, &hashed)
        });

        Ok(Self {
            id: Some(local.import_id()),
            connection_id: local.connection_id.clone(),
            schema: local.schema.clone(),
            table: local.table.clone(),
            disabled_columns,
            enabled_columns,
            hashed_columns,
            timeouts: local.timeouts.clone(),
        })
    }
}

fn table_details<'a>(
    config: &'a SchemaConfig,
    desired: &ColumnConfigState,
) -> Result<&'a TableDetails, ProviderError> {
    config
        .schemas
        .get(&desired.schema)
        .and_then(|s| s.tables.get(&desired.table))
        .ok_or_else(|| {
            ProviderError::Validation(format!(
                "table '{}.{}' does not exist in the source of connection {}",
                desired.schema, desired.table, desired.connection_id
            ))
        })
}

/// Per-column changes needed to reach `desired`. Hashing is only touched
/// when `hashed_columns` is set.
fn columns_patch(
    desired: &ColumnConfigState,
    config: &SchemaConfig,
) -> Result<BTreeMap<String, ColumnPatch>, ProviderError> {
    let table = table_details(config, desired)?;
    let exceptions = desired.exceptions(config)?;

    let mut patch: BTreeMap<String, ColumnPatch> = reconcile(
        policy_of(config)?,
        &exceptions,
        table.columns.iter().map(|(name, c)| (name, c.enabled)),
    )
    .into_iter()
    .map(|(name, enabled)| {
        (
            name,
            ColumnPatch {
                enabled: Some(enabled),
                hashed: None,
            },
        )
    })
    .collect();

    if let Some(hashed) = to_set(&desired.hashed_columns) {
        if let Some(unknown) = hashed.iter().find(|name| !table.columns.contains_key(*name)) {
            return Err(ProviderError::Validation(format!(
                "hashed_columns names column '{}' which does not exist in table '{}.{}'",
                unknown, desired.schema, desired.table
            )));
        }
        for (name, column) in &table.columns {
            let want = hashed.contains(name);
            if column.hashed.unwrap_or(false) != want {
                patch.entry(name.clone()).or_default().hashed = Some(want);
            }
        }
    }
    Ok(patch)
}

pub struct ColumnConfigResource;

impl ColumnConfigResource {
    async fn apply(
        &self,
        ctx: &ProviderContext,
        desired: ColumnConfigState,
    ) -> Result<Value, ProviderError> {
        let connection_id = desired.connection_id.clone();
        let _guard = ctx.schema_locks.lock(&connection_id).await;

        let mut config = load_or_reload(ctx, &connection_id).await?;
        let columns = columns_patch(&desired, &config)?;

        if columns.is_empty() {
            debug!(id = %desired.import_id(), "Columns already up to date");
        } else {
            info!(id = %desired.import_id(), columns = columns.len(), "Patching column config");
            let patch = TablePatch {
                columns,
                ..Default::default()
            };
            retry_on_conflict(&ctx.retry, "update column config", || {
                ctx.client
                    .update_table(&connection_id, &desired.schema, &desired.table, &patch)
            })
            .await?;
            config = ctx.client.get_schema_config(&connection_id).await?;
        }

        let table = table_details(&config, &desired)?;
        Ok(serde_json::to_value(ColumnConfigState::observed(&desired, &config, table)?)?)
    }
}

#[async_trait::async_trait]
impl ResourceHandler for ColumnConfigResource {
    fn type_name(&self) -> &'static str {
        "fivetran_connection_column_config"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Columns of one table of a connection")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("connection_id", Attribute::required_string().with_force_new())
            .with_attribute("schema", Attribute::required_string().with_force_new())
            .with_attribute("table", Attribute::required_string().with_force_new())
            .with_attribute("disabled_columns", Attribute::optional_string_set())
            .with_attribute("enabled_columns", Attribute::optional_string_set())
            .with_attribute(
                "hashed_columns",
                Attribute::optional_string_set()
                    .with_description("Columns whose values are hashed before loading"),
            )
            .with_timeouts()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        mutually_exclusive(config, &["disabled_columns", "enabled_columns"])
            .into_iter()
            .collect()
    }

    async fn create(&self, ctx: &ProviderContext, planned: Value) -> Result<Value, ProviderError> {
        self.apply(ctx, decode(planned)?).await
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let state: ColumnConfigState = decode(state)?;
        let Some(config) = found(ctx.client.get_schema_config(&state.connection_id).await)? else {
            return Ok(None);
        };
        match table_details(&config, &state) {
            Ok(table) => {
                let observed = ColumnConfigState::observed(&state, &config, table)?;
                Ok(Some(serde_json::to_value(observed)?))
            }
            Err(_) => Ok(None),
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
        let state: ColumnConfigState = decode(state)?;
        debug!(id = %state.import_id(), "Forgetting column config; upstream is left as is");
        Ok(())
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError> {
        let parts = split_id(id, 3, "<connection_id>:<schema>:<table>")?;
        let config = ctx.client.get_schema_config(&parts[0]).await?;
        let mut local = ColumnConfigState {
            connection_id: parts[0].clone(),
            schema: parts[1].clone(),
            table: parts[2].clone(),
            hashed_columns: Some(Vec::new()),
            ..Default::default()
        };
        match policy_of(&config)?.exception_kind() {
            ExceptionKind::Disabled => local.disabled_columns = Some(Vec::new()),
            ExceptionKind::Enabled => local.enabled_columns = Some(Vec::new()),
        }
        let table = table_details(&config, &local)?;
        Ok(serde_json::to_value(ColumnConfigState::observed(&local, &config, table)?)?)
    }
}
