//! `fivetran_connection_schema_settings`: schema change handling policy and
//! schema-level enable flags of a connection.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::schema_config::{load_or_reload, policy_of, report_exceptions, to_set};
use super::{found, ProviderContext, ResourceHandler};
use crate::client::models::{SchemaConfig, SchemaConfigPatch, SchemaPatch};
use crate::core::reconcile::{reconcile, select_exceptions};
use crate::core::retry::retry_on_conflict;
use crate::core::values::decode;
use crate::core::SchemaChangeHandling;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::{mutually_exclusive, one_of};

const VALIDATION_LEVELS: [&str; 3] = ["NONE", "TABLES", "COLUMNS"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SchemaSettingsState {
    #[serde(default)]
    id: Option<String>,
    connection_id: String,
    schema_change_handling: String,
    #[serde(default)]
    disabled_schemas: Option<Vec<String>>,
    #[serde(default)]
    enabled_schemas: Option<Vec<String>>,
    #[serde(default)]
    validation_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeouts: Option<Value>,
}

impl SchemaSettingsState {
    fn policy(&self) -> Result<SchemaChangeHandling, ProviderError> {
        self.schema_change_handling.parse()
    }

    fn exceptions(&self) -> Result<BTreeSet<String>, ProviderError> {
        select_exceptions(
            self.policy()?,
            "schemas",
            to_set(&self.disabled_schemas).as_ref(),
            to_set(&self.enabled_schemas).as_ref(),
        )
    }

    fn validates_names(&self) -> bool {
        self.validation_level.as_deref().is_some_and(|level| level != "NONE")
    }

    /// State as observed upstream, shaped after `local`.
    fn observed(local: &SchemaSettingsState, config: &SchemaConfig) -> Result<Self, ProviderError> {
        let policy = policy_of(config)?;
        let declared = local.exceptions().unwrap_or_default();
        let missing: BTreeSet<String> = declared
            .iter()
            .filter(|name| !config.schemas.contains_key(*name))
            .cloned()
            .collect();

        let (disabled_schemas, enabled_schemas) = report_exceptions(
            policy,
            config.schemas.iter().map(|(name, s)| (name, s.enabled)),
            &missing,
            local.disabled_schemas.as_deref(),
            local.enabled_schemas.as_deref(),
        );

        Ok(Self {
            id: Some(local.connection_id.clone()),
            connection_id: local.connection_id.clone(),
            schema_change_handling: policy.to_string(),
            disabled_schemas,
            enabled_schemas,
            validation_level: local.validation_level.clone(),
            timeouts: local.timeouts.clone(),
        })
    }
}

/// The PATCH turning `config` into the desired settings.
fn settings_patch(
    desired: &SchemaSettingsState,
    config: &SchemaConfig,
) -> Result<SchemaConfigPatch, ProviderError> {
    let policy = desired.policy()?;
    let exceptions = desired.exceptions()?;

    if desired.validates_names() {
        if let Some(unknown) = exceptions.iter().find(|name| !config.schemas.contains_key(*name)) {
            return Err(ProviderError::Validation(format!(
                "schema '{}' does not exist in the source of connection {}",
                unknown, desired.connection_id
            )));
        }
    }

    let upstream_policy = policy_of(config)?;
    let schemas: BTreeMap<String, SchemaPatch> = reconcile(
        policy,
        &exceptions,
        config.schemas.iter().map(|(name, s)| (name, s.enabled)),
    )
    .into_iter()
    .map(|(name, enabled)| {
        (
            name,
            SchemaPatch {
                enabled: Some(enabled),
                ..Default::default()
            },
        )
    })
    .collect();

    let policy_changed = upstream_policy != policy || config.schema_change_handling.is_none();
    Ok(SchemaConfigPatch {
        schema_change_handling: policy_changed.then(|| policy.to_string()),
        schemas,
    })
}

pub struct SchemaSettingsResource;

impl SchemaSettingsResource {
    async fn apply(
        &self,
        ctx: &ProviderContext,
        desired: SchemaSettingsState,
    ) -> Result<Value, ProviderError> {
        let _guard = ctx.schema_locks.lock(&desired.connection_id).await;

        let config = load_or_reload(ctx, &desired.connection_id).await?;
        let patch = settings_patch(&desired, &config)?;

        let config = if patch.is_empty() {
            debug!(connection_id = %desired.connection_id, "Schema settings already up to date");
            config
        } else {
            info!(
                connection_id = %desired.connection_id,
                schemas = patch.schemas.len(),
                "Patching schema settings"
            );
            retry_on_conflict(&ctx.retry, "update schema settings", || {
                ctx.client.update_schema_config(&desired.connection_id, &patch)
            })
            .await?
        };

        Ok(serde_json::to_value(SchemaSettingsState::observed(&desired, &config)?)?)
    }
}

#[async_trait::async_trait]
impl ResourceHandler for SchemaSettingsResource {
    fn type_name(&self) -> &'static str {
        "fivetran_connection_schema_settings"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description(
                "Schema change handling of a connection. Under ALLOW_ALL list the schemas \
                 to disable; under ALLOW_COLUMNS or BLOCK_ALL list the schemas to enable.",
            )
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("connection_id", Attribute::required_string().with_force_new())
            .with_attribute(
                "schema_change_handling",
                Attribute::required_string()
                    .with_description("ALLOW_ALL, ALLOW_COLUMNS or BLOCK_ALL"),
            )
            .with_attribute("disabled_schemas", Attribute::optional_string_set())
            .with_attribute("enabled_schemas", Attribute::optional_string_set())
            .with_attribute(
                "validation_level",
                Attribute::optional_string()
                    .with_default(json!("NONE"))
                    .with_description(
                        "NONE, TABLES or COLUMNS; anything but NONE rejects unknown schema names",
                    ),
            )
            .with_timeouts()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let policies: Vec<&str> = SchemaChangeHandling::ALL.iter().map(|p| p.as_str()).collect();
        let mut diagnostics: Vec<Diagnostic> = [
            one_of(config, "schema_change_handling", &policies),
            one_of(config, "validation_level", &VALIDATION_LEVELS),
            mutually_exclusive(config, &["disabled_schemas", "enabled_schemas"]),
        ]
        .into_iter()
        .flatten()
        .collect();

        if diagnostics.is_empty() {
            if let Ok(state) = decode::<SchemaSettingsState>(config.clone()) {
                if let Err(e) = state.exceptions() {
                    diagnostics.extend(e.into_diagnostics());
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
        let state: SchemaSettingsState = decode(state)?;
        match found(ctx.client.get_schema_config(&state.connection_id).await)? {
            Some(config) => {
                let observed = SchemaSettingsState::observed(&state, &config)?;
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
        let state: SchemaSettingsState = decode(state)?;
        debug!(
            connection_id = %state.connection_id,
            "Forgetting schema settings; upstream is left as is"
        );
        Ok(())
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError> {
        let config = ctx.client.get_schema_config(id).await?;
        let policy = policy_of(&config)?;
        let local = SchemaSettingsState {
            connection_id: id.to_string(),
            schema_change_handling: policy.to_string(),
            validation_level: Some("NONE".to_string()),
            ..Default::default()
        };
        let mut state = SchemaSettingsState::observed(&local, &config)?;
        // Import reports the exception set even when empty.
        match policy.exception_kind() {
            crate::core::reconcile::ExceptionKind::Disabled => {
                state.disabled_schemas.get_or_insert_with(Vec::new);
            }
            crate::core::reconcile::ExceptionKind::Enabled => {
                state.enabled_schemas.get_or_insert_with(Vec::new);
            }
        }
        Ok(serde_json::to_value(state)?)
    }
}
