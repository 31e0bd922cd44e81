//! `fivetran_connection_schedule`: sync frequency and pause state of a connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{found, ProviderContext, ResourceHandler};
use crate::client::models::{Connection, ConnectionRequest};
use crate::core::values::{changed, decode};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::one_of;

/// Minutes between syncs accepted by the API.
const SYNC_FREQUENCIES: [i64; 11] = [1, 5, 15, 30, 60, 120, 180, 360, 480, 720, 1440];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ScheduleState {
    #[serde(default)]
    id: Option<String>,
    connection_id: String,
    #[serde(default)]
    sync_frequency: Option<i64>,
    #[serde(default)]
    schedule_type: Option<String>,
    #[serde(default)]
    paused: Option<bool>,
    #[serde(default)]
    pause_after_trial: Option<bool>,
    #[serde(default)]
    daily_sync_time: Option<String>,
}

impl From<Connection> for ScheduleState {
    fn from(connection: Connection) -> Self {
        Self {
            id: Some(connection.id.clone()),
            connection_id: connection.id,
            sync_frequency: connection.sync_frequency,
            schedule_type: connection.schedule_type,
            paused: connection.paused,
            pause_after_trial: connection.pause_after_trial,
            daily_sync_time: connection.daily_sync_time,
        }
    }
}

fn schedule_request(prior: &ScheduleState, planned: &ScheduleState) -> ConnectionRequest {
    ConnectionRequest {
        sync_frequency: changed(&prior.sync_frequency, &planned.sync_frequency).flatten(),
        schedule_type: changed(&prior.schedule_type, &planned.schedule_type).flatten(),
        paused: changed(&prior.paused, &planned.paused).flatten(),
        pause_after_trial: changed(&prior.pause_after_trial, &planned.pause_after_trial).flatten(),
        daily_sync_time: changed(&prior.daily_sync_time, &planned.daily_sync_time).flatten(),
        ..Default::default()
    }
}

/// `fivetran_connection_schedule`: sync scheduling of an existing
/// connection. Destroying it leaves the connection untouched.
pub struct ConnectionScheduleResource;

impl ConnectionScheduleResource {
    async fn apply(
        &self,
        ctx: &ProviderContext,
        prior: &ScheduleState,
        planned: &ScheduleState,
    ) -> Result<Value, ProviderError> {
        let request = schedule_request(prior, planned);
        let connection = if request.is_empty() {
            debug!(connection_id = %planned.connection_id, "Schedule already up to date");
            ctx.client.get_connection(&planned.connection_id).await?
        } else {
            ctx.client
                .update_connection(&planned.connection_id, &request)
                .await?
        };
        Ok(serde_json::to_value(ScheduleState::from(connection))?)
    }
}

#[async_trait::async_trait]
impl ResourceHandler for ConnectionScheduleResource {
    fn type_name(&self) -> &'static str {
        "fivetran_connection_schedule"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Sync schedule of a Fivetran connection")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("connection_id", Attribute::required_string().with_force_new())
            .with_attribute(
                "sync_frequency",
                Attribute::optional_computed_int64().with_description("Minutes between syncs"),
            )
            .with_attribute(
                "schedule_type",
                Attribute::optional_computed_string().with_description("auto or manual"),
            )
            .with_attribute("paused", Attribute::optional_computed_bool())
            .with_attribute("pause_after_trial", Attribute::optional_computed_bool())
            .with_attribute(
                "daily_sync_time",
                Attribute::optional_computed_string()
                    .with_description(
                        "Time of day for daily syncs, e.g. 03:00; requires sync_frequency 1440",
                    ),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = one_of(config, "schedule_type", &["auto", "manual"])
            .into_iter()
            .collect();

        let frequency = config.get("sync_frequency").and_then(Value::as_i64);
        if let Some(frequency) = frequency {
            if !SYNC_FREQUENCIES.contains(&frequency) {
                diagnostics.push(
                    Diagnostic::error("Invalid value for 'sync_frequency'")
                        .with_detail(format!(
                            "Expected one of {:?} minutes, got {}",
                            SYNC_FREQUENCIES, frequency
                        ))
                        .with_attribute("sync_frequency"),
                );
            }
        }
        let has_daily_time = config.get("daily_sync_time").is_some_and(|v| !v.is_null());
        if has_daily_time && frequency.is_some_and(|f| f != 1440) {
            diagnostics.push(
                Diagnostic::error("Invalid value for 'daily_sync_time'")
                    .with_detail("daily_sync_time can only be set when sync_frequency is 1440")
                    .with_attribute("daily_sync_time"),
            );
        }
        diagnostics
    }

    async fn create(&self, ctx: &ProviderContext, planned: Value) -> Result<Value, ProviderError> {
        let planned: ScheduleState = decode(planned)?;
        let current = ScheduleState::from(ctx.client.get_connection(&planned.connection_id).await?);
        // Unset attributes adopt the upstream value.
        let planned = ScheduleState {
            sync_frequency: planned.sync_frequency.or(current.sync_frequency),
            schedule_type: planned.schedule_type.or(current.schedule_type.clone()),
            paused: planned.paused.or(current.paused),
            pause_after_trial: planned.pause_after_trial.or(current.pause_after_trial),
            daily_sync_time: planned.daily_sync_time.or(current.daily_sync_time.clone()),
            ..planned
        };
        self.apply(ctx, &current, &planned).await
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let state: ScheduleState = decode(state)?;
        match found(ctx.client.get_connection(&state.connection_id).await)? {
            Some(connection) => Ok(Some(serde_json::to_value(ScheduleState::from(connection))?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior: ScheduleState = decode(prior)?;
        let planned: ScheduleState = decode(planned)?;
        self.apply(ctx, &prior, &planned).await
    }

    async fn delete(&self, _ctx: &ProviderContext, state: Value) -> Result<(), ProviderError> {
        let state: ScheduleState = decode(state)?;
        debug!(
            connection_id = %state.connection_id,
            "Forgetting schedule; connection keeps its settings"
        );
        Ok(())
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError> {
        let connection = ctx.client.get_connection(id).await?;
        Ok(serde_json::to_value(ScheduleState::from(connection))?)
    }
}
