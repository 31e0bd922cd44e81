use serde_json::{json, Value};

use super::{computed, lookup_id, DataSourceHandler};
use crate::error::ProviderError;
use crate::resources::ProviderContext;
use crate::schema::{Attribute, AttributeType, Schema};

/// `fivetran_connection`: one connection by ID. Secrets in `config` come
/// back redacted.
pub struct ConnectionDataSource;

#[async_trait::async_trait]
impl DataSourceHandler for ConnectionDataSource {
    fn type_name(&self) -> &'static str {
        "fivetran_connection"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Look up a connection by ID")
            .with_attribute("id", Attribute::required_string())
            .with_attribute("group_id", Attribute::computed_string())
            .with_attribute("service", Attribute::computed_string())
            .with_attribute("schema", Attribute::computed_string())
            .with_attribute("connected_by", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string())
            .with_attribute("paused", Attribute::computed_bool())
            .with_attribute("pause_after_trial", Attribute::computed_bool())
            .with_attribute("sync_frequency", computed(AttributeType::Int64))
            .with_attribute("schedule_type", Attribute::computed_string())
            .with_attribute("daily_sync_time", Attribute::computed_string())
            .with_attribute("networking_method", Attribute::computed_string())
            .with_attribute("config", computed(AttributeType::Dynamic).sensitive())
    }

    async fn read(&self, ctx: &ProviderContext, config: Value) -> Result<Value, ProviderError> {
        let c = ctx.client.get_connection(lookup_id(&config)?).await?;
        Ok(json!({
            "id": c.id,
            "group_id": c.group_id,
            "service": c.service,
            "schema": c.schema,
            "connected_by": c.connected_by,
            "created_at": c.created_at,
            "paused": c.paused,
            "pause_after_trial": c.pause_after_trial,
            "sync_frequency": c.sync_frequency,
            "schedule_type": c.schedule_type,
            "daily_sync_time": c.daily_sync_time,
            "networking_method": c.networking_method,
            "config": c.config,
        }))
    }
}
