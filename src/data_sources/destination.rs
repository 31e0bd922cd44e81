use serde_json::{json, Value};

use super::{computed, lookup_id, DataSourceHandler};
use crate::error::ProviderError;
use crate::resources::ProviderContext;
use crate::schema::{Attribute, AttributeType, Schema};

/// `fivetran_destination`: one destination by ID.
pub struct DestinationDataSource;

#[async_trait::async_trait]
impl DataSourceHandler for DestinationDataSource {
    fn type_name(&self) -> &'static str {
        "fivetran_destination"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Look up a destination by ID")
            .with_attribute("id", Attribute::required_string())
            .with_attribute("group_id", Attribute::computed_string())
            .with_attribute("service", Attribute::computed_string())
            .with_attribute("region", Attribute::computed_string())
            .with_attribute("time_zone_offset", Attribute::computed_string())
            .with_attribute("setup_status", Attribute::computed_string())
            .with_attribute("daylight_saving_time_enabled", Attribute::computed_bool())
            .with_attribute("networking_method", Attribute::computed_string())
            .with_attribute("config", computed(AttributeType::Dynamic).sensitive())
    }

    async fn read(&self, ctx: &ProviderContext, config: Value) -> Result<Value, ProviderError> {
        let d = ctx.client.get_destination(lookup_id(&config)?).await?;
        Ok(json!({
            "id": d.id,
            "group_id": d.group_id,
            "service": d.service,
            "region": d.region,
            "time_zone_offset": d.time_zone_offset,
            "setup_status": d.setup_status,
            "daylight_saving_time_enabled": d.daylight_saving_time_enabled,
            "networking_method": d.networking_method,
            "config": d.config,
        }))
    }
}
