use serde_json::{json, Value};

use super::{computed, lookup_id, DataSourceHandler};
use crate::client::models::Group;
use crate::error::ProviderError;
use crate::resources::ProviderContext;
use crate::schema::{Attribute, AttributeType, Schema};

fn group_object() -> AttributeType {
    AttributeType::object([
        ("id", AttributeType::String),
        ("name", AttributeType::String),
        ("created_at", AttributeType::String),
    ])
}

fn group_value(group: Group) -> Value {
    json!({
        "id": group.id,
        "name": group.name,
        "created_at": group.created_at,
    })
}

/// `fivetran_group`: one group by ID.
pub struct GroupDataSource;

#[async_trait::async_trait]
impl DataSourceHandler for GroupDataSource {
    fn type_name(&self) -> &'static str {
        "fivetran_group"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Look up a group by ID")
            .with_attribute("id", Attribute::required_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string())
    }

    async fn read(&self, ctx: &ProviderContext, config: Value) -> Result<Value, ProviderError> {
        let group = ctx.client.get_group(lookup_id(&config)?).await?;
        Ok(group_value(group))
    }
}

/// `fivetran_groups`: every group in the account.
pub struct GroupsDataSource;

#[async_trait::async_trait]
impl DataSourceHandler for GroupsDataSource {
    fn type_name(&self) -> &'static str {
        "fivetran_groups"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("All groups of the account")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("groups", computed(AttributeType::list(group_object())))
    }

    async fn read(&self, ctx: &ProviderContext, _config: Value) -> Result<Value, ProviderError> {
        let groups: Vec<Value> = ctx
            .client
            .list_groups()
            .await?
            .into_iter()
            .map(group_value)
            .collect();
        Ok(json!({"id": "groups", "groups": groups}))
    }
}
