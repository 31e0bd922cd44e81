//! Group resource.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{found, ignore_not_found, ProviderContext, ResourceHandler};
use crate::client::models::Group;
use crate::core::values::decode;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct GroupState {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<Group> for GroupState {
    fn from(group: Group) -> Self {
        Self {
            id: Some(group.id),
            name: group.name,
            created_at: group.created_at,
        }
    }
}

impl GroupState {
    fn id(&self) -> Result<&str, ProviderError> {
        self.id
            .as_deref()
            .ok_or_else(|| ProviderError::Validation("group state has no id".to_string()))
    }
}

/// `fivetran_group`: a group of destinations and connections.
pub struct GroupResource;

#[async_trait::async_trait]
impl ResourceHandler for GroupResource {
    fn type_name(&self) -> &'static str {
        "fivetran_group"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description(
                "A Fivetran group: one destination and the connections loading into it",
            )
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The name of the group within the account"),
            )
            .with_attribute("created_at", Attribute::computed_string())
    }

    async fn create(&self, ctx: &ProviderContext, planned: Value) -> Result<Value, ProviderError> {
        let planned: GroupState = decode(planned)?;
        let group = ctx.client.create_group(&planned.name).await?;
        Ok(serde_json::to_value(GroupState::from(group))?)
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let state: GroupState = decode(state)?;
        match found(ctx.client.get_group(state.id()?).await)? {
            Some(group) => Ok(Some(serde_json::to_value(GroupState::from(group))?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior: GroupState = decode(prior)?;
        let planned: GroupState = decode(planned)?;
        if prior.name == planned.name {
            return Ok(serde_json::to_value(prior)?);
        }
        let group = ctx.client.update_group(prior.id()?, &planned.name).await?;
        Ok(serde_json::to_value(GroupState::from(group))?)
    }

    async fn delete(&self, ctx: &ProviderContext, state: Value) -> Result<(), ProviderError> {
        let state: GroupState = decode(state)?;
        ignore_not_found(ctx.client.delete_group(state.id()?).await)
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError> {
        let group = ctx.client.get_group(id).await?;
        Ok(serde_json::to_value(GroupState::from(group))?)
    }
}
