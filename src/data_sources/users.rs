use serde_json::{json, Value};

use super::{computed, lookup_id, DataSourceHandler};
use crate::error::ProviderError;
use crate::resources::{ProviderContext, UserState};
use crate::schema::{Attribute, AttributeType, Schema};

const USER_FIELDS: [(&str, AttributeType); 11] = [
    ("id", AttributeType::String),
    ("email", AttributeType::String),
    ("given_name", AttributeType::String),
    ("family_name", AttributeType::String),
    ("phone", AttributeType::String),
    ("picture", AttributeType::String),
    ("role", AttributeType::String),
    ("invited", AttributeType::Bool),
    ("verified", AttributeType::Bool),
    ("logged_in_at", AttributeType::String),
    ("created_at", AttributeType::String),
];

/// `fivetran_user`: one user by ID.
pub struct UserDataSource;

#[async_trait::async_trait]
impl DataSourceHandler for UserDataSource {
    fn type_name(&self) -> &'static str {
        "fivetran_user"
    }

    fn schema(&self) -> Schema {
        USER_FIELDS
            .into_iter()
            .filter(|(name, _)| *name != "id")
            .fold(
                Schema::v0()
                    .with_description("Look up a user by ID")
                    .with_attribute("id", Attribute::required_string()),
                |schema, (name, attr_type)| schema.with_attribute(name, computed(attr_type)),
            )
    }

    async fn read(&self, ctx: &ProviderContext, config: Value) -> Result<Value, ProviderError> {
        let user = ctx.client.get_user(lookup_id(&config)?).await?;
        Ok(serde_json::to_value(UserState::from_api(user, None))?)
    }
}

/// `fivetran_users`: every user in the account.
pub struct UsersDataSource;

#[async_trait::async_trait]
impl DataSourceHandler for UsersDataSource {
    fn type_name(&self) -> &'static str {
        "fivetran_users"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("All users of the account")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "users",
                computed(AttributeType::list(AttributeType::object(USER_FIELDS))),
            )
    }

    async fn read(&self, ctx: &ProviderContext, _config: Value) -> Result<Value, ProviderError> {
        let users = ctx
            .client
            .list_users()
            .await?
            .into_iter()
            .map(|user| serde_json::to_value(UserState::from_api(user, None)))
            .collect::<Result<Vec<Value>, _>>()?;
        Ok(json!({"id": "users", "users": users}))
    }
}
