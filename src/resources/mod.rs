//! Resource adapters.
//!
//! Every adapter has the same shape: a schema, then create / read / update /
//! delete mapping between the typed state document and Fivetran API calls.
//! State documents are decoded once at the start of each call.

mod connection;
mod connection_schedule;
mod destination;
mod group;
mod memberships;
mod schema_config;
mod schema_settings;
mod table_config;
mod column_config;
mod user;
mod webhook;

use std::sync::Arc;

use serde_json::Value;

use crate::client::{FivetranClient, FivetranError, MembershipKind};
use crate::core::{RetryPolicy, SchemaLocks};
use crate::error::ProviderError;
use crate::schema::{Diagnostic, Schema};

pub use column_config::ColumnConfigResource;
pub use connection::ConnectionResource;
pub use connection_schedule::ConnectionScheduleResource;
pub use destination::DestinationResource;
pub use group::GroupResource;
pub use memberships::MembershipResource;
pub use schema_settings::SchemaSettingsResource;
pub use table_config::TableConfigResource;
pub use user::UserResource;
pub(crate) use user::UserState;
pub use webhook::WebhookResource;

/// Everything a handler needs to talk to Fivetran, built once by
/// `configure` and shared by every call.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    pub client: FivetranClient,
    pub schema_locks: SchemaLocks,
    pub retry: RetryPolicy,
}

/// One resource type.
#[async_trait::async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Resource type name, e.g. `fivetran_group`.
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Rules beyond the schema: mutually exclusive sets, enumerations.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    async fn create(&self, ctx: &ProviderContext, planned: Value) -> Result<Value, ProviderError>;

    /// `None` when the object no longer exists upstream.
    async fn read(
        &self,
        ctx: &ProviderContext,
        state: Value,
    ) -> Result<Option<Value>, ProviderError>;

    async fn update(
        &self,
        ctx: &ProviderContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError>;

    async fn delete(&self, ctx: &ProviderContext, state: Value) -> Result<(), ProviderError>;

    /// Build state for an existing object from its import ID.
    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError>;

    /// Rewrite state written by schema `version` into the current layout.
    fn upgrade_state(&self, version: i64, state: Value) -> Result<Value, ProviderError> {
        let _ = version;
        Ok(state)
    }
}

/// All resource handlers the provider serves.
pub fn all() -> Vec<Arc<dyn ResourceHandler>> {
    vec![
        Arc::new(GroupResource),
        Arc::new(UserResource),
        Arc::new(DestinationResource),
        Arc::new(ConnectionResource),
        Arc::new(ConnectionScheduleResource),
        Arc::new(SchemaSettingsResource),
        Arc::new(TableConfigResource),
        Arc::new(ColumnConfigResource),
        Arc::new(WebhookResource),
        Arc::new(MembershipResource::new(MembershipKind::Connection)),
        Arc::new(MembershipResource::new(MembershipKind::Connector)),
        Arc::new(MembershipResource::new(MembershipKind::Group)),
    ]
}

/// Turn a not-found upstream error into `None`.
pub(crate) fn found<T>(result: Result<T, FivetranError>) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Deleting something that is already gone is success.
pub(crate) fn ignore_not_found(result: Result<(), FivetranError>) -> Result<(), ProviderError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other.map_err(Into::into),
    }
}

/// Split a composite import ID (`a:b[:c]`) into exactly `parts` pieces.
pub(crate) fn split_id(id: &str, parts: usize, layout: &str) -> Result<Vec<String>, ProviderError> {
    let pieces: Vec<String> = id.split(':').map(str::to_string).collect();
    if pieces.len() != parts || pieces.iter().any(String::is_empty) {
        return Err(ProviderError::Validation(format!(
            "invalid import ID '{}', expected {}",
            id, layout
        )));
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_type_names_are_unique_and_prefixed() {
        let names: Vec<&str> = all().iter().map(|h| h.type_name()).collect();
        let unique: BTreeSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
        assert!(names.iter().all(|n| n.starts_with("fivetran_")));
        assert!(unique.contains("fivetran_user_connector_membership"));
    }

    #[test]
    fn test_every_schema_has_an_id() {
        for handler in all() {
            assert!(
                handler.schema().attribute("id").is_some(),
                "{} has no id attribute",
                handler.type_name()
            );
        }
    }

    #[test]
    fn test_split_id() {
        assert_eq!(
            split_id("conn:public", 2, "<connection_id>:<schema>").unwrap(),
            vec!["conn", "public"]
        );
        assert!(split_id("conn", 2, "<connection_id>:<schema>").is_err());
        assert!(split_id("conn::orders", 3, "<connection_id>:<schema>:<table>").is_err());
    }
}
