//! Read-only lookups.

mod connection;
mod destination;
mod groups;
mod users;

use std::sync::Arc;

use serde_json::Value;

use crate::error::ProviderError;
use crate::resources::ProviderContext;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};

pub use connection::ConnectionDataSource;
pub use destination::DestinationDataSource;
pub use groups::{GroupDataSource, GroupsDataSource};
pub use users::{UserDataSource, UsersDataSource};

/// One data source type.
#[async_trait::async_trait]
pub trait DataSourceHandler: Send + Sync {
    /// Data source type name, e.g. `fivetran_groups`.
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Look up the object(s) described by `config`.
    async fn read(&self, ctx: &ProviderContext, config: Value) -> Result<Value, ProviderError>;
}

/// All data source handlers the provider serves.
pub fn all() -> Vec<Arc<dyn DataSourceHandler>> {
    vec![
        Arc::new(GroupDataSource),
        Arc::new(GroupsDataSource),
        Arc::new(UserDataSource),
        Arc::new(UsersDataSource),
        Arc::new(ConnectionDataSource),
        Arc::new(DestinationDataSource),
    ]
}

/// The `id` a by-id lookup was configured with.
fn lookup_id(config: &Value) -> Result<&str, ProviderError> {
    config
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::Validation("id is required".to_string()))
}

fn computed(attr_type: AttributeType) -> Attribute {
    Attribute::new(attr_type, AttributeFlags::computed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    #[test]
    fn test_type_names_are_unique() {
        let names: BTreeSet<&str> = all().iter().map(|d| d.type_name()).collect();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn test_lookup_id() {
        assert_eq!(lookup_id(&json!({"id": "group_id"})).unwrap(), "group_id");
        assert!(lookup_id(&json!({"id": ""})).is_err());
        assert!(lookup_id(&json!({})).is_err());
    }
}
