//! Request and response bodies of the Fivetran v1 API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page of a cursor-paginated listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupRequest {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub invited: Option<bool>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub logged_in_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserCreateRequest {
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserUpdateRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A user's role on a connection or group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipCreateRequest {
    pub id: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipUpdateRequest {
    pub role: String,
}

// ---------------------------------------------------------------------------
// Destinations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub group_id: String,
    pub service: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub time_zone_offset: Option<String>,
    #[serde(default)]
    pub setup_status: Option<String>,
    #[serde(default)]
    pub daylight_saving_time_enabled: Option<bool>,
    #[serde(default)]
    pub hybrid_deployment_agent_id: Option<String>,
    #[serde(default)]
    pub networking_method: Option<String>,
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DestinationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone_offset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_certificates: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_fingerprints: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_setup_tests: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daylight_saving_time_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid_deployment_agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networking_method: Option<String>,
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub group_id: String,
    pub service: String,
    /// Destination schema as reported upstream: `name` or `name.table`.
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub connected_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub paused: Option<bool>,
    #[serde(default)]
    pub pause_after_trial: Option<bool>,
    #[serde(default)]
    pub sync_frequency: Option<i64>,
    #[serde(default)]
    pub schedule_type: Option<String>,
    #[serde(default)]
    pub daily_sync_time: Option<String>,
    #[serde(default)]
    pub networking_method: Option<String>,
    #[serde(default)]
    pub hybrid_deployment_agent_id: Option<String>,
    #[serde(default)]
    pub proxy_agent_id: Option<String>,
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_after_trial: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_frequency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_sync_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_certificates: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_fingerprints: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_setup_tests: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networking_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid_deployment_agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_agent_id: Option<String>,
}

impl ConnectionRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Connection schemas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub schema_change_handling: Option<String>,
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDetails {
    #[serde(default)]
    pub name_in_destination: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub tables: BTreeMap<String, TableDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDetails {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sync_mode: Option<String>,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDetails {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub hashed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_change_handling: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, SchemaPatch>,
}

impl SchemaConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.schema_change_handling.is_none() && self.schemas.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tables: BTreeMap<String, TablePatch>,
}

impl SchemaPatch {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.tables.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TablePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_mode: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, ColumnPatch>,
}

impl TablePatch {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.sync_mode.is_none() && self.columns.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashed: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaReloadRequest {
    pub exclude_mode: String,
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub group_id: Option<String>,
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_tests: Option<bool>,
}

impl WebhookRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_config_tolerates_missing_fields() {
        let config: SchemaConfig = serde_json::from_value(json!({
            "schema_change_handling": "ALLOW_ALL",
            "schemas": {
                "public": {
                    "enabled": true,
                    "tables": {
                        "orders": { "enabled": false }
                    }
                }
            }
        }))
        .unwrap();

        assert_eq!(config.schema_change_handling.as_deref(), Some("ALLOW_ALL"));
        let orders = &config.schemas["public"].tables["orders"];
        assert!(!orders.enabled);
        assert!(orders.columns.is_empty());
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let mut patch = SchemaConfigPatch::default();
        assert!(patch.is_empty());
        patch.schemas.insert(
            "public".into(),
            SchemaPatch {
                enabled: Some(false),
                ..Default::default()
            },
        );

        let body = serde_json::to_value(&patch).unwrap();
        assert_eq!(body, json!({"schemas": {"public": {"enabled": false}}}));
    }

    #[test]
    fn test_webhook_type_field_renamed() {
        let webhook: Webhook = serde_json::from_value(json!({
            "id": "wh_1",
            "type": "group",
            "group_id": "g_1",
            "url": "https://example.com/hook",
            "events": ["sync_end"],
            "active": true,
            "secret": "******"
        }))
        .unwrap();
        assert_eq!(webhook.kind, "group");
        assert_eq!(webhook.secret.as_deref(), Some("******"));
    }

    #[test]
    fn test_page_defaults() {
        let page: Page<Group> = serde_json::from_value(json!({})).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }
}
