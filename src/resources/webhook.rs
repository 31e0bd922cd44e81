//! `fivetran_webhook`: account or group webhooks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{found, ignore_not_found, ProviderContext, ResourceHandler};
use crate::client::models::{Webhook, WebhookRequest};
use crate::core::reconcile::stabilize_order;
use crate::core::values::{changed, decode, REDACTED};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::one_of;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct WebhookState {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    group_id: Option<String>,
    url: String,
    #[serde(default)]
    events: Option<Vec<String>>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default)]
    secret: Option<String>,
    #[serde(default)]
    run_tests: Option<bool>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    created_by: Option<String>,
}

impl WebhookState {
    fn id(&self) -> Result<&str, ProviderError> {
        self.id
            .as_deref()
            .ok_or_else(|| ProviderError::Validation("webhook state has no id".to_string()))
    }

    fn event_set(&self) -> BTreeSet<String> {
        self.events.iter().flatten().cloned().collect()
    }

    fn from_api(remote: Webhook, local: Option<&WebhookState>) -> Self {
        let remote_events: BTreeSet<String> = remote.events.into_iter().collect();
        let prior_events = local.and_then(|l| l.events.as_deref()).unwrap_or_default();
        let secret = match remote.secret {
            Some(secret) if secret != REDACTED => Some(secret),
            other => local.and_then(|l| l.secret.clone()).or(other),
        };
        Self {
            id: Some(remote.id),
            kind: remote.kind,
            group_id: remote.group_id,
            url: remote.url,
            events: Some(stabilize_order(prior_events, &remote_events)),
            active: Some(remote.active),
            secret,
            run_tests: local.and_then(|l| l.run_tests).or(Some(false)),
            created_at: remote.created_at,
            created_by: remote.created_by,
        }
    }
}

fn create_request(planned: &WebhookState) -> WebhookRequest {
    WebhookRequest {
        url: Some(planned.url.clone()),
        events: Some(planned.event_set().into_iter().collect()),
        active: planned.active,
        secret: planned.secret.clone(),
        run_tests: planned.run_tests,
    }
}

fn update_request(prior: &WebhookState, planned: &WebhookState) -> WebhookRequest {
    let events = planned.event_set();
    WebhookRequest {
        url: changed(&prior.url, &planned.url),
        events: (prior.event_set() != events).then(|| events.into_iter().collect()),
        active: changed(&prior.active, &planned.active).flatten(),
        secret: changed(&prior.secret, &planned.secret).flatten(),
        run_tests: changed(&prior.run_tests, &planned.run_tests).flatten(),
    }
}

/// `fivetran_webhook`: account or group level event notifications.
pub struct WebhookResource;

#[async_trait::async_trait]
impl ResourceHandler for WebhookResource {
    fn type_name(&self) -> &'static str {
        "fivetran_webhook"
    }

    fn schema(&self) -> Schema {
        Schema::new(1)
            .with_description("A webhook receiving Fivetran events for the account or one group")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "type",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("account or group"),
            )
            .with_attribute(
                "group_id",
                Attribute::optional_string()
                    .with_force_new()
                    .with_description("Required when type is group"),
            )
            .with_attribute("url", Attribute::required_string())
            .with_attribute("events", Attribute::optional_string_set())
            .with_attribute("active", Attribute::optional_computed_bool())
            .with_attribute(
                "secret",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("Used to sign payloads; never read back"),
            )
            .with_attribute("run_tests", Attribute::optional_bool().with_default(json!(false)))
            .with_attribute("created_at", Attribute::computed_string())
            .with_attribute("created_by", Attribute::computed_string())
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> =
            one_of(config, "type", &["account", "group"]).into_iter().collect();
        let has_group = config.get("group_id").is_some_and(|v| !v.is_null());
        match config.get("type").and_then(Value::as_str) {
            Some("group") if !has_group => diagnostics.push(
                Diagnostic::error("Missing required argument")
                    .with_detail("group_id is required when type is group")
                    .with_attribute("group_id"),
            ),
            Some("account") if has_group => diagnostics.push(
                Diagnostic::error("Invalid argument")
                    .with_detail("group_id cannot be set on an account webhook")
                    .with_attribute("group_id"),
            ),
            _ => {}
        }
        diagnostics
    }

    async fn create(&self, ctx: &ProviderContext, planned: Value) -> Result<Value, ProviderError> {
        let planned: WebhookState = decode(planned)?;
        let request = create_request(&planned);
        let webhook = match planned.group_id.as_deref() {
            Some(group_id) if planned.kind == "group" => {
                ctx.client.create_group_webhook(group_id, &request).await?
            }
            _ => ctx.client.create_account_webhook(&request).await?,
        };
        Ok(serde_json::to_value(WebhookState::from_api(webhook, Some(&planned)))?)
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let state: WebhookState = decode(state)?;
        match found(ctx.client.get_webhook(state.id()?).await)? {
            Some(webhook) => Ok(Some(serde_json::to_value(WebhookState::from_api(
                webhook,
                Some(&state),
            ))?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior: WebhookState = decode(prior)?;
        let planned: WebhookState = decode(planned)?;
        let request = update_request(&prior, &planned);
        if request.is_empty() {
            return Ok(serde_json::to_value(prior)?);
        }
        let webhook = ctx.client.update_webhook(prior.id()?, &request).await?;
        Ok(serde_json::to_value(WebhookState::from_api(webhook, Some(&planned)))?)
    }

    async fn delete(&self, ctx: &ProviderContext, state: Value) -> Result<(), ProviderError> {
        let state: WebhookState = decode(state)?;
        ignore_not_found(ctx.client.delete_webhook(state.id()?).await)
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError> {
        let webhook = ctx.client.get_webhook(id).await?;
        Ok(serde_json::to_value(WebhookState::from_api(webhook, None))?)
    }

    fn upgrade_state(&self, version: i64, mut state: Value) -> Result<Value, ProviderError> {
        match version {
            0 => {
                if let Some(obj) = state.as_object_mut() {
                    obj.entry("run_tests").or_insert(json!(false));
                }
                Ok(state)
            }
            1 => Ok(state),
            other => Err(ProviderError::Validation(format!(
                "unknown fivetran_webhook state version {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> Webhook {
        serde_json::from_value(json!({
            "id": "webhook_id",
            "type": "group",
            "group_id": "group_id",
            "url": "https://example.com/hook",
            "events": ["sync_start", "sync_end"],
            "active": true,
            "secret": "******",
            "created_at": "2024-01-01T00:00:00Z",
            "created_by": "user_id"
        }))
        .unwrap()
    }

    fn planned() -> WebhookState {
        decode(json!({
            "type": "group",
            "group_id": "group_id",
            "url": "https://example.com/hook",
            "events": ["sync_end", "sync_start"],
            "active": true,
            "secret": "s3cret",
            "run_tests": false
        }))
        .unwrap()
    }

    #[test]
    fn test_secret_survives_redaction_and_event_order_is_kept() {
        let state = WebhookState::from_api(remote(), Some(&planned()));
        assert_eq!(state.secret.as_deref(), Some("s3cret"));
        assert_eq!(
            state.events,
            Some(vec!["sync_end".to_string(), "sync_start".to_string()])
        );
    }

    #[test]
    fn test_reordered_events_are_no_change() {
        let prior = WebhookState::from_api(remote(), Some(&planned()));
        let mut next = prior.clone();
        next.events = Some(vec!["sync_start".into(), "sync_end".into()]);
        assert!(update_request(&prior, &next).is_empty());

        next.active = Some(false);
        let body = serde_json::to_value(update_request(&prior, &next)).unwrap();
        assert_eq!(body, json!({"active": false}));
    }

    #[test]
    fn test_validate_group_id_rules() {
        let resource = WebhookResource;
        assert_eq!(resource.validate(&json!({"type": "group", "url": "u"})).len(), 1);
        assert_eq!(
            resource
                .validate(&json!({"type": "account", "url": "u", "group_id": "g"}))
                .len(),
            1
        );
        assert!(resource.validate(&json!({"type": "account", "url": "u"})).is_empty());
    }

    #[test]
    fn test_upgrade_v0_fills_run_tests() {
        let v1 = WebhookResource
            .upgrade_state(0, json!({"id": "webhook_id", "type": "account", "url": "u"}))
            .unwrap();
        assert_eq!(v1["run_tests"], json!(false));
    }
}
