//! User membership resources: one user's roles on connections or groups.
//!
//! A single apply may need several add / change-role / remove calls. They
//! run in order through a [`Saga`]; when one fails, the calls that already
//! went through are reverted before the error is reported.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{found, ProviderContext, ResourceHandler};
use crate::client::{FivetranClient, FivetranError, MembershipKind};
use crate::core::values::decode;
use crate::core::Saga;
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, Schema};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct MembershipEntry {
    id: String,
    role: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct MembershipState {
    user_id: String,
    entries: Vec<MembershipEntry>,
}

impl MembershipState {
    fn roles(&self) -> BTreeMap<&str, &str> {
        self.entries
            .iter()
            .map(|e| (e.id.as_str(), e.role.as_str()))
            .collect()
    }
}

/// One upstream call and how to take it back.
#[derive(Debug, Clone, PartialEq)]
enum Step {
    Add { id: String, role: String },
    ChangeRole { id: String, from: String, to: String },
    Remove { id: String, role: String },
}

impl Step {
    fn describe(&self, kind: MembershipKind) -> String {
        match self {
            Step::Add { id, role } => format!("add {} {} as {}", kind.noun(), id, role),
            Step::ChangeRole { id, from, to } => {
                format!("change role on {} {} from {} to {}", kind.noun(), id, from, to)
            }
            Step::Remove { id, role } => format!("remove {} {} ({})", kind.noun(), id, role),
        }
    }

    async fn run(
        &self,
        client: &FivetranClient,
        kind: MembershipKind,
        user_id: &str,
    ) -> Result<(), FivetranError> {
        match self {
            Step::Add { id, role } => client.add_membership(kind, user_id, id, role).await,
            Step::ChangeRole { id, to, .. } => {
                client.update_membership(kind, user_id, id, to).await
            }
            Step::Remove { id, .. } => match client.remove_membership(kind, user_id, id).await {
                Err(e) if e.is_not_found() => {
                    debug!(user_id = %user_id, id = %id, "Membership already gone");
                    Ok(())
                }
                other => other,
            },
        }
    }

    fn inverse(&self) -> Step {
        match self.clone() {
            Step::Add { id, role } => Step::Remove { id, role },
            Step::ChangeRole { id, from, to } => Step::ChangeRole { id, from: to, to: from },
            Step::Remove { id, role } => Step::Add { id, role },
        }
    }
}

/// Calls turning `prior` into `planned`: removals first, then role
/// changes, then additions.
fn plan_steps(prior: &MembershipState, planned: &MembershipState) -> Vec<Step> {
    let before = prior.roles();
    let after = planned.roles();

    let removes = before
        .iter()
        .filter(|(id, _)| !after.contains_key(*id))
        .map(|(id, role)| Step::Remove {
            id: id.to_string(),
            role: role.to_string(),
        });
    let changes = after.iter().filter_map(|(id, role)| match before.get(id) {
        Some(old) if old != role => Some(Step::ChangeRole {
            id: id.to_string(),
            from: old.to_string(),
            to: role.to_string(),
        }),
        _ => None,
    });
    let adds = after
        .iter()
        .filter(|(id, _)| !before.contains_key(*id))
        .map(|(id, role)| Step::Add {
            id: id.to_string(),
            role: role.to_string(),
        });

    removes.chain(changes).chain(adds).collect()
}

/// `fivetran_user_{connection,connector,group}_membership`.
pub struct MembershipResource {
    kind: MembershipKind,
}

impl MembershipResource {
    pub fn new(kind: MembershipKind) -> Self {
        Self { kind }
    }

    /// Name of the entry block in state. The legacy connector resource
    /// stores its entries under `connection` like the current one.
    fn block_name(&self) -> &'static str {
        match self.kind {
            MembershipKind::Connection | MembershipKind::Connector => "connection",
            MembershipKind::Group => "group",
        }
    }

    fn decode_state(&self, value: Value) -> Result<MembershipState, ProviderError> {
        let user_id = value
            .get("user_id")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Validation("user_id is required".to_string()))?
            .to_string();
        let entries = match value.get(self.block_name()) {
            None | Some(Value::Null) => Vec::new(),
            Some(entries) => decode(entries.clone())?,
        };
        Ok(MembershipState { user_id, entries })
    }

    fn encode_state(&self, state: &MembershipState) -> Result<Value, ProviderError> {
        let mut obj = Map::new();
        obj.insert("id".to_string(), Value::String(state.user_id.clone()));
        obj.insert("user_id".to_string(), Value::String(state.user_id.clone()));
        obj.insert(self.block_name().to_string(), serde_json::to_value(&state.entries)?);
        Ok(Value::Object(obj))
    }

    /// Run `steps` in order; on failure revert the finished ones.
    async fn execute(
        &self,
        ctx: &ProviderContext,
        user_id: &str,
        operation: &str,
        steps: Vec<Step>,
    ) -> Result<(), ProviderError> {
        let kind = self.kind;
        let client = &ctx.client;
        let mut saga = Saga::new(format!("{} for user {}", operation, user_id));

        for step in steps {
            let description = step.describe(kind);
            debug!(user_id = %user_id, step = %description, "Applying membership change");
            if let Err(e) = step.run(client, kind, user_id).await {
                return Err(saga.abort(&description, e.into()).await);
            }
            let undo = step.inverse();
            let user_id = user_id.to_string();
            saga.committed(description, move || {
                Box::pin(async move { undo.run(client, kind, &user_id).await })
            });
        }

        if !saga.is_empty() {
            info!(user_id = %user_id, changes = saga.len(), "{} complete", operation);
        }
        Ok(())
    }

    async fn upstream(
        &self,
        ctx: &ProviderContext,
        user_id: &str,
    ) -> Result<Option<Vec<MembershipEntry>>, ProviderError> {
        let memberships = found(ctx.client.list_memberships(self.kind, user_id).await)?;
        Ok(memberships.map(|items| {
            items
                .into_iter()
                .map(|m| MembershipEntry { id: m.id, role: m.role })
                .collect()
        }))
    }
}

#[async_trait::async_trait]
impl ResourceHandler for MembershipResource {
    fn type_name(&self) -> &'static str {
        match self.kind {
            MembershipKind::Connection => "fivetran_user_connection_membership",
            MembershipKind::Connector => "fivetran_user_connector_membership",
            MembershipKind::Group => "fivetran_user_group_membership",
        }
    }

    fn schema(&self) -> Schema {
        let noun = self.block_name();
        Schema::v0()
            .with_description(format!("Roles of one user on {}s", noun))
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("user_id", Attribute::required_string().with_force_new())
            .with_block(
                noun,
                NestedBlock::set(
                    Block::new()
                        .with_attribute(
                            "id",
                            Attribute::required_string()
                                .with_description(format!("The {} ID", noun)),
                        )
                        .with_attribute(
                            "role",
                            Attribute::required_string()
                                .with_description(format!("Role on the {}", noun)),
                        ),
                ),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let Some(entries) = config.get(self.block_name()).and_then(Value::as_array) else {
            return Vec::new();
        };
        let mut seen = BTreeSet::new();
        entries
            .iter()
            .filter_map(|e| e.get("id").and_then(Value::as_str))
            .filter(|id| !seen.insert(*id))
            .map(|id| {
                Diagnostic::error("Duplicate membership")
                    .with_detail(format!("{} {} is listed more than once", self.block_name(), id))
                    .with_attribute(self.block_name())
            })
            .collect()
    }

    async fn create(&self, ctx: &ProviderContext, planned: Value) -> Result<Value, ProviderError> {
        let planned = self.decode_state(planned)?;
        let empty = MembershipState {
            user_id: planned.user_id.clone(),
            entries: Vec::new(),
        };
        let steps = plan_steps(&empty, &planned);
        self.execute(ctx, &planned.user_id, "add memberships", steps).await?;
        self.encode_state(&planned)
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let state = self.decode_state(state)?;
        let Some(upstream) = self.upstream(ctx, &state.user_id).await? else {
            return Ok(None);
        };
        let upstream: BTreeMap<String, String> =
            upstream.into_iter().map(|e| (e.id, e.role)).collect();
        // Memberships managed elsewhere are not reported.
        let entries = state
            .entries
            .iter()
            .filter_map(|tracked| {
                upstream.get(&tracked.id).map(|role| MembershipEntry {
                    id: tracked.id.clone(),
                    role: role.clone(),
                })
            })
            .collect();
        Ok(Some(self.encode_state(&MembershipState {
            user_id: state.user_id,
            entries,
        })?))
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior = self.decode_state(prior)?;
        let planned = self.decode_state(planned)?;
        let steps = plan_steps(&prior, &planned);
        if steps.is_empty() {
            return self.encode_state(&prior);
        }
        self.execute(ctx, &planned.user_id, "update memberships", steps).await?;
        self.encode_state(&planned)
    }

    async fn delete(&self, ctx: &ProviderContext, state: Value) -> Result<(), ProviderError> {
        let state = self.decode_state(state)?;
        let steps = plan_steps(
            &state,
            &MembershipState {
                user_id: state.user_id.clone(),
                entries: Vec::new(),
            },
        );
        self.execute(ctx, &state.user_id, "remove memberships", steps).await
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError> {
        let entries = self
            .upstream(ctx, id)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("user {}", id)))?;
        self.encode_state(&MembershipState {
            user_id: id.to_string(),
            entries,
        })
    }

    fn upgrade_state(&self, _version: i64, mut state: Value) -> Result<Value, ProviderError> {
        if self.kind == MembershipKind::Connector {
            if let Some(obj) = state.as_object_mut() {
                if let Some(entries) = obj.remove("connector") {
                    obj.entry("connection").or_insert(entries);
                }
            }
        }
        Ok(state)
    }
}
