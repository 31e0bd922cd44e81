//! Plumbing shared by the schema, table and column config resources.

use std::collections::BTreeSet;

use tracing::info;

use super::ProviderContext;
use crate::client::models::SchemaConfig;
use crate::client::FivetranError;
use crate::core::reconcile::{observed_exceptions, stabilize_order, ExceptionKind};
use crate::core::SchemaChangeHandling;
use crate::error::ProviderError;

/// Fetch a connection's schema config, asking Fivetran to discover the
/// source schema first when it has never been loaded.
pub(super) async fn load_or_reload(
    ctx: &ProviderContext,
    connection_id: &str,
) -> Result<SchemaConfig, FivetranError> {
    match ctx.client.get_schema_config(connection_id).await {
        Err(e) if e.is_not_found() => {
            info!(connection_id = %connection_id, "Schema config not loaded yet, reloading");
            ctx.client.reload_schema_config(connection_id).await
        }
        other => other,
    }
}

/// Upstream policy of a schema config; unset means `ALLOW_ALL`.
pub(super) fn policy_of(config: &SchemaConfig) -> Result<SchemaChangeHandling, ProviderError> {
    config
        .schema_change_handling
        .as_deref()
        .map_or(Ok(SchemaChangeHandling::AllowAll), str::parse)
}

/// The pair of exception sets to report in state.
///
/// The observed exceptions go into the set matching the policy, ordered
/// after the prior state. `missing` names were declared but do not exist
/// upstream; they are kept so they do not show up as drift. An empty set
/// the user never wrote is reported as unset.
pub(super) fn report_exceptions<'a, I>(
    policy: SchemaChangeHandling,
    observed: I,
    missing: &BTreeSet<String>,
    prior_disabled: Option<&[String]>,
    prior_enabled: Option<&[String]>,
) -> (Option<Vec<String>>, Option<Vec<String>>)
where
    I: IntoIterator<Item = (&'a String, bool)>,
{
    let mut current = observed_exceptions(policy, observed);
    current.extend(missing.iter().cloned());

    let (prior, was_set) = match policy.exception_kind() {
        ExceptionKind::Disabled => (prior_disabled, prior_disabled.is_some()),
        ExceptionKind::Enabled => (prior_enabled, prior_enabled.is_some()),
    };
    let reported = if current.is_empty() && !was_set {
        None
    } else {
        Some(stabilize_order(prior.unwrap_or_default(), &current))
    };

    match policy.exception_kind() {
        ExceptionKind::Disabled => (reported, None),
        ExceptionKind::Enabled => (None, reported),
    }
}

/// Convert an optional list from state into a set.
pub(super) fn to_set(list: &Option<Vec<String>>) -> Option<BTreeSet<String>> {
    list.as_ref().map(|items| items.iter().cloned().collect())
}
