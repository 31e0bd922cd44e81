//! Drift-tolerant reconciliation of schema / table / column enable flags.
//!
//! The user never lists every schema, table or column. Instead the
//! connection's schema change handling policy fixes a default state and the
//! user declares the exceptions to it:
//!
//! * `ALLOW_ALL`: items are enabled unless listed (a "disabled" set).
//! * `BLOCK_ALL`, `ALLOW_COLUMNS`: items are disabled unless listed (an
//!   "enabled" set).
//!
//! Items that appear upstream later follow the default and therefore never
//! show up as drift.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::ProviderError;

/// Policy for newly discovered source schema elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaChangeHandling {
    AllowAll,
    AllowColumns,
    BlockAll,
}

impl SchemaChangeHandling {
    pub const ALL: [SchemaChangeHandling; 3] = [
        SchemaChangeHandling::AllowAll,
        SchemaChangeHandling::AllowColumns,
        SchemaChangeHandling::BlockAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaChangeHandling::AllowAll => "ALLOW_ALL",
            SchemaChangeHandling::AllowColumns => "ALLOW_COLUMNS",
            SchemaChangeHandling::BlockAll => "BLOCK_ALL",
        }
    }

    /// State an item takes when the user does not mention it.
    pub fn enabled_by_default(&self) -> bool {
        matches!(self, SchemaChangeHandling::AllowAll)
    }

    /// Name of the exception set that is valid under this policy.
    pub fn exception_kind(&self) -> ExceptionKind {
        if self.enabled_by_default() {
            ExceptionKind::Disabled
        } else {
            ExceptionKind::Enabled
        }
    }
}

impl fmt::Display for SchemaChangeHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaChangeHandling {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALLOW_ALL" => Ok(SchemaChangeHandling::AllowAll),
            "ALLOW_COLUMNS" => Ok(SchemaChangeHandling::AllowColumns),
            "BLOCK_ALL" => Ok(SchemaChangeHandling::BlockAll),
            other => Err(ProviderError::Validation(format!(
                "schema_change_handling must be one of ALLOW_ALL, ALLOW_COLUMNS, BLOCK_ALL, got '{}'",
                other
            ))),
        }
    }
}

/// Which of the two mutually exclusive sets carries the exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    Disabled,
    Enabled,
}

impl ExceptionKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ExceptionKind::Disabled => "disabled",
            ExceptionKind::Enabled => "enabled",
        }
    }
}

/// Pick the exception set out of a `disabled_*` / `enabled_*` pair.
///
/// Both being set is a misconfiguration; so is using the set that does not
/// match the policy.
pub fn select_exceptions(
    policy: SchemaChangeHandling,
    noun: &str,
    disabled: Option<&BTreeSet<String>>,
    enabled: Option<&BTreeSet<String>>,
) -> Result<BTreeSet<String>, ProviderError> {
    match (disabled, enabled) {
        (Some(_), Some(_)) => Err(ProviderError::Validation(format!(
            "disabled_{noun} and enabled_{noun} are mutually exclusive"
        ))),
        (Some(_), None) if !policy.enabled_by_default() => Err(ProviderError::Validation(format!(
            "disabled_{noun} can only be used with ALLOW_ALL; use enabled_{noun} with {policy}"
        ))),
        (None, Some(_)) if policy.enabled_by_default() => Err(ProviderError::Validation(format!(
            "enabled_{noun} cannot be used with ALLOW_ALL; use disabled_{noun}"
        ))),
        (Some(set), None) | (None, Some(set)) => Ok(set.clone()),
        (None, None) => Ok(BTreeSet::new()),
    }
}

/// Desired enabled state of one item.
pub fn desired_enabled(
    policy: SchemaChangeHandling,
    exceptions: &BTreeSet<String>,
    name: &str,
) -> bool {
    policy.enabled_by_default() != exceptions.contains(name)
}

/// Items whose desired state differs from the observed one, mapped to the
/// state they must be patched to. Nothing else belongs in the PATCH.
pub fn reconcile<'a, I>(
    policy: SchemaChangeHandling,
    exceptions: &BTreeSet<String>,
    observed: I,
) -> BTreeMap<String, bool>
where
    I: IntoIterator<Item = (&'a String, bool)>,
{
    observed
        .into_iter()
        .filter_map(|(name, enabled)| {
            let desired = desired_enabled(policy, exceptions, name);
            (desired != enabled).then(|| (name.clone(), desired))
        })
        .collect()
}

/// Exceptions as observed upstream: the items whose state differs from the
/// policy default.
pub fn observed_exceptions<'a, I>(policy: SchemaChangeHandling, observed: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = (&'a String, bool)>,
{
    observed
        .into_iter()
        .filter(|(_, enabled)| *enabled != policy.enabled_by_default())
        .map(|(name, _)| name.clone())
        .collect()
}

/// Order a reported set so that it does not churn between reads: entries
/// already in `prior` keep their position, new entries are appended in
/// lexicographic order.
pub fn stabilize_order(prior: &[String], current: &BTreeSet<String>) -> Vec<String> {
    let mut ordered: Vec<String> = prior
        .iter()
        .filter(|name| current.contains(*name))
        .cloned()
        .collect();
    let seen: HashSet<&String> = ordered.iter().collect();
    let appended: Vec<String> = current
        .iter()
        .filter(|name| !seen.contains(name))
        .cloned()
        .collect();
    ordered.extend(appended);
    ordered
}
