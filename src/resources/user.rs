//! `fivetran_user`: account users and their account-level role.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{found, ignore_not_found, ProviderContext, ResourceHandler};
use crate::client::models::{User, UserCreateRequest, UserUpdateRequest};
use crate::core::values::{changed, changed_or_cleared, decode, non_empty};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct UserState {
    #[serde(default)]
    pub id: Option<String>,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub invited: Option<bool>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub logged_in_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl UserState {
    pub(crate) fn from_api(user: User, prior: Option<&UserState>) -> Self {
        Self {
            id: Some(user.id),
            email: user.email,
            given_name: user.given_name.unwrap_or_default(),
            family_name: user.family_name.unwrap_or_default(),
            phone: non_empty(user.phone),
            picture: non_empty(user.picture),
            // The API reports the effective role even when none was set;
            // keep it unset in state unless the user manages it.
            role: match prior {
                Some(prior) if prior.role.is_none() => None,
                _ => non_empty(user.role),
            },
            invited: user.invited,
            verified: user.verified,
            logged_in_at: user.logged_in_at,
            created_at: user.created_at,
        }
    }

    fn id(&self) -> Result<&str, ProviderError> {
        self.id
            .as_deref()
            .ok_or_else(|| ProviderError::Validation("user state has no id".to_string()))
    }
}

fn update_request(prior: &UserState, planned: &UserState) -> UserUpdateRequest {
    UserUpdateRequest {
        given_name: changed(&prior.given_name, &planned.given_name),
        family_name: changed(&prior.family_name, &planned.family_name),
        phone: changed_or_cleared(&prior.phone, &planned.phone),
        picture: changed_or_cleared(&prior.picture, &planned.picture),
        role: changed(&prior.role, &planned.role).flatten(),
    }
}

/// `fivetran_user`: an account user, invited by email.
pub struct UserResource;

#[async_trait::async_trait]
impl ResourceHandler for UserResource {
    fn type_name(&self) -> &'static str {
        "fivetran_user"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A Fivetran account user")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "email",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Email address; changing it invites a new user"),
            )
            .with_attribute("given_name", Attribute::required_string())
            .with_attribute("family_name", Attribute::required_string())
            .with_attribute("phone", Attribute::optional_string())
            .with_attribute(
                "picture",
                Attribute::optional_string().with_description("URL of the avatar"),
            )
            .with_attribute(
                "role",
                Attribute::optional_string()
                    .with_description("Account role, e.g. Account Administrator"),
            )
            .with_attribute("invited", Attribute::computed_bool())
            .with_attribute("verified", Attribute::computed_bool())
            .with_attribute("logged_in_at", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string())
    }

    async fn create(&self, ctx: &ProviderContext, planned: Value) -> Result<Value, ProviderError> {
        let planned: UserState = decode(planned)?;
        let request = UserCreateRequest {
            email: planned.email.clone(),
            given_name: planned.given_name.clone(),
            family_name: planned.family_name.clone(),
            phone: planned.phone.clone(),
            picture: planned.picture.clone(),
            role: planned.role.clone(),
        };
        let user = ctx.client.create_user(&request).await?;
        Ok(serde_json::to_value(UserState::from_api(user, Some(&planned)))?)
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let state: UserState = decode(state)?;
        match found(ctx.client.get_user(state.id()?).await)? {
            Some(user) => Ok(Some(serde_json::to_value(UserState::from_api(user, Some(&state)))?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior: UserState = decode(prior)?;
        let planned: UserState = decode(planned)?;

        let request = update_request(&prior, &planned);
        if request.is_empty() {
            return Ok(serde_json::to_value(prior)?);
        }
        let user = ctx.client.update_user(prior.id()?, &request).await?;
        Ok(serde_json::to_value(UserState::from_api(user, Some(&planned)))?)
    }

    async fn delete(&self, ctx: &ProviderContext, state: Value) -> Result<(), ProviderError> {
        let state: UserState = decode(state)?;
        ignore_not_found(ctx.client.delete_user(state.id()?).await)
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError> {
        let user = ctx.client.get_user(id).await?;
        Ok(serde_json::to_value(UserState::from_api(user, None))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn john() -> UserState {
        UserState {
            id: Some("user_id".into()),
            email: "john@example.com".into(),
            given_name: "John".into(),
            family_name: "Black".into(),
            phone: Some("+123456789".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_update_request_only_changed_fields() {
        let prior = john();
        let mut planned = john();
        planned.family_name = "White".into();
        planned.phone = None;

        let request = update_request(&prior, &planned);
        assert_eq!(request.family_name.as_deref(), Some("White"));
        assert_eq!(request.phone.as_deref(), Some(""));
        assert!(request.given_name.is_none());
        assert!(request.role.is_none());

        assert!(update_request(&prior, &prior).is_empty());
    }

    #[test]
    fn test_unmanaged_role_stays_unset() {
        let user = User {
            id: "user_id".into(),
            email: "john@example.com".into(),
            given_name: Some("John".into()),
            family_name: Some("Black".into()),
            verified: Some(true),
            invited: Some(false),
            picture: None,
            phone: Some(String::new()),
            role: Some("Account Reviewer".into()),
            logged_in_at: None,
            created_at: None,
        };
        let mut prior = john();
        prior.phone = None;
        let state = UserState::from_api(user.clone(), Some(&prior));
        assert!(state.role.is_none());
        assert!(state.phone.is_none());

        let imported = UserState::from_api(user, None);
        assert_eq!(imported.role.as_deref(), Some("Account Reviewer"));
    }
}
