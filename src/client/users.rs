use super::models::{
    Membership, MembershipCreateRequest, MembershipUpdateRequest, User, UserCreateRequest,
    UserUpdateRequest,
};
use super::{FivetranClient, FivetranError};

/// The object side of a user membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipKind {
    Connection,
    /// Legacy name of connections; kept for older configurations.
    Connector,
    Group,
}

impl MembershipKind {
    fn segment(&self) -> &'static str {
        match self {
            MembershipKind::Connection => "connections",
            MembershipKind::Connector => "connectors",
            MembershipKind::Group => "groups",
        }
    }

    pub fn noun(&self) -> &'static str {
        match self {
            MembershipKind::Connection => "connection",
            MembershipKind::Connector => "connector",
            MembershipKind::Group => "group",
        }
    }
}

impl FivetranClient {
    pub async fn create_user(&self, request: &UserCreateRequest) -> Result<User, FivetranError> {
        self.post("/users", request, "user").await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, FivetranError> {
        self.get(&format!("/users/{}", user_id), "user").await
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        request: &UserUpdateRequest,
    ) -> Result<User, FivetranError> {
        self.patch(&format!("/users/{}", user_id), request, "user")
            .await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), FivetranError> {
        self.delete(&format!("/users/{}", user_id), "user").await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, FivetranError> {
        self.list_all("/users", "user list").await
    }

    pub async fn list_memberships(
        &self,
        kind: MembershipKind,
        user_id: &str,
    ) -> Result<Vec<Membership>, FivetranError> {
        self.list_all(
            &format!("/users/{}/{}", user_id, kind.segment()),
            "membership list",
        )
        .await
    }

    pub async fn add_membership(
        &self,
        kind: MembershipKind,
        user_id: &str,
        object_id: &str,
        role: &str,
    ) -> Result<(), FivetranError> {
        let body = MembershipCreateRequest {
            id: object_id.to_string(),
            role: role.to_string(),
        };
        self.post::<_, serde_json::Value>(
            &format!("/users/{}/{}", user_id, kind.segment()),
            &body,
            "membership",
        )
        .await
        .map(|_| ())
    }

    pub async fn update_membership(
        &self,
        kind: MembershipKind,
        user_id: &str,
        object_id: &str,
        role: &str,
    ) -> Result<(), FivetranError> {
        let body = MembershipUpdateRequest {
            role: role.to_string(),
        };
        self.patch::<_, serde_json::Value>(
            &format!("/users/{}/{}/{}", user_id, kind.segment(), object_id),
            &body,
            "membership",
        )
        .await
        .map(|_| ())
    }

    pub async fn remove_membership(
        &self,
        kind: MembershipKind,
        user_id: &str,
        object_id: &str,
    ) -> Result<(), FivetranError> {
        self.delete(
            &format!("/users/{}/{}/{}", user_id, kind.segment(), object_id),
            "membership",
        )
        .await
    }
}
