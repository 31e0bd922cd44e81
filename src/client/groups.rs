use super::models::{Group, GroupRequest};
use super::{FivetranClient, FivetranError};

impl FivetranClient {
    pub async fn create_group(&self, name: &str) -> Result<Group, FivetranError> {
        let body = GroupRequest {
            name: name.to_string(),
        };
        self.post("/groups", &body, "group").await
    }

    pub async fn get_group(&self, group_id: &str) -> Result<Group, FivetranError> {
        self.get(&format!("/groups/{}", group_id), "group").await
    }

    pub async fn update_group(&self, group_id: &str, name: &str) -> Result<Group, FivetranError> {
        let body = GroupRequest {
            name: name.to_string(),
        };
        self.patch(&format!("/groups/{}", group_id), &body, "group")
            .await
    }

    pub async fn delete_group(&self, group_id: &str) -> Result<(), FivetranError> {
        self.delete(&format!("/groups/{}", group_id), "group").await
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, FivetranError> {
        self.list_all("/groups", "group list").await
    }
}
