use super::models::{Connection, ConnectionRequest};
use super::{FivetranClient, FivetranError};

impl FivetranClient {
    pub async fn create_connection(
        &self,
        request: &ConnectionRequest,
    ) -> Result<Connection, FivetranError> {
        self.post("/connections", request, "connection").await
    }

    pub async fn get_connection(&self, connection_id: &str) -> Result<Connection, FivetranError> {
        self.get(&format!("/connections/{}", connection_id), "connection")
            .await
    }

    pub async fn update_connection(
        &self,
        connection_id: &str,
        request: &ConnectionRequest,
    ) -> Result<Connection, FivetranError> {
        self.patch(
            &format!("/connections/{}", connection_id),
            request,
            "connection",
        )
        .await
    }

    pub async fn delete_connection(&self, connection_id: &str) -> Result<(), FivetranError> {
        self.delete(&format!("/connections/{}", connection_id), "connection")
            .await
    }
}
