use super::models::{Destination, DestinationRequest};
use super::{FivetranClient, FivetranError};

impl FivetranClient {
    pub async fn create_destination(
        &self,
        request: &DestinationRequest,
    ) -> Result<Destination, FivetranError> {
        self.post("/destinations", request, "destination").await
    }

    pub async fn get_destination(
        &self,
        destination_id: &str,
    ) -> Result<Destination, FivetranError> {
        self.get(&format!("/destinations/{}", destination_id), "destination")
            .await
    }

    pub async fn update_destination(
        &self,
        destination_id: &str,
        request: &DestinationRequest,
    ) -> Result<Destination, FivetranError> {
        self.patch(
            &format!("/destinations/{}", destination_id),
            request,
            "destination",
        )
        .await
    }

    pub async fn delete_destination(&self, destination_id: &str) -> Result<(), FivetranError> {
        self.delete(&format!("/destinations/{}", destination_id), "destination")
            .await
    }
}
