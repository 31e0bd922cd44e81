use super::models::{Webhook, WebhookRequest};
use super::{FivetranClient, FivetranError};

impl FivetranClient {
    pub async fn create_account_webhook(
        &self,
        request: &WebhookRequest,
    ) -> Result<Webhook, FivetranError> {
        self.post("/webhooks/account", request, "webhook").await
    }

    pub async fn create_group_webhook(
        &self,
        group_id: &str,
        request: &WebhookRequest,
    ) -> Result<Webhook, FivetranError> {
        self.post(&format!("/webhooks/group/{}", group_id), request, "webhook")
            .await
    }

    pub async fn get_webhook(&self, webhook_id: &str) -> Result<Webhook, FivetranError> {
        self.get(&format!("/webhooks/{}", webhook_id), "webhook")
            .await
    }

    pub async fn update_webhook(
        &self,
        webhook_id: &str,
        request: &WebhookRequest,
    ) -> Result<Webhook, FivetranError> {
        self.patch(&format!("/webhooks/{}", webhook_id), request, "webhook")
            .await
    }

    pub async fn delete_webhook(&self, webhook_id: &str) -> Result<(), FivetranError> {
        self.delete(&format!("/webhooks/{}", webhook_id), "webhook")
            .await
    }
}
