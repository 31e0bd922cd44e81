use super::models::{
    SchemaConfig, SchemaConfigPatch, SchemaPatch, SchemaReloadRequest, TablePatch,
};
use super::{FivetranClient, FivetranError};

impl FivetranClient {
    pub async fn get_schema_config(
        &self,
        connection_id: &str,
    ) -> Result<SchemaConfig, FivetranError> {
        self.get(
            &format!("/connections/{}/schemas", connection_id),
            "schema config",
        )
        .await
    }

    /// Ask Fivetran to rediscover the source schema, keeping existing
    /// enable/disable choices.
    pub async fn reload_schema_config(
        &self,
        connection_id: &str,
    ) -> Result<SchemaConfig, FivetranError> {
        let body = SchemaReloadRequest {
            exclude_mode: "PRESERVE".to_string(),
        };
        self.post(
            &format!("/connections/{}/schemas/reload", connection_id),
            &body,
            "schema config",
        )
        .await
    }

    pub async fn update_schema_config(
        &self,
        connection_id: &str,
        patch: &SchemaConfigPatch,
    ) -> Result<SchemaConfig, FivetranError> {
        self.patch(
            &format!("/connections/{}/schemas", connection_id),
            patch,
            "schema config",
        )
        .await
    }

    pub async fn update_schema(
        &self,
        connection_id: &str,
        schema: &str,
        patch: &SchemaPatch,
    ) -> Result<(), FivetranError> {
        self.patch::<_, serde_json::Value>(
            &format!(
                "/connections/{}/schemas/{}",
                connection_id,
                urlencoding::encode(schema)
            ),
            patch,
            "schema config",
        )
        .await
        .map(|_| ())
    }

    pub async fn update_table(
        &self,
        connection_id: &str,
        schema: &str,
        table: &str,
        patch: &TablePatch,
    ) -> Result<(), FivetranError> {
        self.patch::<_, serde_json::Value>(
            &format!(
                "/connections/{}/schemas/{}/tables/{}",
                connection_id,
                urlencoding::encode(schema),
                urlencoding::encode(table)
            ),
            patch,
            "schema config",
        )
        .await
        .map(|_| ())
    }
}
