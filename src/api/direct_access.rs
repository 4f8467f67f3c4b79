//! Direct backend access credentials.

use anyhow::Result;
use serde_json::Value;

use crate::client::Client;

impl Client {
    #[tracing::instrument(skip(self))]
    pub async fn create_direct_access_credentials(&self, backend: &str) -> Result<Value> {
        self.api_post(&format!("direct-access/{}", backend), None)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_direct_access_credentials(&self, backend: &str) -> Result<Value> {
        self.api_get(&format!("direct-access/{}", backend)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_direct_access_credentials(&self, backend: &str) -> Result<()> {
        self.api_delete(&format!("direct-access/{}", backend))
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn reset_direct_access_password(&self, backend: &str) -> Result<Value> {
        self.api_post(&format!("direct-access/{}/reset-password", backend), None)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn enable_direct_access_for_bucket(&self, bucket_id: &str) -> Result<Value> {
        self.api_post(&format!("buckets/{}/direct-access", bucket_id), None)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn disable_direct_access_for_bucket(&self, bucket_id: &str) -> Result<Value> {
        self.api_delete(&format!("buckets/{}/direct-access", bucket_id))
            .await
    }
}
