//! Storage API tokens.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Not;

use super::to_object;
use crate::client::Client;

/// Token settings for create and update. Unset fields are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Bucket id to `read` or `write`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bucket_permissions: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Not::not")]
    pub can_manage_buckets: bool,
    #[serde(skip_serializing_if = "Not::not")]
    pub can_read_all_file_uploads: bool,
    #[serde(skip_serializing_if = "Not::not")]
    pub can_purge_trash: bool,
    /// Lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub component_access: Vec<String>,
}

impl Client {
    /// Details of the token the client authenticates with.
    #[tracing::instrument(skip(self))]
    pub async fn verify_token(&self) -> Result<Value> {
        self.api_get("tokens/verify").await
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn create_token(&self, options: &TokenOptions) -> Result<Value> {
        self.api_post("tokens", Some(&Value::Object(to_object(options)?)))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_token(&self, token_id: &str) -> Result<Value> {
        self.api_get(&format!("tokens/{}", token_id)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_tokens(&self) -> Result<Value> {
        self.api_get("tokens").await
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn update_token(&self, token_id: &str, options: &TokenOptions) -> Result<Value> {
        self.api_put(
            &format!("tokens/{}", token_id),
            Some(&Value::Object(to_object(options)?)),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn drop_token(&self, token_id: &str) -> Result<()> {
        self.api_delete(&format!("tokens/{}", token_id)).await?;
        Ok(())
    }

    /// Issues a new secret for the token; the old one stops working.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_token(&self, token_id: &str) -> Result<Value> {
        self.api_post(&format!("tokens/{}/refresh", token_id), None)
            .await
    }
}
