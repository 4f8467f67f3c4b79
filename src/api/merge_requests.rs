//! Merge requests between a development branch and the default branch.

use anyhow::Result;
use serde_json::Value;

use super::result_id;
use crate::client::Client;
use crate::error::ClientError;

impl Client {
    /// Opens a merge request and returns its id. `request` carries
    /// `branchFromId`, `branchIntoId`, `title` and `description`.
    #[tracing::instrument(skip(self, request))]
    pub async fn create_merge_request(&self, request: &Value) -> Result<u64> {
        let created = self
            .api_post(&self.global_url("merge-request"), Some(request))
            .await?;
        let id = result_id(&created)?;
        id.parse()
            .map_err(|_| ClientError::new(format!("Invalid merge request id: {}", id)).into())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_merge_request(&self, merge_request_id: u64) -> Result<Value> {
        self.api_get(&self.global_url(&format!("merge-request/{}", merge_request_id)))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_merge_requests(&self) -> Result<Value> {
        self.api_get(&self.global_url("merge-request")).await
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn update_merge_request(&self, merge_request_id: u64, request: &Value) -> Result<Value> {
        self.api_put(
            &self.global_url(&format!("merge-request/{}", merge_request_id)),
            Some(request),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn merge_request_put_to_review(&self, merge_request_id: u64) -> Result<Value> {
        self.transition(merge_request_id, "request-review").await
    }

    #[tracing::instrument(skip(self))]
    pub async fn merge_request_add_approval(&self, merge_request_id: u64) -> Result<Value> {
        self.transition(merge_request_id, "approve").await
    }

    /// Sends the request back to development and drops its approvals.
    #[tracing::instrument(skip(self))]
    pub async fn merge_request_reject_review(&self, merge_request_id: u64) -> Result<Value> {
        self.transition(merge_request_id, "reject").await
    }

    #[tracing::instrument(skip(self))]
    pub async fn merge_request_cancel(&self, merge_request_id: u64) -> Result<Value> {
        self.transition(merge_request_id, "cancel").await
    }

    /// Merges an approved request into the default branch.
    #[tracing::instrument(skip(self))]
    pub async fn merge_request_merge(&self, merge_request_id: u64) -> Result<Value> {
        self.transition(merge_request_id, "merge").await
    }

    async fn transition(&self, merge_request_id: u64, action: &str) -> Result<Value> {
        self.api_put(
            &self.global_url(&format!("merge-request/{}/{}", merge_request_id, action)),
            None,
        )
        .await
    }
}
