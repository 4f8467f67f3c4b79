//! Workspaces: sandboxed backend schemas for transformations.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use super::{Query, to_object};
use crate::client::{Client, RequestOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceOptions {
    /// `snowflake`, `synapse`, `redshift`, ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_storage_access: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteWorkspaceOptions {
    /// Overrides the `is_async` argument of
    /// [`Client::delete_workspace`] when set.
    pub is_async: Option<bool>,
    pub skip_backend_deletion: Option<bool>,
}

impl Client {
    /// Creates a workspace. Provisioning can take minutes, so the request
    /// uses the extended timeout.
    #[tracing::instrument(skip(self, options))]
    pub async fn create_workspace(
        &self,
        options: &CreateWorkspaceOptions,
        is_async: bool,
    ) -> Result<Value> {
        let mut query = Query::new();
        if is_async {
            query = query.push_flag("async", true);
        }
        self.api_post_with_options(
            &query.append_to("workspaces"),
            Some(&Value::Object(to_object(options)?)),
            RequestOptions::extended(),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_workspaces(&self) -> Result<Value> {
        self.api_get("workspaces").await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_workspace(&self, workspace_id: u64) -> Result<Value> {
        self.api_get(&format!("workspaces/{}", workspace_id)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_workspace(
        &self,
        workspace_id: u64,
        options: DeleteWorkspaceOptions,
        is_async: bool,
    ) -> Result<()> {
        let mut query = Query::new().push_flag("async", options.is_async.unwrap_or(is_async));
        if let Some(skip) = options.skip_backend_deletion {
            query = query.push_flag("skipBackendDeletion", skip);
        }
        self.api_delete(&query.append_to(&format!("workspaces/{}", workspace_id)))
            .await?;
        Ok(())
    }

    /// Loads tables into the workspace. `options` carries `input` mappings
    /// and an optional `preserve` flag.
    #[tracing::instrument(skip(self, options))]
    pub async fn load_workspace_data(&self, workspace_id: u64, options: &Value) -> Result<Value> {
        self.api_post(&format!("workspaces/{}/load", workspace_id), Some(options))
            .await
    }

    /// Like [`Client::load_workspace_data`] but clones tables instead of
    /// copying them.
    #[tracing::instrument(skip(self, options))]
    pub async fn clone_into_workspace(&self, workspace_id: u64, options: &Value) -> Result<Value> {
        self.api_post(
            &format!("workspaces/{}/load-clone", workspace_id),
            Some(options),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reset_workspace_password(&self, workspace_id: u64) -> Result<Value> {
        self.api_post(&format!("workspaces/{}/password", workspace_id), None)
            .await
    }
}
