use anyhow::Result;
use log::info;
use serde_json::json;

use super::{Config, print_json};
use crate::api::{CreateWorkspaceOptions, DeleteWorkspaceOptions};

#[tracing::instrument(skip(config))]
pub async fn list(config: &Config) -> Result<()> {
    let workspaces = config.client.list_workspaces().await?;
    print_json(&workspaces)
}

#[tracing::instrument(skip(config))]
pub async fn create(config: &Config, backend: Option<String>) -> Result<()> {
    let workspace = config
        .client
        .create_workspace(
            &CreateWorkspaceOptions {
                backend,
                ..CreateWorkspaceOptions::default()
            },
            true,
        )
        .await?;
    print_json(&workspace)
}

#[tracing::instrument(skip(config))]
pub async fn delete(config: &Config, workspace_id: u64) -> Result<()> {
    config
        .client
        .delete_workspace(workspace_id, DeleteWorkspaceOptions::default(), true)
        .await?;
    info!("Deleted workspace {}", workspace_id);
    print_json(&json!({ "id": workspace_id, "deleted": true }))
}
