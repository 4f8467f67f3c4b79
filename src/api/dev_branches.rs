//! Development branches. Branch management is project-wide, so these calls
//! ignore the client's own branch.

use anyhow::Result;
use log::info;
use serde_json::{Map, Value, json};

use super::insert_opt;
use crate::client::Client;

impl Client {
    #[tracing::instrument(skip(self))]
    pub async fn list_branches(&self) -> Result<Value> {
        self.api_get(&self.global_url("dev-branches")).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_branch(&self, branch_id: u64) -> Result<Value> {
        self.api_get(&self.global_url(&format!("dev-branches/{}", branch_id)))
            .await
    }

    /// Creates a branch and waits for the creation job. Returns the branch.
    #[tracing::instrument(skip(self))]
    pub async fn create_branch(&self, name: &str, description: Option<&str>) -> Result<Value> {
        let mut body = Map::new();
        body.insert("name".into(), json!(name));
        insert_opt(&mut body, "description", description);

        let branch = self
            .api_post(&self.global_url("dev-branches"), Some(&Value::Object(body)))
            .await?;
        info!("Created branch {}", branch["id"]);
        Ok(branch)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_branch(
        &self,
        branch_id: u64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Value> {
        let mut body = Map::new();
        insert_opt(&mut body, "name", name);
        insert_opt(&mut body, "description", description);
        self.api_put(
            &self.global_url(&format!("dev-branches/{}", branch_id)),
            Some(&Value::Object(body)),
        )
        .await
    }

    /// Deletes a branch and waits for the deletion job.
    #[tracing::instrument(skip(self))]
    pub async fn delete_branch(&self, branch_id: u64) -> Result<()> {
        self.api_delete(&self.global_url(&format!("dev-branches/{}", branch_id)))
            .await?;
        Ok(())
    }
}
