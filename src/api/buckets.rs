//! Buckets, bucket attributes and bucket sharing.

use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{Query, insert_opt, result_id};
use crate::client::Client;
use crate::error::client_error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropBucketOptions {
    /// Drop the bucket together with its tables.
    pub force: bool,
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketAttribute {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub protected: bool,
}

impl Client {
    /// `include` is a comma separated list such as `attributes,metadata`.
    #[tracing::instrument(skip(self))]
    pub async fn list_buckets(&self, include: Option<&str>) -> Result<Value> {
        let path = Query::new().push_opt("include", include).append_to("buckets");
        self.api_get(&path).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_bucket(&self, bucket_id: &str) -> Result<Value> {
        self.api_get(&format!("buckets/{}", bucket_id)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn bucket_exists(&self, bucket_id: &str) -> Result<bool> {
        match self.get_bucket(bucket_id).await {
            Ok(_) => Ok(true),
            Err(e) if client_error(&e).is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Creates a bucket and returns its id, e.g. `in.c-main`.
    #[tracing::instrument(skip(self))]
    pub async fn create_bucket(
        &self,
        name: &str,
        stage: &str,
        description: Option<&str>,
        backend: Option<&str>,
    ) -> Result<String> {
        let mut body = Map::new();
        body.insert("name".into(), json!(name));
        body.insert("stage".into(), json!(stage));
        insert_opt(&mut body, "description", description);
        insert_opt(&mut body, "backend", backend);

        let bucket = self.api_post("buckets", Some(&Value::Object(body))).await?;
        let id = result_id(&bucket)?;
        info!("Created bucket {}", id);
        Ok(id)
    }

    #[tracing::instrument(skip(self))]
    pub async fn drop_bucket(&self, bucket_id: &str, options: DropBucketOptions) -> Result<()> {
        let mut query = Query::new();
        if options.force {
            query = query.push_flag("force", true);
        }
        if options.is_async {
            query = query.push_flag("async", true);
        }
        self.api_delete(&query.append_to(&format!("buckets/{}", bucket_id)))
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, value))]
    pub async fn set_bucket_attribute(
        &self,
        bucket_id: &str,
        key: &str,
        value: &str,
        protected: Option<bool>,
    ) -> Result<Value> {
        let mut body = Map::new();
        body.insert("value".into(), json!(value));
        insert_opt(&mut body, "protected", protected);
        self.api_post(
            &format!("buckets/{}/attributes/{}", bucket_id, key),
            Some(&Value::Object(body)),
        )
        .await
    }

    /// Replaces every attribute of the bucket.
    #[tracing::instrument(skip(self, attributes))]
    pub async fn replace_bucket_attributes(
        &self,
        bucket_id: &str,
        attributes: &[BucketAttribute],
    ) -> Result<Value> {
        self.api_post(
            &format!("buckets/{}/attributes", bucket_id),
            Some(&json!({ "attributes": attributes })),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_bucket_attribute(&self, bucket_id: &str, key: &str) -> Result<()> {
        self.api_delete(&format!("buckets/{}/attributes/{}", bucket_id, key))
            .await?;
        Ok(())
    }

    /// Shares a bucket with the given sharing type (`organization`,
    /// `organization-project`, ...).
    #[tracing::instrument(skip(self))]
    pub async fn share_bucket(&self, bucket_id: &str, sharing: Option<&str>) -> Result<Value> {
        let path = Query::new()
            .push_opt("sharing", sharing)
            .append_to(&format!("buckets/{}/share", bucket_id));
        self.api_post(&path, None).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn share_organization_bucket(&self, bucket_id: &str) -> Result<Value> {
        self.api_post(&format!("buckets/{}/share-organization", bucket_id), None)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn share_organization_project_bucket(&self, bucket_id: &str) -> Result<Value> {
        self.api_post(
            &format!("buckets/{}/share-organization-project", bucket_id),
            None,
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn share_bucket_to_projects(
        &self,
        bucket_id: &str,
        project_ids: &[u64],
    ) -> Result<Value> {
        self.api_post(
            &format!("buckets/{}/share-to-projects", bucket_id),
            Some(&json!({ "targetProjectIds": project_ids })),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn share_bucket_to_users(&self, bucket_id: &str, user_ids: &[u64]) -> Result<Value> {
        self.api_post(
            &format!("buckets/{}/share-to-users", bucket_id),
            Some(&json!({ "targetUsers": user_ids })),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn unshare_bucket(&self, bucket_id: &str) -> Result<()> {
        self.api_delete(&format!("buckets/{}/share", bucket_id))
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn is_shared_bucket(&self, bucket_id: &str) -> Result<bool> {
        let bucket = self.get_bucket(bucket_id).await?;
        Ok(bucket.get("sharing").is_some_and(|sharing| !sharing.is_null()))
    }

    /// Buckets shared with the current project.
    #[tracing::instrument(skip(self))]
    pub async fn list_shared_buckets(&self) -> Result<Value> {
        self.api_get("shared-buckets").await
    }

    /// Links a bucket shared by another project and returns the id of the
    /// linked bucket.
    #[tracing::instrument(skip(self))]
    pub async fn link_bucket(
        &self,
        name: &str,
        stage: &str,
        source_project_id: u64,
        source_bucket_id: &str,
        display_name: Option<&str>,
    ) -> Result<String> {
        let mut body = Map::new();
        body.insert("name".into(), json!(name));
        body.insert("stage".into(), json!(stage));
        body.insert("sourceProjectId".into(), json!(source_project_id));
        body.insert("sourceBucketId".into(), json!(source_bucket_id));
        insert_opt(&mut body, "displayName", display_name);

        let path = Query::new().push_flag("async", true).append_to("buckets");
        let bucket = self.api_post(&path, Some(&Value::Object(body))).await?;
        result_id(&bucket)
    }

    /// Removes a link to the bucket from another project.
    #[tracing::instrument(skip(self))]
    pub async fn force_unlink_bucket(&self, bucket_id: &str, project_id: u64) -> Result<()> {
        let path = Query::new()
            .push_flag("async", true)
            .append_to(&format!("buckets/{}/links/{}", bucket_id, project_id));
        self.api_delete(&path).await?;
        Ok(())
    }
}
