use anyhow::Result;
use log::info;
use serde_json::json;

use super::{Config, print_json};
use crate::api::DropBucketOptions;

#[tracing::instrument(skip(config))]
pub async fn list(config: &Config, include: Option<&str>) -> Result<()> {
    let buckets = config.client.list_buckets(include).await?;
    print_json(&buckets)
}

#[tracing::instrument(skip(config))]
pub async fn get(config: &Config, bucket_id: &str) -> Result<()> {
    let bucket = config.client.get_bucket(bucket_id).await?;
    print_json(&bucket)
}

#[tracing::instrument(skip(config))]
pub async fn create(
    config: &Config,
    name: &str,
    stage: &str,
    description: Option<&str>,
    backend: Option<&str>,
) -> Result<()> {
    let id = config
        .client
        .create_bucket(name, stage, description, backend)
        .await?;
    print_json(&json!({ "id": id }))
}

#[tracing::instrument(skip(config))]
pub async fn drop(config: &Config, bucket_id: &str, force: bool) -> Result<()> {
    config
        .client
        .drop_bucket(
            bucket_id,
            DropBucketOptions {
                force,
                is_async: true,
            },
        )
        .await?;
    info!("Dropped bucket {}", bucket_id);
    print_json(&json!({ "id": bucket_id, "dropped": true }))
}
