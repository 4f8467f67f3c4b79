use anyhow::Result;
use serde_json::json;
use std::path::PathBuf;

use super::{Config, print_json};
use crate::api::{FileUploadOptions, ListFilesOptions};
use crate::upload::FileUploadTransferOptions;

/// Uploads one file, or several slices of one sliced file when more than one
/// path is given.
#[tracing::instrument(skip(config))]
pub async fn upload(
    config: &Config,
    paths: &[PathBuf],
    name: Option<String>,
    tags: Vec<String>,
    is_permanent: bool,
) -> Result<()> {
    let options = FileUploadOptions {
        name,
        tags,
        is_permanent,
        ..FileUploadOptions::default()
    };
    let transfer = FileUploadTransferOptions::default();

    let id = match paths {
        [path] => config.client.upload_file(path, &options, &transfer).await?,
        slices => {
            config
                .client
                .upload_sliced_file(slices, &options, &transfer)
                .await?
        }
    };
    print_json(&json!({ "id": id }))
}

#[tracing::instrument(skip(config))]
pub async fn list(config: &Config, tags: Vec<String>, limit: Option<u32>) -> Result<()> {
    let files = config
        .client
        .list_files(&ListFilesOptions {
            tags,
            limit,
            ..ListFilesOptions::default()
        })
        .await?;
    print_json(&files)
}

#[tracing::instrument(skip(config))]
pub async fn get(config: &Config, file_id: u64) -> Result<()> {
    let file = config.client.get_file(file_id).await?;
    print_json(&file)
}
