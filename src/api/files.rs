//! File uploads and the file storage listing.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::ops::Not;
use std::path::{Path, PathBuf};

use super::{Query, to_object};
use crate::client::Client;
use crate::error::ClientError;
use crate::runtime::{RealRuntime, Runtime};
use crate::upload::{
    FileUploadTransferOptions, MultipartStore, ObjectOptions, S3MultipartStore, S3Uploader,
    UploadCredentials, UploadHeaders,
};

/// Settings sent to `files/prepare`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Not::not")]
    pub is_public: bool,
    #[serde(skip_serializing_if = "Not::not")]
    pub is_permanent: bool,
    pub is_encrypted: bool,
    #[serde(skip_serializing_if = "Not::not")]
    pub is_sliced: bool,
    #[serde(skip_serializing_if = "Not::not")]
    pub notify: bool,
}

impl Default for FileUploadOptions {
    fn default() -> Self {
        Self {
            name: None,
            size_bytes: None,
            tags: Vec::new(),
            is_public: false,
            is_permanent: false,
            is_encrypted: true,
            is_sliced: false,
            notify: false,
        }
    }
}

impl FileUploadOptions {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FederationCredentials {
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,
    #[serde(rename = "SessionToken", default)]
    pub session_token: Option<String>,
    #[serde(rename = "Expiration", default)]
    pub expiration: Option<String>,
}

impl From<&FederationCredentials> for UploadCredentials {
    fn from(credentials: &FederationCredentials) -> Self {
        UploadCredentials {
            access_key_id: credentials.access_key_id.clone(),
            secret_access_key: credentials.secret_access_key.clone(),
            session_token: credentials.session_token.clone(),
        }
    }
}

/// Where and how to upload a prepared file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadParams {
    pub bucket: String,
    pub key: String,
    #[serde(default)]
    pub acl: Option<String>,
    pub credentials: FederationCredentials,
    #[serde(rename = "x-amz-server-side-encryption", default)]
    pub server_side_encryption: Option<String>,
}

/// A file record created by `files/prepare`, waiting for its content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedFile {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub is_sliced: bool,
    #[serde(default)]
    pub is_encrypted: bool,
    pub upload_params: UploadParams,
}

impl PreparedFile {
    fn headers(&self) -> UploadHeaders<'_> {
        UploadHeaders {
            acl: self.upload_params.acl.as_deref(),
            name: self.name.as_deref(),
            server_side_encryption: self.upload_params.server_side_encryption.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilesOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub tags: Vec<String>,
    /// Full-text search query.
    pub q: Option<String>,
    pub run_id: Option<String>,
    pub since_id: Option<u64>,
    pub max_id: Option<u64>,
}

pub(crate) const DEFAULT_REGION: &str = "us-east-1";

impl Client {
    #[tracing::instrument(skip(self, options))]
    pub async fn prepare_file_upload(&self, options: &FileUploadOptions) -> Result<PreparedFile> {
        let mut body = to_object(options)?;
        body.insert("federationToken".into(), json!(true));

        let prepared = self
            .api_post("files/prepare", Some(&Value::Object(body)))
            .await?;
        serde_json::from_value(prepared).context("Failed to parse prepared file from Storage API")
    }

    /// Uploads a local file and returns the id of the new file record. The
    /// name defaults to the file's basename and the size to its length.
    #[tracing::instrument(skip(self, options, transfer))]
    pub async fn upload_file(
        &self,
        path: &Path,
        options: &FileUploadOptions,
        transfer: &FileUploadTransferOptions,
    ) -> Result<u64> {
        let runtime = RealRuntime;
        let mut options = options.clone();
        if options.name.is_none() {
            options.name = Some(file_name(path));
        }
        if options.size_bytes.is_none() {
            options.size_bytes = Some(runtime.file_size(path).map_err(|_| not_readable(path))?);
        }

        let prepared = self.prepare_file_upload(&options).await?;
        let store = s3_store(&prepared).await;
        upload_prepared_file(&prepared, &store, &runtime, path, transfer).await?;

        info!("Uploaded {} as file {}", path.display(), prepared.id);
        Ok(prepared.id)
    }

    /// Uploads the slices of one sliced file, followed by its manifest, and
    /// returns the file id.
    #[tracing::instrument(skip(self, slices, options, transfer), fields(slices = slices.len()))]
    pub async fn upload_sliced_file(
        &self,
        slices: &[PathBuf],
        options: &FileUploadOptions,
        transfer: &FileUploadTransferOptions,
    ) -> Result<u64> {
        if options.name.is_none() {
            return Err(ClientError::new("File name must be set for a sliced file upload").into());
        }

        let runtime = RealRuntime;
        let mut options = options.clone();
        options.is_sliced = true;
        if options.size_bytes.is_none() {
            let mut size = 0;
            for slice in slices {
                size += runtime.file_size(slice).map_err(|_| not_readable(slice))?;
            }
            options.size_bytes = Some(size);
        }

        let prepared = self.prepare_file_upload(&options).await?;
        let store = s3_store(&prepared).await;
        upload_prepared_slices(&prepared, &store, &runtime, slices, transfer).await?;

        info!("Uploaded {} slices as file {}", slices.len(), prepared.id);
        Ok(prepared.id)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_file(&self, file_id: u64) -> Result<Value> {
        self.api_get(&format!("files/{}", file_id)).await
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn list_files(&self, options: &ListFilesOptions) -> Result<Value> {
        let path = Query::new()
            .push_opt("limit", options.limit)
            .push_opt("offset", options.offset)
            .push_list("tags", &options.tags)
            .push_opt("q", options.q.as_deref())
            .push_opt("runId", options.run_id.as_deref())
            .push_opt("sinceId", options.since_id)
            .push_opt("maxId", options.max_id)
            .append_to("files");
        self.api_get(&path).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_file(&self, file_id: u64) -> Result<()> {
        self.api_delete(&format!("files/{}", file_id)).await?;
        Ok(())
    }
}

async fn s3_store(prepared: &PreparedFile) -> S3MultipartStore {
    let region = prepared.region.as_deref().unwrap_or(DEFAULT_REGION);
    S3MultipartStore::new(region, &(&prepared.upload_params.credentials).into()).await
}

/// Uploads the content of a prepared, non-sliced file.
pub async fn upload_prepared_file(
    prepared: &PreparedFile,
    store: &dyn MultipartStore,
    runtime: &dyn Runtime,
    path: &Path,
    transfer: &FileUploadTransferOptions,
) -> Result<()> {
    let params = &prepared.upload_params;
    S3Uploader::new(store, runtime, transfer.clone())
        .upload_file(&params.bucket, &params.key, path, prepared.headers())
        .await
}

/// Uploads every slice under `{key}{basename}` and then the manifest at
/// `{key}manifest` listing them.
pub async fn upload_prepared_slices(
    prepared: &PreparedFile,
    store: &dyn MultipartStore,
    runtime: &dyn Runtime,
    slices: &[PathBuf],
    transfer: &FileUploadTransferOptions,
) -> Result<()> {
    let params = &prepared.upload_params;
    S3Uploader::new(store, runtime, transfer.clone())
        .upload_sliced_file(&params.bucket, &params.key, slices, prepared.headers())
        .await?;

    let manifest = manifest(&params.bucket, &params.key, slices);
    debug!("Uploading manifest {}manifest", params.key);
    store
        .put_object(
            &params.bucket,
            &format!("{}manifest", params.key),
            serde_json::to_vec(&manifest)?,
            &ObjectOptions {
                acl: params.acl.clone(),
                content_disposition: None,
                server_side_encryption: params.server_side_encryption.clone(),
            },
        )
        .await
}

fn manifest(bucket: &str, key: &str, slices: &[PathBuf]) -> Value {
    let entries: Vec<Value> = slices
        .iter()
        .map(|slice| {
            json!({
                "url": format!("s3://{}/{}{}", bucket, key, file_name(slice)),
                "mandatory": true,
            })
        })
        .collect();
    json!({ "entries": entries })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn not_readable(path: &Path) -> anyhow::Error {
    ClientError::new(format!("Error on file upload to S3: {}", path.display()))
        .with_code(crate::upload::FILE_NOT_READABLE)
        .into()
}
