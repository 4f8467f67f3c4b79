//! Export of a table into a local file.
//!
//! The export job writes a file into file storage. A plain file is
//! downloaded as is. A sliced file is reassembled: the header row comes
//! first, then every slice listed in the manifest, in manifest order.
//! Gzipped exports stay gzipped, the header being its own gzip member.

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use std::io::Write;
use std::path::Path;

use super::files::FederationCredentials;
use super::tables::ExportTableOptions;
use crate::client::Client;
use crate::error::ClientError;
use crate::runtime::{RealRuntime, Runtime};
use crate::upload::{ObjectReader, S3MultipartStore};

const DEFAULT_FORMAT: &str = "rfc";
const SLICE_DOWNLOAD_CONCURRENCY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct S3Path {
    pub bucket: String,
    pub key: String,
}

/// A file record fetched with download credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDownload {
    pub id: u64,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub is_sliced: bool,
    pub s3_path: S3Path,
    pub credentials: FederationCredentials,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    url: String,
}

impl Client {
    /// Fetches a file record together with temporary credentials for
    /// reading its content.
    #[tracing::instrument(skip(self))]
    pub async fn get_file_download(&self, file_id: u64) -> Result<FileDownload> {
        let file = self
            .api_get(&format!("files/{}?federationToken=1", file_id))
            .await?;
        serde_json::from_value(file).context("Failed to parse file download from Storage API")
    }

    /// Exports a table into `path`. The format defaults to `rfc`.
    #[tracing::instrument(skip(self, options))]
    pub async fn export_table(
        &self,
        table_id: &str,
        path: &Path,
        options: &ExportTableOptions,
    ) -> Result<()> {
        let mut options = options.clone();
        if options.format.is_none() {
            options.format = Some(DEFAULT_FORMAT.to_string());
        }

        let results = self.export_table_async(table_id, &options).await?;
        let file_id = results
            .pointer("/file/id")
            .and_then(Value::as_u64)
            .ok_or_else(|| ClientError::new(format!("Export of {} returned no file", table_id)))?;
        let file = self.get_file_download(file_id).await?;

        let header = if file.is_sliced {
            let columns = if options.columns.is_empty() {
                self.table_columns(table_id).await?
            } else {
                options.columns.clone()
            };
            Some(header_row(&columns, options.gzip)?)
        } else {
            None
        };

        let region = file.region.as_deref().unwrap_or(super::files::DEFAULT_REGION);
        let store = S3MultipartStore::new(region, &(&file.credentials).into()).await;
        download_file(&file, &store, &RealRuntime, path, header.as_deref()).await?;

        info!("Exported {} to {}", table_id, path.display());
        Ok(())
    }

    async fn table_columns(&self, table_id: &str) -> Result<Vec<String>> {
        let table = self.get_table(table_id).await?;
        let columns = table
            .get("columns")
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::new(format!("Table {} has no columns", table_id)))?;
        Ok(columns
            .iter()
            .filter_map(|column| column.as_str().map(str::to_string))
            .collect())
    }
}

/// Writes the content of `file` to `path`. `header` is written before the
/// slices of a sliced file and ignored otherwise.
pub async fn download_file(
    file: &FileDownload,
    reader: &dyn ObjectReader,
    runtime: &dyn Runtime,
    path: &Path,
    header: Option<&[u8]>,
) -> Result<()> {
    let S3Path { bucket, key } = &file.s3_path;

    if !file.is_sliced {
        let body = reader.get_object(bucket, key).await?;
        return runtime.write_file(path, &body);
    }

    let manifest_key = format!("{}manifest", key);
    let manifest: Manifest = serde_json::from_slice(&reader.get_object(bucket, &manifest_key).await?)
        .with_context(|| format!("Invalid manifest s3://{}/{}", bucket, manifest_key))?;
    let slices = manifest
        .entries
        .iter()
        .map(|entry| parse_s3_url(&entry.url))
        .collect::<Result<Vec<_>>>()?;
    debug!("File {} has {} slices", file.id, slices.len());

    runtime.write_file(path, header.unwrap_or_default())?;

    // Downloads run ahead while the slices are appended in manifest order
    let mut bodies = std::pin::pin!(
        stream::iter(slices)
            .map(|(bucket, key)| async move { reader.get_object(&bucket, &key).await })
            .buffered(SLICE_DOWNLOAD_CONCURRENCY)
    );
    while let Some(body) = bodies.try_next().await? {
        runtime.append_file(path, &body)?;
    }
    Ok(())
}

/// `s3://bucket/key` into its bucket and key.
fn parse_s3_url(url: &str) -> Result<(String, String)> {
    url.strip_prefix("s3://")
        .and_then(|rest| rest.split_once('/'))
        .map(|(bucket, key)| (bucket.to_string(), key.to_string()))
        .ok_or_else(|| ClientError::new(format!("Invalid slice url {}", url)).into())
}

/// The CSV header row of a sliced export, gzipped when the slices are.
fn header_row(columns: &[String], gzip: bool) -> Result<Vec<u8>> {
    let row = columns
        .iter()
        .map(|column| format!("\"{}\"", column.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
        + "\n";

    if !gzip {
        return Ok(row.into_bytes());
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(row.as_bytes())?;
    Ok(encoder.finish()?)
}
