//! Resumable multipart upload of a single file.

use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use log::debug;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::store::{MultipartStore, ObjectOptions, UploadedPart};
use crate::runtime::Runtime;

/// Progress of a multipart upload. Feeding it back into a new
/// [`MultipartUploader`] resumes the upload without re-sending finished parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadState {
    pub upload_id: Option<String>,
    pub part_size: u64,
    /// Part number to ETag.
    pub completed_parts: BTreeMap<i32, String>,
}

impl UploadState {
    pub fn new(part_size: u64) -> Self {
        Self {
            upload_id: None,
            part_size,
            completed_parts: BTreeMap::new(),
        }
    }
}

/// A multipart upload that failed part way. Carries the state needed to
/// resume it.
#[derive(Debug, Clone)]
pub struct MultipartUploadError {
    pub key: String,
    pub state: UploadState,
    pub message: String,
}

impl std::fmt::Display for MultipartUploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to upload {}: {}", self.key, self.message)
    }
}

impl std::error::Error for MultipartUploadError {}

/// Where a local file goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub source: PathBuf,
    pub bucket: String,
    pub key: String,
    pub options: ObjectOptions,
}

pub struct MultipartUploader<'a> {
    store: &'a dyn MultipartStore,
    runtime: &'a dyn Runtime,
    target: &'a UploadTarget,
    state: UploadState,
    concurrency: usize,
}

impl<'a> MultipartUploader<'a> {
    pub fn new(
        store: &'a dyn MultipartStore,
        runtime: &'a dyn Runtime,
        target: &'a UploadTarget,
        state: UploadState,
    ) -> Self {
        Self {
            store,
            runtime,
            target,
            state,
            concurrency: 1,
        }
    }

    /// Number of parts sent at the same time.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Uploads every missing part and completes the upload. Any failure is
    /// returned as a [`MultipartUploadError`].
    pub async fn upload(mut self) -> Result<()> {
        match self.run().await {
            Ok(()) => Ok(()),
            Err(e) => Err(MultipartUploadError {
                key: self.target.key.clone(),
                state: self.state,
                message: format!("{:#}", e),
            }
            .into()),
        }
    }

    async fn run(&mut self) -> Result<()> {
        let target = self.target;
        let size = self
            .runtime
            .file_size(&target.source)
            .with_context(|| format!("Failed to read {}", target.source.display()))?;

        let upload_id = match &self.state.upload_id {
            Some(upload_id) => upload_id.clone(),
            None => {
                let upload_id = self
                    .store
                    .create_multipart_upload(&target.bucket, &target.key, &target.options)
                    .await?;
                self.state.upload_id = Some(upload_id.clone());
                upload_id
            }
        };

        let part_size = self.state.part_size;
        let part_count = i32::try_from(size.div_ceil(part_size))
            .context("File has too many parts for a multipart upload")?;
        let missing: Vec<i32> = (1..=part_count)
            .filter(|n| !self.state.completed_parts.contains_key(n))
            .collect();
        debug!(
            "Uploading {} of {} parts of {} to s3://{}/{}",
            missing.len(),
            part_count,
            target.source.display(),
            target.bucket,
            target.key
        );

        let store = self.store;
        let runtime = self.runtime;
        let upload_id_ref = upload_id.as_str();
        let outcomes: Vec<Result<(i32, String)>> = stream::iter(missing)
            .map(|part_number| async move {
                let offset = u64::try_from(part_number - 1)? * part_size;
                let body = runtime.read_range(&target.source, offset, part_size)?;
                let e_tag = store
                    .upload_part(&target.bucket, &target.key, upload_id_ref, part_number, body)
                    .await?;
                Ok::<_, anyhow::Error>((part_number, e_tag))
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok((part_number, e_tag)) => {
                    self.state.completed_parts.insert(part_number, e_tag);
                }
                Err(e) => failures.push(e),
            }
        }
        if let Some(first) = failures.into_iter().next() {
            return Err(first);
        }

        let parts = self
            .state
            .completed_parts
            .iter()
            .map(|(part_number, e_tag)| UploadedPart {
                part_number: *part_number,
                e_tag: e_tag.clone(),
            })
            .collect();
        self.store
            .complete_multipart_upload(&target.bucket, &target.key, &upload_id, parts)
            .await
    }
}
