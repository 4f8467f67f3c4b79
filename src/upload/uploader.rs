//! Chunked upload of one or many files with resumable retries.

use anyhow::Result;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use super::chunker::Chunker;
use super::multipart::{MultipartUploadError, MultipartUploader, UploadState, UploadTarget};
use super::options::FileUploadTransferOptions;
use super::store::{MultipartStore, ObjectOptions};
use crate::error::ClientError;
use crate::runtime::Runtime;
use crate::settle::settle;

pub const FILE_NOT_READABLE: &str = "fileNotReadable";

pub struct S3Uploader<'a> {
    store: &'a dyn MultipartStore,
    runtime: &'a dyn Runtime,
    options: FileUploadTransferOptions,
}

/// Headers shared by every object of one upload call.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadHeaders<'a> {
    pub acl: Option<&'a str>,
    /// File name for `Content-Disposition`; defaults to each file's basename.
    pub name: Option<&'a str>,
    pub server_side_encryption: Option<&'a str>,
}

impl<'a> S3Uploader<'a> {
    pub fn new(
        store: &'a dyn MultipartStore,
        runtime: &'a dyn Runtime,
        options: FileUploadTransferOptions,
    ) -> Self {
        Self {
            store,
            runtime,
            options,
        }
    }

    pub fn options(&self) -> &FileUploadTransferOptions {
        &self.options
    }

    /// Uploads a single file to `key`.
    #[tracing::instrument(skip(self, headers))]
    pub async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        file: &Path,
        headers: UploadHeaders<'_>,
    ) -> Result<()> {
        self.upload(bucket, &[(file.to_path_buf(), key.to_string())], headers)
            .await
    }

    /// Uploads every slice to `{key_prefix}{basename}`, one chunk of
    /// `chunk_size` slices at a time.
    #[tracing::instrument(skip(self, slices, headers), fields(slices = slices.len()))]
    pub async fn upload_sliced_file(
        &self,
        bucket: &str,
        key_prefix: &str,
        slices: &[PathBuf],
        headers: UploadHeaders<'_>,
    ) -> Result<()> {
        let files: Vec<(PathBuf, String)> = slices
            .iter()
            .map(|slice| (slice.clone(), format!("{}{}", key_prefix, basename(slice))))
            .collect();

        let chunks = Chunker::new(self.options.chunk_size()).make_chunks(&files);
        let total = chunks.len();
        for (index, chunk) in chunks.into_iter().enumerate() {
            info!("Uploading chunk {}/{} ({} files)", index + 1, total, chunk.len());
            self.upload(bucket, &chunk, UploadHeaders { name: None, ..headers })
                .await?;
        }
        Ok(())
    }

    /// Uploads a batch of `(file, key)` pairs concurrently. Failed multipart
    /// uploads are resumed until they succeed or the retry limit is hit.
    async fn upload(
        &self,
        bucket: &str,
        files: &[(PathBuf, String)],
        headers: UploadHeaders<'_>,
    ) -> Result<()> {
        let mut sized = Vec::with_capacity(files.len());
        for (file, key) in files {
            let size = self
                .runtime
                .file_size(file)
                .map_err(|_| not_readable(file))?;
            sized.push((file, key, size));
        }

        let mut pending: Vec<(UploadTarget, UploadState)> = Vec::new();
        for (file, key, size) in sized {
            let target = UploadTarget {
                source: file.clone(),
                bucket: bucket.to_string(),
                key: key.clone(),
                options: ObjectOptions {
                    acl: headers.acl.map(str::to_string),
                    content_disposition: Some(ObjectOptions::attachment(
                        headers.name.unwrap_or_else(|| basename(file)),
                    )),
                    server_side_encryption: headers.server_side_encryption.map(str::to_string),
                },
            };

            // Multipart uploads need at least one part
            if size == 0 {
                debug!("Uploading empty file {} with a single request", file.display());
                self.store
                    .put_object(&target.bucket, &target.key, Vec::new(), &target.options)
                    .await?;
                continue;
            }

            pending.push((target, UploadState::new(self.options.part_size())));
        }

        let mut concurrency = self.options.concurrency_for(files.len());
        let mut retries = 0;
        loop {
            retries += 1;
            if retries >= self.options.max_retries_per_chunk() {
                return Err(
                    ClientError::new("Exceeded maximum number of retries per chunk upload").into(),
                );
            }

            let outcomes = settle(pending.iter().enumerate().map(|(index, (target, state))| {
                let uploader =
                    MultipartUploader::new(self.store, self.runtime, target, state.clone())
                        .with_concurrency(concurrency);
                (index, uploader.upload())
            }))
            .await;

            let mut failed = Vec::new();
            for (index, outcome) in outcomes {
                let Err(e) = outcome else { continue };
                let e = e.downcast::<MultipartUploadError>()?;
                warn!("{}; resuming", e);
                failed.push((pending[index].0.clone(), e.state));
            }

            if failed.is_empty() {
                return Ok(());
            }

            concurrency = self.options.concurrency_for(failed.len());
            pending = failed;
        }
    }
}

fn basename(path: &Path) -> &str {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
}

fn not_readable(path: &Path) -> anyhow::Error {
    ClientError::new(format!("Error on file upload to S3: {}", path.display()))
        .with_code(FILE_NOT_READABLE)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::upload::store::MockMultipartStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const MIB: u64 = 1024 * 1024;

    fn runtime_with_files(files: &[(&str, u64)]) -> MockRuntime {
        let sizes: HashMap<PathBuf, u64> = files
            .iter()
            .map(|(path, size)| (PathBuf::from(path), *size))
            .collect();
        let sizes = Arc::new(sizes);

        let mut runtime = MockRuntime::new();
        let lookup = sizes.clone();
        runtime.expect_file_size().returning(move |path| {
            lookup
                .get(path)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("No such file or directory"))
        });
        runtime
            .expect_read_range()
            .returning(move |path, offset, length| {
                let size = sizes.get(path).copied().unwrap_or_default();
                Ok(vec![1u8; length.min(size.saturating_sub(offset)) as usize])
            });
        runtime
    }

    fn happy_store(completed: Arc<Mutex<Vec<String>>>) -> MockMultipartStore {
        let mut store = MockMultipartStore::new();
        store
            .expect_create_multipart_upload()
            .returning(|_, key, _| Ok(format!("upload-{}", key)));
        store
            .expect_upload_part()
            .returning(|_, _, _, part_number, _| Ok(format!("etag-{}", part_number)));
        store
            .expect_complete_multipart_upload()
            .returning(move |_, key, _, _| {
                completed.lock().unwrap().push(key.to_string());
                Ok(())
            });
        store
    }

    #[tokio::test]
    async fn test_upload_empty_file_uses_put_object() {
        let runtime = runtime_with_files(&[("/data/empty.csv", 0)]);
        let mut store = MockMultipartStore::new();
        store
            .expect_put_object()
            .withf(|bucket, key, body, options| {
                bucket == "kbc-files"
                    && key == "exp-15/1/empty.csv"
                    && body.is_empty()
                    && options.acl.as_deref() == Some("private")
                    && options.content_disposition.as_deref()
                        == Some("attachment; filename=empty.csv;")
                    && options.server_side_encryption.as_deref() == Some("AES256")
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        store.expect_create_multipart_upload().times(0);

        let uploader = S3Uploader::new(&store, &runtime, FileUploadTransferOptions::default());
        uploader
            .upload_file(
                "kbc-files",
                "exp-15/1/empty.csv",
                Path::new("/data/empty.csv"),
                UploadHeaders {
                    acl: Some("private"),
                    name: None,
                    server_side_encryption: Some("AES256"),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_unreadable_file() {
        let runtime = runtime_with_files(&[]);
        let store = MockMultipartStore::new();

        let uploader = S3Uploader::new(&store, &runtime, FileUploadTransferOptions::default());
        let err = uploader
            .upload_file(
                "kbc-files",
                "exp-15/1/missing.csv",
                Path::new("/data/missing.csv"),
                UploadHeaders::default(),
            )
            .await
            .unwrap_err();

        let client_error = err.downcast_ref::<ClientError>().unwrap();
        assert_eq!(client_error.string_code(), FILE_NOT_READABLE);
        assert_eq!(
            client_error.message,
            "Error on file upload to S3: /data/missing.csv"
        );
    }

    #[tokio::test]
    async fn test_unreadable_slice_stops_batch_before_any_upload() {
        let runtime = runtime_with_files(&[("/data/empty.csv", 0)]);
        let mut store = MockMultipartStore::new();
        store.expect_put_object().times(0);
        store.expect_create_multipart_upload().times(0);

        let uploader = S3Uploader::new(&store, &runtime, FileUploadTransferOptions::default());
        let err = uploader
            .upload_sliced_file(
                "kbc-files",
                "exp-15/3/",
                &[
                    PathBuf::from("/data/empty.csv"),
                    PathBuf::from("/data/missing.csv"),
                ],
                UploadHeaders::default(),
            )
            .await
            .unwrap_err();

        let client_error = err.downcast_ref::<ClientError>().unwrap();
        assert_eq!(client_error.string_code(), FILE_NOT_READABLE);
        assert_eq!(
            client_error.message,
            "Error on file upload to S3: /data/missing.csv"
        );
    }

    #[tokio::test]
    async fn test_upload_file_uses_given_name() {
        let runtime = runtime_with_files(&[("/tmp/upload-a1b2", 3 * MIB)]);
        let mut store = MockMultipartStore::new();
        store
            .expect_create_multipart_upload()
            .withf(|_, _, options| {
                options.content_disposition.as_deref() == Some("attachment; filename=orders.csv;")
            })
            .times(1)
            .returning(|_, _, _| Ok("upload-1".to_string()));
        store
            .expect_upload_part()
            .times(1)
            .returning(|_, _, _, _, _| Ok("etag-1".to_string()));
        store
            .expect_complete_multipart_upload()
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let uploader = S3Uploader::new(&store, &runtime, FileUploadTransferOptions::default());
        uploader
            .upload_file(
                "kbc-files",
                "exp-15/2/orders.csv",
                Path::new("/tmp/upload-a1b2"),
                UploadHeaders {
                    name: Some("orders.csv"),
                    ..UploadHeaders::default()
                },
            )
            .await
            .unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_upload_is_resumed() {
        let runtime = runtime_with_files(&[("/data/big.csv", 11 * MIB)]);
        let attempts = Arc::new(AtomicUsize::new(0));

        let mut store = MockMultipartStore::new();
        store
            .expect_create_multipart_upload()
            .times(1)
            .returning(|_, _, _| Ok("upload-1".to_string()));
        let counter = attempts.clone();
        store
            .expect_upload_part()
            .returning(move |_, _, _, part_number, _| {
                if part_number == 2 && counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(anyhow::anyhow!("RequestTimeout"))
                } else {
                    Ok(format!("etag-{}", part_number))
                }
            });
        store
            .expect_complete_multipart_upload()
            .withf(|_, _, upload_id, parts| upload_id == "upload-1" && parts.len() == 3)
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let uploader = S3Uploader::new(&store, &runtime, FileUploadTransferOptions::default());
        uploader
            .upload_file(
                "kbc-files",
                "exp-15/3/big.csv",
                Path::new("/data/big.csv"),
                UploadHeaders::default(),
            )
            .await
            .unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exceeded_retries() {
        let runtime = runtime_with_files(&[("/data/big.csv", MIB)]);
        let mut store = MockMultipartStore::new();
        store
            .expect_create_multipart_upload()
            .returning(|_, _, _| Ok("upload-1".to_string()));
        store
            .expect_upload_part()
            .times(2)
            .returning(|_, _, _, _, _| Err(anyhow::anyhow!("SlowDown")));

        let uploader = S3Uploader::new(
            &store,
            &runtime,
            FileUploadTransferOptions::default().with_max_retries_per_chunk(3),
        );
        let err = uploader
            .upload_file(
                "kbc-files",
                "exp-15/4/big.csv",
                Path::new("/data/big.csv"),
                UploadHeaders::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Exceeded maximum number of retries per chunk upload"
        );
    }

    #[tokio::test]
    async fn test_upload_sliced_file_in_chunks() {
        let runtime = runtime_with_files(&[
            ("/data/part0.csv", MIB),
            ("/data/part1.csv", MIB),
            ("/data/part2.csv", 0),
        ]);
        let completed = Arc::new(Mutex::new(Vec::new()));
        let mut store = happy_store(completed.clone());
        store
            .expect_put_object()
            .withf(|_, key, _, options| {
                key == "exp-15/5/table.csv.gzpart2.csv"
                    && options.content_disposition.as_deref()
                        == Some("attachment; filename=part2.csv;")
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let uploader = S3Uploader::new(
            &store,
            &runtime,
            FileUploadTransferOptions::default().with_chunk_size(2),
        );
        uploader
            .upload_sliced_file(
                "kbc-files",
                "exp-15/5/table.csv.gz",
                &[
                    PathBuf::from("/data/part0.csv"),
                    PathBuf::from("/data/part1.csv"),
                    PathBuf::from("/data/part2.csv"),
                ],
                UploadHeaders::default(),
            )
            .await
            .unwrap();

        let mut completed = completed.lock().unwrap().clone();
        completed.sort();
        assert_eq!(
            completed,
            vec![
                "exp-15/5/table.csv.gzpart0.csv".to_string(),
                "exp-15/5/table.csv.gzpart1.csv".to_string(),
            ]
        );
    }
}
