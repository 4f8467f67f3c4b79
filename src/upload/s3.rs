//! [`MultipartStore`] and [`ObjectReader`] backed by the AWS SDK.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    CompletedMultipartUpload, CompletedPart, ObjectCannedAcl, ServerSideEncryption,
};
use log::debug;

use super::store::{MultipartStore, ObjectOptions, ObjectReader, UploadedPart};

/// Temporary credentials handed out by `files/prepare` and `files/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

pub struct S3MultipartStore {
    client: S3Client,
}

impl S3MultipartStore {
    pub async fn new(region: &str, credentials: &UploadCredentials) -> Self {
        let credentials = Credentials::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            credentials.session_token.clone(),
            None,
            "kbc-storage",
        );
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region.to_string()))
            .credentials_provider(credentials)
            .load()
            .await;
        debug!("S3 client for region {}", region);

        Self {
            client: S3Client::new(&config),
        }
    }

    pub fn from_client(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MultipartStore for S3MultipartStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &ObjectOptions,
    ) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body));

        if let Some(acl) = &options.acl {
            request = request.acl(ObjectCannedAcl::from(acl.as_str()));
        }
        if let Some(disposition) = &options.content_disposition {
            request = request.content_disposition(disposition);
        }
        if let Some(sse) = &options.server_side_encryption {
            request = request.server_side_encryption(ServerSideEncryption::from(sse.as_str()));
        }

        request
            .send()
            .await
            .map_err(|e| anyhow!("Failed to put s3://{}/{}: {}", bucket, key, DisplayErrorContext(&e)))?;
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        options: &ObjectOptions,
    ) -> Result<String> {
        let mut request = self.client.create_multipart_upload().bucket(bucket).key(key);

        if let Some(acl) = &options.acl {
            request = request.acl(ObjectCannedAcl::from(acl.as_str()));
        }
        if let Some(disposition) = &options.content_disposition {
            request = request.content_disposition(disposition);
        }
        if let Some(sse) = &options.server_side_encryption {
            request = request.server_side_encryption(ServerSideEncryption::from(sse.as_str()));
        }

        let output = request.send().await.map_err(|e| {
            anyhow!(
                "Failed to start multipart upload of s3://{}/{}: {}",
                bucket,
                key,
                DisplayErrorContext(&e)
            )
        })?;

        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("S3 returned no upload id for s3://{}/{}", bucket, key))
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String> {
        let output = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to upload part {} of s3://{}/{}: {}",
                    part_number,
                    bucket,
                    key,
                    DisplayErrorContext(&e)
                )
            })?;

        output
            .e_tag()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("S3 returned no ETag for part {} of {}", part_number, key))
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<()> {
        let parts = parts
            .into_iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(part.e_tag)
                    .build()
            })
            .collect::<Vec<_>>();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to complete multipart upload of s3://{}/{}: {}",
                    bucket,
                    key,
                    DisplayErrorContext(&e)
                )
            })?;
        Ok(())
    }
}

#[async_trait]
impl ObjectReader for S3MultipartStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to get s3://{}/{}: {}", bucket, key, DisplayErrorContext(&e)))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| anyhow!("Failed to read s3://{}/{}: {}", bucket, key, e))?;
        Ok(body.into_bytes().to_vec())
    }
}
