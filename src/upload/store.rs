//! Object-store primitives used by the uploader and the table exporter.

use anyhow::Result;
use async_trait::async_trait;

/// Headers applied to every uploaded object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectOptions {
    pub acl: Option<String>,
    pub content_disposition: Option<String>,
    /// `x-amz-server-side-encryption` value, e.g. `AES256`.
    pub server_side_encryption: Option<String>,
}

impl ObjectOptions {
    /// `attachment; filename=<name>;`
    pub fn attachment(name: &str) -> String {
        format!("attachment; filename={};", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i32,
    pub e_tag: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MultipartStore: Send + Sync {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &ObjectOptions,
    ) -> Result<()>;

    /// Starts a multipart upload and returns its upload id.
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        options: &ObjectOptions,
    ) -> Result<String>;

    /// Uploads one part and returns its ETag.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String>;

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<()>;
}

/// Read access to stored objects.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectReader: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}
