//! Multipart upload of local files to the object store behind the file
//! storage.
//!
//! # Structure
//!
//! - `options` - Transfer settings (chunk size, concurrency, retries)
//! - `chunker` - Splits sliced uploads into chunks
//! - `store` - Object-store primitives ([`MultipartStore`], [`ObjectReader`])
//! - `s3` - AWS SDK implementation of the store
//! - `multipart` - Resumable upload of one file
//! - `uploader` - Batches, chunks and retries ([`S3Uploader`])

mod chunker;
mod multipart;
mod options;
mod s3;
mod store;
mod uploader;

pub use chunker::Chunker;
pub use multipart::{MultipartUploadError, MultipartUploader, UploadState, UploadTarget};
pub use options::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_RETRIES_PER_CHUNK, DEFAULT_MULTI_FILE_CONCURRENCY,
    DEFAULT_SINGLE_FILE_CONCURRENCY, FileUploadTransferOptions, MIN_PART_SIZE,
};
pub use s3::{S3MultipartStore, UploadCredentials};
pub use store::{MultipartStore, ObjectOptions, ObjectReader, UploadedPart};
pub use uploader::{FILE_NOT_READABLE, S3Uploader, UploadHeaders};

#[cfg(test)]
pub use store::{MockMultipartStore, MockObjectReader};
