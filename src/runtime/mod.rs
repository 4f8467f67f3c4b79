//! Runtime abstraction for side effects outside HTTP.
//!
//! The uploader reads local files, the table exporter writes them and the
//! CLI reads its environment through this trait.
//!
//! # Structure
//!
//! - `fs` - File reads (size and byte ranges) and writes

mod fs;

use anyhow::Result;
use std::env as std_env;
use std::path::Path;

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;

    // File System
    fn file_size(&self, path: &Path) -> Result<u64>;

    /// Read `length` bytes starting at `offset`. Short reads at the end of
    /// the file return fewer bytes.
    fn read_range(&self, path: &Path, offset: u64, length: u64) -> Result<Vec<u8>>;

    /// Create or truncate `path` with `contents`.
    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()>;

    fn append_file(&self, path: &Path, contents: &[u8]) -> Result<()>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    #[tracing::instrument(skip(self))]
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        std_env::var(key)
    }

    fn file_size(&self, path: &Path) -> Result<u64> {
        self.file_size_impl(path)
    }

    fn read_range(&self, path: &Path, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.read_range_impl(path, offset, length)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_file_impl(path, contents)
    }

    fn append_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.append_file_impl(path, contents)
    }
}
