//! File system reads and writes.

use anyhow::{Context, Result};
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn file_size_impl(&self, path: &Path) -> Result<u64> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to read metadata of {:?}", path))?;
        Ok(metadata.len())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_range_impl(&self, path: &Path, offset: u64, length: u64) -> Result<Vec<u8>> {
        let mut file =
            fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        file.seek(SeekFrom::Start(offset))
            .with_context(|| format!("Failed to seek to {} in {:?}", offset, path))?;

        let mut buffer = Vec::with_capacity(length as usize);
        file.take(length)
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read {:?}", path))?;
        Ok(buffer)
    }

    #[tracing::instrument(skip(self, contents), fields(bytes = contents.len()))]
    pub(crate) fn write_file_impl(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))
    }

    #[tracing::instrument(skip(self, contents), fields(bytes = contents.len()))]
    pub(crate) fn append_file_impl(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .with_context(|| format!("Failed to open {:?} for appending", path))?;
        file.write_all(contents)
            .with_context(|| format!("Failed to append to {:?}", path))
    }
}
