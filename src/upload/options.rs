//! Transfer settings for multipart uploads.

/// Smallest part size S3 accepts for every part but the last one.
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

pub const DEFAULT_CHUNK_SIZE: usize = 50;
pub const DEFAULT_SINGLE_FILE_CONCURRENCY: usize = 20;
pub const DEFAULT_MULTI_FILE_CONCURRENCY: usize = 5;
pub const DEFAULT_MAX_RETRIES_PER_CHUNK: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct FileUploadTransferOptions {
    /// Number of files uploaded together in one chunk of a sliced upload.
    chunk_size: usize,
    /// Parallel part uploads when a chunk holds a single file.
    single_file_concurrency: usize,
    /// Parallel part uploads per file when a chunk holds several files.
    multi_file_concurrency: usize,
    max_retries_per_chunk: usize,
    part_size: u64,
}

impl Default for FileUploadTransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            single_file_concurrency: DEFAULT_SINGLE_FILE_CONCURRENCY,
            multi_file_concurrency: DEFAULT_MULTI_FILE_CONCURRENCY,
            max_retries_per_chunk: DEFAULT_MAX_RETRIES_PER_CHUNK,
            part_size: MIN_PART_SIZE,
        }
    }
}

impl FileUploadTransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn single_file_concurrency(&self) -> usize {
        self.single_file_concurrency
    }

    pub fn multi_file_concurrency(&self) -> usize {
        self.multi_file_concurrency
    }

    pub fn max_retries_per_chunk(&self) -> usize {
        self.max_retries_per_chunk
    }

    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_single_file_concurrency(mut self, concurrency: usize) -> Self {
        self.single_file_concurrency = concurrency.max(1);
        self
    }

    pub fn with_multi_file_concurrency(mut self, concurrency: usize) -> Self {
        self.multi_file_concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_retries_per_chunk(mut self, max_retries: usize) -> Self {
        self.max_retries_per_chunk = max_retries;
        self
    }

    /// Sets the part size, floored at [`MIN_PART_SIZE`].
    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size.max(MIN_PART_SIZE);
        self
    }

    /// Concurrency for a batch of `files` uploaded together.
    pub fn concurrency_for(&self, files: usize) -> usize {
        if files > 1 {
            self.multi_file_concurrency
        } else {
            self.single_file_concurrency
        }
    }
}
