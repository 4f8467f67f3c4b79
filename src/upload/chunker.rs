//! Splits a sliced upload into chunks of files uploaded together.

/// Splits keyed files into consecutive chunks of at most `chunk_size`
/// entries, preserving order.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn make_chunks<T: Clone>(&self, items: &[T]) -> Vec<Vec<T>> {
        items
            .chunks(self.chunk_size)
            .map(|chunk| chunk.to_vec())
            .collect()
    }
}
