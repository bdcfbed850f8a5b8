use thiserror::Error;

/// Result alias for binary XML operations.
pub type AxmlResult<T> = Result<T, AxmlError>;

/// Errors surfaced while decoding a binary XML document.
#[derive(Debug, Error)]
pub enum AxmlError {
    /// The file does not start with the binary XML magic.
    #[error("wrong format: expected magic 0x00080003, found 0x{found:08X}")]
    Format { found: u32 },

    /// The input cannot even hold the 8 byte file header.
    #[error("wrong format: input is {len} bytes, shorter than the file header")]
    TooShort { len: usize },

    /// A fixed-layout chunk is shorter than its header. The chunk is skipped.
    #[error(
        "truncated chunk 0x{chunk_type:08X} at offset 0x{offset:x}: needs {needed} bytes, {available} available"
    )]
    TruncatedChunk {
        chunk_type: u32,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A tag or attribute name index resolved to an empty string.
    #[error(
        "failed to get label name: chunk 0x{chunk_type:08X} at offset 0x{offset:x} references string {index}"
    )]
    MissingName {
        chunk_type: u32,
        offset: usize,
        index: u32,
    },

    /// Reading the input source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AxmlError {
    /// Whether decoding can skip the offending chunk and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AxmlError::TruncatedChunk { .. })
    }
}
