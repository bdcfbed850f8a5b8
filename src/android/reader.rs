//! Chunk level access to a binary XML buffer.
//!
//! A binary XML file is an 8 byte file header (magic plus total size) followed by a flat run of
//! self-describing chunks. Every chunk starts with a 4 byte type tag and a 4 byte size that
//! includes the chunk header itself. [`Chunks`] walks that run lazily and hands out one borrowed
//! slice per chunk.

use crate::android::error::{AxmlError, AxmlResult};
use log::trace;

/// Magic value at offset 0 of every binary XML document.
pub const XML_MAGIC: u32 = 0x0008_0003;

pub const FILE_HEADER_SIZE: usize = 8;
pub const CHUNK_HEADER_SIZE: usize = 8;

pub const CHUNK_STRING_POOL: u32 = 0x001C_0001;
pub const CHUNK_RESOURCE_MAP: u32 = 0x0008_0180;
pub const CHUNK_START_NAMESPACE: u32 = 0x0010_0100;
pub const CHUNK_END_NAMESPACE: u32 = 0x0010_0101;
pub const CHUNK_START_TAG: u32 = 0x0010_0102;
pub const CHUNK_END_TAG: u32 = 0x0010_0103;

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let end = offset.checked_add(2)?;
    let raw = bytes.get(offset..end)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let raw = bytes.get(offset..end)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// The 8 byte preamble of a binary XML file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: u32,
    /// Declared total size. Informational only, never checked against the buffer.
    pub file_size: u32,
}

impl FileHeader {
    pub fn read(data: &[u8]) -> AxmlResult<Self> {
        let magic = read_u32(data, 0).ok_or(AxmlError::TooShort { len: data.len() })?;
        if magic != XML_MAGIC {
            return Err(AxmlError::Format { found: magic });
        }
        let file_size = read_u32(data, 4).ok_or(AxmlError::TooShort { len: data.len() })?;
        Ok(FileHeader { magic, file_size })
    }
}

/// One chunk of the document, borrowed from the input buffer.
#[derive(Clone, Copy, Debug)]
pub struct Chunk<'a> {
    pub chunk_type: u32,
    /// Absolute offset of the chunk header in the input.
    pub offset: usize,
    pub declared_size: u32,
    /// Chunk bytes including the header, cut short when the declared size overruns the input.
    pub data: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// True when the declared size reaches past the end of the input.
    pub fn is_clamped(&self) -> bool {
        self.declared_size as usize > self.data.len()
    }

    pub(crate) fn truncated(&self, needed: usize) -> AxmlError {
        AxmlError::TruncatedChunk {
            chunk_type: self.chunk_type,
            offset: self.offset,
            needed,
            available: self.data.len(),
        }
    }
}

/// Lazy iterator over the chunks following the file header.
///
/// The cursor always moves by the declared chunk size, whatever the chunk type, so unknown kinds
/// are stepped over. A declared size below the chunk header size is treated as 8 so the walk
/// always makes progress.
pub struct Chunks<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Chunks<'a> {
    pub fn new(data: &'a [u8], start: usize) -> Self {
        Chunks { data, pos: start }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = AxmlResult<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        let offset = self.pos;
        let remaining = self.data.len() - offset;
        if remaining < CHUNK_HEADER_SIZE {
            self.pos = self.data.len();
            return Some(Err(AxmlError::TruncatedChunk {
                chunk_type: read_u32(self.data, offset).unwrap_or(0),
                offset,
                needed: CHUNK_HEADER_SIZE,
                available: remaining,
            }));
        }

        let chunk_type = read_u32(self.data, offset)?;
        let declared_size = read_u32(self.data, offset + 4)?;
        let step = (declared_size as usize).max(CHUNK_HEADER_SIZE);
        let end = offset.saturating_add(step).min(self.data.len());
        self.pos = offset.saturating_add(step);

        trace!(
            "[chunk] type=0x{:08x} offset=0x{:x} size={} available={}",
            chunk_type,
            offset,
            declared_size,
            end - offset
        );

        Some(Ok(Chunk {
            chunk_type,
            offset,
            declared_size,
            data: &self.data[offset..end],
        }))
    }
}
