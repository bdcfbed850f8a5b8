use crate::android::error::AxmlResult;
use crate::android::reader::{read_u16, read_u32, Chunk};
use serde::Serialize;

/// Size of the fixed string pool chunk header.
pub const STRING_POOL_HEADER_SIZE: usize = 28;

/// Flag bit set by aapt when the pool stores UTF-8 instead of UTF-16.
pub const STRING_FLAG_UTF8: u32 = 0x0000_0100;

/// How the UTF-16 code units of a pooled string are turned into text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum StringDecoding {
    /// Drop every zero byte and read what is left as Latin-1.
    ///
    /// Only correct for characters below U+0100. Existing consumers of the text output rely on
    /// this, so it stays the default.
    #[default]
    ZeroStripped,
    /// Decode the code units as UTF-16LE, replacing unpaired surrogates.
    Utf16,
}

impl StringDecoding {
    fn decode(self, bytes: &[u8]) -> String {
        match self {
            StringDecoding::ZeroStripped => bytes
                .iter()
                .filter(|b| **b != 0)
                .map(|b| *b as char)
                .collect(),
            StringDecoding::Utf16 => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
        }
    }
}

/// The interned string table of a document.
///
/// Every name, prefix, URI and string value elsewhere in the document is an index into this
/// table. Lookups are bounds-checked and resolve to `""` when out of range.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StringPool {
    strings: Vec<String>,
    declared_count: u32,
    style_count: u32,
    flags: u32,
    strings_start: u32,
    styles_start: u32,
}

impl StringPool {
    /// Decode a string pool chunk.
    ///
    /// Strings are read back to back from `strings_start`: a 2 byte length in code units, the
    /// code units, then 4 more bytes (terminator and padding) before the next length. The walk
    /// ends at the chunk boundary, so trailing padding may add empty entries past the declared
    /// count.
    pub fn parse(chunk: &Chunk<'_>, decoding: StringDecoding) -> AxmlResult<Self> {
        let data = chunk.data;
        if data.len() < STRING_POOL_HEADER_SIZE {
            return Err(chunk.truncated(STRING_POOL_HEADER_SIZE));
        }
        let field = |offset| read_u32(data, offset).unwrap_or(0);
        let declared_count = field(8);
        let style_count = field(12);
        let flags = field(16);
        let strings_start = field(20);
        let styles_start = field(24);

        let mut strings = Vec::with_capacity(declared_count.min(0x1_0000) as usize);
        let mut cursor = strings_start as usize;
        while cursor < data.len() {
            let Some(units) = read_u16(data, cursor) else {
                break;
            };
            let byte_len = units as usize * 2;
            let start = cursor + 2;
            let end = start.saturating_add(byte_len).min(data.len());
            strings.push(decoding.decode(&data[start..end]));
            cursor = cursor.saturating_add(byte_len + 4);
        }

        Ok(StringPool {
            strings,
            declared_count,
            style_count,
            flags,
            strings_start,
            styles_start,
        })
    }

    /// Build a pool directly from decoded strings.
    pub fn from_strings<I, S>(strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let strings: Vec<String> = strings.into_iter().map(Into::into).collect();
        StringPool {
            declared_count: strings.len() as u32,
            strings,
            ..StringPool::default()
        }
    }

    pub fn get(&self, idx: u32) -> &str {
        self.strings
            .get(idx as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// String count from the chunk header, which can differ from [`StringPool::len`].
    pub fn declared_count(&self) -> u32 {
        self.declared_count
    }

    pub fn style_count(&self) -> u32 {
        self.style_count
    }

    pub fn styles_start(&self) -> u32 {
        self.styles_start
    }

    pub fn strings_start(&self) -> u32 {
        self.strings_start
    }

    pub fn is_utf8(&self) -> bool {
        self.flags & STRING_FLAG_UTF8 != 0
    }
}
