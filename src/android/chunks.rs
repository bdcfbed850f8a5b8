//! Decoders for the fixed-layout structural chunks: namespace start, tag start and tag end.
//!
//! All fields are little-endian `u32`s read one by one. A chunk shorter than its fixed header
//! yields [`AxmlError::TruncatedChunk`](crate::android::error::AxmlError::TruncatedChunk).

use crate::android::error::AxmlResult;
use crate::android::reader::Chunk;
use crate::android::value::AttributeType;
use nom::multi::count;
use nom::number::complete::le_u32;
use nom::sequence::tuple;
use nom::IResult;
use serde::Serialize;

pub const NAMESPACE_RECORD_SIZE: usize = 24;
pub const TAG_START_HEADER_SIZE: usize = 36;
pub const ATTRIBUTE_RECORD_SIZE: usize = 20;
pub const TAG_END_RECORD_SIZE: usize = 24;

/// A namespace declared by a namespace start chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct NamespaceDecl {
    pub line: u32,
    /// String pool index of the prefix, e.g. `android`.
    pub prefix: u32,
    /// String pool index of the URI.
    pub uri: u32,
}

/// One attribute record of a tag start chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub namespace: u32,
    pub name: u32,
    /// String pool index of the raw value.
    pub value: u32,
    /// Type tag: `(data_type << 24) | 0x08`.
    pub value_type: u32,
    pub data: u32,
}

impl Attribute {
    pub fn attribute_type(&self) -> AttributeType {
        AttributeType::from(self.value_type)
    }
}

/// An element opening, with its attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagStart {
    pub line: u32,
    pub namespace: u32,
    pub name: u32,
    pub flags: u32,
    /// Attribute count as declared in the header.
    pub attribute_count: u32,
    pub class_attribute: u32,
    pub attributes: Vec<Attribute>,
}

impl TagStart {
    /// True when fewer attributes fit in the chunk than the header declares.
    pub fn is_clamped(&self) -> bool {
        (self.attributes.len() as u64) < self.attribute_count as u64
    }
}

/// An element closing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TagEnd {
    pub line: u32,
    pub namespace: u32,
    pub name: u32,
}

fn namespace_record(input: &[u8]) -> IResult<&[u8], NamespaceDecl> {
    let (input, (_chunk_type, _size, line, _reserved, prefix, uri)) =
        tuple((le_u32, le_u32, le_u32, le_u32, le_u32, le_u32))(input)?;
    Ok((input, NamespaceDecl { line, prefix, uri }))
}

fn attribute_record(input: &[u8]) -> IResult<&[u8], Attribute> {
    let (input, (namespace, name, value, value_type, data)) =
        tuple((le_u32, le_u32, le_u32, le_u32, le_u32))(input)?;
    Ok((
        input,
        Attribute {
            namespace,
            name,
            value,
            value_type,
            data,
        },
    ))
}

fn tag_start_header(input: &[u8]) -> IResult<&[u8], TagStart> {
    let (input, (_chunk_type, _size, line, _reserved, namespace, name)) =
        tuple((le_u32, le_u32, le_u32, le_u32, le_u32, le_u32))(input)?;
    let (input, (flags, attribute_count, class_attribute)) =
        tuple((le_u32, le_u32, le_u32))(input)?;
    Ok((
        input,
        TagStart {
            line,
            namespace,
            name,
            flags,
            attribute_count,
            class_attribute,
            attributes: Vec::new(),
        },
    ))
}

fn tag_end_record(input: &[u8]) -> IResult<&[u8], TagEnd> {
    let (input, (_chunk_type, _size, line, _reserved, namespace, name)) =
        tuple((le_u32, le_u32, le_u32, le_u32, le_u32, le_u32))(input)?;
    Ok((
        input,
        TagEnd {
            line,
            namespace,
            name,
        },
    ))
}

impl NamespaceDecl {
    pub fn parse(chunk: &Chunk<'_>) -> AxmlResult<Self> {
        namespace_record(chunk.data)
            .map(|(_, ns)| ns)
            .map_err(|_| chunk.truncated(NAMESPACE_RECORD_SIZE))
    }
}

impl TagStart {
    /// Decode the header and as many declared attributes as fit in the chunk.
    pub fn parse(chunk: &Chunk<'_>) -> AxmlResult<Self> {
        let (rest, mut tag) =
            tag_start_header(chunk.data).map_err(|_| chunk.truncated(TAG_START_HEADER_SIZE))?;
        let fits = rest.len() / ATTRIBUTE_RECORD_SIZE;
        let wanted = (tag.attribute_count as usize).min(fits);
        let (_, attributes) = count(attribute_record, wanted)(rest)
            .map_err(|_| chunk.truncated(TAG_START_HEADER_SIZE + wanted * ATTRIBUTE_RECORD_SIZE))?;
        tag.attributes = attributes;
        Ok(tag)
    }
}

impl TagEnd {
    pub fn parse(chunk: &Chunk<'_>) -> AxmlResult<Self> {
        tag_end_record(chunk.data)
            .map(|(_, tag)| tag)
            .map_err(|_| chunk.truncated(TAG_END_RECORD_SIZE))
    }
}
