//! Typed attribute values and their text rendering.
//!
//! The rendering here is what downstream tools parse, so every format string is fixed:
//! booleans as `true`/`false`, integers signed base 10, floats with six decimals, resource
//! references and flags as eight digit upper case hex.

use crate::android::chunks::{Attribute, NamespaceDecl};
use crate::android::string_pool::StringPool;
use serde::Serialize;

pub const TYPE_RESOURCE: u32 = 0x0100_0008;
pub const TYPE_ATTR: u32 = 0x0200_0008;
pub const TYPE_STRING: u32 = 0x0300_0008;
pub const TYPE_FLOAT: u32 = 0x0400_0008;
pub const TYPE_DIMEN: u32 = 0x0500_0008;
pub const TYPE_FRACTION: u32 = 0x0600_0008;
pub const TYPE_INT: u32 = 0x1000_0008;
pub const TYPE_FLAGS: u32 = 0x1100_0008;
pub const TYPE_BOOLEAN: u32 = 0x1200_0008;
pub const TYPE_COLOR1: u32 = 0x1C00_0008;
pub const TYPE_COLOR2: u32 = 0x1D00_0008;

/// Package id byte of framework (`android:`) resources.
const FRAMEWORK_PACKAGE_ID: u32 = 0x01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AttributeType {
    Resource,
    Attr,
    String,
    Float,
    Dimen,
    Fraction,
    Int,
    Flags,
    Boolean,
    Color1,
    Color2,
    Unknown(u32),
}

impl From<u32> for AttributeType {
    fn from(value: u32) -> Self {
        match value {
            TYPE_RESOURCE => AttributeType::Resource,
            TYPE_ATTR => AttributeType::Attr,
            TYPE_STRING => AttributeType::String,
            TYPE_FLOAT => AttributeType::Float,
            TYPE_DIMEN => AttributeType::Dimen,
            TYPE_FRACTION => AttributeType::Fraction,
            TYPE_INT => AttributeType::Int,
            TYPE_FLAGS => AttributeType::Flags,
            TYPE_BOOLEAN => AttributeType::Boolean,
            TYPE_COLOR1 => AttributeType::Color1,
            TYPE_COLOR2 => AttributeType::Color2,
            other => AttributeType::Unknown(other),
        }
    }
}

/// Read-only view used to turn string indices into text while decoding.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    pool: &'a StringPool,
    namespaces: &'a [NamespaceDecl],
}

impl<'a> Resolver<'a> {
    pub fn new(pool: &'a StringPool, namespaces: &'a [NamespaceDecl]) -> Self {
        Resolver { pool, namespaces }
    }

    pub fn string(&self, idx: u32) -> &'a str {
        self.pool.get(idx)
    }

    /// Prefix of the first declaration whose URI index matches, or `""`.
    pub fn prefix(&self, uri: u32) -> &'a str {
        self.namespaces
            .iter()
            .find(|ns| ns.uri == uri)
            .map(|ns| self.pool.get(ns.prefix))
            .unwrap_or("")
    }

    pub fn namespaces(&self) -> &'a [NamespaceDecl] {
        self.namespaces
    }
}

/// Render an attribute value the way it appears between the quotes in the text output.
pub fn format_value(attr: &Attribute, names: &Resolver<'_>) -> String {
    let data = attr.data;
    match attr.attribute_type() {
        AttributeType::Boolean => {
            if data != 0 {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        AttributeType::String => names.string(attr.value).to_string(),
        AttributeType::Float => format_float(f32::from_bits(data)),
        AttributeType::Int => (data as i32).to_string(),
        AttributeType::Resource => {
            let prefix = names.prefix(attr.namespace);
            if data >> 24 == FRAMEWORK_PACKAGE_ID && !prefix.is_empty() {
                format!("@{prefix}:{data:08X}")
            } else {
                format!("@{data:08X}")
            }
        }
        AttributeType::Flags => format!("0x{data:08X}"),
        AttributeType::Attr
        | AttributeType::Dimen
        | AttributeType::Fraction
        | AttributeType::Color1
        | AttributeType::Color2
        | AttributeType::Unknown(_) => names.string(attr.value).to_string(),
    }
}

// `{:.6}` would print `inf`; the text form uses `+Inf`, `-Inf` and `NaN`.
fn format_float(value: f32) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f32::INFINITY {
        "+Inf".to_string()
    } else if value == f32::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        format!("{value:.6}")
    }
}
