//! Android binary XML decoding and the APK container around it.

pub mod binary_xml;
pub mod chunks;
pub mod emitter;
pub mod error;
pub mod reader;
pub mod string_pool;
pub mod value;
pub mod zip;
