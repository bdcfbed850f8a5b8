//! # apkxml
//!
//! A library for turning Android's compiled binary XML, as found in the `AndroidManifest.xml` of
//! an APK, back into readable text XML.
//!
//! Decoding is a single pass over the chunk stream: the string pool is materialized first, then
//! namespace, start tag and end tag chunks are decoded and written out as indented XML. Damaged
//! chunks are skipped and recorded as [`Diagnostic`]s; only a bad file magic or an unnamed
//! element fails the whole decode.
//!
//! # Examples
//!
//! ```no_run
//!  use apkxml::{decode_reader, AxmlError};
//!  use std::fs::File;
//!
//!  let manifest = decode_reader(File::open("AndroidManifest.xml")?)?;
//!  println!("{}", manifest);
//!  # Ok::<(), AxmlError>(())
//! ```
//!
//! Straight from an APK:
//!
//! ```no_run
//!  use apkxml::android::zip::decode_apk;
//!
//!  let manifest = decode_apk("app.apk").unwrap();
//!  println!("package {:?}", manifest.package_name());
//! ```

pub mod android;
#[cfg(test)]
mod tests;

pub use crate::android::binary_xml::{
    decode_bytes, decode_reader, DecodeOptions, Decoder, Diagnostic, Document,
};
pub use crate::android::error::{AxmlError, AxmlResult};
pub use crate::android::string_pool::StringDecoding;
