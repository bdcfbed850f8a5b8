use crate::android::binary_xml::{DecodeOptions, Decoder, Document};
use crate::android::error::AxmlError;
use log::debug;
use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;
use thiserror::Error;
use zip::read::ZipArchive;
use zip::result::ZipError;

/// Name of the binary manifest inside an APK.
pub const MANIFEST_ENTRY: &str = "AndroidManifest.xml";

const ZIP_LOCAL_HEADER_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Result alias for APK (ZIP) operations.
pub type ApkZipResult<T> = Result<T, ApkZipError>;

/// Errors surfaced while pulling the manifest out of an APK.
#[derive(Debug, Error)]
pub enum ApkZipError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] ZipError),
    #[error("APK has no {0} entry")]
    MissingEntry(String),
    #[error(transparent)]
    Decode(#[from] AxmlError),
}

/// The decompressed bytes of one APK entry.
#[derive(Clone, Debug)]
pub struct ApkEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl ApkEntry {
    /// Decode this entry as binary XML.
    pub fn decode(&self, options: DecodeOptions) -> Result<Document, AxmlError> {
        Decoder::new(options).decode(&self.data)
    }
}

/// A read-only APK (ZIP) archive. Entries are decompressed only when asked for.
pub struct ApkFile<R> {
    archive: ZipArchive<R>,
}

impl ApkFile<File> {
    pub fn from_file(path: impl AsRef<Path>) -> ApkZipResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }
}

impl<'a> ApkFile<io::Cursor<&'a [u8]>> {
    pub fn from_bytes(data: &'a [u8]) -> ApkZipResult<Self> {
        Self::from_reader(io::Cursor::new(data))
    }
}

impl<R: Read + Seek> ApkFile<R> {
    /// Reads the central directory only.
    pub fn from_reader(reader: R) -> ApkZipResult<Self> {
        let archive = ZipArchive::new(reader)?;
        debug!("[apk] {} entries", archive.len());
        Ok(ApkFile { archive })
    }

    /// Decompress a single entry by name.
    pub fn entry(&mut self, name: &str) -> ApkZipResult<ApkEntry> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Err(ApkZipError::MissingEntry(name.to_string())),
            Err(err) => return Err(err.into()),
        };
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        debug!("[apk] entry {} ({} bytes)", name, data.len());
        Ok(ApkEntry {
            name: name.to_string(),
            data,
        })
    }

    pub fn manifest(&mut self) -> ApkZipResult<ApkEntry> {
        self.entry(MANIFEST_ENTRY)
    }

    pub fn decode_manifest(&mut self, options: DecodeOptions) -> ApkZipResult<Document> {
        Ok(self.manifest()?.decode(options)?)
    }
}

/// Open an APK and decode its `AndroidManifest.xml` with default options.
pub fn decode_apk(path: impl AsRef<Path>) -> ApkZipResult<Document> {
    ApkFile::from_file(path)?.decode_manifest(DecodeOptions::default())
}

/// True when the bytes start with a ZIP local file header.
pub fn is_zip(data: &[u8]) -> bool {
    data.starts_with(&ZIP_LOCAL_HEADER_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builder::AxmlBuilder;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn apk_with(entries: &[(&str, &[u8])], method: CompressionMethod) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(method);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn manifest_bytes() -> Vec<u8> {
        let mut doc = AxmlBuilder::new();
        doc.start("manifest", &[]);
        doc.end("manifest");
        doc.build()
    }

    #[test]
    fn decodes_manifest_from_apk() {
        let manifest = manifest_bytes();
        let apk = apk_with(
            &[
                ("classes.dex", &b"dex\n035\0"[..]),
                (MANIFEST_ENTRY, &manifest[..]),
            ],
            CompressionMethod::Deflated,
        );
        assert!(is_zip(&apk));
        assert!(!is_zip(&manifest));

        let mut file = ApkFile::from_bytes(&apk).unwrap();
        let entry = file.manifest().unwrap();
        assert_eq!(entry.name, MANIFEST_ENTRY);
        assert_eq!(entry.data, manifest);
        let doc = file.decode_manifest(DecodeOptions::default()).unwrap();
        assert!(doc.xml().contains("<manifest>"));
    }

    #[test]
    fn damaged_unrelated_entry_does_not_block_the_manifest() {
        let manifest = manifest_bytes();
        let blob = [0x5Au8; 64];
        let mut apk = apk_with(
            &[
                ("assets/blob.bin", &blob[..]),
                (MANIFEST_ENTRY, &manifest[..]),
            ],
            CompressionMethod::Stored,
        );
        let at = apk
            .windows(blob.len())
            .position(|w| w == &blob[..])
            .unwrap();
        apk[at + 10] ^= 0xFF;

        let mut raw = ZipArchive::new(Cursor::new(&apk[..])).unwrap();
        let mut sink = Vec::new();
        assert!(raw
            .by_name("assets/blob.bin")
            .unwrap()
            .read_to_end(&mut sink)
            .is_err());

        let doc = ApkFile::from_bytes(&apk)
            .and_then(|mut file| file.decode_manifest(DecodeOptions::default()))
            .unwrap();
        assert!(doc.xml().ends_with("<manifest>\n</manifest>\n"));
    }

    #[test]
    fn missing_manifest_is_reported() {
        let apk = apk_with(&[("classes.dex", &b"dex\n035\0"[..])], CompressionMethod::Deflated);
        let mut file = ApkFile::from_bytes(&apk).unwrap();
        match file.decode_manifest(DecodeOptions::default()) {
            Err(ApkZipError::MissingEntry(name)) => assert_eq!(name, MANIFEST_ENTRY),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn bad_manifest_surfaces_decode_error() {
        let apk = apk_with(&[(MANIFEST_ENTRY, &b"<manifest/>"[..])], CompressionMethod::Deflated);
        let mut file = ApkFile::from_bytes(&apk).unwrap();
        assert!(matches!(
            file.decode_manifest(DecodeOptions::default()),
            Err(ApkZipError::Decode(AxmlError::Format { .. }))
        ));
    }
}
