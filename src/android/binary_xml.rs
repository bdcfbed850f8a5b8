use crate::android::chunks::{NamespaceDecl, TagEnd, TagStart};
use crate::android::emitter::XmlEmitter;
use crate::android::error::{AxmlError, AxmlResult};
use crate::android::reader::{
    Chunk, Chunks, FileHeader, CHUNK_END_TAG, CHUNK_START_NAMESPACE, CHUNK_START_TAG,
    CHUNK_STRING_POOL, FILE_HEADER_SIZE,
};
use crate::android::string_pool::{StringDecoding, StringPool};
use crate::android::value::{format_value, Resolver};
use log::{debug, trace, warn};
use serde::{Serialize, Serializer};
use std::fmt;
use std::io::Read;

/// Tag that receives the `xmlns` declarations unless configured otherwise.
pub const DEFAULT_ROOT_TAG: &str = "manifest";

/// Knobs for a single decode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    pub string_decoding: StringDecoding,
    /// XML-escape attribute values. Off by default so the output matches existing tools.
    pub escape_values: bool,
    pub root_tag: String,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            string_decoding: StringDecoding::default(),
            escape_values: false,
            root_tag: DEFAULT_ROOT_TAG.to_string(),
        }
    }
}

impl DecodeOptions {
    pub fn with_string_decoding(mut self, decoding: StringDecoding) -> Self {
        self.string_decoding = decoding;
        self
    }

    pub fn with_escape_values(mut self, escape: bool) -> Self {
        self.escape_values = escape;
        self
    }

    pub fn with_root_tag(mut self, tag: impl Into<String>) -> Self {
        self.root_tag = tag.into();
        self
    }
}

/// A recoverable problem met while decoding. The document is still produced.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A chunk could not be decoded and was skipped.
    SkippedChunk {
        #[serde(serialize_with = "serialize_display")]
        error: AxmlError,
    },
    /// A chunk declares more bytes than the input holds.
    ChunkOverrun {
        chunk_type: u32,
        offset: usize,
        declared: u32,
        available: usize,
    },
    /// A start tag declares more attributes than its chunk holds.
    AttributesClamped {
        offset: usize,
        declared: u32,
        decoded: usize,
    },
    /// The string pool is flagged UTF-8 but was read with the UTF-16 layout.
    Utf8StringPool { offset: usize },
    /// A string pool arrived after tags had already been resolved against an earlier one.
    LateStringPool { offset: usize },
    /// A namespace declaration left off the root tag because its URI has no string.
    UnresolvedNamespace { line: u32, prefix: u32, uri: u32 },
    /// An end tag with no open element.
    UnbalancedEndTag { offset: usize },
    /// Elements still open when the input ran out.
    UnclosedElements { depth: usize },
}

fn serialize_display<S: Serializer>(value: &AxmlError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// The result of decoding one binary XML document.
#[derive(Debug, Serialize)]
pub struct Document {
    file_size: u32,
    strings: StringPool,
    namespaces: Vec<NamespaceDecl>,
    tags: Vec<TagStart>,
    #[serde(skip)]
    xml: String,
    diagnostics: Vec<Diagnostic>,
}

impl Document {
    /// The decoded text, starting with the XML declaration.
    pub fn xml(&self) -> &str {
        &self.xml
    }

    pub fn into_xml(self) -> String {
        self.xml
    }

    /// Total size declared by the file header.
    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    pub fn namespaces(&self) -> &[NamespaceDecl] {
        &self.namespaces
    }

    /// Every start tag in document order.
    pub fn tags(&self) -> &[TagStart] {
        &self.tags
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.strings, &self.namespaces)
    }

    pub fn tag_name(&self, tag: &TagStart) -> &str {
        self.strings.get(tag.name)
    }

    /// Rendered value of the attribute with this local name, as it appears in the text output.
    pub fn attribute_text(&self, tag: &TagStart, name: &str) -> Option<String> {
        let names = self.resolver();
        tag.attributes
            .iter()
            .find(|attr| names.string(attr.name) == name)
            .map(|attr| format_value(attr, &names))
    }

    /// The first start tag, when it is a `manifest` element.
    pub fn manifest(&self) -> Option<&TagStart> {
        self.tags
            .first()
            .filter(|tag| self.tag_name(tag) == DEFAULT_ROOT_TAG)
    }

    pub fn package_name(&self) -> Option<String> {
        self.manifest()
            .and_then(|tag| self.attribute_text(tag, "package"))
    }

    pub fn version_name(&self) -> Option<String> {
        self.manifest()
            .and_then(|tag| self.attribute_text(tag, "versionName"))
    }

    pub fn version_code(&self) -> Option<String> {
        self.manifest()
            .and_then(|tag| self.attribute_text(tag, "versionCode"))
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xml)
    }
}

/// Decoder state for a single document.
///
/// Chunks are handled strictly in stream order: the string pool has to be in place before tags
/// resolve names against it, and nesting depth carries over from one tag to the next. Each
/// decoder owns all of that state, so independent decoders can run on separate threads.
pub struct Decoder {
    options: DecodeOptions,
    strings: StringPool,
    namespaces: Vec<NamespaceDecl>,
    tags: Vec<TagStart>,
    diagnostics: Vec<Diagnostic>,
    emitter: XmlEmitter,
}

impl Decoder {
    pub fn new(options: DecodeOptions) -> Self {
        let emitter = XmlEmitter::new(&options);
        Decoder {
            options,
            strings: StringPool::default(),
            namespaces: Vec::new(),
            tags: Vec::new(),
            diagnostics: Vec::new(),
            emitter,
        }
    }

    pub fn decode_reader<R: Read>(self, mut reader: R) -> AxmlResult<Document> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.decode(&data)
    }

    pub fn decode(mut self, data: &[u8]) -> AxmlResult<Document> {
        let header = FileHeader::read(data)?;
        debug!(
            "[axml] file size: {} bytes declared, {} bytes read",
            header.file_size,
            data.len()
        );

        for item in Chunks::new(data, FILE_HEADER_SIZE) {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(err) => {
                    self.skip(err);
                    continue;
                }
            };
            if chunk.is_clamped() {
                warn!(
                    "[axml] chunk 0x{:08x} at 0x{:x} declares {} bytes, only {} available",
                    chunk.chunk_type,
                    chunk.offset,
                    chunk.declared_size,
                    chunk.data.len()
                );
                self.diagnostics.push(Diagnostic::ChunkOverrun {
                    chunk_type: chunk.chunk_type,
                    offset: chunk.offset,
                    declared: chunk.declared_size,
                    available: chunk.data.len(),
                });
            }
            match self.dispatch(&chunk) {
                Ok(()) => {}
                Err(err) if err.is_recoverable() => self.skip(err),
                Err(err) => return Err(err),
            }
        }

        let depth = self.emitter.context().depth();
        if depth > 0 {
            warn!("[axml] {} element(s) left open at end of input", depth);
            self.diagnostics.push(Diagnostic::UnclosedElements { depth });
        }

        Ok(Document {
            file_size: header.file_size,
            strings: self.strings,
            namespaces: self.namespaces,
            tags: self.tags,
            xml: self.emitter.finish(),
            diagnostics: self.diagnostics,
        })
    }

    fn dispatch(&mut self, chunk: &Chunk<'_>) -> AxmlResult<()> {
        match chunk.chunk_type {
            CHUNK_STRING_POOL => {
                let pool = StringPool::parse(chunk, self.options.string_decoding)?;
                debug!(
                    "[axml] string pool: {} declared, {} decoded",
                    pool.declared_count(),
                    pool.len()
                );
                if pool.is_utf8() {
                    warn!(
                        "[axml] string pool at 0x{:x} is flagged UTF-8, reading it as UTF-16",
                        chunk.offset
                    );
                    self.diagnostics.push(Diagnostic::Utf8StringPool {
                        offset: chunk.offset,
                    });
                }
                if !self.tags.is_empty() {
                    self.diagnostics.push(Diagnostic::LateStringPool {
                        offset: chunk.offset,
                    });
                }
                self.strings = pool;
            }
            CHUNK_START_NAMESPACE => {
                let ns = NamespaceDecl::parse(chunk)?;
                trace!("[axml] namespace prefix={} uri={}", ns.prefix, ns.uri);
                self.namespaces.push(ns);
            }
            CHUNK_START_TAG => {
                let tag = TagStart::parse(chunk)?;
                if tag.is_clamped() {
                    warn!(
                        "[axml] tag at 0x{:x} declares {} attributes, only {} fit",
                        chunk.offset,
                        tag.attribute_count,
                        tag.attributes.len()
                    );
                    self.diagnostics.push(Diagnostic::AttributesClamped {
                        offset: chunk.offset,
                        declared: tag.attribute_count,
                        decoded: tag.attributes.len(),
                    });
                }
                let names = Resolver::new(&self.strings, &self.namespaces);
                for ns in self.emitter.start_tag(&tag, chunk.offset, &names)? {
                    warn!(
                        "[axml] namespace on line {} has unresolved uri {}, not declared",
                        ns.line, ns.uri
                    );
                    self.diagnostics.push(Diagnostic::UnresolvedNamespace {
                        line: ns.line,
                        prefix: ns.prefix,
                        uri: ns.uri,
                    });
                }
                self.tags.push(tag);
            }
            CHUNK_END_TAG => {
                let tag = TagEnd::parse(chunk)?;
                let names = Resolver::new(&self.strings, &self.namespaces);
                if !self.emitter.end_tag(&tag, chunk.offset, &names)? {
                    warn!("[axml] end tag at 0x{:x} has no open element", chunk.offset);
                    self.diagnostics.push(Diagnostic::UnbalancedEndTag {
                        offset: chunk.offset,
                    });
                }
            }
            other => {
                trace!("[axml] skipping chunk 0x{:08x} at 0x{:x}", other, chunk.offset);
            }
        }
        Ok(())
    }

    fn skip(&mut self, err: AxmlError) {
        warn!("[axml] skipping chunk: {}", err);
        self.diagnostics.push(Diagnostic::SkippedChunk { error: err });
    }
}

/// Decode a complete binary XML buffer with default options.
pub fn decode_bytes(data: &[u8]) -> AxmlResult<Document> {
    Decoder::new(DecodeOptions::default()).decode(data)
}

/// Read a binary XML document to the end and decode it with default options.
pub fn decode_reader<R: Read>(reader: R) -> AxmlResult<Document> {
    Decoder::new(DecodeOptions::default()).decode_reader(reader)
}
