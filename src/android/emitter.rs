//! Indented text XML writer driven by decoded tag events.

use crate::android::binary_xml::DecodeOptions;
use crate::android::chunks::{NamespaceDecl, TagEnd, TagStart};
use crate::android::error::{AxmlError, AxmlResult};
use crate::android::reader::{CHUNK_END_TAG, CHUNK_START_TAG};
use crate::android::value::{format_value, Resolver};
use log::debug;
use quick_xml::escape::escape;

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

const INDENT: &str = "    ";

/// Where the emitter stands in the element tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmitState {
    /// No element open.
    #[default]
    Idle,
    /// A start tag at this depth is being written, its `>` not yet emitted.
    InsideElement(usize),
    /// Children are written at this depth.
    Nested(usize),
}

/// Nesting state of one decode. Owned by its emitter, never shared.
#[derive(Clone, Debug, Default)]
pub struct EmitContext {
    state: EmitState,
}

impl EmitContext {
    pub fn state(&self) -> EmitState {
        self.state
    }

    pub fn depth(&self) -> usize {
        match self.state {
            EmitState::Idle => 0,
            EmitState::InsideElement(depth) | EmitState::Nested(depth) => depth,
        }
    }

    fn open(&mut self) -> usize {
        let depth = self.depth();
        self.state = EmitState::InsideElement(depth);
        depth
    }

    fn close_start(&mut self) {
        self.state = EmitState::Nested(self.depth() + 1);
    }

    /// Leave the innermost element. `None` when nothing is open.
    fn close_element(&mut self) -> Option<usize> {
        match self.state {
            EmitState::Nested(depth) if depth > 0 => {
                let depth = depth - 1;
                self.state = if depth == 0 {
                    EmitState::Idle
                } else {
                    EmitState::Nested(depth)
                };
                Some(depth)
            }
            _ => None,
        }
    }
}

pub struct XmlEmitter {
    out: String,
    ctx: EmitContext,
    root_tag: String,
    escape_values: bool,
}

impl XmlEmitter {
    pub fn new(options: &DecodeOptions) -> Self {
        XmlEmitter {
            out: String::from(XML_DECLARATION),
            ctx: EmitContext::default(),
            root_tag: options.root_tag.clone(),
            escape_values: options.escape_values,
        }
    }

    pub fn context(&self) -> &EmitContext {
        &self.ctx
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }

    /// Write `<name attr="..." ...>` and step one level deeper.
    ///
    /// On the root tag every collected namespace is declared: `xmlns:<prefix>="<uri>"`, or a
    /// default `xmlns="<uri>"` when the prefix is empty. Declarations whose URI resolves empty are
    /// left out and returned to the caller.
    ///
    /// Fails with [`AxmlError::MissingName`] when the tag or one of its attributes has no name;
    /// nothing is written in that case.
    pub fn start_tag(
        &mut self,
        tag: &TagStart,
        offset: usize,
        names: &Resolver<'_>,
    ) -> AxmlResult<Vec<NamespaceDecl>> {
        let name = names.string(tag.name);
        if name.is_empty() {
            return Err(missing_name(CHUNK_START_TAG, offset, tag.name));
        }
        if let Some(attr) = tag
            .attributes
            .iter()
            .find(|attr| names.string(attr.name).is_empty())
        {
            return Err(missing_name(CHUNK_START_TAG, offset, attr.name));
        }

        let depth = self.ctx.open();
        push_indent(&mut self.out, depth);
        self.out.push('<');
        self.out.push_str(name);

        let mut first = true;
        let mut dropped = Vec::new();
        if name == self.root_tag {
            for ns in names.namespaces() {
                let prefix = names.string(ns.prefix);
                let uri = names.string(ns.uri);
                if uri.is_empty() {
                    debug!("[emit] skipping namespace with unresolved uri {}", ns.uri);
                    dropped.push(*ns);
                    continue;
                }
                self.separate(&mut first, depth);
                if prefix.is_empty() {
                    self.out.push_str(&format!("xmlns=\"{uri}\""));
                } else {
                    self.out.push_str(&format!("xmlns:{prefix}=\"{uri}\""));
                }
            }
        }

        for attr in &tag.attributes {
            let attr_name = names.string(attr.name);
            let prefix = names.prefix(attr.namespace);
            let value = format_value(attr, names);
            self.separate(&mut first, depth);
            if !prefix.is_empty() {
                self.out.push_str(prefix);
                self.out.push(':');
            }
            self.out.push_str(attr_name);
            self.out.push_str("=\"");
            if self.escape_values {
                self.out.push_str(&escape(value.as_str()));
            } else {
                self.out.push_str(&value);
            }
            self.out.push('"');
        }

        self.out.push_str(">\n");
        self.ctx.close_start();
        Ok(dropped)
    }

    /// Step one level back and write `</name>`.
    ///
    /// Returns `false` when no element was open; the tag is then written at depth zero.
    pub fn end_tag(&mut self, tag: &TagEnd, offset: usize, names: &Resolver<'_>) -> AxmlResult<bool> {
        let name = names.string(tag.name);
        if name.is_empty() {
            return Err(missing_name(CHUNK_END_TAG, offset, tag.name));
        }
        let (depth, balanced) = match self.ctx.close_element() {
            Some(depth) => (depth, true),
            None => (0, false),
        };
        push_indent(&mut self.out, depth);
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push_str(">\n");
        Ok(balanced)
    }

    // First item shares the opening line, the rest go one level deeper on their own lines.
    fn separate(&mut self, first: &mut bool, depth: usize) {
        if *first {
            self.out.push(' ');
            *first = false;
        } else {
            self.out.push('\n');
            push_indent(&mut self.out, depth + 1);
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn missing_name(chunk_type: u32, offset: usize, index: u32) -> AxmlError {
    AxmlError::MissingName {
        chunk_type,
        offset,
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::android::chunks::Attribute;
    use crate::android::string_pool::StringPool;
    use crate::android::value::{TYPE_BOOLEAN, TYPE_STRING};

    const NONE: u32 = 0xFFFF_FFFF;

    fn start(name: u32, attributes: Vec<Attribute>) -> TagStart {
        TagStart {
            line: 1,
            namespace: NONE,
            name,
            flags: 0x0014_0014,
            attribute_count: attributes.len() as u32,
            class_attribute: 0,
            attributes,
        }
    }

    fn end(name: u32) -> TagEnd {
        TagEnd {
            line: 1,
            namespace: NONE,
            name,
        }
    }

    #[test]
    fn state_follows_nesting() {
        let pool = StringPool::from_strings(["manifest", "application"]);
        let names = Resolver::new(&pool, &[]);
        let mut emitter = XmlEmitter::new(&DecodeOptions::default());
        assert_eq!(emitter.context().state(), EmitState::Idle);

        emitter.start_tag(&start(0, vec![]), 0, &names).unwrap();
        assert_eq!(emitter.context().state(), EmitState::Nested(1));
        emitter.start_tag(&start(1, vec![]), 0, &names).unwrap();
        assert_eq!(emitter.context().depth(), 2);
        assert!(emitter.end_tag(&end(1), 0, &names).unwrap());
        assert!(emitter.end_tag(&end(0), 0, &names).unwrap());
        assert_eq!(emitter.context().state(), EmitState::Idle);

        assert_eq!(
            emitter.finish(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <manifest>\n\
             \x20   <application>\n\
             \x20   </application>\n\
             </manifest>\n"
        );
    }

    #[test]
    fn unbalanced_end_tag_stays_at_zero() {
        let pool = StringPool::from_strings(["manifest"]);
        let names = Resolver::new(&pool, &[]);
        let mut emitter = XmlEmitter::new(&DecodeOptions::default());
        assert!(!emitter.end_tag(&end(0), 0, &names).unwrap());
        assert!(emitter.output().ends_with("\n</manifest>\n"));
        assert_eq!(emitter.context().depth(), 0);
    }

    #[test]
    fn root_gets_namespaces_and_attributes_wrap() {
        let pool = StringPool::from_strings([
            "manifest",
            "android",
            "http://schemas.android.com/apk/res/android",
            "package",
            "com.example",
            "debuggable",
        ]);
        let namespaces = [NamespaceDecl {
            line: 1,
            prefix: 1,
            uri: 2,
        }];
        let names = Resolver::new(&pool, &namespaces);
        let attributes = vec![
            Attribute {
                namespace: NONE,
                name: 3,
                value: 4,
                value_type: TYPE_STRING,
                data: 4,
            },
            Attribute {
                namespace: 2,
                name: 5,
                value: NONE,
                value_type: TYPE_BOOLEAN,
                data: 0xFFFF_FFFF,
            },
        ];
        let mut emitter = XmlEmitter::new(&DecodeOptions::default());
        emitter.start_tag(&start(0, attributes), 0, &names).unwrap();
        assert_eq!(
            emitter.output(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <manifest xmlns:android=\"http://schemas.android.com/apk/res/android\"\n\
             \x20   package=\"com.example\"\n\
             \x20   android:debuggable=\"true\">\n"
        );
    }

    #[test]
    fn default_and_unresolved_namespaces_on_root() {
        let pool = StringPool::from_strings(["manifest", "", "http://a", "p"]);
        let namespaces = [
            NamespaceDecl {
                line: 1,
                prefix: 1,
                uri: 2,
            },
            NamespaceDecl {
                line: 2,
                prefix: 3,
                uri: 99,
            },
        ];
        let names = Resolver::new(&pool, &namespaces);
        let mut emitter = XmlEmitter::new(&DecodeOptions::default());
        let dropped = emitter.start_tag(&start(0, vec![]), 0, &names).unwrap();
        assert_eq!(dropped, vec![namespaces[1]]);
        assert_eq!(
            emitter.output(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<manifest xmlns=\"http://a\">\n"
        );
    }

    #[test]
    fn missing_names_fail_without_output() {
        let pool = StringPool::from_strings(["manifest"]);
        let names = Resolver::new(&pool, &[]);
        let mut emitter = XmlEmitter::new(&DecodeOptions::default());

        let err = emitter.start_tag(&start(9, vec![]), 0x40, &names).unwrap_err();
        assert!(matches!(
            err,
            AxmlError::MissingName {
                chunk_type: CHUNK_START_TAG,
                offset: 0x40,
                index: 9
            }
        ));

        let unnamed_attr = Attribute {
            namespace: NONE,
            name: 7,
            value: NONE,
            value_type: TYPE_BOOLEAN,
            data: 1,
        };
        assert!(emitter
            .start_tag(&start(0, vec![unnamed_attr]), 0, &names)
            .is_err());
        assert!(emitter.end_tag(&end(3), 0, &names).is_err());
        assert_eq!(emitter.output(), XML_DECLARATION);
        assert_eq!(emitter.context().state(), EmitState::Idle);
    }

    #[test]
    fn escapes_values_when_asked() {
        let pool = StringPool::from_strings(["meta-data", "value", "a<b & \"c\""]);
        let names = Resolver::new(&pool, &[]);
        let attr = Attribute {
            namespace: NONE,
            name: 1,
            value: 2,
            value_type: TYPE_STRING,
            data: 2,
        };

        let mut plain = XmlEmitter::new(&DecodeOptions::default());
        plain.start_tag(&start(0, vec![attr]), 0, &names).unwrap();
        assert!(plain.output().contains("value=\"a<b & \"c\"\""));

        let mut escaped = XmlEmitter::new(&DecodeOptions::default().with_escape_values(true));
        escaped.start_tag(&start(0, vec![attr]), 0, &names).unwrap();
        assert!(escaped
            .output()
            .contains("value=\"a&lt;b &amp; &quot;c&quot;\""));
    }
}
