use std::io::{BufReader, Read};

use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use stream_buffer::ChunkQueueBuffer;
use stream_engine::{Produce, Producer};
use stream_error::{Result, StreamError};

use crate::schema::{Schema, SchemaValidator};

/// Construction-time options for the XML translator.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Default)]
pub struct XmlTranslateOptions {
    /// Omit comments and insignificant whitespace from the output.
    pub terse: bool,
}

/// Node-granular XML copy-with-rewrite.
///
/// One produce call reads exactly one node from the source cursor and
/// re-serializes it, so the emitted stream is well-formed at every yield
/// point. Raw node bytes are copied through untouched (entity references
/// included); only the XML declaration is re-assembled from its parsed
/// parts.
///
/// With a [`Schema`] attached, every node is additionally run through a
/// validator whose findings accumulate silently; the engine escalates
/// them into a single aggregate failure at end-of-stream.
pub struct XmlTranslateProducer<R: Read> {
    reader: Reader<BufReader<R>>,
    buf: Vec<u8>,
    options: XmlTranslateOptions,
    validator: Option<SchemaValidator>,
    scopes: NamespaceScopes,
    preserve_space: Vec<bool>,
    done: bool,
}

impl<R: Read> XmlTranslateProducer<R> {
    /// A plain copy translator.
    pub fn new(source: R, options: XmlTranslateOptions) -> Self {
        Self {
            reader: Reader::from_reader(BufReader::new(source)),
            buf: Vec::new(),
            options,
            validator: None,
            scopes: NamespaceScopes::default(),
            preserve_space: Vec::new(),
            done: false,
        }
    }

    /// A validating copy translator.
    pub fn validating(
        source: R,
        options: XmlTranslateOptions,
        schema: Schema,
    ) -> Self {
        let mut producer = Self::new(source, options);
        producer.validator = Some(SchemaValidator::new(schema));
        producer
    }

    fn element_start(
        &mut self,
        tag: &BytesStart,
        empty: bool,
        node: &mut Vec<u8>,
    ) -> Result<()> {
        let decoder = self.reader.decoder();
        let mut bindings = Vec::new();
        let mut attrs = Vec::new();
        let mut space_attr = None;

        for attr in tag.attributes().with_checks(false) {
            let attr = attr.map_err(anyhow::Error::new)?;
            let key = decoder
                .decode(attr.key.as_ref())
                .map_err(anyhow::Error::new)?
                .into_owned();
            let raw_value = decoder
                .decode(&attr.value)
                .map_err(anyhow::Error::new)?
                .into_owned();
            let value = quick_xml::escape::unescape(&raw_value)
                .map(|v| v.into_owned())
                .unwrap_or(raw_value);

            if key == "xmlns" {
                bindings.push((String::new(), value.clone()));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                bindings.push((prefix.to_owned(), value.clone()));
            } else if key == "xml:space" {
                space_attr = Some(value == "preserve");
            }
            attrs.push((key, value));
        }

        let name = tag.name();
        let local = decoder
            .decode(name.local_name().as_ref())
            .map_err(anyhow::Error::new)?
            .into_owned();
        let prefix = match name.prefix() {
            Some(prefix) => Some(
                decoder
                    .decode(prefix.as_ref())
                    .map_err(anyhow::Error::new)?
                    .into_owned(),
            ),
            None => None,
        };

        self.scopes.push(bindings);
        let namespace = self
            .scopes
            .resolve(prefix.as_deref())
            .unwrap_or_default()
            .to_owned();
        if let Some(validator) = &mut self.validator {
            validator.element_started(&local, &namespace, &attrs, empty);
        }

        if empty {
            self.scopes.pop();
            write_empty(node, tag);
        } else {
            let preserve = space_attr.unwrap_or_else(|| {
                self.preserve_space.last().copied().unwrap_or(false)
            });
            self.preserve_space.push(preserve);
            write_start(node, tag);
        }
        Ok(())
    }

    fn text_node(
        &mut self,
        raw: &[u8],
        node: &mut Vec<u8>,
    ) -> Result<()> {
        let decoder = self.reader.decoder();
        let text = decoder.decode(raw).map_err(anyhow::Error::new)?;
        let whitespace_only = text
            .chars()
            .all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));

        if let Some(validator) = &mut self.validator {
            let resolved = quick_xml::escape::unescape(&text)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| text.clone().into_owned());
            validator.text(&resolved, "");
        }

        if whitespace_only {
            let significant =
                self.preserve_space.last().copied().unwrap_or(false);
            if self.options.terse && !significant {
                return Ok(());
            }
        }
        node.extend_from_slice(raw);
        Ok(())
    }
}

impl<R: Read> Producer for XmlTranslateProducer<R> {
    fn label(&self) -> &str {
        if self.validator.is_some() {
            "xml-validate"
        } else {
            "xml-translate"
        }
    }

    fn produce_next(&mut self, out: &mut ChunkQueueBuffer) -> Result<Produce> {
        if self.done {
            return Ok(Produce::Exhausted);
        }

        self.buf.clear();
        let event = match self.reader.read_event_into(&mut self.buf) {
            Ok(event) => event.into_owned(),
            Err(quick_xml::Error::Io(io)) => {
                return Err(StreamError::Io(std::io::Error::new(io.kind(), io)))
            }
            Err(other) => return Err(anyhow::Error::new(other).into()),
        };

        let mut node = Vec::new();
        match event {
            Event::Eof => {
                self.done = true;
                if let Some(validator) = &mut self.validator {
                    validator.document_ended();
                }
                return Ok(Produce::Exhausted);
            }
            Event::Start(tag) => self.element_start(&tag, false, &mut node)?,
            Event::Empty(tag) => self.element_start(&tag, true, &mut node)?,
            Event::End(tag) => {
                self.scopes.pop();
                self.preserve_space.pop();
                if let Some(validator) = &mut self.validator {
                    validator.element_ended();
                }
                write_end(&mut node, tag.name().as_ref());
            }
            Event::Text(text) => self.text_node(&text, &mut node)?,
            Event::CData(data) => {
                if let Some(validator) = &mut self.validator {
                    let decoder = self.reader.decoder();
                    let value = decoder
                        .decode(&data)
                        .map_err(anyhow::Error::new)?;
                    validator.text(&value, "");
                }
                write_cdata(&mut node, &data);
            }
            Event::Comment(comment) => {
                if !self.options.terse {
                    write_comment(&mut node, &comment);
                }
            }
            Event::Decl(decl) => write_decl(&mut node, &decl)?,
            Event::PI(pi) => write_pi(&mut node, &pi),
            Event::DocType(doctype) => write_doctype(&mut node, &doctype),
        }

        out.append(&node);
        Ok(Produce::Produced)
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(validator) = &mut self.validator {
            if validator.has_failures() {
                return Err(StreamError::Validation {
                    errors: validator.take_errors(),
                });
            }
            if validator.warnings_only() {
                for warning in validator.take_errors() {
                    log::warn!("xml-validate: {warning}");
                }
            }
        }
        Ok(())
    }
}

// Per-node-kind rewrite functions. Each re-serializes the raw node
// content between the delimiters its kind demands.

fn write_start(node: &mut Vec<u8>, raw: &[u8]) {
    node.push(b'<');
    node.extend_from_slice(raw);
    node.push(b'>');
}

fn write_empty(node: &mut Vec<u8>, raw: &[u8]) {
    node.push(b'<');
    node.extend_from_slice(raw);
    node.extend_from_slice(b"/>");
}

fn write_end(node: &mut Vec<u8>, raw: &[u8]) {
    node.extend_from_slice(b"</");
    node.extend_from_slice(raw);
    node.push(b'>');
}

fn write_cdata(node: &mut Vec<u8>, raw: &[u8]) {
    node.extend_from_slice(b"<![CDATA[");
    node.extend_from_slice(raw);
    node.extend_from_slice(b"]]>");
}

fn write_comment(node: &mut Vec<u8>, raw: &[u8]) {
    node.extend_from_slice(b"<!--");
    node.extend_from_slice(raw);
    node.extend_from_slice(b"-->");
}

fn write_pi(node: &mut Vec<u8>, raw: &[u8]) {
    node.extend_from_slice(b"<?");
    node.extend_from_slice(raw);
    node.extend_from_slice(b"?>");
}

fn write_doctype(node: &mut Vec<u8>, raw: &[u8]) {
    node.extend_from_slice(b"<!DOCTYPE ");
    node.extend_from_slice(raw);
    node.push(b'>');
}

/// The declaration is the one node re-assembled from parsed parts.
fn write_decl(node: &mut Vec<u8>, decl: &BytesDecl) -> Result<()> {
    node.extend_from_slice(b"<?xml version=\"");
    node.extend_from_slice(&decl.version().map_err(anyhow::Error::new)?);
    node.push(b'"');
    if let Some(encoding) = decl.encoding() {
        node.extend_from_slice(b" encoding=\"");
        node.extend_from_slice(&encoding.map_err(anyhow::Error::new)?);
        node.push(b'"');
    }
    if let Some(standalone) = decl.standalone() {
        node.extend_from_slice(b" standalone=\"");
        node.extend_from_slice(&standalone.map_err(anyhow::Error::new)?);
        node.push(b'"');
    }
    node.extend_from_slice(b"?>");
    Ok(())
}

/// Prefix-to-URI bindings, one scope per open element.
#[derive(Debug, Default)]
struct NamespaceScopes {
    scopes: Vec<Vec<(String, String)>>,
}

impl NamespaceScopes {
    fn push(&mut self, bindings: Vec<(String, String)>) {
        self.scopes.push(bindings);
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Resolve a prefix (or the default namespace for `None`) against
    /// the innermost binding.
    fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        let key = prefix.unwrap_or("");
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(bound, _)| bound == key)
            .map(|(_, uri)| uri.as_str())
    }
}
