//! XML instance reading
//!
//! Streams the direct children of a document's root element and drives a
//! [`ContentValidator`] with them, one start tag at a time. Nothing below the
//! root's children is inspected; deeper elements are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::trace;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};
use crate::validators::{ContentCategory, ContentValidator};
use crate::XML_NAMESPACE;

/// One item of the root element's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootContent {
    /// Start tag of a direct child
    Element(QName),
    /// Non-whitespace character data directly inside the root
    Text(String),
}

/// Streaming reader of the root element's direct children
pub struct ChildElementReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    /// In-scope namespaces, one entry per open element
    scopes: Vec<NamespaceContext>,
    root: Option<QName>,
    finished: bool,
}

impl<'a> ChildElementReader<&'a [u8]> {
    /// Read from an in-memory document
    pub fn from_str(xml: &'a str) -> Self {
        Self::new(xml.as_bytes())
    }
}

impl ChildElementReader<BufReader<File>> {
    /// Read a document file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ChildElementReader<R> {
    /// Wrap a buffered reader
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);

        let mut base = NamespaceContext::new();
        base.add_prefix("xml", XML_NAMESPACE);
        Self {
            reader,
            buf: Vec::new(),
            scopes: vec![base],
            root: None,
            finished: false,
        }
    }

    /// Name of the root element, reading up to its start tag if needed
    pub fn root(&mut self) -> Result<Option<&QName>> {
        if self.root.is_none() && !self.finished {
            self.read(true)?;
        }
        Ok(self.root.as_ref())
    }

    /// Next direct child of the root, `None` after the root's end tag
    pub fn next_item(&mut self) -> Result<Option<RootContent>> {
        self.read(false)
    }

    fn read(&mut self, until_root: bool) -> Result<Option<RootContent>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|e| {
                    Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        self.reader.buffer_position(),
                        e
                    ))
                })?
                .into_owned();

            match event {
                Event::Start(e) => {
                    let (name, scope) = resolve_element(&e, self.scope())?;
                    let depth = self.depth();
                    self.scopes.push(scope);
                    match depth {
                        0 => {
                            self.root = Some(name);
                            if until_root {
                                return Ok(None);
                            }
                        }
                        1 => return Ok(Some(RootContent::Element(name))),
                        _ => {}
                    }
                }
                Event::Empty(e) => {
                    let (name, _) = resolve_element(&e, self.scope())?;
                    match self.depth() {
                        0 => {
                            self.root = Some(name);
                            self.finished = true;
                            return Ok(None);
                        }
                        1 => return Ok(Some(RootContent::Element(name))),
                        _ => {}
                    }
                }
                Event::End(_) => {
                    self.scopes.pop();
                    if self.depth() == 0 {
                        self.finished = true;
                        return Ok(None);
                    }
                }
                Event::Text(e) if self.depth() == 1 => {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                    if !text.trim().is_empty() {
                        return Ok(Some(RootContent::Text(text.into_owned())));
                    }
                }
                Event::CData(e) if self.depth() == 1 && !e.is_empty() => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    return Ok(Some(RootContent::Text(text)));
                }
                Event::Eof => {
                    self.finished = true;
                    if self.depth() > 0 {
                        return Err(Error::Xml("unexpected end of document".to_string()));
                    }
                    return Ok(None);
                }
                _ => {} // comments, processing instructions, deeper text
            }
        }
    }

    /// Number of open elements
    fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    fn scope(&self) -> &NamespaceContext {
        // the base scope is never popped
        &self.scopes[self.scopes.len() - 1]
    }
}

/// Resolve a start tag's name with the declarations it carries
fn resolve_element(start: &BytesStart, parent: &NamespaceContext) -> Result<(QName, NamespaceContext)> {
    let mut scope = parent.clone();
    for attr_result in start.attributes() {
        let attr =
            attr_result.map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;
        let attr_name = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?;

        if attr_name.starts_with("xmlns") {
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?;
            scope.declare(attr_name, &value);
        }
    }

    let name_bytes = start.name();
    let name = std::str::from_utf8(name_bytes.as_ref())
        .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?;
    let qname = scope.resolve(name)?;
    Ok((qname, scope))
}

/// Validation outcome for one child (or for the end tag)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildFailure {
    /// Index of the child among the root's element children; `None` for
    /// character data and for the end tag
    pub index: Option<usize>,
    /// Clark-notation name of the child
    pub name: Option<String>,
    /// Description of the failure
    pub message: String,
    /// What the content model would have accepted instead
    pub expected: Vec<String>,
}

/// Result of validating the children of a document's root element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Clark-notation name of the root element
    pub root: Option<String>,
    /// Number of element children read
    pub children: usize,
    /// All failures, in document order
    pub failures: Vec<ChildFailure>,
}

impl ValidationReport {
    /// Check if the content matched
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validate the root element's children of a document read by `reader`.
///
/// Match failures are collected in the report and validation continues
/// with the next child; only malformed XML is an error.
pub fn validate_root_children<R: BufRead>(
    validator: &ContentValidator,
    reader: &mut ChildElementReader<R>,
) -> Result<ValidationReport> {
    let root = reader.root()?.map(|name| name.to_string());
    let mut report = ValidationReport {
        root,
        children: 0,
        failures: Vec::new(),
    };
    if report.root.is_none() {
        return Err(Error::Xml("document has no root element".to_string()));
    }

    let text_allowed = matches!(
        validator.content_category(),
        ContentCategory::TextOnly | ContentCategory::Mixed
    );
    let mut run = validator.new_run();

    while let Some(item) = reader.next_item()? {
        match item {
            RootContent::Element(name) => {
                let index = report.children;
                report.children += 1;
                match validator.validate_element(&mut run, &name) {
                    Ok(particle) => {
                        trace!("child {} {} -> {:?}", index, name, particle);
                    }
                    Err(err) => report.failures.push(ChildFailure {
                        index: Some(index),
                        name: Some(name.to_string()),
                        message: err.to_string(),
                        expected: validator.expected_names(&run),
                    }),
                }
            }
            RootContent::Text(_) if !text_allowed => report.failures.push(ChildFailure {
                index: None,
                name: None,
                message: format!(
                    "character data is not allowed in {} content",
                    validator.content_category()
                ),
                expected: Vec::new(),
            }),
            RootContent::Text(_) => {}
        }
    }

    if let Err(err) = validator.check_complete(&run) {
        report.failures.push(ChildFailure {
            index: None,
            name: None,
            message: err.to_string(),
            expected: validator.expected_names(&run),
        });
    }
    Ok(report)
}

/// [`validate_root_children`] over an in-memory document
pub fn validate_str(validator: &ContentValidator, xml: &str) -> Result<ValidationReport> {
    validate_root_children(validator, &mut ChildElementReader::from_str(xml))
}

/// [`validate_root_children`] over a document file
pub fn validate_file(validator: &ContentValidator, path: impl AsRef<Path>) -> Result<ValidationReport> {
    validate_root_children(validator, &mut ChildElementReader::from_file(path)?)
}
