//! A reader of nodes from a string, built over the `quick-xml` tokenizer.

use std::borrow::Cow;
use std::collections::VecDeque;

use log::{debug, trace};
use memchr::memchr;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::resolver::{parse_char_ref, predefined_entity, EntityResolver, PredefinedEntityResolver};
use super::{next_value_chunk, EntityHandling, ReaderSettings, XmlRead};
use crate::binary::{finish_binary_read, impl_binary_content, BinaryReadHelper};
use crate::errors::{Error, IllFormedError, MisuseError, Result};
use crate::name::{NamespaceScope, XMLNS_NAMESPACE};
use crate::node::{split_qname, Attribute, LineInfo, Node, NodeKind, ReadState};
use crate::validation::{is_whitespace_only, is_xml_whitespace};
use crate::ConformanceLevel;

/// Tracks the line and column of a byte offset in the input.
#[derive(Clone, Copy, Debug)]
struct Cursor {
    offset: usize,
    line: usize,
    column: usize,
}

impl Cursor {
    const fn new() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Moves the cursor forward to `offset`. Offsets before the current one
    /// leave the cursor in place.
    fn advance(&mut self, input: &str, offset: usize) -> LineInfo {
        if let Some(skipped) = input.get(self.offset..offset) {
            for ch in skipped.chars() {
                if ch == '\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
            }
            self.offset = offset;
        }
        self.position()
    }

    #[inline]
    fn position(&self) -> LineInfo {
        LineInfo {
            line: self.line,
            column: self.column,
        }
    }
}

/// Converts line ends (`\r\n` and single `\r`) to `\n`.
fn normalize_eol(text: &str) -> Cow<str> {
    if memchr(b'\r', text.as_bytes()).is_none() {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

#[inline]
fn utf8(bytes: &[u8]) -> Result<&str> {
    Ok(std::str::from_utf8(bytes)?)
}

/// Parts of the `<!DOCTYPE>` declaration content.
#[derive(Debug, PartialEq, Eq)]
struct DocTypeParts<'a> {
    name: &'a str,
    public_id: Option<&'a str>,
    system_id: Option<&'a str>,
    subset: &'a str,
}

impl<'a> DocTypeParts<'a> {
    fn parse(content: &'a str) -> Self {
        let content = content.trim_matches(is_xml_whitespace);
        let name_end = content
            .find(|c: char| is_xml_whitespace(c) || c == '[')
            .unwrap_or(content.len());
        let mut parts = Self {
            name: &content[..name_end],
            public_id: None,
            system_id: None,
            subset: "",
        };
        let mut rest = content[name_end..].trim_start_matches(is_xml_whitespace);
        if let Some(r) = rest.strip_prefix("PUBLIC") {
            let (id, r) = quoted(r);
            parts.public_id = id;
            let (id, r) = quoted(r);
            parts.system_id = id;
            rest = r;
        } else if let Some(r) = rest.strip_prefix("SYSTEM") {
            let (id, r) = quoted(r);
            parts.system_id = id;
            rest = r;
        }
        let rest = rest.trim_start_matches(is_xml_whitespace);
        if let Some(subset) = rest.strip_prefix('[') {
            parts.subset = subset.rfind(']').map_or(subset, |end| &subset[..end]);
        }
        parts
    }
}

/// Splits a quoted literal, preceded by optional whitespace, from the rest of
/// the string.
fn quoted(s: &str) -> (Option<&str>, &str) {
    let s = s.trim_start_matches(is_xml_whitespace);
    let quote = match s.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return (None, s),
    };
    match s[1..].find(quote) {
        Some(end) => (Some(&s[1..1 + end]), &s[2 + end..]),
        None => (None, s),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Reads nodes of an XML document stored in a string.
///
/// The reader merges character data, character references and references to
/// the predefined entities into one text node, normalizes line ends to `\n`
/// and resolves namespace prefixes of element and attribute names. Elements
/// written as `<name/>` are reported as a single [`Element`] node for which
/// [`is_empty_element`] returns `true`; no [`EndElement`] follows them.
///
/// # Example
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_pipeline::reader::{TextReader, XmlRead};
/// use xml_pipeline::NodeKind;
///
/// let xml = r#"<tag1 att1 = "test">
///                 <tag2><!--Test comment-->Test</tag2>
///                 <tag2>Test 2</tag2>
///              </tag1>"#;
/// let mut reader = TextReader::from_str(xml);
///
/// let mut txt = Vec::new();
/// let mut count = 0;
/// while reader.read().unwrap() {
///     match reader.node_kind() {
///         NodeKind::Element if reader.local_name() == "tag2" => count += 1,
///         NodeKind::Text => txt.push(reader.value().to_string()),
///         _ => (),
///     }
/// }
/// assert_eq!(count, 2);
/// assert_eq!(txt, ["Test", "Test 2"]);
/// ```
///
/// [`Element`]: NodeKind::Element
/// [`EndElement`]: NodeKind::EndElement
/// [`is_empty_element`]: XmlRead::is_empty_element
pub struct TextReader<'i> {
    /// Tokenizer of the input
    reader: Reader<&'i [u8]>,
    input: &'i str,
    resolver: Box<dyn EntityResolver + 'i>,
    conformance: ConformanceLevel,
    entity_handling: EntityHandling,

    state: ReadState,
    node: Node,
    /// Index of the current attribute in `node.attributes`
    attribute: Option<usize>,
    /// Offset of the not yet returned part of the current value
    chunk_offset: usize,
    /// `true` if the current entity reference was already expanded
    entity_resolved: bool,

    scope: NamespaceScope,
    /// Scope of the current end or empty element must be popped before the
    /// next node
    pending_pop: bool,
    /// Names of open elements
    open: Vec<String>,
    root_seen: bool,

    /// Nodes produced ahead of time, returned before tokenizing further
    queued: VecDeque<Node>,
    /// Event read while looking for the end of a text run, with its offset
    peeked: Option<(Event<'i>, usize)>,
    cursor: Cursor,
    binary: BinaryReadHelper,
}

impl<'i> TextReader<'i> {
    /// Creates a reader of a complete document that expands all entities.
    pub fn from_str(input: &'i str) -> Self {
        Self::with_settings(input, &ReaderSettings::default())
    }

    /// Creates a reader configured by `settings`. Only the conformance level
    /// and entity handling are used; the other settings are implemented by
    /// [`CharCheckingReader`](super::CharCheckingReader).
    pub fn with_settings(input: &'i str, settings: &ReaderSettings) -> Self {
        Self {
            reader: Reader::from_str(input),
            input,
            resolver: Box::new(PredefinedEntityResolver),
            conformance: settings.conformance_level,
            entity_handling: settings.entity_handling,
            state: ReadState::Initial,
            node: Node::default(),
            attribute: None,
            chunk_offset: 0,
            entity_resolved: false,
            scope: NamespaceScope::default(),
            pending_pop: false,
            open: Vec::new(),
            root_seen: false,
            queued: VecDeque::new(),
            peeked: None,
            cursor: Cursor::new(),
            binary: BinaryReadHelper::default(),
        }
    }

    /// Sets the resolver of entities other than the predefined ones.
    pub fn with_resolver(mut self, resolver: impl EntityResolver + 'i) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Closes the reader. All following reads return `false`.
    pub fn close(&mut self) {
        self.state = ReadState::Closed;
        self.node = Node::default();
        self.attribute = None;
        self.queued.clear();
        self.peeked = None;
        self.binary.reset();
    }

    /// Returns the `xml:space="preserve"` status of the current node.
    pub fn preserve_space(&self) -> bool {
        self.scope.preserve_space()
    }

    fn current_attribute(&self) -> Option<&Attribute> {
        self.attribute.and_then(|i| self.node.attributes.get(i))
    }

    fn error_at(&self, error: IllFormedError) -> Error {
        Error::ill_formed_at(error, Some(self.cursor.position()))
    }

    fn next_event(&mut self) -> Result<(Event<'i>, usize)> {
        if let Some(peeked) = self.peeked.take() {
            return Ok(peeked);
        }
        let start = self.reader.buffer_position() as usize;
        Ok((self.reader.read_event()?, start))
    }

    fn next_node(&mut self) -> Result<Option<Node>> {
        if let Some(node) = self.queued.pop_front() {
            return Ok(Some(node));
        }
        loop {
            let (event, start) = self.next_event()?;
            let position = self.cursor.advance(self.input, start);
            let depth = self.open.len();
            let mut node = match event {
                Event::Start(e) => self.start_element(&e, false)?,
                Event::Empty(e) => self.start_element(&e, true)?,
                Event::End(e) => self.end_element(e.name().as_ref())?,
                Event::Text(_) | Event::GeneralRef(_) => match self.text_run(event, start)? {
                    Some(node) => node,
                    None => continue,
                },
                Event::CData(e) => {
                    if depth == 0 && self.conformance == ConformanceLevel::Document {
                        return Err(self.error_at(IllFormedError::TextOutsideRoot));
                    }
                    Node::text(NodeKind::CData, normalize_eol(utf8(&e)?), depth)
                }
                Event::Comment(e) => Node::text(NodeKind::Comment, normalize_eol(utf8(&e)?), depth),
                Event::PI(e) => {
                    let content = utf8(&e)?;
                    let (target, data) = match content.find(is_xml_whitespace) {
                        Some(i) => (&content[..i], content[i..].trim_start_matches(is_xml_whitespace)),
                        None => (content, ""),
                    };
                    let mut node = Node::text(NodeKind::ProcessingInstruction, normalize_eol(data), depth);
                    node.local_name = target.to_owned();
                    node
                }
                Event::Decl(e) => {
                    let content = utf8(&e)?;
                    let value = content.strip_prefix("xml").unwrap_or(content);
                    let mut node = Node::text(
                        NodeKind::XmlDeclaration,
                        value.trim_matches(is_xml_whitespace),
                        depth,
                    );
                    node.local_name = "xml".to_owned();
                    node
                }
                Event::DocType(e) => self.doctype(utf8(&e)?),
                Event::Eof => {
                    self.cursor.advance(self.input, self.input.len());
                    if let Some(name) = self.open.last() {
                        return Err(self.error_at(IllFormedError::UnclosedElement(name.clone())));
                    }
                    if !self.root_seen && self.conformance == ConformanceLevel::Document {
                        return Err(self.error_at(IllFormedError::MissingRoot));
                    }
                    return Ok(None);
                }
            };
            if node.line_info.is_none() {
                node.line_info = Some(position);
            }
            return Ok(Some(node));
        }
    }

    fn start_element(&mut self, e: &BytesStart, is_empty: bool) -> Result<Node> {
        let qname = e.name();
        let name = utf8(qname.as_ref())?;
        let depth = self.open.len();
        if depth == 0 {
            if self.root_seen && self.conformance == ConformanceLevel::Document {
                return Err(self.error_at(IllFormedError::MultipleRoots));
            }
            self.root_seen = true;
        }

        self.scope.push_scope();
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = utf8(attr.key.as_ref())?;
            let value = self.attribute_value(utf8(&attr.value)?)?;
            let (prefix, local_name) = split_qname(key);
            if prefix.is_empty() && local_name == "xmlns" {
                self.scope.declare("", &value);
            } else if prefix == "xmlns" {
                self.scope.declare(local_name, &value);
            } else if key == "xml:space" {
                match value.as_str() {
                    "preserve" => self.scope.set_preserve_space(true),
                    "default" => self.scope.set_preserve_space(false),
                    _ => {}
                }
            }
            attributes.push(Attribute {
                prefix: prefix.to_owned(),
                local_name: local_name.to_owned(),
                namespace_uri: String::new(),
                value,
            });
        }
        // Namespaces are resolved once all declarations of the element are known
        for attr in &mut attributes {
            if !attr.prefix.is_empty() {
                attr.namespace_uri = self.resolve_prefix(&attr.prefix)?.to_owned();
            } else if attr.local_name == "xmlns" {
                attr.namespace_uri = XMLNS_NAMESPACE.to_owned();
            }
        }

        let (prefix, local_name) = split_qname(name);
        let namespace_uri = self.resolve_prefix(prefix)?.to_owned();
        if is_empty {
            self.pending_pop = true;
        } else {
            self.open.push(name.to_owned());
        }
        trace!("start element `{}` at depth {}", name, depth);

        Ok(Node {
            prefix: prefix.to_owned(),
            local_name: local_name.to_owned(),
            namespace_uri,
            is_empty_element: is_empty,
            attributes,
            ..Node::new(NodeKind::Element, depth)
        })
    }

    fn end_element(&mut self, name: &[u8]) -> Result<Node> {
        let name = utf8(name)?;
        if self.open.pop().is_none() {
            return Err(self.error_at(IllFormedError::UnexpectedNode(NodeKind::EndElement)));
        }
        let (prefix, local_name) = split_qname(name);
        let namespace_uri = self.resolve_prefix(prefix)?.to_owned();
        self.pending_pop = true;

        Ok(Node {
            prefix: prefix.to_owned(),
            local_name: local_name.to_owned(),
            namespace_uri,
            ..Node::new(NodeKind::EndElement, self.open.len())
        })
    }

    /// Collects consecutive text pieces and references into one node. An
    /// entity reported as a node ends the run; it is queued after the text.
    fn text_run(&mut self, first: Event<'i>, mut start: usize) -> Result<Option<Node>> {
        let depth = self.open.len();
        let mut value = String::new();
        let mut event = first;
        loop {
            match event {
                Event::Text(e) => {
                    let text = normalize_eol(utf8(&e)?);
                    value.push_str(&self.expand_references(&text)?);
                }
                Event::GeneralRef(e) => {
                    let name = utf8(&e)?;
                    let expanded = match self.resolve_text_reference(name)? {
                        Some(text) => {
                            value.push_str(&text);
                            true
                        }
                        None => false,
                    };
                    if !expanded {
                        let mut node = Node::new(NodeKind::EntityReference, depth);
                        node.local_name = name.to_owned();
                        node.line_info = Some(self.cursor.advance(self.input, start));
                        if value.is_empty() {
                            return Ok(Some(node));
                        }
                        self.queued.push_back(node);
                        break;
                    }
                }
                other => {
                    self.peeked = Some((other, start));
                    break;
                }
            }
            start = self.reader.buffer_position() as usize;
            event = self.reader.read_event()?;
        }
        self.text_node(value, depth)
    }

    fn text_node(&self, value: String, depth: usize) -> Result<Option<Node>> {
        if value.is_empty() {
            return Ok(None);
        }
        let kind = if is_whitespace_only(&value) {
            if self.scope.preserve_space() {
                NodeKind::SignificantWhitespace
            } else {
                NodeKind::Whitespace
            }
        } else {
            if depth == 0 && self.conformance == ConformanceLevel::Document {
                return Err(self.error_at(IllFormedError::TextOutsideRoot));
            }
            NodeKind::Text
        };
        Ok(Some(Node::text(kind, value, depth)))
    }

    /// Resolves a reference in text. Returns `None` if the reference must be
    /// reported as an [`EntityReference`](NodeKind::EntityReference) node.
    fn resolve_text_reference(&self, name: &str) -> Result<Option<Cow<str>>> {
        if self.entity_handling == EntityHandling::ExpandCharEntities
            && parse_char_ref(name).is_none()
            && predefined_entity(name).is_none()
        {
            return match self.resolver.resolve(name) {
                Some(_) => Ok(None),
                None => Err(self.error_at(IllFormedError::UnknownEntity(name.to_owned()))),
            };
        }
        self.resolve_reference(name).map(Some)
    }

    /// Returns the text of a character reference or an entity reference.
    fn resolve_reference(&self, name: &str) -> Result<Cow<str>> {
        if let Some(ch) = parse_char_ref(name) {
            return match ch {
                Some(ch) => Ok(Cow::Owned(ch.to_string())),
                None => Err(self.error_at(IllFormedError::UnknownEntity(name.to_owned()))),
            };
        }
        if let Some(text) = predefined_entity(name) {
            return Ok(Cow::Borrowed(text));
        }
        match self.resolver.resolve(name) {
            Some(text) => Ok(text),
            None => Err(self.error_at(IllFormedError::UnknownEntity(name.to_owned()))),
        }
    }

    /// Replaces all references (`&...;`) in the text with their text.
    fn expand_references<'t>(&self, text: &'t str) -> Result<Cow<'t, str>> {
        let bytes = text.as_bytes();
        let mut start = match memchr(b'&', bytes) {
            Some(i) => i,
            None => return Ok(Cow::Borrowed(text)),
        };
        let mut result = String::with_capacity(text.len());
        result.push_str(&text[..start]);
        loop {
            let end = match memchr(b';', &bytes[start..]) {
                Some(i) => start + i,
                None => {
                    return Err(self.error_at(IllFormedError::UnknownEntity(text[start + 1..].to_owned())))
                }
            };
            result.push_str(&self.resolve_reference(&text[start + 1..end])?);
            match memchr(b'&', &bytes[end + 1..]) {
                Some(i) => {
                    result.push_str(&text[end + 1..end + 1 + i]);
                    start = end + 1 + i;
                }
                None => {
                    result.push_str(&text[end + 1..]);
                    return Ok(Cow::Owned(result));
                }
            }
        }
    }

    /// Normalizes the raw attribute value: literal whitespace characters
    /// become spaces, then references are expanded.
    fn attribute_value(&self, raw: &str) -> Result<String> {
        let normalized = normalize_eol(raw);
        let normalized = if normalized.contains(['\t', '\n']) {
            Cow::Owned(normalized.replace(['\t', '\n'], " "))
        } else {
            normalized
        };
        Ok(self.expand_references(&normalized)?.into_owned())
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<&str> {
        self.scope
            .lookup(prefix)
            .ok_or_else(|| self.error_at(IllFormedError::UndeclaredPrefix(prefix.to_owned())))
    }

    fn doctype(&mut self, content: &str) -> Node {
        self.resolver.capture(content);
        let parts = DocTypeParts::parse(content);
        debug!("DOCTYPE `{}` found", parts.name);

        let mut node = Node::text(NodeKind::DocumentType, normalize_eol(parts.subset), 0);
        node.local_name = parts.name.to_owned();
        if let Some(id) = parts.public_id {
            node.attributes.push(Attribute::new("PUBLIC", id));
        }
        if let Some(id) = parts.system_id {
            node.attributes.push(Attribute::new("SYSTEM", id));
        }
        node
    }
}

impl<'i> XmlRead for TextReader<'i> {
    fn node_kind(&self) -> NodeKind {
        match self.attribute {
            Some(_) => NodeKind::Attribute,
            None => self.node.kind,
        }
    }

    fn local_name(&self) -> &str {
        match self.current_attribute() {
            Some(a) => &a.local_name,
            None => &self.node.local_name,
        }
    }

    fn prefix(&self) -> &str {
        match self.current_attribute() {
            Some(a) => &a.prefix,
            None => &self.node.prefix,
        }
    }

    fn namespace_uri(&self) -> &str {
        match self.current_attribute() {
            Some(a) => &a.namespace_uri,
            None => &self.node.namespace_uri,
        }
    }

    fn value(&self) -> &str {
        match self.current_attribute() {
            Some(a) => &a.value,
            None => &self.node.value,
        }
    }

    fn depth(&self) -> usize {
        match self.attribute {
            Some(_) => self.node.depth + 1,
            None => self.node.depth,
        }
    }

    fn is_empty_element(&self) -> bool {
        self.attribute.is_none() && self.node.is_empty_element
    }

    fn read_state(&self) -> ReadState {
        self.state
    }

    fn line_info(&self) -> Option<LineInfo> {
        self.node.line_info
    }

    fn attributes(&self) -> &[Attribute] {
        &self.node.attributes
    }

    fn move_to_first_attribute(&mut self) -> bool {
        if self.node.attributes.is_empty() {
            return false;
        }
        self.binary.reset();
        self.attribute = Some(0);
        self.chunk_offset = 0;
        true
    }

    fn move_to_next_attribute(&mut self) -> bool {
        match self.attribute {
            Some(i) if i + 1 < self.node.attributes.len() => {
                self.binary.reset();
                self.attribute = Some(i + 1);
                self.chunk_offset = 0;
                true
            }
            _ => false,
        }
    }

    fn move_to_element(&mut self) -> bool {
        if self.attribute.take().is_none() {
            return false;
        }
        self.binary.reset();
        self.chunk_offset = 0;
        true
    }

    fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        self.scope.lookup(prefix)
    }

    fn namespaces_in_scope(&self) -> Vec<(String, String)> {
        self.scope.in_scope()
    }

    fn read(&mut self) -> Result<bool> {
        finish_binary_read!(self.binary);
        match self.state {
            ReadState::Initial | ReadState::Interactive => {}
            _ => return Ok(false),
        }
        self.attribute = None;
        self.chunk_offset = 0;
        self.entity_resolved = false;
        if self.pending_pop {
            self.scope.pop_scope();
            self.pending_pop = false;
        }

        match self.next_node() {
            Ok(Some(node)) => {
                self.node = node;
                self.state = ReadState::Interactive;
                Ok(true)
            }
            Ok(None) => {
                debug!("end of input reached");
                self.node = Node::default();
                self.state = ReadState::EndOfFile;
                Ok(false)
            }
            Err(e) => {
                debug!("reader failed: {}", e);
                self.node = Node::default();
                self.state = ReadState::Error;
                Err(e)
            }
        }
    }

    fn can_resolve_entity(&self) -> bool {
        self.attribute.is_none()
            && self.node.kind == NodeKind::EntityReference
            && !self.entity_resolved
    }

    fn resolve_entity(&mut self) -> Result<()> {
        if !self.can_resolve_entity() {
            return Err(MisuseError::ContentNotSupported {
                method: "resolve_entity",
                kind: self.node_kind(),
            }
            .into());
        }
        let name = self.node.local_name.clone();
        let text = match self.resolver.resolve(&name) {
            Some(text) => text.into_owned(),
            None => return Err(self.error_at(IllFormedError::UnknownEntity(name))),
        };
        trace!("expanding entity `{}`", name);
        self.entity_resolved = true;

        let depth = self.node.depth;
        let mut end = Node::new(NodeKind::EndEntity, depth);
        end.local_name = name;
        end.line_info = self.node.line_info;
        self.queued.push_front(end);

        if let Some(mut text) = self.text_node(normalize_eol(&text).into_owned(), depth + 1)? {
            text.line_info = self.node.line_info;
            self.queued.push_front(text);
        }
        Ok(())
    }

    fn can_read_value_chunk(&self) -> bool {
        true
    }

    fn read_value_chunk(&mut self, buf: &mut String, max_len: usize) -> Result<usize> {
        let value = match self.attribute {
            Some(i) => &self.node.attributes[i].value,
            None => &self.node.value,
        };
        Ok(next_value_chunk(value, &mut self.chunk_offset, buf, max_len))
    }

    impl_binary_content!(binary);
}
