//! Defines the node model shared by all readers: kinds of nodes, owned node
//! snapshots and position information.

use std::fmt;

/// Kind of the node on which a reader is positioned.
///
/// Every reader and every binary content operation dispatches on this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Reader is not positioned on any node: it was not read yet, or the
    /// input is exhausted.
    None,
    /// Start tag `<name attr="value">` or empty element tag `<name/>`.
    Element,
    /// Attribute of an element. Reported only after moving to attributes.
    Attribute,
    /// Character data with at least one non-whitespace character.
    Text,
    /// CDATA section `<![CDATA[...]]>`.
    CData,
    /// Reference to a general entity which was not expanded.
    EntityReference,
    /// Processing instruction `<?target data?>`.
    ProcessingInstruction,
    /// Comment `<!--...-->`.
    Comment,
    /// `<!DOCTYPE>` declaration.
    DocumentType,
    /// Whitespace between markup.
    Whitespace,
    /// Whitespace in a scope of `xml:space="preserve"`.
    SignificantWhitespace,
    /// End tag `</name>`.
    EndElement,
    /// End of the replacement text of an expanded entity reference.
    EndEntity,
    /// XML declaration `<?xml version="1.0"?>`.
    XmlDeclaration,
}

impl NodeKind {
    /// Returns `true` for nodes which may appear inside a content run decoded
    /// as binary data: text, CDATA and both kinds of whitespace.
    #[inline]
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            Self::Text | Self::CData | Self::Whitespace | Self::SignificantWhitespace
        )
    }

    /// Returns `true` if content reading methods (`read_content_as_*`) may be
    /// called when reader is positioned on a node of this kind.
    #[inline]
    pub fn can_read_content(self) -> bool {
        matches!(
            self,
            Self::Attribute
                | Self::Text
                | Self::CData
                | Self::EntityReference
                | Self::ProcessingInstruction
                | Self::Comment
                | Self::Whitespace
                | Self::SignificantWhitespace
                | Self::EndElement
                | Self::EndEntity
        )
    }
}

/// State of a reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadState {
    /// `read` was not called yet.
    Initial,
    /// Reader is positioned on a node.
    Interactive,
    /// An error occurred; the reader cannot continue.
    Error,
    /// The end of input (or of the subtree) was reached.
    EndOfFile,
    /// Reader was closed.
    Closed,
}

/// One-based position of a node in the input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LineInfo {
    /// Line number, starting from 1
    pub line: usize,
    /// Column number in characters, starting from 1
    pub column: usize,
}

impl fmt::Display for LineInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}, position {}", self.line, self.column)
    }
}

/// Owned attribute of an element node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attribute {
    /// Prefix of the attribute name, empty if absent
    pub prefix: String,
    /// Local part of the attribute name
    pub local_name: String,
    /// Namespace of the attribute. Unprefixed attributes are in no namespace
    pub namespace_uri: String,
    /// Normalized value of the attribute
    pub value: String,
}

impl Attribute {
    /// Creates an attribute in no namespace.
    pub fn new(local_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Returns the qualified name of the attribute (`prefix:local` or `local`).
    pub fn name(&self) -> String {
        qualified(&self.prefix, &self.local_name)
    }
}

/// An owned snapshot of the node on which a reader is positioned.
///
/// Readers that replay nodes (see [`CachingReader`]) keep sequences of those.
///
/// [`CachingReader`]: crate::reader::CachingReader
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    /// Kind of the node
    pub kind: NodeKind,
    /// Prefix of the node name, empty if absent
    pub prefix: String,
    /// Local part of the node name. Empty for nodes without a name
    pub local_name: String,
    /// Namespace of the node name
    pub namespace_uri: String,
    /// Textual value of the node
    pub value: String,
    /// Depth of the node in the tree, the root element has depth 0
    pub depth: usize,
    /// `true` for `<element/>`
    pub is_empty_element: bool,
    /// Attributes of an element, or pseudo-attributes of a `DOCTYPE`
    pub attributes: Vec<Attribute>,
    /// Position of the node in the input
    pub line_info: Option<LineInfo>,
}

impl Node {
    /// Creates an unnamed node of the specified kind.
    pub fn new(kind: NodeKind, depth: usize) -> Self {
        Self {
            kind,
            prefix: String::new(),
            local_name: String::new(),
            namespace_uri: String::new(),
            value: String::new(),
            depth,
            is_empty_element: false,
            attributes: Vec::new(),
            line_info: None,
        }
    }

    /// Creates a node that carries only text.
    pub fn text(kind: NodeKind, value: impl Into<String>, depth: usize) -> Self {
        Self {
            value: value.into(),
            ..Self::new(kind, depth)
        }
    }

    /// Returns the qualified name of the node (`prefix:local` or `local`).
    pub fn name(&self) -> String {
        qualified(&self.prefix, &self.local_name)
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(NodeKind::None, 0)
    }
}

pub(crate) fn qualified(prefix: &str, local_name: &str) -> String {
    if prefix.is_empty() {
        local_name.to_owned()
    } else {
        format!("{}:{}", prefix, local_name)
    }
}

/// Splits a qualified name into a prefix and a local name. The prefix is
/// empty if the name has no colon.
pub(crate) fn split_qname(name: &str) -> (&str, &str) {
    match memchr::memchr(b':', name.as_bytes()) {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => ("", name),
    }
}
