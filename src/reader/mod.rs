//! Pull readers of XML nodes.
//!
//! All readers implement the [`XmlRead`] trait: a cursor over the nodes of a
//! document which is moved forward by [`XmlRead::read`]. [`TextReader`] reads
//! nodes from a string; the other readers wrap any reader and change what it
//! reports:
//!
//! - [`CharCheckingReader`] hides ignorable nodes and checks characters and names;
//! - [`SubtreeReader`] presents one element and its descendants as a whole document;
//! - [`CachingReader`] records nodes and replays them before continuing from
//!   its wrapped reader.
//!
//! A typical chain is created by [`ReaderSettings::create_reader`].

#[cfg(feature = "serde-types")]
use serde::{Deserialize, Serialize};

use crate::errors::{MisuseError, Result};
use crate::node::{qualified, Attribute, LineInfo, Node, NodeKind, ReadState};
use crate::ConformanceLevel;

mod caching;
mod checking;
mod resolver;
mod subtree;
mod text;

pub use caching::{CachingMode, CachingReader};
pub use checking::CharCheckingReader;
pub use resolver::{EntityResolver, PredefinedEntityResolver};
pub use subtree::SubtreeReader;
pub use text::TextReader;

/// Common interface of all node readers.
///
/// A reader is a cursor: accessors describe the node on which the reader is
/// positioned, [`read`](Self::read) moves to the next node in document order.
/// Attributes of an element are not reported by `read`; they are available
/// through [`attributes`](Self::attributes) or by moving the cursor to them
/// with [`move_to_first_attribute`](Self::move_to_first_attribute).
///
/// The trait is object safe, so decorators can be stacked over
/// `Box<dyn XmlRead>` chains.
pub trait XmlRead {
    /// Returns the kind of the current node.
    fn node_kind(&self) -> NodeKind;
    /// Returns the local name of the current node, or `""` for unnamed nodes.
    fn local_name(&self) -> &str;
    /// Returns the prefix of the current node name, or `""`.
    fn prefix(&self) -> &str;
    /// Returns the namespace of the current node name.
    fn namespace_uri(&self) -> &str;
    /// Returns the textual value of the current node.
    fn value(&self) -> &str;
    /// Returns the depth of the current node. Attributes are one level deeper
    /// than their element.
    fn depth(&self) -> usize;
    /// Returns `true` if the current node is an element written as `<name/>`.
    fn is_empty_element(&self) -> bool;
    /// Returns the state of the reader.
    fn read_state(&self) -> ReadState;

    /// Returns the attributes of the current element. For other nodes the
    /// list is empty, except for `DOCTYPE` which reports its identifiers as
    /// `PUBLIC` and `SYSTEM` pseudo-attributes.
    fn attributes(&self) -> &[Attribute];
    /// Moves to the first attribute of the current element. Returns `false`
    /// and does not move if there are no attributes.
    fn move_to_first_attribute(&mut self) -> bool;
    /// Moves to the next attribute. Returns `false` and does not move if the
    /// reader is not on an attribute or is on the last one.
    fn move_to_next_attribute(&mut self) -> bool;
    /// Moves from an attribute back to its element. Returns `false` if the
    /// reader was not on an attribute.
    fn move_to_element(&mut self) -> bool;

    /// Resolves the prefix in the scope of the current node. The empty prefix
    /// designates the default namespace.
    fn lookup_namespace(&self, prefix: &str) -> Option<&str>;

    /// Moves to the next node. Returns `false` when there are no more nodes.
    ///
    /// Any unfinished binary read is completed first.
    fn read(&mut self) -> Result<bool>;

    /// Returns the qualified name (`prefix:local` or `local`) of the current node.
    fn name(&self) -> String {
        qualified(self.prefix(), self.local_name())
    }

    /// Returns the position of the current node in the input, if the reader
    /// tracks positions.
    fn line_info(&self) -> Option<LineInfo> {
        None
    }

    /// Returns the number of attributes of the current element.
    fn attribute_count(&self) -> usize {
        self.attributes().len()
    }

    /// Returns the value of the attribute with the specified qualified name.
    fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.value.as_str())
    }

    /// Returns all namespace bindings visible on the current node as
    /// `(prefix, namespace)` pairs.
    fn namespaces_in_scope(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Returns an owned copy of the current node.
    fn node(&self) -> Node {
        Node {
            kind: self.node_kind(),
            prefix: self.prefix().to_owned(),
            local_name: self.local_name().to_owned(),
            namespace_uri: self.namespace_uri().to_owned(),
            value: self.value().to_owned(),
            depth: self.depth(),
            is_empty_element: self.is_empty_element(),
            attributes: self.attributes().to_vec(),
            line_info: self.line_info(),
        }
    }

    /// Skips the children of the current element and moves to the node that
    /// follows its end element. On other nodes behaves like [`read`](Self::read).
    fn skip(&mut self) -> Result<()> {
        if self.read_state() != ReadState::Interactive {
            return Ok(());
        }
        self.move_to_element();
        if self.node_kind() == NodeKind::Element && !self.is_empty_element() {
            let depth = self.depth();
            while self.read()? && depth < self.depth() {}
            if self.node_kind() == NodeKind::EndElement {
                self.read()?;
            }
        } else {
            self.read()?;
        }
        Ok(())
    }

    /// Skips nodes which are not content (whitespace, comments, processing
    /// instructions, declarations) and returns the kind of the node where the
    /// reader stopped.
    fn move_to_content(&mut self) -> Result<NodeKind> {
        loop {
            match self.node_kind() {
                NodeKind::Attribute => {
                    self.move_to_element();
                    return Ok(NodeKind::Element);
                }
                kind @ (NodeKind::Element
                | NodeKind::EndElement
                | NodeKind::Text
                | NodeKind::CData
                | NodeKind::EntityReference
                | NodeKind::EndEntity) => return Ok(kind),
                _ => {}
            }
            if !self.read()? {
                return Ok(self.node_kind());
            }
        }
    }

    /// Concatenates the values of the text, CDATA and whitespace nodes
    /// starting from the current one, skipping comments and processing
    /// instructions. Stops on the first other node.
    fn read_string(&mut self) -> Result<String> {
        let mut result = String::new();
        if self.node_kind() == NodeKind::Attribute {
            result.push_str(self.value());
            return Ok(result);
        }
        loop {
            match self.node_kind() {
                kind if kind.is_textual() => result.push_str(self.value()),
                NodeKind::Comment | NodeKind::ProcessingInstruction | NodeKind::EndEntity => {}
                NodeKind::EntityReference if self.can_resolve_entity() => self.resolve_entity()?,
                _ => return Ok(result),
            }
            if !self.read()? {
                return Ok(result);
            }
        }
    }

    /// Returns `true` if the reader is positioned on an entity reference that
    /// [`resolve_entity`](Self::resolve_entity) can expand.
    fn can_resolve_entity(&self) -> bool {
        false
    }

    /// Expands the entity reference on which the reader is positioned. The
    /// next [`read`](Self::read) moves to the replacement text, which is
    /// followed by an [`EndEntity`](NodeKind::EndEntity) node.
    fn resolve_entity(&mut self) -> Result<()> {
        Err(MisuseError::NotSupported("resolve_entity").into())
    }

    /// Returns `true` if the reader can return values in chunks.
    fn can_read_value_chunk(&self) -> bool {
        false
    }

    /// Appends up to `max_len` bytes of the not yet returned part of the
    /// current node value to `buf`. Returns the number of bytes appended,
    /// `0` at the end of the value.
    ///
    /// A chunk never splits a character, so at least one whole character is
    /// returned even if `max_len` is smaller than its UTF-8 length.
    fn read_value_chunk(&mut self, _buf: &mut String, _max_len: usize) -> Result<usize> {
        Err(MisuseError::NotSupported("read_value_chunk").into())
    }

    /// Returns `true` if the binary content methods are supported.
    fn can_read_binary_content(&self) -> bool {
        false
    }

    /// Decodes Base64 content starting at the current node into `buf`.
    /// See [`BinaryReadHelper`](crate::binary::BinaryReadHelper).
    fn read_content_as_base64(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(MisuseError::NotSupported("read_content_as_base64").into())
    }

    /// Decodes BinHex content starting at the current node into `buf`.
    fn read_content_as_bin_hex(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(MisuseError::NotSupported("read_content_as_bin_hex").into())
    }

    /// Decodes Base64 content of the current element into `buf`.
    fn read_element_content_as_base64(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(MisuseError::NotSupported("read_element_content_as_base64").into())
    }

    /// Decodes BinHex content of the current element into `buf`.
    fn read_element_content_as_bin_hex(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(MisuseError::NotSupported("read_element_content_as_bin_hex").into())
    }
}

/// Implements [`XmlRead`] for a pointer type by forwarding every method.
macro_rules! impl_read_forward {
    ($($ty:tt)*) => {
        impl<R: XmlRead + ?Sized> XmlRead for $($ty)* {
            fn node_kind(&self) -> NodeKind {
                (**self).node_kind()
            }
            fn local_name(&self) -> &str {
                (**self).local_name()
            }
            fn prefix(&self) -> &str {
                (**self).prefix()
            }
            fn namespace_uri(&self) -> &str {
                (**self).namespace_uri()
            }
            fn value(&self) -> &str {
                (**self).value()
            }
            fn depth(&self) -> usize {
                (**self).depth()
            }
            fn is_empty_element(&self) -> bool {
                (**self).is_empty_element()
            }
            fn read_state(&self) -> ReadState {
                (**self).read_state()
            }
            fn attributes(&self) -> &[Attribute] {
                (**self).attributes()
            }
            fn move_to_first_attribute(&mut self) -> bool {
                (**self).move_to_first_attribute()
            }
            fn move_to_next_attribute(&mut self) -> bool {
                (**self).move_to_next_attribute()
            }
            fn move_to_element(&mut self) -> bool {
                (**self).move_to_element()
            }
            fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
                (**self).lookup_namespace(prefix)
            }
            fn read(&mut self) -> Result<bool> {
                (**self).read()
            }
            fn line_info(&self) -> Option<LineInfo> {
                (**self).line_info()
            }
            fn namespaces_in_scope(&self) -> Vec<(String, String)> {
                (**self).namespaces_in_scope()
            }
            fn skip(&mut self) -> Result<()> {
                (**self).skip()
            }
            fn can_resolve_entity(&self) -> bool {
                (**self).can_resolve_entity()
            }
            fn resolve_entity(&mut self) -> Result<()> {
                (**self).resolve_entity()
            }
            fn can_read_value_chunk(&self) -> bool {
                (**self).can_read_value_chunk()
            }
            fn read_value_chunk(&mut self, buf: &mut String, max_len: usize) -> Result<usize> {
                (**self).read_value_chunk(buf, max_len)
            }
            fn can_read_binary_content(&self) -> bool {
                (**self).can_read_binary_content()
            }
            fn read_content_as_base64(&mut self, buf: &mut [u8]) -> Result<usize> {
                (**self).read_content_as_base64(buf)
            }
            fn read_content_as_bin_hex(&mut self, buf: &mut [u8]) -> Result<usize> {
                (**self).read_content_as_bin_hex(buf)
            }
            fn read_element_content_as_base64(&mut self, buf: &mut [u8]) -> Result<usize> {
                (**self).read_element_content_as_base64(buf)
            }
            fn read_element_content_as_bin_hex(&mut self, buf: &mut [u8]) -> Result<usize> {
                (**self).read_element_content_as_bin_hex(buf)
            }
        }
    };
}

impl_read_forward!(Box<R>);
impl_read_forward!(&mut R);

/// Returns the next chunk of `value` starting at `*offset`, as described in
/// [`XmlRead::read_value_chunk`], and advances the offset.
pub(crate) fn next_value_chunk(
    value: &str,
    offset: &mut usize,
    buf: &mut String,
    max_len: usize,
) -> usize {
    let rest = &value[(*offset).min(value.len())..];
    if rest.is_empty() {
        return 0;
    }
    let mut end = max_len.min(rest.len());
    while !rest.is_char_boundary(end) {
        end += 1;
    }
    if end == 0 {
        end = rest.chars().next().map_or(0, char::len_utf8);
    }
    buf.push_str(&rest[..end]);
    *offset += end;
    end
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// How the `<!DOCTYPE>` declaration is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-types", derive(Serialize, Deserialize))]
pub enum DtdProcessing {
    /// A document with a `DOCTYPE` is rejected
    #[default]
    Prohibit,
    /// `DOCTYPE` is silently skipped
    Ignore,
    /// `DOCTYPE` is reported and its internal subset is passed to the entity resolver
    Parse,
}

/// How references to general entities are reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-types", derive(Serialize, Deserialize))]
pub enum EntityHandling {
    /// All references are replaced by their text. The reader never reports
    /// [`NodeKind::EntityReference`]
    #[default]
    ExpandEntities,
    /// Only character references and predefined entities are replaced. Other
    /// entities are reported as [`NodeKind::EntityReference`] nodes which can
    /// be expanded with [`XmlRead::resolve_entity`]
    ExpandCharEntities,
}

/// Options used to build a reader chain with [`create_reader`](Self::create_reader).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-types", derive(Serialize, Deserialize))]
pub struct ReaderSettings {
    /// Check that names and all characters are allowed in XML.
    ///
    /// Default: `true`
    pub check_characters: bool,
    /// Do not report insignificant whitespace.
    ///
    /// Default: `false`
    pub ignore_whitespace: bool,
    /// Do not report comments.
    ///
    /// Default: `false`
    pub ignore_comments: bool,
    /// Do not report processing instructions.
    ///
    /// Default: `false`
    pub ignore_processing_instructions: bool,
    /// What to do with the `<!DOCTYPE>` declaration.
    ///
    /// Default: [`DtdProcessing::Prohibit`]
    pub dtd_processing: DtdProcessing,
    /// Whether the input must be a complete document.
    ///
    /// Default: [`ConformanceLevel::Document`]
    pub conformance_level: ConformanceLevel,
    /// How entity references are reported.
    ///
    /// Default: [`EntityHandling::ExpandEntities`]
    pub entity_handling: EntityHandling,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            check_characters: true,
            ignore_whitespace: false,
            ignore_comments: false,
            ignore_processing_instructions: false,
            dtd_processing: DtdProcessing::Prohibit,
            conformance_level: ConformanceLevel::Document,
            entity_handling: EntityHandling::ExpandEntities,
        }
    }
}

impl ReaderSettings {
    /// Returns `true` if readers created with these settings need a
    /// [`CharCheckingReader`] over the [`TextReader`].
    pub fn needs_checking(&self) -> bool {
        self.check_characters
            || self.ignore_whitespace
            || self.ignore_comments
            || self.ignore_processing_instructions
            || self.dtd_processing != DtdProcessing::Parse
    }

    /// Creates a reader of the document in `input`.
    ///
    /// ```
    /// # use pretty_assertions::assert_eq;
    /// use xml_pipeline::reader::{ReaderSettings, XmlRead};
    /// use xml_pipeline::NodeKind;
    ///
    /// let settings = ReaderSettings {
    ///     ignore_comments: true,
    ///     ..ReaderSettings::default()
    /// };
    /// let mut reader = settings.create_reader("<root><!--comment-->text</root>");
    ///
    /// reader.read().unwrap();
    /// reader.read().unwrap();
    /// assert_eq!(reader.node_kind(), NodeKind::Text);
    /// ```
    pub fn create_reader<'i>(&self, input: &'i str) -> Box<dyn XmlRead + 'i> {
        let reader = TextReader::with_settings(input, self);
        if self.needs_checking() {
            Box::new(CharCheckingReader::new(reader, self))
        } else {
            Box::new(reader)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn value_chunks() {
        let value = "aéb";
        let mut offset = 0;
        let mut buf = String::new();

        assert_eq!(next_value_chunk(value, &mut offset, &mut buf, 2), 3);
        assert_eq!(buf, "aé");
        assert_eq!(next_value_chunk(value, &mut offset, &mut buf, 2), 1);
        assert_eq!(buf, "aéb");
        assert_eq!(next_value_chunk(value, &mut offset, &mut buf, 2), 0);
    }

    #[test]
    fn value_chunk_smaller_than_char() {
        let mut offset = 0;
        let mut buf = String::new();

        assert_eq!(next_value_chunk("é", &mut offset, &mut buf, 0), 2);
        assert_eq!(buf, "é");
    }
}
