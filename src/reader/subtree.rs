use log::trace;

use super::XmlRead;
use crate::binary::{finish_binary_read, impl_binary_content, BinaryReadHelper};
use crate::errors::{MisuseError, Result};
use crate::name::NamespaceScope;
use crate::node::{Attribute, LineInfo, NodeKind, ReadState};

/// Presents an element and its descendants as a complete document.
///
/// The reader is created over a reader positioned on a start element (the
/// root of the subtree) and starts positioned on that element. Reads go
/// through the wrapped reader and stop after the end element of the root, so
/// the wrapped reader can continue from there when the subtree reader is
/// dropped. Wrap `&mut reader` to keep the ownership:
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_pipeline::reader::{SubtreeReader, TextReader, XmlRead};
///
/// let mut reader = TextReader::from_str("<x><y><z/></y><w/></x>");
/// reader.read().unwrap();
/// reader.read().unwrap();
///
/// let mut subtree = SubtreeReader::new(&mut reader).unwrap();
/// let mut names = vec![subtree.name()];
/// while subtree.read().unwrap() {
///     names.push(subtree.name());
/// }
/// assert_eq!(names, ["y", "z", "y"]);
///
/// reader.read().unwrap();
/// assert_eq!(reader.name(), "w");
/// ```
///
/// Depths are reported relative to the root of the subtree. Namespace
/// declarations made outside of the subtree stay visible inside it.
pub struct SubtreeReader<R> {
    inner: R,
    /// Depth of the root element in the wrapped reader
    initial_depth: usize,
    state: ReadState,
    scope: NamespaceScope,
    /// Scope of the current end or empty element must be popped before the
    /// next node
    pending_pop: bool,
    binary: BinaryReadHelper,
}

impl<R: XmlRead> SubtreeReader<R> {
    /// Creates a reader of the subtree rooted at the element on which `inner`
    /// is positioned. If `inner` is on an attribute, its element is used.
    pub fn new(mut inner: R) -> Result<Self> {
        inner.move_to_element();
        let kind = inner.node_kind();
        if kind != NodeKind::Element {
            return Err(MisuseError::NotOnElement {
                method: "SubtreeReader::new",
                kind,
            }
            .into());
        }
        let mut scope = NamespaceScope::default();
        scope.push_scope();
        for (prefix, uri) in inner.namespaces_in_scope() {
            scope.declare(&prefix, &uri);
        }
        Ok(Self {
            initial_depth: inner.depth(),
            inner,
            state: ReadState::Interactive,
            scope,
            pending_pop: false,
            binary: BinaryReadHelper::default(),
        })
    }

    /// Consumes the subtree reader, returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn is_active(&self) -> bool {
        self.state == ReadState::Interactive
    }

    /// Returns `true` if the wrapped reader is on the last node of the subtree.
    fn at_subtree_end(&self) -> bool {
        self.inner.depth() <= self.initial_depth
            && match self.inner.node_kind() {
                NodeKind::EndElement => true,
                NodeKind::Element => self.inner.is_empty_element(),
                _ => false,
            }
    }

    /// Updates namespace scopes after the wrapped reader moved to a new node.
    fn enter_node(&mut self) {
        match self.inner.node_kind() {
            NodeKind::Element => {
                self.scope.push_scope();
                for attr in self.inner.attributes() {
                    if attr.prefix.is_empty() && attr.local_name == "xmlns" {
                        self.scope.declare("", &attr.value);
                    } else if attr.prefix == "xmlns" {
                        self.scope.declare(&attr.local_name, &attr.value);
                    }
                }
                if self.inner.is_empty_element() {
                    self.pending_pop = true;
                }
            }
            NodeKind::EndElement if self.inner.depth() > self.initial_depth => {
                self.pending_pop = true;
            }
            _ => {}
        }
    }

    fn leave_node(&mut self) {
        if self.pending_pop {
            self.scope.pop_scope();
            self.pending_pop = false;
        }
    }

    fn advance(&mut self, skip: bool) -> Result<bool> {
        let result = if skip {
            self.inner.skip().map(|_| self.inner.read_state() == ReadState::Interactive)
        } else {
            self.inner.read()
        };
        match result {
            Ok(true) => {
                self.enter_node();
                Ok(true)
            }
            Ok(false) => {
                self.state = ReadState::EndOfFile;
                Ok(false)
            }
            Err(e) => {
                self.state = ReadState::Error;
                Err(e)
            }
        }
    }
}

impl<R: XmlRead> XmlRead for SubtreeReader<R> {
    fn node_kind(&self) -> NodeKind {
        if self.is_active() {
            self.inner.node_kind()
        } else {
            NodeKind::None
        }
    }

    fn local_name(&self) -> &str {
        if self.is_active() {
            self.inner.local_name()
        } else {
            ""
        }
    }

    fn prefix(&self) -> &str {
        if self.is_active() {
            self.inner.prefix()
        } else {
            ""
        }
    }

    fn namespace_uri(&self) -> &str {
        if self.is_active() {
            self.inner.namespace_uri()
        } else {
            ""
        }
    }

    fn value(&self) -> &str {
        if self.is_active() {
            self.inner.value()
        } else {
            ""
        }
    }

    fn depth(&self) -> usize {
        if self.is_active() {
            self.inner.depth().saturating_sub(self.initial_depth)
        } else {
            0
        }
    }

    fn is_empty_element(&self) -> bool {
        self.is_active() && self.inner.is_empty_element()
    }

    fn read_state(&self) -> ReadState {
        self.state
    }

    fn line_info(&self) -> Option<LineInfo> {
        if self.is_active() {
            self.inner.line_info()
        } else {
            None
        }
    }

    fn attributes(&self) -> &[Attribute] {
        if self.is_active() {
            self.inner.attributes()
        } else {
            &[]
        }
    }

    fn move_to_first_attribute(&mut self) -> bool {
        self.binary.reset();
        self.is_active() && self.inner.move_to_first_attribute()
    }

    fn move_to_next_attribute(&mut self) -> bool {
        self.binary.reset();
        self.is_active() && self.inner.move_to_next_attribute()
    }

    fn move_to_element(&mut self) -> bool {
        self.binary.reset();
        self.is_active() && self.inner.move_to_element()
    }

    fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        self.scope.lookup(prefix)
    }

    fn namespaces_in_scope(&self) -> Vec<(String, String)> {
        self.scope.in_scope()
    }

    fn read(&mut self) -> Result<bool> {
        finish_binary_read!(self.binary);
        if !self.is_active() {
            return Ok(false);
        }
        self.inner.move_to_element();
        self.leave_node();
        if self.at_subtree_end() {
            trace!("end of subtree reached");
            self.state = ReadState::EndOfFile;
            return Ok(false);
        }
        self.advance(false)
    }

    /// Skips the current node with all its descendants. On the root of the
    /// subtree the whole subtree is skipped and the reader ends.
    fn skip(&mut self) -> Result<()> {
        finish_binary_read!(self.binary);
        if !self.is_active() {
            return Ok(());
        }
        self.inner.move_to_element();
        self.leave_node();

        if self.inner.depth() <= self.initial_depth {
            if self.inner.node_kind() == NodeKind::Element && !self.inner.is_empty_element() {
                if let Err(e) = self.skip_root_content() {
                    self.state = ReadState::Error;
                    return Err(e);
                }
            }
            trace!("subtree skipped");
            self.state = ReadState::EndOfFile;
            return Ok(());
        }

        if self.inner.node_kind() == NodeKind::Element && !self.inner.is_empty_element() {
            // The scope of the element ends with its skipped end element
            self.scope.pop_scope();
        }
        self.advance(true).map(|_| ())
    }

    impl_binary_content!(binary);
}

impl<R: XmlRead> SubtreeReader<R> {
    /// Moves the wrapped reader to the end element of the root. Children are
    /// skipped as whole subtrees.
    fn skip_root_content(&mut self) -> Result<()> {
        if !self.inner.read()? {
            return Ok(());
        }
        while self.inner.depth() > self.initial_depth {
            self.inner.skip()?;
            if self.inner.read_state() != ReadState::Interactive {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::TextReader;
    use pretty_assertions::assert_eq;

    fn names<R: XmlRead>(reader: &mut R) -> Vec<(NodeKind, String, usize)> {
        let mut result = vec![(reader.node_kind(), reader.name(), reader.depth())];
        while reader.read().unwrap() {
            result.push((reader.node_kind(), reader.name(), reader.depth()));
        }
        result
    }

    #[test]
    fn nested() {
        let mut reader = TextReader::from_str("<x><y><z/></y></x>");
        reader.read().unwrap();
        reader.read().unwrap();

        let mut subtree = SubtreeReader::new(&mut reader).unwrap();
        assert_eq!(
            names(&mut subtree),
            vec![
                (NodeKind::Element, "y".to_string(), 0),
                (NodeKind::Element, "z".to_string(), 1),
                (NodeKind::EndElement, "y".to_string(), 0),
            ]
        );
        assert_eq!(subtree.read_state(), ReadState::EndOfFile);
        assert_eq!(subtree.node_kind(), NodeKind::None);
        assert_eq!(subtree.read().unwrap(), false);
        drop(subtree);

        assert_eq!(reader.node_kind(), NodeKind::EndElement);
        assert_eq!(reader.name(), "y");
        reader.read().unwrap();
        assert_eq!(reader.name(), "x");
    }

    #[test]
    fn empty_root() {
        let mut reader = TextReader::from_str("<x><y/><w/></x>");
        reader.read().unwrap();
        reader.read().unwrap();

        let mut subtree = SubtreeReader::new(&mut reader).unwrap();
        assert!(subtree.is_empty_element());
        assert_eq!(subtree.read().unwrap(), false);
        drop(subtree);

        reader.read().unwrap();
        assert_eq!(reader.name(), "w");
    }

    #[test]
    fn not_on_element() {
        let mut reader = TextReader::from_str("<x>text</x>");
        reader.read().unwrap();
        reader.read().unwrap();
        assert!(SubtreeReader::new(&mut reader).is_err());
    }

    #[test]
    fn skip_root() {
        let mut reader = TextReader::from_str("<x><y><a><b/></a>text</y><w/></x>");
        reader.read().unwrap();
        reader.read().unwrap();

        let mut subtree = SubtreeReader::new(&mut reader).unwrap();
        subtree.skip().unwrap();
        assert_eq!(subtree.read_state(), ReadState::EndOfFile);
        drop(subtree);

        assert_eq!(reader.node_kind(), NodeKind::EndElement);
        reader.read().unwrap();
        assert_eq!(reader.name(), "w");
    }

    #[test]
    fn skip_child() {
        let mut reader = TextReader::from_str("<x><a><b/></a><c/></x>");
        reader.read().unwrap();

        let mut subtree = SubtreeReader::new(&mut reader).unwrap();
        subtree.read().unwrap();
        assert_eq!(subtree.name(), "a");
        subtree.skip().unwrap();
        assert_eq!(subtree.name(), "c");
        subtree.read().unwrap();
        assert_eq!(subtree.node_kind(), NodeKind::EndElement);
        assert_eq!(subtree.read().unwrap(), false);
    }

    #[test]
    fn namespaces() {
        let mut reader =
            TextReader::from_str("<x xmlns:o='urn:outer'><y xmlns='urn:y'><p:z xmlns:p='urn:p'/><q/></y></x>");
        reader.read().unwrap();
        reader.read().unwrap();

        let mut subtree = SubtreeReader::new(&mut reader).unwrap();
        assert_eq!(subtree.lookup_namespace("o"), Some("urn:outer"));
        assert_eq!(subtree.lookup_namespace(""), Some("urn:y"));

        subtree.read().unwrap();
        assert_eq!(subtree.lookup_namespace("p"), Some("urn:p"));

        subtree.read().unwrap();
        assert_eq!(subtree.name(), "q");
        assert_eq!(subtree.lookup_namespace("p"), None);
        assert_eq!(subtree.lookup_namespace("o"), Some("urn:outer"));
    }
}
