use std::fmt;

use log::debug;

use super::{next_value_chunk, XmlRead};
use crate::binary::{finish_binary_read, impl_binary_content, BinaryReadHelper};
use crate::errors::{MisuseError, Result};
use crate::name::{XMLNS_NAMESPACE, XML_NAMESPACE};
use crate::node::{Attribute, LineInfo, Node, NodeKind, ReadState};

/// Mode of a [`CachingReader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachingMode {
    /// Nodes are read from the wrapped reader and recorded
    Record,
    /// Recorded nodes are returned
    Replay,
    /// Recorded nodes were exhausted; nodes are read from the wrapped reader
    Live,
}

/// A reader that records nodes of its wrapped reader and later replays them.
///
/// While recording, the reader behaves exactly as the wrapped reader and keeps
/// an owned copy of each node, starting from the node on which the wrapped
/// reader was positioned at construction. After [`start_replay`] the recorded
/// nodes are returned again from the first one. Once they are exhausted, the
/// reader continues from the wrapped reader, which is still positioned after
/// the last recorded node, and calls the callback registered with
/// [`on_replay_end`]: the owner may then drop this reader and use the wrapped
/// one directly.
///
/// [`start_replay`]: Self::start_replay
/// [`on_replay_end`]: Self::on_replay_end
pub struct CachingReader<R> {
    inner: R,
    mode: CachingMode,
    cache: Vec<Node>,
    /// Namespace bindings in scope of each recorded node
    scopes: Vec<Vec<(String, String)>>,
    /// Index of the current node in `cache` while replaying
    index: usize,
    /// Index of the current attribute of the cached node
    attribute: Option<usize>,
    chunk_offset: usize,
    on_replay_end: Option<Box<dyn FnOnce()>>,
    binary: BinaryReadHelper,
}

impl<R: XmlRead> CachingReader<R> {
    /// Starts recording nodes of `inner`.
    pub fn new(mut inner: R) -> Self {
        inner.move_to_element();
        let mut cache = Vec::new();
        let mut scopes = Vec::new();
        if inner.read_state() == ReadState::Interactive {
            cache.push(inner.node());
            scopes.push(inner.namespaces_in_scope());
        }
        Self {
            inner,
            mode: CachingMode::Record,
            cache,
            scopes,
            index: 0,
            attribute: None,
            chunk_offset: 0,
            on_replay_end: None,
            binary: BinaryReadHelper::default(),
        }
    }

    /// Registers a function which is called once, when replay ends and the
    /// reader starts returning nodes of the wrapped reader.
    pub fn on_replay_end(&mut self, callback: impl FnOnce() + 'static) {
        self.on_replay_end = Some(Box::new(callback));
    }

    /// Returns the current mode.
    pub fn mode(&self) -> CachingMode {
        self.mode
    }

    /// Returns the recorded nodes.
    pub fn recorded(&self) -> &[Node] {
        &self.cache
    }

    /// Stops recording and positions the reader on the first recorded node.
    pub fn start_replay(&mut self) -> Result<()> {
        if self.mode != CachingMode::Record {
            return Err(MisuseError::NotSupported("start_replay").into());
        }
        self.binary.reset();
        self.inner.move_to_element();
        self.attribute = None;
        self.chunk_offset = 0;
        self.index = 0;
        if self.cache.is_empty() {
            self.go_live();
        } else {
            debug!("replaying {} recorded nodes", self.cache.len());
            self.mode = CachingMode::Replay;
        }
        Ok(())
    }

    /// Consumes the reader, returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn go_live(&mut self) {
        debug!("replay finished, continuing from the wrapped reader");
        self.mode = CachingMode::Live;
        self.cache.clear();
        self.scopes.clear();
        if let Some(callback) = self.on_replay_end.take() {
            callback();
        }
    }

    /// Returns the replayed node, if the reader is replaying.
    fn cached(&self) -> Option<&Node> {
        match self.mode {
            CachingMode::Replay => self.cache.get(self.index),
            _ => None,
        }
    }

    fn cached_attribute(&self) -> Option<&Attribute> {
        let node = self.cached()?;
        node.attributes.get(self.attribute?)
    }
}

impl<R> fmt::Debug for CachingReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CachingReader")
            .field("mode", &self.mode)
            .field("cache", &self.cache)
            .field("index", &self.index)
            .field("attribute", &self.attribute)
            .finish()
    }
}

impl<R: XmlRead> XmlRead for CachingReader<R> {
    fn node_kind(&self) -> NodeKind {
        match self.cached() {
            Some(_) if self.attribute.is_some() => NodeKind::Attribute,
            Some(node) => node.kind,
            None => self.inner.node_kind(),
        }
    }

    fn local_name(&self) -> &str {
        match (self.cached(), self.cached_attribute()) {
            (_, Some(a)) => &a.local_name,
            (Some(node), None) => &node.local_name,
            (None, _) => self.inner.local_name(),
        }
    }

    fn prefix(&self) -> &str {
        match (self.cached(), self.cached_attribute()) {
            (_, Some(a)) => &a.prefix,
            (Some(node), None) => &node.prefix,
            (None, _) => self.inner.prefix(),
        }
    }

    fn namespace_uri(&self) -> &str {
        match (self.cached(), self.cached_attribute()) {
            (_, Some(a)) => &a.namespace_uri,
            (Some(node), None) => &node.namespace_uri,
            (None, _) => self.inner.namespace_uri(),
        }
    }

    fn value(&self) -> &str {
        match (self.cached(), self.cached_attribute()) {
            (_, Some(a)) => &a.value,
            (Some(node), None) => &node.value,
            (None, _) => self.inner.value(),
        }
    }

    fn depth(&self) -> usize {
        match self.cached() {
            Some(node) if self.attribute.is_some() => node.depth + 1,
            Some(node) => node.depth,
            None => self.inner.depth(),
        }
    }

    fn is_empty_element(&self) -> bool {
        match self.cached() {
            Some(node) => self.attribute.is_none() && node.is_empty_element,
            None => self.inner.is_empty_element(),
        }
    }

    fn read_state(&self) -> ReadState {
        match self.mode {
            CachingMode::Replay => ReadState::Interactive,
            _ => self.inner.read_state(),
        }
    }

    fn line_info(&self) -> Option<LineInfo> {
        match self.cached() {
            Some(node) => node.line_info,
            None => self.inner.line_info(),
        }
    }

    fn attributes(&self) -> &[Attribute] {
        match self.cached() {
            Some(node) => &node.attributes,
            None => self.inner.attributes(),
        }
    }

    fn move_to_first_attribute(&mut self) -> bool {
        self.binary.reset();
        self.chunk_offset = 0;
        match self.cached().map(|node| node.attributes.len()) {
            Some(0) => false,
            Some(_) => {
                self.attribute = Some(0);
                true
            }
            None => self.inner.move_to_first_attribute(),
        }
    }

    fn move_to_next_attribute(&mut self) -> bool {
        self.binary.reset();
        self.chunk_offset = 0;
        match (self.cached().map(|node| node.attributes.len()), self.attribute) {
            (Some(count), Some(i)) if i + 1 < count => {
                self.attribute = Some(i + 1);
                true
            }
            (Some(_), _) => false,
            (None, _) => self.inner.move_to_next_attribute(),
        }
    }

    fn move_to_element(&mut self) -> bool {
        self.binary.reset();
        self.chunk_offset = 0;
        match self.mode {
            CachingMode::Replay => self.attribute.take().is_some(),
            _ => self.inner.move_to_element(),
        }
    }

    fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        let scope = match self.mode {
            CachingMode::Replay => &self.scopes[self.index],
            _ => return self.inner.lookup_namespace(prefix),
        };
        match prefix {
            "xml" => Some(XML_NAMESPACE),
            "xmlns" => Some(XMLNS_NAMESPACE),
            // An undeclared default namespace is not part of the recorded scope
            _ => scope
                .iter()
                .find(|(p, _)| p == prefix)
                .map(|(_, uri)| uri.as_str())
                .or(if prefix.is_empty() { Some("") } else { None }),
        }
    }

    fn namespaces_in_scope(&self) -> Vec<(String, String)> {
        match self.mode {
            CachingMode::Replay => self.scopes[self.index].clone(),
            _ => self.inner.namespaces_in_scope(),
        }
    }

    fn read(&mut self) -> Result<bool> {
        finish_binary_read!(self.binary);
        self.attribute = None;
        self.chunk_offset = 0;
        match self.mode {
            CachingMode::Record => {
                if !self.inner.read()? {
                    return Ok(false);
                }
                self.cache.push(self.inner.node());
                self.scopes.push(self.inner.namespaces_in_scope());
                Ok(true)
            }
            CachingMode::Replay => {
                if self.index + 1 < self.cache.len() {
                    self.index += 1;
                    return Ok(true);
                }
                self.go_live();
                self.inner.read()
            }
            CachingMode::Live => self.inner.read(),
        }
    }

    fn can_resolve_entity(&self) -> bool {
        self.mode != CachingMode::Replay && self.inner.can_resolve_entity()
    }

    fn resolve_entity(&mut self) -> Result<()> {
        if self.mode == CachingMode::Replay {
            return Err(MisuseError::NotSupported("resolve_entity").into());
        }
        self.inner.resolve_entity()
    }

    fn can_read_value_chunk(&self) -> bool {
        self.mode == CachingMode::Replay || self.inner.can_read_value_chunk()
    }

    fn read_value_chunk(&mut self, buf: &mut String, max_len: usize) -> Result<usize> {
        if self.mode != CachingMode::Replay {
            return self.inner.read_value_chunk(buf, max_len);
        }
        let node = &self.cache[self.index];
        let value = match self.attribute.and_then(|i| node.attributes.get(i)) {
            Some(a) => &a.value,
            None => &node.value,
        };
        Ok(next_value_chunk(value, &mut self.chunk_offset, buf, max_len))
    }

    impl_binary_content!(binary);
}
