use log::debug;

use super::{DtdProcessing, ReaderSettings, XmlRead};
use crate::binary::{finish_binary_read, BinaryReadHelper};
use crate::errors::{Error, IllFormedError, Result};
use crate::node::{Attribute, LineInfo, NodeKind, ReadState};
use crate::validation::{check_chars, check_ncname, check_public_id, check_qname};

/// A reader that hides ignorable nodes and rejects names and characters which
/// are not allowed in XML.
///
/// Skipped nodes are never visible to the caller: [`read`](XmlRead::read)
/// loops over the wrapped reader until a node that passes the filter is
/// found. The same applies to binary content reads, which are driven through
/// this reader whenever it filters anything.
///
/// Once a check fails, the reader stays in the [`ReadState::Error`] state.
pub struct CharCheckingReader<R> {
    inner: R,
    check_characters: bool,
    ignore_whitespace: bool,
    ignore_comments: bool,
    ignore_processing_instructions: bool,
    dtd_processing: DtdProcessing,
    failed: bool,
    binary: BinaryReadHelper,
}

impl<R: XmlRead> CharCheckingReader<R> {
    /// Wraps `inner` with the checks and filters requested by `settings`.
    pub fn new(inner: R, settings: &ReaderSettings) -> Self {
        Self {
            inner,
            check_characters: settings.check_characters,
            ignore_whitespace: settings.ignore_whitespace,
            ignore_comments: settings.ignore_comments,
            ignore_processing_instructions: settings.ignore_processing_instructions,
            dtd_processing: settings.dtd_processing,
            failed: false,
            binary: BinaryReadHelper::default(),
        }
    }

    /// Returns a reference to the wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consumes the decorator, returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Returns `true` if the node is dropped by the filter.
    fn is_ignored(&self, kind: NodeKind) -> bool {
        match kind {
            NodeKind::Whitespace => self.ignore_whitespace,
            NodeKind::Comment => self.ignore_comments,
            NodeKind::ProcessingInstruction => self.ignore_processing_instructions,
            _ => false,
        }
    }

    /// Returns `true` if binary reads can go directly to the wrapped reader
    /// because this reader would not change what it sees.
    fn is_transparent(&self) -> bool {
        !self.check_characters
            && !self.ignore_whitespace
            && !self.ignore_comments
            && !self.ignore_processing_instructions
    }

    fn check_current(&self) -> std::result::Result<(), IllFormedError> {
        let inner = &self.inner;
        match inner.node_kind() {
            NodeKind::Element => {
                check_qname(&inner.name())?;
                for attr in inner.attributes() {
                    check_qname(&attr.name())?;
                    check_chars(&attr.value)?;
                }
            }
            NodeKind::Text
            | NodeKind::CData
            | NodeKind::Comment
            | NodeKind::Whitespace
            | NodeKind::SignificantWhitespace => check_chars(inner.value())?,
            NodeKind::ProcessingInstruction => {
                check_ncname(inner.local_name())?;
                check_chars(inner.value())?;
            }
            NodeKind::EntityReference => check_ncname(inner.local_name())?,
            NodeKind::DocumentType => {
                check_qname(inner.local_name())?;
                if let Some(id) = inner.get_attribute("PUBLIC") {
                    check_public_id(id)?;
                }
                if let Some(id) = inner.get_attribute("SYSTEM") {
                    check_chars(id)?;
                }
                check_chars(inner.value())?;
            }
            _ => {}
        }
        Ok(())
    }

    fn fail(&mut self, error: IllFormedError) -> Error {
        debug!("character check failed: {}", error);
        self.failed = true;
        Error::ill_formed_at(error, self.inner.line_info())
    }
}

impl<R: XmlRead> XmlRead for CharCheckingReader<R> {
    fn node_kind(&self) -> NodeKind {
        self.inner.node_kind()
    }

    fn local_name(&self) -> &str {
        self.inner.local_name()
    }

    fn prefix(&self) -> &str {
        self.inner.prefix()
    }

    fn namespace_uri(&self) -> &str {
        self.inner.namespace_uri()
    }

    fn value(&self) -> &str {
        self.inner.value()
    }

    fn depth(&self) -> usize {
        self.inner.depth()
    }

    fn is_empty_element(&self) -> bool {
        self.inner.is_empty_element()
    }

    fn read_state(&self) -> ReadState {
        if self.failed {
            ReadState::Error
        } else {
            self.inner.read_state()
        }
    }

    fn line_info(&self) -> Option<LineInfo> {
        self.inner.line_info()
    }

    fn attributes(&self) -> &[Attribute] {
        self.inner.attributes()
    }

    fn move_to_first_attribute(&mut self) -> bool {
        self.binary.reset();
        self.inner.move_to_first_attribute()
    }

    fn move_to_next_attribute(&mut self) -> bool {
        self.binary.reset();
        self.inner.move_to_next_attribute()
    }

    fn move_to_element(&mut self) -> bool {
        self.binary.reset();
        self.inner.move_to_element()
    }

    fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        self.inner.lookup_namespace(prefix)
    }

    fn namespaces_in_scope(&self) -> Vec<(String, String)> {
        self.inner.namespaces_in_scope()
    }

    fn read(&mut self) -> Result<bool> {
        finish_binary_read!(self.binary);
        if self.failed {
            return Ok(false);
        }
        loop {
            if !self.inner.read()? {
                return Ok(false);
            }
            let kind = self.inner.node_kind();
            if self.is_ignored(kind) {
                continue;
            }
            if kind == NodeKind::DocumentType {
                match self.dtd_processing {
                    DtdProcessing::Prohibit => return Err(self.fail(IllFormedError::DtdProhibited)),
                    DtdProcessing::Ignore => {
                        debug!("ignoring DOCTYPE `{}`", self.inner.local_name());
                        continue;
                    }
                    DtdProcessing::Parse => {}
                }
            }
            if self.check_characters {
                if let Err(e) = self.check_current() {
                    return Err(self.fail(e));
                }
            }
            return Ok(true);
        }
    }

    fn can_resolve_entity(&self) -> bool {
        self.inner.can_resolve_entity()
    }

    fn resolve_entity(&mut self) -> Result<()> {
        self.inner.resolve_entity()
    }

    fn can_read_value_chunk(&self) -> bool {
        self.inner.can_read_value_chunk()
    }

    fn read_value_chunk(&mut self, buf: &mut String, max_len: usize) -> Result<usize> {
        self.inner.read_value_chunk(buf, max_len)
    }

    fn can_read_binary_content(&self) -> bool {
        true
    }

    fn read_content_as_base64(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.is_transparent() && self.inner.can_read_binary_content() {
            return self.inner.read_content_as_base64(buf);
        }
        let mut helper = std::mem::take(&mut self.binary);
        let result = helper.read_content_as_base64(self, buf);
        self.binary = helper;
        result
    }

    fn read_content_as_bin_hex(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.is_transparent() && self.inner.can_read_binary_content() {
            return self.inner.read_content_as_bin_hex(buf);
        }
        let mut helper = std::mem::take(&mut self.binary);
        let result = helper.read_content_as_bin_hex(self, buf);
        self.binary = helper;
        result
    }

    fn read_element_content_as_base64(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.is_transparent() && self.inner.can_read_binary_content() {
            return self.inner.read_element_content_as_base64(buf);
        }
        let mut helper = std::mem::take(&mut self.binary);
        let result = helper.read_element_content_as_base64(self, buf);
        self.binary = helper;
        result
    }

    fn read_element_content_as_bin_hex(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.is_transparent() && self.inner.can_read_binary_content() {
            return self.inner.read_element_content_as_bin_hex(buf);
        }
        let mut helper = std::mem::take(&mut self.binary);
        let result = helper.read_element_content_as_bin_hex(self, buf);
        self.binary = helper;
        result
    }
}
