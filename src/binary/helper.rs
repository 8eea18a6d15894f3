use log::trace;

use super::{AnyDecoder, BinaryEncoding, IncrementalDecoder};
use crate::errors::{Error, IllFormedError, MisuseError, Result};
use crate::node::NodeKind;
use crate::reader::XmlRead;

/// Maximum number of bytes requested from [`XmlRead::read_value_chunk`] at once.
const CHUNK_SIZE: usize = 256;

/// Kind of a binary read in progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadBinaryState {
    /// No binary read is in progress
    #[default]
    None,
    /// Content of consecutive text nodes is being decoded
    InReadContent,
    /// Content of an element is being decoded. Reader will be moved past the
    /// end element once the content is over.
    InReadElementContent,
}

/// Decodes binary content of a reader in caller-sized chunks.
///
/// A binary read starts when one of the `read_*` methods is called for the
/// first time and lasts until the content is exhausted. The helper remembers
/// the encoding and the position inside the current text between calls, so
/// the concatenation of all returned chunks does not depend on the chunk size.
///
/// The helper moves the reader itself through [`XmlRead::read`], so every
/// node filtering done by the reader applies to the decoded content too.
#[derive(Clone, Debug, Default)]
pub struct BinaryReadHelper {
    state: ReadBinaryState,
    decoder: AnyDecoder,
    /// The content run is exhausted, the next read ends the binary read
    is_end: bool,
    /// Piece of value got from the reader with [`XmlRead::read_value_chunk`]
    chunk: String,
    /// Offset of not yet decoded text, either in `chunk` or in the node value
    offset: usize,
}

impl BinaryReadHelper {
    /// Returns the kind of the binary read in progress.
    #[inline]
    pub fn state(&self) -> ReadBinaryState {
        self.state
    }

    /// Returns `true` if a binary read was started and not finished yet.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state != ReadBinaryState::None
    }

    /// Forgets the binary read in progress without moving the reader.
    pub fn reset(&mut self) {
        self.state = ReadBinaryState::None;
        self.is_end = false;
        self.chunk.clear();
        self.offset = 0;
        self.decoder.reset();
    }

    /// Decodes Base64 content of the current node and following text nodes.
    ///
    /// Returns the number of bytes written to `buf`. `0` is returned only when
    /// `buf` is empty or the content is exhausted. When the content is over,
    /// reader stays on the first node that is not content.
    #[inline]
    pub fn read_content_as_base64<R>(&mut self, reader: &mut R, buf: &mut [u8]) -> Result<usize>
    where
        R: XmlRead + ?Sized,
    {
        self.read_content(reader, buf, BinaryEncoding::Base64, "read_content_as_base64")
    }

    /// Decodes BinHex content of the current node and following text nodes.
    ///
    /// See [`read_content_as_base64`](Self::read_content_as_base64).
    #[inline]
    pub fn read_content_as_bin_hex<R>(&mut self, reader: &mut R, buf: &mut [u8]) -> Result<usize>
    where
        R: XmlRead + ?Sized,
    {
        self.read_content(reader, buf, BinaryEncoding::BinHex, "read_content_as_bin_hex")
    }

    /// Decodes Base64 content of the current element.
    ///
    /// Reader must be positioned on a start element. Returns the number of
    /// bytes written to `buf`. When the content is over, `0` is returned and
    /// reader is moved past the end element.
    #[inline]
    pub fn read_element_content_as_base64<R>(
        &mut self,
        reader: &mut R,
        buf: &mut [u8],
    ) -> Result<usize>
    where
        R: XmlRead + ?Sized,
    {
        self.read_element_content(
            reader,
            buf,
            BinaryEncoding::Base64,
            "read_element_content_as_base64",
        )
    }

    /// Decodes BinHex content of the current element.
    ///
    /// See [`read_element_content_as_base64`](Self::read_element_content_as_base64).
    #[inline]
    pub fn read_element_content_as_bin_hex<R>(
        &mut self,
        reader: &mut R,
        buf: &mut [u8],
    ) -> Result<usize>
    where
        R: XmlRead + ?Sized,
    {
        self.read_element_content(
            reader,
            buf,
            BinaryEncoding::BinHex,
            "read_element_content_as_bin_hex",
        )
    }

    /// Skips the rest of the content of an unfinished binary read, so the
    /// reader ends where a complete read would leave it.
    pub fn finish<R>(&mut self, reader: &mut R) -> Result<()>
    where
        R: XmlRead + ?Sized,
    {
        let result = self.skip_rest(reader);
        self.reset();
        result
    }

    fn skip_rest<R>(&mut self, reader: &mut R) -> Result<()>
    where
        R: XmlRead + ?Sized,
    {
        if self.state == ReadBinaryState::None {
            return Ok(());
        }
        trace!("finishing binary read on {:?}", reader.node_kind());
        while move_to_next_content_node(reader, true)? {}
        if self.state == ReadBinaryState::InReadElementContent {
            expect_end_element(reader)?;
            reader.read()?;
        }
        Ok(())
    }

    fn read_content<R>(
        &mut self,
        reader: &mut R,
        buf: &mut [u8],
        encoding: BinaryEncoding,
        method: &'static str,
    ) -> Result<usize>
    where
        R: XmlRead + ?Sized,
    {
        match self.state {
            ReadBinaryState::None => {
                let kind = reader.node_kind();
                if !kind.can_read_content() {
                    return Err(MisuseError::ContentNotSupported { method, kind }.into());
                }
                if buf.is_empty() {
                    return Ok(0);
                }
                if !move_to_next_content_node(reader, false)? {
                    return Ok(0);
                }
                self.start(ReadBinaryState::InReadContent, encoding);
            }
            ReadBinaryState::InReadContent if self.decoder.encoding() == encoding => {
                if buf.is_empty() {
                    return Ok(0);
                }
            }
            _ => return Err(MisuseError::MixingBinaryContentMethods.into()),
        }
        self.read_content_as_binary(reader, buf)
    }

    fn read_element_content<R>(
        &mut self,
        reader: &mut R,
        buf: &mut [u8],
        encoding: BinaryEncoding,
        method: &'static str,
    ) -> Result<usize>
    where
        R: XmlRead + ?Sized,
    {
        match self.state {
            ReadBinaryState::None => {
                let kind = reader.node_kind();
                if kind != NodeKind::Element {
                    return Err(MisuseError::NotOnElement { method, kind }.into());
                }
                if buf.is_empty() {
                    return Ok(0);
                }
                let is_empty = reader.is_empty_element();
                reader.read()?;
                if is_empty {
                    return Ok(0);
                }
                if !move_to_next_content_node(reader, false)? {
                    expect_end_element(reader)?;
                    reader.read()?;
                    return Ok(0);
                }
                self.start(ReadBinaryState::InReadElementContent, encoding);
            }
            ReadBinaryState::InReadElementContent if self.decoder.encoding() == encoding => {
                if buf.is_empty() {
                    return Ok(0);
                }
            }
            _ => return Err(MisuseError::MixingBinaryContentMethods.into()),
        }

        let decoded = self.read_content_as_binary(reader, buf)?;
        if decoded > 0 {
            return Ok(decoded);
        }
        self.reset();
        expect_end_element(reader)?;
        reader.read()?;
        Ok(0)
    }

    fn start(&mut self, state: ReadBinaryState, encoding: BinaryEncoding) {
        trace!("starting {:?} read in state {:?}", encoding, state);
        self.reset();
        self.state = state;
        self.decoder = AnyDecoder::new(encoding);
    }

    /// Decodes content until `buf` is full or content nodes are exhausted.
    fn read_content_as_binary<R>(&mut self, reader: &mut R, buf: &mut [u8]) -> Result<usize>
    where
        R: XmlRead + ?Sized,
    {
        if self.is_end {
            self.reset();
            return Ok(0);
        }
        let mut produced = 0;
        loop {
            if reader.can_read_value_chunk() {
                loop {
                    if self.offset < self.chunk.len() {
                        let decoded = self
                            .decoder
                            .decode(&self.chunk[self.offset..], &mut buf[produced..])
                            .map_err(|e| Error::ill_formed_at(e, reader.line_info()))?;
                        self.offset += decoded.consumed;
                        produced += decoded.produced;
                    }
                    if produced == buf.len() {
                        return Ok(produced);
                    }
                    self.chunk.clear();
                    self.offset = 0;
                    if reader.read_value_chunk(&mut self.chunk, CHUNK_SIZE)? == 0 {
                        break;
                    }
                }
            } else {
                let value = reader.value();
                let decoded = self
                    .decoder
                    .decode(&value[self.offset..], &mut buf[produced..])
                    .map_err(|e| Error::ill_formed_at(e, reader.line_info()))?;
                self.offset += decoded.consumed;
                produced += decoded.produced;
                if produced == buf.len() {
                    return Ok(produced);
                }
            }

            self.offset = 0;
            if !move_to_next_content_node(reader, true)? {
                trace!("binary content ended on {:?}", reader.node_kind());
                self.is_end = true;
                self.decoder
                    .finish()
                    .map_err(|e| Error::ill_formed_at(e, reader.line_info()))?;
                return Ok(produced);
            }
        }
    }
}

/// Moves the reader to the next node whose value is a part of the content.
///
/// Comments, processing instructions and ends of entities are skipped,
/// resolvable entity references are expanded. Returns `false` when the reader
/// stops on a node that ends the content. If `move_if_on_content` is `true`,
/// the current content node is considered consumed.
fn move_to_next_content_node<R>(reader: &mut R, mut move_if_on_content: bool) -> Result<bool>
where
    R: XmlRead + ?Sized,
{
    loop {
        match reader.node_kind() {
            // Attribute is the single content node in its run
            NodeKind::Attribute => return Ok(!move_if_on_content),
            kind if kind.is_textual() => {
                if !move_if_on_content {
                    return Ok(true);
                }
            }
            NodeKind::ProcessingInstruction | NodeKind::Comment | NodeKind::EndEntity => {}
            NodeKind::EntityReference if reader.can_resolve_entity() => reader.resolve_entity()?,
            _ => return Ok(false),
        }
        move_if_on_content = false;
        if !reader.read()? {
            return Ok(false);
        }
    }
}

fn expect_end_element<R>(reader: &R) -> Result<()>
where
    R: XmlRead + ?Sized,
{
    match reader.node_kind() {
        NodeKind::EndElement => Ok(()),
        kind => Err(Error::ill_formed_at(
            IllFormedError::UnexpectedNode(kind),
            reader.line_info(),
        )),
    }
}
