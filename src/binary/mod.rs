//! Incremental decoding of binary data embedded in XML content.
//!
//! An XML document carries binary data as [Base64] or BinHex (hexadecimal)
//! text. The text may be split between several text and CDATA nodes, and the
//! caller may ask for the bytes in chunks of any size. Decoders in this module
//! keep the state of a partially decoded group between calls; the
//! [`BinaryReadHelper`] drives a reader from one content node to the next.
//!
//! [Base64]: https://www.rfc-editor.org/rfc/rfc4648#section-4

use crate::errors::IllFormedError;

mod base64;
mod bin_hex;
mod helper;

pub use base64::Base64Decoder;
pub use bin_hex::BinHexDecoder;
pub use helper::{BinaryReadHelper, ReadBinaryState};

/// Text encoding of binary data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryEncoding {
    /// Base64 alphabet with `=` padding
    Base64,
    /// Pairs of hexadecimal digits
    BinHex,
}

/// Progress of one [`IncrementalDecoder::decode`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Number of bytes of the input text that were consumed
    pub consumed: usize,
    /// Number of bytes written to the output window
    pub produced: usize,
}

/// A decoder that converts text into bytes in steps, keeping bits of an
/// incomplete group between calls.
///
/// The decoder owns no output buffer: each call decodes into the window given
/// by the caller and stops as soon as the window is full, leaving the rest of
/// the input unconsumed.
pub trait IncrementalDecoder {
    /// Encoding handled by the decoder.
    fn encoding(&self) -> BinaryEncoding;

    /// Decodes characters from `input` into `output` until either the input is
    /// exhausted or the output is full.
    ///
    /// An empty `output` consumes nothing and returns [`Decoded::default()`].
    fn decode(&mut self, input: &str, output: &mut [u8]) -> Result<Decoded, IllFormedError>;

    /// Checks that the content ended on a group boundary. Called once the
    /// content run is over.
    fn finish(&mut self) -> Result<(), IllFormedError>;

    /// Discards the bits of a partially decoded group.
    fn reset(&mut self);
}

/// One of the built-in decoders.
#[derive(Clone, Debug)]
pub(crate) enum AnyDecoder {
    Base64(Base64Decoder),
    BinHex(BinHexDecoder),
}

impl AnyDecoder {
    pub fn new(encoding: BinaryEncoding) -> Self {
        match encoding {
            BinaryEncoding::Base64 => Self::Base64(Base64Decoder::default()),
            BinaryEncoding::BinHex => Self::BinHex(BinHexDecoder::default()),
        }
    }
}

impl Default for AnyDecoder {
    fn default() -> Self {
        Self::new(BinaryEncoding::Base64)
    }
}

impl IncrementalDecoder for AnyDecoder {
    fn encoding(&self) -> BinaryEncoding {
        match self {
            Self::Base64(d) => d.encoding(),
            Self::BinHex(d) => d.encoding(),
        }
    }

    fn decode(&mut self, input: &str, output: &mut [u8]) -> Result<Decoded, IllFormedError> {
        match self {
            Self::Base64(d) => d.decode(input, output),
            Self::BinHex(d) => d.decode(input, output),
        }
    }

    fn finish(&mut self) -> Result<(), IllFormedError> {
        match self {
            Self::Base64(d) => d.finish(),
            Self::BinHex(d) => d.finish(),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Base64(d) => d.reset(),
            Self::BinHex(d) => d.reset(),
        }
    }
}

/// Returns the character that starts at byte `offset` of `input`, used to
/// report invalid characters.
#[inline]
fn char_at(input: &str, offset: usize) -> char {
    input[offset..].chars().next().unwrap_or('\u{FFFD}')
}

/// Implements [`XmlRead`] binary content methods through a
/// [`BinaryReadHelper`] stored in the specified field. The helper drives the
/// reader itself, so nodes hidden by the reader are hidden from the decoded
/// content too.
///
/// [`XmlRead`]: crate::reader::XmlRead
macro_rules! impl_binary_content {
    ($binary:ident) => {
        fn can_read_binary_content(&self) -> bool {
            true
        }

        fn read_content_as_base64(&mut self, buf: &mut [u8]) -> $crate::errors::Result<usize> {
            let mut helper = ::std::mem::take(&mut self.$binary);
            let result = helper.read_content_as_base64(self, buf);
            self.$binary = helper;
            result
        }

        fn read_content_as_bin_hex(&mut self, buf: &mut [u8]) -> $crate::errors::Result<usize> {
            let mut helper = ::std::mem::take(&mut self.$binary);
            let result = helper.read_content_as_bin_hex(self, buf);
            self.$binary = helper;
            result
        }

        fn read_element_content_as_base64(
            &mut self,
            buf: &mut [u8],
        ) -> $crate::errors::Result<usize> {
            let mut helper = ::std::mem::take(&mut self.$binary);
            let result = helper.read_element_content_as_base64(self, buf);
            self.$binary = helper;
            result
        }

        fn read_element_content_as_bin_hex(
            &mut self,
            buf: &mut [u8],
        ) -> $crate::errors::Result<usize> {
            let mut helper = ::std::mem::take(&mut self.$binary);
            let result = helper.read_element_content_as_bin_hex(self, buf);
            self.$binary = helper;
            result
        }
    };
}

/// Drains a binary read abandoned in the middle before the reader moves on.
macro_rules! finish_binary_read {
    ($self:ident . $binary:ident) => {
        if $self.$binary.is_active() {
            ::std::mem::take(&mut $self.$binary).finish($self)?;
        }
    };
}

pub(crate) use finish_binary_read;
pub(crate) use impl_binary_content;
