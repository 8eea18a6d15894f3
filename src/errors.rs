//! Error management module

use std::fmt;
use std::io::Error as IoError;
use std::str::Utf8Error;
use std::sync::Arc;

use crate::node::{LineInfo, NodeKind};

/// A violation of the XML well-formedness rules found in the data that was
/// read or in the data that was given to a writer.
///
/// These errors describe a problem with the document, not with the way the
/// API was used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IllFormedError {
    /// The character is not allowed in XML. The second field is the byte
    /// offset of the character in the checked string.
    InvalidChar(char, usize),
    /// The name of an element, attribute, entity or processing instruction
    /// target contains characters that are not allowed in names.
    InvalidName(String),
    /// The name of an element, attribute or processing instruction target is empty.
    EmptyName,
    /// The document contains more than one root element.
    MultipleRoots,
    /// The document does not contain a root element.
    MissingRoot,
    /// Non-whitespace text was found outside of the root element.
    TextOutsideRoot,
    /// Reader was positioned on an unexpected node. The field is the kind of
    /// that node.
    UnexpectedNode(NodeKind),
    /// The input ended while some elements are still open. The field is the
    /// name of the innermost open element.
    UnclosedElement(String),
    /// The prefix of a name is not bound to a namespace.
    UndeclaredPrefix(String),
    /// An entity reference (`&name;`) cannot be resolved.
    UnknownEntity(String),
    /// A `<!DOCTYPE>` declaration was found, but DTD processing is prohibited.
    DtdProhibited,
    /// A character that is not part of the Base64 alphabet was found in the
    /// content decoded as Base64.
    InvalidBase64(char),
    /// A character that is not a hexadecimal digit was found in the content
    /// decoded as BinHex.
    InvalidBinHex(char),
    /// BinHex content ended with a dangling hexadecimal digit.
    OddBinHexCount,
    /// The character is not allowed in a public identifier.
    InvalidPublicIdChar(char, usize),
    /// Text given as whitespace contains a non-whitespace character.
    NotWhitespace(char, usize),
}

impl fmt::Display for IllFormedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidChar(ch, offset) => write!(
                f,
                "character `{}` (0x{:x}) at offset {} is not allowed in XML",
                ch.escape_debug(),
                *ch as u32,
                offset
            ),
            Self::InvalidName(name) => write!(f, "invalid name `{}`", name),
            Self::EmptyName => f.write_str("empty name"),
            Self::MultipleRoots => f.write_str("document contains multiple root elements"),
            Self::MissingRoot => f.write_str("document does not contain a root element"),
            Self::TextOutsideRoot => f.write_str("text is not allowed outside of the root element"),
            Self::UnexpectedNode(kind) => write!(f, "unexpected node of type {:?}", kind),
            Self::UnclosedElement(name) => write!(f, "element `{}` is not closed", name),
            Self::UndeclaredPrefix(prefix) => write!(f, "`{}` is an undeclared prefix", prefix),
            Self::UnknownEntity(name) => write!(f, "reference to undeclared entity `{}`", name),
            Self::DtdProhibited => f.write_str("DTD is prohibited in this document"),
            Self::InvalidBase64(ch) => write!(
                f,
                "character `{}` (0x{:x}) is not allowed in Base64 content",
                ch.escape_debug(),
                *ch as u32
            ),
            Self::InvalidBinHex(ch) => write!(
                f,
                "character `{}` (0x{:x}) is not allowed in BinHex content",
                ch.escape_debug(),
                *ch as u32
            ),
            Self::OddBinHexCount => {
                f.write_str("BinHex content contains an odd number of hexadecimal digits")
            }
            Self::InvalidPublicIdChar(ch, offset) => write!(
                f,
                "character `{}` at offset {} is not allowed in a public identifier",
                ch.escape_debug(),
                offset
            ),
            Self::NotWhitespace(ch, offset) => write!(
                f,
                "character `{}` at offset {} is not a whitespace character",
                ch.escape_debug(),
                offset
            ),
        }
    }
}

impl std::error::Error for IllFormedError {}

/// A wrong use of a reader or a writer. These errors point to a bug in the
/// calling code rather than to a problem with the data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MisuseError {
    /// Base64 and BinHex reads, or content and element content reads, were
    /// interleaved within one content run.
    MixingBinaryContentMethods,
    /// Content of the current node cannot be read by the method.
    ContentNotSupported {
        /// The method that was called
        method: &'static str,
        /// The kind of the node on which the method was called
        kind: NodeKind,
    },
    /// Element content method was called when reader is not positioned on
    /// a start element.
    NotOnElement {
        /// The method that was called
        method: &'static str,
        /// The kind of the node on which the method was called
        kind: NodeKind,
    },
    /// A new write was requested while the previous asynchronous write is
    /// still in progress (or was abandoned before completion).
    AsyncCallInProgress,
    /// The writer was already closed.
    WriterClosed,
    /// An end element was written without a matching start element.
    UnbalancedEndElement,
    /// The operation is not valid in the current writer state.
    InvalidWriteState(&'static str),
    /// The reader does not support the operation.
    NotSupported(&'static str),
}

impl fmt::Display for MisuseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MixingBinaryContentMethods => f.write_str(
                "Base64 and BinHex reads, or content and element content reads, cannot be mixed",
            ),
            Self::ContentNotSupported { method, kind } => write!(
                f,
                "the `{}` method is not supported on node type {:?}",
                method, kind
            ),
            Self::NotOnElement { method, kind } => write!(
                f,
                "the `{}` method requires an element node, but reader is on node type {:?}",
                method, kind
            ),
            Self::AsyncCallInProgress => {
                f.write_str("an asynchronous operation is already in progress")
            }
            Self::WriterClosed => f.write_str("writer is closed"),
            Self::UnbalancedEndElement => f.write_str("there is no element to close"),
            Self::InvalidWriteState(op) => write!(f, "`{}` is not allowed in this state", op),
            Self::NotSupported(op) => write!(f, "`{}` is not supported by this reader", op),
        }
    }
}

impl std::error::Error for MisuseError {}

/// The error type used by this crate.
#[derive(Clone, Debug)]
pub enum Error {
    /// IO error.
    ///
    /// `Arc<IoError>` instead of `IoError` since `IoError` is not `Clone`.
    Io(Arc<IoError>),
    /// The tokenizer failed to recognize the markup.
    Syntax(quick_xml::Error),
    /// A piece of markup is not valid UTF-8.
    NonDecodable(Utf8Error),
    /// The document is not well-formed.
    IllFormed {
        /// What exactly is wrong
        error: IllFormedError,
        /// Where the problem was found, if known
        position: Option<LineInfo>,
    },
    /// The reader or writer was used in a wrong way.
    Misuse(MisuseError),
}

impl Error {
    /// Creates a well-formedness error without position information.
    #[inline]
    pub(crate) fn ill_formed(error: IllFormedError) -> Self {
        Self::IllFormed {
            error,
            position: None,
        }
    }

    /// Creates a well-formedness error found at the specified position.
    #[inline]
    pub(crate) fn ill_formed_at(error: IllFormedError, position: Option<LineInfo>) -> Self {
        Self::IllFormed { error, position }
    }

    /// Returns the well-formedness violation if this error is one.
    pub fn as_ill_formed(&self) -> Option<&IllFormedError> {
        match self {
            Self::IllFormed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns the API misuse if this error is one.
    pub fn as_misuse(&self) -> Option<&MisuseError> {
        match self {
            Self::Misuse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IoError> for Error {
    /// Creates a new `Error::Io` from the given error
    #[inline]
    fn from(error: IoError) -> Error {
        Self::Io(Arc::new(error))
    }
}

impl From<quick_xml::Error> for Error {
    #[inline]
    fn from(error: quick_xml::Error) -> Error {
        Self::Syntax(error)
    }
}

impl From<Utf8Error> for Error {
    #[inline]
    fn from(error: Utf8Error) -> Error {
        Self::NonDecodable(error)
    }
}

impl From<IllFormedError> for Error {
    #[inline]
    fn from(error: IllFormedError) -> Self {
        Self::ill_formed(error)
    }
}

impl From<MisuseError> for Error {
    #[inline]
    fn from(error: MisuseError) -> Self {
        Self::Misuse(error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Syntax(e) => write!(f, "syntax error: {}", e),
            Self::NonDecodable(e) => write!(f, "malformed UTF-8 input: {}", e),
            Self::IllFormed {
                error,
                position: Some(pos),
            } => write!(f, "ill-formed document: {} at {}", error, pos),
            Self::IllFormed {
                error,
                position: None,
            } => write!(f, "ill-formed document: {}", error),
            Self::Misuse(e) => write!(f, "invalid operation: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Syntax(e) => Some(e),
            Self::NonDecodable(e) => Some(e),
            Self::IllFormed { error, .. } => Some(error),
            Self::Misuse(e) => Some(e),
        }
    }
}

/// A specialized `Result` type where the error is hard-wired to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
