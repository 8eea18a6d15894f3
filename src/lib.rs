//! Streaming XML reader and writer pipelines.
//!
//! # Description
//!
//! xml-pipeline is built around two object safe traits:
//!
//! - [`XmlRead`]: a pull-reader positioned on one node of a document at a
//!   time, similar to a database cursor. [`TextReader`] reads nodes from a
//!   string using the [quick-xml] tokenizer; other readers wrap any reader
//!   and check characters, restrict reading to a subtree or record and
//!   replay nodes.
//! - [`XmlWrite`]: a writer of XML or HTML. Terminal writers serialize calls
//!   to an [`std::io::Write`] sink; decorators check names and characters,
//!   normalize new lines, turn text of configured elements into CDATA
//!   sections and choose the output method by the first element.
//!
//! Both kinds of chains are usually created from settings:
//! [`ReaderSettings::create_reader`] and [`WriterSettings::create_writer`].
//!
//! Any reader can decode Base64 or BinHex content incrementally into
//! caller-provided buffers of any size, see
//! [`XmlRead::read_element_content_as_base64`].
//!
//! xml-pipeline contains optional support of asynchronous writing using
//! [tokio]. To get it enable the [`async-tokio`](#async-tokio) feature.
//!
//! # Example
//!
//! ```
//! # use pretty_assertions::assert_eq;
//! use xml_pipeline::reader::{ReaderSettings, XmlRead};
//! use xml_pipeline::writer::{WriterSettings, XmlWrite};
//!
//! let mut reader = ReaderSettings::default().create_reader("<data>SGVsbG8=</data>");
//! reader.read().unwrap();
//!
//! let mut bytes = [0; 16];
//! let len = reader.read_element_content_as_base64(&mut bytes).unwrap();
//! assert_eq!(&bytes[..len], b"Hello");
//!
//! let mut output = Vec::new();
//! let settings = WriterSettings {
//!     omit_xml_declaration: true,
//!     ..WriterSettings::default()
//! };
//! let mut writer = settings.create_writer(&mut output);
//! writer.write_element_string("", "data", "", "Hello").unwrap();
//! writer.close().unwrap();
//! drop(writer);
//! assert_eq!(output, b"<data>Hello</data>");
//! ```
//!
//! # Features
//!
//! `xml-pipeline` supports the following features:
//!
//! [quick-xml]: https://docs.rs/quick-xml
//! [tokio]: https://tokio.rs/
#![cfg_attr(
    feature = "document-features",
    cfg_attr(doc, doc = ::document_features::document_features!(
        feature_label = "<a id=\"{feature}\" href=\"#{feature}\"><strong><code>{feature}</code></strong></a>"
    ))
)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]
// docs.rs defines `docsrs` when building documentation
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod binary;
pub mod errors;
pub mod name;
mod node;
pub mod reader;
pub mod validation;
pub mod writer;

#[cfg(feature = "serde-types")]
use serde::{Deserialize, Serialize};

// reexports
pub use crate::errors::{Error, Result};
pub use crate::name::QualifiedName;
pub use crate::node::{Attribute, LineInfo, Node, NodeKind, ReadState};
pub use crate::reader::{ReaderSettings, TextReader, XmlRead};
pub use crate::writer::{WriteState, WriterSettings, XmlWrite};

/// Strictness of the well-formedness checks applied to a whole stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-types", derive(Serialize, Deserialize))]
pub enum ConformanceLevel {
    /// A [well-formed external parsed entity]: any number of top-level
    /// elements, text and no `DOCTYPE` requirements.
    ///
    /// [well-formed external parsed entity]: https://www.w3.org/TR/xml/#wf-entities
    Fragment,
    /// A [well-formed document]: exactly one root element and no text outside
    /// of it.
    ///
    /// [well-formed document]: https://www.w3.org/TR/xml/#sec-well-formed
    #[default]
    Document,
}
