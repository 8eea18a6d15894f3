//! Writers of XML and HTML.
//!
//! All writers implement the [`XmlWrite`] trait. Terminal writers serialize
//! calls into an [`io::Write`] sink:
//!
//! - [`XmlRawWriter`] for the XML output method;
//! - [`HtmlRawWriter`] for the HTML output method;
//! - [`AutoDetectWriter`] chooses one of them by the name of the first element.
//!
//! Decorators wrap any writer and forward every call, changing only the
//! calls they are interested in:
//!
//! - [`CharCheckingWriter`] checks names and characters and normalizes new lines;
//! - [`QueryOutputWriter`] writes text of configured elements as CDATA
//!   sections, emits the configured `DOCTYPE` and checks the number of root
//!   elements;
//! - `AsyncCheckWriter` (feature `async-tokio`) drains the chain into an
//!   asynchronous sink and rejects overlapping operations.
//!
//! A typical chain is created by [`WriterSettings::create_writer`].

use std::io;

#[cfg(feature = "serde-types")]
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::name::QualifiedName;
use crate::ConformanceLevel;

#[cfg(feature = "async-tokio")]
mod async_check;
mod auto_detect;
mod checking;
mod event;
mod html;
mod query;
mod raw;

#[cfg(feature = "async-tokio")]
pub use async_check::AsyncCheckWriter;
pub use auto_detect::{AutoDetectWriter, OutputWriter};
pub use checking::CharCheckingWriter;
pub use event::BufferedEvent;
pub use html::HtmlRawWriter;
pub use query::QueryOutputWriter;
pub use raw::XmlRawWriter;

/// State of a writer, which determines what can be written next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteState {
    /// Nothing was written yet
    Start,
    /// XML declaration, `DOCTYPE`, comments or processing instructions were
    /// written before the root element
    Prolog,
    /// A start tag is open: attributes can be written
    Element,
    /// An attribute value is being written
    Attribute,
    /// Element content or nodes after the root element are being written
    Content,
    /// The writer is closed
    Closed,
    /// A previous operation failed and the output is unusable
    Error,
}

/// Common interface of all writers.
///
/// Methods are called in document order. Attributes are written between
/// [`write_start_element`](Self::write_start_element) and the first content
/// call: [`write_start_attribute`](Self::write_start_attribute), any number of
/// [`write_string`](Self::write_string), [`write_entity_ref`](Self::write_entity_ref)
/// or [`write_char_entity`](Self::write_char_entity) calls, then
/// [`write_end_attribute`](Self::write_end_attribute).
///
/// The trait is object safe, so decorators can be stacked over
/// `Box<dyn XmlWrite>` chains.
pub trait XmlWrite {
    /// Returns the settings the writer was created with, if the chain has them.
    fn settings(&self) -> Option<&WriterSettings>;
    /// Returns the state of the writer.
    fn write_state(&self) -> WriteState;

    /// Writes the XML declaration. `standalone` adds the `standalone` pseudo-attribute.
    fn write_start_document(&mut self, standalone: Option<bool>) -> Result<()>;
    /// Closes all open elements.
    fn write_end_document(&mut self) -> Result<()>;
    /// Writes the `<!DOCTYPE>` declaration.
    fn write_doc_type(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        subset: Option<&str>,
    ) -> Result<()>;

    /// Opens an element. If the prefix is not yet bound to `namespace`, the
    /// namespace declaration is added to the element.
    fn write_start_element(&mut self, prefix: &str, local_name: &str, namespace: &str)
        -> Result<()>;
    /// Closes the innermost open element, using the short `<e />` form if it
    /// has no content.
    fn write_end_element(&mut self) -> Result<()>;
    /// Closes the innermost open element, always writing the end tag.
    fn write_full_end_element(&mut self) -> Result<()>;
    /// Opens an attribute of the current element.
    fn write_start_attribute(&mut self, prefix: &str, local_name: &str, namespace: &str)
        -> Result<()>;
    /// Closes the current attribute.
    fn write_end_attribute(&mut self) -> Result<()>;

    /// Writes a `<![CDATA[...]]>` section.
    fn write_cdata(&mut self, text: &str) -> Result<()>;
    /// Writes a `<!--...-->` comment.
    fn write_comment(&mut self, text: &str) -> Result<()>;
    /// Writes a `<?name text?>` processing instruction.
    fn write_processing_instruction(&mut self, name: &str, text: &str) -> Result<()>;
    /// Writes an `&name;` reference.
    fn write_entity_ref(&mut self, name: &str) -> Result<()>;
    /// Writes a character as a `&#x..;` reference.
    fn write_char_entity(&mut self, ch: char) -> Result<()>;
    /// Writes whitespace.
    fn write_whitespace(&mut self, whitespace: &str) -> Result<()>;
    /// Writes text, escaping it as necessary.
    fn write_string(&mut self, text: &str) -> Result<()>;
    /// Writes markup as is.
    fn write_raw(&mut self, data: &str) -> Result<()>;

    /// Writes buffered output to the sink and flushes it.
    fn flush(&mut self) -> Result<()>;
    /// Closes all open elements, flushes the output and closes the writer.
    fn close(&mut self) -> Result<()>;

    /// Writes an attribute with the given value.
    fn write_attribute_string(
        &mut self,
        prefix: &str,
        local_name: &str,
        namespace: &str,
        value: &str,
    ) -> Result<()> {
        self.write_start_attribute(prefix, local_name, namespace)?;
        self.write_string(value)?;
        self.write_end_attribute()
    }

    /// Writes an element with text content. An empty `value` produces an
    /// empty element.
    fn write_element_string(
        &mut self,
        prefix: &str,
        local_name: &str,
        namespace: &str,
        value: &str,
    ) -> Result<()> {
        self.write_start_element(prefix, local_name, namespace)?;
        if !value.is_empty() {
            self.write_string(value)?;
        }
        self.write_end_element()
    }
}

/// Implements [`XmlWrite`] for a pointer type by forwarding all calls to the
/// pointee.
macro_rules! impl_write_forward {
    ($($ty:tt)*) => {
        impl<W: XmlWrite + ?Sized> XmlWrite for $($ty)* {
            fn settings(&self) -> Option<&WriterSettings> {
                (**self).settings()
            }
            fn write_state(&self) -> WriteState {
                (**self).write_state()
            }
            fn write_start_document(&mut self, standalone: Option<bool>) -> Result<()> {
                (**self).write_start_document(standalone)
            }
            fn write_end_document(&mut self) -> Result<()> {
                (**self).write_end_document()
            }
            fn write_doc_type(
                &mut self,
                name: &str,
                public_id: Option<&str>,
                system_id: Option<&str>,
                subset: Option<&str>,
            ) -> Result<()> {
                (**self).write_doc_type(name, public_id, system_id, subset)
            }
            fn write_start_element(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
                (**self).write_start_element(prefix, local_name, namespace)
            }
            fn write_end_element(&mut self) -> Result<()> {
                (**self).write_end_element()
            }
            fn write_full_end_element(&mut self) -> Result<()> {
                (**self).write_full_end_element()
            }
            fn write_start_attribute(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
                (**self).write_start_attribute(prefix, local_name, namespace)
            }
            fn write_end_attribute(&mut self) -> Result<()> {
                (**self).write_end_attribute()
            }
            fn write_cdata(&mut self, text: &str) -> Result<()> {
                (**self).write_cdata(text)
            }
            fn write_comment(&mut self, text: &str) -> Result<()> {
                (**self).write_comment(text)
            }
            fn write_processing_instruction(&mut self, name: &str, text: &str) -> Result<()> {
                (**self).write_processing_instruction(name, text)
            }
            fn write_entity_ref(&mut self, name: &str) -> Result<()> {
                (**self).write_entity_ref(name)
            }
            fn write_char_entity(&mut self, ch: char) -> Result<()> {
                (**self).write_char_entity(ch)
            }
            fn write_whitespace(&mut self, whitespace: &str) -> Result<()> {
                (**self).write_whitespace(whitespace)
            }
            fn write_string(&mut self, text: &str) -> Result<()> {
                (**self).write_string(text)
            }
            fn write_raw(&mut self, data: &str) -> Result<()> {
                (**self).write_raw(data)
            }
            fn flush(&mut self) -> Result<()> {
                (**self).flush()
            }
            fn close(&mut self) -> Result<()> {
                (**self).close()
            }
        }
    };
}

impl_write_forward!(Box<W>);
impl_write_forward!(&mut W);

/// A writer which keeps its output in memory until it is taken.
///
/// Asynchronous writing runs a synchronous chain over such a writer and then
/// sends the taken bytes to the asynchronous sink.
pub trait BufferedOutput {
    /// Returns all output produced since the previous call.
    fn take_output(&mut self) -> Result<Vec<u8>>;
}

impl<W: BufferedOutput + ?Sized> BufferedOutput for Box<W> {
    fn take_output(&mut self) -> Result<Vec<u8>> {
        (**self).take_output()
    }
}

/// A writer chain which stages its output in memory.
pub trait StagedWrite: XmlWrite + BufferedOutput {}

impl<W: XmlWrite + BufferedOutput + ?Sized> StagedWrite for W {}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// How the output is serialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-types", derive(Serialize, Deserialize))]
pub enum OutputMethod {
    /// XML
    #[default]
    Xml,
    /// HTML: void elements without end tags, unescaped scripts and styles
    Html,
    /// HTML if the first element is `<html>` without namespace, XML otherwise
    AutoDetect,
}

/// What to do with new lines in the written text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-types", derive(Serialize, Deserialize))]
pub enum NewLineHandling {
    /// Replace `\r\n`, `\r` and `\n` in text with [`WriterSettings::new_line_chars`]
    #[default]
    Replace,
    /// Write new lines as they are
    None,
}

/// Options used to build a writer chain with [`create_writer`](Self::create_writer).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-types", derive(Serialize, Deserialize))]
pub struct WriterSettings {
    /// Output method.
    ///
    /// Default: [`OutputMethod::Xml`]
    pub output_method: OutputMethod,
    /// Elements whose text content is written as CDATA sections.
    ///
    /// Default: empty
    pub cdata_section_elements: Vec<QualifiedName>,
    /// System identifier of the `DOCTYPE` written before the root element.
    ///
    /// Default: `None`
    pub doctype_system: Option<String>,
    /// Public identifier of the `DOCTYPE` written before the root element.
    ///
    /// Default: `None`
    pub doctype_public: Option<String>,
    /// Check that names and all characters are allowed in XML.
    ///
    /// Default: `true`
    pub check_characters: bool,
    /// What to do with new lines in text.
    ///
    /// Default: [`NewLineHandling::Replace`]
    pub new_line_handling: NewLineHandling,
    /// New line sequence used by [`NewLineHandling::Replace`].
    ///
    /// Default: `"\n"`
    pub new_line_chars: String,
    /// Whether the output must be a complete document.
    ///
    /// Default: [`ConformanceLevel::Document`]
    pub conformance_level: ConformanceLevel,
    /// Do not write the XML declaration in [`XmlWrite::write_start_document`].
    ///
    /// Default: `false`
    pub omit_xml_declaration: bool,
    /// The chain is driven by `AsyncCheckWriter`.
    ///
    /// Default: `false`
    pub is_async: bool,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            output_method: OutputMethod::Xml,
            cdata_section_elements: Vec::new(),
            doctype_system: None,
            doctype_public: None,
            check_characters: true,
            new_line_handling: NewLineHandling::Replace,
            new_line_chars: "\n".to_string(),
            conformance_level: ConformanceLevel::Document,
            omit_xml_declaration: false,
            is_async: false,
        }
    }
}

impl WriterSettings {
    /// Adds an element whose text content is written as CDATA sections.
    pub fn cdata_section_element(mut self, name: impl Into<QualifiedName>) -> Self {
        self.cdata_section_elements.push(name.into());
        self
    }

    /// Sets the output method.
    pub fn output_method(mut self, method: OutputMethod) -> Self {
        self.output_method = method;
        self
    }

    /// Sets identifiers of the `DOCTYPE` written before the root element.
    pub fn doctype(mut self, public_id: Option<&str>, system_id: Option<&str>) -> Self {
        self.doctype_public = public_id.map(str::to_owned);
        self.doctype_system = system_id.map(str::to_owned);
        self
    }

    /// Returns `true` if written text of some elements must become CDATA
    /// sections, a `DOCTYPE` must be written or the number of root elements
    /// must be checked.
    pub fn needs_query_output(&self) -> bool {
        !self.cdata_section_elements.is_empty()
            || self.doctype_system.is_some()
            || self.doctype_public.is_some()
            || self.conformance_level == ConformanceLevel::Document
    }

    /// Returns `true` if the chain needs a [`CharCheckingWriter`].
    pub fn needs_checking(&self) -> bool {
        self.check_characters || self.new_line_handling == NewLineHandling::Replace
    }

    /// Creates a writer chain over `sink`:
    ///
    /// ```text
    /// CharCheckingWriter -> QueryOutputWriter -> XmlRawWriter | HtmlRawWriter | AutoDetectWriter
    /// ```
    ///
    /// Decorators which have nothing to do with these settings are omitted.
    ///
    /// ```
    /// # use pretty_assertions::assert_eq;
    /// use xml_pipeline::writer::{WriterSettings, XmlWrite};
    ///
    /// let settings = WriterSettings::default().cdata_section_element("script");
    /// let mut output = Vec::new();
    /// let mut writer = settings.create_writer(&mut output);
    ///
    /// writer.write_element_string("", "script", "", "a < b").unwrap();
    /// writer.close().unwrap();
    /// drop(writer);
    ///
    /// assert_eq!(
    ///     String::from_utf8(output).unwrap(),
    ///     "<script><![CDATA[a < b]]></script>"
    /// );
    /// ```
    pub fn create_writer<'a, S: io::Write + 'a>(&self, sink: S) -> Box<dyn XmlWrite + 'a> {
        let terminal: Box<dyn XmlWrite + 'a> = match self.output_method {
            OutputMethod::Xml => Box::new(XmlRawWriter::with_settings(sink, self)),
            OutputMethod::Html => Box::new(HtmlRawWriter::with_settings(sink, self)),
            OutputMethod::AutoDetect => Box::new(AutoDetectWriter::with_settings(sink, self)),
        };
        self.decorate(terminal)
    }

    /// Creates a writer chain which keeps its output in memory, to be driven
    /// by an `AsyncCheckWriter`.
    pub fn create_staged_writer(&self) -> Box<dyn StagedWrite> {
        let mut settings = self.clone();
        settings.is_async = true;
        let terminal: Box<dyn StagedWrite> = match settings.output_method {
            OutputMethod::Xml => Box::new(XmlRawWriter::with_settings(Vec::new(), &settings)),
            OutputMethod::Html => Box::new(HtmlRawWriter::with_settings(Vec::new(), &settings)),
            OutputMethod::AutoDetect => {
                Box::new(AutoDetectWriter::with_settings(Vec::new(), &settings))
            }
        };
        let terminal: Box<dyn StagedWrite> = if settings.needs_query_output() {
            Box::new(QueryOutputWriter::new(terminal, &settings))
        } else {
            terminal
        };
        if settings.needs_checking() {
            Box::new(CharCheckingWriter::new(terminal, &settings))
        } else {
            terminal
        }
    }

    /// Creates an asynchronous writer over the `sink`. The chain is the same
    /// as the one created by [`create_writer`](Self::create_writer).
    #[cfg(feature = "async-tokio")]
    pub fn create_async_writer<S>(&self, sink: S) -> AsyncCheckWriter<Box<dyn StagedWrite>, S>
    where
        S: tokio::io::AsyncWrite + Unpin,
    {
        AsyncCheckWriter::new(self.create_staged_writer(), sink)
    }

    fn decorate<'a>(&self, writer: Box<dyn XmlWrite + 'a>) -> Box<dyn XmlWrite + 'a> {
        let writer: Box<dyn XmlWrite + 'a> = if self.needs_query_output() {
            Box::new(QueryOutputWriter::new(writer, self))
        } else {
            writer
        };
        if self.needs_checking() {
            Box::new(CharCheckingWriter::new(writer, self))
        } else {
            writer
        }
    }
}
