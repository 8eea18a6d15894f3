use log::debug;

use super::{BufferedOutput, WriteState, WriterSettings, XmlWrite};
use crate::errors::{IllFormedError, Result};
use crate::name::QualifiedName;
use crate::node::qualified;
use crate::ConformanceLevel;

/// Identifiers of the `DOCTYPE` which is written before the root element.
#[derive(Debug)]
struct DocType {
    public_id: Option<String>,
    system_id: Option<String>,
}

/// Applies the output settings of a query result to the written document.
///
/// - Text of elements listed in [`WriterSettings::cdata_section_elements`] is
///   written as CDATA sections. Attribute values are never affected.
/// - If [`WriterSettings::doctype_system`] or [`WriterSettings::doctype_public`]
///   is set, a `DOCTYPE` with these identifiers and the name of the root
///   element is written just before the root element, and `DOCTYPE`s written
///   by the caller are dropped.
/// - For [`ConformanceLevel::Document`], or when a `DOCTYPE` is configured,
///   a second root element and a document without root element are errors.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_pipeline::writer::{QueryOutputWriter, WriterSettings, XmlRawWriter, XmlWrite};
///
/// let settings = WriterSettings::default()
///     .cdata_section_element("code")
///     .doctype(None, Some("doc.dtd"));
/// let raw = XmlRawWriter::with_settings(Vec::new(), &settings);
/// let mut writer = QueryOutputWriter::new(raw, &settings);
///
/// writer.write_start_element("", "doc", "").unwrap();
/// writer.write_element_string("", "code", "", "a && b").unwrap();
/// writer.write_element_string("", "p", "", "a && b").unwrap();
/// writer.close().unwrap();
///
/// assert_eq!(
///     String::from_utf8(writer.into_inner().into_inner()).unwrap(),
///     concat!(
///         r#"<!DOCTYPE doc SYSTEM "doc.dtd">"#,
///         "<doc><code><![CDATA[a && b]]></code><p>a &amp;&amp; b</p></doc>",
///     )
/// );
/// ```
pub struct QueryOutputWriter<W> {
    inner: W,
    cdata_elements: Vec<QualifiedName>,
    /// For each open element: whether its text is written as CDATA
    cdata_stack: Vec<bool>,
    /// `DOCTYPE` which is not yet written
    doctype: Option<DocType>,
    ignore_doc_type: bool,
    check_well_formed: bool,
    root_written: bool,
    in_attribute: bool,
}

impl<W: XmlWrite> QueryOutputWriter<W> {
    /// Wraps `inner`.
    pub fn new(inner: W, settings: &WriterSettings) -> Self {
        let doctype = if settings.doctype_system.is_some() || settings.doctype_public.is_some() {
            Some(DocType {
                public_id: settings.doctype_public.clone(),
                system_id: settings.doctype_system.clone(),
            })
        } else {
            None
        };
        Self {
            inner,
            cdata_elements: settings.cdata_section_elements.clone(),
            cdata_stack: Vec::new(),
            ignore_doc_type: doctype.is_some(),
            check_well_formed: doctype.is_some()
                || settings.conformance_level == ConformanceLevel::Document,
            doctype,
            root_written: false,
            in_attribute: false,
        }
    }

    /// Returns a reference to the wrapped writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consumes the decorator, returning the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Returns `true` if text written now goes into a CDATA section.
    fn in_cdata_element(&self) -> bool {
        !self.in_attribute && self.cdata_stack.last().copied().unwrap_or(false)
    }

    fn check_root(&self) -> Result<()> {
        if self.check_well_formed && !self.root_written {
            return Err(IllFormedError::MissingRoot.into());
        }
        Ok(())
    }
}

impl<W: XmlWrite> XmlWrite for QueryOutputWriter<W> {
    fn settings(&self) -> Option<&WriterSettings> {
        self.inner.settings()
    }

    fn write_state(&self) -> WriteState {
        self.inner.write_state()
    }

    fn write_start_document(&mut self, standalone: Option<bool>) -> Result<()> {
        self.inner.write_start_document(standalone)
    }

    fn write_end_document(&mut self) -> Result<()> {
        self.check_root()?;
        self.in_attribute = false;
        self.cdata_stack.clear();
        self.inner.write_end_document()
    }

    fn write_doc_type(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        subset: Option<&str>,
    ) -> Result<()> {
        if self.ignore_doc_type {
            debug!("DOCTYPE `{}` replaced by the configured one", name);
            return Ok(());
        }
        self.inner.write_doc_type(name, public_id, system_id, subset)
    }

    fn write_start_element(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        let top_level = self.cdata_stack.is_empty();
        if top_level && self.check_well_formed && self.root_written {
            return Err(IllFormedError::MultipleRoots.into());
        }
        if top_level {
            if let Some(doctype) = self.doctype.take() {
                debug!("writing configured DOCTYPE before the root element");
                self.inner.write_doc_type(
                    &qualified(prefix, local_name),
                    doctype.public_id.as_deref(),
                    doctype.system_id.as_deref(),
                    None,
                )?;
            }
        }
        self.inner.write_start_element(prefix, local_name, namespace)?;
        let is_cdata = self
            .cdata_elements
            .iter()
            .any(|name| name.matches(local_name, namespace));
        self.cdata_stack.push(is_cdata);
        self.root_written = true;
        self.in_attribute = false;
        Ok(())
    }

    fn write_end_element(&mut self) -> Result<()> {
        self.cdata_stack.pop();
        self.in_attribute = false;
        self.inner.write_end_element()
    }

    fn write_full_end_element(&mut self) -> Result<()> {
        self.cdata_stack.pop();
        self.in_attribute = false;
        self.inner.write_full_end_element()
    }

    fn write_start_attribute(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        self.inner
            .write_start_attribute(prefix, local_name, namespace)?;
        self.in_attribute = true;
        Ok(())
    }

    fn write_end_attribute(&mut self) -> Result<()> {
        self.in_attribute = false;
        self.inner.write_end_attribute()
    }

    fn write_cdata(&mut self, text: &str) -> Result<()> {
        self.inner.write_cdata(text)
    }

    fn write_comment(&mut self, text: &str) -> Result<()> {
        self.inner.write_comment(text)
    }

    fn write_processing_instruction(&mut self, name: &str, text: &str) -> Result<()> {
        self.inner.write_processing_instruction(name, text)
    }

    fn write_entity_ref(&mut self, name: &str) -> Result<()> {
        self.inner.write_entity_ref(name)
    }

    fn write_char_entity(&mut self, ch: char) -> Result<()> {
        if self.in_cdata_element() {
            self.inner.write_cdata(ch.encode_utf8(&mut [0; 4]))
        } else {
            self.inner.write_char_entity(ch)
        }
    }

    fn write_whitespace(&mut self, whitespace: &str) -> Result<()> {
        if self.in_cdata_element() {
            self.inner.write_cdata(whitespace)
        } else {
            self.inner.write_whitespace(whitespace)
        }
    }

    fn write_string(&mut self, text: &str) -> Result<()> {
        if self.in_cdata_element() {
            self.inner.write_cdata(text)
        } else {
            self.inner.write_string(text)
        }
    }

    fn write_raw(&mut self, data: &str) -> Result<()> {
        self.inner.write_raw(data)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    fn close(&mut self) -> Result<()> {
        if self.inner.write_state() == WriteState::Closed {
            return Ok(());
        }
        let root = self.check_root();
        self.cdata_stack.clear();
        self.in_attribute = false;
        self.inner.close()?;
        root
    }
}

impl<W: BufferedOutput> BufferedOutput for QueryOutputWriter<W> {
    fn take_output(&mut self) -> Result<Vec<u8>> {
        self.inner.take_output()
    }
}
