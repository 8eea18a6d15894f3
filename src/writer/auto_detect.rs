use std::fmt;
use std::io;

use log::debug;

use super::{
    BufferedEvent, BufferedOutput, HtmlRawWriter, OutputMethod, WriteState, WriterSettings,
    XmlRawWriter, XmlWrite,
};
use crate::errors::{MisuseError, Result};
use crate::validation::is_whitespace_only;

/// A terminal writer of one of the concrete output methods.
pub enum OutputWriter<S> {
    /// XML output method
    Xml(XmlRawWriter<S>),
    /// HTML output method
    Html(HtmlRawWriter<S>),
}

impl<S: io::Write> OutputWriter<S> {
    /// Creates a writer of the output method. [`OutputMethod::AutoDetect`]
    /// creates an XML writer.
    pub fn new(method: OutputMethod, sink: S, settings: &WriterSettings) -> Self {
        match method {
            OutputMethod::Html => Self::Html(HtmlRawWriter::with_settings(sink, settings)),
            OutputMethod::Xml | OutputMethod::AutoDetect => {
                Self::Xml(XmlRawWriter::with_settings(sink, settings))
            }
        }
    }

    /// Returns the output method of the writer.
    pub fn output_method(&self) -> OutputMethod {
        match self {
            Self::Xml(_) => OutputMethod::Xml,
            Self::Html(_) => OutputMethod::Html,
        }
    }

    /// Consumes the writer, returning the sink.
    pub fn into_inner(self) -> S {
        match self {
            Self::Xml(w) => w.into_inner(),
            Self::Html(w) => w.into_inner(),
        }
    }

    fn as_write(&self) -> &dyn XmlWrite {
        match self {
            Self::Xml(w) => w,
            Self::Html(w) => w,
        }
    }

    fn as_write_mut(&mut self) -> &mut dyn XmlWrite {
        match self {
            Self::Xml(w) => w,
            Self::Html(w) => w,
        }
    }
}

impl<S: io::Write> XmlWrite for OutputWriter<S> {
    fn settings(&self) -> Option<&WriterSettings> {
        self.as_write().settings()
    }
    fn write_state(&self) -> WriteState {
        self.as_write().write_state()
    }
    fn write_start_document(&mut self, standalone: Option<bool>) -> Result<()> {
        self.as_write_mut().write_start_document(standalone)
    }
    fn write_end_document(&mut self) -> Result<()> {
        self.as_write_mut().write_end_document()
    }
    fn write_doc_type(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        subset: Option<&str>,
    ) -> Result<()> {
        self.as_write_mut()
            .write_doc_type(name, public_id, system_id, subset)
    }
    fn write_start_element(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        self.as_write_mut()
            .write_start_element(prefix, local_name, namespace)
    }
    fn write_end_element(&mut self) -> Result<()> {
        self.as_write_mut().write_end_element()
    }
    fn write_full_end_element(&mut self) -> Result<()> {
        self.as_write_mut().write_full_end_element()
    }
    fn write_start_attribute(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        self.as_write_mut()
            .write_start_attribute(prefix, local_name, namespace)
    }
    fn write_end_attribute(&mut self) -> Result<()> {
        self.as_write_mut().write_end_attribute()
    }
    fn write_cdata(&mut self, text: &str) -> Result<()> {
        self.as_write_mut().write_cdata(text)
    }
    fn write_comment(&mut self, text: &str) -> Result<()> {
        self.as_write_mut().write_comment(text)
    }
    fn write_processing_instruction(&mut self, name: &str, text: &str) -> Result<()> {
        self.as_write_mut().write_processing_instruction(name, text)
    }
    fn write_entity_ref(&mut self, name: &str) -> Result<()> {
        self.as_write_mut().write_entity_ref(name)
    }
    fn write_char_entity(&mut self, ch: char) -> Result<()> {
        self.as_write_mut().write_char_entity(ch)
    }
    fn write_whitespace(&mut self, whitespace: &str) -> Result<()> {
        self.as_write_mut().write_whitespace(whitespace)
    }
    fn write_string(&mut self, text: &str) -> Result<()> {
        self.as_write_mut().write_string(text)
    }
    fn write_raw(&mut self, data: &str) -> Result<()> {
        self.as_write_mut().write_raw(data)
    }
    fn flush(&mut self) -> Result<()> {
        self.as_write_mut().flush()
    }
    fn close(&mut self) -> Result<()> {
        self.as_write_mut().close()
    }
}

impl BufferedOutput for OutputWriter<Vec<u8>> {
    fn take_output(&mut self) -> Result<Vec<u8>> {
        match self {
            Self::Xml(w) => w.take_output(),
            Self::Html(w) => w.take_output(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// A writer which chooses between the XML and HTML output methods by the
/// first element.
///
/// Calls which may precede the root element (XML declaration, `DOCTYPE`,
/// comments, processing instructions and whitespace) are recorded. The first
/// start element selects HTML if its name is `html` in any case and it has
/// neither prefix nor namespace, and XML otherwise. The recorded calls are
/// then replayed to the created writer and all later calls go directly to it.
/// Any other call made before the first element, such as non-whitespace
/// text, selects XML.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_pipeline::writer::{AutoDetectWriter, OutputMethod, XmlWrite};
///
/// let mut writer = AutoDetectWriter::new(Vec::new());
/// writer.write_comment("generated").unwrap();
/// assert_eq!(writer.output_method(), None);
///
/// writer.write_start_element("", "HTML", "").unwrap();
/// assert_eq!(writer.output_method(), Some(OutputMethod::Html));
///
/// writer.write_element_string("", "br", "", "").unwrap();
/// writer.close().unwrap();
/// assert_eq!(writer.into_inner(), b"<!--generated--><HTML><br></HTML>");
/// ```
pub struct AutoDetectWriter<S> {
    settings: WriterSettings,
    /// The sink, until the output method is chosen
    sink: Option<S>,
    events: Vec<BufferedEvent>,
    writer: Option<OutputWriter<S>>,
    on_detect: Option<Box<dyn FnOnce(OutputMethod)>>,
}

impl<S: io::Write> AutoDetectWriter<S> {
    /// Creates a writer with default settings.
    pub fn new(sink: S) -> Self {
        Self::with_settings(sink, &WriterSettings::default())
    }

    /// Creates a writer configured by `settings`. The writer created after
    /// detection gets the same settings.
    pub fn with_settings(sink: S, settings: &WriterSettings) -> Self {
        Self {
            settings: settings.clone(),
            sink: Some(sink),
            events: Vec::new(),
            writer: None,
            on_detect: None,
        }
    }

    /// Registers a function which is called once, when the output method is
    /// chosen.
    pub fn on_detect(&mut self, callback: impl FnOnce(OutputMethod) + 'static) {
        self.on_detect = Some(Box::new(callback));
    }

    /// Returns the chosen output method, or `None` if it is not chosen yet.
    pub fn output_method(&self) -> Option<OutputMethod> {
        self.writer.as_ref().map(OutputWriter::output_method)
    }

    /// Returns the calls recorded while the output method is unknown.
    pub fn buffered(&self) -> &[BufferedEvent] {
        &self.events
    }

    /// Consumes the writer, returning the sink. Output which was not flushed
    /// is lost.
    pub fn into_inner(self) -> S {
        match (self.writer, self.sink) {
            (Some(writer), _) => writer.into_inner(),
            (None, Some(sink)) => sink,
            (None, None) => unreachable!("sink is moved only into the created writer"),
        }
    }

    /// Creates the writer of `method` and replays the recorded calls to it.
    fn detect(&mut self, method: OutputMethod) -> Result<&mut OutputWriter<S>> {
        if self.writer.is_none() {
            let sink = self
                .sink
                .take()
                .ok_or(MisuseError::InvalidWriteState("output method detection"))?;
            debug!("output method detected: {:?}", method);

            let mut settings = self.settings.clone();
            settings.output_method = method;
            self.writer = Some(OutputWriter::new(method, sink, &settings));
            if let Some(callback) = self.on_detect.take() {
                callback(method);
            }
        }
        match self.detected()? {
            Some(writer) => Ok(writer),
            None => Err(MisuseError::InvalidWriteState("output method detection").into()),
        }
    }

    /// Returns the created writer, if any, after replaying the recorded calls
    /// to it. Calls are replayed one by one: if one of them fails, the error
    /// is returned and the following calls stay recorded until the next
    /// operation.
    fn detected(&mut self) -> Result<Option<&mut OutputWriter<S>>> {
        let writer = match &mut self.writer {
            Some(writer) => writer,
            None => return Ok(None),
        };
        while !self.events.is_empty() {
            self.events.remove(0).replay(writer)?;
        }
        Ok(Some(writer))
    }

    /// Returns the created writer, or creates an XML writer.
    #[inline]
    fn xml(&mut self) -> Result<&mut OutputWriter<S>> {
        self.detect(OutputMethod::Xml)
    }
}

impl<S> fmt::Debug for AutoDetectWriter<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AutoDetectWriter")
            .field("detected", &self.writer.is_some())
            .field("events", &self.events)
            .finish()
    }
}

impl<S: io::Write> XmlWrite for AutoDetectWriter<S> {
    fn settings(&self) -> Option<&WriterSettings> {
        Some(&self.settings)
    }

    fn write_state(&self) -> WriteState {
        match &self.writer {
            Some(writer) => writer.write_state(),
            None if self.events.is_empty() => WriteState::Start,
            None => WriteState::Prolog,
        }
    }

    fn write_start_document(&mut self, standalone: Option<bool>) -> Result<()> {
        match self.detected()? {
            Some(writer) => writer.write_start_document(standalone),
            None => {
                self.events.push(BufferedEvent::StartDocument(standalone));
                Ok(())
            }
        }
    }

    fn write_end_document(&mut self) -> Result<()> {
        self.xml()?.write_end_document()
    }

    fn write_doc_type(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        subset: Option<&str>,
    ) -> Result<()> {
        match self.detected()? {
            Some(writer) => writer.write_doc_type(name, public_id, system_id, subset),
            None => {
                self.events.push(BufferedEvent::DocType {
                    name: name.to_owned(),
                    public_id: public_id.map(str::to_owned),
                    system_id: system_id.map(str::to_owned),
                    subset: subset.map(str::to_owned),
                });
                Ok(())
            }
        }
    }

    fn write_start_element(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        let method = if prefix.is_empty()
            && namespace.is_empty()
            && local_name.eq_ignore_ascii_case("html")
        {
            OutputMethod::Html
        } else {
            OutputMethod::Xml
        };
        self.detect(method)?
            .write_start_element(prefix, local_name, namespace)
    }

    fn write_end_element(&mut self) -> Result<()> {
        self.xml()?.write_end_element()
    }

    fn write_full_end_element(&mut self) -> Result<()> {
        self.xml()?.write_full_end_element()
    }

    fn write_start_attribute(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        self.xml()?
            .write_start_attribute(prefix, local_name, namespace)
    }

    fn write_end_attribute(&mut self) -> Result<()> {
        self.xml()?.write_end_attribute()
    }

    fn write_cdata(&mut self, text: &str) -> Result<()> {
        self.xml()?.write_cdata(text)
    }

    fn write_comment(&mut self, text: &str) -> Result<()> {
        match self.detected()? {
            Some(writer) => writer.write_comment(text),
            None => {
                self.events.push(BufferedEvent::Comment(text.to_owned()));
                Ok(())
            }
        }
    }

    fn write_processing_instruction(&mut self, name: &str, text: &str) -> Result<()> {
        match self.detected()? {
            Some(writer) => writer.write_processing_instruction(name, text),
            None => {
                self.events.push(BufferedEvent::ProcessingInstruction {
                    name: name.to_owned(),
                    text: text.to_owned(),
                });
                Ok(())
            }
        }
    }

    fn write_entity_ref(&mut self, name: &str) -> Result<()> {
        self.xml()?.write_entity_ref(name)
    }

    fn write_char_entity(&mut self, ch: char) -> Result<()> {
        self.xml()?.write_char_entity(ch)
    }

    fn write_whitespace(&mut self, whitespace: &str) -> Result<()> {
        match self.detected()? {
            Some(writer) => writer.write_whitespace(whitespace),
            None => {
                self.events.push(BufferedEvent::Whitespace(whitespace.to_owned()));
                Ok(())
            }
        }
    }

    fn write_string(&mut self, text: &str) -> Result<()> {
        match self.detected()? {
            Some(writer) => writer.write_string(text),
            None if is_whitespace_only(text) => {
                self.events.push(BufferedEvent::Whitespace(text.to_owned()));
                Ok(())
            }
            None => self.xml()?.write_string(text),
        }
    }

    fn write_raw(&mut self, data: &str) -> Result<()> {
        self.xml()?.write_raw(data)
    }

    fn flush(&mut self) -> Result<()> {
        self.xml()?.flush()
    }

    fn close(&mut self) -> Result<()> {
        self.xml()?.close()
    }
}

impl BufferedOutput for AutoDetectWriter<Vec<u8>> {
    fn take_output(&mut self) -> Result<Vec<u8>> {
        match self.detected()? {
            Some(writer) => writer.take_output(),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    fn detected(name: &str) -> Option<OutputMethod> {
        let mut writer = AutoDetectWriter::new(Vec::new());
        writer.write_start_element("", name, "").unwrap();
        writer.output_method()
    }

    #[test]
    fn html_names() {
        assert_eq!(detected("html"), Some(OutputMethod::Html));
        assert_eq!(detected("HTML"), Some(OutputMethod::Html));
        assert_eq!(detected("Html"), Some(OutputMethod::Html));
    }

    #[test]
    fn xml_names() {
        assert_eq!(detected("Root"), Some(OutputMethod::Xml));
        assert_eq!(detected("htm"), Some(OutputMethod::Xml));
        assert_eq!(detected("xhtml"), Some(OutputMethod::Xml));
    }

    #[test]
    fn html_in_namespace() {
        let mut writer = AutoDetectWriter::new(Vec::new());
        writer
            .write_start_element("", "html", "http://www.w3.org/1999/xhtml")
            .unwrap();
        assert_eq!(writer.output_method(), Some(OutputMethod::Xml));

        let mut writer = AutoDetectWriter::new(Vec::new());
        writer.write_start_element("h", "html", "").unwrap();
        assert_eq!(writer.output_method(), Some(OutputMethod::Xml));
    }

    #[test]
    fn whitespace_is_buffered() {
        let mut writer = AutoDetectWriter::new(Vec::new());
        writer.write_start_document(None).unwrap();
        writer.write_string(" \n").unwrap();
        writer.write_whitespace("\t").unwrap();
        writer.write_processing_instruction("pi", "x").unwrap();
        assert_eq!(writer.output_method(), None);
        assert_eq!(writer.write_state(), WriteState::Prolog);
        assert_eq!(
            writer.buffered(),
            &[
                BufferedEvent::StartDocument(None),
                BufferedEvent::Whitespace(" \n".to_string()),
                BufferedEvent::Whitespace("\t".to_string()),
                BufferedEvent::ProcessingInstruction {
                    name: "pi".to_string(),
                    text: "x".to_string(),
                },
            ]
        );

        writer.write_start_element("", "html", "").unwrap();
        writer.close().unwrap();
        assert!(writer.buffered().is_empty());
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            " \n\t<?pi x><html></html>"
        );
    }

    #[test]
    fn text_forces_xml() {
        let mut writer = AutoDetectWriter::new(Vec::new());
        writer.write_start_document(None).unwrap();
        writer.write_string("text").unwrap();
        assert_eq!(writer.output_method(), Some(OutputMethod::Xml));
        writer.write_start_element("", "html", "").unwrap();
        writer.close().unwrap();
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            r#"<?xml version="1.0" encoding="utf-8"?>text<html />"#
        );
    }

    /// A recorded call failing on replay is reported, later recorded calls
    /// are kept for the next operation
    #[test]
    fn failed_replay() {
        let mut writer = AutoDetectWriter::new(Vec::new());
        writer.write_start_document(None).unwrap();
        writer.write_start_document(None).unwrap();
        writer.write_comment("kept").unwrap();

        let error = writer.write_start_element("", "root", "").unwrap_err();
        assert_eq!(
            error.as_misuse(),
            Some(&MisuseError::InvalidWriteState("write_start_document"))
        );
        assert_eq!(writer.output_method(), Some(OutputMethod::Xml));
        assert_eq!(
            writer.buffered(),
            &[BufferedEvent::Comment("kept".to_string())]
        );

        writer.write_start_element("", "root", "").unwrap();
        writer.close().unwrap();
        assert!(writer.buffered().is_empty());
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            r#"<?xml version="1.0" encoding="utf-8"?><!--kept--><root />"#
        );
    }

    #[test]
    fn close_without_elements() {
        let mut writer = AutoDetectWriter::new(Vec::new());
        writer.write_comment("only").unwrap();
        writer.close().unwrap();
        assert_eq!(writer.output_method(), Some(OutputMethod::Xml));
        assert_eq!(writer.into_inner(), b"<!--only-->");
    }

    #[test]
    fn callback() {
        let detected = Rc::new(Cell::new(None));
        let mut writer = AutoDetectWriter::new(Vec::new());
        let cell = detected.clone();
        writer.on_detect(move |method| cell.set(Some(method)));

        writer.write_comment("x").unwrap();
        assert_eq!(detected.get(), None);
        writer.write_start_element("", "html", "").unwrap();
        assert_eq!(detected.get(), Some(OutputMethod::Html));
    }
}
