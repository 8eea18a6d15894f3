use std::borrow::Cow;
use std::fmt::Write as _;
use std::io;
use std::mem;

use quick_xml::escape::partial_escape;

use super::{BufferedOutput, WriteState, WriterSettings, XmlWrite};
use crate::errors::{Error, MisuseError, Result};
use crate::name::NamespaceScope;
use crate::node::qualified;

/// How an element is closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EndStyle {
    /// `<e />` if the element has no content, `</e>` otherwise
    Short,
    /// Always `</e>`
    Full,
    /// No end tag (HTML void elements)
    Void,
}

/// How text is escaped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Escaping {
    /// XML rules
    Xml,
    /// HTML rules: `<` is not escaped in attribute values
    Html,
    /// Text is written as is (HTML `script` and `style` content)
    None,
}

/// Escapes an attribute value. Besides markup characters, XML escapes new
/// lines and tabs so they survive attribute value normalization.
fn escape_attribute(value: &str, escaping: Escaping) -> Cow<str> {
    let needs_escape = |ch: char| match escaping {
        Escaping::Xml => matches!(ch, '<' | '>' | '&' | '"' | '\t' | '\n' | '\r'),
        Escaping::Html | Escaping::None => matches!(ch, '&' | '"'),
    };
    if !value.chars().any(needs_escape) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' if escaping == Escaping::Xml => escaped.push_str("&lt;"),
            '>' if escaping == Escaping::Xml => escaped.push_str("&gt;"),
            '\t' if escaping == Escaping::Xml => escaped.push_str("&#x9;"),
            '\n' if escaping == Escaping::Xml => escaped.push_str("&#xA;"),
            '\r' if escaping == Escaping::Xml => escaped.push_str("&#xD;"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

/// Serializes writer calls as XML text into an [`io::Write`] sink.
///
/// Output is collected in an internal buffer and written to the sink on
/// [`flush`](XmlWrite::flush) and [`close`](XmlWrite::close). The writer does
/// not check names and characters; wrap it into a
/// [`CharCheckingWriter`](super::CharCheckingWriter) for that.
///
/// Namespace declarations are added automatically when an element or an
/// attribute uses a prefix which is not bound to the requested namespace.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_pipeline::writer::{XmlRawWriter, XmlWrite};
///
/// let mut writer = XmlRawWriter::new(Vec::new());
/// writer.write_start_element("p", "root", "urn:example").unwrap();
/// writer.write_attribute_string("", "attr", "", "a\"b").unwrap();
/// writer.write_cdata("x]]>y").unwrap();
/// writer.write_start_element("p", "empty", "urn:example").unwrap();
/// writer.write_end_element().unwrap();
/// writer.write_end_element().unwrap();
/// writer.flush().unwrap();
///
/// assert_eq!(
///     String::from_utf8(writer.into_inner()).unwrap(),
///     concat!(
///         r#"<p:root attr="a&quot;b" xmlns:p="urn:example">"#,
///         "<![CDATA[x]]]]><![CDATA[>y]]>",
///         "<p:empty /></p:root>",
///     )
/// );
/// ```
pub struct XmlRawWriter<S> {
    sink: S,
    buf: String,
    settings: WriterSettings,
    state: WriteState,
    /// Qualified names of open elements, innermost last
    stack: Vec<String>,
    scope: NamespaceScope,
    /// Namespace declarations which must be added to the open start tag
    pending_ns: Vec<(String, String)>,
    /// The `>` of the current start tag is not yet written
    tag_open: bool,
    in_attribute: bool,
    /// Prefix and collected value of the namespace declaration attribute
    /// which is being written
    xmlns_attr: Option<(String, String)>,
    /// Length of `buf` right after the last written `]]>`, if nothing was
    /// written after it
    cdata_end: Option<usize>,
    /// Number of `]` (up to 2) at the end of the last CDATA section content
    brackets: u8,
    root_written: bool,
}

impl<S: io::Write> XmlRawWriter<S> {
    /// Creates a writer with default settings.
    pub fn new(sink: S) -> Self {
        Self::with_settings(sink, &WriterSettings::default())
    }

    /// Creates a writer configured by `settings`. Only settings of the
    /// serialization itself are used here, such as
    /// [`omit_xml_declaration`](WriterSettings::omit_xml_declaration).
    pub fn with_settings(sink: S, settings: &WriterSettings) -> Self {
        Self {
            sink,
            buf: String::new(),
            settings: settings.clone(),
            state: WriteState::Start,
            stack: Vec::new(),
            scope: NamespaceScope::default(),
            pending_ns: Vec::new(),
            tag_open: false,
            in_attribute: false,
            xmlns_attr: None,
            cdata_end: None,
            brackets: 0,
            root_written: false,
        }
    }

    /// Returns a reference to the sink. Buffered output is not included.
    pub fn get_ref(&self) -> &S {
        &self.sink
    }

    /// Consumes the writer, returning the sink. Output which was not flushed
    /// is lost.
    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Returns the qualified name of the innermost open element.
    pub(crate) fn current_element(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    #[inline]
    pub(crate) fn in_attribute(&self) -> bool {
        self.in_attribute
    }

    pub(crate) fn check_writable(&self) -> Result<()> {
        match self.state {
            WriteState::Closed => Err(MisuseError::WriterClosed.into()),
            WriteState::Error => Err(MisuseError::InvalidWriteState("write after a failed write").into()),
            _ => Ok(()),
        }
    }

    fn close_start_tag(&mut self) {
        if self.tag_open {
            self.write_pending_namespaces();
            self.buf.push('>');
            self.tag_open = false;
        }
    }

    fn write_pending_namespaces(&mut self) {
        for (prefix, uri) in mem::take(&mut self.pending_ns) {
            if prefix.is_empty() {
                self.buf.push_str(" xmlns=\"");
            } else {
                let _ = write!(self.buf, " xmlns:{}=\"", prefix);
            }
            self.buf.push_str(&escape_attribute(&uri, Escaping::Xml));
            self.buf.push('"');
        }
    }

    fn content_state(&self) -> WriteState {
        if self.stack.is_empty() && !self.root_written {
            WriteState::Prolog
        } else {
            WriteState::Content
        }
    }

    /// Prepares writing of a node in element content or in the prolog.
    pub(crate) fn begin_content(&mut self, operation: &'static str) -> Result<()> {
        self.check_writable()?;
        if self.in_attribute {
            return Err(MisuseError::InvalidWriteState(operation).into());
        }
        self.close_start_tag();
        self.cdata_end = None;
        self.state = self.content_state();
        Ok(())
    }

    /// Marks that an XML declaration would have been written here.
    pub(crate) fn begin_document(&mut self) -> Result<bool> {
        self.check_writable()?;
        if self.state != WriteState::Start {
            return Err(MisuseError::InvalidWriteState("write_start_document").into());
        }
        self.state = WriteState::Prolog;
        Ok(!self.settings.omit_xml_declaration)
    }

    /// Writes text to the attribute value or to the content.
    pub(crate) fn write_text(&mut self, text: &str, escaping: Escaping) -> Result<()> {
        if self.in_attribute {
            self.check_writable()?;
            if let Some((_, value)) = &mut self.xmlns_attr {
                value.push_str(text);
            }
            self.buf.push_str(&escape_attribute(text, escaping));
            return Ok(());
        }
        self.begin_content("write_string")?;
        match escaping {
            Escaping::None => self.buf.push_str(text),
            Escaping::Xml | Escaping::Html => self.buf.push_str(&partial_escape(text)),
        }
        Ok(())
    }

    /// Appends markup as is to the attribute value or to the content.
    pub(crate) fn push_raw(&mut self, data: &str) -> Result<()> {
        if self.in_attribute {
            self.check_writable()?;
        } else {
            self.begin_content("write_raw")?;
        }
        self.buf.push_str(data);
        Ok(())
    }

    pub(crate) fn write_pi(&mut self, name: &str, text: &str, end: &str) -> Result<()> {
        self.begin_content("write_processing_instruction")?;
        self.buf.push_str("<?");
        self.buf.push_str(name);
        if !text.is_empty() {
            self.buf.push(' ');
            self.buf.push_str(text);
        }
        self.buf.push_str(end);
        Ok(())
    }

    pub(crate) fn end_attribute(&mut self) -> Result<()> {
        self.check_writable()?;
        if !self.in_attribute {
            return Err(MisuseError::InvalidWriteState("write_end_attribute").into());
        }
        self.buf.push('"');
        self.in_attribute = false;
        if let Some((prefix, uri)) = self.xmlns_attr.take() {
            self.pending_ns.retain(|(p, _)| *p != prefix);
            self.scope.declare(&prefix, &uri);
        }
        self.state = WriteState::Element;
        Ok(())
    }

    pub(crate) fn end_element(&mut self, style: EndStyle) -> Result<()> {
        self.check_writable()?;
        if self.in_attribute {
            self.end_attribute()?;
        }
        let name = self.stack.pop().ok_or(MisuseError::UnbalancedEndElement)?;
        if self.tag_open {
            self.write_pending_namespaces();
            self.tag_open = false;
            match style {
                EndStyle::Short => self.buf.push_str(" />"),
                EndStyle::Void => self.buf.push('>'),
                EndStyle::Full => {
                    let _ = write!(self.buf, "></{}>", name);
                }
            }
        } else if style != EndStyle::Void {
            let _ = write!(self.buf, "</{}>", name);
        }
        self.scope.pop_scope();
        self.cdata_end = None;
        self.root_written = true;
        self.state = WriteState::Content;
        Ok(())
    }

    pub(crate) fn end_all_elements(&mut self, style: impl Fn(&str) -> EndStyle) -> Result<()> {
        if self.in_attribute {
            self.end_attribute()?;
        }
        while let Some(name) = self.current_element() {
            let end_style = style(name);
            self.end_element(end_style)?;
        }
        Ok(())
    }

    fn fail(&mut self, error: io::Error) -> Error {
        self.state = WriteState::Error;
        error.into()
    }
}

impl<S: io::Write> XmlWrite for XmlRawWriter<S> {
    fn settings(&self) -> Option<&WriterSettings> {
        Some(&self.settings)
    }

    fn write_state(&self) -> WriteState {
        self.state
    }

    fn write_start_document(&mut self, standalone: Option<bool>) -> Result<()> {
        if self.begin_document()? {
            self.buf.push_str(r#"<?xml version="1.0" encoding="utf-8""#);
            match standalone {
                Some(true) => self.buf.push_str(r#" standalone="yes""#),
                Some(false) => self.buf.push_str(r#" standalone="no""#),
                None => {}
            }
            self.buf.push_str("?>");
        }
        Ok(())
    }

    fn write_end_document(&mut self) -> Result<()> {
        self.check_writable()?;
        self.end_all_elements(|_| EndStyle::Short)?;
        self.state = WriteState::Start;
        Ok(())
    }

    fn write_doc_type(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        subset: Option<&str>,
    ) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(MisuseError::InvalidWriteState("write_doc_type").into());
        }
        self.begin_content("write_doc_type")?;
        self.buf.push_str("<!DOCTYPE ");
        self.buf.push_str(name);
        match (public_id, system_id) {
            (Some(public_id), Some(system_id)) => {
                let _ = write!(self.buf, r#" PUBLIC "{}" "{}""#, public_id, system_id);
            }
            (Some(public_id), None) => {
                let _ = write!(self.buf, r#" PUBLIC "{}""#, public_id);
            }
            (None, Some(system_id)) => {
                let _ = write!(self.buf, r#" SYSTEM "{}""#, system_id);
            }
            (None, None) => {}
        }
        if let Some(subset) = subset {
            let _ = write!(self.buf, " [{}]", subset);
        }
        self.buf.push('>');
        Ok(())
    }

    fn write_start_element(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        self.check_writable()?;
        if self.in_attribute {
            self.end_attribute()?;
        }
        self.close_start_tag();
        self.cdata_end = None;

        self.scope.push_scope();
        if namespace.is_empty() {
            if prefix.is_empty() && self.scope.lookup("") != Some("") {
                self.scope.declare("", "");
                self.pending_ns.push((String::new(), String::new()));
            }
        } else if self.scope.lookup(prefix) != Some(namespace) {
            self.scope.declare(prefix, namespace);
            self.pending_ns.push((prefix.to_owned(), namespace.to_owned()));
        }

        let name = qualified(prefix, local_name);
        self.buf.push('<');
        self.buf.push_str(&name);
        self.stack.push(name);
        self.tag_open = true;
        self.state = WriteState::Element;
        Ok(())
    }

    fn write_end_element(&mut self) -> Result<()> {
        self.end_element(EndStyle::Short)
    }

    fn write_full_end_element(&mut self) -> Result<()> {
        self.end_element(EndStyle::Full)
    }

    fn write_start_attribute(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        self.check_writable()?;
        if self.in_attribute {
            self.end_attribute()?;
        }
        if !self.tag_open {
            return Err(MisuseError::InvalidWriteState("write_start_attribute").into());
        }
        if prefix.is_empty() && local_name == "xmlns" {
            self.xmlns_attr = Some((String::new(), String::new()));
        } else if prefix == "xmlns" {
            self.xmlns_attr = Some((local_name.to_owned(), String::new()));
        } else if !prefix.is_empty()
            && !namespace.is_empty()
            && self.scope.lookup(prefix) != Some(namespace)
        {
            self.scope.declare(prefix, namespace);
            self.pending_ns.push((prefix.to_owned(), namespace.to_owned()));
        }

        self.buf.push(' ');
        self.buf.push_str(&qualified(prefix, local_name));
        self.buf.push_str("=\"");
        self.in_attribute = true;
        self.state = WriteState::Attribute;
        Ok(())
    }

    fn write_end_attribute(&mut self) -> Result<()> {
        self.end_attribute()
    }

    fn write_cdata(&mut self, text: &str) -> Result<()> {
        let merge = self.cdata_end.is_some() && self.cdata_end == Some(self.buf.len());
        self.begin_content("write_cdata")?;
        if merge {
            self.buf.truncate(self.buf.len() - "]]>".len());
        } else {
            self.buf.push_str("<![CDATA[");
            self.brackets = 0;
        }
        for ch in text.chars() {
            match ch {
                '>' if self.brackets >= 2 => {
                    self.buf.push_str("]]><![CDATA[>");
                    self.brackets = 0;
                }
                ']' => {
                    self.buf.push(ch);
                    self.brackets = (self.brackets + 1).min(2);
                }
                _ => {
                    self.buf.push(ch);
                    self.brackets = 0;
                }
            }
        }
        self.buf.push_str("]]>");
        self.cdata_end = Some(self.buf.len());
        Ok(())
    }

    fn write_comment(&mut self, text: &str) -> Result<()> {
        self.begin_content("write_comment")?;
        self.buf.push_str("<!--");
        self.buf.push_str(text);
        self.buf.push_str("-->");
        Ok(())
    }

    fn write_processing_instruction(&mut self, name: &str, text: &str) -> Result<()> {
        self.write_pi(name, text, "?>")
    }

    fn write_entity_ref(&mut self, name: &str) -> Result<()> {
        self.push_raw(&format!("&{};", name))
    }

    fn write_char_entity(&mut self, ch: char) -> Result<()> {
        self.push_raw(&format!("&#x{:X};", ch as u32))
    }

    fn write_whitespace(&mut self, whitespace: &str) -> Result<()> {
        self.write_text(whitespace, Escaping::Xml)
    }

    fn write_string(&mut self, text: &str) -> Result<()> {
        self.write_text(text, Escaping::Xml)
    }

    fn write_raw(&mut self, data: &str) -> Result<()> {
        self.push_raw(data)
    }

    fn flush(&mut self) -> Result<()> {
        self.check_writable()?;
        self.cdata_end = None;
        if !self.buf.is_empty() {
            if let Err(e) = self.sink.write_all(self.buf.as_bytes()) {
                return Err(self.fail(e));
            }
            self.buf.clear();
        }
        self.sink.flush().map_err(|e| self.fail(e))
    }

    fn close(&mut self) -> Result<()> {
        if self.state == WriteState::Closed {
            return Ok(());
        }
        self.check_writable()?;
        self.end_all_elements(|_| EndStyle::Short)?;
        self.flush()?;
        self.state = WriteState::Closed;
        Ok(())
    }
}

impl BufferedOutput for XmlRawWriter<Vec<u8>> {
    fn take_output(&mut self) -> Result<Vec<u8>> {
        if self.state != WriteState::Closed {
            self.flush()?;
        }
        Ok(mem::take(&mut self.sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn output(writer: XmlRawWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn declaration() {
        let mut writer = XmlRawWriter::new(Vec::new());
        writer.write_start_document(Some(true)).unwrap();
        writer.write_start_element("", "root", "").unwrap();
        writer.close().unwrap();
        assert_eq!(
            output(writer),
            r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?><root />"#
        );
    }

    #[test]
    fn omit_declaration() {
        let settings = WriterSettings {
            omit_xml_declaration: true,
            ..WriterSettings::default()
        };
        let mut writer = XmlRawWriter::with_settings(Vec::new(), &settings);
        writer.write_start_document(None).unwrap();
        assert_eq!(writer.write_state(), WriteState::Prolog);
        assert!(writer.write_start_document(None).is_err());
        writer.write_element_string("", "root", "", "").unwrap();
        writer.close().unwrap();
        assert_eq!(output(writer), "<root />");
    }

    #[test]
    fn escaping() {
        let mut writer = XmlRawWriter::new(Vec::new());
        writer.write_start_element("", "root", "").unwrap();
        writer.write_attribute_string("", "a", "", "<&>\"'\t\n").unwrap();
        writer.write_string("<&>\"'").unwrap();
        writer.write_end_element().unwrap();
        writer.close().unwrap();
        assert_eq!(
            output(writer),
            r#"<root a="&lt;&amp;&gt;&quot;'&#x9;&#xA;">&lt;&amp;&gt;"'</root>"#
        );
    }

    #[test]
    fn full_end_element() {
        let mut writer = XmlRawWriter::new(Vec::new());
        writer.write_start_element("", "root", "").unwrap();
        writer.write_full_end_element().unwrap();
        writer.close().unwrap();
        assert_eq!(output(writer), "<root></root>");
    }

    #[test]
    fn unbalanced_end_element() {
        let mut writer = XmlRawWriter::new(Vec::new());
        assert_eq!(
            writer.write_end_element().unwrap_err().as_misuse(),
            Some(&MisuseError::UnbalancedEndElement)
        );
    }

    #[test]
    fn attribute_outside_of_start_tag() {
        let mut writer = XmlRawWriter::new(Vec::new());
        writer.write_start_element("", "root", "").unwrap();
        writer.write_string("text").unwrap();
        assert_eq!(
            writer.write_start_attribute("", "a", "").unwrap_err().as_misuse(),
            Some(&MisuseError::InvalidWriteState("write_start_attribute"))
        );
    }

    #[test]
    fn closed() {
        let mut writer = XmlRawWriter::new(Vec::new());
        writer.write_start_element("", "a", "").unwrap();
        writer.write_start_element("", "b", "").unwrap();
        writer.write_string("x").unwrap();
        writer.close().unwrap();
        assert_eq!(writer.write_state(), WriteState::Closed);
        assert_eq!(
            writer.write_string("y").unwrap_err().as_misuse(),
            Some(&MisuseError::WriterClosed)
        );
        writer.close().unwrap();
        assert_eq!(output(writer), "<a><b>x</b></a>");
    }

    #[test]
    fn doctype() {
        let mut writer = XmlRawWriter::new(Vec::new());
        writer
            .write_doc_type("root", Some("-//public"), Some("root.dtd"), Some("<!ENTITY e 'x'>"))
            .unwrap();
        writer.write_doc_type("other", None, Some("other.dtd"), None).unwrap();
        writer.close().unwrap();
        assert_eq!(
            output(writer),
            concat!(
                r#"<!DOCTYPE root PUBLIC "-//public" "root.dtd" [<!ENTITY e 'x'>]>"#,
                r#"<!DOCTYPE other SYSTEM "other.dtd">"#,
            )
        );
    }

    #[test]
    fn references() {
        let mut writer = XmlRawWriter::new(Vec::new());
        writer.write_start_element("", "root", "").unwrap();
        writer.write_start_attribute("", "a", "").unwrap();
        writer.write_entity_ref("ent").unwrap();
        writer.write_char_entity('\u{A0}').unwrap();
        writer.write_end_attribute().unwrap();
        writer.write_entity_ref("ent").unwrap();
        writer.write_char_entity('<').unwrap();
        writer.close().unwrap();
        assert_eq!(output(writer), r#"<root a="&ent;&#xA0;">&ent;&#x3C;</root>"#);
    }

    mod namespaces {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn declared_once() {
            let mut writer = XmlRawWriter::new(Vec::new());
            writer.write_start_element("", "a", "urn:a").unwrap();
            writer.write_start_element("", "b", "urn:a").unwrap();
            writer.write_start_element("", "c", "").unwrap();
            writer.close().unwrap();
            assert_eq!(
                output(writer),
                r#"<a xmlns="urn:a"><b><c xmlns="" /></b></a>"#
            );
        }

        #[test]
        fn explicit_declaration() {
            let mut writer = XmlRawWriter::new(Vec::new());
            writer.write_start_element("p", "a", "urn:a").unwrap();
            writer.write_attribute_string("xmlns", "p", "", "urn:a").unwrap();
            writer.write_start_element("p", "b", "urn:a").unwrap();
            writer.close().unwrap();
            assert_eq!(output(writer), r#"<p:a xmlns:p="urn:a"><p:b /></p:a>"#);
        }

        #[test]
        fn prefixed_attribute() {
            let mut writer = XmlRawWriter::new(Vec::new());
            writer.write_start_element("", "a", "").unwrap();
            writer.write_attribute_string("q", "x", "urn:q", "1").unwrap();
            writer.write_attribute_string("xml", "lang", "", "en").unwrap();
            writer.close().unwrap();
            assert_eq!(
                output(writer),
                r#"<a q:x="1" xml:lang="en" xmlns:q="urn:q" />"#
            );
        }
    }

    mod cdata {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn merged() {
            let mut writer = XmlRawWriter::new(Vec::new());
            writer.write_start_element("", "a", "").unwrap();
            writer.write_cdata("one").unwrap();
            writer.write_cdata("two").unwrap();
            writer.close().unwrap();
            assert_eq!(output(writer), "<a><![CDATA[onetwo]]></a>");
        }

        #[test]
        fn not_merged_after_other_content() {
            let mut writer = XmlRawWriter::new(Vec::new());
            writer.write_start_element("", "a", "").unwrap();
            writer.write_cdata("one").unwrap();
            writer.write_string("-").unwrap();
            writer.write_cdata("two").unwrap();
            writer.close().unwrap();
            assert_eq!(output(writer), "<a><![CDATA[one]]>-<![CDATA[two]]></a>");
        }

        #[test]
        fn terminator() {
            let mut writer = XmlRawWriter::new(Vec::new());
            writer.write_start_element("", "a", "").unwrap();
            writer.write_cdata("]]>]]]>").unwrap();
            writer.close().unwrap();
            assert_eq!(
                output(writer),
                "<a><![CDATA[]]]]><![CDATA[>]]]]]><![CDATA[>]]></a>"
            );
        }

        #[test]
        fn terminator_across_merged_sections() {
            let mut writer = XmlRawWriter::new(Vec::new());
            writer.write_start_element("", "a", "").unwrap();
            writer.write_cdata("x]").unwrap();
            writer.write_cdata("]").unwrap();
            writer.write_cdata(">y").unwrap();
            writer.close().unwrap();
            assert_eq!(output(writer), "<a><![CDATA[x]]]]><![CDATA[>y]]></a>");
        }

        #[test]
        fn in_attribute() {
            let mut writer = XmlRawWriter::new(Vec::new());
            writer.write_start_element("", "a", "").unwrap();
            writer.write_start_attribute("", "b", "").unwrap();
            assert_eq!(
                writer.write_cdata("x").unwrap_err().as_misuse(),
                Some(&MisuseError::InvalidWriteState("write_cdata"))
            );
        }
    }

    #[test]
    fn take_output() {
        let mut writer = XmlRawWriter::new(Vec::new());
        writer.write_start_element("", "a", "").unwrap();
        assert_eq!(writer.take_output().unwrap(), b"<a");
        writer.write_string("x").unwrap();
        writer.write_end_element().unwrap();
        assert_eq!(writer.take_output().unwrap(), b">x</a>");
    }
}
