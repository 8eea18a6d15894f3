use std::io;

use super::raw::{EndStyle, Escaping, XmlRawWriter};
use super::{BufferedOutput, WriteState, WriterSettings, XmlWrite};
use crate::errors::Result;

/// [Void elements] never have content and are written without end tag.
///
/// [Void elements]: https://html.spec.whatwg.org/multipage/syntax.html#void-elements
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn is_one_of(name: &str, list: &[&str]) -> bool {
    list.iter().any(|known| name.eq_ignore_ascii_case(known))
}

fn end_style(name: &str) -> EndStyle {
    if is_one_of(name, VOID_ELEMENTS) {
        EndStyle::Void
    } else {
        EndStyle::Full
    }
}

/// Serializes writer calls as HTML into an [`io::Write`] sink.
///
/// Differences from [`XmlRawWriter`]:
/// - no XML declaration is written;
/// - void elements (`<br>`, `<img>`, ...) have no end tag, other elements
///   always have one;
/// - text inside `<script>` and `<style>` is not escaped;
/// - only `&` and `"` are escaped in attribute values;
/// - processing instructions end with `>`.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_pipeline::writer::{HtmlRawWriter, XmlWrite};
///
/// let mut writer = HtmlRawWriter::new(Vec::new());
/// writer.write_start_element("", "p", "").unwrap();
/// writer.write_attribute_string("", "title", "", "a < b").unwrap();
/// writer.write_element_string("", "br", "", "").unwrap();
/// writer.write_element_string("", "script", "", "if (a < b) {}").unwrap();
/// writer.write_element_string("", "span", "", "").unwrap();
/// writer.close().unwrap();
///
/// assert_eq!(
///     String::from_utf8(writer.into_inner()).unwrap(),
///     r#"<p title="a < b"><br><script>if (a < b) {}</script><span></span></p>"#
/// );
/// ```
pub struct HtmlRawWriter<S> {
    raw: XmlRawWriter<S>,
}

impl<S: io::Write> HtmlRawWriter<S> {
    /// Creates a writer with default settings.
    pub fn new(sink: S) -> Self {
        Self::with_settings(sink, &WriterSettings::default())
    }

    /// Creates a writer configured by `settings`.
    pub fn with_settings(sink: S, settings: &WriterSettings) -> Self {
        Self {
            raw: XmlRawWriter::with_settings(sink, settings),
        }
    }

    /// Returns a reference to the sink. Buffered output is not included.
    pub fn get_ref(&self) -> &S {
        self.raw.get_ref()
    }

    /// Consumes the writer, returning the sink. Output which was not flushed
    /// is lost.
    pub fn into_inner(self) -> S {
        self.raw.into_inner()
    }

    fn text_escaping(&self) -> Escaping {
        if self.raw.in_attribute() {
            Escaping::Html
        } else {
            match self.raw.current_element() {
                Some(name) if is_one_of(name, RAW_TEXT_ELEMENTS) => Escaping::None,
                _ => Escaping::Html,
            }
        }
    }
}

impl<S: io::Write> XmlWrite for HtmlRawWriter<S> {
    fn settings(&self) -> Option<&WriterSettings> {
        self.raw.settings()
    }

    fn write_state(&self) -> WriteState {
        self.raw.write_state()
    }

    fn write_start_document(&mut self, _standalone: Option<bool>) -> Result<()> {
        self.raw.begin_document().map(|_| ())
    }

    fn write_end_document(&mut self) -> Result<()> {
        self.raw.check_writable()?;
        self.raw.end_all_elements(end_style)
    }

    fn write_doc_type(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        subset: Option<&str>,
    ) -> Result<()> {
        self.raw.write_doc_type(name, public_id, system_id, subset)
    }

    fn write_start_element(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        self.raw.write_start_element(prefix, local_name, namespace)
    }

    fn write_end_element(&mut self) -> Result<()> {
        let style = self.raw.current_element().map_or(EndStyle::Full, end_style);
        self.raw.end_element(style)
    }

    fn write_full_end_element(&mut self) -> Result<()> {
        self.write_end_element()
    }

    fn write_start_attribute(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        self.raw.write_start_attribute(prefix, local_name, namespace)
    }

    fn write_end_attribute(&mut self) -> Result<()> {
        self.raw.end_attribute()
    }

    fn write_cdata(&mut self, text: &str) -> Result<()> {
        self.raw.write_cdata(text)
    }

    fn write_comment(&mut self, text: &str) -> Result<()> {
        self.raw.write_comment(text)
    }

    fn write_processing_instruction(&mut self, name: &str, text: &str) -> Result<()> {
        self.raw.write_pi(name, text, ">")
    }

    fn write_entity_ref(&mut self, name: &str) -> Result<()> {
        self.raw.write_entity_ref(name)
    }

    fn write_char_entity(&mut self, ch: char) -> Result<()> {
        self.raw.write_char_entity(ch)
    }

    fn write_whitespace(&mut self, whitespace: &str) -> Result<()> {
        self.raw.write_text(whitespace, Escaping::None)
    }

    fn write_string(&mut self, text: &str) -> Result<()> {
        let escaping = self.text_escaping();
        self.raw.write_text(text, escaping)
    }

    fn write_raw(&mut self, data: &str) -> Result<()> {
        self.raw.push_raw(data)
    }

    fn flush(&mut self) -> Result<()> {
        self.raw.flush()
    }

    fn close(&mut self) -> Result<()> {
        if self.raw.write_state() != WriteState::Closed {
            self.raw.check_writable()?;
            self.raw.end_all_elements(end_style)?;
        }
        self.raw.close()
    }
}

impl BufferedOutput for HtmlRawWriter<Vec<u8>> {
    fn take_output(&mut self) -> Result<Vec<u8>> {
        self.raw.take_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn html(write: impl FnOnce(&mut HtmlRawWriter<Vec<u8>>)) -> String {
        let mut writer = HtmlRawWriter::new(Vec::new());
        write(&mut writer);
        writer.close().unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn no_declaration() {
        let output = html(|w| {
            w.write_start_document(Some(true)).unwrap();
            w.write_doc_type("html", None, None, None).unwrap();
            w.write_element_string("", "html", "", "").unwrap();
        });
        assert_eq!(output, "<!DOCTYPE html><html></html>");
    }

    #[test]
    fn void_elements() {
        let output = html(|w| {
            w.write_start_element("", "div", "").unwrap();
            for name in ["BR", "img", "hr", "p"] {
                w.write_start_element("", name, "").unwrap();
                w.write_full_end_element().unwrap();
            }
            w.write_end_element().unwrap();
        });
        assert_eq!(output, "<div><BR><img><hr><p></p></div>");
    }

    #[test]
    fn void_element_with_attributes() {
        let output = html(|w| {
            w.write_start_element("", "img", "").unwrap();
            w.write_attribute_string("", "src", "", "a.png?x=1&y=\"2\"").unwrap();
        });
        assert_eq!(output, r#"<img src="a.png?x=1&amp;y=&quot;2&quot;">"#);
    }

    #[test]
    fn raw_text() {
        let output = html(|w| {
            w.write_start_element("", "body", "").unwrap();
            w.write_element_string("", "STYLE", "", "a > b { }").unwrap();
            w.write_element_string("", "p", "", "a > b & c").unwrap();
        });
        assert_eq!(
            output,
            "<body><STYLE>a > b { }</STYLE><p>a &gt; b &amp; c</p></body>"
        );
    }

    #[test]
    fn processing_instruction() {
        let output = html(|w| {
            w.write_processing_instruction("php", "echo 1;").unwrap();
        });
        assert_eq!(output, "<?php echo 1;>");
    }
}
