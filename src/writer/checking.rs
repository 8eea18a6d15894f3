use std::borrow::Cow;

use memchr::memchr2;

use super::{BufferedOutput, NewLineHandling, WriteState, WriterSettings, XmlWrite};
use crate::errors::{IllFormedError, Result};
use crate::validation::{
    check_chars, check_ncname, check_public_id, check_qname, check_whitespace,
    interleave_invalid_chars, is_xml10_char,
};

/// Checks a name of an element or an attribute: the local name must be an
/// `NCName`, the prefix, if present, also.
fn check_name(prefix: &str, local_name: &str) -> Result<()> {
    if local_name.is_empty() {
        return Err(IllFormedError::EmptyName.into());
    }
    check_ncname(local_name)?;
    if !prefix.is_empty() {
        check_ncname(prefix)?;
    }
    Ok(())
}

/// Splits CDATA content so that no part contains `]]>`. Each part except the
/// first one starts with the `>` of a split terminator.
fn split_cdata(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.find("]]>") {
            Some(i) => {
                let (part, tail) = current.split_at(i + 2);
                rest = Some(tail);
                Some(part)
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

/// Checks names and characters of everything written and normalizes new
/// lines before forwarding calls to the wrapped writer.
///
/// Text is processed in this order:
/// 1. characters are checked against the XML `Char` production;
/// 2. new lines (`\r\n`, `\r`, `\n`) are replaced with
///    [`WriterSettings::new_line_chars`], except in attribute values where
///    the wrapped writer escapes them;
/// 3. CDATA sections containing `]]>` are split into several sections, and a
///    space is inserted into `--` in comments and `?>` in processing
///    instructions.
///
/// Only the text of a single call is inspected in the last step: `-` at the
/// end of one comment write followed by `-` at the start of the next one is
/// not separated.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_pipeline::writer::{CharCheckingWriter, WriterSettings, XmlRawWriter, XmlWrite};
///
/// let settings = WriterSettings {
///     new_line_chars: "\r\n".to_string(),
///     ..WriterSettings::default()
/// };
/// let raw = XmlRawWriter::with_settings(Vec::new(), &settings);
/// let mut writer = CharCheckingWriter::new(raw, &settings);
///
/// writer.write_start_element("", "root", "").unwrap();
/// writer.write_comment("a--b").unwrap();
/// writer.write_string("1\n2").unwrap();
/// assert!(writer.write_string("\u{0}").is_err());
/// assert!(writer.write_start_element("", "1st", "").is_err());
/// writer.write_end_element().unwrap();
/// writer.flush().unwrap();
///
/// assert_eq!(
///     writer.into_inner().into_inner(),
///     b"<root><!--a- -b-->1\r\n2</root>"
/// );
/// ```
pub struct CharCheckingWriter<W> {
    inner: W,
    check_values: bool,
    check_names: bool,
    replace_new_lines: bool,
    new_line_chars: String,
    in_attribute: bool,
}

impl<W: XmlWrite> CharCheckingWriter<W> {
    /// Wraps `inner`. Character checks are enabled by
    /// [`WriterSettings::check_characters`], new line replacement by
    /// [`WriterSettings::new_line_handling`].
    pub fn new(inner: W, settings: &WriterSettings) -> Self {
        Self {
            inner,
            check_values: settings.check_characters,
            check_names: settings.check_characters,
            replace_new_lines: settings.new_line_handling == NewLineHandling::Replace,
            new_line_chars: settings.new_line_chars.clone(),
            in_attribute: false,
        }
    }

    /// Returns a reference to the wrapped writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consumes the checker, returning the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn check_value(&self, text: &str) -> Result<()> {
        if self.check_values {
            check_chars(text)?;
        }
        Ok(())
    }

    /// Replaces every new line sequence in `text` with the configured one.
    fn replace_new_lines<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if !self.replace_new_lines || memchr2(b'\r', b'\n', text.as_bytes()).is_none() {
            return Cow::Borrowed(text);
        }
        if self.new_line_chars == "\n" && !text.contains('\r') {
            return Cow::Borrowed(text);
        }
        let mut result = String::with_capacity(text.len() + 8);
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\r' => {
                    chars.next_if_eq(&'\n');
                    result.push_str(&self.new_line_chars);
                }
                '\n' => result.push_str(&self.new_line_chars),
                _ => result.push(ch),
            }
        }
        Cow::Owned(result)
    }

    /// Checks characters of the text and replaces new lines in it if it is
    /// not an attribute value.
    fn prepare_text<'t>(&self, text: &'t str) -> Result<Cow<'t, str>> {
        self.check_value(text)?;
        Ok(if self.in_attribute {
            Cow::Borrowed(text)
        } else {
            self.replace_new_lines(text)
        })
    }
}

impl<W: XmlWrite> XmlWrite for CharCheckingWriter<W> {
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
        self.in_attribute = false;
        self.inner.write_end_document()
    }

    fn write_doc_type(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        subset: Option<&str>,
    ) -> Result<()> {
        if self.check_names {
            check_qname(name)?;
        }
        if self.check_values {
            if let Some(public_id) = public_id {
                check_public_id(public_id)?;
            }
            if let Some(system_id) = system_id {
                check_chars(system_id)?;
            }
            if let Some(subset) = subset {
                check_chars(subset)?;
            }
        }
        let subset = subset.map(|s| self.replace_new_lines(s));
        self.inner
            .write_doc_type(name, public_id, system_id, subset.as_deref())
    }

    fn write_start_element(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        if self.check_names {
            check_name(prefix, local_name)?;
        }
        self.in_attribute = false;
        self.inner.write_start_element(prefix, local_name, namespace)
    }

    fn write_end_element(&mut self) -> Result<()> {
        self.in_attribute = false;
        self.inner.write_end_element()
    }

    fn write_full_end_element(&mut self) -> Result<()> {
        self.in_attribute = false;
        self.inner.write_full_end_element()
    }

    fn write_start_attribute(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        if self.check_names {
            check_name(prefix, local_name)?;
        }
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
        let text = self.prepare_text(text)?;
        for part in split_cdata(&text) {
            self.inner.write_cdata(part)?;
        }
        Ok(())
    }

    fn write_comment(&mut self, text: &str) -> Result<()> {
        let text = self.prepare_text(text)?;
        self.inner
            .write_comment(&interleave_invalid_chars(&text, '-', '-'))
    }

    fn write_processing_instruction(&mut self, name: &str, text: &str) -> Result<()> {
        if self.check_names {
            check_ncname(name)?;
            if name.eq_ignore_ascii_case("xml") {
                return Err(IllFormedError::InvalidName(name.to_owned()).into());
            }
        }
        let text = self.prepare_text(text)?;
        self.inner
            .write_processing_instruction(name, &interleave_invalid_chars(&text, '?', '>'))
    }

    fn write_entity_ref(&mut self, name: &str) -> Result<()> {
        if self.check_names {
            check_ncname(name)?;
        }
        self.inner.write_entity_ref(name)
    }

    fn write_char_entity(&mut self, ch: char) -> Result<()> {
        if self.check_values && !is_xml10_char(ch) {
            return Err(IllFormedError::InvalidChar(ch, 0).into());
        }
        self.inner.write_char_entity(ch)
    }

    fn write_whitespace(&mut self, whitespace: &str) -> Result<()> {
        if self.check_values {
            check_whitespace(whitespace)?;
        }
        let whitespace = self.prepare_text(whitespace)?;
        self.inner.write_whitespace(&whitespace)
    }

    fn write_string(&mut self, text: &str) -> Result<()> {
        let text = self.prepare_text(text)?;
        self.inner.write_string(&text)
    }

    fn write_raw(&mut self, data: &str) -> Result<()> {
        self.check_value(data)?;
        self.inner.write_raw(data)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    fn close(&mut self) -> Result<()> {
        self.in_attribute = false;
        self.inner.close()
    }
}

impl<W: BufferedOutput> BufferedOutput for CharCheckingWriter<W> {
    fn take_output(&mut self) -> Result<Vec<u8>> {
        self.inner.take_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::XmlRawWriter;
    use pretty_assertions::assert_eq;

    fn checked(settings: &WriterSettings) -> CharCheckingWriter<XmlRawWriter<Vec<u8>>> {
        CharCheckingWriter::new(XmlRawWriter::with_settings(Vec::new(), settings), settings)
    }

    fn output(mut writer: CharCheckingWriter<XmlRawWriter<Vec<u8>>>) -> String {
        writer.close().unwrap();
        String::from_utf8(writer.into_inner().into_inner()).unwrap()
    }

    #[test]
    fn split() {
        assert_eq!(split_cdata("").collect::<Vec<_>>(), [""]);
        assert_eq!(split_cdata("abc").collect::<Vec<_>>(), ["abc"]);
        assert_eq!(split_cdata("a]]>b").collect::<Vec<_>>(), ["a]]", ">b"]);
        assert_eq!(split_cdata("]]>]]>").collect::<Vec<_>>(), ["]]", ">]]", ">"]);
    }

    mod names {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn element() {
            let mut writer = checked(&WriterSettings::default());
            assert_eq!(
                writer.write_start_element("", "", "").unwrap_err().as_ill_formed(),
                Some(&IllFormedError::EmptyName)
            );
            assert!(writer.write_start_element("", "a:b", "").is_err());
            assert!(writer.write_start_element("1", "a", "urn:x").is_err());
            writer.write_start_element("p", "a", "urn:x").unwrap();
            assert!(writer.write_start_attribute("", "a b", "").is_err());
            writer.write_attribute_string("", "_a.b-c", "", "").unwrap();
        }

        #[test]
        fn processing_instruction() {
            let mut writer = checked(&WriterSettings::default());
            assert!(writer.write_processing_instruction("XmL", "").is_err());
            assert!(writer.write_processing_instruction("a b", "").is_err());
            writer.write_processing_instruction("xml-stylesheet", "").unwrap();
        }

        #[test]
        fn unchecked() {
            let settings = WriterSettings {
                check_characters: false,
                ..WriterSettings::default()
            };
            let mut writer = checked(&settings);
            writer.write_start_element("", "1", "").unwrap();
            writer.write_string("\u{1}").unwrap();
            assert_eq!(output(writer), "<1>\u{1}</1>");
        }
    }

    #[test]
    fn invalid_chars() {
        let mut writer = checked(&WriterSettings::default());
        writer.write_start_element("", "a", "").unwrap();
        assert_eq!(
            writer.write_string("ok\u{B}").unwrap_err().as_ill_formed(),
            Some(&IllFormedError::InvalidChar('\u{B}', 2))
        );
        assert!(writer.write_cdata("\u{FFFE}").is_err());
        assert!(writer.write_comment("\u{0}").is_err());
        assert!(writer.write_char_entity('\u{1}').is_err());
        assert_eq!(
            writer.write_whitespace(" x").unwrap_err().as_ill_formed(),
            Some(&IllFormedError::NotWhitespace('x', 1))
        );
        writer.write_char_entity('\u{1F600}').unwrap();
        assert_eq!(output(writer), "<a>&#x1F600;</a>");
    }

    #[test]
    fn new_lines() {
        let settings = WriterSettings {
            new_line_chars: "\r\n".to_string(),
            ..WriterSettings::default()
        };
        let mut writer = checked(&settings);
        writer.write_start_element("", "a", "").unwrap();
        writer.write_attribute_string("", "b", "", "1\r\n2\n").unwrap();
        writer.write_string("1\r\n2\r3\n").unwrap();
        writer.write_whitespace("\n").unwrap();
        writer.write_cdata("\r").unwrap();
        assert_eq!(
            output(writer),
            "<a b=\"1&#xD;&#xA;2&#xA;\">1\r\n2\r\n3\r\n\r\n<![CDATA[\r\n]]></a>"
        );
    }

    #[test]
    fn new_lines_kept() {
        let settings = WriterSettings {
            new_line_handling: NewLineHandling::None,
            ..WriterSettings::default()
        };
        let mut writer = checked(&settings);
        writer.write_element_string("", "a", "", "1\r\n2\r").unwrap();
        assert_eq!(output(writer), "<a>1\r\n2\r</a>");
    }

    #[test]
    fn cdata_terminator() {
        let mut writer = checked(&WriterSettings::default());
        writer.write_start_element("", "a", "").unwrap();
        writer.write_cdata("x]]>y").unwrap();
        assert_eq!(output(writer), "<a><![CDATA[x]]]]><![CDATA[>y]]></a>");
    }

    #[test]
    fn interleaved() {
        let mut writer = checked(&WriterSettings::default());
        writer.write_start_element("", "a", "").unwrap();
        writer.write_comment("-x--y-").unwrap();
        writer.write_processing_instruction("pi", "a?>b?").unwrap();
        assert_eq!(output(writer), "<a><!---x- -y- --><?pi a? >b? ?></a>");
    }
}
