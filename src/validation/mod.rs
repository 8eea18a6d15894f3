//! Character and name checks shared by the checking reader and the checking
//! writer.
//!
//! Each check is an iterator over the violations found in a string, so the
//! caller decides whether to stop at the first one or to collect all.

use crate::errors::IllFormedError;

mod interleave;
mod name;
mod pubid;
mod text;

pub use interleave::*;
pub use name::*;
pub use pubid::*;
pub use text::*;

/// Checks if the character corresponds to the [`Char`] production of
/// the XML 1.0 specification.
///
/// Any Unicode character, excluding the surrogate blocks, FFFE, and FFFF.
///
/// [`Char`]: https://www.w3.org/TR/xml/#NT-Char
#[inline]
pub fn is_xml10_char(ch: char) -> bool {
    matches!(ch,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{0020}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Checks if the character corresponds to the [`S`] production of
/// the XML specification.
///
/// [`S`]: https://www.w3.org/TR/xml/#NT-S
#[inline]
pub fn is_xml_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

/// Returns `true` if the string is formed only by XML whitespace characters.
/// An empty string is considered whitespace.
#[inline]
pub fn is_whitespace_only(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

/// Checks that all characters of `text` are allowed in XML 1.0 documents.
pub fn check_chars(text: &str) -> Result<(), IllFormedError> {
    match CharValidationIter::from(text).next() {
        Some((offset, ch)) => Err(IllFormedError::InvalidChar(ch, offset)),
        None => Ok(()),
    }
}

/// Checks that `text` consists only of whitespace characters.
pub fn check_whitespace(text: &str) -> Result<(), IllFormedError> {
    match text.char_indices().find(|(_, ch)| !is_xml_whitespace(*ch)) {
        Some((offset, ch)) => Err(IllFormedError::NotWhitespace(ch, offset)),
        None => Ok(()),
    }
}

/// Checks that `name` is a non-colonized name ([`NCName`]).
///
/// [`NCName`]: https://www.w3.org/TR/xml-names11/#NT-NCName
pub fn check_ncname(name: &str) -> Result<(), IllFormedError> {
    match NameValidationIter::ncname(name).next() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Checks that `name` is a qualified name ([`QName`]): an `NCName`, optionally
/// preceded by an `NCName` prefix and a colon.
///
/// [`QName`]: https://www.w3.org/TR/xml-names11/#NT-QName
pub fn check_qname(name: &str) -> Result<(), IllFormedError> {
    match NameValidationIter::qname(name).next() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Checks that `id` contains only characters allowed in public identifiers.
pub fn check_public_id(id: &str) -> Result<(), IllFormedError> {
    match PublicIdValidationIter::from(id).next() {
        Some((offset, ch)) => Err(IllFormedError::InvalidPublicIdChar(ch, offset)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn whitespace() {
        assert_eq!(check_whitespace(" \t\r\n"), Ok(()));
        assert_eq!(check_whitespace(""), Ok(()));
        assert_eq!(
            check_whitespace("  x"),
            Err(IllFormedError::NotWhitespace('x', 2))
        );
        assert!(is_whitespace_only("\n  "));
        assert!(!is_whitespace_only("\u{A0}"));
    }

    #[test]
    fn chars() {
        assert_eq!(check_chars("text"), Ok(()));
        assert_eq!(
            check_chars("a\u{1}"),
            Err(IllFormedError::InvalidChar('\u{1}', 1))
        );
    }

    #[test]
    fn names() {
        assert_eq!(check_ncname("name"), Ok(()));
        assert_eq!(
            check_ncname("a:b"),
            Err(IllFormedError::InvalidName("a:b".into()))
        );
        assert_eq!(check_qname("a:b"), Ok(()));
        assert_eq!(check_ncname(""), Err(IllFormedError::EmptyName));
    }
}
