use std::iter::FusedIterator;

use super::is_xml10_char;
use crate::errors::IllFormedError::{self, *};

/// Checks if the character corresponds to the [`NameStartChar`] production of
/// the XML specification (both 1.0 and 1.1) excluding the colon, which
/// namespaces reserve as the prefix separator.
///
/// [`NameStartChar`]: https://www.w3.org/TR/xml11/#NT-NameStartChar
#[inline]
pub fn is_ncname_start_char(ch: char) -> bool {
    matches!(ch,
        | 'A'..='Z'
        | '_'
        | 'a'..='z'
        | '\u{00C0}'..='\u{00D6}'
        | '\u{00D8}'..='\u{00F6}'
        | '\u{00F8}'..='\u{02FF}'
        | '\u{0370}'..='\u{037D}'
        | '\u{037F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}'
    )
}

/// Checks if the character corresponds to the [`NameChar`] production of
/// the XML specification (both 1.0 and 1.1) excluding the colon.
///
/// [`NameChar`]: https://www.w3.org/TR/xml11/#NT-NameChar
#[inline]
pub fn is_ncname_char(ch: char) -> bool {
    is_ncname_start_char(ch)
        || matches!(ch, '-'
            | '.'
            | '0'..='9'
            | '\u{00B7}'
            | '\u{0300}'..='\u{036F}'
            | '\u{203F}'..='\u{2040}'
        )
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Reports the violation of the `NCName` or `QName` productions in a name.
///
/// At most one error is reported: a name is either valid or not, the position
/// of the first bad character carries no extra information for the caller.
#[derive(Clone, Debug)]
pub struct NameValidationIter<'i> {
    /// The checked name
    name: &'i str,
    /// If `true`, a single colon separating two non-empty parts is allowed
    qualified: bool,
    /// If `true`, the name was already checked
    done: bool,
}

impl<'i> NameValidationIter<'i> {
    /// Creates an iterator that checks a name without a prefix.
    pub fn ncname(name: &'i str) -> Self {
        Self {
            name,
            qualified: false,
            done: false,
        }
    }

    /// Creates an iterator that checks a name with an optional prefix.
    pub fn qname(name: &'i str) -> Self {
        Self {
            qualified: true,
            ..Self::ncname(name)
        }
    }

    fn check(&self) -> Option<IllFormedError> {
        let name = self.name;
        let invalid = || InvalidName(name.to_owned());
        // Is next character the first character of a name part?
        let mut first = true;
        let mut colon_seen = false;
        for (offset, ch) in name.char_indices() {
            if ch == ':' {
                if !self.qualified || first || colon_seen {
                    return Some(invalid());
                }
                colon_seen = true;
                first = true;
                continue;
            }
            if !is_xml10_char(ch) {
                return Some(InvalidChar(ch, offset));
            }
            let ok = if first {
                is_ncname_start_char(ch)
            } else {
                is_ncname_char(ch)
            };
            if !ok {
                return Some(invalid());
            }
            first = false;
        }
        match (name.is_empty(), first) {
            (true, _) => Some(EmptyName),
            // Dangling colon: `prefix:`
            (false, true) => Some(invalid()),
            _ => None,
        }
    }
}

impl<'i> Iterator for NameValidationIter<'i> {
    type Item = IllFormedError;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.done = true;
        self.check()
    }
}

impl<'i> FusedIterator for NameValidationIter<'i> {}

////////////////////////////////////////////////////////////////////////////////////////////////////
