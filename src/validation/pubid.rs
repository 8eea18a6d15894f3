use std::iter::FusedIterator;
use std::str::CharIndices;

/// Checks if the character corresponds to the [`PubidChar`] production of
/// the XML specification.
///
/// [`PubidChar`]: https://www.w3.org/TR/xml/#NT-PubidChar
#[inline]
pub fn is_pubid_char(ch: char) -> bool {
    matches!(ch,
        ' ' | '\r' | '\n'
        | 'a'..='z'
        | 'A'..='Z'
        | '0'..='9'
        | '-' | '\'' | '(' | ')' | '+' | ',' | '.' | '/' | ':' | '=' | '?' | ';'
        | '!' | '*' | '#' | '@' | '$' | '_' | '%'
    )
}

/// Reports every character of a `DOCTYPE` public identifier which is not
/// allowed there, together with its byte offset.
#[derive(Clone, Debug)]
pub struct PublicIdValidationIter<'i> {
    /// Iterator over characters of the public identifier
    iter: CharIndices<'i>,
}

impl<'i> Iterator for PublicIdValidationIter<'i> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.find(|(_, ch)| !is_pubid_char(*ch))
    }
}

impl<'i> From<&'i str> for PublicIdValidationIter<'i> {
    fn from(value: &'i str) -> Self {
        Self {
            iter: value.char_indices(),
        }
    }
}

impl<'i> FusedIterator for PublicIdValidationIter<'i> {}

////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty() {
        let mut it = PublicIdValidationIter::from("");

        assert_eq!(it.next(), None);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn restricted_chars() {
        let mut it = PublicIdValidationIter::from("-//W3C//DTD \"XHTML\"\t1.0//EN");

        assert_eq!(it.next(), Some((12, '"')));
        assert_eq!(it.next(), Some((18, '"')));
        assert_eq!(it.next(), Some((19, '\t')));
        assert_eq!(it.next(), None);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn valid() {
        let mut it = PublicIdValidationIter::from("-//W3C//DTD XHTML 1.0 Strict//EN");

        assert_eq!(it.next(), None);
        assert_eq!(it.next(), None);
    }
}
