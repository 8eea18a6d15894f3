use std::iter::FusedIterator;
use std::str::CharIndices;

use super::is_xml10_char;

/// Reports every character of a text which is not allowed in XML 1.0
/// documents, together with its byte offset.
#[derive(Clone, Debug)]
pub struct CharValidationIter<'i> {
    /// Iterator over characters of the text
    iter: CharIndices<'i>,
}

impl<'i> From<&'i str> for CharValidationIter<'i> {
    fn from(value: &'i str) -> Self {
        Self {
            iter: value.char_indices(),
        }
    }
}

impl<'i> Iterator for CharValidationIter<'i> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.find(|(_, ch)| !is_xml10_char(*ch))
    }
}

impl<'i> FusedIterator for CharValidationIter<'i> {}

////////////////////////////////////////////////////////////////////////////////////////////////////
