use std::borrow::Cow;

/// Inserts a space between every `first` character immediately followed by
/// `second`, and after a trailing `first`, so that the text can be placed
/// before a closing sequence that starts with `first` (`-->` for comments,
/// `?>` for processing instructions).
///
/// Only the given text is inspected. If the previous write to the same comment
/// ended with `first` and this text starts with `second`, the sequence is not
/// broken. This is a known limitation kept for compatibility with documents
/// produced by earlier writers.
pub fn interleave_invalid_chars(text: &str, first: char, second: char) -> Cow<str> {
    let mut result = String::new();
    let mut start = 0;
    let mut prev = None;
    for (i, ch) in text.char_indices() {
        if ch == second && prev == Some(first) {
            result.push_str(&text[start..i]);
            result.push(' ');
            start = i;
        }
        prev = Some(ch);
    }
    let trailing = prev == Some(first);
    if start == 0 && result.is_empty() {
        if trailing {
            return Cow::Owned(format!("{} ", text));
        }
        return Cow::Borrowed(text);
    }
    result.push_str(&text[start..]);
    if trailing {
        result.push(' ');
    }
    Cow::Owned(result)
}

////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty() {
        assert_eq!(interleave_invalid_chars("", '-', '-'), "");
    }

    mod dash {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn at_start() {
            assert_eq!(interleave_invalid_chars("- -", '-', '-'), "- - ");
        }

        #[test]
        fn in_middle() {
            assert_eq!(interleave_invalid_chars(" - x", '-', '-'), " - x");
        }

        #[test]
        fn at_end() {
            assert_eq!(interleave_invalid_chars(" -", '-', '-'), " - ");
        }
    }

    mod two_dashes {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn at_start() {
            assert_eq!(interleave_invalid_chars("-- x", '-', '-'), "- - x");
        }

        #[test]
        fn in_middle() {
            assert_eq!(interleave_invalid_chars(" -- x", '-', '-'), " - - x");
        }

        #[test]
        fn at_end() {
            assert_eq!(interleave_invalid_chars(" ---", '-', '-'), " - - - ");
        }
    }

    #[test]
    fn processing_instruction() {
        assert_eq!(interleave_invalid_chars("a?>b", '?', '>'), "a? >b");
        assert_eq!(interleave_invalid_chars("a?", '?', '>'), "a? ");
        assert_eq!(interleave_invalid_chars("a>?b", '?', '>'), "a>?b");
    }

    #[test]
    fn valid() {
        let text = "<<&&<<just - text>>&&>>";
        assert!(matches!(
            interleave_invalid_chars(text, '-', '-'),
            Cow::Borrowed(_)
        ));
    }
}
