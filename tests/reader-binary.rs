//! Tests of incremental Base64 and BinHex reading through reader chains.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pretty_assertions::assert_eq;
use xml_pipeline::errors::{IllFormedError, MisuseError};
use xml_pipeline::reader::{CachingReader, SubtreeReader};
use xml_pipeline::{NodeKind, ReaderSettings, TextReader, XmlRead};

mod helpers;
use helpers::{move_to_element, read_chunked};

/// Bytes which cover all possible values.
fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

fn to_bin_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

#[test]
fn element_content_in_small_chunks() {
    let mut reader = ReaderSettings::default().create_reader("<r><a>SGVsbG8=</a></r>");
    move_to_element(&mut *reader, "a");

    let mut buf = [0; 3];
    assert_eq!(reader.read_element_content_as_base64(&mut buf).unwrap(), 3);
    assert_eq!(&buf, b"Hel");
    assert_eq!(reader.read_element_content_as_base64(&mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], b"lo");
    assert_eq!(reader.read_element_content_as_base64(&mut buf).unwrap(), 0);

    // Positioned after `</a>`
    assert_eq!(reader.node_kind(), NodeKind::EndElement);
    assert_eq!(reader.name(), "r");
}

mod chunk_size_does_not_matter {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base64_element(chunk: usize) {
        let data = sample_bytes(1000);
        let xml = format!("<r><data>{}</data><next/></r>", STANDARD.encode(&data));
        let mut reader = ReaderSettings::default().create_reader(&xml);
        move_to_element(&mut *reader, "data");

        let decoded = read_chunked(chunk, |buf| reader.read_element_content_as_base64(buf)).unwrap();
        assert_eq!(decoded, data);
        assert_eq!(reader.name(), "next");
    }

    fn bin_hex_content(chunk: usize) {
        let data = sample_bytes(300);
        let xml = format!("<r>{}</r>", to_bin_hex(&data));
        let mut reader = TextReader::from_str(&xml);
        reader.read().unwrap();
        reader.read().unwrap();
        assert_eq!(reader.node_kind(), NodeKind::Text);

        let decoded = read_chunked(chunk, |buf| reader.read_content_as_bin_hex(buf)).unwrap();
        assert_eq!(decoded, data);
        assert_eq!(reader.node_kind(), NodeKind::EndElement);
    }

    #[test]
    fn base64_1() {
        base64_element(1);
    }

    #[test]
    fn base64_2() {
        base64_element(2);
    }

    #[test]
    fn base64_7() {
        base64_element(7);
    }

    #[test]
    fn base64_256() {
        base64_element(256);
    }

    #[test]
    fn base64_larger_than_content() {
        base64_element(4096);
    }

    #[test]
    fn bin_hex_1() {
        bin_hex_content(1);
    }

    #[test]
    fn bin_hex_5() {
        bin_hex_content(5);
    }

    #[test]
    fn bin_hex_larger_than_content() {
        bin_hex_content(1024);
    }
}

/// Content is continued by CDATA sections, comments and processing
/// instructions are skipped
#[test]
fn content_across_nodes() {
    let xml = "<r><a>SG<![CDATA[VsbG]]>8sIHdv<!--comment-->cmxk<?pi?>IQ==</a></r>";
    for chunk in [1, 4, 100] {
        let mut reader = ReaderSettings::default().create_reader(xml);
        move_to_element(&mut *reader, "a");

        let decoded = read_chunked(chunk, |buf| reader.read_element_content_as_base64(buf)).unwrap();
        assert_eq!(decoded, b"Hello, world!", "chunk size {}", chunk);
        assert_eq!(reader.name(), "r");
    }
}

#[test]
fn whitespace_between_digits() {
    let mut reader = ReaderSettings::default().create_reader("<a>\n  SGVs\n  bG8=\n</a>");
    reader.read().unwrap();

    let decoded = read_chunked(2, |buf| reader.read_element_content_as_base64(buf)).unwrap();
    assert_eq!(decoded, b"Hello");
}

#[test]
fn empty_element() {
    let mut reader = ReaderSettings::default().create_reader("<r><a/><b></b></r>");
    move_to_element(&mut *reader, "a");

    let mut buf = [0; 4];
    assert_eq!(reader.read_element_content_as_base64(&mut buf).unwrap(), 0);
    assert_eq!(reader.name(), "b");
    assert_eq!(reader.read_element_content_as_base64(&mut buf).unwrap(), 0);
    assert_eq!(reader.node_kind(), NodeKind::EndElement);
    assert_eq!(reader.name(), "r");
}

#[test]
fn zero_window() {
    let mut reader = ReaderSettings::default().create_reader("<r><a>SGVsbG8=</a></r>");
    move_to_element(&mut *reader, "a");

    assert_eq!(reader.read_element_content_as_base64(&mut []).unwrap(), 0);
    // Reader was not moved
    assert_eq!(reader.node_kind(), NodeKind::Element);
    assert_eq!(reader.name(), "a");

    let mut buf = [0; 2];
    assert_eq!(reader.read_element_content_as_base64(&mut buf).unwrap(), 2);
    assert_eq!(reader.read_element_content_as_base64(&mut []).unwrap(), 0);

    let rest = read_chunked(8, |buf| reader.read_element_content_as_base64(buf)).unwrap();
    assert_eq!(rest, b"llo");
}

#[test]
fn mixing_methods() {
    let mut reader = ReaderSettings::default().create_reader("<r><a>SGVsbG8=</a></r>");
    move_to_element(&mut *reader, "a");

    let mut buf = [0; 2];
    assert_eq!(reader.read_element_content_as_base64(&mut buf).unwrap(), 2);

    let mut other = [0xAA; 4];
    let error = reader.read_element_content_as_bin_hex(&mut other).unwrap_err();
    assert_eq!(
        error.as_misuse(),
        Some(&MisuseError::MixingBinaryContentMethods)
    );
    assert_eq!(other, [0xAA; 4]);

    let error = reader.read_content_as_base64(&mut other).unwrap_err();
    assert_eq!(
        error.as_misuse(),
        Some(&MisuseError::MixingBinaryContentMethods)
    );
    assert_eq!(other, [0xAA; 4]);

    // The first read can be continued
    let rest = read_chunked(8, |buf| reader.read_element_content_as_base64(buf)).unwrap();
    assert_eq!(rest, b"llo");
}

#[test]
fn wrong_node() {
    let mut reader = ReaderSettings::default().create_reader("<r>text</r>");
    reader.read().unwrap();

    let mut buf = [0; 4];
    let error = reader.read_content_as_base64(&mut buf).unwrap_err();
    assert_eq!(
        error.as_misuse(),
        Some(&MisuseError::ContentNotSupported {
            method: "read_content_as_base64",
            kind: NodeKind::Element,
        })
    );

    reader.read().unwrap();
    let error = reader.read_element_content_as_bin_hex(&mut buf).unwrap_err();
    assert_eq!(
        error.as_misuse(),
        Some(&MisuseError::NotOnElement {
            method: "read_element_content_as_bin_hex",
            kind: NodeKind::Text,
        })
    );
}

#[test]
fn nested_element_is_not_content() {
    let mut reader = ReaderSettings::default().create_reader("<a>SGVs<b/>bG8=</a>");
    reader.read().unwrap();

    let mut buf = [0; 16];
    assert_eq!(reader.read_element_content_as_base64(&mut buf).unwrap(), 3);
    let error = reader.read_element_content_as_base64(&mut buf).unwrap_err();
    assert_eq!(
        error.as_ill_formed(),
        Some(&IllFormedError::UnexpectedNode(NodeKind::Element))
    );
}

#[test]
fn invalid_characters() {
    let mut reader = ReaderSettings::default().create_reader("<a>SG!s</a>");
    reader.read().unwrap();

    let mut buf = [0; 16];
    let error = reader.read_element_content_as_base64(&mut buf).unwrap_err();
    assert_eq!(error.as_ill_formed(), Some(&IllFormedError::InvalidBase64('!')));

    let mut reader = ReaderSettings::default().create_reader("<a>4G</a>");
    reader.read().unwrap();
    let error = reader.read_element_content_as_bin_hex(&mut buf).unwrap_err();
    assert_eq!(error.as_ill_formed(), Some(&IllFormedError::InvalidBinHex('G')));
}

/// Only whitespace may follow the padding, wherever the text is split
mod data_after_padding {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Decodes content of the root element in windows of `chunk` bytes
    fn decode(xml: &str, chunk: usize) -> xml_pipeline::Result<usize> {
        let mut reader = ReaderSettings::default().create_reader(xml);
        reader.read().unwrap();

        let mut buf = vec![0; chunk];
        let mut total = 0;
        loop {
            match reader.read_element_content_as_base64(&mut buf)? {
                0 => return Ok(total),
                len => total += len,
            }
        }
    }

    fn assert_rejected(xml: &str) {
        for chunk in [1, 3, 1024] {
            let error = decode(xml, chunk).unwrap_err();
            assert_eq!(
                error.as_ill_formed(),
                Some(&IllFormedError::InvalidBase64('S')),
                "window of {} bytes",
                chunk
            );
        }
    }

    #[test]
    fn same_text() {
        assert_rejected("<a>SGk=SGk=</a>");
    }

    #[test]
    fn next_cdata() {
        assert_rejected("<a>SGk=<![CDATA[SGk=]]></a>");
    }

    #[test]
    fn after_comment() {
        assert_rejected("<a>SGk=\n<!-- -->\nSGk=</a>");
    }

    /// Padding is the last character of a 256 bytes long piece of text
    #[test]
    fn long_text() {
        let xml = format!("<a>{}SGk=SGk=</a>", "A".repeat(252));
        assert_rejected(&xml);
    }

    #[test]
    fn padding_and_whitespace() {
        assert_eq!(decode("<a>SA=<![CDATA[=]]>\n </a>", 1).unwrap(), 1);
        assert_eq!(decode("<a>SGk= \n<![CDATA[ ]]></a>", 1024).unwrap(), 2);
    }
}

#[test]
fn odd_bin_hex_digits() {
    let mut reader = ReaderSettings::default().create_reader("<a>414<!-- -->2 4</a>");
    reader.read().unwrap();

    let mut buf = [0; 16];
    let error = reader.read_element_content_as_bin_hex(&mut buf).unwrap_err();
    assert_eq!(error.as_ill_formed(), Some(&IllFormedError::OddBinHexCount));
}

/// A binary read abandoned in the middle is finished by the next `read`,
/// which then moves on from the node that follows the element
#[test]
fn abandoned_read() {
    let mut reader = ReaderSettings::default().create_reader("<r><a>SGVsbG8=</a><b/><c/></r>");
    move_to_element(&mut *reader, "a");

    let mut buf = [0; 3];
    assert_eq!(reader.read_element_content_as_base64(&mut buf).unwrap(), 3);

    assert_eq!(reader.read().unwrap(), true);
    assert_eq!(reader.name(), "c");

    // A new read can be started after that
    let mut reader = ReaderSettings::default().create_reader("<r><a>SGVs</a><b/>bG8=</r>");
    move_to_element(&mut *reader, "a");
    assert_eq!(reader.read_element_content_as_base64(&mut [0; 1]).unwrap(), 1);

    reader.read().unwrap();
    assert_eq!(reader.node_kind(), NodeKind::Text);
    let decoded = read_chunked(1, |buf| reader.read_content_as_base64(buf)).unwrap();
    assert_eq!(decoded, b"lo");
}

#[test]
fn attribute_value() {
    let mut reader = ReaderSettings::default().create_reader(r#"<a data="SGVsbG8=" next="x"/>"#);
    reader.read().unwrap();
    assert!(reader.move_to_first_attribute());

    let decoded = read_chunked(2, |buf| reader.read_content_as_base64(buf)).unwrap();
    assert_eq!(decoded, b"Hello");
    // The attribute is the whole content, reader stays on it
    assert_eq!(reader.node_kind(), NodeKind::Attribute);
    assert_eq!(reader.name(), "data");
}

#[test]
fn through_subtree() {
    let mut reader = TextReader::from_str("<r><a>SGVsbG8=</a><b/></r>");
    move_to_element(&mut reader, "a");

    {
        let mut subtree = SubtreeReader::new(&mut reader).unwrap();
        let decoded =
            read_chunked(4, |buf| subtree.read_element_content_as_base64(buf)).unwrap();
        assert_eq!(decoded, b"Hello");
        assert_eq!(subtree.read().unwrap(), false);
    }

    reader.read().unwrap();
    assert_eq!(reader.name(), "b");
}

#[test]
fn through_replay() {
    let mut reader = TextReader::from_str("<r><a>SGVs<![CDATA[bG8=]]></a><b/></r>");
    move_to_element(&mut reader, "a");

    let mut caching = CachingReader::new(reader);
    // Record the start element and the first text node only
    caching.read().unwrap();
    caching.start_replay().unwrap();
    assert_eq!(caching.name(), "a");

    let decoded = read_chunked(2, |buf| caching.read_element_content_as_base64(buf)).unwrap();
    assert_eq!(decoded, b"Hello");
    assert_eq!(caching.name(), "b");
}
