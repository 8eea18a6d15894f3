//! Utility functions for integration tests
// Not all tests use all helpers
#![allow(dead_code)]

use xml_pipeline::writer::{WriterSettings, XmlWrite};
use xml_pipeline::{NodeKind, Result, XmlRead};

/// Reads all remaining nodes and returns their kinds, names and values.
pub fn read_nodes<R: XmlRead + ?Sized>(reader: &mut R) -> Result<Vec<(NodeKind, String, String)>> {
    let mut nodes = Vec::new();
    while reader.read()? {
        nodes.push((reader.node_kind(), reader.name(), reader.value().to_owned()));
    }
    Ok(nodes)
}

/// Reads all remaining nodes and returns their kinds.
pub fn read_kinds<R: XmlRead + ?Sized>(reader: &mut R) -> Result<Vec<NodeKind>> {
    Ok(read_nodes(reader)?.into_iter().map(|(kind, ..)| kind).collect())
}

/// Moves the reader to the first element with the specified name.
pub fn move_to_element<R: XmlRead + ?Sized>(reader: &mut R, name: &str) {
    while reader.read().unwrap() {
        if reader.node_kind() == NodeKind::Element && reader.name() == name {
            return;
        }
    }
    panic!("element `{}` not found", name);
}

/// Calls `read` with windows of `chunk` bytes until it returns `0` and
/// concatenates everything that was decoded.
pub fn read_chunked<F>(chunk: usize, mut read: F) -> Result<Vec<u8>>
where
    F: FnMut(&mut [u8]) -> Result<usize>,
{
    let mut result = Vec::new();
    let mut buf = vec![0; chunk];
    loop {
        let len = read(&mut buf)?;
        if len == 0 {
            return Ok(result);
        }
        assert!(len <= chunk, "decoded {} bytes into a window of {}", len, chunk);
        result.extend_from_slice(&buf[..len]);
    }
}

/// Runs `write` over a writer chain created from `settings` and returns the
/// produced document.
pub fn write_with<F>(settings: &WriterSettings, write: F) -> String
where
    F: FnOnce(&mut dyn XmlWrite) -> Result<()>,
{
    let mut sink = Vec::new();
    {
        let mut writer = settings.create_writer(&mut sink);
        write(&mut *writer).unwrap();
        writer.close().unwrap();
    }
    String::from_utf8(sink).unwrap()
}

/// Settings of a writer without the XML declaration.
pub fn no_declaration() -> WriterSettings {
    WriterSettings {
        omit_xml_declaration: true,
        ..WriterSettings::default()
    }
}
