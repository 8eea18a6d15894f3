//! Benchmarks of incremental binary content reading.
//!
//! Run with: cargo bench --bench binary

use std::hint::black_box;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use xml_pipeline::binary::{Base64Decoder, IncrementalDecoder};
use xml_pipeline::{NodeKind, ReaderSettings, TextReader, XmlRead};

/// Document with one element holding `len` bytes encoded as Base64, split
/// into lines of 76 characters.
fn document(len: usize) -> String {
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    let encoded = STANDARD.encode(data);
    let mut xml = String::from("<root><data>");
    for line in encoded.as_bytes().chunks(76) {
        xml.push('\n');
        xml.push_str(std::str::from_utf8(line).unwrap());
    }
    xml.push_str("\n</data></root>");
    xml
}

fn read_element(mut reader: impl XmlRead, buf: &mut [u8]) -> usize {
    while reader.read().unwrap() {
        if reader.node_kind() == NodeKind::Element && reader.local_name() == "data" {
            break;
        }
    }
    let mut total = 0;
    loop {
        let len = reader.read_element_content_as_base64(buf).unwrap();
        if len == 0 {
            return total;
        }
        total += len;
    }
}

/// Reads the same content with different window sizes
fn chunk_sizes(c: &mut Criterion) {
    let xml = document(64 * 1024);
    let mut group = c.benchmark_group("read_element_content_as_base64");
    group.throughput(Throughput::Bytes(xml.len() as u64));

    for chunk in [16, 256, 4096, 65536] {
        let mut buf = vec![0; chunk];
        group.bench_with_input(BenchmarkId::new("text", chunk), &xml, |b, xml| {
            b.iter(|| read_element(TextReader::from_str(black_box(xml)), &mut buf))
        });
        group.bench_with_input(BenchmarkId::new("checked", chunk), &xml, |b, xml| {
            let settings = ReaderSettings::default();
            b.iter(|| read_element(settings.create_reader(black_box(xml)), &mut buf))
        });
    }
    group.finish();
}

/// Decoder alone, without a reader
fn decoder(c: &mut Criterion) {
    let encoded = STANDARD.encode(vec![0xA5; 64 * 1024]);
    let mut buf = vec![0; 64 * 1024];

    let mut group = c.benchmark_group("Base64Decoder");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("decode", |b| {
        b.iter(|| {
            let mut decoder = Base64Decoder::default();
            let decoded = decoder.decode(black_box(&encoded), &mut buf).unwrap();
            decoder.finish().unwrap();
            decoded.produced
        })
    });
    group.finish();
}

criterion_group!(benches, chunk_sizes, decoder);
criterion_main!(benches);
