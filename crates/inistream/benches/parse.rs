//! Benchmark: `inistream::Parser` over a generated configuration document
#![allow(missing_docs)]

use std::{
    cell::{Cell, RefCell},
    fmt::Write,
    time::Duration,
};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use inistream::{HeapParser, InlineParser, ParserOptions, ValueContext};

/// A deterministic document of `sections` groups, each holding a string, a
/// decimal, a hexadecimal and a negative value plus a comment.
fn make_document(sections: usize) -> String {
    let mut doc = String::from("# generated\n");
    for i in 0..sections {
        let (count, color, offset) = (i * 7, i * 0x1F1F, 1 + i % 3600);
        writeln!(doc, "[section{i}]\nname = 'item number {i}' # label").unwrap();
        writeln!(doc, "count = {count}\ncolor = 0x{color:06X}\r\noffset = -{offset}").unwrap();
    }
    doc
}

struct Targets {
    name: RefCell<heapless::String<32>>,
    count: Cell<u32>,
    color: Cell<u32>,
    offset: Cell<i32>,
}

impl Targets {
    fn new() -> Self {
        Self {
            name: RefCell::new(heapless::String::new()),
            count: Cell::new(0),
            color: Cell::new(0),
            offset: Cell::new(0),
        }
    }

    fn claim<'t>(&'t self, ctx: &mut ValueContext<'_, 't>) -> bool {
        match ctx.key() {
            "name" => ctx.map_str(&self.name),
            "count" => ctx.map_u32(&self.count, ..),
            "color" => ctx.map_hex_u32(&self.color, ..=0xFF_FFFF),
            "offset" => ctx.map_i32(&self.offset, -3600..=0),
            _ => {}
        }
        true
    }
}

fn bench_chunked(c: &mut Criterion) {
    let doc = make_document(200);
    let mut group = c.benchmark_group("parse_chunked");
    group.throughput(Throughput::Bytes(doc.len() as u64));

    for &size in &[1usize, 64, 4096] {
        group.bench_with_input(BenchmarkId::new("claimed", size), &size, |b, &size| {
            let targets = Targets::new();
            b.iter(|| {
                let mut parser = HeapParser::new(|ctx| targets.claim(ctx));
                for chunk in black_box(doc.as_bytes()).chunks(size) {
                    parser.feed_chunk(chunk).unwrap();
                }
                parser.finish().unwrap();
            });
        });
        group.bench_with_input(BenchmarkId::new("skipped", size), &size, |b, &size| {
            b.iter(|| {
                let mut parser = HeapParser::new(|_| true);
                for chunk in black_box(doc.as_bytes()).chunks(size) {
                    parser.feed_chunk(chunk).unwrap();
                }
                parser.finish().unwrap();
            });
        });
    }
    group.finish();
}

fn bench_storage(c: &mut Criterion) {
    let doc = make_document(200);
    let mut group = c.benchmark_group("parse_storage");
    group.throughput(Throughput::Bytes(doc.len() as u64));

    group.bench_function("heap", |b| {
        let targets = Targets::new();
        b.iter(|| {
            HeapParser::with_options(ParserOptions::new(16), |ctx| targets.claim(ctx))
                .parse_str(black_box(&doc))
                .unwrap();
        });
    });
    group.bench_function("inline", |b| {
        let targets = Targets::new();
        b.iter(|| {
            InlineParser::<16, 16>::new(|ctx| targets.claim(ctx))
                .parse_str(black_box(&doc))
                .unwrap();
        });
    });
    group.finish();
}

fn criterion() -> Criterion {
    let mut c = Criterion::default();
    if cfg!(feature = "bench-fast") {
        c = c
            .warm_up_time(Duration::from_millis(10))
            .measurement_time(Duration::from_millis(100))
            .sample_size(10);
    } else {
        c = c
            .warm_up_time(Duration::from_secs(3))
            .measurement_time(Duration::from_secs(5));
    }
    c
}

criterion_group! { name = benches; config = criterion(); targets = bench_chunked, bench_storage }
criterion_main!(benches);
