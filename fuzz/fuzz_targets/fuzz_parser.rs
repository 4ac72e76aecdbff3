#![no_main]
use std::cell::{Cell, RefCell};

use arbitrary::{Arbitrary, Unstructured};
use inistream::{HeapParser, InlineParser, ParserError, ParserOptions, Phase, ValueContext};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::rngs::SmallRng; // faster than StdRng
use rand::{Rng, RngCore, SeedableRng};

const HEADER: usize = 5; // 1 flag + 4-byte seed

thread_local! {
    // One SmallRng per thread, seeded once from the host OS
    static RNG: RefCell<SmallRng> =
        RefCell::new(SmallRng::from_os_rng());
}

static BLANKS: &[&[u8]] = &[b"", b" ", b"\t", b"  \t"];
static LINE_ENDINGS: &[&[u8]] = &[b"\n", b"\r\n", b"\r"];

/// Helper: borrow the thread-local RNG and run a closure with it.
fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size < HEADER || seed.is_multiple_of(10) {
        data[0] = with_rng(|rng| rng.next_u32() as u8 & 0x1F); // 5 bits
        data[1..5].copy_from_slice(&with_rng(|rng| rng.next_u32().to_le_bytes()));

        let mut prefix = HEADER;
        while prefix < size.max(HEADER + 1) && prefix < max_size {
            let limit = max_size - prefix;
            let written = append_line(&mut data[prefix..], size, limit);
            if written == 0 {
                break;
            }
            prefix += written;
        }
        prefix
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

/// Mostly well-formed document lines, so the fuzzer spends its time past the
/// first byte.
#[derive(Debug, Arbitrary)]
enum FuzzLine {
    Blank,
    Comment(String),
    Group(String),
    Entry { key: String, value: FuzzValue, comment: bool },
}

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Text(String),
    Quoted { double: bool, text: String },
    Unsigned(u32),
    Signed(i32),
    Hex(u32),
}

fn identifier(raw: &str) -> String {
    let mut id: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.'))
        .collect();
    if !id.starts_with(|ch: char| ch.is_ascii_alphabetic()) {
        id.insert(0, 'k');
    }
    id
}

impl FuzzLine {
    fn render(&self, blanks: &[u8], out: &mut Vec<u8>) {
        out.extend_from_slice(blanks);
        match self {
            FuzzLine::Blank => {}
            FuzzLine::Comment(text) => {
                out.push(b'#');
                out.extend(text.bytes().filter(|b| !matches!(b, b'\r' | b'\n')));
            }
            FuzzLine::Group(name) => {
                out.extend_from_slice(format!("[{}]", identifier(name)).as_bytes());
            }
            FuzzLine::Entry { key, value, comment } => {
                out.extend_from_slice(identifier(key).as_bytes());
                out.extend_from_slice(blanks);
                out.push(b'=');
                out.extend_from_slice(blanks);
                let value = match value {
                    FuzzValue::Text(text) => text.replace(['#', '\r', '\n', '\'', '"'], ""),
                    FuzzValue::Quoted { double, text } => {
                        let quote = if *double { '"' } else { '\'' };
                        let text = text.replace([quote, '\r', '\n'], "");
                        format!("{quote}{text}{quote}")
                    }
                    FuzzValue::Unsigned(n) => n.to_string(),
                    FuzzValue::Signed(n) => n.to_string(),
                    FuzzValue::Hex(n) => format!("0x{n:X}"),
                };
                out.extend_from_slice(value.as_bytes());
                if *comment {
                    out.extend_from_slice(b" # note");
                }
            }
        }
    }
}

fn append_line(data: &mut [u8], size: usize, limit: usize) -> usize {
    let line = loop {
        let s = with_rng(|rng| rng.random_range(1..size.max(2) * 2).min(64));
        let bytes: Vec<u8> = with_rng(|rng| (0..s).map(|_| rng.random::<u8>()).collect());
        if let Ok(line) = FuzzLine::arbitrary(&mut Unstructured::new(&bytes)) {
            break line;
        }
    };

    let (blanks, eol) = with_rng(|rng| {
        (
            BLANKS[rng.random_range(0..BLANKS.len())],
            LINE_ENDINGS[rng.random_range(0..LINE_ENDINGS.len())],
        )
    });
    let mut rendered = Vec::new();
    line.render(blanks, &mut rendered);
    rendered.extend_from_slice(eol);

    let len = rendered.len().min(limit);
    data[..len].copy_from_slice(&rendered[..len]);
    len
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

type Seen = Vec<(String, String, String, i32)>;

/// Claims every value in the way the flag bits select and records what each
/// claim received once the value is complete.
struct Recorder {
    flags: u8,
    text: RefCell<String>,
    number: Cell<i32>,
    seen: RefCell<Seen>,
}

impl Recorder {
    fn new(flags: u8) -> Self {
        Self {
            flags,
            text: RefCell::new(String::new()),
            number: Cell::new(0),
            seen: RefCell::new(Vec::new()),
        }
    }

    fn call<'t>(&'t self, ctx: &mut ValueContext<'_, 't>, phase: Phase) -> bool {
        match phase {
            Phase::Claim => {
                self.text.borrow_mut().clear();
                self.number.set(0);
                match ctx.key().len() % 3 {
                    0 if self.flags & 1 != 0 => ctx.map_string(&self.text, 24),
                    1 if self.flags & 2 != 0 => ctx.map_i32(&self.number, ..),
                    2 if self.flags & 2 != 0 => ctx.map_hex_i32(&self.number, -0xFFFF..=0xFFFF),
                    _ => {}
                }
            }
            Phase::Parsed => self.seen.borrow_mut().push((
                ctx.group().to_owned(),
                ctx.key().to_owned(),
                self.text.borrow().clone(),
                self.number.get(),
            )),
        }
        true
    }
}

fn run<'c>(
    flags: u8,
    chunks: impl IntoIterator<Item = &'c [u8]>,
) -> (Result<(), ParserError>, Seen) {
    let recorder = Recorder::new(flags);
    let max_id = [4, 8, 16, 32][usize::from((flags >> 3) & 3)];
    let result = if flags & 4 != 0 {
        let mut parser =
            InlineParser::<16, 16>::with_verification(|ctx, phase| recorder.call(ctx, phase));
        chunks
            .into_iter()
            .try_for_each(|chunk| parser.feed_chunk(chunk))
            .and_then(|()| parser.finish())
    } else {
        let mut parser = HeapParser::with_verification(ParserOptions::new(max_id), |ctx, phase| {
            recorder.call(ctx, phase)
        });
        chunks
            .into_iter()
            .try_for_each(|chunk| parser.feed_chunk(chunk))
            .and_then(|()| parser.finish())
    };
    (result, recorder.seen.into_inner())
}

fn parser(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }

    let flags = data[0];
    let split_seed = u32::from_le_bytes(data[1..5].try_into().unwrap()) as u64;
    let data = &data[HEADER..];

    let whole = run(flags, [data]);
    let chunked = run(flags, split_into_chunks(data, split_seed));
    assert_eq!(whole, chunked, "chunked parse diverged for {data:?}");

    if let (Err(err), _) = &whole {
        let lines = 1 + data
            .iter()
            .enumerate()
            .filter(|&(i, &b)| b == b'\r' || (b == b'\n' && (i == 0 || data[i - 1] != b'\r')))
            .count();
        assert!(err.line <= lines, "error line {} beyond {lines} lines", err.line);
    }
}

fuzz_target!(|data: &[u8]| parser(data));

/// Split `data` into chunks using a deterministic random value to generate
/// splits.
///
/// * `split_seed` may be any `u64`.
/// * Each chunk is at least one byte.
fn split_into_chunks(data: &[u8], split_seed: u64) -> Vec<&[u8]> {
    let mut chunks = Vec::new();
    let mut rest = data;
    let mut seed = split_seed;

    while !rest.is_empty() {
        let size = (seed as usize % rest.len()) + 1;
        let (head, tail) = rest.split_at(size);
        chunks.push(head);
        rest = tail;
        seed = seed.rotate_left(7) ^ 0x9E37_79B9;
    }

    chunks
}
