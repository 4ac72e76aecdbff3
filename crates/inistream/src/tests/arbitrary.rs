use alloc::{
    boxed::Box,
    string::{String, ToString},
    vec::Vec,
};
use core::{cell::RefCell, fmt::Write};

use quickcheck::{Arbitrary, Gen};

use crate::{HeapParser, ParserError, ParserOptions, Phase};

/// Characters values are drawn from: printable ASCII, tab, and a few
/// multi-byte characters.
const VALUE_CHARS: &[char] = &[
    ' ', '\t', '!', '"', '#', '\'', '(', '-', '.', '0', '1', '7', '9', ':', ';', '=', 'A', 'F',
    'Z', '[', ']', '_', 'a', 'f', 'x', 'z', '~', 'é', 'ß', '€', '🌍',
];

const ID_START: &[char] = &['a', 'b', 'k', 'z', 'A', 'G', 'Z'];
const ID_REST: &[char] = &['a', 'e', 'y', 'Z', '0', '5', '9', '_', '.'];
const BLANKS: &[&str] = &["", " ", "\t", "  ", " \t "];
const LINE_ENDINGS: &[&str] = &["\n", "\r\n", "\r"];

fn pick<T: Copy>(g: &mut Gen, items: &[T]) -> T {
    items[usize::arbitrary(g) % items.len()]
}

fn identifier(g: &mut Gen) -> String {
    let mut id = String::new();
    id.push(pick(g, ID_START));
    for _ in 0..usize::arbitrary(g) % 10 {
        id.push(pick(g, ID_REST));
    }
    id
}

fn text(g: &mut Gen, allowed: impl Fn(char) -> bool) -> String {
    (0..usize::arbitrary(g) % 12)
        .map(|_| pick(g, VALUE_CHARS))
        .filter(|&ch| allowed(ch))
        .collect()
}

/// A value as written in a document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ValueText {
    /// Written bare; never starts with a quote and holds no `#`.
    Unquoted(String),
    /// Written between a pair of `quote` characters.
    Quoted { quote: char, text: String },
    /// A decimal number.
    Number(u32),
}

impl ValueText {
    /// The string a claim of this value receives.
    pub fn expected(&self) -> String {
        match self {
            ValueText::Unquoted(text) | ValueText::Quoted { text, .. } => text.clone(),
            ValueText::Number(number) => number.to_string(),
        }
    }
}

impl Arbitrary for ValueText {
    fn arbitrary(g: &mut Gen) -> Self {
        match usize::arbitrary(g) % 3 {
            0 => {
                let raw = text(g, |ch| ch != '#');
                let trimmed = raw
                    .trim_start_matches([' ', '\t', '\'', '"'])
                    .trim_end_matches([' ', '\t']);
                ValueText::Unquoted(trimmed.into())
            }
            1 => {
                let quote = pick(g, &['\'', '"']);
                ValueText::Quoted {
                    quote,
                    text: text(g, |ch| ch != quote),
                }
            }
            _ => ValueText::Number(u32::arbitrary(g)),
        }
    }
}

/// One line of a generated document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Line {
    Blank(&'static str),
    Comment(String),
    Group(String),
    Entry {
        key: String,
        value: ValueText,
        comment: bool,
    },
}

impl Arbitrary for Line {
    fn arbitrary(g: &mut Gen) -> Self {
        match usize::arbitrary(g) % 6 {
            0 => Line::Blank(pick(g, BLANKS)),
            1 => Line::Comment(text(g, |_| true)),
            2 => Line::Group(identifier(g)),
            _ => Line::Entry {
                key: identifier(g),
                value: ValueText::arbitrary(g),
                comment: bool::arbitrary(g),
            },
        }
    }
}

/// A syntactically valid document and the values it holds.
#[derive(Debug, Clone)]
pub(crate) struct Document {
    lines: Vec<(Line, &'static str, &'static str)>,
}

impl Arbitrary for Document {
    fn arbitrary(g: &mut Gen) -> Self {
        let len = usize::arbitrary(g) % 12;
        let lines = (0..len)
            .map(|_| (Line::arbitrary(g), pick(g, BLANKS), pick(g, LINE_ENDINGS)))
            .collect();
        Self { lines }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let lines = self.lines.clone();
        Box::new((0..lines.len()).rev().map(move |len| Self {
            lines: lines[..len].to_vec(),
        }))
    }
}

impl Document {
    /// Renders the document. Every line is indented by its blank run and
    /// ended by its line ending.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (line, blanks, eol) in &self.lines {
            out.push_str(blanks);
            match line {
                Line::Blank(more) => out.push_str(more),
                Line::Comment(text) => {
                    let _ = write!(out, "#{text}");
                }
                Line::Group(name) => {
                    let _ = write!(out, "[{name}]{blanks}");
                }
                Line::Entry {
                    key,
                    value,
                    comment,
                } => {
                    let _ = write!(out, "{key}{blanks}={blanks}");
                    match value {
                        ValueText::Unquoted(text) => out.push_str(text),
                        ValueText::Quoted { quote, text } => {
                            let _ = write!(out, "{quote}{text}{quote}");
                        }
                        ValueText::Number(number) => {
                            let _ = write!(out, "{number}");
                        }
                    }
                    if *comment {
                        out.push_str(" # note");
                    }
                }
            }
            out.push_str(eol);
        }
        out
    }

    /// `(group, key, value)` for every entry, in document order.
    pub fn entries(&self) -> Vec<(String, String, String)> {
        let mut group = String::new();
        let mut entries = Vec::new();
        for (line, ..) in &self.lines {
            match line {
                Line::Group(name) => group.clone_from(name),
                Line::Entry { key, value, .. } => {
                    entries.push((group.clone(), key.clone(), value.expected()));
                }
                Line::Blank(_) | Line::Comment(_) => {}
            }
        }
        entries
    }
}

/// Parses `chunks` as one document, claiming every value as a string, and
/// returns `(group, key, value)` for each.
pub(crate) fn collect_entries<'c>(
    chunks: impl IntoIterator<Item = &'c [u8]>,
) -> Result<Vec<(String, String, String)>, ParserError> {
    let text = RefCell::new(String::new());
    let seen = RefCell::new(Vec::new());
    let mut parser = HeapParser::with_verification(ParserOptions::default(), |ctx, phase| {
        match phase {
            Phase::Claim => ctx.map_string(&text, 256),
            Phase::Parsed => seen.borrow_mut().push((
                String::from(ctx.group()),
                String::from(ctx.key()),
                text.borrow().clone(),
            )),
        }
        true
    });
    for chunk in chunks {
        parser.feed_chunk(chunk)?;
    }
    parser.finish()?;
    drop(parser);
    Ok(seen.into_inner())
}

/// Splits `input` at the positions derived from `splits`.
pub(crate) fn chunks<'i>(input: &'i [u8], splits: &[usize]) -> Vec<&'i [u8]> {
    let mut chunks = Vec::new();
    let mut rest = input;
    for &split in splits {
        if rest.is_empty() {
            break;
        }
        let (head, tail) = rest.split_at(1 + split % rest.len());
        chunks.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}
