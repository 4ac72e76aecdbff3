use alloc::{format, string::String, vec::Vec};
use core::cell::Cell;

use quickcheck::QuickCheck;
use quickcheck_macros::quickcheck;

use super::arbitrary::{Document, collect_entries};
use crate::{ErrorKind, SyntaxError, parse_str};

/// Property: every generated document parses, and every value reaches its
/// claim with the group and key it was written under.
#[test]
fn documents_deliver_every_value() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(document: Document) -> bool {
        collect_entries([document.render().as_bytes()]) == Ok(document.entries())
    }

    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;

    QuickCheck::new()
        .tests(tests)
        .quickcheck(prop as fn(Document) -> bool);
}

/// Property: a quoted value cut off by the end of input fails on its own
/// line, however many lines precede it.
#[test]
fn truncated_quotes_fail_on_their_line() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(document: Document, tail: Vec<u8>) -> bool {
        let mut src = document.render();
        let bytes = src.as_bytes();
        let ends_line = |i: usize| match bytes[i] {
            b'\r' => true,
            b'\n' => i == 0 || bytes[i - 1] != b'\r',
            _ => false,
        };
        let line = 1 + (0..bytes.len()).filter(|&i| ends_line(i)).count();
        let tail: String = tail.iter().map(|b| char::from(b'a' + b % 26)).collect();
        src.push_str(&format!("key = '{tail}"));
        parse_str(&src, |_| true).map_err(|err| (err.kind, err.line))
            == Err((ErrorKind::Syntax(SyntaxError::UnexpectedEndOfInput), line))
    }

    QuickCheck::new()
        .tests(1_000)
        .quickcheck(prop as fn(Document, Vec<u8>) -> bool);
}

#[quickcheck]
fn unsigned_numbers_parse_in_both_notations(value: u32, hex: bool) -> bool {
    let number = Cell::new(0);
    let src = if hex {
        format!("n = 0x{value:X}")
    } else {
        format!("n = {value}")
    };
    let result = parse_str(&src, |ctx| {
        ctx.map_u32(&number, ..);
        true
    });
    result.is_ok() && number.get() == value
}

#[quickcheck]
fn signed_numbers_respect_bounds(value: i32, low: i32, high: i32) -> bool {
    let (min, max) = if low <= high { (low, high) } else { (high, low) };
    let number = Cell::new(0);
    let result = parse_str(&format!("n = {value}"), |ctx| {
        ctx.map_i32(&number, min..=max);
        true
    });
    if (min..=max).contains(&value) {
        result.is_ok() && number.get() == value
    } else {
        result.map_err(|err| err.kind) == Err(ErrorKind::OutOfRange)
    }
}
