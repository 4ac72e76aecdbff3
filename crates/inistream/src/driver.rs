//! One-call parsing of a whole document.
//!
//! Each function builds a [`HeapParser`] with default [`ParserOptions`]
//! around the mapping, feeds it and drops it. Use the methods of the same
//! names on [`Parser`](crate::Parser) for other options, two-phase mappings
//! or inline storage.
//!
//! NUL bytes are ordinary input everywhere: only the end of the slice, or
//! `None` from a pull source, ends the document.
//!
//! [`ParserOptions`]: crate::ParserOptions

use crate::{ParserError, ValueContext, parser::HeapParser};

/// Parses a complete document.
///
/// # Errors
///
/// Returns the first error and its 1-based line.
pub fn parse_str<'t, F>(input: &str, mapping: F) -> Result<(), ParserError>
where
    F: FnMut(&mut ValueContext<'_, 't>) -> bool + 't,
{
    HeapParser::new(mapping).parse_str(input)
}

/// Parses exactly the bytes of `input`.
///
/// # Errors
///
/// Returns the first error and its 1-based line.
pub fn parse_bytes<'t, F>(input: &[u8], mapping: F) -> Result<(), ParserError>
where
    F: FnMut(&mut ValueContext<'_, 't>) -> bool + 't,
{
    HeapParser::new(mapping).parse_bytes(input)
}

/// Parses bytes pulled from `source` until it returns `None`.
///
/// ```
/// use core::cell::Cell;
///
/// let mut bytes = b"count = 0x2A".iter().copied();
/// let count = Cell::new(0u32);
/// inistream::parse_fn(
///     || bytes.next(),
///     |ctx| {
///         ctx.map_u32(&count, ..);
///         true
///     },
/// )
/// .unwrap();
/// assert_eq!(count.get(), 42);
/// ```
///
/// # Errors
///
/// Returns the first error and its 1-based line.
pub fn parse_fn<'t, D, F>(source: D, mapping: F) -> Result<(), ParserError>
where
    D: FnMut() -> Option<u8>,
    F: FnMut(&mut ValueContext<'_, 't>) -> bool + 't,
{
    HeapParser::new(mapping).parse_fn(source)
}
