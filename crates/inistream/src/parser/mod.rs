//! Byte-at-a-time INI state machine.
//!
//! ```text
//! document   := line*
//! line       := blank* ( group | assignment )? blank* comment? terminator
//! group      := '[' identifier ']'
//! assignment := identifier blank* '=' blank* value?
//! value      := quoted-string | unquoted-run
//! ```
//!
//! Identifiers start with an ASCII letter and continue with letters, digits,
//! `_` or `.`. `\r`, `\n` and `\r\n` each end one line.
//!
//! Every value is announced to the mapping callback before its first byte is
//! interpreted ([`Phase::Claim`]). The claimed kind selects the next state and
//! the byte that triggered the claim is examined again under that state, so a
//! digit right after `=` belongs to the number. When the value ends it is
//! written to the claimed target and the callback is asked once more
//! ([`Phase::Parsed`]).
//!
//! The first error moves the machine into its error state, which it only
//! leaves through [`Parser::reset`].

pub(crate) mod error;
pub(crate) mod numbers;
pub(crate) mod options;
mod utf8_buffer;


use core::fmt;

use self::{
    error::{ErrorKind, Field, ParserError, SyntaxError, invalid},
    numbers::{NumberAccumulator, Radix},
    utf8_buffer::Utf8Buffer,
};
#[cfg(feature = "alloc")]
use crate::{parser::options::ParserOptions, storage::HeapStorage};
use crate::{
    callback::{Callback, SinglePhase, TwoPhase},
    context::{NumberTarget, Phase, Target, TextSink, TextTarget, ValueContext},
    storage::{InlineStorage, Storage},
};

#[derive(Clone, Copy)]
enum State<'t> {
    /// Between lines, or before the first token of a line.
    Start,
    /// Inside `[...]`.
    Group,
    /// Inside a key.
    Key,
    /// After a key and blanks, expecting `=`.
    Assign,
    /// After `=`, expecting the value or the end of the line.
    Value,
    /// Skipping an unclaimed value.
    Ignore,
    /// Inside a claimed string value.
    Str(TextTarget<'t>),
    /// Inside a claimed number, decimal digits.
    Decimal(NumberTarget<'t>),
    /// Inside a claimed number, hexadecimal digits.
    Hex(NumberTarget<'t>),
    /// After a complete token, only blanks or a comment may follow.
    Trailer,
    /// After `#`, up to the end of the line.
    Comment,
    /// Terminal.
    Error(ErrorKind),
}

impl State<'_> {
    fn name(&self) -> &'static str {
        match self {
            State::Start => "start",
            State::Group => "group",
            State::Key => "key",
            State::Assign => "assign",
            State::Value => "value",
            State::Ignore => "ignore",
            State::Str(_) => "string",
            State::Decimal(_) => "decimal",
            State::Hex(_) => "hex",
            State::Trailer => "trailer",
            State::Comment => "comment",
            State::Error(_) => "error",
        }
    }
}

/// What to do with the current input unit after a state has handled it.
enum Flow {
    Consumed,
    /// The state changed and the same unit must be examined again.
    Reprocess,
}

/// A streaming parser for the INI dialect described in the [crate
/// docs](crate).
///
/// `'t` is the lifetime of the targets the mapping callback claims values
/// into. `S` selects where identifiers and the callback live; see
/// [`HeapParser`] and [`InlineParser`].
pub struct Parser<'t, S> {
    storage: S,
    state: State<'t>,
    line: usize,
    after_cr: bool,
    quote: Option<u8>,
    negative: bool,
    /// Start of the trailing blank run of an unquoted string.
    trim_at: Option<usize>,
    number: NumberAccumulator,
    utf8: Utf8Buffer,
}

/// A parser with heap-allocated identifier buffers sized by
/// [`ParserOptions::max_id`] and a boxed callback.
#[cfg(feature = "alloc")]
pub type HeapParser<'t> = Parser<'t, HeapStorage<'t>>;

/// A parser that never allocates: identifiers hold up to `MAX_ID - 1` bytes
/// and the callback is stored inline in `N` bytes.
///
/// ```
/// use core::cell::Cell;
/// use inistream::InlineParser;
///
/// let level = Cell::new(0u32);
/// let mut parser = InlineParser::<8, 32>::new(|ctx| {
///     if ctx.is("display", "level") {
///         ctx.map_u32(&level, 0..=15);
///     }
///     true
/// });
/// parser.parse_str("[display]\nlevel = 7\n").unwrap();
/// assert_eq!(level.get(), 7);
/// ```
pub type InlineParser<'t, const MAX_ID: usize, const N: usize> =
    Parser<'t, InlineStorage<'t, MAX_ID, N>>;

#[cfg(feature = "alloc")]
impl<'t> Parser<'t, HeapStorage<'t>> {
    /// Creates a parser with default options around a single-phase mapping.
    pub fn new<F>(mapping: F) -> Self
    where
        F: FnMut(&mut ValueContext<'_, 't>) -> bool + 't,
    {
        Self::with_options(ParserOptions::default(), mapping)
    }

    /// Creates a parser around a single-phase mapping.
    pub fn with_options<F>(options: ParserOptions, mapping: F) -> Self
    where
        F: FnMut(&mut ValueContext<'_, 't>) -> bool + 't,
    {
        Self::from_callback(options, SinglePhase(mapping))
    }

    /// Creates a parser around a two-phase mapping that also verifies each
    /// parsed value.
    pub fn with_verification<F>(options: ParserOptions, mapping: F) -> Self
    where
        F: FnMut(&mut ValueContext<'_, 't>, Phase) -> bool + 't,
    {
        Self::from_callback(options, TwoPhase(mapping))
    }

    /// Creates a parser around any [`Callback`].
    pub fn from_callback<C: Callback<'t> + 't>(options: ParserOptions, callback: C) -> Self {
        Self::with_storage(HeapStorage::new(options, callback))
    }
}

impl<'t, const MAX_ID: usize, const N: usize> Parser<'t, InlineStorage<'t, MAX_ID, N>> {
    /// Creates a parser around a single-phase mapping.
    pub fn new<F>(mapping: F) -> Self
    where
        F: FnMut(&mut ValueContext<'_, 't>) -> bool + 't,
    {
        Self::from_callback(SinglePhase(mapping))
    }

    /// Creates a parser around a two-phase mapping that also verifies each
    /// parsed value.
    pub fn with_verification<F>(mapping: F) -> Self
    where
        F: FnMut(&mut ValueContext<'_, 't>, Phase) -> bool + 't,
    {
        Self::from_callback(TwoPhase(mapping))
    }

    /// Creates a parser around any [`Callback`] of at most `N` bytes.
    pub fn from_callback<C: Callback<'t> + 't>(callback: C) -> Self {
        Self::with_storage(InlineStorage::new(callback))
    }
}

impl<'t, S: Storage<'t>> Parser<'t, S> {
    /// Creates a parser over prepared storage.
    pub fn with_storage(storage: S) -> Self {
        Self {
            storage,
            state: State::Start,
            line: 1,
            after_cr: false,
            quote: None,
            negative: false,
            trim_at: None,
            number: NumberAccumulator::new(),
            utf8: Utf8Buffer::new(),
        }
    }

    /// Feeds one byte, or the end of input as `None`.
    ///
    /// # Errors
    ///
    /// Returns the first error of the parse, on this call and every call after
    /// it until [`reset`](Self::reset).
    pub fn feed(&mut self, input: Option<u8>) -> Result<(), ParserError> {
        if let State::Error(kind) = self.state {
            return Err(ParserError::new(kind, self.line));
        }

        let terminator = matches!(input, None | Some(b'\r' | b'\n'));
        let next_line = match input {
            Some(b'\r') => true,
            Some(b'\n') => !self.after_cr,
            _ => false,
        };
        self.after_cr = input == Some(b'\r');

        loop {
            match self.step(input, terminator) {
                Ok(Flow::Consumed) => break,
                Ok(Flow::Reprocess) => {}
                Err(kind) => {
                    log_debug!(
                        "line {}: {} in {} state",
                        self.line,
                        kind,
                        self.state.name()
                    );
                    self.state = State::Error(kind);
                    return Err(ParserError::new(kind, self.line));
                }
            }
        }

        if next_line {
            self.line += 1;
        }
        Ok(())
    }

    /// Feeds one byte.
    ///
    /// # Errors
    ///
    /// See [`feed`](Self::feed).
    pub fn push(&mut self, byte: u8) -> Result<(), ParserError> {
        self.feed(Some(byte))
    }

    /// Feeds a chunk of a larger document without ending the input.
    ///
    /// # Errors
    ///
    /// See [`feed`](Self::feed).
    pub fn feed_chunk(&mut self, chunk: &[u8]) -> Result<(), ParserError> {
        chunk.iter().try_for_each(|&byte| self.feed(Some(byte)))
    }

    /// Ends the input, completing a value that runs to the end of the
    /// document.
    ///
    /// # Errors
    ///
    /// See [`feed`](Self::feed).
    pub fn finish(&mut self) -> Result<(), ParserError> {
        self.feed(None)
    }

    /// Parses `input` as a complete document.
    ///
    /// # Errors
    ///
    /// Returns the first error and the line it occurred on.
    pub fn parse_bytes(&mut self, input: &[u8]) -> Result<(), ParserError> {
        self.feed_chunk(input)?;
        self.finish()
    }

    /// Parses `input` as a complete document.
    ///
    /// # Errors
    ///
    /// Returns the first error and the line it occurred on.
    pub fn parse_str(&mut self, input: &str) -> Result<(), ParserError> {
        self.parse_bytes(input.as_bytes())
    }

    /// Pulls bytes from `source` until it returns `None`.
    ///
    /// # Errors
    ///
    /// Returns the first error and the line it occurred on. `source` is not
    /// called again after an error.
    pub fn parse_fn<D>(&mut self, mut source: D) -> Result<(), ParserError>
    where
        D: FnMut() -> Option<u8>,
    {
        loop {
            let input = source();
            self.feed(input)?;
            if input.is_none() {
                return Ok(());
            }
        }
    }

    /// The 1-based line currently being parsed, or the line of the error.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Whether no error has occurred.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !matches!(self.state, State::Error(_))
    }

    /// The error the parser stopped at, if any.
    #[must_use]
    pub fn error(&self) -> Option<ParserError> {
        match self.state {
            State::Error(kind) => Some(ParserError::new(kind, self.line)),
            _ => None,
        }
    }

    /// Prepares the parser for a new document, keeping its callback.
    pub fn reset(&mut self) {
        self.state = State::Start;
        self.line = 1;
        self.after_cr = false;
        self.quote = None;
        self.negative = false;
        self.trim_at = None;
        self.number.reset();
        self.utf8.reset();
        self.storage.group().clear();
        self.storage.key().clear();
    }

    fn step(&mut self, input: Option<u8>, terminator: bool) -> Result<Flow, ErrorKind> {
        match self.state {
            State::Start => self.start(input, terminator),
            State::Group => self.group(input),
            State::Key => self.key(input),
            State::Assign => self.assign(input),
            State::Value => self.value(input, terminator),
            State::Ignore => self.ignore(input, terminator),
            State::Str(target) => self.string(target, input, terminator),
            State::Decimal(target) => self.number(target, Radix::Decimal, input, terminator),
            State::Hex(target) => self.number(target, Radix::Hex, input, terminator),
            State::Trailer => self.trailer(input, terminator),
            State::Comment => {
                if terminator {
                    self.state = State::Start;
                }
                Ok(Flow::Consumed)
            }
            State::Error(kind) => Err(kind),
        }
    }

    fn start(&mut self, input: Option<u8>, terminator: bool) -> Result<Flow, ErrorKind> {
        match input {
            Some(b'[') => {
                self.storage.group().clear();
                self.state = State::Group;
            }
            Some(byte) if byte.is_ascii_alphabetic() => {
                self.storage.key().clear();
                self.push_id(Field::Key, byte)?;
                self.state = State::Key;
            }
            Some(b'#') => self.state = State::Comment,
            Some(byte) if is_blank(byte) => {}
            _ if terminator => {}
            _ => return Err(invalid(input)),
        }
        Ok(Flow::Consumed)
    }

    fn group(&mut self, input: Option<u8>) -> Result<Flow, ErrorKind> {
        let empty = self.storage.group().is_empty();
        match input {
            Some(byte) if is_id_byte(byte) && (!empty || byte.is_ascii_alphabetic()) => {
                self.push_id(Field::Group, byte)?;
            }
            Some(b']') if !empty => self.state = State::Trailer,
            _ => return Err(invalid(input)),
        }
        Ok(Flow::Consumed)
    }

    fn key(&mut self, input: Option<u8>) -> Result<Flow, ErrorKind> {
        match input {
            Some(byte) if is_id_byte(byte) => self.push_id(Field::Key, byte)?,
            Some(b'=') => self.state = State::Value,
            Some(byte) if is_blank(byte) => self.state = State::Assign,
            _ => return Err(invalid(input)),
        }
        Ok(Flow::Consumed)
    }

    fn assign(&mut self, input: Option<u8>) -> Result<Flow, ErrorKind> {
        match input {
            Some(b'=') => self.state = State::Value,
            Some(byte) if is_blank(byte) => {}
            _ => return Err(invalid(input)),
        }
        Ok(Flow::Consumed)
    }

    fn value(&mut self, input: Option<u8>, terminator: bool) -> Result<Flow, ErrorKind> {
        match input {
            Some(byte) if is_blank(byte) => return Ok(Flow::Consumed),
            _ if terminator => {}
            Some(byte) if is_value_byte(byte) => {}
            _ => return Err(invalid(input)),
        }

        let mut slot = None;
        self.dispatch(&mut slot, Phase::Claim)?;
        log_trace!("line {}: claimed {:?}", self.line, slot);

        self.quote = match input {
            Some(quote @ (b'"' | b'\'')) => Some(quote),
            _ => None,
        };
        self.negative = false;
        self.trim_at = None;
        self.number.reset();
        self.utf8.reset();

        match slot {
            None => self.state = State::Ignore,
            Some(Target::Text(target)) => {
                target.sink.borrow_mut().clear();
                self.state = State::Str(target);
            }
            Some(Target::Number(target)) => {
                self.quote = None;
                self.state = match target.radix {
                    Radix::Decimal => State::Decimal(target),
                    Radix::Hex => State::Hex(target),
                };
                if target.is_signed() && input == Some(b'-') {
                    self.negative = true;
                    return Ok(Flow::Consumed);
                }
                if target.max < 0 {
                    return Err(ErrorKind::OutOfRange);
                }
            }
        }

        // An opening quote is part of the value syntax; any other byte is the
        // first byte of the value itself.
        Ok(if self.quote.is_some() {
            Flow::Consumed
        } else {
            Flow::Reprocess
        })
    }

    fn ignore(&mut self, input: Option<u8>, terminator: bool) -> Result<Flow, ErrorKind> {
        match (input, self.quote) {
            (Some(byte), Some(quote)) if byte == quote => self.state = State::Trailer,
            (Some(b'#'), None) => self.state = State::Comment,
            (_, None) if terminator => self.state = State::Start,
            (Some(byte), _) if is_value_byte(byte) => {}
            _ => return Err(invalid(input)),
        }
        Ok(Flow::Consumed)
    }

    fn string(
        &mut self,
        target: TextTarget<'t>,
        input: Option<u8>,
        terminator: bool,
    ) -> Result<Flow, ErrorKind> {
        let next = match (input, self.quote) {
            (Some(byte), _) if self.utf8.is_pending() => return self.string_byte(target, byte),
            (Some(byte), Some(quote)) if byte == quote => State::Trailer,
            (Some(b'#'), None) => State::Comment,
            (_, None) if terminator => State::Start,
            (Some(byte), _) if is_value_byte(byte) => return self.string_byte(target, byte),
            _ => return Err(invalid(input)),
        };
        if self.utf8.is_pending() {
            return Err(SyntaxError::InvalidUtf8.into());
        }

        if let (None, Some(len)) = (self.quote, self.trim_at) {
            target.sink.borrow_mut().truncate(len);
        }
        self.state = next;
        self.dispatch_parsed()?;
        Ok(Flow::Consumed)
    }

    fn string_byte(&mut self, target: TextTarget<'t>, byte: u8) -> Result<Flow, ErrorKind> {
        let Some(ch) = self.utf8.feed(byte)? else {
            return Ok(Flow::Consumed);
        };
        let mut sink = target.sink.borrow_mut();
        let len = sink.len();
        if len + ch.len_utf8() > target.limit || !sink.try_push(ch) {
            return Err(ErrorKind::BufferOverflow(Field::Value));
        }
        if matches!(ch, ' ' | '\t') {
            if self.trim_at.is_none() {
                self.trim_at = Some(len);
            }
        } else {
            self.trim_at = None;
        }
        Ok(Flow::Consumed)
    }

    fn number(
        &mut self,
        target: NumberTarget<'t>,
        radix: Radix,
        input: Option<u8>,
        terminator: bool,
    ) -> Result<Flow, ErrorKind> {
        if let Some(byte) = input {
            if self.number.push(byte, radix)? {
                return Ok(Flow::Consumed);
            }
            if self.number.take_prefix(byte) {
                self.state = State::Hex(target);
                return Ok(Flow::Consumed);
            }
        }
        let next = match input {
            _ if terminator => State::Start,
            Some(b'#') => State::Comment,
            Some(byte) if is_blank(byte) => State::Trailer,
            _ => return Err(invalid(input)),
        };

        let value = self
            .number
            .resolve(self.negative, target.min, target.max)?;
        target.dest.store(value)?;
        self.state = next;
        self.dispatch_parsed()?;
        Ok(Flow::Consumed)
    }

    fn trailer(&mut self, input: Option<u8>, terminator: bool) -> Result<Flow, ErrorKind> {
        match input {
            Some(b'#') => self.state = State::Comment,
            Some(byte) if is_blank(byte) => {}
            _ if terminator => self.state = State::Start,
            _ => return Err(invalid(input)),
        }
        Ok(Flow::Consumed)
    }

    fn push_id(&mut self, field: Field, byte: u8) -> Result<(), ErrorKind> {
        let limit = self.storage.id_limit();
        let text = match field {
            Field::Group => self.storage.group(),
            Field::Key | Field::Value => self.storage.key(),
        };
        if text.len() >= limit || !text.try_push(char::from(byte)) {
            return Err(ErrorKind::BufferOverflow(field));
        }
        Ok(())
    }

    fn dispatch(&mut self, slot: &mut Option<Target<'t>>, phase: Phase) -> Result<(), ErrorKind> {
        let (group, key, callback) = self.storage.split();
        let mut ctx = ValueContext::new(group, key, slot);
        if callback.invoke(&mut ctx, phase) {
            Ok(())
        } else {
            Err(ErrorKind::Rejected)
        }
    }

    /// Lets the callback verify a value that was just stored.
    fn dispatch_parsed(&mut self) -> Result<(), ErrorKind> {
        self.dispatch(&mut None, Phase::Parsed)
    }
}

impl<S> fmt::Debug for Parser<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("state", &self.state.name())
            .field("line", &self.line)
            .field("quote", &self.quote.map(char::from))
            .finish_non_exhaustive()
    }
}

fn is_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t')
}

fn is_id_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.')
}

/// Tab, printable ASCII, and anything outside ASCII.
fn is_value_byte(byte: u8) -> bool {
    byte == b'\t' || (b' '..=b'~').contains(&byte) || !byte.is_ascii()
}
