use core::fmt;

use thiserror::Error;

/// The first failure of a parse, with the 1-based line it occurred on.
///
/// Once a [`Parser`](crate::Parser) has produced an error it keeps returning
/// the same one until it is [`reset`](crate::Parser::reset).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{kind} on line {line}")]
pub struct ParserError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// The line the failure was detected on. A line terminator that triggers
    /// the failure does not advance this counter.
    pub line: usize,
}

impl ParserError {
    pub(crate) fn new(kind: ErrorKind, line: usize) -> Self {
        Self { kind, line }
    }
}

/// The category of a [`ParserError`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input violates the grammar.
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    /// A group, key or string value is longer than its storage.
    #[error("{0} exceeds its capacity")]
    BufferOverflow(Field),
    /// A number does not fit in 32 bits.
    #[error("numeric overflow")]
    Overflow,
    /// A number lies outside the bounds given when it was claimed.
    #[error("number out of range")]
    OutOfRange,
    /// The mapping callback returned `false`.
    #[error("value rejected by mapping")]
    Rejected,
    /// A number was claimed but no digits followed.
    #[error("missing value")]
    MissingValue,
}

/// Grammar violations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxError {
    /// The byte is not allowed in the current state.
    #[error("invalid character '{}'", .0.escape_ascii())]
    InvalidCharacter(u8),
    /// Input ended inside a group header, key or quoted string.
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    /// A string value contains a malformed UTF-8 sequence.
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
}

/// The storage that overflowed in [`ErrorKind::BufferOverflow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The group name between `[` and `]`.
    Group,
    /// The key left of `=`.
    Key,
    /// A claimed string value.
    Value,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Group => "group",
            Field::Key => "key",
            Field::Value => "value",
        })
    }
}

/// Maps an offending input unit to the matching syntax error.
pub(crate) fn invalid(input: Option<u8>) -> ErrorKind {
    match input {
        Some(byte) => SyntaxError::InvalidCharacter(byte).into(),
        None => SyntaxError::UnexpectedEndOfInput.into(),
    }
}
