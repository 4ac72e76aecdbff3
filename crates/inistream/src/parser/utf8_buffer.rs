//! Decoding of multi-byte UTF-8 sequences inside string values.
//!
//! The parser sees one byte at a time, so a [`Utf8Buffer`] holds the bytes of
//! a partially received character until its final continuation byte arrives,
//! then hands back the decoded [`char`]. ASCII bytes pass straight through.
//!
//! # Errors
//!
//! A byte that cannot start or continue a sequence, or a completed sequence
//! that is not valid UTF-8 (overlong forms, surrogates), yields
//! [`SyntaxError::InvalidUtf8`].

use crate::parser::error::SyntaxError;

#[derive(Debug, Default)]
pub(crate) struct Utf8Buffer {
    bytes: [u8; 4],
    len: usize,
    need: usize,
}

impl Utf8Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.len = 0;
        self.need = 0;
    }

    /// Whether a sequence has started but not finished.
    pub fn is_pending(&self) -> bool {
        self.need != 0
    }

    /// Feeds one byte.
    ///
    /// Returns `Ok(Some(ch))` once a character is complete and `Ok(None)`
    /// while more continuation bytes are expected.
    pub fn feed(&mut self, byte: u8) -> Result<Option<char>, SyntaxError> {
        if self.need == 0 {
            self.need = match byte {
                0x00..=0x7F => return Ok(Some(char::from(byte))),
                0xC2..=0xDF => 2,
                0xE0..=0xEF => 3,
                0xF0..=0xF4 => 4,
                _ => return Err(SyntaxError::InvalidUtf8),
            };
            self.bytes[0] = byte;
            self.len = 1;
            return Ok(None);
        }

        if byte & 0xC0 != 0x80 {
            self.reset();
            return Err(SyntaxError::InvalidUtf8);
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        if self.len < self.need {
            return Ok(None);
        }

        let decoded = core::str::from_utf8(&self.bytes[..self.len])
            .ok()
            .and_then(|s| s.chars().next());
        self.reset();
        decoded.map(Some).ok_or(SyntaxError::InvalidUtf8)
    }
}
