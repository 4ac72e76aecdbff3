/// Identifier capacity used when none is given.
pub const DEFAULT_MAX_ID: usize = 16;

/// Configuration for a heap-backed [`Parser`](crate::Parser).
///
/// Inline parsers take the same setting as the `MAX_ID` const parameter of
/// [`InlineParser`](crate::InlineParser).
///
/// # Default
///
/// `max_id` defaults to [`DEFAULT_MAX_ID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParserOptions {
    /// Capacity of the group and key buffers, counting a terminator slot.
    ///
    /// Group names and keys may hold at most `max_id - 1` characters; a
    /// longer identifier fails with
    /// [`ErrorKind::BufferOverflow`](crate::ErrorKind::BufferOverflow).
    ///
    /// ```ini
    /// # max_id = 8
    /// [g123456]   # accepted, 7 characters
    /// [g1234567]  # rejected, 8 characters
    /// ```
    pub max_id: usize,
}

impl ParserOptions {
    /// Options with the given identifier capacity.
    #[must_use]
    pub const fn new(max_id: usize) -> Self {
        Self { max_id }
    }

    /// Longest identifier that fits, in bytes.
    #[cfg(feature = "alloc")]
    pub(crate) const fn id_limit(self) -> usize {
        self.max_id.saturating_sub(1)
    }
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ID)
    }
}
