//! The view a mapping callback gets of the value being parsed.
//!
//! A [`ValueContext`] names the current group and key and lets the callback
//! claim the upcoming value by pointing it at a caller-owned target. Targets
//! are shared cells (`Cell<u32>`, `Cell<i32>`, `RefCell<S>` for strings) so a
//! closure can hand the same target out for every value it claims while the
//! caller keeps reading it between and after parses.

use core::{
    cell::{Cell, RefCell},
    fmt,
    ops::{Bound, RangeBounds},
};

use crate::parser::numbers::Radix;

/// Which of the two callback invocations is happening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The value is about to be parsed; the callback may claim it.
    Claim,
    /// The value was parsed, range-checked and written to its target; the
    /// callback may still reject it.
    Parsed,
}

/// A string target for claimed values.
///
/// Implemented for [`heapless::String`], whose capacity bounds the value, and
/// for `alloc::string::String`, which is bounded only by the length given to
/// [`ValueContext::map_string`].
pub trait TextSink {
    /// The text written so far.
    fn as_str(&self) -> &str;

    /// The most bytes this sink can hold.
    fn capacity(&self) -> usize;

    /// Removes all text.
    fn clear(&mut self);

    /// Appends `ch`, returning `false` if it does not fit.
    fn try_push(&mut self, ch: char) -> bool;

    /// Shortens the text to `len` bytes. `len` is always a char boundary.
    fn truncate(&mut self, len: usize);

    /// Length of the text in bytes.
    fn len(&self) -> usize {
        self.as_str().len()
    }

    /// Whether no text has been written.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> TextSink for heapless::String<N> {
    fn as_str(&self) -> &str {
        heapless::String::as_str(self)
    }

    fn capacity(&self) -> usize {
        N
    }

    fn clear(&mut self) {
        heapless::String::clear(self);
    }

    fn try_push(&mut self, ch: char) -> bool {
        self.push(ch).is_ok()
    }

    fn truncate(&mut self, len: usize) {
        heapless::String::truncate(self, len);
    }
}

#[cfg(feature = "alloc")]
impl TextSink for alloc::string::String {
    fn as_str(&self) -> &str {
        alloc::string::String::as_str(self)
    }

    fn capacity(&self) -> usize {
        usize::MAX
    }

    fn clear(&mut self) {
        alloc::string::String::clear(self);
    }

    fn try_push(&mut self, ch: char) -> bool {
        self.push(ch);
        true
    }

    fn truncate(&mut self, len: usize) {
        alloc::string::String::truncate(self, len);
    }
}

/// A claimed string target.
#[derive(Clone, Copy)]
pub(crate) struct TextTarget<'t> {
    pub sink: &'t RefCell<dyn TextSink + 't>,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum NumberDest<'t> {
    Unsigned(&'t Cell<u32>),
    Signed(&'t Cell<i32>),
}

impl NumberDest<'_> {
    pub fn store(self, value: i64) -> Result<(), crate::ErrorKind> {
        match self {
            NumberDest::Unsigned(cell) => {
                cell.set(u32::try_from(value).map_err(|_| crate::ErrorKind::OutOfRange)?);
            }
            NumberDest::Signed(cell) => {
                cell.set(i32::try_from(value).map_err(|_| crate::ErrorKind::OutOfRange)?);
            }
        }
        Ok(())
    }
}

/// A claimed numeric target. Bounds are inclusive and widened to `i64` so
/// signed and unsigned claims share one range check.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NumberTarget<'t> {
    pub dest: NumberDest<'t>,
    pub radix: Radix,
    pub min: i64,
    pub max: i64,
}

impl NumberTarget<'_> {
    pub fn is_signed(&self) -> bool {
        matches!(self.dest, NumberDest::Signed(_))
    }
}

#[derive(Clone, Copy)]
pub(crate) enum Target<'t> {
    Text(TextTarget<'t>),
    Number(NumberTarget<'t>),
}

impl fmt::Debug for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Text(text) => write!(f, "string(limit {})", text.limit),
            Target::Number(number) => write!(
                f,
                "{}{}({}..={})",
                if number.is_signed() { "i32" } else { "u32" },
                if number.radix == Radix::Hex { " hex" } else { "" },
                number.min,
                number.max
            ),
        }
    }
}

/// The current group and key, and the slot a callback claims a value with.
///
/// Handed to the mapping callback at every value boundary. During
/// [`Phase::Claim`] the callback calls at most one `map_*` method; if several
/// are called the last one wins, and calling none leaves the value ignored.
/// Claims made during [`Phase::Parsed`] have no effect.
///
/// ```
/// use core::cell::{Cell, RefCell};
/// use inistream::parse_str;
///
/// let name = RefCell::new(heapless::String::<16>::new());
/// let port = Cell::new(0u32);
/// parse_str("[server]\nname = 'clock'\nport = 8080\n", |ctx| {
///     match (ctx.group(), ctx.key()) {
///         ("server", "name") => ctx.map_str(&name),
///         ("server", "port") => ctx.map_u32(&port, 1..=65535),
///         _ => {}
///     }
///     true
/// })
/// .unwrap();
/// assert_eq!(name.borrow().as_str(), "clock");
/// assert_eq!(port.get(), 8080);
/// ```
pub struct ValueContext<'a, 't> {
    group: &'a str,
    key: &'a str,
    slot: &'a mut Option<Target<'t>>,
}

impl<'a, 't> ValueContext<'a, 't> {
    pub(crate) fn new(group: &'a str, key: &'a str, slot: &'a mut Option<Target<'t>>) -> Self {
        Self { group, key, slot }
    }

    /// The current group name, empty before the first `[group]` header.
    #[must_use]
    pub fn group(&self) -> &'a str {
        self.group
    }

    /// The key whose value is being parsed.
    #[must_use]
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// Whether the value belongs to `group` and `key`.
    #[must_use]
    pub fn is(&self, group: &str, key: &str) -> bool {
        self.group == group && self.key == key
    }

    /// Claims the value as a string bounded by the capacity of `target`.
    ///
    /// The target is cleared before the first character is written. Unquoted
    /// values lose their trailing blanks.
    pub fn map_str<S: TextSink + 't>(&mut self, target: &'t RefCell<S>) {
        let limit = target.borrow().capacity();
        self.claim_text(target, limit);
    }

    /// Claims the value as a string of at most `max_len` bytes.
    pub fn map_string<S: TextSink + 't>(&mut self, target: &'t RefCell<S>, max_len: usize) {
        let limit = target.borrow().capacity().min(max_len);
        self.claim_text(target, limit);
    }

    /// Claims the value as an unsigned decimal number within `range`.
    ///
    /// A `0x` prefix switches to hexadecimal digits.
    pub fn map_u32(&mut self, target: &'t Cell<u32>, range: impl RangeBounds<u32>) {
        self.claim_number(NumberDest::Unsigned(target), Radix::Decimal, widen(range));
    }

    /// Claims the value as a signed decimal number within `range`.
    pub fn map_i32(&mut self, target: &'t Cell<i32>, range: impl RangeBounds<i32>) {
        self.claim_number(NumberDest::Signed(target), Radix::Decimal, widen(range));
    }

    /// Claims the value as an unsigned hexadecimal number within `range`,
    /// with or without a `0x` prefix.
    pub fn map_hex_u32(&mut self, target: &'t Cell<u32>, range: impl RangeBounds<u32>) {
        self.claim_number(NumberDest::Unsigned(target), Radix::Hex, widen(range));
    }

    /// Claims the value as a signed hexadecimal number within `range`.
    ///
    /// The sign precedes the optional prefix: `-0x80000000`.
    pub fn map_hex_i32(&mut self, target: &'t Cell<i32>, range: impl RangeBounds<i32>) {
        self.claim_number(NumberDest::Signed(target), Radix::Hex, widen(range));
    }

    fn claim_text<S: TextSink + 't>(&mut self, target: &'t RefCell<S>, limit: usize) {
        *self.slot = Some(Target::Text(TextTarget {
            sink: target,
            limit,
        }));
    }

    fn claim_number(&mut self, dest: NumberDest<'t>, radix: Radix, (min, max): (i64, i64)) {
        *self.slot = Some(Target::Number(NumberTarget {
            dest,
            radix,
            min,
            max,
        }));
    }
}

impl fmt::Debug for ValueContext<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueContext")
            .field("group", &self.group)
            .field("key", &self.key)
            .field("target", &self.slot)
            .finish()
    }
}

/// Converts any range over a 32-bit integer into inclusive `i64` bounds. An
/// empty range comes out with `min > max`.
fn widen<T, R>(range: R) -> (i64, i64)
where
    T: Copy + Bounded,
    i64: From<T>,
    R: RangeBounds<T>,
{
    let min = match range.start_bound() {
        Bound::Included(&v) => i64::from(v),
        Bound::Excluded(&v) => i64::from(v) + 1,
        Bound::Unbounded => i64::from(T::MIN),
    };
    let max = match range.end_bound() {
        Bound::Included(&v) => i64::from(v),
        Bound::Excluded(&v) => i64::from(v) - 1,
        Bound::Unbounded => i64::from(T::MAX),
    };
    (min, max)
}

trait Bounded: Sized {
    const MIN: Self;
    const MAX: Self;
}

impl Bounded for u32 {
    const MIN: Self = u32::MIN;
    const MAX: Self = u32::MAX;
}

impl Bounded for i32 {
    const MIN: Self = i32::MIN;
    const MAX: Self = i32::MAX;
}
