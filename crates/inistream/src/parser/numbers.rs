//! Digit accumulation for numeric values.
//!
//! Numbers are accumulated as an unsigned 32-bit magnitude while digits
//! arrive; the sign and the caller's bounds are applied once the value ends.

use crate::parser::error::ErrorKind;

/// Magnitude of `i32::MIN`, the only negative magnitude without a positive
/// counterpart.
const MIN_I32_MAGNITUDE: u32 = 0x8000_0000;

/// Digit alphabet of a numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Radix {
    Decimal,
    Hex,
}

impl Radix {
    fn base(self) -> u32 {
        match self {
            Radix::Decimal => 10,
            Radix::Hex => 16,
        }
    }

    fn digit(self, byte: u8) -> Option<u32> {
        char::from(byte).to_digit(self.base())
    }
}

#[derive(Debug, Default)]
pub(crate) struct NumberAccumulator {
    value: u32,
    digits: usize,
    prefixed: bool,
}

impl NumberAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Adds `byte` as the next digit.
    ///
    /// Returns `Ok(false)` without touching the accumulator when `byte` is not
    /// a digit of `radix`.
    pub fn push(&mut self, byte: u8, radix: Radix) -> Result<bool, ErrorKind> {
        let Some(digit) = radix.digit(byte) else {
            return Ok(false);
        };
        self.value = self
            .value
            .checked_mul(radix.base())
            .and_then(|value| value.checked_add(digit))
            .ok_or(ErrorKind::Overflow)?;
        self.digits += 1;
        Ok(true)
    }

    /// Consumes an `x`/`X` following a single leading `0`.
    ///
    /// The prefix is accepted once per value; digits after it are counted
    /// afresh, so `0x` on its own is a missing value.
    pub fn take_prefix(&mut self, byte: u8) -> bool {
        let accepted =
            matches!(byte, b'x' | b'X') && !self.prefixed && self.digits == 1 && self.value == 0;
        if accepted {
            self.prefixed = true;
            self.digits = 0;
        }
        accepted
    }

    /// Applies the sign and checks the inclusive bounds `min..=max`.
    pub fn resolve(&self, negative: bool, min: i64, max: i64) -> Result<i64, ErrorKind> {
        if self.digits == 0 {
            return Err(ErrorKind::MissingValue);
        }
        let value = if negative {
            if self.value > MIN_I32_MAGNITUDE {
                return Err(ErrorKind::Overflow);
            }
            -i64::from(self.value)
        } else {
            i64::from(self.value)
        };
        if value < min || value > max {
            return Err(ErrorKind::OutOfRange);
        }
        Ok(value)
    }
}
