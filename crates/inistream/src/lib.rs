//! A streaming, allocation-frugal parser for a strict INI dialect.
//!
//! Bytes are fed one at a time (or in chunks of any size) and values are
//! written straight into variables owned by the caller. Which values exist,
//! and what type each has, is decided by a mapping callback that sees the
//! current group and key before each value is parsed:
//!
//! ```
//! use core::cell::{Cell, RefCell};
//! use inistream::parse_str;
//!
//! let ssid = RefCell::new(heapless::String::<32>::new());
//! let offset = Cell::new(0i32);
//! let result = parse_str(
//!     "# clock settings\n[wifi]\nssid = 'home net'\n[time]\noffset = -3600\n",
//!     |ctx| {
//!         match (ctx.group(), ctx.key()) {
//!             ("wifi", "ssid") => ctx.map_str(&ssid),
//!             ("time", "offset") => ctx.map_i32(&offset, -43200..=50400),
//!             _ => {}
//!         }
//!         true
//!     },
//! );
//! assert!(result.is_ok());
//! assert_eq!(ssid.borrow().as_str(), "home net");
//! assert_eq!(offset.get(), -3600);
//! ```
//!
//! # Grammar
//!
//! ```text
//! document   := line*
//! line       := blank* ( group | assignment )? blank* comment? terminator
//! group      := '[' identifier ']'
//! assignment := identifier blank* '=' blank* value?
//! value      := quoted-string | unquoted-run
//! ```
//!
//! - Identifiers are case-sensitive: an ASCII letter, then letters, digits,
//!   `_` or `.`.
//! - Blanks are space and tab. `\r`, `\n` and `\r\n` end a line.
//! - Comments start with `#` and run to the end of the line.
//! - Quoted values (`'…'` or `"…"`) keep every character up to the matching
//!   quote, including `#` and blanks. Unquoted values end at `#` or the end of
//!   the line and lose trailing blanks.
//! - Numbers are 32-bit, decimal or hexadecimal (`0x` prefix optional for
//!   hexadecimal claims, switching decimal claims to hexadecimal), with an
//!   optional `-` for signed claims.
//!
//! Values the callback does not claim are checked against the grammar and
//! skipped.
//!
//! # Errors
//!
//! The first error stops the parse for good and is reported with its line:
//! see [`ErrorKind`] for the categories.
//!
//! # Storage
//!
//! [`HeapParser`] (feature `alloc`, on by default) sizes identifier buffers
//! at run time. [`InlineParser`] fixes identifier and callback sizes as const
//! parameters and never allocates.
//!
//! # Features
//!
//! - `alloc` *(default)*: heap storage, `String` targets and the free
//!   [`parse_str`], [`parse_bytes`] and [`parse_fn`] functions.
//! - `logging`: trace claims and debug-log errors through the `log` facade.
//! - `serde`: `Serialize`/`Deserialize` for [`ParserOptions`].

#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(test)]
extern crate std;

#[cfg(feature = "logging")]
macro_rules! log_trace {
    ($($arg:tt)*) => { log::trace!($($arg)*) };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_trace {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

mod callback;
mod context;
#[cfg(feature = "alloc")]
mod driver;
mod parser;
mod storage;

#[cfg(all(test, feature = "alloc"))]
mod tests;

pub use callback::{Callback, INLINE_ALIGN, InlineCallback, SinglePhase, TwoPhase};
pub use context::{Phase, TextSink, ValueContext};
#[cfg(feature = "alloc")]
pub use driver::{parse_bytes, parse_fn, parse_str};
#[cfg(feature = "alloc")]
pub use parser::HeapParser;
pub use parser::{
    InlineParser, Parser,
    error::{ErrorKind, Field, ParserError, SyntaxError},
    options::{DEFAULT_MAX_ID, ParserOptions},
};
#[cfg(feature = "alloc")]
pub use storage::HeapStorage;
pub use storage::{InlineStorage, Storage};
