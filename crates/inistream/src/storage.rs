//! Storage for the current group, key and mapping callback.
//!
//! [`HeapStorage`] sizes the identifier buffers at run time from
//! [`ParserOptions::max_id`] and boxes the callback. [`InlineStorage`] fixes
//! both sizes at compile time and never allocates.

#[cfg(feature = "alloc")]
use alloc::{boxed::Box, string::String};

use crate::{
    callback::{Callback, InlineCallback},
    context::TextSink,
};
#[cfg(feature = "alloc")]
use crate::parser::options::ParserOptions;

/// Owner of a parser's identifier buffers and callback.
pub trait Storage<'t> {
    /// Text buffer used for the group and key.
    type Text: TextSink;

    /// Longest group or key, in bytes.
    fn id_limit(&self) -> usize;

    /// The current group name.
    fn group(&mut self) -> &mut Self::Text;

    /// The current key.
    fn key(&mut self) -> &mut Self::Text;

    /// The group, the key and the callback, borrowed together.
    fn split(&mut self) -> (&str, &str, &mut dyn Callback<'t>);
}

/// Heap-backed storage with identifier capacity chosen at run time.
#[cfg(feature = "alloc")]
pub struct HeapStorage<'t> {
    id_limit: usize,
    group: String,
    key: String,
    callback: Box<dyn Callback<'t> + 't>,
}

#[cfg(feature = "alloc")]
impl<'t> HeapStorage<'t> {
    /// Allocates identifier buffers for `options` and boxes `callback`.
    pub fn new<C: Callback<'t> + 't>(options: ParserOptions, callback: C) -> Self {
        let id_limit = options.id_limit();
        Self {
            id_limit,
            group: String::with_capacity(id_limit),
            key: String::with_capacity(id_limit),
            callback: Box::new(callback),
        }
    }
}

#[cfg(feature = "alloc")]
impl<'t> Storage<'t> for HeapStorage<'t> {
    type Text = String;

    fn id_limit(&self) -> usize {
        self.id_limit
    }

    fn group(&mut self) -> &mut String {
        &mut self.group
    }

    fn key(&mut self) -> &mut String {
        &mut self.key
    }

    fn split(&mut self) -> (&str, &str, &mut dyn Callback<'t>) {
        (&self.group, &self.key, &mut *self.callback)
    }
}

/// Allocation-free storage: identifiers of up to `MAX_ID - 1` bytes and a
/// callback of up to `N` bytes.
pub struct InlineStorage<'t, const MAX_ID: usize, const N: usize> {
    group: heapless::String<MAX_ID>,
    key: heapless::String<MAX_ID>,
    callback: InlineCallback<'t, N>,
}

impl<'t, const MAX_ID: usize, const N: usize> InlineStorage<'t, MAX_ID, N> {
    /// Moves `callback` inline. Fails to compile if it is larger than `N`
    /// bytes.
    pub fn new<C: Callback<'t> + 't>(callback: C) -> Self {
        const {
            assert!(MAX_ID > 1, "MAX_ID must leave room for at least one character");
        }
        Self {
            group: heapless::String::new(),
            key: heapless::String::new(),
            callback: InlineCallback::new(callback),
        }
    }
}

impl<'t, const MAX_ID: usize, const N: usize> Storage<'t> for InlineStorage<'t, MAX_ID, N> {
    type Text = heapless::String<MAX_ID>;

    fn id_limit(&self) -> usize {
        MAX_ID.saturating_sub(1)
    }

    fn group(&mut self) -> &mut Self::Text {
        &mut self.group
    }

    fn key(&mut self) -> &mut Self::Text {
        &mut self.key
    }

    fn split(&mut self) -> (&str, &str, &mut dyn Callback<'t>) {
        (&self.group, &self.key, &mut self.callback)
    }
}
