//! Byte windows: range handles into one shared packet buffer.
//!
//! A decoded chain never holds borrows of the packet. It holds `Window`s,
//! and views are materialised by applying a window to the buffer again. The
//! borrow checker then decides whether a view may mutate, and every
//! application re-checks that the window still lies inside the buffer.

use std::ops::Range;

/// A logical `{offset, len}` slice of a buffer the window does not own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Window {
    offset: usize,
    len: usize,
}

impl Window {
    pub const fn new(offset: usize, len: usize) -> Self {
        Window { offset, len }
    }

    /// Window covering `start..end`; empty when `end < start`
    pub fn from_bounds(start: usize, end: usize) -> Self {
        Window::new(start, end.saturating_sub(start))
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last byte of the window
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    pub const fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// Does the window fit in a buffer of `buffer_len` bytes
    pub fn fits(&self, buffer_len: usize) -> bool {
        self.offset
            .checked_add(self.len)
            .is_some_and(|end| end <= buffer_len)
    }

    /// Re-bases a window relative to `base` into the enclosing buffer
    pub const fn offset_by(&self, base: usize) -> Window {
        Window::new(base + self.offset, self.len)
    }

    pub fn slice<'b>(&self, buffer: &'b [u8]) -> Option<&'b [u8]> {
        buffer.get(self.range())
    }

    pub fn slice_mut<'b>(&self, buffer: &'b mut [u8]) -> Option<&'b mut [u8]> {
        buffer.get_mut(self.range())
    }
}
