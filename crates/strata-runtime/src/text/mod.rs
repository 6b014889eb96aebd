//! Managed string type with Pascal semantics.
//!
//! [`Text`] stores UTF-16 code units and is indexed from 1. Every copy owns
//! its own buffer; unlike [`crate::DynArray`] nothing is shared between
//! values.
//!
//! Index-based editing (`copy`, `delete`, `insert`, `set_length`) clamps
//! out-of-range arguments instead of failing. Only direct character access
//! raises `IndexOutOfRange`.

mod convert;
mod routines;

pub use convert::{utf16_to_utf8, utf16_to_wide, utf8_to_utf16, wide_to_utf16};
pub use routines::*;

use core::fmt;
use core::ops::{Add, AddAssign, Index};

use widestring::{WideStr, WideString};

use crate::error::{Result, RuntimeError};

/// A single UTF-16 code unit, the source language's `Char`.
pub type Char = u16;

/// UTF-16 string value with 1-based indexing.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Text {
    units: Vec<Char>,
}

impl Text {
    /// Create an empty string.
    pub const fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Build a string from UTF-16 code units.
    pub fn from_utf16(units: &[Char]) -> Self {
        Self {
            units: units.to_vec(),
        }
    }

    /// Build a string from owned UTF-16 code units.
    pub fn from_units(units: Vec<Char>) -> Self {
        Self { units }
    }

    /// Decode UTF-8 bytes, dropping invalid sequences.
    pub fn from_utf8_bytes(bytes: &[u8]) -> Self {
        Self {
            units: utf8_to_utf16(bytes),
        }
    }

    /// Convert from the host's native wide string.
    pub fn from_wide(wide: &WideStr) -> Self {
        Self {
            units: wide_to_utf16(wide),
        }
    }

    /// A string holding a single code unit.
    pub fn from_char(ch: Char) -> Self {
        Self { units: vec![ch] }
    }

    /// The code units of this string.
    pub fn as_utf16(&self) -> &[Char] {
        &self.units
    }

    /// Consume the string, returning its code units.
    pub fn into_utf16(self) -> Vec<Char> {
        self.units
    }

    /// Encode as UTF-8.
    pub fn to_utf8(&self) -> String {
        utf16_to_utf8(&self.units)
    }

    /// Convert to the host's native wide string.
    pub fn to_wide(&self) -> WideString {
        utf16_to_wide(&self.units)
    }

    /// Number of UTF-16 code units.
    pub fn length(&self) -> i32 {
        i32::try_from(self.units.len()).unwrap_or(i32::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Map a 1-based index to a slot in the buffer.
    fn slot(&self, index: i32) -> Result<usize> {
        if index < 1 || index > self.length() {
            return Err(RuntimeError::IndexOutOfRange {
                container: "String",
                index,
                length: self.length(),
            });
        }
        Ok((index - 1) as usize)
    }

    /// Character at a 1-based index.
    pub fn char_at(&self, index: i32) -> Result<Char> {
        self.slot(index).map(|slot| self.units[slot])
    }

    /// Replace the character at a 1-based index.
    pub fn try_set_char(&mut self, index: i32, ch: Char) -> Result<()> {
        let slot = self.slot(index)?;
        self.units[slot] = ch;
        Ok(())
    }

    /// Replace the character at a 1-based index, raising
    /// `IndexOutOfRange` when the index is outside `[1, length]`.
    pub fn set_char(&mut self, index: i32, ch: Char) {
        if let Err(err) = self.try_set_char(index, ch) {
            crate::raise_error(err);
        }
    }

    /// Resize to `new_length` code units. Negative lengths clamp to zero and
    /// growth pads with NUL.
    pub fn set_length(&mut self, new_length: i32) {
        let new_length = usize::try_from(new_length).unwrap_or(0);
        self.units.resize(new_length, 0);
    }

    /// Substring of `count` units starting at 1-based `start`.
    ///
    /// `start` below 1 is treated as 1 and `count` is clamped to the
    /// remaining length; a start past the end yields an empty string.
    pub fn copy(&self, start: i32, count: i32) -> Text {
        let start = start.max(1);
        let len = self.length();
        if start > len {
            return Text::new();
        }
        let count = count.min(len - start + 1);
        if count <= 0 {
            return Text::new();
        }
        let from = (start - 1) as usize;
        Text::from_utf16(&self.units[from..from + count as usize])
    }

    /// Remove `count` units starting at 1-based `index`.
    ///
    /// An index outside `[1, length]` or a non-positive count leaves the
    /// string unchanged; a count running past the end is clamped.
    pub fn delete(&mut self, index: i32, count: i32) {
        if index < 1 || count <= 0 {
            return;
        }
        let len = self.length();
        if index > len {
            return;
        }
        let count = count.min(len - index + 1);
        let from = (index - 1) as usize;
        self.units.drain(from..from + count as usize);
    }

    /// Insert `source` before 1-based `index`.
    ///
    /// An index past the end appends; an index below 1 is a no-op.
    pub fn insert(&mut self, source: &Text, index: i32) {
        if index < 1 {
            return;
        }
        if index > self.length() {
            self.units.extend_from_slice(&source.units);
            return;
        }
        let at = (index - 1) as usize;
        self.units.splice(at..at, source.units.iter().copied());
    }

    /// Append a single code unit.
    pub fn push(&mut self, ch: Char) {
        self.units.push(ch);
    }
}

impl Index<i32> for Text {
    type Output = Char;

    fn index(&self, index: i32) -> &Char {
        match self.slot(index) {
            Ok(slot) => &self.units[slot],
            Err(err) => crate::raise_error(err),
        }
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Self {
            units: s.encode_utf16().collect(),
        }
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&String> for Text {
    fn from(s: &String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&WideStr> for Text {
    fn from(wide: &WideStr) -> Self {
        Self::from_wide(wide)
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_utf8())
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Text({:?})", self.to_utf8())
    }
}

impl Add<&Text> for &Text {
    type Output = Text;

    fn add(self, rhs: &Text) -> Text {
        let mut units = Vec::with_capacity(self.units.len() + rhs.units.len());
        units.extend_from_slice(&self.units);
        units.extend_from_slice(&rhs.units);
        Text { units }
    }
}

impl Add<&Text> for Text {
    type Output = Text;

    fn add(mut self, rhs: &Text) -> Text {
        self += rhs;
        self
    }
}

impl Add<Text> for Text {
    type Output = Text;

    fn add(mut self, rhs: Text) -> Text {
        self += &rhs;
        self
    }
}

impl Add<&str> for Text {
    type Output = Text;

    fn add(mut self, rhs: &str) -> Text {
        self.units.extend(rhs.encode_utf16());
        self
    }
}

impl AddAssign<&Text> for Text {
    fn add_assign(&mut self, rhs: &Text) {
        self.units.extend_from_slice(&rhs.units);
    }
}

impl AddAssign<Text> for Text {
    fn add_assign(&mut self, rhs: Text) {
        self.units.extend(rhs.units);
    }
}

impl AddAssign<&str> for Text {
    fn add_assign(&mut self, rhs: &str) {
        self.units.extend(rhs.encode_utf16());
    }
}
