//! Dynamic arrays with copy-on-write sharing.
//!
//! Assigning a [`DynArray`] copies the handle, not the elements. Both
//! handles see the same buffer until one of them writes, at which point the
//! writer gets a private copy. [`DynArray::deep_copy`] forces an independent
//! buffer up front.
//!
//! The buffer's reference count is atomic unless the `single-threaded`
//! feature is enabled.

use core::fmt;
use core::ops::{Index, IndexMut};

#[cfg(not(feature = "single-threaded"))]
type Shared<T> = std::sync::Arc<T>;
#[cfg(feature = "single-threaded")]
type Shared<T> = std::rc::Rc<T>;

use crate::error::{Result, RuntimeError};

/// Zero-based dynamic array.
pub struct DynArray<T> {
    buf: Shared<Vec<T>>,
}

impl<T> DynArray<T> {
    pub fn new() -> Self {
        Self {
            buf: Shared::new(Vec::new()),
        }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            buf: Shared::new(items),
        }
    }

    /// Number of elements.
    pub fn length(&self) -> i32 {
        i32::try_from(self.buf.len()).unwrap_or(i32::MAX)
    }

    /// Lowest valid index, always 0.
    pub fn low(&self) -> i32 {
        0
    }

    /// Highest valid index, -1 when empty.
    pub fn high(&self) -> i32 {
        self.length() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn slot(&self, index: i32) -> Result<usize> {
        match usize::try_from(index) {
            Ok(slot) if slot < self.buf.len() => Ok(slot),
            _ => Err(RuntimeError::IndexOutOfRange {
                container: "DynArray",
                index,
                length: self.length(),
            }),
        }
    }

    /// Element at `index`.
    pub fn get(&self, index: i32) -> Result<&T> {
        self.slot(index).map(|slot| &self.buf[slot])
    }

    pub fn as_slice(&self) -> &[T] {
        &self.buf
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.buf.iter()
    }

    /// Number of handles sharing this buffer.
    pub fn ref_count(&self) -> usize {
        Shared::strong_count(&self.buf)
    }

    pub fn is_shared(&self) -> bool {
        self.ref_count() > 1
    }
}

impl<T: Clone> DynArray<T> {
    /// Exclusive access to the elements, splitting off a private copy if
    /// the buffer is shared.
    fn make_mut(&mut self) -> &mut Vec<T> {
        Shared::make_mut(&mut self.buf)
    }

    /// Replace the element at `index`.
    pub fn try_set(&mut self, index: i32, value: T) -> Result<()> {
        let slot = self.slot(index)?;
        self.make_mut()[slot] = value;
        Ok(())
    }

    /// An independent array with the same elements.
    pub fn deep_copy(&self) -> Self {
        Self::from_vec(self.buf.to_vec())
    }

    /// `count` elements starting at `start`, as an independent array.
    ///
    /// Empty when `start` or `count` is negative or `start` is past the end;
    /// `count` is clamped to the remaining length.
    pub fn copy_range(&self, start: i32, count: i32) -> Self {
        let (Ok(start), Ok(count)) = (usize::try_from(start), usize::try_from(count)) else {
            return Self::new();
        };
        if start >= self.buf.len() {
            return Self::new();
        }
        let end = start + count.min(self.buf.len() - start);
        Self::from_vec(self.buf[start..end].to_vec())
    }

    /// Append one element.
    pub fn push(&mut self, value: T) {
        self.make_mut().push(value);
    }
}

impl<T: Clone + Default> DynArray<T> {
    /// Resize to `new_length` elements, filling new slots with defaults.
    pub fn try_set_length(&mut self, new_length: i32) -> Result<()> {
        let new_length = usize::try_from(new_length)
            .map_err(|_| RuntimeError::InvalidArgument("SetLength: negative length".into()))?;
        if new_length != self.buf.len() {
            self.make_mut().resize(new_length, T::default());
        }
        Ok(())
    }

    /// Resize to `new_length` elements, raising `InvalidArgument` when it is
    /// negative.
    pub fn set_length(&mut self, new_length: i32) {
        if let Err(err) = self.try_set_length(new_length) {
            crate::raise_error(err);
        }
    }
}

/// Shallow copy: the new handle shares the buffer.
impl<T> Clone for DynArray<T> {
    fn clone(&self) -> Self {
        Self {
            buf: Shared::clone(&self.buf),
        }
    }
}

impl<T> Default for DynArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<i32> for DynArray<T> {
    type Output = T;

    fn index(&self, index: i32) -> &T {
        match self.slot(index) {
            Ok(slot) => &self.buf[slot],
            Err(err) => crate::raise_error(err),
        }
    }
}

impl<T: Clone> IndexMut<i32> for DynArray<T> {
    fn index_mut(&mut self, index: i32) -> &mut T {
        match self.slot(index) {
            Ok(slot) => &mut self.make_mut()[slot],
            Err(err) => crate::raise_error(err),
        }
    }
}

impl<T: PartialEq> PartialEq for DynArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for DynArray<T> {}

impl<T: fmt::Debug> fmt::Debug for DynArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.buf.iter()).finish()
    }
}

impl<T> From<Vec<T>> for DynArray<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T> FromIterator<T> for DynArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a DynArray<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
