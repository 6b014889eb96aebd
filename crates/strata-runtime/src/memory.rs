//! Raw memory routines (`GetMem`, `FreeMem`, `FillChar`, `Move`).
//!
//! Blocks come from the C allocator so they can be handed to foreign code
//! and released there. Sizes are the source language's signed integers:
//! a size of zero or less allocates nothing and returns null.

use core::ffi::c_void;
use core::ptr;

use crate::error::RuntimeError;

fn requested(size: i32) -> Option<usize> {
    usize::try_from(size).ok().filter(|&size| size > 0)
}

fn checked(block: *mut c_void, size: usize) -> *mut c_void {
    if block.is_null() {
        crate::raise_error(RuntimeError::OutOfMemory { size });
    }
    block
}

/// Allocate `size` uninitialised bytes. Raises "Out of memory" on failure.
pub fn get_mem(size: i32) -> *mut c_void {
    let Some(size) = requested(size) else {
        return ptr::null_mut();
    };
    // SAFETY: malloc with a non-zero size has no preconditions.
    checked(unsafe { libc::malloc(size) }, size)
}

/// Allocate `size` zeroed bytes. Raises "Out of memory" on failure.
pub fn alloc_mem(size: i32) -> *mut c_void {
    let Some(size) = requested(size) else {
        return ptr::null_mut();
    };
    // SAFETY: calloc with a non-zero size has no preconditions.
    checked(unsafe { libc::calloc(1, size) }, size)
}

/// Resize a block. A null `block` allocates; a size of zero or less frees
/// and returns null.
///
/// # Safety
/// `block` must be null or come from this module and not be freed yet.
pub unsafe fn realloc_mem(block: *mut c_void, size: i32) -> *mut c_void {
    let Some(size) = requested(size) else {
        free_mem(block);
        return ptr::null_mut();
    };
    checked(libc::realloc(block, size), size)
}

/// Release a block. Null is ignored.
///
/// # Safety
/// `block` must be null or come from this module and not be freed yet.
pub unsafe fn free_mem(block: *mut c_void) {
    if !block.is_null() {
        libc::free(block);
    }
}

/// Set `count` bytes at `dest` to `value`. A count of zero or less does
/// nothing.
///
/// # Safety
/// `dest` must be valid for `count` bytes of writes.
pub unsafe fn fill_char(dest: *mut c_void, count: i32, value: u8) {
    if let Some(count) = requested(count) {
        ptr::write_bytes(dest.cast::<u8>(), value, count);
    }
}

/// Copy `count` bytes from `source` to `dest`; the ranges may overlap.
///
/// # Safety
/// Both pointers must be valid for `count` bytes.
pub unsafe fn move_mem(source: *const c_void, dest: *mut c_void, count: i32) {
    if let Some(count) = requested(count) {
        ptr::copy(source.cast::<u8>(), dest.cast::<u8>(), count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_mem_free_mem() {
        let block = get_mem(100);
        assert!(!block.is_null());
        unsafe {
            let bytes = block.cast::<u8>();
            *bytes = 42;
            assert_eq!(*bytes, 42);
            free_mem(block);
        }
    }

    #[test]
    fn test_alloc_mem_is_zeroed() {
        let block = alloc_mem(40);
        assert!(!block.is_null());
        unsafe {
            let ints = block.cast::<i32>();
            for i in 0..10 {
                assert_eq!(*ints.add(i), 0);
            }
            free_mem(block);
        }
    }

    #[test]
    fn test_realloc_mem_preserves_prefix() {
        unsafe {
            let block = get_mem(10);
            *block.cast::<u8>() = 42;

            let grown = realloc_mem(block, 100);
            assert!(!grown.is_null());
            assert_eq!(*grown.cast::<u8>(), 42);

            assert!(realloc_mem(grown, 0).is_null());
        }
    }

    #[test]
    fn test_non_positive_sizes_yield_null() {
        assert!(get_mem(0).is_null());
        assert!(get_mem(-8).is_null());
        assert!(alloc_mem(0).is_null());
        unsafe { free_mem(ptr::null_mut()) };
    }

    #[test]
    fn test_fill_and_move() {
        let mut buf = [0u8; 8];
        unsafe {
            fill_char(buf.as_mut_ptr().cast(), 4, b'x');
            fill_char(buf.as_mut_ptr().cast(), -1, b'y');
        }
        assert_eq!(&buf, b"xxxx\0\0\0\0");

        unsafe {
            let base = buf.as_mut_ptr();
            move_mem(base.cast(), base.add(2).cast(), 4);
        }
        assert_eq!(&buf, b"xxxxxx\0\0");
    }
}
