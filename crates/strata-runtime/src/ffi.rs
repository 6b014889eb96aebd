//! C ABI entry points for code generators that do not emit Rust.
//!
//! A protected block is passed as a callback plus an opaque context
//! pointer:
//!
//! ```text
//! strata_rt_try_catch(body, handler, ctx);
//! ```
//!
//! Software exceptions travel as Rust unwinds, so every callback and every
//! function that can raise uses the `"C-unwind"` ABI.

use core::ffi::c_void;

use crate::engine;
use crate::state;
use crate::text::{Char, Text};

/// A block of generated code.
pub type Callback = unsafe extern "C-unwind" fn(ctx: *mut c_void);

/// Initialize the runtime with the default configuration.
#[no_mangle]
pub extern "C" fn strata_rt_init() {
    crate::init();
}

/// Clear this thread's exception state.
#[no_mangle]
pub extern "C" fn strata_rt_shutdown() {
    state::clear_exception();
}

#[no_mangle]
pub extern "C" fn strata_rt_halt(code: i32) -> ! {
    engine::halt(code)
}

#[no_mangle]
pub extern "C" fn strata_rt_run_error(code: i32) -> ! {
    engine::run_error(code)
}

#[no_mangle]
pub extern "C" fn strata_rt_abort() -> ! {
    engine::abort()
}

/// Raise a software exception with a UTF-16 message.
///
/// # Safety
/// `message` must be null or valid for `len` code units.
#[no_mangle]
pub unsafe extern "C-unwind" fn strata_rt_raise(message: *const Char, len: usize) -> ! {
    engine::raise(message_text(message, len))
}

/// Raise a software exception with an explicit code.
///
/// # Safety
/// Same as [`strata_rt_raise`].
#[no_mangle]
pub unsafe extern "C-unwind" fn strata_rt_raise_code(
    code: i32,
    message: *const Char,
    len: usize,
) -> ! {
    engine::raise_code(code, message_text(message, len))
}

/// Raise the current exception again.
#[no_mangle]
pub extern "C-unwind" fn strata_rt_reraise() -> ! {
    engine::reraise()
}

unsafe fn message_text(message: *const Char, len: usize) -> Text {
    if message.is_null() || len == 0 {
        return Text::new();
    }
    Text::from_utf16(core::slice::from_raw_parts(message, len))
}

/// Code of the most recent exception on this thread.
#[no_mangle]
pub extern "C" fn strata_rt_exception_code() -> i32 {
    state::exception_code()
}

/// Copy the current exception message into `buf` and return its full
/// length in code units. At most `capacity` units are written; a null
/// `buf` only queries the length.
///
/// # Safety
/// `buf` must be null or valid for `capacity` code units of writes.
#[no_mangle]
pub unsafe extern "C" fn strata_rt_exception_message(buf: *mut Char, capacity: usize) -> usize {
    let message = state::exception_message();
    let units = message.as_utf16();
    if !buf.is_null() {
        let n = units.len().min(capacity);
        core::ptr::copy_nonoverlapping(units.as_ptr(), buf, n);
    }
    units.len()
}

/// `try body except handler end`.
///
/// # Safety
/// Both callbacks must be safe to call with `ctx`.
#[no_mangle]
pub unsafe extern "C-unwind" fn strata_rt_try_catch(
    body: Callback,
    handler: Callback,
    ctx: *mut c_void,
) {
    engine::try_catch(|| body(ctx), || handler(ctx));
}

/// `try body finally cleanup end`.
///
/// # Safety
/// Both callbacks must be safe to call with `ctx`.
#[no_mangle]
pub unsafe extern "C-unwind" fn strata_rt_try_finally(
    body: Callback,
    cleanup: Callback,
    ctx: *mut c_void,
) {
    engine::try_finally(|| body(ctx), || cleanup(ctx));
}

/// `try try body except handler end finally cleanup end`.
///
/// # Safety
/// All callbacks must be safe to call with `ctx`.
#[no_mangle]
pub unsafe extern "C-unwind" fn strata_rt_try_catch_finally(
    body: Callback,
    handler: Callback,
    cleanup: Callback,
    ctx: *mut c_void,
) {
    engine::try_catch_finally(|| body(ctx), || handler(ctx), || cleanup(ctx));
}
