//! Per-thread stack of protected regions.
//!
//! Every `try` block registers a resume point on entry and unregisters it on
//! every exit path. The innermost resume point is what the trap handler
//! jumps to, so the stack must be restored exactly even when a region is
//! left through a fault or a raise.
//!
//! The stack is threaded through the call stack: each [`RegionGuard`] keeps
//! the previous top and puts it back when dropped. The thread-local pointer
//! is a plain `Cell`, so the trap handler can read it without locking.

use core::cell::Cell;
use core::ptr;
use std::panic::{self, AssertUnwindSafe};

/// Saved register state for `setjmp`/`longjmp`.
///
/// Oversized to fit every platform `jmp_buf` layout (200 bytes on x86-64
/// glibc, up to ~400 bytes on aarch64).
#[repr(C, align(64))]
pub struct JmpBuf {
    _buf: [u8; 512],
}

impl JmpBuf {
    pub const fn new() -> Self {
        JmpBuf { _buf: [0u8; 512] }
    }
}

impl Default for JmpBuf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
extern "C" {
    /// `_setjmp` skips saving the signal mask. The handler is installed with
    /// `SA_NODEFER`, so the mask is never changed by a fault.
    #[link_name = "_setjmp"]
    fn c_setjmp(buf: *mut JmpBuf) -> i32;

    fn longjmp(buf: *mut JmpBuf, val: i32) -> !;
}

thread_local! {
    static CURRENT: Cell<*mut JmpBuf> = const { Cell::new(ptr::null_mut()) };
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    // Whether the thread was already unwinding when the innermost region
    // was entered.
    static ENTERED_UNWINDING: Cell<bool> = const { Cell::new(false) };
}

/// Opaque identity of a registered resume point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResumePointId(usize);

/// The innermost resume point on this thread, if any region is active.
pub fn current_resume_point() -> Option<ResumePointId> {
    let top = current_raw();
    (!top.is_null()).then(|| ResumePointId(top as usize))
}

/// Number of protected regions active on this thread.
pub fn depth() -> usize {
    DEPTH.with(Cell::get)
}

/// Read by the trap handler; async-signal-safe.
pub(crate) fn current_raw() -> *mut JmpBuf {
    CURRENT.with(Cell::get)
}

/// Whether jumping to the innermost resume point would skip over an unwind
/// that started inside that region. Read by the trap handler.
pub(crate) fn unwinding_since_entry() -> bool {
    std::thread::panicking() && !ENTERED_UNWINDING.with(Cell::get)
}

/// Keeps a resume point registered for as long as it lives.
pub(crate) struct RegionGuard {
    previous: *mut JmpBuf,
    previous_unwinding: bool,
}

/// Push `buf` as the innermost resume point.
pub(crate) fn enter(buf: *mut JmpBuf) -> RegionGuard {
    crate::fault::prepare_thread();
    let previous = CURRENT.with(|current| current.replace(buf));
    let previous_unwinding =
        ENTERED_UNWINDING.with(|flag| flag.replace(std::thread::panicking()));
    let depth = DEPTH.with(|d| {
        d.set(d.get() + 1);
        d.get()
    });
    tracing::trace!(depth, "enter protected region");
    RegionGuard {
        previous,
        previous_unwinding,
    }
}

impl Drop for RegionGuard {
    fn drop(&mut self) {
        CURRENT.with(|current| current.set(self.previous));
        ENTERED_UNWINDING.with(|flag| flag.set(self.previous_unwinding));
        let depth = DEPTH.with(|d| {
            d.set(d.get().saturating_sub(1));
            d.get()
        });
        tracing::trace!(depth, "leave protected region");
    }
}

/// Transfer control to a resume point. Called from the trap handler only.
///
/// # Safety
///
/// `target` must be the buffer of a region whose [`run_guarded`] frame is
/// still live on this thread.
#[cfg(unix)]
pub(crate) unsafe fn resume(target: *mut JmpBuf) -> ! {
    longjmp(target, 2)
}

/// How control came back from a guarded body.
pub(crate) enum Landing {
    /// The body returned or unwound.
    Returned(std::thread::Result<()>),
    /// The trap handler jumped back to the resume point.
    Resumed,
}

/// Record the resume point in `buf` and run `body`.
///
/// `setjmp` must be called from the frame that stays live while the body
/// runs, so this function is never inlined and does nothing after a resume
/// but report it.
///
/// # Safety
///
/// `buf` must be registered through [`enter`] for the duration of the call.
#[cfg(unix)]
#[inline(never)]
pub(crate) unsafe fn run_guarded(buf: *mut JmpBuf, body: &mut dyn FnMut()) -> Landing {
    if c_setjmp(buf) != 0 {
        return Landing::Resumed;
    }
    Landing::Returned(panic::catch_unwind(AssertUnwindSafe(|| body())))
}

#[cfg(not(unix))]
#[inline(never)]
pub(crate) unsafe fn run_guarded(_buf: *mut JmpBuf, body: &mut dyn FnMut()) -> Landing {
    Landing::Returned(panic::catch_unwind(AssertUnwindSafe(|| body())))
}
