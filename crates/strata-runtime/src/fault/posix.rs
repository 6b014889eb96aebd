//! POSIX signal handlers for hardware faults.
//!
//! The handler runs on the faulting thread. If that thread has an active
//! protected region it classifies the signal, stores the kind in the
//! thread's pending-fault slot and `longjmp`s to the region's resume point.
//! Otherwise it restores the default disposition and re-raises, so faults
//! outside any region stay fatal. So do faults raised while an exception is
//! unwinding through the innermost region.
//!
//! Nothing here allocates, locks or logs once the handler is running.

use core::cell::Cell;
use core::ffi::c_void;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

use libc::{c_int, siginfo_t};

use super::FaultKind;
use crate::config::RuntimeConfig;
use crate::{region, state};

static INSTALL: Once = Once::new();
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Map a signal name from the configuration to its number.
pub(crate) fn parse_signal(name: &str) -> Option<c_int> {
    match name {
        "SIGFPE" => Some(libc::SIGFPE),
        "SIGSEGV" => Some(libc::SIGSEGV),
        "SIGILL" => Some(libc::SIGILL),
        "SIGBUS" => Some(libc::SIGBUS),
        _ => None,
    }
}

/// Install the fault handlers once per process.
pub(crate) fn install(config: &RuntimeConfig) {
    INSTALL.call_once(|| {
        if !config.faults.intercept {
            tracing::debug!("hardware fault interception disabled by configuration");
            return;
        }

        let signals: Vec<c_int> = config
            .faults
            .signals
            .iter()
            .filter_map(|name| parse_signal(name))
            .collect();

        for &signal in &signals {
            // SAFETY: the action is fully initialised and `on_fault` has the
            // three-argument signature SA_SIGINFO requires.
            let rc = unsafe {
                let mut action: libc::sigaction = core::mem::zeroed();
                action.sa_sigaction = on_fault as extern "C" fn(c_int, *mut siginfo_t, *mut c_void)
                    as libc::sighandler_t;
                // SA_NODEFER keeps the signal unblocked after we longjmp out
                // of the handler.
                action.sa_flags = libc::SA_SIGINFO | libc::SA_NODEFER | libc::SA_ONSTACK;
                libc::sigemptyset(&mut action.sa_mask);
                libc::sigaction(signal, &action, core::ptr::null_mut())
            };
            if rc != 0 {
                tracing::warn!(signal, "failed to install fault handler");
            }
        }

        INSTALLED.store(true, Ordering::Release);
        tracing::debug!(signals = ?config.faults.signals, "installed hardware fault handlers");
    });
}

/// Whether fault handlers are active in this process.
pub(crate) fn installed() -> bool {
    INSTALLED.load(Ordering::Acquire)
}

extern "C" fn on_fault(signal: c_int, info: *mut siginfo_t, _context: *mut c_void) {
    let target = region::current_raw();
    if target.is_null() || region::unwinding_since_entry() {
        // SAFETY: restoring SIG_DFL and re-raising is async-signal-safe.
        unsafe {
            libc::signal(signal, libc::SIG_DFL);
            libc::raise(signal);
        }
        return;
    }

    let mut kind = FaultKind::from_signal(signal, si_code(info));
    if signal == libc::SIGSEGV && stack_guard::contains(fault_address(info)) {
        kind = FaultKind::StackOverflow;
    }
    state::set_pending_fault(kind);

    // SAFETY: `target` is the resume point of a region that is still on this
    // thread's stack; regions unregister themselves before returning.
    unsafe { region::resume(target) }
}

fn si_code(info: *mut siginfo_t) -> c_int {
    if info.is_null() {
        return 0;
    }
    // SAFETY: the kernel passes a valid siginfo_t with SA_SIGINFO.
    unsafe { (*info).si_code }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn fault_address(info: *mut siginfo_t) -> usize {
    if info.is_null() {
        return 0;
    }
    // SAFETY: see `si_code`.
    unsafe { (*info).si_addr() as usize }
}

#[cfg(target_vendor = "apple")]
fn fault_address(info: *mut siginfo_t) -> usize {
    if info.is_null() {
        return 0;
    }
    // SAFETY: see `si_code`.
    unsafe { (*info).si_addr as usize }
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_vendor = "apple")))]
fn fault_address(_info: *mut siginfo_t) -> usize {
    0
}

/// Record this thread's stack guard zone so the handler can tell a stack
/// overflow apart from any other segmentation fault.
pub(crate) fn prepare_thread() {
    stack_guard::prepare();
}

mod stack_guard {
    use super::Cell;

    thread_local! {
        // [low, high) of addresses treated as a guard-zone hit; 0..0 = unknown.
        pub(super) static ZONE: Cell<(usize, usize)> = const { Cell::new((0, 0)) };
    }

    /// Guard zone below the lowest usable stack address.
    const MIN_GUARD: usize = 64 * 1024;

    pub(super) fn contains(addr: usize) -> bool {
        let (low, high) = ZONE.with(Cell::get);
        low < high && (low..high).contains(&addr)
    }

    pub(super) fn prepare() {
        if ZONE.with(Cell::get).1 != 0 {
            return;
        }
        if let Some(zone) = query() {
            ZONE.with(|z| z.set(zone));
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    fn query() -> Option<(usize, usize)> {
        // SAFETY: the attribute object is initialised by pthread_getattr_np
        // and destroyed before returning.
        unsafe {
            let mut attr: libc::pthread_attr_t = core::mem::zeroed();
            if libc::pthread_getattr_np(libc::pthread_self(), &mut attr) != 0 {
                return None;
            }
            let mut addr: *mut libc::c_void = core::ptr::null_mut();
            let mut size: libc::size_t = 0;
            let mut guard: libc::size_t = 0;
            let ok = libc::pthread_attr_getstack(&attr, &mut addr, &mut size) == 0
                && libc::pthread_attr_getguardsize(&attr, &mut guard) == 0;
            libc::pthread_attr_destroy(&mut attr);
            if !ok {
                return None;
            }
            let page = usize::try_from(libc::sysconf(libc::_SC_PAGESIZE)).unwrap_or(4096);
            let low = addr as usize;
            // glibc may count the guard inside the reported stack; cover both sides.
            Some((low.saturating_sub(guard.max(MIN_GUARD)), low + guard.max(page)))
        }
    }

    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    fn query() -> Option<(usize, usize)> {
        None
    }
}
