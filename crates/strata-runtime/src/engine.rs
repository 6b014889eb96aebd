//! Structured exception handling for generated code.
//!
//! `try`/`except`/`finally` blocks lower to [`try_catch`], [`try_finally`]
//! and [`try_catch_finally`]. Two kinds of failure reach a handler:
//!
//! - software exceptions, raised with [`raise`] and friends, travel as a
//!   Rust unwind carrying a [`Raised`] payload;
//! - hardware faults (divide by zero, bad memory access, ...) are trapped by
//!   the signal handler, which jumps back to the innermost region's resume
//!   point.
//!
//! Both end up as a [`RegionOutcome`] and in the thread's exception state,
//! so handlers cannot tell which path delivered the exception.
//!
//! A hardware fault abandons the frames between the faulting instruction
//! and the region without running their destructors. Values owned by those
//! frames are leaked.
//!
//! A fault raised while an exception unwinds through a region (a destructor
//! dividing by zero during [`raise`], say) is not intercepted: jumping over
//! the unwind would leave the thread marked as panicking. It terminates the
//! process like a fault outside any region. Regions entered during the
//! unwind, inside that destructor, still intercept their own faults.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::RuntimeError;
use crate::fault::FaultKind;
use crate::region::{self, JmpBuf, Landing};
use crate::state::{self, ExceptionKind, ExceptionRecord, EXC_OUT_OF_MEMORY, EXC_SOFTWARE};
use crate::text::Text;

/// Unwind payload of a software exception.
#[derive(Debug, Clone)]
pub struct Raised(pub ExceptionRecord);

/// How a protected region ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionOutcome {
    /// The body completed.
    Normal,
    /// The body raised a software exception.
    Raised(ExceptionRecord),
    /// The body triggered a hardware fault.
    Fault(FaultKind),
}

impl RegionOutcome {
    pub fn is_normal(&self) -> bool {
        matches!(self, RegionOutcome::Normal)
    }

    /// The exception this outcome carries, if any.
    pub fn into_record(self) -> Option<ExceptionRecord> {
        match self {
            RegionOutcome::Normal => None,
            RegionOutcome::Raised(record) => Some(record),
            RegionOutcome::Fault(kind) => Some(ExceptionRecord::fault(kind)),
        }
    }
}

/// Run `body` inside a protected region and report how it ended.
///
/// Any exception is recorded in the thread's exception state before this
/// returns. The region is unregistered on every path.
pub fn protect<F: FnOnce()>(body: F) -> RegionOutcome {
    crate::init();

    let mut body = Some(body);
    let mut run = move || {
        if let Some(body) = body.take() {
            body();
        }
    };

    let mut resume = JmpBuf::new();
    let buf: *mut JmpBuf = &mut resume;
    let landing = {
        let _region = region::enter(buf);
        // SAFETY: `buf` stays registered until `_region` drops, after
        // `run_guarded` has returned.
        unsafe { region::run_guarded(buf, &mut run) }
    };

    let outcome = match landing {
        Landing::Returned(Ok(())) => RegionOutcome::Normal,
        Landing::Returned(Err(payload)) => RegionOutcome::Raised(record_from_payload(payload)),
        Landing::Resumed => {
            let kind = state::take_pending_fault().unwrap_or(FaultKind::Unknown);
            tracing::debug!(?kind, "intercepted hardware fault");
            RegionOutcome::Fault(kind)
        }
    };

    match &outcome {
        RegionOutcome::Normal => {}
        RegionOutcome::Raised(record) => {
            tracing::trace!(code = record.code(), message = %record.message, "caught exception");
            state::record(record.clone());
        }
        RegionOutcome::Fault(kind) => state::record(ExceptionRecord::fault(*kind)),
    }
    outcome
}

/// Turn an unwind payload into an exception record.
///
/// Panics that did not come from [`raise`] become software exceptions
/// carrying the panic message.
pub fn record_from_payload(payload: Box<dyn Any + Send>) -> ExceptionRecord {
    let payload = match payload.downcast::<Raised>() {
        Ok(raised) => return raised.0,
        Err(payload) => payload,
    };
    let software = ExceptionKind::Software { code: EXC_SOFTWARE };
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        ExceptionRecord::new(software, *message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        ExceptionRecord::new(software, message)
    } else {
        ExceptionRecord::new(software, "Unknown exception")
    }
}

/// `try body except handler end`.
///
/// `handler` runs after the region has been left, with the exception state
/// describing what went wrong in `body`.
pub fn try_catch<B, H>(body: B, handler: H)
where
    B: FnOnce(),
    H: FnOnce(),
{
    if !protect(body).is_normal() {
        handler();
    }
}

/// `try body finally cleanup end`.
///
/// `cleanup` always runs. An exception from `body` is re-raised afterwards
/// with its kind and message unchanged, unless `cleanup` raises its own.
/// When `body` completes, whatever `cleanup` leaves in the exception state
/// stays there.
pub fn try_finally<B, F>(body: B, cleanup: F)
where
    B: FnOnce(),
    F: FnOnce(),
{
    let outcome = protect(body);
    cleanup();
    // Re-raising records the body's exception again, whatever cleanup did.
    if let Some(record) = outcome.into_record() {
        raise_record(record);
    }
}

/// `try try body except handler end finally cleanup end`.
///
/// The exception from `body` never escapes. `cleanup` runs exactly once,
/// also when `handler` raises, in which case the handler's exception
/// propagates after it.
pub fn try_catch_finally<B, H, F>(body: B, handler: H, cleanup: F)
where
    B: FnOnce(),
    H: FnOnce(),
    F: FnOnce(),
{
    if protect(body).is_normal() {
        cleanup();
        return;
    }
    let handled = protect(handler);
    cleanup();
    if let Some(record) = handled.into_record() {
        raise_record(record);
    }
}

/// Raise a software exception with code `EXC_SOFTWARE`.
pub fn raise(message: impl Into<Text>) -> ! {
    raise_code(EXC_SOFTWARE, message)
}

/// Raise a software exception with a caller-chosen code.
pub fn raise_code(code: i32, message: impl Into<Text>) -> ! {
    raise_record(ExceptionRecord::new(ExceptionKind::Software { code }, message))
}

/// Raise a runtime failure as the matching exception kind.
pub fn raise_error(err: RuntimeError) -> ! {
    let kind = match &err {
        RuntimeError::InvalidArgument(_) => ExceptionKind::InvalidArgument,
        RuntimeError::IndexOutOfRange { .. } => ExceptionKind::IndexOutOfRange,
        RuntimeError::OutOfMemory { .. } => ExceptionKind::Software {
            code: EXC_OUT_OF_MEMORY,
        },
        RuntimeError::Convert(_) => ExceptionKind::Software { code: EXC_SOFTWARE },
    };
    raise_record(ExceptionRecord::new(kind, err.to_string()))
}

/// Raise the current exception again, as `raise;` inside a handler does.
pub fn reraise() -> ! {
    let record = state::current();
    if record.kind == ExceptionKind::None {
        raise("No exception to re-raise");
    }
    raise_record(record)
}

/// Record `record` as current and start unwinding.
///
/// Uses `resume_unwind`, so the panic hook does not print anything.
pub fn raise_record(record: ExceptionRecord) -> ! {
    state::record(record.clone());
    panic::resume_unwind(Box::new(Raised(record)))
}

/// Run a program's main routine and turn an unhandled exception into the
/// configured exit code.
///
/// Returns 0 when `main` completes. Hardware faults are not intercepted
/// here: outside a protected region they terminate the process.
pub fn run_main<F: FnOnce()>(main: F) -> i32 {
    let config = crate::init();
    match panic::catch_unwind(AssertUnwindSafe(main)) {
        Ok(()) => 0,
        Err(payload) => {
            let record = record_from_payload(payload);
            state::record(record.clone());
            tracing::error!(code = record.code(), message = %record.message, "unhandled exception");
            if config.exit.report_unhandled {
                eprintln!("Exception: {}", record.message);
            }
            config.exit.unhandled_exception_code
        }
    }
}

/// `Halt(code)`: end the program at once with `code`.
///
/// Pending `finally` blocks and destructors do not run. Standard output is
/// flushed.
pub fn halt(code: i32) -> ! {
    tracing::debug!(code, "halt");
    std::process::exit(code)
}

/// `RunError(code)`: report `Runtime error <code>` on stderr and exit with
/// `code`.
pub fn run_error(code: i32) -> ! {
    tracing::error!(code, "runtime error");
    eprintln!("Runtime error {code}");
    std::process::exit(code)
}

/// `Abort`: terminate abnormally without any cleanup.
pub fn abort() -> ! {
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{exception_code, exception_kind, exception_message, EXC_NONE};
    use std::cell::Cell;

    fn caught<F: FnOnce()>(body: F) -> ExceptionRecord {
        match protect(body).into_record() {
            Some(record) => record,
            None => panic!("body did not raise"),
        }
    }

    #[test]
    fn test_normal_completion() {
        let ran = Cell::new(false);
        assert_eq!(protect(|| ran.set(true)), RegionOutcome::Normal);
        assert!(ran.get());
        assert_eq!(region::depth(), 0);
    }

    #[test]
    fn test_handler_sees_raised_exception() {
        let mut seen = None;
        try_catch(
            || raise_code(42, "boom"),
            || seen = Some((exception_code(), exception_message().to_utf8())),
        );
        assert_eq!(seen, Some((42, "boom".to_string())));
        assert_eq!(region::depth(), 0);
    }

    #[test]
    fn test_handler_skipped_on_normal_exit() {
        let handled = Cell::new(false);
        try_catch(|| {}, || handled.set(true));
        assert!(!handled.get());
    }

    #[test]
    fn test_nested_regions_restore_resume_point() {
        let outer_point = Cell::new(None);
        let after_inner = Cell::new(None);
        try_catch(
            || {
                outer_point.set(region::current_resume_point());
                try_catch(|| raise("inner"), || {});
                after_inner.set(region::current_resume_point());
                try_catch(|| {}, || {});
                assert_eq!(region::current_resume_point(), outer_point.get());
                raise("outer");
            },
            || {},
        );
        assert!(outer_point.get().is_some());
        assert_eq!(after_inner.get(), outer_point.get());
        assert_eq!(region::current_resume_point(), None);
        assert_eq!(exception_message().to_utf8(), "outer");
    }

    #[test]
    fn test_finally_preserves_kind_and_message() {
        let cleaned = Cell::new(0);
        let record = caught(|| {
            try_finally(
                || raise_error(RuntimeError::InvalidArgument("bad size".into())),
                || {
                    // Exceptions handled inside cleanup must not leak out.
                    try_catch(|| raise("noise"), || {});
                    cleaned.set(cleaned.get() + 1);
                },
            )
        });
        assert_eq!(cleaned.get(), 1);
        assert_eq!(record.kind, ExceptionKind::InvalidArgument);
        assert_eq!(record.message.to_utf8(), "bad size");
    }

    #[test]
    fn test_finally_raise_overrides() {
        let record = caught(|| try_finally(|| raise("first"), || raise_code(9, "second")));
        assert_eq!(record.code(), 9);
        assert_eq!(record.message.to_utf8(), "second");
    }

    #[test]
    fn test_finally_runs_on_normal_exit() {
        let cleaned = Cell::new(false);
        try_finally(|| {}, || cleaned.set(true));
        assert!(cleaned.get());
    }

    #[test]
    fn test_finally_keeps_exception_caught_in_cleanup() {
        state::clear_exception();
        try_finally(|| {}, || try_catch(|| raise_code(33, "caught in cleanup"), || {}));
        assert_eq!(exception_code(), 33);
        assert_eq!(exception_message().to_utf8(), "caught in cleanup");
    }

    #[test]
    fn test_catch_finally_swallows_and_runs_once() {
        let handled = Cell::new(0);
        let cleaned = Cell::new(0);
        let outcome = protect(|| {
            try_catch_finally(
                || raise("swallowed"),
                || handled.set(handled.get() + 1),
                || cleaned.set(cleaned.get() + 1),
            )
        });
        assert!(outcome.is_normal());
        assert_eq!(handled.get(), 1);
        assert_eq!(cleaned.get(), 1);

        try_catch_finally(|| {}, || handled.set(handled.get() + 1), || cleaned.set(cleaned.get() + 1));
        assert_eq!(handled.get(), 1);
        assert_eq!(cleaned.get(), 2);
    }

    #[test]
    fn test_catch_finally_handler_raise_still_cleans_up() {
        let cleaned = Cell::new(0);
        let record = caught(|| {
            try_catch_finally(
                || raise("original"),
                || raise("from handler"),
                || cleaned.set(cleaned.get() + 1),
            )
        });
        assert_eq!(cleaned.get(), 1);
        assert_eq!(record.message.to_utf8(), "from handler");
    }

    #[test]
    fn test_reraise_inside_handler() {
        let record = caught(|| try_catch(|| raise_code(5, "again"), || reraise()));
        assert_eq!(record.code(), 5);
        assert_eq!(record.message.to_utf8(), "again");
    }

    #[test]
    fn test_reraise_without_exception() {
        std::thread::spawn(|| {
            let record = caught(|| reraise());
            assert_eq!(record.code(), EXC_SOFTWARE);
            assert_eq!(record.message.to_utf8(), "No exception to re-raise");
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_foreign_panics_become_software_exceptions() {
        let record = caught(|| panic::resume_unwind(Box::new("static text")));
        assert_eq!(record.kind, ExceptionKind::Software { code: EXC_SOFTWARE });
        assert_eq!(record.message.to_utf8(), "static text");

        let record = caught(|| panic::resume_unwind(Box::new(String::from("owned text"))));
        assert_eq!(record.message.to_utf8(), "owned text");

        let record = caught(|| panic::resume_unwind(Box::new(17u32)));
        assert_eq!(record.message.to_utf8(), "Unknown exception");
    }

    #[test]
    fn test_raise_error_kinds() {
        let record = caught(|| {
            raise_error(RuntimeError::IndexOutOfRange {
                container: "DynArray",
                index: 3,
                length: 3,
            })
        });
        assert_eq!(record.kind, ExceptionKind::IndexOutOfRange);
        assert_eq!(record.message.to_utf8(), "DynArray index out of range");

        let record = caught(|| raise_error(RuntimeError::OutOfMemory { size: 1 }));
        assert_eq!(record.code(), EXC_OUT_OF_MEMORY);
    }

    #[test]
    fn test_state_survives_handler() {
        try_catch(|| raise("kept"), || {});
        assert_eq!(exception_message().to_utf8(), "kept");
        assert!(!exception_kind().is_hardware());
        state::clear_exception();
        assert_eq!(exception_code(), EXC_NONE);
    }

    #[test]
    fn test_run_main_exit_codes() {
        assert_eq!(run_main(|| {}), 0);
        let code = run_main(|| raise("unhandled"));
        assert_eq!(code, crate::RuntimeConfig::active().exit.unhandled_exception_code);
        assert_eq!(exception_message().to_utf8(), "unhandled");
    }
}
