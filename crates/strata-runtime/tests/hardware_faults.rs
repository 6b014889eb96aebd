//! Real hardware faults raised inside protected regions.

#![cfg(unix)]

use std::cell::Cell;
use std::hint::black_box;

use strata_runtime::region;
use strata_runtime::{
    exception_code, exception_kind, exception_message, ops, protect, try_catch,
    try_catch_finally, try_finally, ExceptionKind, FaultKind, RegionOutcome,
};

/// Unmapped on every supported platform; not null so the read is not
/// rejected before it reaches the hardware.
fn bad_address() -> *const u8 {
    black_box(16usize) as *const u8
}

fn caught_kind<F: FnOnce()>(body: F) -> ExceptionKind {
    let mut observed = ExceptionKind::None;
    try_catch(body, || observed = exception_kind());
    observed
}

#[test]
fn divide_by_zero_is_caught() {
    let kind = caught_kind(|| {
        black_box(ops::div(1, black_box(0)));
    });
    assert_eq!(kind, ExceptionKind::HardwareFault(FaultKind::DivideByZero));
    assert_eq!(exception_message().to_utf8(), "Divide by zero");
    assert!(strata_runtime::faults_intercepted());
}

#[test]
fn modulo_by_zero_is_caught() {
    let outcome = protect(|| {
        black_box(ops::modulo(black_box(7), black_box(0)));
    });
    assert_eq!(outcome, RegionOutcome::Fault(FaultKind::DivideByZero));
}

#[test]
fn invalid_read_is_an_access_violation() {
    let kind = caught_kind(|| {
        // SAFETY: the read faults and control returns to the region.
        black_box(unsafe { bad_address().read_volatile() });
    });
    assert_eq!(kind, ExceptionKind::HardwareFault(FaultKind::AccessViolation));
    assert_eq!(exception_message().to_utf8(), "Segmentation fault");
}

#[test]
fn bus_error_signal_is_classified() {
    let kind = caught_kind(|| unsafe {
        libc::raise(libc::SIGBUS);
    });
    assert_eq!(kind, ExceptionKind::HardwareFault(FaultKind::BusError));
}

#[test]
fn illegal_instruction_is_classified() {
    let kind = caught_kind(|| {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        // SAFETY: ud2 traps; the handler resumes the region.
        unsafe {
            core::arch::asm!("ud2", options(nomem, nostack));
        }
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        unsafe {
            libc::raise(libc::SIGILL);
        }
    });
    assert_eq!(kind, ExceptionKind::HardwareFault(FaultKind::IllegalInstruction));
}

#[test]
fn nested_regions_are_restored_after_a_fault() {
    let outer = Cell::new(None);
    let inner_kind = Cell::new(ExceptionKind::None);
    let after = Cell::new(None);
    try_catch(
        || {
            outer.set(region::current_resume_point());
            try_catch(
                || {
                    black_box(ops::div(black_box(3), black_box(0)));
                },
                || inner_kind.set(exception_kind()),
            );
            after.set(region::current_resume_point());
        },
        || {},
    );
    assert!(outer.get().is_some());
    assert_eq!(after.get(), outer.get());
    assert_eq!(inner_kind.get(), ExceptionKind::HardwareFault(FaultKind::DivideByZero));
    assert_eq!(region::depth(), 0);
}

#[test]
fn fault_in_handler_reaches_outer_region() {
    let outcome = protect(|| {
        try_catch(
            || strata_runtime::raise("first"),
            || {
                black_box(ops::div(1, black_box(0)));
            },
        );
    });
    assert_eq!(outcome, RegionOutcome::Fault(FaultKind::DivideByZero));
}

#[test]
fn finally_reraises_the_fault() {
    let cleaned = Cell::new(false);
    let outcome = protect(|| {
        try_finally(
            || unsafe {
                black_box(bad_address().read_volatile());
            },
            || cleaned.set(true),
        );
    });
    assert!(cleaned.get());
    let record = outcome.into_record().expect("fault should propagate");
    assert_eq!(record.kind, ExceptionKind::HardwareFault(FaultKind::AccessViolation));
    assert_eq!(record.message.to_utf8(), "Segmentation fault");
}

#[test]
fn catch_finally_handles_a_fault() {
    let handled = Cell::new(ExceptionKind::None);
    let cleaned = Cell::new(0);
    let outcome = protect(|| {
        try_catch_finally(
            || {
                black_box(ops::div(5, black_box(0)));
            },
            || handled.set(exception_kind()),
            || cleaned.set(cleaned.get() + 1),
        );
    });
    assert!(outcome.is_normal());
    assert_eq!(handled.get(), ExceptionKind::HardwareFault(FaultKind::DivideByZero));
    assert_eq!(cleaned.get(), 1);
    assert_eq!(region::depth(), 0);
}

#[test]
fn region_inside_a_destructor_intercepts_its_fault() {
    struct FaultInDrop<'a>(&'a Cell<Option<RegionOutcome>>);
    impl Drop for FaultInDrop<'_> {
        fn drop(&mut self) {
            self.0.set(Some(protect(|| {
                black_box(ops::div(1, black_box(0)));
            })));
        }
    }

    let inner = Cell::new(None);
    let outcome = protect(|| {
        let _guard = FaultInDrop(&inner);
        strata_runtime::raise_code(21, "unwinding");
    });
    assert_eq!(inner.take(), Some(RegionOutcome::Fault(FaultKind::DivideByZero)));
    let record = outcome.into_record().expect("raise should propagate");
    assert_eq!(record.code(), 21);
    assert!(!std::thread::panicking());
}

#[test]
fn faults_on_many_threads() {
    let workers: Vec<_> = (0..8)
        .map(|worker| {
            std::thread::spawn(move || {
                for round in 0..500 {
                    if (round + worker) % 2 == 0 {
                        let kind = caught_kind(|| {
                            black_box(ops::modulo(round, black_box(0)));
                        });
                        assert_eq!(kind, ExceptionKind::HardwareFault(FaultKind::DivideByZero));
                    } else {
                        let mut code = 0;
                        try_catch(
                            || strata_runtime::raise_code(1000 + worker, "worker"),
                            || code = exception_code(),
                        );
                        assert_eq!(code, 1000 + worker);
                    }
                    assert_eq!(region::depth(), 0);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn repeated_faults_on_one_thread() {
    for _ in 0..50 {
        let kind = caught_kind(|| {
            black_box(ops::div(1, black_box(0)));
        });
        assert_eq!(kind, ExceptionKind::HardwareFault(FaultKind::DivideByZero));
    }
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[test]
fn stack_overflow_is_classified() {
    #[allow(unconditional_recursion)]
    #[inline(never)]
    fn recurse(depth: u64) -> u64 {
        let pad = black_box([depth as u8; 512]);
        recurse(depth + 1) + u64::from(pad[7])
    }

    let kind = std::thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(|| {
            caught_kind(|| {
                black_box(recurse(0));
            })
        })
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(kind, ExceptionKind::HardwareFault(FaultKind::StackOverflow));
}
