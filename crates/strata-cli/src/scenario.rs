//! Fault and exception scenarios exercised by `strata trigger`.

use std::hint::black_box;

use clap::ValueEnum;
use strata_runtime::{
    exception_code, exception_kind, exception_message, ops, run_main, try_catch, DynArray,
};

/// Stack size for the thread that runs the stack overflow scenario.
const OVERFLOW_STACK: usize = 256 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Integer division by zero
    DivideByZero,
    /// Read from an unmapped address
    AccessViolation,
    /// Execute an undefined instruction
    IllegalInstruction,
    /// Deliver SIGBUS to the current thread
    BusError,
    /// Unbounded recursion on a small stack
    StackOverflow,
    /// Raise a software exception
    Raise,
    /// Index past the end of a dynamic array
    IndexOutOfRange,
    /// Resize a dynamic array to a negative length
    InvalidArgument,
    /// Divide by zero in a destructor while an exception unwinds
    FaultDuringUnwind,
    /// End the program with exit code 3
    Halt,
    /// Report runtime error 201 and exit with it
    RunError,
    /// Terminate abnormally
    Abort,
}

struct DivideOnDrop;

impl Drop for DivideOnDrop {
    fn drop(&mut self) {
        black_box(ops::div(black_box(1), black_box(0)));
    }
}

impl Scenario {
    /// Execute the failing operation.
    pub fn trigger(self) {
        match self {
            Scenario::DivideByZero => {
                black_box(ops::div(black_box(1), black_box(0)));
            }
            Scenario::AccessViolation => {
                let addr = black_box(16usize) as *const u8;
                // SAFETY: not safe; the read faults on purpose.
                black_box(unsafe { addr.read_volatile() });
            }
            Scenario::IllegalInstruction => illegal_instruction(),
            Scenario::BusError => {
                // SAFETY: raising a signal at the current thread.
                unsafe {
                    libc::raise(libc::SIGBUS);
                }
            }
            Scenario::StackOverflow => {
                black_box(recurse(0));
            }
            Scenario::Raise => strata_runtime::raise_code(100, "scenario exception"),
            Scenario::IndexOutOfRange => {
                let arr = DynArray::from_vec(vec![1, 2, 3]);
                black_box(arr[arr.length()]);
            }
            Scenario::InvalidArgument => {
                let mut arr: DynArray<i32> = DynArray::new();
                arr.set_length(-1);
            }
            Scenario::FaultDuringUnwind => {
                let _guard = DivideOnDrop;
                strata_runtime::raise("unwinding");
            }
            Scenario::Halt => strata_runtime::halt(3),
            Scenario::RunError => strata_runtime::run_error(201),
            Scenario::Abort => strata_runtime::abort(),
        }
    }

    fn needs_small_stack(self) -> bool {
        self == Scenario::StackOverflow
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn illegal_instruction() {
    // SAFETY: ud2 traps unconditionally.
    unsafe { core::arch::asm!("ud2", options(nomem, nostack)) };
}

#[cfg(target_arch = "aarch64")]
fn illegal_instruction() {
    // SAFETY: udf traps unconditionally.
    unsafe { core::arch::asm!("udf #0", options(nomem, nostack)) };
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn illegal_instruction() {
    // SAFETY: raising a signal at the current thread.
    unsafe {
        libc::raise(libc::SIGILL);
    }
}

#[allow(unconditional_recursion)]
#[inline(never)]
fn recurse(depth: u64) -> u64 {
    let pad = black_box([depth as u8; 512]);
    recurse(depth + 1) + u64::from(pad[7])
}

/// Run `f` on a thread with a small stack when the scenario needs it.
fn on_scenario_thread<R, F>(scenario: Scenario, f: F) -> R
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    if !scenario.needs_small_stack() {
        return f();
    }
    let handle = std::thread::Builder::new()
        .name("scenario".into())
        .stack_size(OVERFLOW_STACK)
        .spawn(f);
    match handle.map(|h| h.join()) {
        Ok(Ok(result)) => result,
        Ok(Err(payload)) => std::panic::resume_unwind(payload),
        Err(err) => strata_runtime::raise(format!("failed to spawn scenario thread: {err}")),
    }
}

/// Run the scenario inside a protected region and describe what was
/// caught.
pub fn run_protected(scenario: Scenario) -> String {
    on_scenario_thread(scenario, move || {
        let mut report = String::from("completed");
        try_catch(
            || scenario.trigger(),
            || {
                report = format!(
                    "caught kind={:?} code={} message={}",
                    exception_kind(),
                    exception_code(),
                    exception_message()
                );
            },
        );
        report
    })
}

/// Run the scenario with no protected region, as a program's main routine.
/// Returns the exit code; hardware faults terminate the process instead.
pub fn run_unprotected(scenario: Scenario) -> i32 {
    on_scenario_thread(scenario, move || run_main(|| scenario.trigger()))
}
