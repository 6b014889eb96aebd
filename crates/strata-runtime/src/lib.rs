//! Runtime library for programs transpiled from Pascal-family sources.
//!
//! Generated code links against this crate for the language features that
//! have no direct Rust counterpart:
//!
//! - structured exceptions (`try`/`except`/`finally`, `raise`) that also
//!   catch hardware faults such as division by zero or invalid memory
//!   access
//! - dynamic arrays with copy-on-write sharing
//! - algebraic sets
//! - 1-based UTF-16 strings and their routine library
//! - raw memory routines and trapping integer division
//!
//! # Architecture
//!
//! A `try` block is lowered to a call into the engine with closures for
//! each part:
//!
//! ```pascal
//! try
//!   X := A div B;
//! except
//!   WriteLn(GetExceptionMessage);
//! end;
//! ```
//!
//! Becomes:
//!
//! ```text
//! strata_runtime::try_catch(
//!     || x = strata_runtime::ops::div(a, b),
//!     || println!("{}", strata_runtime::exception_message()),
//! );
//! ```
//!
//! Software exceptions unwind to the nearest region. Hardware faults are
//! trapped by a process-wide signal handler that jumps back into the
//! innermost region of the faulting thread. Faults outside any region keep
//! the platform's default, fatal behavior.

pub mod config;
mod dynarray;
mod engine;
pub mod error;
pub mod fault;
pub mod ffi;
pub mod memory;
pub mod ops;
pub mod region;
mod set;
mod state;
pub mod text;

pub use config::RuntimeConfig;
pub use dynarray::DynArray;
pub use engine::{
    abort, halt, protect, raise, raise_code, raise_error, raise_record, record_from_payload,
    reraise, run_error, run_main, try_catch, try_catch_finally, try_finally, Raised,
    RegionOutcome,
};
pub use error::{ConfigError, Result, RuntimeError};
pub use fault::FaultKind;
pub use set::{in_set, make_set, Set};
pub use state::{
    clear_exception, exception_code, exception_kind, exception_message, ExceptionKind,
    ExceptionRecord, EXC_ACCESS_VIOLATION, EXC_BUS_ERROR, EXC_DIV_BY_ZERO, EXC_HARDWARE_UNKNOWN,
    EXC_ILLEGAL_INSTRUCTION, EXC_INDEX_OUT_OF_RANGE, EXC_INTEGER_OVERFLOW, EXC_INVALID_ARGUMENT,
    EXC_NONE, EXC_OUT_OF_MEMORY, EXC_SOFTWARE, EXC_STACK_OVERFLOW,
};
pub use text::{Char, Text};

/// Runtime version for compatibility checking.
pub const RUNTIME_VERSION: u32 = 1;

/// Initialize the runtime with the active configuration.
///
/// Called implicitly by the first protected region; calling it again is
/// cheap. Installs the hardware fault handlers unless the configuration
/// disables them.
pub fn init() -> &'static RuntimeConfig {
    let config = RuntimeConfig::active();
    fault::install(config);
    config
}

/// Initialize the runtime with an explicit configuration.
///
/// Only the first initialization takes effect; the returned reference is
/// the configuration actually in use.
pub fn init_with(config: &RuntimeConfig) -> &'static RuntimeConfig {
    let active = config.clone().activate();
    fault::install(active);
    active
}

/// Whether hardware fault handlers are installed in this process.
pub fn faults_intercepted() -> bool {
    fault::installed()
}
