//! Hardware fault classification and trap-handler installation.
//!
//! The classifier is a pure mapping from a platform trap identifier to a
//! [`FaultKind`]. Installation of the process-wide handler happens exactly
//! once, lazily on the first protected-region entry or explicitly through
//! [`crate::init_with`].
//!
//! Only POSIX signal delivery is intercepted. The Windows exception-code
//! mapping is kept as a pure function so code-generation tools and tests can
//! use the same classification everywhere.

#[cfg(unix)]
mod posix;

#[cfg(unix)]
pub(crate) use posix::{install, installed, parse_signal, prepare_thread};

/// Signals intercepted unless the configuration names others.
pub const DEFAULT_SIGNALS: [&str; 4] = ["SIGFPE", "SIGSEGV", "SIGILL", "SIGBUS"];

use crate::state::{
    EXC_ACCESS_VIOLATION, EXC_BUS_ERROR, EXC_DIV_BY_ZERO, EXC_HARDWARE_UNKNOWN,
    EXC_ILLEGAL_INSTRUCTION, EXC_INTEGER_OVERFLOW, EXC_STACK_OVERFLOW,
};

/// The fixed set of trappable fault classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    DivideByZero,
    AccessViolation,
    StackOverflow,
    NumericOverflow,
    IllegalInstruction,
    BusError,
    Unknown,
}

impl FaultKind {
    /// Exception code reported for this fault.
    pub fn code(self) -> i32 {
        match self {
            FaultKind::DivideByZero => EXC_DIV_BY_ZERO,
            FaultKind::AccessViolation => EXC_ACCESS_VIOLATION,
            FaultKind::StackOverflow => EXC_STACK_OVERFLOW,
            FaultKind::NumericOverflow => EXC_INTEGER_OVERFLOW,
            FaultKind::IllegalInstruction => EXC_ILLEGAL_INSTRUCTION,
            FaultKind::BusError => EXC_BUS_ERROR,
            FaultKind::Unknown => EXC_HARDWARE_UNKNOWN,
        }
    }

    /// Message stored in the exception state when this fault is caught.
    pub fn description(self) -> &'static str {
        match self {
            FaultKind::DivideByZero => "Divide by zero",
            #[cfg(windows)]
            FaultKind::AccessViolation => "Access violation",
            #[cfg(not(windows))]
            FaultKind::AccessViolation => "Segmentation fault",
            FaultKind::StackOverflow => "Stack overflow",
            FaultKind::NumericOverflow => "Numeric overflow",
            FaultKind::IllegalInstruction => "Illegal instruction",
            FaultKind::BusError => "Bus error",
            FaultKind::Unknown => "Hardware exception",
        }
    }

    /// Classify a POSIX signal. `si_code` refines `SIGFPE` into divide
    /// versus overflow; stack overflow detection needs the faulting address
    /// and is done by the handler.
    #[cfg(unix)]
    pub fn from_signal(signal: libc::c_int, si_code: libc::c_int) -> Self {
        match signal {
            libc::SIGFPE => match si_code {
                si_codes::FPE_INTOVF | si_codes::FPE_FLTOVF | si_codes::FPE_FLTUND => {
                    FaultKind::NumericOverflow
                }
                _ => FaultKind::DivideByZero,
            },
            libc::SIGSEGV => FaultKind::AccessViolation,
            libc::SIGBUS => FaultKind::BusError,
            libc::SIGILL => FaultKind::IllegalInstruction,
            _ => FaultKind::Unknown,
        }
    }

    /// Classify a Windows structured exception code.
    pub fn from_windows_code(code: u32) -> Self {
        match code {
            windows_codes::ACCESS_VIOLATION | windows_codes::IN_PAGE_ERROR => {
                FaultKind::AccessViolation
            }
            windows_codes::INT_DIVIDE_BY_ZERO
            | windows_codes::FLT_DIVIDE_BY_ZERO
            | windows_codes::FLT_INVALID_OPERATION => FaultKind::DivideByZero,
            windows_codes::STACK_OVERFLOW => FaultKind::StackOverflow,
            windows_codes::INT_OVERFLOW
            | windows_codes::FLT_OVERFLOW
            | windows_codes::FLT_UNDERFLOW => FaultKind::NumericOverflow,
            windows_codes::ILLEGAL_INSTRUCTION | windows_codes::PRIV_INSTRUCTION => {
                FaultKind::IllegalInstruction
            }
            _ => FaultKind::Unknown,
        }
    }
}

/// `si_code` values for `SIGFPE`. They differ between kernels.
#[cfg(unix)]
mod si_codes {
    use libc::c_int;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub const FPE_INTOVF: c_int = 2;
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub const FPE_FLTOVF: c_int = 4;
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub const FPE_FLTUND: c_int = 5;

    #[cfg(target_vendor = "apple")]
    pub const FPE_INTOVF: c_int = 8;
    #[cfg(target_vendor = "apple")]
    pub const FPE_FLTOVF: c_int = 2;
    #[cfg(target_vendor = "apple")]
    pub const FPE_FLTUND: c_int = 3;

    // Unknown layout: every SIGFPE classifies as a divide fault.
    #[cfg(not(any(target_os = "linux", target_os = "android", target_vendor = "apple")))]
    pub const FPE_INTOVF: c_int = -1;
    #[cfg(not(any(target_os = "linux", target_os = "android", target_vendor = "apple")))]
    pub const FPE_FLTOVF: c_int = -2;
    #[cfg(not(any(target_os = "linux", target_os = "android", target_vendor = "apple")))]
    pub const FPE_FLTUND: c_int = -3;
}

/// NTSTATUS exception codes.
pub mod windows_codes {
    pub const ACCESS_VIOLATION: u32 = 0xC000_0005;
    pub const IN_PAGE_ERROR: u32 = 0xC000_0006;
    pub const ILLEGAL_INSTRUCTION: u32 = 0xC000_001D;
    pub const FLT_DIVIDE_BY_ZERO: u32 = 0xC000_008E;
    pub const FLT_INVALID_OPERATION: u32 = 0xC000_0090;
    pub const FLT_OVERFLOW: u32 = 0xC000_0091;
    pub const FLT_UNDERFLOW: u32 = 0xC000_0093;
    pub const INT_DIVIDE_BY_ZERO: u32 = 0xC000_0094;
    pub const INT_OVERFLOW: u32 = 0xC000_0095;
    pub const PRIV_INSTRUCTION: u32 = 0xC000_0096;
    pub const STACK_OVERFLOW: u32 = 0xC000_00FD;
}

/// Fault interception is POSIX-only; elsewhere installation is a no-op and
/// faults keep their platform default behavior.
#[cfg(not(unix))]
pub(crate) fn install(_config: &crate::config::RuntimeConfig) {}

#[cfg(not(unix))]
pub(crate) fn installed() -> bool {
    false
}

#[cfg(not(unix))]
pub(crate) fn prepare_thread() {}

#[cfg(not(unix))]
pub(crate) fn parse_signal(name: &str) -> Option<i32> {
    DEFAULT_SIGNALS.iter().position(|known| *known == name).map(|i| i as i32)
}
