//! Integer `div` and `mod` with hardware trap semantics, and shifts.
//!
//! The divisor is not checked up front. On x86 the `idiv` instruction
//! itself traps on a zero divisor (and on `i32::MIN div -1`), and the trap
//! arrives through the fault handler like any other hardware fault. Targets
//! whose divide instruction does not trap raise `SIGFPE` synchronously
//! instead, so the observable behavior is the same.

/// Truncating integer division (`a div b`).
#[inline]
pub fn div(a: i32, b: i32) -> i32 {
    divide(a, b).0
}

/// Remainder with the sign of the dividend (`a mod b`).
#[inline]
pub fn modulo(a: i32, b: i32) -> i32 {
    divide(a, b).1
}

/// `value shl shift`. Only the low five bits of `shift` are used.
#[inline]
pub fn shl(value: i32, shift: i32) -> i32 {
    value.wrapping_shl(shift as u32)
}

/// `value shr shift`, sign-extending. Only the low five bits of `shift` are
/// used.
#[inline]
pub fn shr(value: i32, shift: i32) -> i32 {
    value.wrapping_shr(shift as u32)
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn divide(a: i32, b: i32) -> (i32, i32) {
    let quotient: i32;
    let remainder: i32;
    // SAFETY: the instruction only reads and writes the named registers. A
    // #DE trap is delivered as SIGFPE.
    unsafe {
        core::arch::asm!(
            "cdq",
            "idiv {divisor:e}",
            divisor = in(reg) b,
            inout("eax") a => quotient,
            out("edx") remainder,
            options(nomem, nostack),
        );
    }
    (quotient, remainder)
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn divide(a: i32, b: i32) -> (i32, i32) {
    if b == 0 || (a == i32::MIN && b == -1) {
        trap();
    }
    (a / b, a % b)
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
#[cold]
fn trap() -> ! {
    #[cfg(unix)]
    // SAFETY: raise delivers the signal to this thread before returning.
    unsafe {
        libc::raise(libc::SIGFPE);
    }
    // Only reached when SIGFPE is neither intercepted nor fatal.
    crate::raise_code(crate::state::EXC_DIV_BY_ZERO, "Divide by zero")
}
