//! Thread-local exception state.
//!
//! Each thread sees the most recently raised or trapped exception through
//! [`exception_kind`], [`exception_code`] and [`exception_message`]. The
//! record is overwritten by every raise and every catch on that thread and
//! stays readable after the handler returns.
//!
//! The trap handler never touches the record itself: it only stores the
//! classified [`FaultKind`] in a `Cell`, and the engine materializes the
//! message after control is back in ordinary context.

use core::cell::{Cell, RefCell};

use crate::fault::FaultKind;
use crate::text::Text;

pub const EXC_NONE: i32 = 0;
pub const EXC_SOFTWARE: i32 = 1;
pub const EXC_DIV_BY_ZERO: i32 = 2;
pub const EXC_ACCESS_VIOLATION: i32 = 3;
pub const EXC_STACK_OVERFLOW: i32 = 4;
pub const EXC_INTEGER_OVERFLOW: i32 = 5;
pub const EXC_ILLEGAL_INSTRUCTION: i32 = 6;
pub const EXC_BUS_ERROR: i32 = 7;
pub const EXC_HARDWARE_UNKNOWN: i32 = 8;
pub const EXC_INVALID_ARGUMENT: i32 = 10;
pub const EXC_INDEX_OUT_OF_RANGE: i32 = 11;
pub const EXC_OUT_OF_MEMORY: i32 = 12;

/// What kind of exception the current record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// Nothing has been raised on this thread.
    None,
    /// Raised explicitly, with a user or runtime code.
    Software { code: i32 },
    /// Negative size or count passed to a container.
    InvalidArgument,
    /// Container index outside its valid range.
    IndexOutOfRange,
    /// A trapped hardware fault.
    HardwareFault(FaultKind),
}

impl ExceptionKind {
    /// The integer code generated code sees from `GetExceptionCode`.
    pub fn code(self) -> i32 {
        match self {
            ExceptionKind::None => EXC_NONE,
            ExceptionKind::Software { code } => code,
            ExceptionKind::InvalidArgument => EXC_INVALID_ARGUMENT,
            ExceptionKind::IndexOutOfRange => EXC_INDEX_OUT_OF_RANGE,
            ExceptionKind::HardwareFault(fault) => fault.code(),
        }
    }

    pub fn is_hardware(self) -> bool {
        matches!(self, ExceptionKind::HardwareFault(_))
    }
}

/// Kind and message of one exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionRecord {
    pub kind: ExceptionKind,
    pub message: Text,
}

impl ExceptionRecord {
    pub const fn none() -> Self {
        Self {
            kind: ExceptionKind::None,
            message: Text::new(),
        }
    }

    pub fn new(kind: ExceptionKind, message: impl Into<Text>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Record for a trapped fault, using the fault's fixed description.
    pub fn fault(kind: FaultKind) -> Self {
        Self::new(ExceptionKind::HardwareFault(kind), kind.description())
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}

impl Default for ExceptionRecord {
    fn default() -> Self {
        Self::none()
    }
}

thread_local! {
    static CURRENT: RefCell<ExceptionRecord> = const { RefCell::new(ExceptionRecord::none()) };

    /// Written by the trap handler right before it resumes a region.
    static PENDING_FAULT: Cell<Option<FaultKind>> = const { Cell::new(None) };
}

/// Overwrite the current record.
pub fn record(record: ExceptionRecord) {
    CURRENT.with(|current| *current.borrow_mut() = record);
}

/// A copy of the current record.
pub fn current() -> ExceptionRecord {
    CURRENT.with(|current| current.borrow().clone())
}

/// Kind of the most recent exception on this thread.
pub fn exception_kind() -> ExceptionKind {
    CURRENT.with(|current| current.borrow().kind)
}

/// Code of the most recent exception on this thread.
pub fn exception_code() -> i32 {
    exception_kind().code()
}

/// Message of the most recent exception on this thread.
pub fn exception_message() -> Text {
    CURRENT.with(|current| current.borrow().message.clone())
}

/// Reset this thread's record to "no exception".
pub fn clear_exception() {
    record(ExceptionRecord::none());
}

/// Called from the trap handler; must stay async-signal-safe.
pub(crate) fn set_pending_fault(kind: FaultKind) {
    PENDING_FAULT.with(|pending| pending.set(Some(kind)));
}

pub(crate) fn take_pending_fault() -> Option<FaultKind> {
    PENDING_FAULT.with(Cell::take)
}
