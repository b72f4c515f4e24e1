//! Backtrace capture for integrity-assertion failures.
//!
//! Only compiled when the `debug` feature is enabled. Integrity assertions
//! (frame magic mismatch, next-frame invariant violation, process canary
//! damage) `debug_assert!` in debug builds; in release builds with this
//! feature on, the assertion site instead captures a backtrace alongside
//! the emitted diagnostic so the failure can still be triaged.

use std::fmt;

/// A captured backtrace, attached to an integrity-assertion diagnostic.
pub struct CapturedBacktrace {
    inner: backtrace::Backtrace,
}

impl CapturedBacktrace {
    /// Capture the backtrace at the call site.
    pub fn capture() -> Self {
        Self {
            inner: backtrace::Backtrace::new(),
        }
    }
}

impl fmt::Display for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.inner)
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

/// Emit a diagnostic plus a captured backtrace to stderr, for use at
/// integrity-assertion sites in release builds with `debug` enabled.
pub fn emit_with_backtrace(diag: &crate::diagnostics::Diagnostic) {
    crate::diagnostics::emit(diag);
    let bt = CapturedBacktrace::capture();
    eprintln!("  backtrace:\n{}", bt);
}
