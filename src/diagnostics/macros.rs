//! Diagnostic macros for user-facing API.
//!
//! These macros provide a clean, rustc-like diagnostic experience.

/// Emit a runtime diagnostic.
///
/// # Example
///
/// ```rust,ignore
/// pg_diagnostic!(
///     Error,
///     code = "VG001",
///     message = "frame pool exhausted for this size class",
///     note = "allocation failed and exhaustion is fatal under the documented contract",
///     help = "increase the size class's pre-allocated frame count"
/// );
/// ```
#[macro_export]
macro_rules! pg_diagnostic {
    (
        $kind:ident,
        code = $code:expr,
        message = $msg:expr
        $(, note = $note:expr)?
        $(, help = $help:expr)?
    ) => {{
        #[cfg(any(debug_assertions, feature = "diagnostics"))]
        {
            let diag = $crate::diagnostics::Diagnostic {
                kind: $crate::diagnostics::DiagnosticKind::$kind,
                code: $code,
                message: $msg,
                note: None $(.or(Some($note)))?,
                help: None $(.or(Some($help)))?,
            };
            $crate::diagnostics::emit::emit(&diag);
        }
    }};
}

/// Emit a runtime diagnostic with captured context.
///
/// # Example
///
/// ```rust,ignore
/// pg_diagnostic_ctx!(
///     Warning,
///     code = "VG501",
///     message = "handoff ring congested"
/// );
/// ```
#[macro_export]
macro_rules! pg_diagnostic_ctx {
    (
        $kind:ident,
        code = $code:expr,
        message = $msg:expr
        $(, note = $note:expr)?
        $(, help = $help:expr)?
    ) => {{
        #[cfg(any(debug_assertions, feature = "diagnostics"))]
        {
            let diag = $crate::diagnostics::Diagnostic {
                kind: $crate::diagnostics::DiagnosticKind::$kind,
                code: $code,
                message: $msg,
                note: None $(.or(Some($note)))?,
                help: None $(.or(Some($help)))?,
            };
            let ctx = $crate::diagnostics::context::DiagContext::capture();
            $crate::diagnostics::emit::emit_with_context(&diag, &ctx.format());
        }
    }};
}

/// Emit a predefined diagnostic by code.
///
/// # Example
///
/// ```rust,ignore
/// pg_emit!(VG001);
/// pg_emit!(VG103);
/// ```
#[macro_export]
macro_rules! pg_emit {
    ($code:ident) => {{
        #[cfg(any(debug_assertions, feature = "diagnostics"))]
        {
            $crate::diagnostics::emit::emit(&$crate::diagnostics::$code);
        }
    }};
}

/// Emit a predefined diagnostic with context.
#[macro_export]
macro_rules! pg_emit_ctx {
    ($code:ident) => {{
        #[cfg(any(debug_assertions, feature = "diagnostics"))]
        {
            let ctx = $crate::diagnostics::context::DiagContext::capture();
            $crate::diagnostics::emit::emit_with_context(
                &$crate::diagnostics::$code,
                &ctx.format(),
            );
        }
    }};
}

/// Compile-time diagnostic error.
///
/// This produces a hard compiler error with a formatted message.
///
/// # Example
///
/// ```rust,ignore
/// pg_compile_error!(
///     code = "VG901",
///     message = "tracy feature enabled but no zone name supplied"
/// );
/// ```
#[macro_export]
macro_rules! pg_compile_error {
    (
        code = $code:expr,
        message = $msg:expr
        $(, help = $help:expr)?
    ) => {
        compile_error!(concat!(
            "[packetgraph][", $code, "] ", $msg
            $(, "\n  help: ", $help)?
        ));
    };
}

/// Compile-time diagnostic warning (via deprecated).
///
/// This produces a compiler warning using the deprecation mechanism.
#[macro_export]
macro_rules! pg_compile_warning {
    (
        code = $code:expr,
        message = $msg:expr
    ) => {
        #[deprecated(note = concat!("[packetgraph][", $code, "] ", $msg))]
        const _PACKETGRAPH_WARNING: () = ();
        let _ = _PACKETGRAPH_WARNING;
    };
}

/// Assert a condition or emit a diagnostic.
///
/// # Example
///
/// ```rust,ignore
/// pg_assert!(magic_matches, VG002);
/// ```
#[macro_export]
macro_rules! pg_assert {
    ($cond:expr, $code:ident) => {{
        #[cfg(any(debug_assertions, feature = "diagnostics"))]
        {
            if !$cond {
                $crate::pg_emit!($code);
            }
        }
    }};
    ($cond:expr, $code:ident, ctx) => {{
        #[cfg(any(debug_assertions, feature = "diagnostics"))]
        {
            if !$cond {
                $crate::pg_emit_ctx!($code);
            }
        }
    }};
}

/// Debug-only diagnostic (completely removed in release).
#[macro_export]
macro_rules! pg_debug {
    ($($arg:tt)*) => {{
        #[cfg(debug_assertions)]
        {
            $crate::pg_diagnostic!($($arg)*);
        }
    }};
}

// Re-export macros at crate root for convenience
pub use crate::{
    pg_assert, pg_compile_error, pg_compile_warning, pg_debug, pg_diagnostic, pg_diagnostic_ctx,
    pg_emit, pg_emit_ctx,
};
