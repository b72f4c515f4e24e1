//! Diagnostics: structured, stable-coded runtime messages.
//!
//! This module provides:
//! - **Runtime diagnostics**: dispatcher-aware error messages with stable codes
//! - **Profiler integration**: optional Tracy zones around node dispatch
//! - **Strict mode**: optional panic-on-error for CI
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                                  |
//! |-------|-------------------------------------------|
//! | VG0xx | Frame pool / next-frame / pending queue    |
//! | VG1xx | Node registry / mode switching             |
//! | VG2xx | Dispatcher loop / barrier                  |
//! | VG3xx | Process facility                           |
//! | VG4xx | Timing wheel                               |
//! | VG5xx | Handoff channel                            |
//! | VG9xx | Internal errors                            |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use packetgraph::{pg_diagnostic, pg_emit};
//!
//! // Emit a custom diagnostic
//! pg_diagnostic!(
//!     Error,
//!     code = "VG001",
//!     message = "frame pool exhausted for this size class",
//!     help = "increase the size class's pre-allocated frame count"
//! );
//!
//! // Emit a predefined diagnostic
//! pg_emit!(VG001);
//! ```

// Core diagnostic types
pub mod context;
pub mod emit;
pub mod kind;
pub mod macros;
pub mod strict;

// Profiler integration
#[cfg(feature = "tracy")]
mod tracy;

// Re-export core types
pub use context::{
    enter_dispatch, exit_dispatch, increment_loop_iteration, is_dispatch_active, loop_iteration,
    DiagContext,
};
pub use emit::{emit, emit_with_context, set_verbose, suppress_diagnostics, CollectingSink, DiagnosticSink};
pub use kind::{Diagnostic, DiagnosticKind};
pub use strict::{init_from_env, set_strict_mode, strict_mode, StrictMode, StrictModeGuard};

// Re-export predefined diagnostics
pub use kind::{
    VG001, VG002, VG003, VG004, VG101, VG102, VG103, VG104, VG201, VG202, VG301, VG302, VG401,
    VG402, VG501, VG901,
};

// Profiler hooks
#[cfg(feature = "tracy")]
pub use tracy::{DispatchEvent, ProfilerHooks, ProfilerZone};
