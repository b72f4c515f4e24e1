//! Diagnostic context - thread and dispatch-loop state awareness.
//!
//! Provides context for more intelligent diagnostic messages.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::ThreadId;

/// Global dispatch-loop iteration counter for context.
static LOOP_ITERATION: AtomicU64 = AtomicU64::new(0);

/// Whether the calling thread is currently inside a dispatcher loop iteration.
///
/// Set with [`enter_dispatch`]/[`exit_dispatch`] around each call into
/// `Dispatcher::dispatch_once`; not a language-level global dispatcher state,
/// just bookkeeping for diagnostic messages.
static DISPATCH_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Diagnostic context containing runtime state.
#[derive(Debug, Clone)]
pub struct DiagContext {
    /// Whether a dispatch-loop iteration is currently active on this thread.
    pub dispatch_active: bool,
    /// Current dispatch-loop iteration number (if known).
    pub loop_iteration: u64,
    /// Current thread ID.
    pub thread_id: ThreadId,
    /// Thread name (if available).
    pub thread_name: Option<String>,
    /// Whether this is the main thread.
    pub is_main_thread: bool,
}

impl DiagContext {
    /// Capture the current context.
    pub fn capture() -> Self {
        let thread = std::thread::current();
        let thread_name = thread.name().map(String::from);

        Self {
            dispatch_active: DISPATCH_ACTIVE.load(Ordering::Relaxed),
            loop_iteration: LOOP_ITERATION.load(Ordering::Relaxed),
            thread_id: thread.id(),
            thread_name,
            is_main_thread: is_main_thread(),
        }
    }

    /// Create a minimal context (for when full capture isn't needed).
    pub fn minimal() -> Self {
        Self {
            dispatch_active: false,
            loop_iteration: LOOP_ITERATION.load(Ordering::Relaxed),
            thread_id: std::thread::current().id(),
            thread_name: None,
            is_main_thread: false,
        }
    }

    /// Format context for diagnostic output.
    pub fn format(&self) -> String {
        let mut parts = Vec::new();

        parts.push(format!("loop_iteration={}", self.loop_iteration));

        if self.dispatch_active {
            parts.push("dispatch_active=true".to_string());
        }

        if let Some(ref name) = self.thread_name {
            parts.push(format!("thread=\"{}\"", name));
        } else {
            parts.push(format!("thread={:?}", self.thread_id));
        }

        if self.is_main_thread {
            parts.push("main_thread=true".to_string());
        }

        parts.join(", ")
    }
}

impl std::fmt::Display for DiagContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}

// =============================================================================
// Context management
// =============================================================================

/// Mark that a dispatch-loop iteration has started on this thread.
pub fn enter_dispatch() {
    DISPATCH_ACTIVE.store(true, Ordering::Relaxed);
}

/// Mark that a dispatch-loop iteration has ended on this thread.
pub fn exit_dispatch() {
    DISPATCH_ACTIVE.store(false, Ordering::Relaxed);
}

/// Check if a dispatch-loop iteration is active on the calling thread.
pub fn is_dispatch_active() -> bool {
    DISPATCH_ACTIVE.load(Ordering::Relaxed)
}

/// Increment the dispatch-loop iteration counter.
pub fn increment_loop_iteration() {
    LOOP_ITERATION.fetch_add(1, Ordering::Relaxed);
}

/// Get the current dispatch-loop iteration number.
pub fn loop_iteration() -> u64 {
    LOOP_ITERATION.load(Ordering::Relaxed)
}

/// Reset the iteration counter (for testing).
pub fn reset_loop_counter() {
    LOOP_ITERATION.store(0, Ordering::Relaxed);
}

// =============================================================================
// Thread detection
// =============================================================================

/// Cached main thread ID.
static MAIN_THREAD_ID: std::sync::OnceLock<ThreadId> = std::sync::OnceLock::new();

/// Initialize the main thread ID (call from main, or `Dispatcher::new`).
pub fn init_main_thread() {
    let _ = MAIN_THREAD_ID.set(std::thread::current().id());
}

/// Check if current thread is the main thread.
pub fn is_main_thread() -> bool {
    MAIN_THREAD_ID
        .get()
        .map(|id| *id == std::thread::current().id())
        .unwrap_or(false)
}

// =============================================================================
// Context-aware diagnostic helpers
// =============================================================================

/// Check dispatch context and emit an internal diagnostic if called outside
/// a dispatch-loop iteration where one was expected.
pub fn check_dispatch_context() {
    let ctx = DiagContext::capture();

    if !ctx.dispatch_active {
        super::emit::emit_with_context(&super::kind::VG901, &ctx.format());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_capture() {
        let ctx = DiagContext::minimal();
        assert!(!ctx.dispatch_active);
    }

    #[test]
    fn test_loop_counter() {
        reset_loop_counter();
        assert_eq!(loop_iteration(), 0);

        increment_loop_iteration();
        assert_eq!(loop_iteration(), 1);

        increment_loop_iteration();
        assert_eq!(loop_iteration(), 2);

        reset_loop_counter();
    }

    #[test]
    fn test_dispatch_active() {
        exit_dispatch();
        assert!(!is_dispatch_active());

        enter_dispatch();
        assert!(is_dispatch_active());

        exit_dispatch();
    }

    #[test]
    fn test_context_format() {
        reset_loop_counter();
        exit_dispatch();

        let ctx = DiagContext::minimal();
        let formatted = ctx.format();

        assert!(formatted.contains("loop_iteration=0"));
    }
}
