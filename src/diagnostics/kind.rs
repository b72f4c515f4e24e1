//! Diagnostic kinds and core types.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// Diagnostic code wrapper for type-safe code references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagnosticCode(&'static str);

impl DiagnosticCode {
    /// Create a new diagnostic code.
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    /// Get the code string.
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Diagnostic severity level (for log-crate forwarding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// Informational hint - not a problem, just a suggestion.
    Hint,
    /// Warning - probably suboptimal but not necessarily wrong.
    Warning,
    /// Error - definitely a problem that should be fixed.
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hint => write!(f, "hint"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - something is definitely wrong.
    Error,
    /// A warning - something is probably wrong or suboptimal.
    Warning,
    /// Additional context about another diagnostic.
    Note,
    /// Actionable suggestion to fix the issue.
    Help,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
            DiagnosticKind::Help => "help",
        }
    }

    /// Get the emoji for this kind (for build.rs style output).
    pub fn emoji(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "\u{274c}",
            DiagnosticKind::Warning => "\u{26a0}",
            DiagnosticKind::Note => "\u{2139}",
            DiagnosticKind::Help => "\u{1f4a1}",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `VG0xx` - Frame pool / next-frame / pending queue
/// - `VG1xx` - Node registry / mode switching
/// - `VG2xx` - Dispatcher loop / barrier
/// - `VG3xx` - Process facility
/// - `VG4xx` - Timing wheel
/// - `VG5xx` - Handoff channel
/// - `VG9xx` - Internal errors
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "VG001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// Predefined diagnostics (VG0xx - frame pool / next-frame / pending queue)
// =============================================================================

/// VG001: Frame pool exhausted for a size class.
pub const VG001: Diagnostic = Diagnostic::error(
    "VG001",
    "frame pool exhausted for this size class",
)
.with_note("allocation failed and exhaustion is fatal under the documented contract")
.with_help("increase the size class's pre-allocated frame count or reduce concurrent in-flight frames");

/// VG002: Frame magic sentinel mismatch.
pub const VG002: Diagnostic = Diagnostic::error(
    "VG002",
    "frame magic sentinel mismatch on free or dispatch",
)
.with_note("the trailing sentinel no longer matches the documented constant, indicating an overrun")
.with_help("check for writes past the frame's vector capacity");

/// VG003: Frame freed while still referenced.
pub const VG003: Diagnostic = Diagnostic::error(
    "VG003",
    "frame freed while an owner slot or pending record still references it",
)
.with_note("violates the invariant that allocated implies referenced")
.with_help("clear the owning next-frame slot and pending record before freeing");

/// VG004: Next-frame ownership swap.
pub const VG004: Diagnostic = Diagnostic::warning(
    "VG004",
    "next-frame slot ownership transferred between producers",
)
.with_note("a second producer wrote to an arc already owned by another producer's slot");

// =============================================================================
// Predefined diagnostics (VG1xx - node registry / mode switching)
// =============================================================================

/// VG101: Duplicate node path.
pub const VG101: Diagnostic = Diagnostic::error(
    "VG101",
    "duplicate node path registration",
)
.with_note("a node with this path name is already registered")
.with_help("rename the node or remove the duplicate registration");

/// VG102: Arc names an unregistered node.
pub const VG102: Diagnostic = Diagnostic::error(
    "VG102",
    "outgoing arc names a node that was never registered",
)
.with_help("register the target node before resolving arcs, or check for a typo in the arc name");

/// VG103: Node switched from interrupt to polling mode.
pub const VG103: Diagnostic = Diagnostic::warning(
    "VG103",
    "node switched from interrupt to polling mode",
)
.with_note("its vector count over recent calls rose above polling_threshold");

/// VG104: Node switched from polling to interrupt mode.
pub const VG104: Diagnostic = Diagnostic::warning(
    "VG104",
    "node switched from polling to interrupt mode",
)
.with_note("its vector count fell to or below interrupt_threshold for the required dispatches");

// =============================================================================
// Predefined diagnostics (VG2xx - dispatcher loop / barrier)
// =============================================================================

/// VG201: Barrier rendezvous timed out.
pub const VG201: Diagnostic = Diagnostic::error(
    "VG201",
    "barrier rendezvous timed out",
)
.with_note("not all workers reached the barrier within the configured timeout")
.with_help("check for a worker stuck in a non-suspending node function");

/// VG202: Node function returned an error.
pub const VG202: Diagnostic = Diagnostic::error(
    "VG202",
    "node function returned an error",
)
.with_help("the error is prefixed with the node's path and routed to the bound diagnostic sink");

// =============================================================================
// Predefined diagnostics (VG3xx - process facility)
// =============================================================================

/// VG301: Process stack sentinel damaged.
pub const VG301: Diagnostic = Diagnostic::error(
    "VG301",
    "process stack sentinel damaged",
)
.with_note("the canary checked after every process return no longer matches")
.with_help("this indicates memory corruption in or around the process's private stack");

/// VG302: Process resumed while not suspended.
pub const VG302: Diagnostic = Diagnostic::error(
    "VG302",
    "attempted to resume a process that was not suspended",
);

// =============================================================================
// Predefined diagnostics (VG4xx - timing wheel)
// =============================================================================

/// VG401: Timing wheel expirations bounded by max_expirations.
pub const VG401: Diagnostic = Diagnostic::warning(
    "VG401",
    "expire_timers hit max_expirations and left entries for the next call",
)
.with_help("increase max_expirations or call expire_timers more frequently");

/// VG402: Timer handle double-stop.
pub const VG402: Diagnostic = Diagnostic::warning(
    "VG402",
    "stop() called on an already-free timer handle",
)
.with_note("this is treated as a safe no-op per the documented idempotence contract");

// =============================================================================
// Predefined diagnostics (VG5xx - handoff channel)
// =============================================================================

/// VG501: Handoff ring congested.
pub const VG501: Diagnostic = Diagnostic::warning(
    "VG501",
    "handoff ring congested, packets added to drop batch",
)
.with_help("the consumer worker is falling behind; consider widening the ring or rebalancing load");

// =============================================================================
// Predefined diagnostics (VG9xx - internal)
// =============================================================================

/// VG901: Internal dispatcher error.
pub const VG901: Diagnostic = Diagnostic::error(
    "VG901",
    "internal dispatcher error",
)
.with_note("this indicates a bug in packetgraph")
.with_help("please file an issue with a minimal reproduction");
