//! Error types returned across the public API.
//!
//! Configuration/registration errors get a `thiserror`-derived enum so
//! callers can match on the specific failure; resource exhaustion and
//! integrity-assertion failures stay fatal (panics), per the error-kind
//! partition this crate documents.

use thiserror::Error;

/// Errors returned while registering nodes or resolving the graph.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Two nodes were registered under the same path name.
    #[error("duplicate node path: {path}")]
    DuplicatePath {
        /// The colliding path.
        path: String,
    },

    /// An outgoing arc named a node that was never registered.
    #[error("node {from} has an outgoing arc to unregistered node {to}")]
    UnresolvedArc {
        /// The node declaring the arc.
        from: String,
        /// The arc's target name.
        to: String,
    },

    /// A node declared a (scalar_size, vector_size) pair with no matching
    /// size class in the frame pool configuration.
    #[error("node {path} requests frame layout ({scalar_size}, {vector_size}) with no matching size class")]
    UnknownSizeClass {
        /// The node declaring the layout.
        path: String,
        /// Requested scalar-argument area size.
        scalar_size: usize,
        /// Requested vector-element size.
        vector_size: usize,
    },

    /// `finalize_arcs` was called twice, or a node was registered after
    /// finalization.
    #[error("graph already finalized; no further registration is possible")]
    AlreadyFinalized,
}

/// An error surfaced by a node function during dispatch.
///
/// Propagated with the node's path prefixed, then routed to the bound
/// [`crate::diagnostics::DiagnosticSink`] or the `log` crate, matching the
/// dual-path design the rest of the diagnostics module uses.
#[derive(Debug, Error)]
#[error("node {node_path}: {message}")]
pub struct DispatchError {
    /// Path of the node that returned the error.
    pub node_path: String,
    /// The node function's error message.
    pub message: String,
}

impl DispatchError {
    /// Construct a dispatch error, prefixing with the node's path.
    pub fn new(node_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_path: node_path.into(),
            message: message.into(),
        }
    }
}
