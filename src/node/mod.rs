//! Node registry & runtime (C4).
//!
//! A node is a named processing step with a declared input/output frame
//! layout and a set of outgoing arcs to other nodes by name. Registration
//! is two-phase, mirroring the teacher's builder-then-finalize pattern in
//! `api::lifecycle`: callers `register` descriptors in any order, then
//! `finalize_arcs` resolves arc names to runtime indices once, producing an
//! immutable [`registry::ResolvedGraph`] the dispatcher walks on every pass.

mod registry;
mod runtime;

pub use registry::{NodeDescriptor, NodeRegistry, ResolvedGraph, ResolvedNode};
pub use runtime::{DispatchContext, DispatchMode, LayeredCounter, NodeRuntime, NodeRuntimeTable, NodeStats};

use crate::error::DispatchError;

/// Where a node sits in the dispatch loop's ordering (spec'd processing
/// order: pre-input, then input, then internal nodes reached by arcs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    /// Runs once per loop iteration before any input node, unconditionally.
    PreInput,
    /// A packet source; polled every iteration or run on interrupt,
    /// depending on [`DispatchMode`].
    Input,
    /// Reached only via an arc from another node's output.
    Internal,
    /// Runs on its own logical thread of control via the process facility,
    /// suspending on a clock or event wait rather than returning.
    Process,
}

/// A node's processing function.
///
/// Reads its input via [`DispatchContext::input`] and writes downstream
/// packets via [`DispatchContext::enqueue`]. Returns the number of vectors
/// it consumed on success, or a [`DispatchError`] naming what went wrong;
/// the dispatcher prefixes the node's path and routes the error to the
/// bound diagnostic sink (`VG202`).
pub type NodeFn = Box<dyn Fn(&mut DispatchContext<'_>) -> Result<u32, DispatchError> + Send + Sync>;
