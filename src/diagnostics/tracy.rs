//! Tracy profiler integration: per-node dispatch zones.
//!
//! Only compiled when the `tracy` feature is enabled. Wraps each node's
//! dispatch call in a profiler zone so a Tracy capture shows time spent per
//! node, the same granularity the teacher crate gave per frame/pool
//! operation.

use tracy_client::Client;

/// A profiler zone bracketing a single node dispatch call.
///
/// Dropping the zone closes it; `node_path` should be a `'static` string
/// (node paths are interned at registration time) so no allocation happens
/// on the hot path.
pub struct ProfilerZone {
    _span: tracy_client::span::Span,
}

impl ProfilerZone {
    /// Open a zone named after a node path.
    pub fn new(node_path: &'static str) -> Self {
        ProfilerHooks::ensure_started();
        let span = tracy_client::Client::running()
            .expect("tracy client started above")
            .span_alloc(None, node_path, module_path!(), file!(), line!(), 0);
        Self { _span: span }
    }
}

/// Hooks for profiler lifecycle management, analogous to the teacher's
/// allocator-wide profiler hooks but scoped to the dispatcher.
pub struct ProfilerHooks;

impl ProfilerHooks {
    /// Ensure the Tracy client is running; idempotent.
    pub fn ensure_started() {
        let _ = Client::start();
    }

    /// Mark a named plot value (e.g. frames-in-flight, handoff ring depth).
    pub fn plot(name: &'static str, value: f64) {
        if let Some(client) = Client::running() {
            client.plot(tracy_client::plot_name!(name), value);
        }
    }

    /// Record a one-shot message visible in the Tracy timeline.
    pub fn message(text: &str) {
        if let Some(client) = Client::running() {
            client.message(text, 0);
        }
    }
}

/// A dispatch-loop event forwarded to Tracy as a plot or message, mirroring
/// the teacher's `MemoryEvent` shape but for dispatch-relevant counters.
#[derive(Debug, Clone, Copy)]
pub enum DispatchEvent {
    /// A node switched dispatch mode (interrupt <-> polling).
    ModeSwitch {
        /// Whether the node is now polling (false means now interrupt-driven).
        now_polling: bool,
    },
    /// A handoff ring dropped packets due to congestion.
    HandoffDrop {
        /// Number of packets dropped in this batch.
        count: u32,
    },
}

impl ProfilerHooks {
    /// Forward a dispatch event to Tracy.
    pub fn record_event(event: DispatchEvent) {
        match event {
            DispatchEvent::ModeSwitch { now_polling } => {
                Self::message(if now_polling {
                    "node switched to polling"
                } else {
                    "node switched to interrupt"
                });
            }
            DispatchEvent::HandoffDrop { count } => {
                Self::plot("handoff_drops", count as f64);
            }
        }
    }
}
