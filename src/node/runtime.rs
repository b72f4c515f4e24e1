//! Per-node runtime state: dispatch mode, statistics, and the context
//! handed to a node function while it runs.

use std::sync::atomic::{AtomicU32, Ordering};

use super::registry::ResolvedGraph;
use crate::frame::FramePool;
use crate::nextframe::NextFrameTable;
use crate::pending::PendingQueue;
use crate::sync::atomics::AtomicCounter;

/// Whether a node is currently polled every dispatch iteration or only run
/// when its interrupt fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Run on every dispatch iteration regardless of declared interest.
    Polling,
    /// Run only when its interrupt is signaled.
    Interrupt,
}

/// A cheap 32-bit counter updated every dispatch, synced into a 64-bit total
/// only when the 32-bit counter would overflow. Matches the two-layer
/// bookkeeping the teacher's own per-node stats use to keep the hot path a
/// single relaxed add in the common case, paying the (rare) 64-bit add only
/// once every ~4 billion dispatches.
#[derive(Debug, Default)]
pub struct LayeredCounter {
    total: AtomicCounter,
    since_overflow: AtomicU32,
}

impl LayeredCounter {
    /// Add `value` to the counter, folding the 32-bit layer into the total
    /// if this addition would overflow it.
    pub fn add(&self, value: u32) {
        let prev = self.since_overflow.load(Ordering::Relaxed);
        match prev.checked_add(value) {
            Some(next) => self.since_overflow.store(next, Ordering::Relaxed),
            None => {
                self.total.add(prev as u64);
                self.since_overflow.store(value, Ordering::Relaxed);
            }
        }
    }

    /// Add one.
    pub fn increment(&self) {
        self.add(1);
    }

    /// The full value, folding in whatever hasn't overflowed yet.
    pub fn get(&self) -> u64 {
        self.total.get() + self.since_overflow.load(Ordering::Relaxed) as u64
    }
}

/// Per-node call statistics.
///
/// `calls`, `vectors`, and `suspends` use [`LayeredCounter`]'s two-layer
/// design since they grow by a small amount every dispatch. `clocks` stays a
/// plain 64-bit counter: a single elapsed-time sample is itself wide-ranging
/// (nanoseconds), not the sustained small increment the two-layer design is
/// for.
#[derive(Debug, Default)]
pub struct NodeStats {
    /// Number of times this node has been dispatched.
    pub calls: LayeredCounter,
    /// Total vectors this node has processed across all calls.
    pub vectors: LayeredCounter,
    /// Total clock ticks spent in this node's function, if timed.
    pub clocks: AtomicCounter,
    /// Number of times a process node suspended mid-run.
    pub suspends: LayeredCounter,
}

/// Mutable per-node dispatch state, parallel to [`ResolvedGraph::nodes`].
pub struct NodeRuntime {
    /// Current dispatch mode.
    pub mode: DispatchMode,
    /// Call statistics.
    pub stats: NodeStats,
    /// Set by a single dispatch at or below `interrupt_threshold` while
    /// polling; the node does not switch back to interrupt mode on that
    /// same dispatch, only on its next one, one-shot and unconditional on
    /// that next dispatch's own vector count (the one-shot delay gives a
    /// driver a chance to re-arm interrupts before the node stops polling).
    switch_pending: bool,
    /// Base index into the [`NextFrameTable`] for this node's outgoing
    /// arcs: arc `i` lives at slot `next_frame_base + i`.
    pub next_frame_base: u32,
}

impl NodeRuntime {
    fn new(initial_mode: DispatchMode, next_frame_base: u32) -> Self {
        Self {
            mode: initial_mode,
            stats: NodeStats::default(),
            switch_pending: false,
            next_frame_base,
        }
    }

    /// Record one dispatch's vector count and clock cost, applying the
    /// mode-switch policy. Returns the new mode if this call changed it.
    pub fn record_dispatch(&mut self, n_vectors: u32, clocks: u64, polling_threshold: u32, interrupt_threshold: u32) -> Option<DispatchMode> {
        self.stats.calls.increment();
        self.stats.vectors.add(n_vectors);
        self.stats.clocks.add(clocks);

        match self.mode {
            DispatchMode::Interrupt if n_vectors > polling_threshold => {
                self.mode = DispatchMode::Polling;
                self.switch_pending = false;
                crate::diagnostics::emit(&crate::diagnostics::VG103);
                Some(DispatchMode::Polling)
            }
            DispatchMode::Interrupt => None,
            DispatchMode::Polling if self.switch_pending => {
                self.mode = DispatchMode::Interrupt;
                self.switch_pending = false;
                crate::diagnostics::emit(&crate::diagnostics::VG104);
                Some(DispatchMode::Interrupt)
            }
            DispatchMode::Polling if n_vectors <= interrupt_threshold => {
                self.switch_pending = true;
                None
            }
            DispatchMode::Polling => None,
        }
    }
}

/// Runtime state for every node in a [`ResolvedGraph`], indexed the same
/// way (runtime index == position in both slices).
pub struct NodeRuntimeTable {
    runtimes: Vec<NodeRuntime>,
}

impl NodeRuntimeTable {
    /// Build a runtime table for `graph`, allocating each node's next-frame
    /// slot range from a running total of outgoing arcs. Input nodes start
    /// in [`DispatchMode::Interrupt`]; everything else starts in
    /// [`DispatchMode::Polling`] (it has no interrupt source to begin with).
    pub fn from_graph(graph: &ResolvedGraph) -> Self {
        let mut next_base = 0u32;
        let runtimes = graph
            .nodes()
            .iter()
            .map(|node| {
                let base = next_base;
                next_base += node.arcs.len() as u32;
                let initial_mode = match node.category {
                    super::NodeCategory::Input => DispatchMode::Interrupt,
                    _ => DispatchMode::Polling,
                };
                NodeRuntime::new(initial_mode, base)
            })
            .collect();

        Self { runtimes }
    }

    /// Borrow a node's runtime state.
    pub fn get(&self, index: u32) -> &NodeRuntime {
        &self.runtimes[index as usize]
    }

    /// Borrow a node's runtime state mutably.
    pub fn get_mut(&mut self, index: u32) -> &mut NodeRuntime {
        &mut self.runtimes[index as usize]
    }

    /// Number of nodes tracked.
    pub fn len(&self) -> usize {
        self.runtimes.len()
    }

    /// True if the table has no nodes.
    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }
}

/// What a node function can do while it runs: enqueue packets onto its
/// declared outgoing arcs. Borrows the frame pool, next-frame table, and
/// pending queue for the duration of one node's dispatch.
pub struct DispatchContext<'a> {
    pool: &'a mut FramePool,
    next_frames: &'a mut NextFrameTable,
    pending: &'a mut PendingQueue,
    next_frame_base: u32,
    arcs: &'a [u32],
    input_frame: Option<crate::frame::FrameIndex>,
}

impl<'a> DispatchContext<'a> {
    /// Construct a context for one node's dispatch. Used by the dispatcher;
    /// not part of the stable public surface a node function needs.
    ///
    /// `input_frame` is `None` for a pre-input or input node, which sources
    /// its own packets rather than reading an upstream frame.
    pub fn new(
        pool: &'a mut FramePool,
        next_frames: &'a mut NextFrameTable,
        pending: &'a mut PendingQueue,
        next_frame_base: u32,
        arcs: &'a [u32],
        input_frame: Option<crate::frame::FrameIndex>,
    ) -> Self {
        Self {
            pool,
            next_frames,
            pending,
            next_frame_base,
            arcs,
            input_frame,
        }
    }

    /// The frame this node was dispatched with, if any.
    pub fn input(&self) -> Option<&crate::frame::Frame> {
        self.input_frame.map(|idx| self.pool.get(idx))
    }

    /// Convenience over [`Self::input`]: the input frame's packet indices,
    /// or an empty slice for a source node with no upstream frame.
    pub fn input_vectors(&self) -> &[u32] {
        self.input().map(|f| f.vectors.as_slice()).unwrap_or(&[])
    }

    /// Enqueue one packet onto the arc at `arc_index` (an index into the
    /// node's declared `next_names`, not a global node index).
    pub fn enqueue(&mut self, arc_index: u32, size_class: (usize, usize), buffer_index: u32) {
        let target_node = self.arcs[arc_index as usize];
        let slot_index = (self.next_frame_base + arc_index) as usize;
        self.next_frames.set_next_frame_buffer(
            self.pool,
            self.pending,
            slot_index,
            target_node,
            arc_index,
            target_node,
            size_class,
            buffer_index,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_node_switches_to_polling_above_threshold() {
        let mut runtime = NodeRuntime::new(DispatchMode::Interrupt, 0);
        let switched = runtime.record_dispatch(20, 100, 10, 5);
        assert_eq!(switched, Some(DispatchMode::Polling));
        assert_eq!(runtime.mode, DispatchMode::Polling);
    }

    #[test]
    fn polling_node_marks_pending_on_one_low_dispatch_then_switches_on_the_next() {
        let mut runtime = NodeRuntime::new(DispatchMode::Polling, 0);
        assert_eq!(runtime.record_dispatch(5, 1, 10, 5), None, "marked pending, not yet switched");
        assert_eq!(runtime.mode, DispatchMode::Polling);
        assert_eq!(runtime.record_dispatch(1, 1, 10, 5), Some(DispatchMode::Interrupt));
        assert_eq!(runtime.mode, DispatchMode::Interrupt);
    }

    #[test]
    fn the_transition_dispatch_fires_unconditionally_even_at_high_vector_count() {
        let mut runtime = NodeRuntime::new(DispatchMode::Polling, 0);
        runtime.record_dispatch(5, 1, 10, 5);
        assert_eq!(
            runtime.record_dispatch(100, 1, 10, 5),
            Some(DispatchMode::Interrupt),
            "one-shot delay means the next polling dispatch switches regardless of its own count"
        );
    }

    #[test]
    fn a_busy_dispatch_never_marks_pending() {
        let mut runtime = NodeRuntime::new(DispatchMode::Polling, 0);
        for _ in 0..5 {
            assert_eq!(runtime.record_dispatch(50, 1, 10, 5), None);
        }
        assert_eq!(runtime.mode, DispatchMode::Polling);
    }
}
