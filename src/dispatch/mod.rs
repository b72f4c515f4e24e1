//! The dispatch loop (C5).
//!
//! Drives one graph through repeated calls to [`Dispatcher::dispatch_once`]:
//! barrier check, pre-input nodes, input nodes (polling every iteration,
//! interrupt nodes only when externally signaled), then the pending-frame
//! walk, in the ordering documented for the component. Node functions never
//! block; a process node that needs to suspend does so through the process
//! facility's rendezvous channel rather than returning control here.

mod capture;

pub use capture::{CaptureConfig, DispatchCapture};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::barrier::Barrier;
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::frame::FramePool;
use crate::nextframe::NextFrameTable;
use crate::node::{DispatchContext, DispatchMode, NodeCategory, NodeRuntimeTable, ResolvedGraph};
use crate::pending::PendingQueue;
use crate::process::{Process, ProcessFn, ProcessOutcome};
use crate::timer::{TimerTarget, TimingWheel};

/// Safety bound on how many timer entries a single [`Dispatcher::dispatch_once`]
/// call will expire, mirroring the timing wheel's own `max_expirations`
/// bound (`VG401`) so one stalled iteration cannot be asked to fire an
/// unbounded backlog of suspended processes in one pass.
const MAX_TIMER_EXPIRATIONS_PER_ITERATION: usize = 4096;

/// Owns every piece of per-worker dispatch state and runs the main loop.
///
/// One `Dispatcher` per worker thread; the frame pool and next-frame table
/// are never shared across threads, matching the no-cross-thread-allocation
/// invariant the frame pool documents.
pub struct Dispatcher {
    config: DispatchConfig,
    pool: FramePool,
    next_frames: NextFrameTable,
    pending: PendingQueue,
    graph: Arc<ResolvedGraph>,
    runtimes: NodeRuntimeTable,
    barrier: Option<Arc<Barrier>>,
    capture: Option<DispatchCapture>,
    timer: TimingWheel,
    processes: HashMap<u32, Process>,
    started_at: Instant,
    time_offset: Duration,
}

impl Dispatcher {
    /// Build a dispatcher for a finalized graph.
    pub fn new(config: DispatchConfig, graph: Arc<ResolvedGraph>) -> Self {
        crate::diagnostics::context::init_main_thread();

        let pool = FramePool::new(config.frame_size_classes.clone(), config.debug_mode);
        let next_frames = NextFrameTable::new(graph.total_arc_count());
        let runtimes = NodeRuntimeTable::from_graph(&graph);
        let timer = TimingWheel::new(config.timer_rings, config.timer_tick, MAX_TIMER_EXPIRATIONS_PER_ITERATION);

        Self {
            config,
            pool,
            next_frames,
            pending: PendingQueue::new(),
            graph,
            runtimes,
            barrier: None,
            capture: None,
            timer,
            processes: HashMap::new(),
            started_at: Instant::now(),
            time_offset: Duration::ZERO,
        }
    }

    /// Attach a reconfiguration barrier; [`Dispatcher::dispatch_once`] will
    /// rendezvous on it at the top of every iteration while raised.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Attach a dispatch-pcap capture writer.
    pub fn with_capture(mut self, capture: DispatchCapture) -> Self {
        self.capture = Some(capture);
        self
    }

    /// The dispatcher's configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Per-node runtime state (dispatch mode, statistics).
    pub fn runtimes(&self) -> &NodeRuntimeTable {
        &self.runtimes
    }

    /// This worker's local clock: wall time since the dispatcher was built,
    /// rebased at every barrier release so it stays monotonic across a
    /// reconfiguration pause rather than jumping by however long the pause
    /// lasted.
    pub fn time_now(&self) -> Duration {
        self.started_at.elapsed() + self.time_offset
    }

    /// Start a process-category node's function, running it until its first
    /// suspension or return. `node_index` must name a node declared with
    /// [`NodeCategory::Process`]; such a node's own `func` is never called,
    /// since a process runs on its own thread via the process facility
    /// instead of through the normal per-dispatch node call.
    pub fn spawn_process(&mut self, node_index: u32, func: ProcessFn) -> Result<(), DispatchError> {
        let node = &self.graph.nodes()[node_index as usize];
        if node.category != NodeCategory::Process {
            return Err(DispatchError::new(node.path.as_str(), "spawn_process called on a non-process node"));
        }

        let mut process = Process::spawn(node.path.clone(), func);
        let outcome = process.start();
        self.install_or_park(node_index, process, outcome)
    }

    fn install_or_park(&mut self, node_index: u32, mut process: Process, outcome: ProcessOutcome) -> Result<(), DispatchError> {
        match outcome {
            ProcessOutcome::SuspendedClock(interval) => {
                self.runtimes.get_mut(node_index).stats.suspends.increment();
                let ticks = self.ticks_for(interval);
                let handle = self.timer.start(TimerTarget::Process(node_index), ticks);
                process.stop_timer_handle = Some(handle.raw());
                self.processes.insert(node_index, process);
            }
            ProcessOutcome::SuspendedEvent => {
                self.runtimes.get_mut(node_index).stats.suspends.increment();
                process.stop_timer_handle = None;
                self.processes.insert(node_index, process);
            }
            ProcessOutcome::Returned(result) => {
                result.map_err(|e| {
                    crate::diagnostics::emit(&crate::diagnostics::VG202);
                    e
                })?;
            }
        }
        Ok(())
    }

    fn ticks_for(&self, interval: Duration) -> u64 {
        let tick_seconds = self.config.timer_tick.as_secs_f64().max(f64::EPSILON);
        ((interval.as_secs_f64() / tick_seconds).ceil() as u64).max(1)
    }

    /// Advance the timing wheel to this worker's current clock and resume
    /// every process whose clock wait has expired. Timed events with no
    /// collaborator event-type table registered in this port simply expire
    /// unread.
    fn expire_timers(&mut self) -> Result<(), DispatchError> {
        let now_seconds = self.time_now().as_secs_f64();
        let expired = self.timer.expire_timers(now_seconds);
        for user_handle in expired {
            match TimerTarget::decode(user_handle) {
                TimerTarget::Process(node_index) => self.resume_process(node_index)?,
                TimerTarget::TimedEvent(_) => {}
            }
        }
        Ok(())
    }

    fn resume_process(&mut self, node_index: u32) -> Result<(), DispatchError> {
        let Some(mut process) = self.processes.remove(&node_index) else {
            return Ok(());
        };
        process.stop_timer_handle = None;
        let outcome = process.resume();
        self.install_or_park(node_index, process, outcome)
    }

    /// Run one iteration: barrier check, pre-input nodes, polling input
    /// nodes, then the pending-frame walk until it runs dry.
    pub fn dispatch_once(&mut self) -> Result<(), DispatchError> {
        crate::diagnostics::enter_dispatch();
        let result = self.dispatch_once_inner();
        crate::diagnostics::exit_dispatch();
        crate::diagnostics::increment_loop_iteration();
        result
    }

    fn dispatch_once_inner(&mut self) -> Result<(), DispatchError> {
        if let Some(barrier) = self.barrier.clone() {
            if barrier.is_raised() {
                let since_release = barrier.arrive_and_wait();
                let observed = self.started_at.elapsed();
                self.time_offset = since_release.saturating_sub(observed);
            }
        }

        for i in 0..self.graph.len() {
            if self.graph.nodes()[i].category == NodeCategory::PreInput {
                self.dispatch_source(i as u32)?;
            }
        }

        for i in 0..self.graph.len() {
            let node = &self.graph.nodes()[i];
            if node.category != NodeCategory::Input {
                continue;
            }
            if self.runtimes.get(i as u32).mode == DispatchMode::Polling {
                self.dispatch_source(i as u32)?;
            }
        }

        self.drain_pending()?;
        self.pending.clear();

        // Main-worker timing wheel: advance to this worker's current clock
        // and resume any process whose clock wait has expired.
        self.expire_timers()?;

        Ok(())
    }

    /// Run an input or pre-input node's signaled interrupt handler
    /// out-of-band with the normal polling pass (called by a collaborator
    /// crate's interrupt/event-fd wiring, not by `dispatch_once` itself),
    /// then drain whatever the node fed into the pending-frame queue.
    pub fn dispatch_interrupt(&mut self, node_index: u32) -> Result<(), DispatchError> {
        crate::diagnostics::enter_dispatch();
        let result = self.dispatch_source(node_index).and_then(|()| self.drain_pending());
        self.pending.clear();
        crate::diagnostics::exit_dispatch();
        result
    }

    fn drain_pending(&mut self) -> Result<(), DispatchError> {
        let mut i = 0;
        while i < self.pending.len() {
            let record = *self.pending.get(i);
            let frame_index = record.frame;

            if self.pool.get(frame_index).n_vectors > 0 {
                self.dispatch_pending(record.target_node_runtime, frame_index)?;
            }

            let frame = self.pool.get_mut(frame_index);
            frame.flags.remove(crate::frame::FrameFlags::PENDING);
            frame.pending_record = None;
            if frame.flags.contains(crate::frame::FrameFlags::FREE_AFTER_DISPATCH) {
                self.pool.free(frame_index);
            }

            i += 1;
        }
        Ok(())
    }

    fn dispatch_pending(&mut self, target_node_runtime: u32, frame_index: crate::frame::FrameIndex) -> Result<(), DispatchError> {
        let node = &self.graph.nodes()[target_node_runtime as usize];
        let arcs = &node.arcs;
        let next_frame_base = self.runtimes.get(target_node_runtime).next_frame_base;
        let n_vectors = self.pool.get(frame_index).n_vectors;

        if let Some(capture) = self.capture.as_mut() {
            let frame = self.pool.get(frame_index);
            if frame.flags.contains(crate::frame::FrameFlags::TRACE) {
                let path = node.path.clone();
                let buffer_indices = frame.vectors.clone();
                for buffer_index in buffer_indices {
                    let _ = capture.record(&path, buffer_index, 0, &[]);
                }
            }
        }

        let start = Instant::now();
        let mut ctx = DispatchContext::new(&mut self.pool, &mut self.next_frames, &mut self.pending, next_frame_base, arcs, Some(frame_index));
        let result = (node.func)(&mut ctx);
        let clocks = start.elapsed().as_nanos() as u64;

        let processed = result.map_err(|e| {
            crate::diagnostics::emit(&crate::diagnostics::VG202);
            e
        })?;

        self.runtimes
            .get_mut(target_node_runtime)
            .record_dispatch(processed.max(n_vectors), clocks, self.config.polling_threshold, self.config.interrupt_threshold);

        Ok(())
    }

    fn dispatch_source(&mut self, node_index: u32) -> Result<(), DispatchError> {
        let node = &self.graph.nodes()[node_index as usize];
        let arcs = &node.arcs;
        let next_frame_base = self.runtimes.get(node_index).next_frame_base;

        let start = Instant::now();
        let mut ctx = DispatchContext::new(&mut self.pool, &mut self.next_frames, &mut self.pending, next_frame_base, arcs, None);
        let result = (node.func)(&mut ctx);
        let clocks = start.elapsed().as_nanos() as u64;

        let processed = result.map_err(|e| {
            crate::diagnostics::emit(&crate::diagnostics::VG202);
            e
        })?;

        self.runtimes
            .get_mut(node_index)
            .record_dispatch(processed, clocks, self.config.polling_threshold, self.config.interrupt_threshold);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeDescriptor, NodeRegistry};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    fn build(config: &DispatchConfig, source_count: u32, sink_received: Arc<AtomicU32>) -> Arc<ResolvedGraph> {
        let size_class = config.frame_size_classes[0];
        let mut registry = NodeRegistry::new();
        registry
            .register(NodeDescriptor::new(
                "source",
                NodeCategory::Input,
                size_class,
                Box::new(move |ctx| {
                    for i in 0..source_count {
                        ctx.enqueue(0, size_class, i);
                    }
                    Ok(source_count)
                }),
            ).with_next("sink"))
            .unwrap();

        registry
            .register(NodeDescriptor::new(
                "sink",
                NodeCategory::Internal,
                size_class,
                Box::new(move |ctx| {
                    let n = ctx.input_vectors().len() as u32;
                    sink_received.fetch_add(n, Ordering::Relaxed);
                    Ok(n)
                }),
            ))
            .unwrap();

        let pool = FramePool::new(config.frame_size_classes.clone(), false);
        Arc::new(registry.finalize_arcs(&pool).unwrap())
    }

    #[test]
    fn single_arc_fast_path_delivers_all_packets() {
        let config = DispatchConfig::minimal();
        let received = Arc::new(AtomicU32::new(0));
        let graph = build(&config, 3, received.clone());

        let mut dispatcher = Dispatcher::new(config, graph);
        // The source is an input node and starts in interrupt mode; a real
        // interface signals its fd becoming readable the same way.
        dispatcher.dispatch_interrupt(0).unwrap();

        assert_eq!(received.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn interrupt_input_node_is_not_polled_by_default() {
        let config = DispatchConfig::minimal();
        let received = Arc::new(AtomicU32::new(0));
        let graph = build(&config, 5, received.clone());

        let mut dispatcher = Dispatcher::new(config, graph);
        assert_eq!(dispatcher.runtimes().get(0).mode, DispatchMode::Interrupt);

        dispatcher.dispatch_once().unwrap();
        assert_eq!(received.load(Ordering::Relaxed), 0, "interrupt-mode source should not run until signaled");

        dispatcher.dispatch_interrupt(0).unwrap();
        assert_eq!(received.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn process_node_resumes_through_a_real_dispatch_loop() {
        let config = DispatchConfig::minimal();

        let mut registry = NodeRegistry::new();
        let process_index = registry
            .register(NodeDescriptor::new(
                "delay",
                NodeCategory::Process,
                config.frame_size_classes[0],
                Box::new(|_ctx| Ok(0)),
            ))
            .unwrap();
        let pool = FramePool::new(config.frame_size_classes.clone(), false);
        let graph = Arc::new(registry.finalize_arcs(&pool).unwrap());

        let mut dispatcher = Dispatcher::new(config, graph);

        let resumed = Arc::new(AtomicBool::new(false));
        let resumed_from_process = Arc::clone(&resumed);
        dispatcher
            .spawn_process(
                process_index,
                Box::new(move |ctx| {
                    ctx.suspend_for_clock(std::time::Duration::from_micros(50));
                    resumed_from_process.store(true, Ordering::Relaxed);
                    Ok(0)
                }),
            )
            .unwrap();

        assert_eq!(dispatcher.runtimes().get(process_index).stats.suspends.get(), 1);
        assert!(!resumed.load(Ordering::Relaxed));

        std::thread::sleep(std::time::Duration::from_micros(500));
        dispatcher.dispatch_once().unwrap();

        assert!(resumed.load(Ordering::Relaxed), "dispatch_once should advance the wheel and resume the suspended process");
    }

    #[test]
    fn spawn_process_rejects_a_non_process_node() {
        let config = DispatchConfig::minimal();
        let received = Arc::new(AtomicU32::new(0));
        let graph = build(&config, 1, received);
        let mut dispatcher = Dispatcher::new(config, graph);

        let err = dispatcher.spawn_process(0, Box::new(|_ctx| Ok(0)));
        assert!(err.is_err());
    }
}
