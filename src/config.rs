//! Dispatcher configuration.

use crate::util::size::{kb, mb};

/// Configuration for a [`crate::dispatch::Dispatcher`].
///
/// Mirrors the runtime-knobs table a collaborator's CLI/config parser would
/// feed in (`heapsize`, `main-core`, `elog-events`, ...); this crate stores
/// the values and acts on the ones in its own scope (frame pool sizing,
/// mode-switch thresholds), while `plugin_path` and the CLI-only knobs are
/// passthrough fields a collaborator crate can read back.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Total bytes reserved for the per-worker frame pool (default: 16 MB).
    pub heap_size: usize,

    /// (scalar_size, vector_size) byte layouts the frame pool pre-allocates
    /// a size class for.
    pub frame_size_classes: Vec<(usize, usize)>,

    /// Frames pre-allocated per size class at pool creation.
    pub frames_per_class: usize,

    /// Vector count above which an interrupt-mode node switches to polling.
    pub polling_threshold: u32,

    /// Vector count at or below which a polling-mode node becomes eligible
    /// to switch back to interrupt.
    pub interrupt_threshold: u32,

    /// Event-log ring size (`elog-events`); this crate does not implement
    /// an event log, but keeps the knob for a collaborator's event logger.
    pub elog_events: usize,

    /// Dump the event log to `/tmp/elog_post_mortem.<pid>` on fatal exit
    /// (collaborator-implemented; stored here only as a passthrough).
    pub elog_post_mortem_dump: bool,

    /// CPU core to pin the main thread to, if any (`main-core`).
    pub main_core: Option<usize>,

    /// Plugin search path (`plugins.path`); this crate has no plugin
    /// loader, the field exists only so a collaborator can read it back.
    pub plugin_path: Option<String>,

    /// Barrier rendezvous timeout before the main thread logs a diagnostic
    /// and continues.
    pub barrier_timeout: std::time::Duration,

    /// Timing wheel tick granularity.
    pub timer_tick: std::time::Duration,

    /// Number of timing wheel rings (1, 2, or 3).
    pub timer_rings: u8,

    /// Handoff ring length per (producer, consumer) pair; must be a power
    /// of two.
    pub handoff_ring_len: usize,

    /// Handoff congestion high-water mark.
    pub handoff_hi_thresh: usize,

    /// Enable debug-mode frame poisoning and integrity-assertion panics.
    pub debug_mode: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            heap_size: mb(16),
            frame_size_classes: vec![(0, 256)],
            frames_per_class: 64,
            polling_threshold: 10,
            interrupt_threshold: 5,
            elog_events: 131_072,
            elog_post_mortem_dump: false,
            main_core: None,
            plugin_path: None,
            barrier_timeout: std::time::Duration::from_secs(2),
            timer_tick: std::time::Duration::from_micros(10),
            timer_rings: 3,
            handoff_ring_len: 1024,
            handoff_hi_thresh: 768,
            debug_mode: cfg!(feature = "debug"),
        }
    }
}

impl DispatchConfig {
    /// A constrained configuration for tests and small embedded workloads.
    pub fn minimal() -> Self {
        Self {
            heap_size: kb(256),
            frame_size_classes: vec![(0, 64)],
            frames_per_class: 8,
            polling_threshold: 10,
            interrupt_threshold: 5,
            elog_events: 1024,
            elog_post_mortem_dump: false,
            main_core: None,
            plugin_path: None,
            barrier_timeout: std::time::Duration::from_millis(200),
            timer_tick: std::time::Duration::from_micros(10),
            timer_rings: 1,
            handoff_ring_len: 16,
            handoff_hi_thresh: 12,
            debug_mode: false,
        }
    }

    /// A configuration tuned for maximum sustained throughput.
    pub fn high_throughput() -> Self {
        Self {
            heap_size: mb(256),
            frame_size_classes: vec![(0, 256), (64, 256)],
            frames_per_class: 512,
            polling_threshold: 10,
            interrupt_threshold: 5,
            elog_events: 1 << 20,
            elog_post_mortem_dump: true,
            main_core: None,
            plugin_path: None,
            barrier_timeout: std::time::Duration::from_secs(5),
            timer_tick: std::time::Duration::from_micros(10),
            timer_rings: 3,
            handoff_ring_len: 4096,
            handoff_hi_thresh: 3584,
            debug_mode: false,
        }
    }

    /// Builder: set the per-worker heap size.
    pub fn with_heap_size(mut self, size: usize) -> Self {
        self.heap_size = size;
        self
    }

    /// Builder: set mode-switch thresholds.
    pub fn with_thresholds(mut self, polling: u32, interrupt: u32) -> Self {
        self.polling_threshold = polling;
        self.interrupt_threshold = interrupt;
        self
    }

    /// Builder: set the plugin search path passthrough.
    pub fn with_plugin_path(mut self, path: impl Into<String>) -> Self {
        self.plugin_path = Some(path.into());
        self
    }

    /// Builder: enable debug mode (frame poisoning, integrity-assertion panics).
    pub fn with_debug(mut self, enable: bool) -> Self {
        self.debug_mode = enable;
        self
    }

    /// Builder: set the handoff ring length and congestion threshold.
    pub fn with_handoff(mut self, ring_len: usize, hi_thresh: usize) -> Self {
        self.handoff_ring_len = ring_len;
        self.handoff_hi_thresh = hi_thresh;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_match_documented_defaults() {
        let cfg = DispatchConfig::default();
        assert_eq!(cfg.polling_threshold, 10);
        assert_eq!(cfg.interrupt_threshold, 5);
    }

    #[test]
    fn minimal_is_smaller_than_default() {
        let minimal = DispatchConfig::minimal();
        let default = DispatchConfig::default();
        assert!(minimal.heap_size < default.heap_size);
        assert!(minimal.handoff_ring_len < default.handoff_ring_len);
    }

    #[test]
    fn builder_overrides_apply() {
        let cfg = DispatchConfig::default().with_thresholds(20, 8).with_debug(true);
        assert_eq!(cfg.polling_threshold, 20);
        assert_eq!(cfg.interrupt_threshold, 8);
        assert!(cfg.debug_mode);
    }
}
