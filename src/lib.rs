//! # packetgraph
//!
//! A vector packet graph dispatcher: frame pools, a speculative next-frame
//! table, a cooperative node scheduler with interrupt/polling mode
//! switching, stackful-style suspendable processes, a hierarchical timing
//! wheel, and an inter-worker handoff channel.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use packetgraph::{DispatchConfig, Dispatcher, NodeCategory, NodeDescriptor, NodeRegistry};
//! use std::sync::Arc;
//!
//! let config = DispatchConfig::minimal();
//! let size_class = config.frame_size_classes[0];
//!
//! let mut registry = NodeRegistry::new();
//! registry
//!     .register(
//!         NodeDescriptor::new("ethernet-input", NodeCategory::Input, size_class, Box::new(|ctx| {
//!             ctx.enqueue(0, size_class, 0);
//!             Ok(1)
//!         }))
//!         .with_next("ip4-input"),
//!     )
//!     .unwrap();
//! registry
//!     .register(NodeDescriptor::new("ip4-input", NodeCategory::Internal, size_class, Box::new(|ctx| {
//!         Ok(ctx.input_vectors().len() as u32)
//!     })))
//!     .unwrap();
//!
//! let pool = packetgraph::frame::FramePool::new(config.frame_size_classes.clone(), false);
//! let graph = Arc::new(registry.finalize_arcs(&pool).unwrap());
//!
//! let mut dispatcher = Dispatcher::new(config, graph);
//! dispatcher.dispatch_interrupt(0).unwrap();
//! ```

#[allow(dead_code)]
mod util;

pub mod barrier;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod handle;
pub mod handoff;
pub mod nextframe;
pub mod node;
pub mod pending;
pub mod process;
pub(crate) mod sync;
pub mod timer;

#[cfg(feature = "debug")]
pub mod debug;
#[cfg(not(feature = "debug"))]
mod debug;

pub use barrier::Barrier;
pub use config::DispatchConfig;
pub use dispatch::{CaptureConfig, DispatchCapture, Dispatcher};
pub use error::{DispatchError, RegistrationError};
pub use frame::{Frame, FrameFlags, FrameIndex, FramePool};
pub use handle::{Handle, Pool};
pub use handoff::{channel as handoff_channel, HandoffConsumer, HandoffElement, HandoffProducer, HandoffRing};
pub use nextframe::NextFrameTable;
pub use node::{
    DispatchContext, DispatchMode, LayeredCounter, NodeCategory, NodeDescriptor, NodeFn, NodeRegistry,
    NodeRuntime, NodeRuntimeTable, NodeStats, ResolvedGraph, ResolvedNode,
};
pub use pending::{PendingQueue, PendingRecord};
pub use process::{Process, ProcessContext, ProcessFn, ProcessOutcome, ProcessState};
pub use timer::{TimerHandle, TimerTarget, TimingWheel};
