//! Two-phase node registration and arc resolution.

use std::collections::HashMap;

use super::{NodeCategory, NodeFn};
use crate::error::RegistrationError;
use crate::frame::FramePool;

/// A node as declared by a caller, before arc names are resolved.
pub struct NodeDescriptor {
    /// Unique path name, e.g. `"ethernet-input"`.
    pub path: String,
    /// Where this node sits in the dispatch ordering.
    pub category: NodeCategory,
    /// (scalar_size, vector_size) frame layout this node reads and writes.
    pub size_class: (usize, usize),
    /// Declared outgoing arc target names, in the order a node function
    /// addresses them by index (arc 0 is `next_names[0]`, and so on).
    pub next_names: Vec<String>,
    pub(crate) func: NodeFn,
}

impl NodeDescriptor {
    /// Declare a node with no outgoing arcs yet; chain [`Self::with_next`]
    /// to add them.
    pub fn new(path: impl Into<String>, category: NodeCategory, size_class: (usize, usize), func: NodeFn) -> Self {
        Self {
            path: path.into(),
            category,
            size_class,
            next_names: Vec::new(),
            func,
        }
    }

    /// Declare an outgoing arc to another node by path name.
    pub fn with_next(mut self, target_path: impl Into<String>) -> Self {
        self.next_names.push(target_path.into());
        self
    }
}

/// A node after arc names have been resolved to runtime indices.
pub struct ResolvedNode {
    /// The node's path name.
    pub path: String,
    /// Where this node sits in the dispatch ordering.
    pub category: NodeCategory,
    /// This node's frame layout.
    pub size_class: (usize, usize),
    /// Runtime indices of this node's outgoing arc targets, index-aligned
    /// with the declaring [`NodeDescriptor::next_names`].
    pub arcs: Vec<u32>,
    pub(crate) func: NodeFn,
}

/// The finalized, immutable graph the dispatcher walks every pass.
pub struct ResolvedGraph {
    nodes: Vec<ResolvedNode>,
}

impl ResolvedGraph {
    /// All resolved nodes, in registration order (their runtime index is
    /// their position in this slice).
    pub fn nodes(&self) -> &[ResolvedNode] {
        &self.nodes
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of outgoing arcs across all nodes — the size the
    /// next-frame table must be allocated to, one slot per arc.
    pub fn total_arc_count(&self) -> usize {
        self.nodes.iter().map(|n| n.arcs.len()).sum()
    }
}

/// Builder for a [`ResolvedGraph`]: collects node descriptors, then
/// resolves arc names to indices in one pass.
#[derive(Default)]
pub struct NodeRegistry {
    descriptors: Vec<NodeDescriptor>,
    path_index: HashMap<String, u32>,
    finalized: bool,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node, returning its runtime index (stable for the life
    /// of the registry, equal to registration order).
    pub fn register(&mut self, descriptor: NodeDescriptor) -> Result<u32, RegistrationError> {
        if self.finalized {
            return Err(RegistrationError::AlreadyFinalized);
        }
        if self.path_index.contains_key(&descriptor.path) {
            return Err(RegistrationError::DuplicatePath { path: descriptor.path });
        }

        let index = self.descriptors.len() as u32;
        self.path_index.insert(descriptor.path.clone(), index);
        self.descriptors.push(descriptor);
        Ok(index)
    }

    /// Resolve every node's `next_names` to runtime indices and validate
    /// size classes against the frame pool's registered classes.
    ///
    /// Takes the registry's descriptors, leaving it empty and finalized;
    /// any further call to [`Self::register`] returns
    /// [`RegistrationError::AlreadyFinalized`].
    pub fn finalize_arcs(&mut self, pool: &FramePool) -> Result<ResolvedGraph, RegistrationError> {
        if self.finalized {
            return Err(RegistrationError::AlreadyFinalized);
        }
        self.finalized = true;

        let descriptors = std::mem::take(&mut self.descriptors);
        let mut nodes = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if !pool.has_size_class(descriptor.size_class) {
                return Err(RegistrationError::UnknownSizeClass {
                    path: descriptor.path,
                    scalar_size: descriptor.size_class.0,
                    vector_size: descriptor.size_class.1,
                });
            }

            let mut arcs = Vec::with_capacity(descriptor.next_names.len());
            for name in &descriptor.next_names {
                let target = self.path_index.get(name).copied().ok_or_else(|| RegistrationError::UnresolvedArc {
                    from: descriptor.path.clone(),
                    to: name.clone(),
                })?;
                arcs.push(target);
            }

            nodes.push(ResolvedNode {
                path: descriptor.path,
                category: descriptor.category,
                size_class: descriptor.size_class,
                arcs,
                func: descriptor.func,
            });
        }

        Ok(ResolvedGraph { nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;

    fn noop_fn() -> NodeFn {
        Box::new(|_ctx| Ok(0))
    }

    fn pool_with(classes: impl IntoIterator<Item = (usize, usize)>) -> FramePool {
        FramePool::new(classes, false)
    }

    #[test]
    fn resolves_named_arc_to_index() {
        let mut registry = NodeRegistry::new();
        registry
            .register(NodeDescriptor::new("a", NodeCategory::Internal, (0, 4), noop_fn()).with_next("b"))
            .unwrap();
        registry.register(NodeDescriptor::new("b", NodeCategory::Internal, (0, 4), noop_fn())).unwrap();

        let graph = registry.finalize_arcs(&pool_with([(0, 4)])).unwrap();
        assert_eq!(graph.nodes()[0].arcs, vec![1]);
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let mut registry = NodeRegistry::new();
        registry.register(NodeDescriptor::new("a", NodeCategory::Internal, (0, 4), noop_fn())).unwrap();
        let err = registry.register(NodeDescriptor::new("a", NodeCategory::Internal, (0, 4), noop_fn()));
        assert!(matches!(err, Err(RegistrationError::DuplicatePath { .. })));
    }

    #[test]
    fn unresolved_arc_is_rejected() {
        let mut registry = NodeRegistry::new();
        registry
            .register(NodeDescriptor::new("a", NodeCategory::Internal, (0, 4), noop_fn()).with_next("missing"))
            .unwrap();
        let err = registry.finalize_arcs(&pool_with([(0, 4)]));
        assert!(matches!(err, Err(RegistrationError::UnresolvedArc { .. })));
    }

    #[test]
    fn unknown_size_class_is_rejected() {
        let mut registry = NodeRegistry::new();
        registry.register(NodeDescriptor::new("a", NodeCategory::Internal, (99, 99), noop_fn())).unwrap();
        let err = registry.finalize_arcs(&pool_with([(0, 4)]));
        assert!(matches!(err, Err(RegistrationError::UnknownSizeClass { .. })));
    }

    #[test]
    fn register_after_finalize_is_rejected() {
        let mut registry = NodeRegistry::new();
        registry.register(NodeDescriptor::new("a", NodeCategory::Internal, (0, 4), noop_fn())).unwrap();
        let pool = pool_with([(0, 4)]);
        registry.finalize_arcs(&pool).unwrap();

        let err = registry.register(NodeDescriptor::new("b", NodeCategory::Internal, (0, 4), noop_fn()));
        assert!(matches!(err, Err(RegistrationError::AlreadyFinalized)));
        let _ = DispatchError::new("a", "unused");
    }
}
