//! Size-classed frame pool (C1).
//!
//! Generalizes the teacher's `allocators::slab::SlabRegistry` (size classes,
//! per-class free lists, refill-on-exhaustion) from a single byte size to a
//! `(scalar_size, vector_size)` key, and its `allocators::frame::FrameArena`
//! for the cache-line-aligned, poison-on-debug storage discipline.

use std::collections::HashMap;

use super::{Frame, FrameFlags, FrameIndex, DEFAULT_CAPACITY};
use crate::sync::atomics::AtomicCounter;

type SizeClassKey = (usize, usize);

struct SizeClass {
    capacity: usize,
    free_list: Vec<FrameIndex>,
    alloc_count: AtomicCounter,
}

/// A pooled, size-classed allocator of frames.
///
/// One `FramePool` lives per worker thread; allocation never crosses
/// threads, so no synchronization is needed on the hot path (the free
/// lists are plain `Vec`s, not lock-free structures).
pub struct FramePool {
    classes: HashMap<SizeClassKey, SizeClass>,
    frames: Vec<Frame>,
    /// Which size class owns each frame, by index; used by `free`.
    owners: Vec<SizeClassKey>,
    debug_mode: bool,
}

impl FramePool {
    /// Create a pool with the given size classes pre-registered (but not
    /// pre-allocated — frames are created lazily on first `alloc_to`, then
    /// recycled through the free list).
    pub fn new(size_classes: impl IntoIterator<Item = (usize, usize)>, debug_mode: bool) -> Self {
        let mut classes = HashMap::new();
        for key in size_classes {
            classes.insert(
                key,
                SizeClass {
                    capacity: DEFAULT_CAPACITY,
                    free_list: Vec::new(),
                    alloc_count: AtomicCounter::new(0),
                },
            );
        }
        Self {
            classes,
            frames: Vec::new(),
            owners: Vec::new(),
            debug_mode,
        }
    }

    /// True if a size class is registered for this key.
    pub fn has_size_class(&self, key: SizeClassKey) -> bool {
        self.classes.contains_key(&key)
    }

    /// Allocate (or reuse) a frame matching the given (scalar_size,
    /// vector_size) size class.
    ///
    /// Returns a zeroed frame with the magic sentinel written and the
    /// *allocated* flag set. Exhaustion of process memory is fatal (the
    /// underlying `Vec` allocation aborts), matching the documented
    /// contract; there is no recoverable "pool full" case.
    pub fn alloc_to(&mut self, key: SizeClassKey) -> FrameIndex {
        let capacity = self
            .classes
            .get(&key)
            .unwrap_or_else(|| panic!("alloc_to: no size class registered for {:?}", key))
            .capacity;

        let reused = self.classes.get_mut(&key).unwrap().free_list.pop();

        let index = if let Some(index) = reused {
            let frame = &mut self.frames[index as usize];
            frame.reset();
            index
        } else {
            let frame = Frame::new(key.0, key.1, capacity);
            let index = self.frames.len() as FrameIndex;
            self.frames.push(frame);
            self.owners.push(key);
            self.frames[index as usize].flags = FrameFlags::ALLOCATED;
            index
        };

        self.classes.get(&key).unwrap().alloc_count.increment();
        index
    }

    /// Borrow a frame immutably.
    pub fn get(&self, index: FrameIndex) -> &Frame {
        &self.frames[index as usize]
    }

    /// Borrow a frame mutably.
    pub fn get_mut(&mut self, index: FrameIndex) -> &mut Frame {
        &mut self.frames[index as usize]
    }

    /// Return a frame to its size class's free list.
    ///
    /// Requires the frame's *allocated* flag to be clear of pending/owner
    /// references; in debug builds this is asserted (`VG003` on violation).
    pub fn free(&mut self, index: FrameIndex) {
        let key = self.owners[index as usize];
        let frame = &mut self.frames[index as usize];

        debug_assert!(
            !frame.flags.contains(FrameFlags::PENDING),
            "freed frame {} still has a pending-frame record referencing it",
            index
        );
        if frame.flags.contains(FrameFlags::PENDING) {
            crate::diagnostics::emit(&crate::diagnostics::VG003);
        }

        #[cfg(feature = "debug")]
        if self.debug_mode {
            for byte in frame.scalar.iter_mut() {
                *byte = crate::debug::poison::FREED_PATTERN;
            }
        }

        frame.flags = FrameFlags::empty();
        frame.vectors.clear();
        frame.n_vectors = 0;

        self.classes.get_mut(&key).unwrap().free_list.push(index);
    }

    /// Total frames allocated (including recycled) per size class, for
    /// diagnostics and tests.
    pub fn alloc_count(&self, key: SizeClassKey) -> u64 {
        self.classes.get(&key).map(|c| c.alloc_count.get()).unwrap_or(0)
    }

    /// Number of frames currently on a size class's free list.
    pub fn free_count(&self, key: SizeClassKey) -> usize {
        self.classes.get(&key).map(|c| c.free_list.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_then_free_then_alloc_same_class() {
        let mut pool = FramePool::new([(0, 4)], false);
        let a = pool.alloc_to((0, 4));
        assert!(pool.get(a).check_magic());
        pool.free(a);
        let b = pool.alloc_to((0, 4));
        assert_eq!(a, b);
        assert!(pool.get(b).check_magic());
        assert_eq!(pool.get(b).n_vectors, 0);
    }

    #[test]
    fn separate_classes_do_not_share_free_lists() {
        let mut pool = FramePool::new([(0, 4), (8, 4)], false);
        let a = pool.alloc_to((0, 4));
        pool.free(a);
        assert_eq!(pool.free_count((0, 4)), 1);
        assert_eq!(pool.free_count((8, 4)), 0);
    }

    #[test]
    #[should_panic(expected = "no size class registered")]
    fn alloc_unknown_class_panics() {
        let mut pool = FramePool::new([(0, 4)], false);
        pool.alloc_to((99, 99));
    }
}
