//! Inter-worker handoff channel (C8).
//!
//! A single-producer/single-consumer ring of frame elements per (origin
//! worker, target worker) pair, grounded in the cached-sequence-number SPSC
//! design other_examples/ringmpsc shows, simplified here to a mutex-guarded
//! deque plus the documented `tail`/`head`/`head_hint` counters so
//! [`HandoffProducer::enqueue_to_thread`] can estimate ring depth without
//! taking the consumer's lock on every packet.
//!
//! A producer may hold a partially-filled element across bursts; calling
//! [`HandoffProducer::flush`] at a worker boundary publishes whatever is
//! held, even short, so the consumer is never left waiting on a
//! nearly-full element that will not fill for a while.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::sync::atomics::AtomicCounter;

/// One published handoff element: a batch of buffer indices bound for one
/// consumer worker, plus the vector-count bookkeeping the documented wire
/// shape carries.
#[derive(Debug, Clone)]
pub struct HandoffElement {
    /// Caller-defined message type (node path hash, typically).
    pub message_type: u32,
    /// Number of buffer indices actually filled.
    pub n_vectors: u32,
    /// Vector count of the previously published element from this
    /// producer, carried along so the consumer side can detect gaps.
    pub last_n_vectors: u32,
    /// The buffer indices themselves, owned by a collaborator's buffer
    /// pool — this crate only moves the indices around.
    pub buffer_indices: Vec<u32>,
}

/// Shared ring state between one producer and one consumer.
pub struct HandoffRing {
    capacity: usize,
    hi_thresh: usize,
    queue: Mutex<VecDeque<HandoffElement>>,
    tail: AtomicU64,
    head: AtomicU64,
    /// Consumer-written echo of `head`, read by the producer to estimate
    /// depth without taking the queue lock on every enqueue.
    head_hint: AtomicU64,
    drop_count: AtomicCounter,
}

impl HandoffRing {
    /// Build a ring. `capacity` must be a power of two, matching the
    /// documented ring-length constraint.
    pub fn new(capacity: usize, hi_thresh: usize) -> Arc<Self> {
        assert!(capacity.is_power_of_two(), "handoff ring capacity must be a power of two");
        Arc::new(Self {
            capacity,
            hi_thresh,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            tail: AtomicU64::new(0),
            head: AtomicU64::new(0),
            head_hint: AtomicU64::new(0),
            drop_count: AtomicCounter::new(0),
        })
    }

    /// Estimated number of elements currently enqueued, from the
    /// producer's point of view (using `head_hint`, not the live `head`).
    pub fn depth_estimate(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head_hint = self.head_hint.load(Ordering::Relaxed);
        tail.saturating_sub(head_hint) as usize
    }

    /// True once the estimated depth has reached the congestion
    /// high-water mark (VG501 is emitted the first time a push is
    /// rejected because of it, not on every poll of this method).
    pub fn is_congested(&self) -> bool {
        self.depth_estimate() >= self.hi_thresh
    }

    /// Count of elements dropped for congestion since creation.
    pub fn drop_count(&self) -> u64 {
        self.drop_count.get()
    }
}

/// The producer-side handle for one (origin worker, target worker) ring.
pub struct HandoffProducer {
    ring: Arc<HandoffRing>,
    partial: Option<HandoffElement>,
    element_capacity: usize,
    last_n_vectors: u32,
}

impl HandoffProducer {
    /// Attach to a ring, batching up to `element_capacity` buffer indices
    /// per published element.
    pub fn new(ring: Arc<HandoffRing>, element_capacity: usize) -> Self {
        Self { ring, partial: None, element_capacity, last_n_vectors: 0 }
    }

    /// Append buffer indices destined for this worker, publishing full
    /// elements as they fill. Once the ring is congested, remaining
    /// indices in this call are added to the drop count instead of being
    /// queued and `drop_on_congestion` governs whether that is allowed
    /// (the exposed API always forces drop; the flag only documents the
    /// decision it makes).
    ///
    /// Returns the number of indices actually published or held in a
    /// partial element (i.e. not dropped).
    pub fn enqueue_to_thread(&mut self, message_type: u32, buffer_indices: impl IntoIterator<Item = u32>, drop_on_congestion: bool) -> usize {
        let mut accepted = 0;

        for index in buffer_indices {
            if self.ring.is_congested() {
                if drop_on_congestion {
                    self.ring.drop_count.increment();
                    crate::diagnostics::emit(&crate::diagnostics::VG501);
                    continue;
                }
            }

            let element = self.partial.get_or_insert_with(|| HandoffElement {
                message_type,
                n_vectors: 0,
                last_n_vectors: self.last_n_vectors,
                buffer_indices: Vec::with_capacity(self.element_capacity),
            });
            element.buffer_indices.push(index);
            element.n_vectors += 1;
            accepted += 1;

            if element.buffer_indices.len() >= self.element_capacity {
                self.flush();
            }
        }

        accepted
    }

    /// Publish whatever is currently held, even if short. Called at every
    /// worker boundary to prevent a partially-filled element stalling the
    /// consumer.
    pub fn flush(&mut self) {
        if let Some(element) = self.partial.take() {
            self.last_n_vectors = element.n_vectors;
            let mut queue = self.ring.queue.lock().unwrap();
            queue.push_back(element);
            self.ring.tail.fetch_add(1, Ordering::Release);
        }
    }
}

/// The consumer-side handle for one (origin worker, target worker) ring.
pub struct HandoffConsumer {
    ring: Arc<HandoffRing>,
}

impl HandoffConsumer {
    /// Attach to a ring as its sole consumer.
    pub fn new(ring: Arc<HandoffRing>) -> Self {
        Self { ring }
    }

    /// Pop the next published element in FIFO order, if any.
    pub fn poll(&self) -> Option<HandoffElement> {
        let mut queue = self.ring.queue.lock().unwrap();
        let element = queue.pop_front()?;
        let new_head = self.ring.head.fetch_add(1, Ordering::Relaxed) + 1;
        self.ring.head_hint.store(new_head, Ordering::Release);
        Some(element)
    }

    /// Pop up to `max` published elements in FIFO order.
    pub fn poll_batch(&self, max: usize) -> Vec<HandoffElement> {
        let mut out = Vec::with_capacity(max);
        while out.len() < max {
            match self.poll() {
                Some(element) => out.push(element),
                None => break,
            }
        }
        out
    }
}

/// Build a connected producer/consumer pair sharing one ring.
pub fn channel(capacity: usize, hi_thresh: usize, element_capacity: usize) -> (HandoffProducer, HandoffConsumer) {
    let ring = HandoffRing::new(capacity, hi_thresh);
    (HandoffProducer::new(Arc::clone(&ring), element_capacity), HandoffConsumer::new(ring))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_elements_publish_in_fifo_order() {
        let (mut producer, consumer) = channel(16, 12, 4);
        producer.enqueue_to_thread(1, [1, 2, 3, 4, 5, 6, 7, 8], true);

        let first = consumer.poll().unwrap();
        assert_eq!(first.buffer_indices, vec![1, 2, 3, 4]);
        let second = consumer.poll().unwrap();
        assert_eq!(second.buffer_indices, vec![5, 6, 7, 8]);
        assert!(consumer.poll().is_none());
    }

    #[test]
    fn flush_publishes_a_short_element_at_the_worker_boundary() {
        let (mut producer, consumer) = channel(16, 12, 4);
        producer.enqueue_to_thread(1, [1, 2], true);
        assert!(consumer.poll().is_none(), "element should still be held, not published");

        producer.flush();
        let element = consumer.poll().unwrap();
        assert_eq!(element.buffer_indices, vec![1, 2]);
        assert_eq!(element.n_vectors, 2);
    }

    #[test]
    fn congestion_drops_the_remainder_and_counts_exactly() {
        let (mut producer, consumer) = channel(16, 12, 1);
        let accepted = producer.enqueue_to_thread(1, 0..20, true);

        assert_eq!(accepted, 12, "depth reaches hi_thresh after 12 one-element publishes");
        assert_eq!(producer.ring.drop_count(), 8);

        let received = consumer.poll_batch(64);
        assert_eq!(received.len(), 12);
        for (i, element) in received.iter().enumerate() {
            assert_eq!(element.buffer_indices, vec![i as u32]);
        }
    }

    #[test]
    fn last_n_vectors_carries_the_previous_elements_count() {
        let (mut producer, consumer) = channel(16, 12, 2);
        producer.enqueue_to_thread(1, [1, 2], true);
        producer.enqueue_to_thread(1, [3, 4], true);

        let first = consumer.poll().unwrap();
        assert_eq!(first.last_n_vectors, 0);
        let second = consumer.poll().unwrap();
        assert_eq!(second.last_n_vectors, 2);
    }
}
