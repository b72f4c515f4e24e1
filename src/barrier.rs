//! Worker rendezvous for graph reconfiguration.
//!
//! The main thread raises the barrier before mutating shared topology (node
//! add/remove, state change, connectivity change); workers check the flag
//! at the top of each dispatch iteration and spin at a rendezvous until
//! released. Generalizes the teacher's `FrameBarrier` one-for-one, adding
//! the re-fork callback and time-offset rebasing described in the original
//! source's `threads.h` (`vm->time_offset = time_last_barrier_release -
//! now`), so worker clocks stay monotonic across a reconfiguration pause.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// A rendezvous barrier for worker threads, raised by the main thread
/// before a graph reconfiguration and released once every worker has
/// observed it.
pub struct Barrier {
    worker_count: usize,
    raised: AtomicBool,
    arrived: AtomicUsize,
    generation: AtomicUsize,
    all_arrived: AtomicBool,
    lock: Mutex<()>,
    cvar: Condvar,
    /// Wall-clock time of the last release, used to rebase worker clocks.
    time_last_release: Mutex<Instant>,
}

impl Barrier {
    /// Create a barrier for the given number of worker threads (not
    /// counting the main thread, which only raises/releases).
    pub fn new(worker_count: usize) -> Arc<Self> {
        Arc::new(Self {
            worker_count,
            raised: AtomicBool::new(false),
            arrived: AtomicUsize::new(0),
            generation: AtomicUsize::new(0),
            all_arrived: AtomicBool::new(false),
            lock: Mutex::new(()),
            cvar: Condvar::new(),
            time_last_release: Mutex::new(Instant::now()),
        })
    }

    /// Number of workers this barrier expects.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Raise the barrier flag (main thread, before reconfiguring).
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Whether the barrier flag is currently raised. Workers check this at
    /// the top of each dispatch iteration.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Called by a worker once it observes the raised flag: registers
    /// arrival and blocks until the main thread releases.
    ///
    /// Returns the time offset the worker should add to its local clock so
    /// that its next `time_now()` equals the main thread's last-release
    /// time, keeping per-worker clocks monotonic across the pause.
    pub fn arrive_and_wait(&self) -> Duration {
        let generation = self.generation.load(Ordering::SeqCst);
        let prev = self.arrived.fetch_add(1, Ordering::SeqCst);
        if prev + 1 == self.worker_count {
            self.all_arrived.store(true, Ordering::SeqCst);
            self.cvar.notify_all();
        }

        let mut guard = self.lock.lock().unwrap();
        while self.generation.load(Ordering::SeqCst) == generation {
            guard = self.cvar.wait(guard).unwrap();
        }
        drop(guard);

        let released_at = *self.time_last_release.lock().unwrap();
        released_at.elapsed()
    }

    /// Called by the main thread: waits for all workers to arrive, with a
    /// timeout. Returns `true` if the rendezvous completed, `false` if the
    /// timeout expired (the caller should emit `VG201` and continue).
    pub fn wait_for_workers(&self, timeout: Duration) -> bool {
        let guard = self.lock.lock().unwrap();
        let deadline = Instant::now() + timeout;

        let mut guard = guard;
        while !self.all_arrived.load(Ordering::SeqCst) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (g, result) = self.cvar.wait_timeout(guard, remaining).unwrap();
            guard = g;
            if result.timed_out() && !self.all_arrived.load(Ordering::SeqCst) {
                return false;
            }
        }
        true
    }

    /// Release the barrier (main thread, after reconfiguration is
    /// complete). Records the release time so released workers can rebase
    /// their clocks, and advances the generation so spinning workers wake.
    pub fn release(&self) {
        *self.time_last_release.lock().unwrap() = Instant::now();
        self.arrived.store(0, Ordering::SeqCst);
        self.all_arrived.store(false, Ordering::SeqCst);
        self.raised.store(false, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cvar.notify_all();
    }

    /// Number of workers currently parked at the rendezvous.
    pub fn arrived_count(&self) -> usize {
        self.arrived.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn single_worker_round_trip() {
        let barrier = Barrier::new(1);
        barrier.raise();
        assert!(barrier.is_raised());

        let b = Arc::clone(&barrier);
        let handle = thread::spawn(move || {
            b.arrive_and_wait();
        });

        assert!(barrier.wait_for_workers(Duration::from_secs(1)));
        barrier.release();
        handle.join().unwrap();
        assert!(!barrier.is_raised());
    }

    #[test]
    fn multiple_workers_all_arrive() {
        let barrier = Barrier::new(3);
        barrier.raise();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let b = Arc::clone(&barrier);
                thread::spawn(move || {
                    b.arrive_and_wait();
                })
            })
            .collect();

        assert!(barrier.wait_for_workers(Duration::from_secs(1)));
        assert_eq!(barrier.arrived_count(), 3);
        barrier.release();

        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn timeout_when_a_worker_never_arrives() {
        let barrier = Barrier::new(2);
        barrier.raise();

        let b = Arc::clone(&barrier);
        let handle = thread::spawn(move || {
            b.arrive_and_wait();
        });

        assert!(!barrier.wait_for_workers(Duration::from_millis(50)));
        barrier.release();
        handle.join().unwrap();
    }
}
