//! The cooperative "process" facility (C6).
//!
//! A process is a node whose function runs to a suspension point rather
//! than to completion on every dispatch. The original implements this with
//! a private stack and a pair of jump buffers (return/resume); per the
//! redesign note that the suspension contract only requires "suspend
//! returns control to the dispatcher with an outcome code, resume re-enters
//! at the suspend point," this port substitutes a dedicated OS thread per
//! process, parked on a channel recv at every suspension point. The
//! dispatcher's `resume`/`start` calls are the longjmp-equivalent: they
//! unblock the process thread and then block themselves waiting for its
//! next outcome, preserving the single-worker strictly-serial dispatch
//! model (only one of the two threads ever runs at a time).

pub mod event;

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use event::{EventQueues, EventRecord};

use crate::error::DispatchError;
use crate::sync::atomics::AtomicCounter;

/// A process node's current suspension state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Not yet started, or returned and not restartable.
    Stopped,
    /// Currently executing (from the dispatcher's point of view: currently
    /// blocked on the process thread's reply).
    Running,
    /// Suspended on a clock wait; `resume_interval` holds the requested delay.
    SuspendedWaitingClock,
    /// Suspended on an event wait.
    SuspendedWaitingEvent,
}

/// Magic value stored alongside a process's bookkeeping, checked after
/// every observed return from the process thread. With a real stackful
/// coroutine this guards the base of a hand-rolled stack; here the OS
/// thread's stack is managed by the platform, so this checks the
/// integrity of this struct's own state instead — vestigial for this
/// port, but keeps the documented "sentinel intact after every return"
/// property true and cheap to assert.
const STACK_SENTINEL: u64 = 0x5053_5441_434b_5f47;

enum ToProcess {
    Start,
    Resume,
}

enum FromProcess {
    SuspendClock(Duration),
    SuspendEvent,
    Returned(Result<u32, DispatchError>),
}

/// A process function: runs on its own thread, suspending via
/// [`ProcessContext::suspend_for_clock`] / [`ProcessContext::suspend_for_event`].
pub type ProcessFn = Box<dyn FnOnce(&mut ProcessContext) -> Result<u32, DispatchError> + Send>;

/// What a process function can do while it runs.
pub struct ProcessContext {
    to_dispatcher: Sender<FromProcess>,
    from_dispatcher: Receiver<ToProcess>,
    events: Arc<Mutex<EventQueues>>,
}

impl ProcessContext {
    /// Suspend until the dispatcher resumes this process on a clock
    /// expiration roughly `interval` from now (actual wakeup is driven by
    /// the timing wheel's granularity, not real-time sleep).
    pub fn suspend_for_clock(&self, interval: Duration) {
        let _ = self.to_dispatcher.send(FromProcess::SuspendClock(interval));
        let _ = self.from_dispatcher.recv();
    }

    /// Suspend until the dispatcher resumes this process because an event
    /// was signaled. Call [`Self::read_events`] after returning to collect
    /// whatever arrived.
    pub fn suspend_for_event(&self) {
        let _ = self.to_dispatcher.send(FromProcess::SuspendEvent);
        let _ = self.from_dispatcher.recv();
    }

    /// Drain every queued event of `event_type`, oldest first.
    pub fn read_events(&self, event_type: u32) -> Vec<EventRecord> {
        self.events.lock().unwrap().drain_type(event_type)
    }
}

/// Outcome of a `start`/`resume` call.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// The process suspended waiting for the clock.
    SuspendedClock(Duration),
    /// The process suspended waiting for an event.
    SuspendedEvent,
    /// The process function returned.
    Returned(Result<u32, DispatchError>),
}

/// A process node's dispatcher-side handle.
pub struct Process {
    thread: Option<JoinHandle<()>>,
    to_process: Sender<ToProcess>,
    from_process: Receiver<FromProcess>,
    events: Arc<Mutex<EventQueues>>,
    /// Current suspension state.
    pub state: ProcessState,
    /// Weak handle into the timing wheel for this process's clock wait, if
    /// any is currently armed.
    pub stop_timer_handle: Option<u32>,
    /// The interval most recently requested by a clock suspend.
    pub resume_interval: Duration,
    /// Count of times this process has suspended.
    pub suspends: AtomicCounter,
    sentinel: u64,
}

impl Process {
    /// Spawn a process thread, parked until [`Self::start`] is called.
    pub fn spawn(name: impl Into<String>, func: ProcessFn) -> Self {
        let (to_process_tx, to_process_rx) = mpsc::channel();
        let (from_process_tx, from_process_rx) = mpsc::channel();
        let events = Arc::new(Mutex::new(EventQueues::new()));
        let ctx_events = Arc::clone(&events);

        let thread = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                if !matches!(to_process_rx.recv(), Ok(ToProcess::Start)) {
                    return;
                }
                let mut ctx = ProcessContext {
                    to_dispatcher: from_process_tx.clone(),
                    from_dispatcher: to_process_rx,
                    events: ctx_events,
                };
                let result = func(&mut ctx);
                let _ = from_process_tx.send(FromProcess::Returned(result));
            })
            .expect("failed to spawn process thread");

        Self {
            thread: Some(thread),
            to_process: to_process_tx,
            from_process: from_process_rx,
            events,
            state: ProcessState::Stopped,
            stop_timer_handle: None,
            resume_interval: Duration::ZERO,
            suspends: AtomicCounter::new(0),
            sentinel: STACK_SENTINEL,
        }
    }

    /// Start the process, running until its first suspension or return.
    pub fn start(&mut self) -> ProcessOutcome {
        let _ = self.to_process.send(ToProcess::Start);
        self.wait_for_outcome()
    }

    /// Resume a suspended process, running until its next suspension or
    /// return.
    pub fn resume(&mut self) -> ProcessOutcome {
        assert_ne!(self.state, ProcessState::Stopped, "attempted to resume a process that was not suspended");
        let _ = self.to_process.send(ToProcess::Resume);
        self.wait_for_outcome()
    }

    /// Queue an event for this process. Returns `true` if the process was
    /// suspended waiting for an event (the caller — typically the
    /// dispatcher or timing wheel — should call [`Self::resume`]).
    pub fn signal_event(&self, event_type: u32, data: Vec<u8>) -> bool {
        self.events.lock().unwrap().push(EventRecord { event_type, data });
        self.state == ProcessState::SuspendedWaitingEvent
    }

    /// Whether this process is currently suspended on either wait kind.
    pub fn is_suspended(&self) -> bool {
        matches!(self.state, ProcessState::SuspendedWaitingClock | ProcessState::SuspendedWaitingEvent)
    }

    fn wait_for_outcome(&mut self) -> ProcessOutcome {
        if self.sentinel != STACK_SENTINEL {
            crate::diagnostics::emit(&crate::diagnostics::VG301);
            debug_assert!(false, "process stack sentinel damaged");
        }

        match self.from_process.recv() {
            Ok(FromProcess::SuspendClock(interval)) => {
                self.state = ProcessState::SuspendedWaitingClock;
                self.resume_interval = interval;
                self.suspends.increment();
                ProcessOutcome::SuspendedClock(interval)
            }
            Ok(FromProcess::SuspendEvent) => {
                self.state = ProcessState::SuspendedWaitingEvent;
                self.suspends.increment();
                ProcessOutcome::SuspendedEvent
            }
            Ok(FromProcess::Returned(result)) => {
                self.state = ProcessState::Stopped;
                ProcessOutcome::Returned(result)
            }
            Err(_) => {
                self.state = ProcessState::Stopped;
                ProcessOutcome::Returned(Err(DispatchError::new("process", "process thread ended without a reply")))
            }
        }
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        // Dropping both channel ends unblocks a parked `recv()` in the
        // process thread with a disconnect error, letting it exit.
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_runs_to_completion_without_suspending() {
        let mut process = Process::spawn("p", Box::new(|_ctx| Ok(7)));
        match process.start() {
            ProcessOutcome::Returned(Ok(n)) => assert_eq!(n, 7),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(process.state, ProcessState::Stopped);
    }

    #[test]
    fn clock_suspend_then_resume_then_return() {
        let mut process = Process::spawn(
            "p",
            Box::new(|ctx| {
                ctx.suspend_for_clock(Duration::from_millis(5));
                Ok(1)
            }),
        );

        match process.start() {
            ProcessOutcome::SuspendedClock(d) => assert_eq!(d, Duration::from_millis(5)),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(process.state, ProcessState::SuspendedWaitingClock);
        assert_eq!(process.suspends.get(), 1);

        match process.resume() {
            ProcessOutcome::Returned(Ok(1)) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn event_suspend_then_signal_then_resume_reads_event() {
        let mut process = Process::spawn(
            "p",
            Box::new(|ctx| {
                ctx.suspend_for_event();
                let events = ctx.read_events(42);
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].data, vec![9, 9]);
                Ok(0)
            }),
        );

        process.start();
        assert!(process.is_suspended());

        let should_resume = process.signal_event(42, vec![9, 9]);
        assert!(should_resume);

        match process.resume() {
            ProcessOutcome::Returned(Ok(0)) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
