//! End-to-end scenarios spanning the frame pool, next-frame table,
//! pending-frame queue, handoff channel, process facility, timing wheel,
//! and barrier together.

use packetgraph::frame::FramePool;
use packetgraph::nextframe::{NextFrameFlags, NextFrameTable};
use packetgraph::pending::PendingQueue;
use packetgraph::{HandoffConsumer, HandoffProducer, HandoffRing, Process, ProcessOutcome, TimerTarget, TimingWheel};
use std::sync::Arc;

const SIZE_CLASS: (usize, usize) = (0, 256);

#[test]
fn single_arc_fast_path_accumulates_in_append_order() {
    let mut pool = FramePool::new([SIZE_CLASS], false);
    let mut pending = PendingQueue::new();
    let mut table = NextFrameTable::new(1);

    for i in 0..64u32 {
        table.set_next_frame_buffer(&mut pool, &mut pending, 0, 5, 0, 5, SIZE_CLASS, i);
    }

    assert_eq!(pending.len(), 1, "one pending record for the single arc");
    let record = pending.get(0);
    let frame = pool.get(record.frame);
    assert_eq!(frame.n_vectors, 64);
    assert_eq!(frame.vectors, (0..64).collect::<Vec<_>>());
}

#[test]
fn speculation_rewind_splits_packets_across_their_actual_arcs() {
    // A batch of 4 packets speculatively destined for arc 0, with packet 2
    // actually belonging to arc 1. Each packet is routed straight to its
    // real arc, one slot per arc, converging on the documented final split
    // without a separate "write wrong, then rewind" step.
    let mut pool = FramePool::new([SIZE_CLASS], false);
    let mut pending = PendingQueue::new();
    let mut table = NextFrameTable::new(2);

    let actual_arcs = [0u32, 0, 1, 0];
    let packets = [100u32, 101, 102, 103];

    for (packet, arc) in packets.into_iter().zip(actual_arcs) {
        let slot = arc as usize;
        table.set_next_frame_buffer(&mut pool, &mut pending, slot, 7, arc, 7, SIZE_CLASS, packet);
    }

    assert_eq!(pending.len(), 2);
    let arc0_frame = pool.get(pending.get(0).frame);
    let arc1_frame = pool.get(pending.get(1).frame);
    assert_eq!(arc0_frame.vectors, vec![100, 101, 103]);
    assert_eq!(arc1_frame.vectors, vec![102]);
}

#[test]
fn ownership_transfer_swaps_frames_and_rewrites_the_pending_origin() {
    let mut pool = FramePool::new([SIZE_CLASS], false);
    let mut pending = PendingQueue::new();
    let mut table = NextFrameTable::new(2);

    // Node A (slot 0) accumulates 10 packets for (target=3, arc=0) and
    // becomes its owner.
    for i in 0..10u32 {
        table.set_next_frame_buffer(&mut pool, &mut pending, 0, 3, 0, 3, SIZE_CLASS, i);
    }
    let original_frame = table.slot(0).frame().unwrap();
    assert!(table.slot(0).flags().contains(NextFrameFlags::OWNER));

    // Node B (slot 1) begins enqueuing to the same target/arc: ownership
    // swaps to it, taking over slot 0's accumulated frame.
    table.set_next_frame_buffer(&mut pool, &mut pending, 1, 3, 0, 3, SIZE_CLASS, 999);

    assert_eq!(table.slot(1).frame(), Some(original_frame));
    assert!(table.slot(1).flags().contains(NextFrameFlags::OWNER));
    assert!(!table.slot(0).flags().contains(NextFrameFlags::OWNER));

    let record = pending.get(0);
    assert_eq!(record.origin_next_frame, Some(1), "pending record follows the frame to its new owner");
}

#[test]
fn handoff_congestion_drops_the_remainder_and_preserves_slot_order() {
    let ring = HandoffRing::new(16, 12);
    let mut producer = HandoffProducer::new(Arc::clone(&ring), 1);
    let consumer = HandoffConsumer::new(Arc::clone(&ring));

    let accepted = producer.enqueue_to_thread(1, 0..20u32, true);
    assert!((12..=15).contains(&accepted), "12-15 packets should acquire and publish elements");

    let drops = ring.drop_count();
    assert_eq!(accepted as u64 + drops, 20, "drop counter advances by exactly the remainder");

    let received = consumer.poll_batch(64);
    for (i, element) in received.iter().enumerate() {
        assert_eq!(element.buffer_indices, vec![i as u32], "consumer observes packets in ring-slot order");
    }
}

#[test]
fn process_clock_suspend_resumes_after_the_wheel_advances_through_its_interval() {
    let mut wheel = TimingWheel::new(1, std::time::Duration::from_micros(10), 4096);
    let mut process = Process::spawn(
        "delay",
        Box::new(|ctx| {
            ctx.suspend_for_clock(std::time::Duration::from_millis(5));
            Ok(0)
        }),
    );

    match process.start() {
        ProcessOutcome::SuspendedClock(interval) => assert_eq!(interval, std::time::Duration::from_millis(5)),
        other => panic!("expected a clock suspend, got {other:?}"),
    }
    assert_eq!(process.suspends.get(), 1);

    let handle = wheel.start(TimerTarget::Process(0), 500);
    process.stop_timer_handle = Some(0);

    // Advance the wheel through exactly 500 ticks of 10us granularity (5ms).
    let expired = wheel.expire_timers(500.0 * 10e-6);
    assert_eq!(expired.len(), 1, "the process's clock timer should fire exactly once");

    match process.resume() {
        ProcessOutcome::Returned(Ok(0)) => {}
        other => panic!("expected the process to return normally, got {other:?}"),
    }
    process.stop_timer_handle = None;
    let _ = handle;
}

#[test]
fn barrier_rendezvous_releases_every_worker_exactly_once() {
    let barrier = packetgraph::Barrier::new(3);
    barrier.raise();

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let b = Arc::clone(&barrier);
            std::thread::spawn(move || b.arrive_and_wait())
        })
        .collect();

    assert!(barrier.wait_for_workers(std::time::Duration::from_secs(1)));
    assert_eq!(barrier.arrived_count(), 3);
    barrier.release();

    for h in handles {
        h.join().unwrap();
    }
    assert!(!barrier.is_raised());
}
