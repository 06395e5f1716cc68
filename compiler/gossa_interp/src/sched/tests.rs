use pretty_assertions::assert_eq;

use super::*;
use crate::errors::{Fatal, RuntimeFault};
use crate::heap::Heap;

/// Park a fresh goroutine on a new ticket.
fn parked(s: &mut Scheduler) -> (GoId, u64) {
    let id = s.next_goroutine_id();
    let ticket = s.next_ticket();
    let mut g = Goroutine::new(id);
    g.ticket = ticket;
    s.park(g);
    (id, ticket)
}

#[test]
fn ids_are_monotonic() {
    let s = Scheduler::new();
    assert_eq!(s.next_goroutine_id().raw(), 1);
    assert_eq!(s.next_goroutine_id().raw(), 2);
    assert!(s.next_ticket() < s.next_ticket());
}

#[test]
fn run_queue_is_fifo() {
    let mut s = Scheduler::new();
    let a = s.next_goroutine_id();
    let b = s.next_goroutine_id();
    s.spawn(Goroutine::new(a));
    s.spawn(Goroutine::new(b));
    assert_eq!(s.take_runnable().map(|g| g.id), Some(a));
    assert_eq!(s.take_runnable().map(|g| g.id), Some(b));
    assert!(s.take_runnable().is_none());
}

#[test]
fn unbuffered_send_hands_value_to_waiting_receiver() {
    let mut s = Scheduler::new();
    let ch = s.make_chan(0, Value::Int(0));
    assert_eq!(s.try_send(ch, Value::Int(1)).unwrap(), Some(Value::Int(1)));

    let (rx, ticket) = parked(&mut s);
    s.wait_recv(ch, rx, ticket, None);
    assert!(s.send_ready(ch));
    assert_eq!(s.try_send(ch, Value::Int(7)).unwrap(), None);

    let g = s.take_runnable().unwrap();
    assert_eq!(g.id, rx);
    assert_eq!(
        g.wake,
        Some(Wake::Received {
            value: Value::Int(7),
            ok: true
        })
    );
}

#[test]
fn buffered_channel_refills_from_blocked_sender() {
    let mut s = Scheduler::new();
    let ch = s.make_chan(1, Value::Int(0));
    assert_eq!(s.try_send(ch, Value::Int(1)).unwrap(), None);
    let (tx, ticket) = parked(&mut s);
    s.wait_send(ch, tx, ticket, None, Value::Int(2));

    assert_eq!(s.try_recv(ch), Some((Value::Int(1), true)));
    assert_eq!(s.chan_len(ch), 1);
    assert_eq!(s.take_runnable().unwrap().wake, Some(Wake::Sent));
    assert_eq!(s.try_recv(ch), Some((Value::Int(2), true)));
    assert_eq!(s.try_recv(ch), None);
}

#[test]
fn stale_select_registrations_are_skipped() {
    let mut s = Scheduler::new();
    let a = s.make_chan(0, Value::Int(0));
    let b = s.make_chan(0, Value::Int(0));
    let (g, ticket) = parked(&mut s);
    s.wait_recv(a, g, ticket, Some(0));
    s.wait_recv(b, g, ticket, Some(1));

    assert_eq!(s.try_send(a, Value::Int(5)).unwrap(), None);
    // The registration on `b` went stale with the first wake.
    assert!(!s.send_ready(b));
    assert_eq!(s.try_send(b, Value::Int(6)).unwrap(), Some(Value::Int(6)));
    assert_eq!(
        s.take_runnable().unwrap().wake,
        Some(Wake::Selected {
            index: 0,
            value: Some(Value::Int(5)),
            ok: true
        })
    );
}

#[test]
fn close_wakes_receivers_and_faults_senders() {
    let mut s = Scheduler::new();
    let ch = s.make_chan(0, Value::str(""));
    let (rx, rt) = parked(&mut s);
    s.wait_recv(ch, rx, rt, None);
    let (tx, tt) = parked(&mut s);
    s.wait_send(ch, tx, tt, None, Value::str("x"));
    // The sender arrived second; the receiver is served first.
    s.close(ch).unwrap();
    let woken: Vec<_> = std::iter::from_fn(|| s.take_runnable()).map(|g| g.wake).collect();
    assert_eq!(
        woken,
        vec![
            Some(Wake::Received {
                value: Value::str(""),
                ok: false
            }),
            Some(Wake::SendClosed)
        ]
    );
    assert!(matches!(s.close(ch), Err(RuntimeFault::CloseOfClosed)));
    assert!(matches!(s.try_send(ch, Value::str("y")), Err(RuntimeFault::SendOnClosed)));
    assert_eq!(s.try_recv(ch), Some((Value::str(""), false)));
}

#[test]
fn mutex_hands_over_to_first_waiter() {
    let mut s = Scheduler::new();
    let mut heap = Heap::new();
    let m = heap.alloc(Value::Struct(Vec::new()));
    assert!(s.try_lock(&m));
    assert!(!s.try_lock(&m));
    let (g, ticket) = parked(&mut s);
    s.wait_lock(&m, g, ticket);

    s.unlock(&m).unwrap();
    assert_eq!(s.take_runnable().unwrap().wake, Some(Wake::Released));
    // Still held, by the woken goroutine.
    assert!(!s.try_lock(&m));
    s.unlock(&m).unwrap();
    assert_eq!(s.unlock(&m), Err(Fatal::UnlockOfUnlocked));
}

#[test]
fn wait_group_releases_at_zero() {
    let mut s = Scheduler::new();
    let mut heap = Heap::new();
    let wg = heap.alloc(Value::Struct(Vec::new()));
    assert!(s.wait_group_done(&wg));
    s.wait_group_add(&wg, 2).unwrap();
    let (g, ticket) = parked(&mut s);
    s.wait_group_wait(&wg, g, ticket);
    s.wait_group_add(&wg, -1).unwrap();
    assert!(s.take_runnable().is_none());
    s.wait_group_add(&wg, -1).unwrap();
    assert_eq!(s.take_runnable().unwrap().wake, Some(Wake::Released));
    assert!(matches!(
        s.wait_group_add(&wg, -1),
        Err(RuntimeFault::Panic(_))
    ));
}
