//! Channels: a FIFO buffer plus queues of blocked senders and receivers.
//!
//! Operations never block here. They either complete, handing values to or
//! from a parked peer, or report that the caller has to register a wait and
//! park.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use super::{wake_in, GoId, Goroutine, Scheduler, Wake};
use crate::errors::RuntimeFault;
use crate::value::{ChanId, Value};

/// A registered wait. `case` is the `select` case index, if any; senders
/// carry their value.
#[derive(Debug)]
pub(crate) struct Waiter {
    gid: GoId,
    ticket: u64,
    case: Option<usize>,
    value: Option<Value>,
}

#[derive(Debug)]
pub(crate) struct Channel {
    cap: usize,
    /// Received from a closed, drained channel.
    zero: Value,
    buf: VecDeque<Value>,
    closed: bool,
    recvq: VecDeque<Waiter>,
    sendq: VecDeque<Waiter>,
}

fn live(table: &FxHashMap<GoId, Goroutine>, w: &Waiter) -> bool {
    table.get(&w.gid).is_some_and(|g| g.ticket == w.ticket)
}

/// Drop stale waiters from the front of `q`.
fn prune(q: &mut VecDeque<Waiter>, table: &FxHashMap<GoId, Goroutine>) {
    while q.front().is_some_and(|w| !live(table, w)) {
        q.pop_front();
    }
}

fn pop_live(q: &mut VecDeque<Waiter>, table: &FxHashMap<GoId, Goroutine>) -> Option<Waiter> {
    prune(q, table);
    q.pop_front()
}

/// Wake for a sender whose value was taken.
fn sent(case: Option<usize>) -> Wake {
    match case {
        Some(index) => Wake::Selected {
            index,
            value: None,
            ok: true,
        },
        None => Wake::Sent,
    }
}

fn received(case: Option<usize>, value: Value, ok: bool) -> Wake {
    match case {
        Some(index) => Wake::Selected {
            index,
            value: Some(value),
            ok,
        },
        None => Wake::Received { value, ok },
    }
}

impl Scheduler {
    pub fn make_chan(&mut self, cap: usize, zero: Value) -> ChanId {
        let id = ChanId::new(self.chans.len() as u32);
        self.chans.push(Channel {
            cap,
            zero,
            buf: VecDeque::new(),
            closed: false,
            recvq: VecDeque::new(),
            sendq: VecDeque::new(),
        });
        id
    }

    pub fn chan_len(&self, ch: ChanId) -> usize {
        self.chans[ch.index()].buf.len()
    }

    pub fn chan_cap(&self, ch: ChanId) -> usize {
        self.chans[ch.index()].cap
    }

    /// Send `v` if a receiver is waiting or the buffer has room. Gives `v`
    /// back when the sender has to block.
    pub fn try_send(&mut self, ch: ChanId, v: Value) -> Result<Option<Value>, RuntimeFault> {
        let Scheduler {
            chans,
            table,
            run_queue,
            ..
        } = self;
        let c = &mut chans[ch.index()];
        if c.closed {
            return Err(RuntimeFault::SendOnClosed);
        }
        if let Some(w) = pop_live(&mut c.recvq, table) {
            wake_in(table, run_queue, w.gid, w.ticket, received(w.case, v, true));
            return Ok(None);
        }
        if c.buf.len() < c.cap {
            c.buf.push_back(v);
            return Ok(None);
        }
        Ok(Some(v))
    }

    /// Receive if a value is buffered, a sender is waiting, or the channel
    /// is closed (`(zero, false)`). `None` when the receiver has to block.
    pub fn try_recv(&mut self, ch: ChanId) -> Option<(Value, bool)> {
        let Scheduler {
            chans,
            table,
            run_queue,
            ..
        } = self;
        let c = &mut chans[ch.index()];
        if let Some(v) = c.buf.pop_front() {
            // The first blocked sender moves into the freed slot.
            if let Some(mut w) = pop_live(&mut c.sendq, table) {
                c.buf.push_back(w.value.take().unwrap_or_else(|| c.zero.clone()));
                wake_in(table, run_queue, w.gid, w.ticket, sent(w.case));
            }
            return Some((v, true));
        }
        if let Some(mut w) = pop_live(&mut c.sendq, table) {
            let v = w.value.take().unwrap_or_else(|| c.zero.clone());
            wake_in(table, run_queue, w.gid, w.ticket, sent(w.case));
            return Some((v, true));
        }
        if c.closed {
            return Some((c.zero.clone(), false));
        }
        None
    }

    /// A send would not block (or would fault on a closed channel).
    pub fn send_ready(&mut self, ch: ChanId) -> bool {
        let c = &mut self.chans[ch.index()];
        prune(&mut c.recvq, &self.table);
        c.closed || !c.recvq.is_empty() || c.buf.len() < c.cap
    }

    pub fn recv_ready(&mut self, ch: ChanId) -> bool {
        let c = &mut self.chans[ch.index()];
        prune(&mut c.sendq, &self.table);
        c.closed || !c.buf.is_empty() || !c.sendq.is_empty()
    }

    pub fn wait_send(&mut self, ch: ChanId, gid: GoId, ticket: u64, case: Option<usize>, v: Value) {
        self.chans[ch.index()].sendq.push_back(Waiter {
            gid,
            ticket,
            case,
            value: Some(v),
        });
    }

    pub fn wait_recv(&mut self, ch: ChanId, gid: GoId, ticket: u64, case: Option<usize>) {
        self.chans[ch.index()].recvq.push_back(Waiter {
            gid,
            ticket,
            case,
            value: None,
        });
    }

    /// Close `ch`: blocked receivers get `(zero, false)`, blocked senders
    /// fault when they resume.
    pub fn close(&mut self, ch: ChanId) -> Result<(), RuntimeFault> {
        let Scheduler {
            chans,
            table,
            run_queue,
            ..
        } = self;
        let c = &mut chans[ch.index()];
        if c.closed {
            return Err(RuntimeFault::CloseOfClosed);
        }
        c.closed = true;
        for w in c.recvq.drain(..) {
            let wake = received(w.case, c.zero.clone(), false);
            wake_in(table, run_queue, w.gid, w.ticket, wake);
        }
        for w in c.sendq.drain(..) {
            wake_in(table, run_queue, w.gid, w.ticket, Wake::SendClosed);
        }
        Ok(())
    }
}
