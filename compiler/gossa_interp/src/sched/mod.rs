//! Cooperative goroutine scheduling.
//!
//! Goroutines run one at a time on the host thread. The running goroutine
//! is taken out of the table; everything else is either queued (runnable)
//! or parked. A goroutine parks only at a channel operation, a `select`,
//! `Mutex.Lock` or `WaitGroup.Wait`, and yields at `runtime.Gosched`.
//!
//! Waits are registered with a ticket. Waking checks the ticket, so a
//! goroutine that waited on several channels in a `select` is woken at most
//! once; the registrations left on the other channels go stale and are
//! skipped.

mod chan;
mod sync;

use std::collections::VecDeque;
use std::fmt;

use gossa_ssa::FnId;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::interpreter::frame::Frame;
use crate::interpreter::PanicRecord;
use crate::value::{Pointer, Value};

use chan::Channel;
use sync::{MutexState, WaitGroupState};

/// Goroutine id. The main goroutine is `1`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GoId(u32);

impl GoId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for GoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

impl fmt::Display for GoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An active panic of one goroutine.
#[derive(Clone, Debug)]
pub(crate) struct PanicState {
    pub value: Value,
    pub recovered: bool,
}

/// What a parked goroutine finds when it resumes. The blocked instruction
/// runs again and consumes it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Wake {
    /// A receiver took the value of a plain send.
    Sent,
    /// A plain receive completed; `ok` is false for a closed channel.
    Received { value: Value, ok: bool },
    /// Case `index` of a `select` completed. `value` is set for receives.
    Selected {
        index: usize,
        value: Option<Value>,
        ok: bool,
    },
    /// The channel was closed under a blocked sender.
    SendClosed,
    /// The mutex was handed over, or the wait group reached zero.
    Released,
}

pub(crate) struct Goroutine {
    pub id: GoId,
    pub frames: Vec<Frame>,
    pub panic: Option<PanicState>,
    /// Panics superseded by a later panic, oldest first.
    pub aborted: Vec<PanicRecord>,
    pub wake: Option<Wake>,
    /// Ticket of the current wait; `0` when not waiting.
    pub ticket: u64,
    /// Function to call once the frame stack empties (`main` after the
    /// package initializer).
    pub then: Option<FnId>,
}

impl Goroutine {
    pub fn new(id: GoId) -> Self {
        Goroutine {
            id,
            frames: Vec::new(),
            panic: None,
            aborted: Vec::new(),
            wake: None,
            ticket: 0,
            then: None,
        }
    }
}

struct Counters {
    next_goroutine: u32,
    next_ticket: u64,
}

pub(crate) struct Scheduler {
    /// Every goroutine except the running one.
    table: FxHashMap<GoId, Goroutine>,
    run_queue: VecDeque<GoId>,
    chans: Vec<Channel>,
    mutexes: FxHashMap<Pointer, MutexState>,
    wait_groups: FxHashMap<Pointer, WaitGroupState>,
    ids: Mutex<Counters>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            table: FxHashMap::default(),
            run_queue: VecDeque::new(),
            chans: Vec::new(),
            mutexes: FxHashMap::default(),
            wait_groups: FxHashMap::default(),
            ids: Mutex::new(Counters {
                next_goroutine: 1,
                next_ticket: 1,
            }),
        }
    }

    pub fn next_goroutine_id(&self) -> GoId {
        let mut ids = self.ids.lock();
        let id = GoId(ids.next_goroutine);
        ids.next_goroutine += 1;
        id
    }

    pub fn next_ticket(&self) -> u64 {
        let mut ids = self.ids.lock();
        let t = ids.next_ticket;
        ids.next_ticket += 1;
        t
    }

    /// Add a new goroutine at the back of the run queue.
    pub fn spawn(&mut self, g: Goroutine) {
        debug!(goroutine = %g.id, "spawn");
        self.run_queue.push_back(g.id);
        self.table.insert(g.id, g);
    }

    /// Take the next runnable goroutine out of the table.
    pub fn take_runnable(&mut self) -> Option<Goroutine> {
        while let Some(id) = self.run_queue.pop_front() {
            if let Some(g) = self.table.remove(&id) {
                return Some(g);
            }
        }
        None
    }

    /// Put back a goroutine that blocked. It runs again only once woken.
    pub fn park(&mut self, g: Goroutine) {
        debug!(goroutine = %g.id, ticket = g.ticket, "block");
        self.table.insert(g.id, g);
    }

    /// Put back a goroutine that is still runnable.
    pub fn requeue(&mut self, g: Goroutine) {
        self.run_queue.push_back(g.id);
        self.table.insert(g.id, g);
    }

    /// Whether `id` is parked on the wait registered as `ticket`.
    pub fn is_waiting(&self, id: GoId, ticket: u64) -> bool {
        self.table.get(&id).is_some_and(|g| g.ticket == ticket)
    }

    /// Wake `id` if it is still parked on `ticket`.
    pub fn wake(&mut self, id: GoId, ticket: u64, wake: Wake) -> bool {
        wake_in(&mut self.table, &mut self.run_queue, id, ticket, wake)
    }

    pub fn num_goroutines(&self) -> usize {
        self.table.len()
    }
}

fn wake_in(
    table: &mut FxHashMap<GoId, Goroutine>,
    run_queue: &mut VecDeque<GoId>,
    id: GoId,
    ticket: u64,
    wake: Wake,
) -> bool {
    match table.get_mut(&id) {
        Some(g) if g.ticket == ticket && ticket != 0 => {
            g.ticket = 0;
            g.wake = Some(wake);
            run_queue.push_back(id);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests;
