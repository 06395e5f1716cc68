//! `sync.Mutex` and `sync.WaitGroup`, keyed by the address of the
//! program's mutex or wait group variable.

use std::collections::VecDeque;

use gossa_types::Idx;

use super::{wake_in, GoId, Scheduler, Wake};
use crate::errors::{Fatal, RuntimeFault};
use crate::value::{Pointer, Value};

#[derive(Debug, Default)]
pub(crate) struct MutexState {
    locked: bool,
    waiters: VecDeque<(GoId, u64)>,
}

#[derive(Debug, Default)]
pub(crate) struct WaitGroupState {
    count: i64,
    waiters: Vec<(GoId, u64)>,
}

impl Scheduler {
    /// Take the mutex if it is free.
    pub fn try_lock(&mut self, m: &Pointer) -> bool {
        let st = self.mutexes.entry(m.clone()).or_default();
        if st.locked {
            return false;
        }
        st.locked = true;
        true
    }

    pub fn wait_lock(&mut self, m: &Pointer, gid: GoId, ticket: u64) {
        self.mutexes
            .entry(m.clone())
            .or_default()
            .waiters
            .push_back((gid, ticket));
    }

    /// Release the mutex, handing it straight to the first waiter.
    pub fn unlock(&mut self, m: &Pointer) -> Result<(), Fatal> {
        let Scheduler {
            mutexes,
            table,
            run_queue,
            ..
        } = self;
        let st = match mutexes.get_mut(m) {
            Some(st) if st.locked => st,
            _ => return Err(Fatal::UnlockOfUnlocked),
        };
        while let Some((gid, ticket)) = st.waiters.pop_front() {
            if wake_in(table, run_queue, gid, ticket, Wake::Released) {
                return Ok(());
            }
        }
        st.locked = false;
        Ok(())
    }

    /// `wg.Add(delta)`. Reaching zero releases every waiter.
    pub fn wait_group_add(&mut self, wg: &Pointer, delta: i64) -> Result<(), RuntimeFault> {
        let Scheduler {
            wait_groups,
            table,
            run_queue,
            ..
        } = self;
        let st = wait_groups.entry(wg.clone()).or_default();
        st.count += delta;
        if st.count < 0 {
            return Err(RuntimeFault::Panic(Value::boxed(
                Idx::STRING,
                Value::str("sync: negative WaitGroup counter"),
            )));
        }
        if st.count == 0 {
            for (gid, ticket) in st.waiters.drain(..) {
                wake_in(table, run_queue, gid, ticket, Wake::Released);
            }
        }
        Ok(())
    }

    pub fn wait_group_done(&self, wg: &Pointer) -> bool {
        self.wait_groups.get(wg).map_or(true, |st| st.count == 0)
    }

    pub fn wait_group_wait(&mut self, wg: &Pointer, gid: GoId, ticket: u64) {
        self.wait_groups
            .entry(wg.clone())
            .or_default()
            .waiters
            .push((gid, ticket));
    }
}
