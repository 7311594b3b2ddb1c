// Copyright (c) 2025 vivo Mobile Communication Co., Ltd.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::{
    error::{Error, Result},
    scheduler::{self, WaitQueue},
    sync::Mutex,
    thread,
};
use spin::Mutex as SpinLock;
use std::time::{Duration, Instant};

/// Condition variable for green threads. The associated mutex is an
/// argument to each wait, not fixed at construction. Notifiers only move
/// waiters to the ready queue; they never resume anybody inline, and may
/// run on any OS thread.
pub struct Condvar {
    waiters: SpinLock<WaitQueue>,
}

impl Condvar {
    pub const fn new() -> Self {
        Self {
            waiters: SpinLock::new(WaitQueue::new()),
        }
    }

    /// Atomically release `mutex` and park until notified, then
    /// re-acquire `mutex`. Callers must re-test their predicate after
    /// every return.
    pub fn wait(&self, mutex: &Mutex) -> Result<()> {
        let t = scheduler::current_thread().ok_or(Error::NotInGreenThread)?;
        if !mutex.held_by(&t) {
            return Err(Error::NotOwner);
        }
        let mut w = self.waiters.lock();
        w.push_back(&t);
        let ok = t.transfer_state(thread::RUNNING, thread::SUSPENDED);
        debug_assert!(ok);
        drop(w);
        // Ownership was checked and no switch has happened since, so the
        // release cannot fail.
        let released = mutex.release_from(&t);
        debug_assert!(released.is_ok());
        scheduler::park_current(&t);
        mutex.lock()
    }

    /// As [`wait`](Self::wait), with an upper bound on the park. True
    /// means a notification arrived before the deadline, false that the
    /// deadline passed; the mutex is re-acquired either way.
    pub fn wait_for(&self, mutex: &Mutex, timeout: Duration) -> Result<bool> {
        let t = scheduler::current_thread().ok_or(Error::NotInGreenThread)?;
        if !mutex.held_by(&t) {
            return Err(Error::NotOwner);
        }
        let epoch = t.begin_timed_park();
        let mut w = self.waiters.lock();
        w.push_back(&t);
        let ok = t.transfer_state(thread::RUNNING, thread::SUSPENDED);
        debug_assert!(ok);
        drop(w);
        let released = mutex.release_from(&t);
        debug_assert!(released.is_ok());
        let timed_out = scheduler::park_current_timed(&t, epoch, timeout);
        if timed_out {
            self.waiters.lock().remove(&t);
        }
        mutex.lock()?;
        Ok(!timed_out)
    }

    /// As [`wait_for`](Self::wait_for), against an absolute monotonic
    /// deadline.
    pub fn wait_until(&self, mutex: &Mutex, deadline: Instant) -> Result<bool> {
        self.wait_for(mutex, deadline.saturating_duration_since(Instant::now()))
    }

    /// Ready the longest-parked waiter; a no-op when nobody waits.
    pub fn notify_one(&self) {
        self.waiters.lock().wake_one();
    }

    /// Ready every parked waiter, oldest first.
    pub fn notify_all(&self) {
        self.waiters.lock().wake_all();
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}
