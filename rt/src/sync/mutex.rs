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
    thread::{self, ThreadNode},
};
use log::trace;
use spin::Mutex as SpinLock;

/// Cooperative mutual exclusion. A blocked `lock` parks the calling
/// green thread; `unlock` hands the lock directly to the head waiter, so
/// a later arrival can never barge in between a release and the woken
/// waiter's resumption.
///
/// The internal spin lock guards only the owner/queue fields and is
/// never held across a context switch, which keeps every operation safe
/// to call from the bootstrap OS thread as well.
pub struct Mutex {
    inner: SpinLock<MutexState>,
}

struct MutexState {
    // Owning thread id; the id is the weak handle here, the scheduler
    // keeps the thread itself alive.
    owner: Option<u64>,
    pending: WaitQueue,
}

impl Mutex {
    pub const fn new() -> Self {
        Self {
            inner: SpinLock::new(MutexState {
                owner: None,
                pending: WaitQueue::new(),
            }),
        }
    }

    /// Acquire, parking the caller while another thread holds the lock.
    /// Re-locking by the current owner is refused rather than
    /// self-deadlocking.
    pub fn lock(&self) -> Result<()> {
        let t = scheduler::current_thread().ok_or(Error::NotInGreenThread)?;
        let mut s = self.inner.lock();
        match s.owner {
            None => {
                s.owner = Some(t.tid());
                Ok(())
            }
            Some(owner) if owner == t.tid() => Err(Error::InvalidState),
            Some(_) => {
                s.pending.push_back(&t);
                let ok = t.transfer_state(thread::RUNNING, thread::SUSPENDED);
                debug_assert!(ok);
                drop(s);
                scheduler::park_current(&t);
                // Woken by a hand-off, which already made us the owner.
                debug_assert_eq!(self.inner.lock().owner, Some(t.tid()));
                Ok(())
            }
        }
    }

    /// Acquire without parking. False when the lock is held, including
    /// by the caller itself.
    pub fn try_lock(&self) -> Result<bool> {
        let t = scheduler::current_thread().ok_or(Error::NotInGreenThread)?;
        let mut s = self.inner.lock();
        if s.owner.is_none() {
            s.owner = Some(t.tid());
            return Ok(true);
        }
        Ok(false)
    }

    /// Release. With waiters parked, the head waiter becomes the owner
    /// while the lock stays held and is pushed on its scheduler's ready
    /// tail.
    pub fn unlock(&self) -> Result<()> {
        let tid = scheduler::current_thread().map(|t| t.tid());
        let mut s = self.inner.lock();
        match s.owner {
            None => Err(Error::InvalidState),
            Some(owner) if Some(owner) != tid => Err(Error::NotOwner),
            Some(_) => {
                Self::hand_off(&mut s);
                Ok(())
            }
        }
    }

    fn hand_off(s: &mut MutexState) {
        match s.pending.wake_one() {
            Some(next) => {
                trace!("lock handed to thread 0x{:x}", next.tid());
                s.owner = Some(next.tid());
            }
            None => s.owner = None,
        }
    }

    pub(crate) fn held_by(&self, t: &ThreadNode) -> bool {
        self.inner.lock().owner == Some(t.tid())
    }

    /// Release on behalf of a parked waiter that still owns the lock; a
    /// condition variable uses this while suspending its caller.
    pub(crate) fn release_from(&self, t: &ThreadNode) -> Result<()> {
        let mut s = self.inner.lock();
        match s.owner {
            None => Err(Error::InvalidState),
            Some(owner) if owner != t.tid() => Err(Error::NotOwner),
            Some(_) => {
                Self::hand_off(&mut s);
                Ok(())
            }
        }
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}
