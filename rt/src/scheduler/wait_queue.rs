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

use crate::thread::{self, Thread, ThreadNode};
use log::trace;
use std::{
    collections::VecDeque,
    sync::{Arc, Weak},
};

/// FIFO queue of parked threads, shared by the synchronization
/// primitives. Entries are weak: the owning scheduler's live set keeps
/// threads alive, and an entry whose thread is gone or no longer
/// suspended is skipped on wake.
pub(crate) struct WaitQueue {
    entries: VecDeque<Weak<Thread>>,
}

impl WaitQueue {
    pub(crate) const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub(crate) fn push_back(&mut self, t: &ThreadNode) {
        self.entries.push_back(Arc::downgrade(t));
    }

    #[allow(dead_code)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ready the oldest waiter that is still parked and return it.
    pub(crate) fn wake_one(&mut self) -> Option<ThreadNode> {
        while let Some(entry) = self.entries.pop_front() {
            let Some(t) = entry.upgrade() else {
                continue;
            };
            let Some(sched) = t.owner() else {
                continue;
            };
            if sched.queue_ready_thread(thread::SUSPENDED, t.clone()) {
                return Some(t);
            }
            trace!("skipping {} waiter 0x{:x}", t.state_to_str(), t.tid());
        }
        None
    }

    /// Ready every parked waiter, oldest first.
    pub(crate) fn wake_all(&mut self) -> usize {
        let mut woken = 0;
        while self.wake_one().is_some() {
            woken += 1;
        }
        woken
    }

    /// Drop a specific thread's entry, e.g. after its timed wait
    /// expired. Dead entries encountered on the way are pruned too.
    pub(crate) fn remove(&mut self, t: &ThreadNode) {
        self.entries
            .retain(|e| e.upgrade().map_or(false, |q| q.tid() != t.tid()));
    }
}
