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

use crate::thread::Thread;
use std::{cmp::Ordering, collections::BinaryHeap, sync::Weak, time::Instant};

/// One armed wake-up: a parked thread and the parking episode the
/// deadline belongs to. An entry whose episode has passed is void.
pub(crate) struct DeadlineEntry {
    deadline: Instant,
    // Breaks deadline ties in arming order.
    seq: u64,
    pub(crate) thread: Weak<Thread>,
    pub(crate) epoch: usize,
}

impl PartialEq for DeadlineEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for DeadlineEntry {}

impl PartialOrd for DeadlineEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeadlineEntry {
    // Reversed so the earliest deadline surfaces at the top of a max
    // heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Deadline-sorted queue of armed wake-ups. The scheduler drains due
/// entries every loop turn and naps no longer than the nearest deadline
/// while idle.
pub(crate) struct DeadlineQueue {
    heap: BinaryHeap<DeadlineEntry>,
    next_seq: u64,
}

impl DeadlineQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn arm(&mut self, deadline: Instant, thread: Weak<Thread>, epoch: usize) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(DeadlineEntry {
            deadline,
            seq,
            thread,
            epoch,
        });
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|e| e.deadline)
    }

    /// Remove and return the nearest entry whose deadline has passed.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Option<DeadlineEntry> {
        if self.heap.peek().is_some_and(|e| e.deadline <= now) {
            return self.heap.pop();
        }
        None
    }
}
