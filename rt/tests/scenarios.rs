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

//! End-to-end scenarios driving the whole runtime: scheduling order,
//! producer/consumer hand-off, lock fairness, timeouts, deadlock
//! behavior and misuse reporting.

use green_rt::{scheduler, Condvar, Error, Mutex, Scheduler};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Mutex as StdMutex,
    },
    time::{Duration, Instant},
};

#[test]
fn three_workers_interleave_round_robin() {
    let sched = Scheduler::new();
    let lines = Arc::new(StdMutex::new(Vec::new()));
    let mut ids = Vec::new();
    for _ in 0..3 {
        let lines = lines.clone();
        let handle = sched
            .spawn(move || {
                let me = scheduler::current().unwrap().id();
                for step in 0..3 {
                    lines.lock().unwrap().push(format!("{me}-step-{step}"));
                    scheduler::yield_now().unwrap();
                }
            })
            .unwrap();
        ids.push(handle);
    }
    sched.run();

    let mut expected = Vec::new();
    for step in 0..3 {
        for handle in &ids {
            expected.push(format!("{}-step-{}", handle.id(), step));
        }
    }
    assert_eq!(*lines.lock().unwrap(), expected);
    assert!(ids.iter().all(|h| h.is_finished()));
}

struct BoundedQueue {
    lock: Mutex,
    not_empty: Condvar,
    not_full: Condvar,
    items: StdMutex<VecDeque<i32>>,
    capacity: usize,
    high_water: AtomicUsize,
}

impl BoundedQueue {
    fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            lock: Mutex::new(),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            items: StdMutex::new(VecDeque::new()),
            capacity,
            high_water: AtomicUsize::new(0),
        })
    }

    fn push(&self, value: i32) {
        self.lock.lock().unwrap();
        while self.items.lock().unwrap().len() == self.capacity {
            self.not_full.wait(&self.lock).unwrap();
        }
        let mut items = self.items.lock().unwrap();
        items.push_back(value);
        self.high_water.fetch_max(items.len(), Ordering::SeqCst);
        drop(items);
        self.not_empty.notify_one();
        self.lock.unlock().unwrap();
    }

    fn pop(&self) -> i32 {
        self.lock.lock().unwrap();
        while self.items.lock().unwrap().is_empty() {
            self.not_empty.wait(&self.lock).unwrap();
        }
        let value = self.items.lock().unwrap().pop_front().unwrap();
        self.not_full.notify_one();
        self.lock.unlock().unwrap();
        value
    }
}

#[test]
fn producer_consumer_over_a_bounded_queue() {
    let sched = Scheduler::new();
    let queue = BoundedQueue::new(5);
    let received = Arc::new(StdMutex::new(Vec::new()));

    let producer_queue = queue.clone();
    let producer = sched
        .spawn(move || {
            for value in 1..=10 {
                producer_queue.push(value);
            }
        })
        .unwrap();

    let consumer_queue = queue.clone();
    let sink = received.clone();
    let consumer = sched
        .spawn(move || {
            for _ in 0..10 {
                let value = consumer_queue.pop();
                sink.lock().unwrap().push(value);
            }
        })
        .unwrap();

    sched.run();

    assert_eq!(*received.lock().unwrap(), (1..=10).collect::<Vec<_>>());
    assert!(queue.high_water.load(Ordering::SeqCst) <= 5);
    assert!(producer.is_finished());
    assert!(consumer.is_finished());
}

#[test]
fn lock_hand_off_preserves_arrival_order() {
    let sched = Scheduler::new();
    let lock = Arc::new(Mutex::new());
    let order = Arc::new(StdMutex::new(Vec::new()));

    let holder_lock = lock.clone();
    sched
        .spawn(move || {
            holder_lock.lock().unwrap();
            // Give A, B and C time to park on the lock in that order.
            for _ in 0..5 {
                scheduler::yield_now().unwrap();
            }
            holder_lock.unlock().unwrap();
        })
        .unwrap();

    for name in ["A", "B", "C"] {
        let lock = lock.clone();
        let order = order.clone();
        sched
            .spawn(move || {
                lock.lock().unwrap();
                order.lock().unwrap().push(name);
                // An acquirer sleeping while holding the lock must not
                // perturb the hand-off order behind it.
                scheduler::sleep_for(Duration::from_millis(2)).unwrap();
                lock.unlock().unwrap();
            })
            .unwrap();
    }

    // A thread spawned after the contenders cannot barge in front of
    // them.
    let late_lock = lock.clone();
    let late_order = order.clone();
    sched
        .spawn(move || {
            late_lock.lock().unwrap();
            late_order.lock().unwrap().push("late");
            late_lock.unlock().unwrap();
        })
        .unwrap();

    sched.run();
    assert_eq!(*order.lock().unwrap(), vec!["A", "B", "C", "late"]);
}

#[test]
fn timed_wait_expires_without_a_notifier() {
    let sched = Scheduler::new();
    let lock = Arc::new(Mutex::new());
    let cond = Arc::new(Condvar::new());
    let outcome = Arc::new(StdMutex::new(None));

    let (l, c, o) = (lock.clone(), cond.clone(), outcome.clone());
    let waiter = sched
        .spawn(move || {
            l.lock().unwrap();
            let start = Instant::now();
            let notified = c.wait_for(&l, Duration::from_millis(10)).unwrap();
            *o.lock().unwrap() = Some((notified, start.elapsed()));
            l.unlock().unwrap();
        })
        .unwrap();

    sched.run();

    let (notified, waited) = outcome.lock().unwrap().unwrap();
    assert!(!notified);
    assert!(waited >= Duration::from_millis(10));
    assert!(waiter.is_finished());
}

#[test]
fn zero_duration_wait_times_out_after_one_scheduler_trip() {
    let sched = Scheduler::new();
    let lock = Arc::new(Mutex::new());
    let cond = Arc::new(Condvar::new());
    let outcome = Arc::new(StdMutex::new(None));

    let o = outcome.clone();
    sched
        .spawn(move || {
            lock.lock().unwrap();
            let notified = cond.wait_for(&lock, Duration::ZERO).unwrap();
            *o.lock().unwrap() = Some(notified);
            lock.unlock().unwrap();
        })
        .unwrap();

    sched.run();
    assert_eq!(*outcome.lock().unwrap(), Some(false));
}

#[test]
fn opposite_order_locking_deadlocks_and_is_not_detected() {
    let sched = Scheduler::new();
    let first = Arc::new(Mutex::new());
    let second = Arc::new(Mutex::new());

    let (a1, b1) = (first.clone(), second.clone());
    let t1 = sched
        .spawn(move || {
            a1.lock().unwrap();
            scheduler::yield_now().unwrap();
            b1.lock().unwrap();
            b1.unlock().unwrap();
            a1.unlock().unwrap();
        })
        .unwrap();
    let (a2, b2) = (first.clone(), second.clone());
    let t2 = sched
        .spawn(move || {
            b2.lock().unwrap();
            scheduler::yield_now().unwrap();
            a2.lock().unwrap();
            a2.unlock().unwrap();
            b2.unlock().unwrap();
        })
        .unwrap();

    let (tx, rx) = mpsc::channel();
    let runner = sched.clone();
    let os_thread = std::thread::spawn(move || {
        runner.run();
        let _ = tx.send(());
    });

    // The core does not detect the deadlock: the scheduler idles with a
    // non-empty live set and run() does not return on its own.
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    assert!(!t1.is_finished());
    assert!(!t2.is_finished());

    // The harness, not the core, breaks the stalemate.
    sched.stop();
    rx.recv_timeout(Duration::from_secs(5))
        .expect("run() must honor stop() from the idle wait");
    os_thread.join().unwrap();
}

#[test]
fn misuse_outside_green_threads_is_reported() {
    assert_eq!(scheduler::yield_now().unwrap_err(), Error::NotInGreenThread);

    let lock = Mutex::new();
    let cond = Condvar::new();
    assert_eq!(lock.lock().unwrap_err(), Error::NotInGreenThread);
    assert_eq!(cond.wait(&lock).unwrap_err(), Error::NotInGreenThread);
    assert_eq!(
        cond.wait_for(&lock, Duration::from_millis(1)).unwrap_err(),
        Error::NotInGreenThread
    );
    // Nobody holds it at all.
    assert_eq!(lock.unlock().unwrap_err(), Error::InvalidState);
}

#[test]
fn unlocking_somebody_elses_mutex_is_reported() {
    let sched = Scheduler::new();
    let lock = Arc::new(Mutex::new());
    let observed = Arc::new(StdMutex::new(None));

    let holder_lock = lock.clone();
    sched
        .spawn(move || {
            holder_lock.lock().unwrap();
            scheduler::yield_now().unwrap();
            holder_lock.unlock().unwrap();
        })
        .unwrap();
    let (l, o) = (lock.clone(), observed.clone());
    sched
        .spawn(move || {
            *o.lock().unwrap() = l.unlock().err();
        })
        .unwrap();

    sched.run();
    assert_eq!(*observed.lock().unwrap(), Some(Error::NotOwner));
}

#[test]
fn run_returns_immediately_with_nothing_spawned() {
    let sched = Scheduler::new();
    let start = Instant::now();
    sched.run();
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn run_reentry_on_the_running_scheduler_is_a_noop() {
    let sched = Scheduler::new();
    let inner = sched.clone();
    let h = sched
        .spawn(move || {
            // Already inside this scheduler's loop; must return at once
            // instead of recursing into a second loop.
            inner.run();
        })
        .unwrap();
    sched.run();
    assert!(h.is_finished());
}

#[test]
fn global_scheduler_sugar_runs_spawned_threads() {
    let done = Arc::new(StdMutex::new(false));
    let flag = done.clone();
    let h = green_rt::spawn(move || {
        *flag.lock().unwrap() = true;
    })
    .unwrap();
    Scheduler::global().run();
    assert!(h.is_finished());
    assert!(*done.lock().unwrap());
}
