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

//! The cooperative scheduler.
//!
//! One `Scheduler` owns the ready FIFO, the live set and the deadline
//! queue. [`Scheduler::run`] converts the calling OS thread into the
//! scheduler context: every suspension inside a green thread switches
//! back here, and the loop then pops the next ready thread. The current
//! thread and the scheduler's saved context are OS-thread-local, so a
//! scheduler is an ordinary object and independent schedulers may run on
//! different OS threads.

mod wait_queue;
pub(crate) use wait_queue::WaitQueue;

use crate::{
    config,
    error::{Error, Result},
    thread::{self, Builder, ThreadHandle, ThreadNode},
    time::timer::DeadlineQueue,
    types::Uint,
};
use green_arch as arch;
use log::trace;
use spin::Mutex as SpinLock;
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, LinkedList},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::{Duration, Instant},
};

thread_local! {
    // The green thread currently executing on this OS thread, if any.
    static CURRENT: RefCell<Option<ThreadNode>> = const { RefCell::new(None) };
    // Saved scheduler context every suspension on this OS thread
    // switches back into.
    static SCHEDULER_SP: Cell<usize> = const { Cell::new(0) };
}

/// Drives green threads to completion on the OS thread that calls
/// [`run`](Scheduler::run).
pub struct Scheduler {
    ready: SpinLock<LinkedList<ThreadNode>>,
    live: SpinLock<HashMap<u64, ThreadNode>>,
    timers: SpinLock<DeadlineQueue>,
    running: AtomicBool,
    stop_requested: AtomicBool,
}

impl Scheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ready: SpinLock::new(LinkedList::new()),
            live: SpinLock::new(HashMap::new()),
            timers: SpinLock::new(DeadlineQueue::new()),
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
        })
    }

    /// Process-wide convenience instance. The scheduler is an ordinary
    /// object; this is sugar for programs that only ever want one.
    pub fn global() -> &'static Arc<Self> {
        static GLOBAL: OnceLock<Arc<Scheduler>> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Create a green thread around `f` and place it on the ready tail.
    /// Callable from anywhere, including outside any green thread.
    pub fn spawn<F>(self: &Arc<Self>, f: F) -> Result<ThreadHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        Builder::new().spawn(self, f)
    }

    /// First transition of a freshly built thread. Returns false when the
    /// thread already left CREATED, which makes repeated starts no-ops.
    pub(crate) fn start_thread(&self, t: &ThreadNode) -> bool {
        if !t.transfer_state(thread::CREATED, thread::READY) {
            return false;
        }
        self.live.lock().insert(t.tid(), t.clone());
        self.ready.lock().push_back(t.clone());
        trace!("thread 0x{:x} started", t.tid());
        true
    }

    /// Move `t` from `old_state` to READY and append it to the ready
    /// tail. The epoch bump voids any deadline armed for the parking
    /// episode that just ended.
    pub(crate) fn queue_ready_thread(&self, old_state: Uint, t: ThreadNode) -> bool {
        if !t.transfer_state(old_state, thread::READY) {
            return false;
        }
        t.bump_park_epoch();
        self.ready.lock().push_back(t);
        true
    }

    pub(crate) fn arm_deadline(&self, deadline: Instant, t: &ThreadNode, epoch: usize) {
        self.timers.lock().arm(deadline, Arc::downgrade(t), epoch);
    }

    fn expire_timers(&self) {
        let now = Instant::now();
        loop {
            let Some(entry) = self.timers.lock().pop_due(now) else {
                break;
            };
            let Some(t) = entry.thread.upgrade() else {
                continue;
            };
            if t.park_epoch() != entry.epoch {
                continue;
            }
            if self.queue_ready_thread(thread::SUSPENDED, t.clone()) {
                // The thread cannot run before the loop switches to it,
                // so flagging after the transition is race-free.
                t.set_timed_out();
                trace!("thread 0x{:x} readied by deadline", t.tid());
            }
        }
    }

    fn idle_wait(&self) {
        let now = Instant::now();
        let nap = match self.timers.lock().next_deadline() {
            Some(deadline) if deadline <= now => return,
            Some(deadline) => (deadline - now).min(config::IDLE_WAIT),
            None => config::IDLE_WAIT,
        };
        std::thread::sleep(nap);
    }

    /// Run until the ready queue and the live set are both empty.
    /// Converts the calling OS thread into the scheduler context;
    /// re-entry, including from inside a green thread, is a no-op.
    pub fn run(&self) {
        if current_thread().is_some() {
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        trace!("scheduler enters its loop");
        loop {
            if self.stop_requested.load(Ordering::SeqCst) {
                break;
            }
            self.expire_timers();
            let Some(t) = self.ready.lock().pop_front() else {
                if self.live.lock().is_empty() {
                    break;
                }
                self.idle_wait();
                continue;
            };
            let ok = t.transfer_state(thread::READY, thread::RUNNING);
            debug_assert!(ok);
            trace!(
                "switching to thread 0x{:x} (saved stack usage: {})",
                t.tid(),
                t.saved_stack_usage()
            );
            CURRENT.with(|c| *c.borrow_mut() = Some(t.clone()));
            unsafe {
                arch::switch_context(SCHEDULER_SP.with(|c| c.as_ptr()), t.saved_sp());
            }
            CURRENT.with(|c| c.borrow_mut().take());
            match t.state() {
                thread::FINISHED => {
                    // The switch out has completed; dropping the node is
                    // what finally frees the stack.
                    self.live.lock().remove(&t.tid());
                    trace!("thread 0x{:x} reaped", t.tid());
                }
                // Whoever moved the thread to READY also enqueued it: the
                // thread itself on yield, a waker otherwise. Re-pushing
                // here would double-queue a thread that was notified in
                // the window between suspending and switching out.
                thread::READY => {}
                thread::SUSPENDED => {}
                _ => unreachable!(
                    "thread 0x{:x} returned to the scheduler while {}",
                    t.tid(),
                    t.state_to_str()
                ),
            }
        }
        self.running.store(false, Ordering::SeqCst);
        trace!("scheduler loop exits");
    }

    /// Ask the loop to exit at its next iteration boundary. Parked
    /// threads are left parked; callers are responsible for liveness.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Handle to the green thread currently running on the calling OS
    /// thread.
    pub fn current(&self) -> Option<ThreadHandle> {
        current()
    }

    /// See [`yield_now`].
    pub fn yield_now(&self) -> Result<()> {
        yield_now()
    }

    /// See [`sleep_for`].
    pub fn sleep_for(&self, timeout: Duration) -> Result<()> {
        sleep_for(timeout)
    }
}

/// The green thread currently executing on the calling OS thread.
pub(crate) fn current_thread() -> Option<ThreadNode> {
    CURRENT.with(|c| c.borrow().clone())
}

pub(crate) fn current_thread_id() -> u64 {
    current_thread().map_or(0, |t| t.tid())
}

/// Handle to the currently running green thread, if the caller is one.
pub fn current() -> Option<ThreadHandle> {
    current_thread().map(|t| ThreadHandle::new(&t))
}

// Switch from the running green thread back into the scheduler context
// of this OS thread. Returns when the scheduler next resumes the caller.
fn switch_to_scheduler(t: &ThreadNode) {
    let to = SCHEDULER_SP.with(|c| c.get());
    debug_assert_ne!(to, 0);
    unsafe { arch::switch_context(t.saved_sp_ptr(), to) };
}

/// Give up the processor and rejoin the ready tail. Returns once the
/// scheduler next picks the caller.
pub fn yield_now() -> Result<()> {
    let t = current_thread().ok_or(Error::NotInGreenThread)?;
    let sched = t.owner().ok_or(Error::InvalidState)?;
    debug_assert!(t.validate_sp());
    let ok = sched.queue_ready_thread(thread::RUNNING, t.clone());
    debug_assert!(ok);
    switch_to_scheduler(&t);
    Ok(())
}

/// Park the calling green thread for at least `timeout`.
pub fn sleep_for(timeout: Duration) -> Result<()> {
    let t = current_thread().ok_or(Error::NotInGreenThread)?;
    if timeout.is_zero() {
        return yield_now();
    }
    let epoch = t.begin_timed_park();
    let ok = t.transfer_state(thread::RUNNING, thread::SUSPENDED);
    debug_assert!(ok);
    park_current_timed(&t, epoch, timeout);
    Ok(())
}

/// Park the current thread whose suspension the caller already made
/// visible (state SUSPENDED, wait-queue entry in place, locks dropped).
pub(crate) fn park_current(t: &ThreadNode) {
    switch_to_scheduler(t);
}

/// As [`park_current`], with a wake-up armed for `timeout` against the
/// pre-captured parking episode. True when the deadline, not a notifier,
/// ended the park.
pub(crate) fn park_current_timed(t: &ThreadNode, epoch: usize, timeout: Duration) -> bool {
    if let (Some(sched), Some(deadline)) = (t.owner(), Instant::now().checked_add(timeout)) {
        sched.arm_deadline(deadline, t, epoch);
    }
    switch_to_scheduler(t);
    t.timed_out()
}

/// Terminal switch out of a finishing thread; invoked by the entry
/// trampoline only. Strong references must not be left on the dying
/// stack, so the node is dropped before the switch.
pub(crate) fn retire_me() -> ! {
    let t = current_thread().expect("retiring outside any green thread");
    let ok = t.transfer_state(thread::RUNNING, thread::FINISHED);
    debug_assert!(ok);
    trace!("thread 0x{:x} retiring", t.tid());
    let sp_ptr = t.saved_sp_ptr();
    let to = SCHEDULER_SP.with(|c| c.get());
    // CURRENT still pins the thread until the scheduler takes it.
    drop(t);
    unsafe { arch::switch_context(sp_ptr, to) };
    unreachable!("finished thread was resumed")
}
