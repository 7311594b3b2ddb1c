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
    config,
    error::Result,
    scheduler::{self, Scheduler},
    stack::Stack,
    types::{AtomicUint, Uint},
};
use green_arch as arch;
use std::{
    cell::UnsafeCell,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Weak,
    },
};

pub type ThreadNode = Arc<Thread>;

pub(crate) const CREATED: Uint = 0;
pub(crate) const READY: Uint = 1;
pub(crate) const RUNNING: Uint = 2;
pub(crate) const SUSPENDED: Uint = 3;
pub(crate) const FINISHED: Uint = 4;

/// A green thread: one entry closure, one stack, one saved context.
///
/// The owning scheduler's live set holds the only long-lived strong
/// references. Wait queues, deadline entries and application handles all
/// hold weak ones and must tolerate the thread being gone.
pub struct Thread {
    tid: u64,
    stack: Stack,
    // Written through by the switch routine when this thread suspends and
    // read when it is resumed. Only the scheduler's OS thread touches it,
    // and never while the context it points at is executing.
    saved_sp: UnsafeCell<usize>,
    state: AtomicUint,
    // Bumped every time the thread is made ready; a deadline armed for an
    // older parking episode is void.
    park_epoch: AtomicUsize,
    timed_out: AtomicBool,
    scheduler: Weak<Scheduler>,
}

unsafe impl Sync for Thread {}

fn next_tid() -> u64 {
    static TID: AtomicU64 = AtomicU64::new(0);
    TID.fetch_add(1, Ordering::SeqCst)
}

// First function entered on a fresh context. The raw box carries the
// entry closure; control must leave through `retire_me`, never by
// returning, since there is no caller frame underneath.
extern "C" fn run_closure(raw: *mut Box<dyn FnOnce() + Send>) -> ! {
    let f = unsafe { Box::from_raw(raw) };
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || f())) {
        let msg = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("opaque panic payload");
        log::error!(
            "green thread 0x{:x} panicked: {}",
            scheduler::current_thread_id(),
            msg
        );
    }
    scheduler::retire_me()
}

impl Thread {
    // FIXME: reclaim the boxed entry if the thread is dropped before its
    // first resume.
    pub(crate) fn new(
        scheduler: &Arc<Scheduler>,
        entry: Box<dyn FnOnce() + Send>,
        stack_size: usize,
    ) -> Result<ThreadNode> {
        let stack = Stack::with_size(stack_size)?;
        let sp = stack.top() - core::mem::size_of::<arch::Context>();
        let raw = Box::into_raw(Box::new(entry));
        let ctx = unsafe { &mut *(sp as *mut arch::Context) };
        ctx.init();
        ctx.set_return_address(run_closure as usize)
            .set_arg(raw as usize);
        Ok(Arc::new(Self {
            tid: next_tid(),
            stack,
            saved_sp: UnsafeCell::new(sp),
            state: AtomicUint::new(CREATED),
            park_epoch: AtomicUsize::new(0),
            timed_out: AtomicBool::new(false),
            scheduler: Arc::downgrade(scheduler),
        }))
    }

    #[inline]
    pub(crate) fn tid(&self) -> u64 {
        self.tid
    }

    #[inline]
    pub(crate) fn state(&self) -> Uint {
        self.state.load(Ordering::Relaxed)
    }

    pub(crate) fn state_to_str(&self) -> &'static str {
        match self.state() {
            CREATED => "created",
            READY => "ready",
            RUNNING => "running",
            SUSPENDED => "suspended",
            FINISHED => "finished",
            _ => "unknown",
        }
    }

    #[inline]
    pub(crate) fn transfer_state(&self, from: Uint, to: Uint) -> bool {
        self.state
            .compare_exchange(from, to, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    pub(crate) fn is_finished(&self) -> bool {
        self.state() == FINISHED
    }

    #[inline]
    pub(crate) fn saved_sp(&self) -> usize {
        unsafe { *self.saved_sp.get() }
    }

    #[inline]
    pub(crate) fn saved_sp_ptr(&self) -> *mut usize {
        self.saved_sp.get()
    }

    #[inline]
    pub(crate) fn owner(&self) -> Option<Arc<Scheduler>> {
        self.scheduler.upgrade()
    }

    #[inline]
    pub(crate) fn park_epoch(&self) -> usize {
        self.park_epoch.load(Ordering::SeqCst)
    }

    #[inline]
    pub(crate) fn bump_park_epoch(&self) {
        self.park_epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Clear the timeout flag and pin the parking episode a deadline may
    /// be armed for. Called while still running, before the suspension
    /// becomes visible to wakers.
    #[inline]
    pub(crate) fn begin_timed_park(&self) -> usize {
        self.timed_out.store(false, Ordering::SeqCst);
        self.park_epoch()
    }

    #[inline]
    pub(crate) fn set_timed_out(&self) {
        self.timed_out.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub(crate) fn timed_out(&self) -> bool {
        self.timed_out.load(Ordering::SeqCst)
    }

    #[inline]
    pub(crate) fn saved_stack_usage(&self) -> usize {
        self.stack.top() - self.saved_sp()
    }

    /// Whether the live stack pointer of the calling OS thread lies
    /// inside this thread's stack.
    #[inline]
    pub(crate) fn validate_sp(&self) -> bool {
        let sp = arch::current_sp();
        sp >= self.stack.base() && sp <= self.stack.base() + self.stack.size()
    }
}

/// Application-facing weak handle to a spawned thread.
#[derive(Clone, Debug)]
pub struct ThreadHandle {
    tid: u64,
    node: Weak<Thread>,
}

impl ThreadHandle {
    pub(crate) fn new(node: &ThreadNode) -> Self {
        Self {
            tid: node.tid(),
            node: Arc::downgrade(node),
        }
    }

    /// Unique id, strictly increasing in spawn order.
    pub fn id(&self) -> u64 {
        self.tid
    }

    /// True once the entry closure has returned or unwound. A thread the
    /// scheduler has already reaped also reports finished.
    pub fn is_finished(&self) -> bool {
        self.node.upgrade().map_or(true, |t| t.is_finished())
    }
}

/// Configures a green thread prior to spawning it.
pub struct Builder {
    stack_size: usize,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            stack_size: config::DEFAULT_STACK_SIZE,
        }
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    /// Build the thread on `scheduler`, register it live and enqueue it
    /// ready.
    pub fn spawn<F>(self, scheduler: &Arc<Scheduler>, f: F) -> Result<ThreadHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let t = Thread::new(scheduler, Box::new(f), self.stack_size)?;
        let handle = ThreadHandle::new(&t);
        let ok = scheduler.start_thread(&t);
        debug_assert!(ok);
        Ok(handle)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn onto the process-wide scheduler. Sugar over
/// [`Scheduler::spawn`].
pub fn spawn<F>(f: F) -> Result<ThreadHandle>
where
    F: FnOnce() + Send + 'static,
{
    Scheduler::global().spawn(f)
}
