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

//! Cooperative green threads multiplexed onto one OS thread.
//!
//! A [`Scheduler`] owns a FIFO ready queue and drives spawned threads to
//! completion on whichever OS thread calls [`Scheduler::run`]. Threads
//! run until they yield, park on a [`Mutex`] or [`Condvar`], or return
//! from their entry closure; every one of those paths is a stackful
//! context switch back into the scheduler, which then picks the next
//! ready thread. Nothing is ever preempted.
//!
//! ```
//! use green_rt::Scheduler;
//!
//! let sched = Scheduler::new();
//! sched
//!     .spawn(|| {
//!         green_rt::scheduler::yield_now().unwrap();
//!     })
//!     .unwrap();
//! sched.run();
//! ```

pub mod config;
pub mod error;
pub mod scheduler;
mod stack;
pub mod sync;
pub mod thread;
mod time;
mod types;

pub use error::{Error, Result};
pub use scheduler::Scheduler;
pub use sync::{Condvar, Mutex};
pub use thread::{spawn, Builder, ThreadHandle};
