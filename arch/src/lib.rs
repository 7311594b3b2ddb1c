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

//! Stackful context switching.
//!
//! This crate is the only place allowed to touch raw stack memory or CPU
//! register state. It exposes a per-target [`Context`] — the callee-saved
//! frame a suspended execution leaves at the top of its own stack — and
//! [`switch_context`], which saves the caller's frame, publishes the
//! resulting stack pointer, adopts the target stack pointer and resumes
//! whatever execution last suspended there. A fresh stack is entered by
//! seeding a zeroed `Context` whose return address is the runtime's entry
//! trampoline; switching a context to itself saves and restores the same
//! frame and is therefore a no-op.

#![no_std]

cfg_if::cfg_if! {
    // The x86_64 routine speaks the System V calling convention; the
    // Windows x64 ABI passes arguments in different registers.
    if #[cfg(all(target_arch = "x86_64", not(target_os = "windows")))] {
        mod x86_64;
        pub use crate::x86_64::*;
    } else if #[cfg(target_arch = "aarch64")] {
        mod aarch64;
        pub use crate::aarch64::*;
    } else {
        compile_error!("unsupported target, expected x86_64 (System V) or aarch64");
    }
}
