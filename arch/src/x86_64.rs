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

//! x86_64 System V context frame and switch routine.

use core::arch::naked_asm;

/// Callee-saved frame as [`switch_context`] lays it out on the suspended
/// stack, lowest address first. `arg0` doubles as the first argument
/// register so a seeded frame can hand its payload to the entry
/// trampoline.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Context {
    arg0: usize, // rdi
    r15: usize,
    r14: usize,
    r13: usize,
    r12: usize,
    rbx: usize,
    rbp: usize,
    ra: usize,
    // The ABI expects rsp + 8 to be 16-byte aligned on entry; this slot
    // provides the 8 and doubles as the terminal (null) return address.
    frame: usize,
}

impl Context {
    pub const fn new() -> Self {
        Self {
            arg0: 0,
            r15: 0,
            r14: 0,
            r13: 0,
            r12: 0,
            rbx: 0,
            rbp: 0,
            ra: 0,
            frame: 0,
        }
    }

    pub fn init(&mut self) -> &mut Self {
        *self = Self::new();
        self
    }

    /// Where the first switch into this frame resumes.
    pub fn set_return_address(&mut self, ra: usize) -> &mut Self {
        self.ra = ra;
        self
    }

    /// First-argument register seen by the resume point.
    pub fn set_arg(&mut self, arg: usize) -> &mut Self {
        self.arg0 = arg;
        self
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Save the caller's callee-saved state on its own stack, store the
/// resulting stack pointer through `from_sp`, adopt `to_sp` and return
/// into the frame found there.
///
/// # Safety
///
/// `from_sp` must stay valid until the saved execution is resumed, and
/// `to_sp` must carry a frame produced by this routine or seeded via
/// [`Context`] on a live stack.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_context(from_sp: *mut usize, to_sp: usize) {
    naked_asm!(
        "push rbp",
        "push rbx",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "push rdi",
        "mov [rdi], rsp",
        "mov rsp, rsi",
        "pop rdi",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbx",
        "pop rbp",
        "ret",
    )
}

#[inline(always)]
pub fn current_sp() -> usize {
    let sp: usize;
    unsafe {
        core::arch::asm!("mov {}, rsp", out(reg) sp, options(nomem, nostack, preserves_flags));
    }
    sp
}
