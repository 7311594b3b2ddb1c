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
    error::{Error, Result},
};

/// Heap-backed stack for one green thread. Freed only when the owning
/// thread is reaped, never while its context may still be live.
#[derive(Debug)]
pub(crate) struct Stack {
    buf: Box<[u8]>,
}

impl Stack {
    pub(crate) fn with_size(size: usize) -> Result<Self> {
        if size < config::MIN_STACK_SIZE {
            return Err(Error::ResourceExhausted);
        }
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| Error::ResourceExhausted)?;
        buf.resize(size, 0u8);
        Ok(Self {
            buf: buf.into_boxed_slice(),
        })
    }

    pub(crate) fn base(&self) -> usize {
        self.buf.as_ptr() as usize
    }

    pub(crate) fn size(&self) -> usize {
        self.buf.len()
    }

    /// Highest 16-byte-aligned address inside the buffer; the stack grows
    /// down from here.
    pub(crate) fn top(&self) -> usize {
        (self.base() + self.size()) & !15
    }
}
