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

/// Failure kinds surfaced by the runtime's public operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A stack or bookkeeping allocation failed, or the requested stack
    /// is too small to hold a context.
    ResourceExhausted,
    /// The target is in a lifecycle state that cannot serve the
    /// operation, e.g. releasing a mutex nobody holds or re-locking a
    /// mutex the caller already owns.
    InvalidState,
    /// A suspending operation was called outside any green thread.
    NotInGreenThread,
    /// A mutex was released by a thread that does not own it.
    NotOwner,
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub fn name(&self) -> &'static str {
        match self {
            Error::ResourceExhausted => "resource exhausted",
            Error::InvalidState => "invalid state",
            Error::NotInGreenThread => "not in a green thread",
            Error::NotOwner => "not the owner",
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::error::Error for Error {}
