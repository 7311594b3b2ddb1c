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

use core::time::Duration;

/// Stack handed to a green thread unless its builder says otherwise.
pub const DEFAULT_STACK_SIZE: usize = 64 << 10;

// A stack must hold the seeded context frame plus enough room to run the
// entry's prologue before the first switch out.
pub const MIN_STACK_SIZE: usize = 4 << 10;

/// Upper bound on one idle nap while the ready queue is empty but live
/// threads remain parked.
pub(crate) const IDLE_WAIT: Duration = Duration::from_millis(1);
