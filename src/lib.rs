/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of
 * this software and associated documentation files (the "Software"), to deal in
 * the Software without restriction, including without limitation the rights to
 * use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
 * the Software, and to permit persons to whom the Software is furnished to do so,
 * subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
 * FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
 * COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
 * IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
 * CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 *
 * https://www.FreeRTOS.org
 * https://github.com/FreeRTOS
 */

//! # rtos-data-queue
//!
//! A bounded, blocking data queue kernel object for small real-time kernels.
//! Fixed-size items are copied through caller supplied storage; execution
//! contexts that pend on an empty queue block, ordered by priority or by
//! arrival, until a post hands them an item, their timeout expires, the
//! wait is aborted or the queue is deleted.
//!
//! The queue does not own a scheduler. It talks to one through
//! [`kernel::sched::Scheduler`] and protects its state with the
//! `critical-section` crate.
//!
//! ## Features
//!
//! - `std` - Host port ([`port::HostKernel`]), the stderr logger
//!   ([`port::console`]) and the std critical section

#![no_std]

#[cfg(feature = "std")]
extern crate std;

// Core modules
pub mod config;
pub mod error;
pub mod trace;
pub mod types;

// Port layer
pub mod port;

// Kernel modules
pub mod kernel;

// Safe wrappers
pub mod sync;

pub use error::{Error, ErrorKind, Result};
pub use kernel::data_queue::{
    AbortScope, DataQueue, DeletePolicy, PendMode, PostFlags, PostMode, QueueState,
};
pub use kernel::list::WaitPolicy;
pub use kernel::sched::{Disposition, Scheduler, WaitClass, Wake};
pub use types::*;
