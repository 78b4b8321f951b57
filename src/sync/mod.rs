/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * Safe wrappers over the byte-oriented kernel objects.
 */

//! Safe wrappers over the kernel objects
//!
//! The kernel API moves raw bytes; these wrappers fix the item type at
//! compile time.
//!
//! # Example
//!
//! ```ignore
//! use rtos_data_queue::sync::TypedDataQueue;
//!
//! let q = TypedDataQueue::<u32, _>::new(&kernel, "ticks");
//! q.create(&mut slots, WaitPolicy::Priority)?;
//! q.try_send(&42)?;
//! assert_eq!(q.receive()?, 42);
//! ```

mod data_queue;

pub use data_queue::TypedDataQueue;
