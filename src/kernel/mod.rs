/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * This module contains the kernel components:
 * - list.rs       (wait lists of blocked contexts)
 * - sched.rs      (interface to the scheduler)
 * - data_queue.rs (the data queue object)
 * - registry.rs   (table of live queues)
 */

//! Kernel Core
//!
//! - [`list`] - Wait list of blocked contexts, ordered by priority or arrival
//! - [`sched`] - What a kernel object needs from the scheduler
//! - [`data_queue`] - Bounded blocking data queue
//! - [`registry`] - Live-queue registry for introspection

pub mod data_queue;
pub mod list;
pub mod registry;
pub mod sched;
