/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * The port layer supplies what the kernel objects need from the platform:
 * - Critical sections (interrupt masking)
 * - A scheduler to block and wake execution contexts
 *
 * Select the host port with the `std` feature.
 */

//! Port Layer
//!
//! Critical sections come from the `critical-section` crate. On a target the
//! board or HAL crate links an implementation (for example the single-core
//! one from `cortex-m`); the `std` feature links the crate's global-lock
//! implementation instead.
//!
//! ## Available Ports
//!
//! - `std` - [`HostKernel`], one OS thread per execution context, and a
//!   stderr [`console`] logger for the kernel trace hooks

#[cfg(feature = "std")]
pub mod console;
#[cfg(feature = "std")]
mod host;

#[cfg(feature = "std")]
pub use host::*;
