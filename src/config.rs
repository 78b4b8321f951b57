/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 */

//! Kernel Configuration
//!
//! Build-time configuration for the data queue kernel object.
//! Configuration is done via:
//! - Cargo features for major toggles (`std` selects the host port)
//! - Constants in this module for numeric values
//!
//! Every queue operation (create, delete, flush, abort, peek) is always
//! compiled in; what they accept is decided at run time by their options.

use crate::types::Tick;

// =============================================================================
// Scheduler Configuration
// =============================================================================

/// Tick rate in Hz
pub const TICK_RATE_HZ: Tick = 1000;

/// Number of priority levels an execution context may use
pub const MAX_PRIORITIES: u8 = 32;

// =============================================================================
// Data Queue Configuration
// =============================================================================

/// Default number of execution contexts that may block on one queue at the
/// same time. Each queue may override it through its const parameter.
pub const MAX_WAITERS: usize = 8;

/// Name stored in a queue after it has been deleted.
pub const DELETED_NAME: &str = "?DATA";

// =============================================================================
// Registry Configuration
// =============================================================================

/// Number of live queues the registry can track for introspection.
pub const REGISTRY_SIZE: usize = 16;

// =============================================================================
// Debug / Assert
// =============================================================================

/// Controls whether internal invariant asserts are active.
pub const ASSERT_DEFINED: bool = true;

/// Assert an internal kernel invariant (configASSERT equivalent).
#[inline(always)]
pub fn config_assert(condition: bool) {
    if ASSERT_DEFINED {
        debug_assert!(condition, "kernel assertion failed");
    }
}
