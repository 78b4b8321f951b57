/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 */

//! Base Types
//!
//! This module defines the fundamental types shared by the kernel objects
//! and the port layer:
//! - [`Tick`] - scheduler time unit
//! - [`Priority`] - execution context priority (higher value is more urgent)
//! - [`ContextId`] - opaque handle of an execution context
//! - [`QueueId`] - process-unique id of a created data queue
//! - [`Timeout`] - relative wait bound used by blocking pends

use core::fmt;

// =============================================================================
// Tick type
// =============================================================================

/// Tick counter type.
pub type Tick = u32;

/// Convert milliseconds to ticks.
#[inline(always)]
pub const fn ms_to_ticks(ms: Tick) -> Tick {
    ((ms as u64 * crate::config::TICK_RATE_HZ as u64) / 1000u64) as Tick
}

/// Convert ticks to milliseconds.
#[inline(always)]
pub const fn ticks_to_ms(ticks: Tick) -> Tick {
    ((ticks as u64 * 1000u64) / crate::config::TICK_RATE_HZ as u64) as Tick
}

// =============================================================================
// Timeout
// =============================================================================

/// Relative wait bound for a blocking pend.
///
/// A raw value of zero means "wait forever", matching the kernel's pend
/// convention; any other value is a bound in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Wait until woken, however long that takes.
    Forever,
    /// Wait at most this many ticks (always non-zero).
    Ticks(Tick),
}

impl Timeout {
    /// Build a timeout from the raw tick convention (0 = forever).
    pub const fn from_ticks(ticks: Tick) -> Self {
        if ticks == 0 {
            Timeout::Forever
        } else {
            Timeout::Ticks(ticks)
        }
    }

    /// Raw tick value (0 = forever).
    pub const fn as_ticks(self) -> Tick {
        match self {
            Timeout::Forever => 0,
            Timeout::Ticks(t) => t,
        }
    }

    /// Ticks left of this bound after `elapsed` ticks, `None` once expired.
    pub fn remaining(self, elapsed: Tick) -> Option<Timeout> {
        match self {
            Timeout::Forever => Some(Timeout::Forever),
            Timeout::Ticks(t) if elapsed < t => Some(Timeout::Ticks(t - elapsed)),
            Timeout::Ticks(_) => None,
        }
    }
}

impl From<Tick> for Timeout {
    fn from(ticks: Tick) -> Self {
        Timeout::from_ticks(ticks)
    }
}

// =============================================================================
// Priority
// =============================================================================

/// Priority of an execution context. 0 is the lowest priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(pub u8);

impl Priority {
    /// Idle priority (always lowest).
    pub const IDLE: Priority = Priority(0);

    pub const fn new(value: u8) -> Self {
        Priority(value)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for Priority {
    fn from(value: u8) -> Self {
        Priority(value)
    }
}

// =============================================================================
// Handles
// =============================================================================

/// Opaque handle of an execution context, assigned by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u32);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Process-unique id of a created data queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(pub u32);

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dq#{}", self.0)
    }
}
