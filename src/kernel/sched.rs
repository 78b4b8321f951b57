/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 */

//! Scheduler Interface
//!
//! Kernel objects do not own execution contexts; they ask the scheduler to
//! block and wake them. This module is the whole contract between the two:
//!
//! - [`Scheduler::suspend`] blocks the calling context until it is resumed or
//!   its timeout expires
//! - [`Scheduler::resume`] readies a blocked context and tells it why
//! - [`Scheduler::run_scheduler`] yields to the highest priority ready context
//!
//! plus the context queries every kernel call validates against (interrupt
//! nesting, timer task, scheduler lock, safety-critical lockdown).

use crate::types::*;

// =============================================================================
// Wake protocol
// =============================================================================

/// Reason a waiter was taken off a wait list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// A producer handed the data over directly.
    Success,
    /// The wait bound expired first.
    Timeout,
    /// The wait was aborted on purpose.
    Aborted,
    /// The object waited on was deleted.
    Deleted,
}

/// Kind of object a context is suspended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitClass {
    /// Pending on a data queue.
    Data,
}

/// How [`Scheduler::suspend`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Someone called [`Scheduler::resume`] for this context. The wake may be
    /// stale, so the caller re-checks its wait list entry.
    Resumed,
    /// The timeout handed to `suspend` elapsed.
    TimedOut,
}

// =============================================================================
// Scheduler trait
// =============================================================================

/// Services a kernel object consumes from the scheduler.
///
/// Implementations must tolerate `resume` arriving before the matching
/// `suspend` (the waiter is published on the wait list before it blocks) and
/// must never be called with a critical section held.
pub trait Scheduler {
    /// Context executing the call.
    fn current_context(&self) -> ContextId;

    /// Priority of `context`, used to order priority wait lists.
    fn context_priority(&self, context: ContextId) -> Priority;

    /// Block `context` (the caller) until resumed or until `timeout` elapses.
    fn suspend(&self, context: ContextId, class: WaitClass, timeout: Timeout) -> Wake;

    /// Make `context` ready again, carrying why it was woken.
    fn resume(&self, context: ContextId, disposition: Disposition);

    /// Switch to the highest priority ready context if it is not the caller.
    fn run_scheduler(&self);

    /// `true` once the kernel has been started.
    fn is_kernel_running(&self) -> bool;

    /// `true` while executing an interrupt handler.
    fn in_interrupt_context(&self) -> bool;

    /// Current tick count, used to track deadlines across spurious wakes.
    fn tick_count(&self) -> Tick;

    /// `true` while executing a software timer callback.
    fn in_timer_context(&self) -> bool {
        false
    }

    /// `true` while the scheduler is locked by the caller.
    fn is_scheduler_locked(&self) -> bool {
        false
    }

    /// `true` once the application has entered its safety-critical phase,
    /// after which kernel objects may no longer be created or deleted.
    fn is_safety_critical_started(&self) -> bool {
        false
    }
}

impl<S: Scheduler + ?Sized> Scheduler for &S {
    fn current_context(&self) -> ContextId {
        (**self).current_context()
    }

    fn context_priority(&self, context: ContextId) -> Priority {
        (**self).context_priority(context)
    }

    fn suspend(&self, context: ContextId, class: WaitClass, timeout: Timeout) -> Wake {
        (**self).suspend(context, class, timeout)
    }

    fn resume(&self, context: ContextId, disposition: Disposition) {
        (**self).resume(context, disposition)
    }

    fn run_scheduler(&self) {
        (**self).run_scheduler()
    }

    fn is_kernel_running(&self) -> bool {
        (**self).is_kernel_running()
    }

    fn in_interrupt_context(&self) -> bool {
        (**self).in_interrupt_context()
    }

    fn tick_count(&self) -> Tick {
        (**self).tick_count()
    }

    fn in_timer_context(&self) -> bool {
        (**self).in_timer_context()
    }

    fn is_scheduler_locked(&self) -> bool {
        (**self).is_scheduler_locked()
    }

    fn is_safety_critical_started(&self) -> bool {
        (**self).is_safety_critical_started()
    }
}
