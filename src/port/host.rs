/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * This is the host port.  Every execution context is an OS thread, blocking
 * is a condition variable wait and the tick is the number of milliseconds
 * since the kernel was created.  Interrupt and timer-callback contexts are
 * simulated by guards that mark the calling thread.
 */

//! Host Port Implementation
//!
//! [`HostKernel`] implements [`Scheduler`] for tests and demos running on a
//! desktop OS.
//!
//! ```ignore
//! let kernel = HostKernel::new();
//! kernel.start();
//! std::thread::scope(|s| {
//!     kernel.spawn(s, Priority(3), || queue.pend(&mut buf, Timeout::Forever, PendMode::Blocking));
//! });
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{LocalKey, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};

use crate::config::{config_assert, MAX_PRIORITIES};
use crate::kernel::sched::{Disposition, Scheduler, WaitClass, Wake};
use crate::types::*;

/// Priority given to threads that call into the kernel without being adopted.
pub const DEFAULT_PRIORITY: Priority = Priority(1);

static KERNEL_SERIAL: AtomicU32 = AtomicU32::new(0);

// =============================================================================
// Per-context state
// =============================================================================

struct Context {
    kernel: u32,
    id: ContextId,
    priority: Priority,
    wake: Mutex<Option<Disposition>>,
    signal: Condvar,
}

std::thread_local! {
    static CURRENT: RefCell<Option<Arc<Context>>> = const { RefCell::new(None) };
    static ISR_NESTING: Cell<u32> = const { Cell::new(0) };
    static TIMER_NESTING: Cell<u32> = const { Cell::new(0) };
    static SCHED_LOCK_NESTING: Cell<u32> = const { Cell::new(0) };
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the calling thread as running in a special context until dropped.
///
/// Returned by [`HostKernel::enter_isr`], [`HostKernel::enter_timer`] and
/// [`HostKernel::lock_scheduler`]. Guards nest.
#[must_use = "the context ends when the guard is dropped"]
pub struct NestingGuard {
    counter: &'static LocalKey<Cell<u32>>,
    _not_send: PhantomData<*const ()>,
}

impl NestingGuard {
    fn enter(counter: &'static LocalKey<Cell<u32>>) -> Self {
        counter.with(|n| n.set(n.get() + 1));
        NestingGuard {
            counter,
            _not_send: PhantomData,
        }
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        self.counter.with(|n| n.set(n.get().saturating_sub(1)));
    }
}

fn nested(counter: &'static LocalKey<Cell<u32>>) -> bool {
    counter.with(|n| n.get() > 0)
}

/// Ends the calling thread's context when dropped, before the scope that
/// spawned it can observe the thread as finished.
struct ContextExit;

impl Drop for ContextExit {
    fn drop(&mut self) {
        let _ = CURRENT.try_with(|c| c.borrow_mut().take());
    }
}

// =============================================================================
// HostKernel
// =============================================================================

/// Thread-per-context scheduler for the host.
pub struct HostKernel {
    serial: u32,
    epoch: Instant,
    running: AtomicBool,
    lockdown: AtomicBool,
    next_context: AtomicU32,
    /// The owning thread holds the strong reference; entries die with it.
    contexts: Mutex<HashMap<ContextId, Weak<Context>>>,
}

impl Default for HostKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl HostKernel {
    /// A stopped kernel; tick zero is now.
    pub fn new() -> Self {
        HostKernel {
            serial: KERNEL_SERIAL.fetch_add(1, Ordering::Relaxed),
            epoch: Instant::now(),
            running: AtomicBool::new(false),
            lockdown: AtomicBool::new(false),
            next_context: AtomicU32::new(1),
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Start the kernel. Most queue calls fail with `OsNotRunning` before.
    pub fn start(&self) {
        self.running.store(true, Ordering::Release);
        log::debug!("host kernel {} started", self.serial);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Enter the safety-critical phase; objects can no longer be created or
    /// deleted. There is no way back.
    pub fn enter_safety_critical(&self) {
        self.lockdown.store(true, Ordering::Release);
    }

    /// Register the calling thread as an execution context of this kernel.
    pub fn adopt_current(&self, priority: Priority) -> ContextId {
        config_assert(priority.get() < MAX_PRIORITIES);
        let context = Arc::new(Context {
            kernel: self.serial,
            id: ContextId(self.next_context.fetch_add(1, Ordering::Relaxed)),
            priority,
            wake: Mutex::new(None),
            signal: Condvar::new(),
        });
        let id = context.id;
        {
            let mut contexts = lock(&self.contexts);
            contexts.retain(|_, cx| cx.strong_count() > 0);
            contexts.insert(id, Arc::downgrade(&context));
        }
        CURRENT.with(|c| *c.borrow_mut() = Some(context));
        log::trace!("{id} adopted at priority {}", priority.get());
        id
    }

    /// Spawn a scoped thread that runs `f` as a context of this kernel.
    pub fn spawn<'scope, 'env, F, T>(
        &'env self,
        scope: &'scope Scope<'scope, 'env>,
        priority: Priority,
        f: F,
    ) -> ScopedJoinHandle<'scope, T>
    where
        F: FnOnce() -> T + Send + 'scope,
        T: Send + 'scope,
    {
        scope.spawn(move || {
            self.adopt_current(priority);
            let _context = ContextExit;
            f()
        })
    }

    /// Treat the calling thread as an interrupt handler until the guard drops.
    pub fn enter_isr(&self) -> NestingGuard {
        NestingGuard::enter(&ISR_NESTING)
    }

    /// Treat the calling thread as the timer task running a callback.
    pub fn enter_timer(&self) -> NestingGuard {
        NestingGuard::enter(&TIMER_NESTING)
    }

    /// Lock the scheduler for the calling thread.
    pub fn lock_scheduler(&self) -> NestingGuard {
        NestingGuard::enter(&SCHED_LOCK_NESTING)
    }

    fn lookup(&self, id: ContextId) -> Option<Arc<Context>> {
        lock(&self.contexts).get(&id).and_then(Weak::upgrade)
    }

    #[cfg(test)]
    fn live_contexts(&self) -> usize {
        lock(&self.contexts).values().filter(|cx| cx.strong_count() > 0).count()
    }

    fn current(&self) -> Option<ContextId> {
        CURRENT.with(|c| {
            c.borrow()
                .as_ref()
                .filter(|cx| cx.kernel == self.serial)
                .map(|cx| cx.id)
        })
    }
}

impl Scheduler for HostKernel {
    fn current_context(&self) -> ContextId {
        match self.current() {
            Some(id) => id,
            None => self.adopt_current(DEFAULT_PRIORITY),
        }
    }

    fn context_priority(&self, context: ContextId) -> Priority {
        self.lookup(context).map_or(Priority::IDLE, |cx| cx.priority)
    }

    fn suspend(&self, context: ContextId, _class: WaitClass, timeout: Timeout) -> Wake {
        let Some(cx) = self.lookup(context) else {
            return Wake::Resumed;
        };
        let mut wake = lock(&cx.wake);
        match timeout {
            Timeout::Forever => {
                while wake.is_none() {
                    wake = cx.signal.wait(wake).unwrap_or_else(PoisonError::into_inner);
                }
            }
            Timeout::Ticks(ticks) => {
                let start = self.tick_count();
                while wake.is_none() {
                    let elapsed = self.tick_count().wrapping_sub(start);
                    if elapsed >= ticks {
                        return Wake::TimedOut;
                    }
                    let left = Duration::from_millis(u64::from(ticks_to_ms(ticks - elapsed)).max(1));
                    wake = cx
                        .signal
                        .wait_timeout(wake, left)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
        wake.take();
        Wake::Resumed
    }

    fn resume(&self, context: ContextId, disposition: Disposition) {
        if let Some(cx) = self.lookup(context) {
            *lock(&cx.wake) = Some(disposition);
            cx.signal.notify_one();
        }
    }

    fn run_scheduler(&self) {
        std::thread::yield_now();
    }

    fn is_kernel_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn in_interrupt_context(&self) -> bool {
        nested(&ISR_NESTING)
    }

    fn tick_count(&self) -> Tick {
        ms_to_ticks(self.epoch.elapsed().as_millis() as Tick)
    }

    fn in_timer_context(&self) -> bool {
        nested(&TIMER_NESTING)
    }

    fn is_scheduler_locked(&self) -> bool {
        nested(&SCHED_LOCK_NESTING)
    }

    fn is_safety_critical_started(&self) -> bool {
        self.lockdown.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn guards_nest_and_unwind() {
        let k = HostKernel::new();
        assert!(!k.in_interrupt_context());
        {
            let _outer = k.enter_isr();
            let _inner = k.enter_isr();
            assert!(k.in_interrupt_context());
        }
        assert!(!k.in_interrupt_context());
        let timer = k.enter_timer();
        assert!(k.in_timer_context() && !k.is_scheduler_locked());
        drop(timer);
        assert!(!k.in_timer_context());
    }

    #[test]
    fn unadopted_thread_gets_default_priority() {
        let k = HostKernel::new();
        let id = k.current_context();
        assert_eq!(k.current_context(), id);
        assert_eq!(k.context_priority(id), DEFAULT_PRIORITY);
    }

    #[test]
    fn contexts_are_per_kernel() {
        let a = HostKernel::new();
        let b = HostKernel::new();
        let in_a = a.adopt_current(Priority(4));
        let in_b = b.current_context();
        assert_eq!(a.context_priority(in_a), Priority(4));
        assert_eq!(b.context_priority(in_b), DEFAULT_PRIORITY);
        // adopting into `b` replaced this thread's context in `a`
        assert_eq!(a.current_context(), ContextId(in_a.0 + 1));
    }

    #[test]
    fn resume_before_suspend_is_not_lost() {
        let k = HostKernel::new();
        let me = k.current_context();
        k.resume(me, Disposition::Success);
        assert_eq!(k.suspend(me, WaitClass::Data, Timeout::Forever), Wake::Resumed);
    }

    #[test]
    fn suspend_times_out_after_the_bound() {
        let k = HostKernel::new();
        let me = k.current_context();
        let start = k.tick_count();
        assert_eq!(k.suspend(me, WaitClass::Data, Timeout::Ticks(20)), Wake::TimedOut);
        assert!(k.tick_count() - start >= 20);
    }

    #[test]
    fn exited_threads_leave_no_context_behind() {
        let k = HostKernel::new();
        thread::scope(|s| {
            for prio in 1..=4 {
                k.spawn(s, Priority(prio), || k.current_context());
            }
        });
        assert_eq!(k.live_contexts(), 0);
        // the next adoption prunes the dead entries
        let me = k.adopt_current(Priority(2));
        assert_eq!(lock(&k.contexts).len(), 1);
        assert_eq!(k.context_priority(me), Priority(2));
    }

    #[test]
    fn resume_wakes_a_blocked_thread() {
        let k = HostKernel::new();
        let (tx, rx) = std::sync::mpsc::channel();
        thread::scope(|s| {
            let waiter = k.spawn(s, Priority(2), || {
                let me = k.current_context();
                tx.send(me).unwrap();
                k.suspend(me, WaitClass::Data, Timeout::Forever)
            });
            let id = rx.recv().unwrap();
            k.resume(id, Disposition::Aborted);
            assert_eq!(waiter.join().unwrap(), Wake::Resumed);
        });
    }
}
