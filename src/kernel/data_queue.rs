/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * A data queue is a fixed-capacity ring of fixed-size items shared between
 * execution contexts.  Items are copied in and out by value.  A post that
 * finds a blocked pender hands its payload straight to that pender; the ring
 * is only used when nobody is waiting.
 *
 * All queue state is guarded by a critical section.  The critical section is
 * never held while a context is suspended, and contexts are only resumed
 * (and the scheduler only run) after it has been left.
 */

//! Data Queue Implementation
//!
//! [`DataQueue`] is the kernel object; it borrows caller supplied storage and
//! the [`Scheduler`] that blocks and wakes its users.
//!
//! ```ignore
//! static mut STORAGE: [u8; 4 * 8] = [0; 32];
//! let q = DataQueue::new(&kernel, "rx frames");
//! q.create(unsafe { &mut STORAGE }, 4, 8, WaitPolicy::Priority)?;
//! q.post(&frame, PostMode::Fifo, PostFlags::empty())?;
//! q.pend(&mut buf, Timeout::Ticks(10), PendMode::Blocking)?;
//! ```

use core::cell::RefCell;

use bitflags::bitflags;
use critical_section::Mutex;
use heapless::Vec;

use crate::config::{config_assert, DELETED_NAME, MAX_WAITERS};
use crate::error::{Error, Result};
use crate::kernel::list::{RxBuffer, WaitList, WaitPolicy, WaiterKey, WaiterStatus};
use crate::kernel::registry;
use crate::kernel::sched::{Disposition, Scheduler, WaitClass, Wake};
use crate::trace::*;
use crate::types::*;

// =============================================================================
// Options
// =============================================================================

/// Where a post puts its item when nobody is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PostMode {
    /// Append; fails with [`Error::QueueFull`] when full.
    #[default]
    Fifo,
    /// Put in front of everything buffered; fails when full.
    Lifo,
    /// Append; when full the oldest item is discarded.
    FifoOverwrite,
    /// Replace the item most recently written at the back. Never fails; the
    /// queue only grows when it was empty.
    LifoOverwrite,
}

impl TryFrom<u8> for PostMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(PostMode::Fifo),
            1 => Ok(PostMode::Lifo),
            2 => Ok(PostMode::FifoOverwrite),
            3 => Ok(PostMode::LifoOverwrite),
            _ => Err(Error::OptInvalid),
        }
    }
}

/// How a pend behaves when the queue is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PendMode {
    /// Wait for data, bounded by the timeout.
    #[default]
    Blocking,
    /// Fail with [`Error::PendWouldBlock`].
    NonBlocking,
    /// Copy the front item without removing it; fail with
    /// [`Error::PendEmpty`] when there is none.
    Peek,
}

impl TryFrom<u8> for PendMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(PendMode::Blocking),
            1 => Ok(PendMode::NonBlocking),
            2 => Ok(PendMode::Peek),
            _ => Err(Error::OptInvalid),
        }
    }
}

/// Which waiters [`DataQueue::abort`] wakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AbortScope {
    /// The waiter that would be woken next.
    #[default]
    One,
    All,
}

impl TryFrom<u8> for AbortScope {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(AbortScope::One),
            1 => Ok(AbortScope::All),
            _ => Err(Error::OptInvalid),
        }
    }
}

/// What [`DataQueue::delete`] does about waiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeletePolicy {
    /// Refuse with [`Error::TaskWaiting`] if anybody is waiting.
    #[default]
    NoPend,
    /// Wake every waiter with [`Error::ObjDeleted`] and delete anyway.
    Always,
}

impl TryFrom<u8> for DeletePolicy {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(DeletePolicy::NoPend),
            1 => Ok(DeletePolicy::Always),
            _ => Err(Error::OptInvalid),
        }
    }
}

bitflags! {
    /// Modifiers for calls that may wake waiters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PostFlags: u8 {
        /// Wake waiters but do not run the scheduler afterwards.
        const NO_SCHED = 1 << 0;
    }
}

/// Lifecycle state of a [`DataQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueueState {
    #[default]
    Uninitialized,
    Active,
    Destroyed,
}

// =============================================================================
// Queue state
// =============================================================================

struct Inner<'a, const W: usize> {
    state: QueueState,
    storage: Option<&'a mut [u8]>,
    item_size: usize,
    capacity: usize,
    count: usize,
    head: usize,
    tail: usize,
    max_count: usize,
    id: Option<QueueId>,
    name: &'static str,
    waiters: WaitList<W>,
}

impl<'a, const W: usize> Inner<'a, W> {
    fn check_active(&self) -> Result<()> {
        match self.state {
            QueueState::Active => Ok(()),
            _ => Err(Error::ObjType),
        }
    }

    fn check_size(&self, len: usize) -> Result<()> {
        if len == self.item_size {
            Ok(())
        } else {
            Err(Error::DataSize)
        }
    }

    #[inline]
    fn wrap_next(&self, index: usize) -> usize {
        if index + 1 == self.capacity {
            0
        } else {
            index + 1
        }
    }

    #[inline]
    fn wrap_prev(&self, index: usize) -> usize {
        if index == 0 {
            self.capacity - 1
        } else {
            index - 1
        }
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut [u8]> {
        let size = self.item_size;
        let storage = self.storage.as_deref_mut().ok_or(Error::ObjType)?;
        Ok(&mut storage[index * size..(index + 1) * size])
    }

    fn item(&self, index: usize) -> Result<&[u8]> {
        let size = self.item_size;
        let storage = self.storage.as_deref().ok_or(Error::ObjType)?;
        Ok(&storage[index * size..(index + 1) * size])
    }

    /// Store `payload` in the ring according to `mode`.
    fn enqueue(&mut self, payload: &[u8], mode: PostMode) -> Result<()> {
        let full = self.count == self.capacity;
        match mode {
            PostMode::Fifo | PostMode::Lifo if full => return Err(Error::QueueFull),
            PostMode::Fifo => self.push_back(payload)?,
            PostMode::Lifo => self.push_front(payload)?,
            PostMode::FifoOverwrite => {
                if full {
                    // drop the oldest to make room at the back
                    self.head = self.wrap_next(self.head);
                    self.count -= 1;
                }
                self.push_back(payload)?;
            }
            PostMode::LifoOverwrite => {
                // replace the last item written at the back; only an empty
                // queue grows
                let was_empty = self.count == 0;
                if !was_empty {
                    self.tail = self.wrap_prev(self.tail);
                }
                let tail = self.tail;
                self.item_mut(tail)?.copy_from_slice(payload);
                self.tail = self.wrap_next(tail);
                if was_empty {
                    self.count += 1;
                }
            }
        }
        self.max_count = self.max_count.max(self.count);
        config_assert(self.count <= self.capacity);
        Ok(())
    }

    fn push_back(&mut self, payload: &[u8]) -> Result<()> {
        let tail = self.tail;
        self.item_mut(tail)?.copy_from_slice(payload);
        self.tail = self.wrap_next(tail);
        self.count += 1;
        Ok(())
    }

    fn push_front(&mut self, payload: &[u8]) -> Result<()> {
        let head = self.wrap_prev(self.head);
        self.item_mut(head)?.copy_from_slice(payload);
        self.head = head;
        self.count += 1;
        Ok(())
    }

    /// Copy the front item into `dest`, removing it unless `peek`.
    fn dequeue(&mut self, dest: &mut [u8], peek: bool) -> Result<()> {
        config_assert(self.count > 0);
        dest.copy_from_slice(self.item(self.head)?);
        if !peek {
            self.head = self.wrap_next(self.head);
            self.count -= 1;
        }
        Ok(())
    }

    /// Zero the ring and forget its contents. Returns the discarded count.
    fn clear(&mut self) -> usize {
        let discarded = self.count;
        if let Some(storage) = self.storage.as_deref_mut() {
            storage.fill(0);
        }
        self.count = 0;
        self.head = 0;
        self.tail = 0;
        self.max_count = 0;
        discarded
    }

    /// Take up to `limit` waiters off the list with `disposition`.
    fn release(&mut self, disposition: Disposition, limit: usize) -> Vec<ContextId, W> {
        let mut woken = Vec::new();
        while woken.len() < limit {
            let Some(released) = self.waiters.release_head(disposition) else {
                break;
            };
            if woken.push(released.context).is_err() {
                config_assert(false);
            }
        }
        woken
    }
}

/// Result of the part of a pend that runs inside the critical section.
enum PendStep {
    Done,
    Wait(ContextId, WaiterKey),
}

/// Result of inspecting a waiter after it was woken.
enum WakeStep {
    Finished(Disposition),
    Again(Timeout),
}

// =============================================================================
// DataQueue
// =============================================================================

/// Bounded blocking data queue.
///
/// `W` bounds how many contexts may block on the queue at the same time.
pub struct DataQueue<'a, S: Scheduler, const W: usize = MAX_WAITERS> {
    sched: &'a S,
    label: &'static str,
    inner: Mutex<RefCell<Inner<'a, W>>>,
}

impl<'a, S: Scheduler, const W: usize> DataQueue<'a, S, W> {
    /// A queue in the `Uninitialized` state. It becomes usable after
    /// [`create`](Self::create).
    pub const fn new(sched: &'a S, name: &'static str) -> Self {
        DataQueue {
            sched,
            label: name,
            inner: Mutex::new(RefCell::new(Inner {
                state: QueueState::Uninitialized,
                storage: None,
                item_size: 0,
                capacity: 0,
                count: 0,
                head: 0,
                tail: 0,
                max_count: 0,
                id: None,
                name,
                waiters: WaitList::new(WaitPolicy::Priority),
            })),
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Create the queue over `storage`, which must hold at least
    /// `capacity * item_size` bytes.
    pub fn create(
        &self,
        storage: &'a mut [u8],
        capacity: usize,
        item_size: usize,
        policy: WaitPolicy,
    ) -> Result<QueueId> {
        let result = self.create_inner(storage, capacity, item_size, policy);
        match result {
            Ok(id) => {
                registry::register(registry::Entry {
                    id,
                    name: self.label,
                    capacity,
                    item_size,
                });
                trace_data_create(self.label, id, capacity, item_size);
            }
            Err(err) => trace_data_create_failed(self.label, err),
        }
        result
    }

    fn create_inner(
        &self,
        storage: &'a mut [u8],
        capacity: usize,
        item_size: usize,
        policy: WaitPolicy,
    ) -> Result<QueueId> {
        if self.sched.is_safety_critical_started() {
            return Err(Error::IllegalCreateRunTime);
        }
        if self.sched.in_interrupt_context() {
            return Err(Error::CreateIsr);
        }
        if capacity == 0 {
            return Err(Error::QueueSize);
        }
        if item_size == 0 {
            return Err(Error::DataSize);
        }
        let needed = capacity.checked_mul(item_size).ok_or(Error::PtrInvalid)?;
        if storage.len() < needed {
            return Err(Error::PtrInvalid);
        }
        let (storage, _) = storage.split_at_mut(needed);

        critical_section::with(|cs| -> Result<QueueId> {
            let mut q = self.inner.borrow_ref_mut(cs);
            if q.state == QueueState::Active {
                return Err(Error::ObjCreated);
            }
            let id = registry::next_id();
            q.storage = Some(storage);
            q.item_size = item_size;
            q.capacity = capacity;
            q.clear();
            q.waiters.set_policy(policy);
            q.id = Some(id);
            q.name = self.label;
            q.state = QueueState::Active;
            Ok(id)
        })
    }

    /// Delete the queue. Returns how many waiters were woken.
    ///
    /// The storage borrow is released; the queue may be created again.
    pub fn delete(&self, policy: DeletePolicy) -> Result<usize> {
        let result = self.delete_inner(policy);
        if let Err(err) = result {
            trace_data_del_failed(self.label, err);
        }
        result
    }

    fn delete_inner(&self, policy: DeletePolicy) -> Result<usize> {
        if self.sched.is_safety_critical_started() {
            return Err(Error::IllegalDeleteRunTime);
        }
        if self.sched.in_interrupt_context() {
            return Err(Error::DeleteIsr);
        }
        if !self.sched.is_kernel_running() {
            return Err(Error::OsNotRunning);
        }

        let (id, woken) = critical_section::with(|cs| -> Result<_> {
            let mut q = self.inner.borrow_ref_mut(cs);
            q.check_active()?;
            if policy == DeletePolicy::NoPend && !q.waiters.is_empty() {
                return Err(Error::TaskWaiting);
            }
            let woken = q.release(Disposition::Deleted, W);
            q.clear();
            q.storage = None;
            q.item_size = 0;
            q.capacity = 0;
            q.name = DELETED_NAME;
            q.state = QueueState::Destroyed;
            let id = q.id.take();
            Ok((id, woken))
        })?;

        if let Some(id) = id {
            registry::unregister(id);
            trace_data_del(self.label, id, woken.len());
        }
        for &ctx in &woken {
            self.sched.resume(ctx, Disposition::Deleted);
        }
        if policy == DeletePolicy::Always {
            self.sched.run_scheduler();
        }
        Ok(woken.len())
    }

    /// Discard every buffered item. Returns how many were discarded.
    /// Waiters are left alone.
    pub fn flush(&self) -> Result<usize> {
        let result = self.flush_inner();
        match result {
            Ok(n) => trace_data_flush(self.label, n),
            Err(err) => trace_data_flush_failed(self.label, err),
        }
        result
    }

    fn flush_inner(&self) -> Result<usize> {
        if self.sched.in_interrupt_context() {
            return Err(Error::FlushIsr);
        }
        if !self.sched.is_kernel_running() {
            return Err(Error::OsNotRunning);
        }
        critical_section::with(|cs| -> Result<usize> {
            let mut q = self.inner.borrow_ref_mut(cs);
            q.check_active()?;
            Ok(q.clear())
        })
    }

    // -------------------------------------------------------------------------
    // Post / pend
    // -------------------------------------------------------------------------

    /// Post one item. `payload` must be exactly `item_size` bytes.
    ///
    /// If a context is blocked on the queue, the item goes straight to it
    /// and the ring is not touched. May be called from an interrupt handler.
    pub fn post(&self, payload: &[u8], mode: PostMode, flags: PostFlags) -> Result<()> {
        let result = self.post_inner(payload, mode);
        match result {
            Ok(handed_to) => {
                trace_data_post(self.label, handed_to);
                if let Some(ctx) = handed_to {
                    self.sched.resume(ctx, Disposition::Success);
                    if !flags.contains(PostFlags::NO_SCHED) {
                        self.sched.run_scheduler();
                    }
                }
                Ok(())
            }
            Err(err) => {
                trace_data_post_failed(self.label, err);
                Err(err)
            }
        }
    }

    fn post_inner(&self, payload: &[u8], mode: PostMode) -> Result<Option<ContextId>> {
        if !self.sched.is_kernel_running() {
            return Err(Error::OsNotRunning);
        }
        critical_section::with(|cs| -> Result<Option<ContextId>> {
            let mut q = self.inner.borrow_ref_mut(cs);
            q.check_active()?;
            q.check_size(payload.len())?;
            if let Some(released) = q.waiters.release_head(Disposition::Success) {
                // SAFETY: the waiter was linked until this call, so its owner
                // is still blocked in `pend` holding the buffer.
                unsafe { released.rx.fill(payload) };
                return Ok(Some(released.context));
            }
            q.enqueue(payload, mode)?;
            Ok(None)
        })
    }

    /// Take (or peek at) one item into `dest`, which must be exactly
    /// `item_size` bytes.
    ///
    /// A blocking pend on an empty queue suspends the caller until an item
    /// is handed to it, the timeout expires, the wait is aborted or the
    /// queue is deleted. [`Timeout::Forever`] never expires.
    pub fn pend(&self, dest: &mut [u8], timeout: Timeout, mode: PendMode) -> Result<()> {
        let result = self.pend_inner(dest, timeout, mode);
        match result {
            Ok(()) => trace_data_pend(self.label, mode == PendMode::Peek),
            Err(err) => trace_data_pend_failed(self.label, err),
        }
        result
    }

    fn pend_inner(&self, dest: &mut [u8], timeout: Timeout, mode: PendMode) -> Result<()> {
        let blocking = mode == PendMode::Blocking;
        if blocking && self.sched.in_interrupt_context() {
            return Err(Error::PendIsr);
        }
        if blocking && self.sched.in_timer_context() {
            return Err(Error::PendTimer);
        }
        if !self.sched.is_kernel_running() {
            return Err(Error::OsNotRunning);
        }

        // Context queries stay outside the critical section.
        let waiter = if blocking {
            let ctx = self.sched.current_context();
            Some((ctx, self.sched.context_priority(ctx), self.sched.is_scheduler_locked()))
        } else {
            None
        };

        let step = critical_section::with(|cs| -> Result<PendStep> {
            let mut q = self.inner.borrow_ref_mut(cs);
            q.check_active()?;
            q.check_size(dest.len())?;
            if q.count > 0 {
                q.dequeue(dest, mode == PendMode::Peek)?;
                return Ok(PendStep::Done);
            }
            match (mode, waiter) {
                (PendMode::Peek, _) => Err(Error::PendEmpty),
                (_, None) => Err(Error::PendWouldBlock),
                (_, Some((_, _, true))) => Err(Error::SchedLocked),
                (_, Some((ctx, priority, false))) => {
                    let key = q.waiters.insert(ctx, priority, RxBuffer::new(dest))?;
                    Ok(PendStep::Wait(ctx, key))
                }
            }
        })?;

        match step {
            PendStep::Done => Ok(()),
            PendStep::Wait(ctx, key) => {
                trace_data_pend_block(self.label, ctx, timeout);
                match self.wait(ctx, key, timeout) {
                    Disposition::Success => Ok(()),
                    Disposition::Timeout => Err(Error::Timeout),
                    Disposition::Aborted => Err(Error::PendAbort),
                    Disposition::Deleted => Err(Error::ObjDeleted),
                }
            }
        }
    }

    /// Suspend until the waiter behind `key` is released or times out.
    fn wait(&self, ctx: ContextId, key: WaiterKey, timeout: Timeout) -> Disposition {
        let start = self.sched.tick_count();
        let mut bound = timeout;
        loop {
            let wake = self.sched.suspend(ctx, WaitClass::Data, bound);
            let step = critical_section::with(|cs| {
                let mut q = self.inner.borrow_ref_mut(cs);
                match q.waiters.status(key) {
                    Some(WaiterStatus::Done(_)) => {
                        WakeStep::Finished(q.waiters.collect(key).unwrap_or(Disposition::Deleted))
                    }
                    Some(WaiterStatus::Waiting) => {
                        let elapsed = self.sched.tick_count().wrapping_sub(start);
                        match timeout.remaining(elapsed) {
                            Some(left) if wake == Wake::Resumed => WakeStep::Again(left),
                            _ => {
                                q.waiters.cancel(key);
                                WakeStep::Finished(Disposition::Timeout)
                            }
                        }
                    }
                    None => {
                        config_assert(false);
                        WakeStep::Finished(Disposition::Deleted)
                    }
                }
            });
            match step {
                WakeStep::Finished(disposition) => return disposition,
                WakeStep::Again(left) => bound = left,
            }
        }
    }

    /// Wake blocked contexts with [`Error::PendAbort`]. Returns how many.
    pub fn abort(&self, scope: AbortScope, flags: PostFlags) -> Result<usize> {
        let result = self.abort_inner(scope);
        match result {
            Ok(ref woken) => {
                trace_data_abort(self.label, woken.len());
                for &ctx in woken {
                    self.sched.resume(ctx, Disposition::Aborted);
                }
                if !flags.contains(PostFlags::NO_SCHED) {
                    self.sched.run_scheduler();
                }
            }
            Err(err) => trace_data_abort_failed(self.label, err),
        }
        result.map(|woken| woken.len())
    }

    fn abort_inner(&self, scope: AbortScope) -> Result<Vec<ContextId, W>> {
        if self.sched.in_interrupt_context() {
            return Err(Error::PendAbortIsr);
        }
        if !self.sched.is_kernel_running() {
            return Err(Error::OsNotRunning);
        }
        critical_section::with(|cs| -> Result<Vec<ContextId, W>> {
            let mut q = self.inner.borrow_ref_mut(cs);
            q.check_active()?;
            if q.waiters.is_empty() {
                return Err(Error::PendAbortNone);
            }
            let limit = match scope {
                AbortScope::One => 1,
                AbortScope::All => W,
            };
            Ok(q.release(Disposition::Aborted, limit))
        })
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    fn read<R>(&self, f: impl FnOnce(&Inner<'a, W>) -> R) -> R {
        critical_section::with(|cs| f(&self.inner.borrow_ref(cs)))
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.read(|q| q.count)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.read(|q| q.state == QueueState::Active && q.count == q.capacity)
    }

    pub fn capacity(&self) -> usize {
        self.read(|q| q.capacity)
    }

    pub fn item_size(&self) -> usize {
        self.read(|q| q.item_size)
    }

    /// Number of contexts currently blocked on the queue.
    pub fn waiter_count(&self) -> usize {
        self.read(|q| q.waiters.len())
    }

    /// Most items buffered at once since the last create or flush.
    pub fn max_count(&self) -> usize {
        self.read(|q| q.max_count)
    }

    pub fn state(&self) -> QueueState {
        self.read(|q| q.state)
    }

    pub fn id(&self) -> Option<QueueId> {
        self.read(|q| q.id)
    }

    pub fn name(&self) -> &'static str {
        self.read(|q| q.name)
    }

    pub fn policy(&self) -> WaitPolicy {
        self.read(|q| q.waiters.policy())
    }
}

impl<S: Scheduler, const W: usize> Drop for DataQueue<'_, S, W> {
    /// A queue dropped while active leaves the registry with it. Nothing can
    /// be blocked on it: every pender borrows the queue.
    fn drop(&mut self) {
        let id = critical_section::with(|cs| self.inner.borrow_ref_mut(cs).id.take());
        if let Some(id) = id {
            registry::unregister(id);
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::cell::Cell;
    use std::vec::Vec;

    /// Single-context scheduler whose `suspend` follows a script.
    struct Script {
        running: Cell<bool>,
        isr: Cell<bool>,
        timer: Cell<bool>,
        locked: Cell<bool>,
        lockdown: Cell<bool>,
        tick: Cell<Tick>,
        // (ticks that pass, how suspend returns) per call
        wakes: RefCell<Vec<(Tick, Wake)>>,
        suspended: RefCell<Vec<Timeout>>,
        resumed: RefCell<Vec<(ContextId, Disposition)>>,
        sched_runs: Cell<usize>,
    }

    impl Script {
        fn new() -> Self {
            Script {
                running: Cell::new(true),
                isr: Cell::new(false),
                timer: Cell::new(false),
                locked: Cell::new(false),
                lockdown: Cell::new(false),
                tick: Cell::new(100),
                wakes: RefCell::new(Vec::new()),
                suspended: RefCell::new(Vec::new()),
                resumed: RefCell::new(Vec::new()),
                sched_runs: Cell::new(0),
            }
        }
    }

    impl Scheduler for Script {
        fn current_context(&self) -> ContextId {
            ContextId(1)
        }

        fn context_priority(&self, _: ContextId) -> Priority {
            Priority(5)
        }

        fn suspend(&self, _: ContextId, class: WaitClass, timeout: Timeout) -> Wake {
            assert_eq!(class, WaitClass::Data);
            self.suspended.borrow_mut().push(timeout);
            let (ticks, wake) = self.wakes.borrow_mut().remove(0);
            self.tick.set(self.tick.get() + ticks);
            wake
        }

        fn resume(&self, context: ContextId, disposition: Disposition) {
            self.resumed.borrow_mut().push((context, disposition));
        }

        fn run_scheduler(&self) {
            self.sched_runs.set(self.sched_runs.get() + 1);
        }

        fn is_kernel_running(&self) -> bool {
            self.running.get()
        }

        fn in_interrupt_context(&self) -> bool {
            self.isr.get()
        }

        fn tick_count(&self) -> Tick {
            self.tick.get()
        }

        fn in_timer_context(&self) -> bool {
            self.timer.get()
        }

        fn is_scheduler_locked(&self) -> bool {
            self.locked.get()
        }

        fn is_safety_critical_started(&self) -> bool {
            self.lockdown.get()
        }
    }

    type Q<'a> = DataQueue<'a, Script>;

    fn post(q: &Q<'_>, byte: u8, mode: PostMode) -> Result<()> {
        q.post(&[byte, byte], mode, PostFlags::empty())
    }

    fn take(q: &Q<'_>) -> Result<u8> {
        let mut out = [0u8; 2];
        q.pend(&mut out, Timeout::Forever, PendMode::NonBlocking)?;
        Ok(out[0])
    }

    fn drain(q: &Q<'_>) -> Vec<u8> {
        core::iter::from_fn(|| take(q).ok()).collect()
    }

    #[test]
    fn fresh_queue_is_empty() {
        let s = Script::new();
        let mut buf = [0xAAu8; 6];
        let q = Q::new(&s, "fresh");
        let id = q.create(&mut buf, 3, 2, WaitPolicy::Priority).unwrap();
        assert_eq!(q.id(), Some(id));
        assert_eq!(q.state(), QueueState::Active);
        assert_eq!(take(&q), Err(Error::PendWouldBlock));
        assert_eq!(q.flush(), Ok(0));
        assert_eq!((q.capacity(), q.item_size(), q.len()), (3, 2, 0));
        assert!(q.is_empty() && !q.is_full());
    }

    #[test]
    fn create_checks_in_order() {
        let s = Script::new();
        let q = Q::new(&s, "checks");
        let create = |capacity, item_size| q.create(&mut [], capacity, item_size, WaitPolicy::Priority);

        s.lockdown.set(true);
        s.isr.set(true);
        assert_eq!(create(0, 0), Err(Error::IllegalCreateRunTime));
        s.lockdown.set(false);
        assert_eq!(create(0, 0), Err(Error::CreateIsr));
        s.isr.set(false);
        assert_eq!(create(0, 0), Err(Error::QueueSize));
        assert_eq!(create(2, 0), Err(Error::DataSize));
        assert_eq!(create(5, 2), Err(Error::PtrInvalid));
        assert_eq!(create(usize::MAX, 2), Err(Error::PtrInvalid));
        assert_eq!(q.state(), QueueState::Uninitialized);
    }

    #[test]
    fn create_twice_fails() {
        let s = Script::new();
        let (mut a, mut b) = ([0u8; 4], [0u8; 4]);
        let q = Q::new(&s, "twice");
        q.create(&mut a, 2, 2, WaitPolicy::Arrival).unwrap();
        assert_eq!(q.create(&mut b, 2, 2, WaitPolicy::Priority), Err(Error::ObjCreated));
        assert_eq!(q.policy(), WaitPolicy::Arrival);
    }

    #[test]
    fn fifo_fills_then_reports_full() {
        let s = Script::new();
        let mut buf = [0u8; 6];
        let q = Q::new(&s, "fifo");
        q.create(&mut buf, 3, 2, WaitPolicy::Priority).unwrap();
        for b in 1..=3 {
            post(&q, b, PostMode::Fifo).unwrap();
        }
        assert!(q.is_full());
        assert_eq!(post(&q, 4, PostMode::Fifo), Err(Error::QueueFull));
        assert_eq!(post(&q, 4, PostMode::Lifo), Err(Error::QueueFull));
        assert_eq!(drain(&q), [1, 2, 3]);
        assert_eq!(q.max_count(), 3);
    }

    #[test]
    fn lifo_reads_newest_first() {
        let s = Script::new();
        let mut buf = [0u8; 6];
        let q = Q::new(&s, "lifo");
        q.create(&mut buf, 3, 2, WaitPolicy::Priority).unwrap();
        post(&q, b'A', PostMode::Lifo).unwrap();
        post(&q, b'B', PostMode::Lifo).unwrap();
        assert_eq!(take(&q), Ok(b'B'));
        post(&q, b'C', PostMode::Fifo).unwrap();
        assert_eq!(drain(&q), [b'A', b'C']);
    }

    #[test]
    fn fifo_overwrite_discards_oldest() {
        let s = Script::new();
        let mut buf = [0u8; 4];
        let q = Q::new(&s, "fifo-ow");
        q.create(&mut buf, 2, 2, WaitPolicy::Priority).unwrap();
        for b in [b'A', b'B', b'C'] {
            post(&q, b, PostMode::FifoOverwrite).unwrap();
        }
        assert_eq!(q.len(), 2);
        assert_eq!(drain(&q), [b'B', b'C']);
    }

    #[test]
    fn lifo_overwrite_replaces_newest() {
        let s = Script::new();
        let mut buf = [0u8; 6];
        let q = Q::new(&s, "lifo-ow");
        q.create(&mut buf, 3, 2, WaitPolicy::Priority).unwrap();

        // non-empty queue does not grow
        post(&q, b'A', PostMode::LifoOverwrite).unwrap();
        post(&q, b'B', PostMode::LifoOverwrite).unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(drain(&q), [b'B']);

        // full queue keeps the oldest items
        for b in [1, 2, 3] {
            post(&q, b, PostMode::Fifo).unwrap();
        }
        post(&q, 9, PostMode::LifoOverwrite).unwrap();
        assert!(q.is_full());
        assert_eq!(drain(&q), [1, 2, 9]);
    }

    #[test]
    fn ring_wraps_around() {
        let s = Script::new();
        let mut buf = [0u8; 6];
        let q = Q::new(&s, "wrap");
        q.create(&mut buf, 3, 2, WaitPolicy::Priority).unwrap();
        for round in 0..5u8 {
            post(&q, round, PostMode::Fifo).unwrap();
            post(&q, round + 10, PostMode::Fifo).unwrap();
            assert_eq!(drain(&q), [round, round + 10]);
        }
    }

    #[test]
    fn peek_leaves_queue_untouched() {
        let s = Script::new();
        let mut buf = [0u8; 6];
        let q = Q::new(&s, "peek");
        q.create(&mut buf, 3, 2, WaitPolicy::Priority).unwrap();
        let mut out = [0u8; 2];
        assert_eq!(q.pend(&mut out, Timeout::Forever, PendMode::Peek), Err(Error::PendEmpty));
        post(&q, 7, PostMode::Fifo).unwrap();
        post(&q, 8, PostMode::Fifo).unwrap();
        for _ in 0..3 {
            q.pend(&mut out, Timeout::Forever, PendMode::Peek).unwrap();
            assert_eq!(out, [7, 7]);
        }
        assert_eq!(q.len(), 2);
        assert_eq!(drain(&q), [7, 8]);
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let s = Script::new();
        let mut buf = [0u8; 6];
        let q = Q::new(&s, "size");
        q.create(&mut buf, 3, 2, WaitPolicy::Priority).unwrap();
        assert_eq!(q.post(&[1, 2, 3], PostMode::Fifo, PostFlags::empty()), Err(Error::DataSize));
        let mut out = [0u8; 1];
        assert_eq!(q.pend(&mut out, Timeout::Forever, PendMode::NonBlocking), Err(Error::DataSize));
        assert!(q.is_empty());
    }

    #[test]
    fn calls_on_missing_queue_report_obj_type() {
        let s = Script::new();
        let q = Q::new(&s, "missing");
        let mut out = [0u8; 2];
        assert_eq!(post(&q, 1, PostMode::Fifo), Err(Error::ObjType));
        assert_eq!(q.pend(&mut out, Timeout::Forever, PendMode::NonBlocking), Err(Error::ObjType));
        assert_eq!(q.flush(), Err(Error::ObjType));
        assert_eq!(q.abort(AbortScope::All, PostFlags::empty()), Err(Error::ObjType));
        assert_eq!(q.delete(DeletePolicy::Always), Err(Error::ObjType));
        assert_eq!(q.capacity(), 0);
    }

    #[test]
    fn context_gates() {
        let s = Script::new();
        let mut buf = [0u8; 4];
        let q = Q::new(&s, "gates");
        q.create(&mut buf, 2, 2, WaitPolicy::Priority).unwrap();
        let mut out = [0u8; 2];

        s.isr.set(true);
        assert_eq!(q.pend(&mut out, Timeout::Forever, PendMode::Blocking), Err(Error::PendIsr));
        assert_eq!(q.flush(), Err(Error::FlushIsr));
        assert_eq!(q.abort(AbortScope::One, PostFlags::empty()), Err(Error::PendAbortIsr));
        assert_eq!(q.delete(DeletePolicy::NoPend), Err(Error::DeleteIsr));
        // posting and non-blocking pends are fine from an interrupt
        post(&q, 3, PostMode::Fifo).unwrap();
        assert_eq!(take(&q), Ok(3));
        s.isr.set(false);

        s.timer.set(true);
        assert_eq!(q.pend(&mut out, Timeout::Forever, PendMode::Blocking), Err(Error::PendTimer));
        s.timer.set(false);

        s.locked.set(true);
        assert_eq!(q.pend(&mut out, Timeout::Forever, PendMode::Blocking), Err(Error::SchedLocked));
        s.locked.set(false);

        s.running.set(false);
        assert_eq!(post(&q, 1, PostMode::Fifo), Err(Error::OsNotRunning));
        assert_eq!(take(&q), Err(Error::OsNotRunning));
        s.running.set(true);

        s.lockdown.set(true);
        assert_eq!(q.delete(DeletePolicy::Always), Err(Error::IllegalDeleteRunTime));
        s.lockdown.set(false);
        assert!(s.suspended.borrow().is_empty());
    }

    #[test]
    fn blocking_pend_times_out_and_unlinks() {
        let s = Script::new();
        let mut buf = [0u8; 4];
        let q = Q::new(&s, "timeout");
        q.create(&mut buf, 2, 2, WaitPolicy::Priority).unwrap();
        s.wakes.borrow_mut().push((10, Wake::TimedOut));
        let mut out = [0u8; 2];
        assert_eq!(q.pend(&mut out, Timeout::Ticks(10), PendMode::Blocking), Err(Error::Timeout));
        assert_eq!(q.waiter_count(), 0);
        assert_eq!(*s.suspended.borrow(), [Timeout::Ticks(10)]);
    }

    #[test]
    fn spurious_wake_waits_for_the_rest() {
        let s = Script::new();
        let mut buf = [0u8; 4];
        let q = Q::new(&s, "spurious");
        q.create(&mut buf, 2, 2, WaitPolicy::Priority).unwrap();
        s.wakes.borrow_mut().extend([(4, Wake::Resumed), (6, Wake::TimedOut)]);
        let mut out = [0u8; 2];
        assert_eq!(q.pend(&mut out, Timeout::Ticks(10), PendMode::Blocking), Err(Error::Timeout));
        assert_eq!(*s.suspended.borrow(), [Timeout::Ticks(10), Timeout::Ticks(6)]);
        assert_eq!(q.waiter_count(), 0);
    }

    #[test]
    fn late_resume_past_deadline_is_a_timeout() {
        let s = Script::new();
        let mut buf = [0u8; 4];
        let q = Q::new(&s, "late");
        q.create(&mut buf, 2, 2, WaitPolicy::Priority).unwrap();
        s.wakes.borrow_mut().push((12, Wake::Resumed));
        let mut out = [0u8; 2];
        assert_eq!(q.pend(&mut out, Timeout::Ticks(10), PendMode::Blocking), Err(Error::Timeout));
        assert_eq!(q.waiter_count(), 0);
    }

    #[test]
    fn abort_and_delete_without_waiters() {
        let s = Script::new();
        let mut buf = [0u8; 4];
        let q = Q::new(&s, "idle");
        q.create(&mut buf, 2, 2, WaitPolicy::Priority).unwrap();
        assert_eq!(q.abort(AbortScope::All, PostFlags::empty()), Err(Error::PendAbortNone));
        post(&q, 1, PostMode::Fifo).unwrap();
        assert_eq!(q.delete(DeletePolicy::NoPend), Ok(0));
        assert_eq!(q.state(), QueueState::Destroyed);
        assert_eq!(q.name(), DELETED_NAME);
        assert_eq!((q.len(), q.capacity(), q.id()), (0, 0, None));
        assert_eq!(s.sched_runs.get(), 0);
        assert_eq!(post(&q, 1, PostMode::Fifo), Err(Error::ObjType));
    }

    #[test]
    fn deleted_queue_can_be_created_again() {
        let s = Script::new();
        let (mut a, mut b) = ([0u8; 4], [0u8; 9]);
        let q = Q::new(&s, "again");
        let first = q.create(&mut a, 2, 2, WaitPolicy::Priority).unwrap();
        assert_eq!(q.delete(DeletePolicy::Always), Ok(0));
        assert_eq!(s.sched_runs.get(), 1);
        let second = q.create(&mut b, 3, 3, WaitPolicy::Arrival).unwrap();
        assert_ne!(first, second);
        assert_eq!(q.name(), "again");
        assert_eq!((q.capacity(), q.item_size()), (3, 3));
        q.post(&[1, 2, 3], PostMode::Fifo, PostFlags::empty()).unwrap();
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn flush_returns_discarded_count() {
        let s = Script::new();
        let mut buf = [0u8; 6];
        let q = Q::new(&s, "flush");
        q.create(&mut buf, 3, 2, WaitPolicy::Priority).unwrap();
        post(&q, 1, PostMode::Fifo).unwrap();
        post(&q, 2, PostMode::Fifo).unwrap();
        assert_eq!(q.flush(), Ok(2));
        assert!(q.is_empty());
        assert_eq!(q.max_count(), 0);
        post(&q, 3, PostMode::Fifo).unwrap();
        assert_eq!(drain(&q), [3]);
    }

    #[test]
    fn options_from_raw() {
        assert_eq!(PostMode::try_from(2), Ok(PostMode::FifoOverwrite));
        assert_eq!(PostMode::try_from(4), Err(Error::OptInvalid));
        assert_eq!(PendMode::try_from(2), Ok(PendMode::Peek));
        assert_eq!(PendMode::try_from(3), Err(Error::OptInvalid));
        assert_eq!(AbortScope::try_from(1), Ok(AbortScope::All));
        assert_eq!(DeletePolicy::try_from(9), Err(Error::OptInvalid));
    }
}
