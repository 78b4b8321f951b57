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
 *
 */

/*
 * Wait lists hold the execution contexts blocked on a kernel object.  Items
 * live in a fixed arena owned by the object and are linked in the order they
 * will be woken.  Under the priority policy the list is sorted by descending
 * priority; an item inserted next to items of the same priority is placed
 * after them, so equal priorities wake in arrival order.
 *
 * An item is not freed when it is taken off the list.  It keeps the reason it
 * was woken until the blocked context comes back and collects it, which lets
 * the waker and the woken context agree on the outcome without sharing any
 * state outside the object's critical section.
 */

//! Wait List Implementation
//!
//! Arena-indexed, doubly-linked list of blocked contexts. Handles returned
//! by [`WaitList::insert`] carry a generation so a stale handle can never
//! reach a slot that has been reused.

use core::ptr::NonNull;

use crate::config::config_assert;
use crate::error::{Error, Result};
use crate::kernel::sched::Disposition;
use crate::types::*;

type Link = Option<u8>;

// =============================================================================
// Policy
// =============================================================================

/// Order in which blocked contexts are woken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WaitPolicy {
    /// Highest priority first, ties by arrival.
    #[default]
    Priority,
    /// Strict arrival order.
    Arrival,
}

impl TryFrom<u8> for WaitPolicy {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WaitPolicy::Priority),
            1 => Ok(WaitPolicy::Arrival),
            _ => Err(Error::OptInvalid),
        }
    }
}

// =============================================================================
// Handles
// =============================================================================

/// Handle of an entry in a [`WaitList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterKey {
    index: u8,
    generation: u16,
}

/// Where a waiter stands, as seen through its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaiterStatus {
    /// Still linked, nobody has woken it.
    Waiting,
    /// Taken off the list for this reason; not yet collected.
    Done(Disposition),
}

/// Destination buffer of a blocked pend.
///
/// The pointer is only written through while the owning context is linked,
/// which means it is blocked inside the pend call that lent the buffer.
#[derive(Debug, Clone, Copy)]
pub struct RxBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: the buffer is only touched inside the owning object's critical
// section while its borrower is blocked and cannot observe it.
unsafe impl Send for RxBuffer {}

impl RxBuffer {
    const EMPTY: RxBuffer = RxBuffer {
        ptr: NonNull::dangling(),
        len: 0,
    };

    pub fn new(dest: &mut [u8]) -> Self {
        RxBuffer {
            len: dest.len(),
            ptr: NonNull::from(dest).cast::<u8>(),
        }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy `data` into the borrowed buffer.
    ///
    /// # Safety
    ///
    /// The context that lent the buffer must still be blocked on the entry
    /// this buffer was taken from.
    pub unsafe fn fill(&self, data: &[u8]) {
        config_assert(data.len() == self.len);
        let n = data.len().min(self.len);
        unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.as_ptr(), n) };
    }
}

/// Entry removed from the head of a list by a waker.
#[derive(Debug, Clone, Copy)]
pub struct Released {
    pub key: WaiterKey,
    pub context: ContextId,
    pub rx: RxBuffer,
}

// =============================================================================
// Slots
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Linked,
    Done(Disposition),
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u16,
    state: SlotState,
    context: ContextId,
    priority: Priority,
    rx: RxBuffer,
    prev: Link,
    next: Link,
}

impl Slot {
    const FREE: Slot = Slot {
        generation: 0,
        state: SlotState::Free,
        context: ContextId(0),
        priority: Priority::IDLE,
        rx: RxBuffer::EMPTY,
        prev: None,
        next: None,
    };
}

// =============================================================================
// WaitList
// =============================================================================

/// Fixed-capacity wait list of up to `N` blocked contexts.
#[derive(Debug)]
pub struct WaitList<const N: usize> {
    slots: [Slot; N],
    head: Link,
    tail: Link,
    linked: usize,
    policy: WaitPolicy,
}

impl<const N: usize> WaitList<N> {
    const INDEX_FITS: () = assert!(N <= u8::MAX as usize, "wait list arena too large");

    pub const fn new(policy: WaitPolicy) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::INDEX_FITS;
        WaitList {
            slots: [Slot::FREE; N],
            head: None,
            tail: None,
            linked: 0,
            policy,
        }
    }

    pub const fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Change the wake order. Only legal while nothing is linked.
    pub fn set_policy(&mut self, policy: WaitPolicy) {
        config_assert(self.linked == 0);
        self.policy = policy;
    }

    /// Number of linked (still waiting) entries.
    pub const fn len(&self) -> usize {
        self.linked
    }

    pub const fn is_empty(&self) -> bool {
        self.linked == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Link `context` at its place in wake order.
    ///
    /// Fails with [`Error::WaitListFull`] when every slot is linked or still
    /// holds an uncollected disposition.
    pub fn insert(&mut self, context: ContextId, priority: Priority, rx: RxBuffer) -> Result<WaiterKey> {
        let index = self
            .slots
            .iter()
            .position(|s| s.state == SlotState::Free)
            .ok_or(Error::WaitListFull)?;

        // Find the neighbours: `prev` is the last entry that must stay ahead.
        let (prev, next) = match self.policy {
            WaitPolicy::Arrival => (self.tail, None),
            WaitPolicy::Priority => {
                let mut prev = None;
                let mut cursor = self.head;
                while let Some(i) = cursor {
                    let slot = &self.slots[i as usize];
                    if slot.priority < priority {
                        break;
                    }
                    prev = cursor;
                    cursor = slot.next;
                }
                (prev, cursor)
            }
        };

        let index = index as u8;
        let slot = &mut self.slots[index as usize];
        slot.state = SlotState::Linked;
        slot.context = context;
        slot.priority = priority;
        slot.rx = rx;
        slot.prev = prev;
        slot.next = next;
        let generation = slot.generation;

        match prev {
            Some(p) => self.slots[p as usize].next = Some(index),
            None => self.head = Some(index),
        }
        match next {
            Some(n) => self.slots[n as usize].prev = Some(index),
            None => self.tail = Some(index),
        }
        self.linked += 1;

        Ok(WaiterKey { index, generation })
    }

    /// Unlink the head entry, recording why it was woken.
    pub fn release_head(&mut self, disposition: Disposition) -> Option<Released> {
        let index = self.head?;
        let rx = self.slots[index as usize].rx;
        self.unlink(index);
        let slot = &mut self.slots[index as usize];
        slot.state = SlotState::Done(disposition);
        Some(Released {
            key: WaiterKey {
                index,
                generation: slot.generation,
            },
            context: slot.context,
            rx,
        })
    }

    /// Status of the entry behind `key`, `None` if the key is stale.
    pub fn status(&self, key: WaiterKey) -> Option<WaiterStatus> {
        let slot = self.slot(key)?;
        match slot.state {
            SlotState::Linked => Some(WaiterStatus::Waiting),
            SlotState::Done(d) => Some(WaiterStatus::Done(d)),
            SlotState::Free => None,
        }
    }

    /// Unlink and free a still-waiting entry. Returns `false` if the entry
    /// was already released by a waker.
    pub fn cancel(&mut self, key: WaiterKey) -> bool {
        match self.slot(key).map(|s| s.state) {
            Some(SlotState::Linked) => {
                self.unlink(key.index);
                self.free(key.index);
                true
            }
            _ => false,
        }
    }

    /// Take the disposition of a released entry and free its slot.
    pub fn collect(&mut self, key: WaiterKey) -> Option<Disposition> {
        match self.slot(key).map(|s| s.state) {
            Some(SlotState::Done(d)) => {
                self.free(key.index);
                Some(d)
            }
            _ => None,
        }
    }

    fn slot(&self, key: WaiterKey) -> Option<&Slot> {
        self.slots
            .get(key.index as usize)
            .filter(|s| s.generation == key.generation && s.state != SlotState::Free)
    }

    fn unlink(&mut self, index: u8) {
        let Slot { prev, next, .. } = self.slots[index as usize];
        match prev {
            Some(p) => self.slots[p as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n as usize].prev = prev,
            None => self.tail = prev,
        }
        let slot = &mut self.slots[index as usize];
        slot.prev = None;
        slot.next = None;
        slot.rx = RxBuffer::EMPTY;
        config_assert(self.linked > 0);
        self.linked -= 1;
    }

    fn free(&mut self, index: u8) {
        let slot = &mut self.slots[index as usize];
        slot.state = SlotState::Free;
        slot.generation = slot.generation.wrapping_add(1);
    }
}
