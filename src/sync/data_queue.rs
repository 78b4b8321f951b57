/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * Typed data queue: items are copied through the kernel queue as bytes.
 */

//! Safe typed DataQueue wrapper
//!
//! Provides a type-safe queue over the byte-oriented [`DataQueue`]. Items
//! are plain-old-data (`bytemuck::Pod`) so they can be copied through the
//! queue as bytes without any unsafe code at the call site.

use core::marker::PhantomData;
use core::mem::size_of;

use bytemuck::Pod;

use crate::config::MAX_WAITERS;
use crate::error::Result;
use crate::kernel::data_queue::{DataQueue, PendMode, PostFlags, PostMode};
use crate::kernel::list::WaitPolicy;
use crate::kernel::sched::Scheduler;
use crate::types::*;

/// A data queue carrying values of type `T`.
///
/// # Example
///
/// ```ignore
/// use rtos_data_queue::sync::TypedDataQueue;
///
/// #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
/// #[repr(C)]
/// struct Reading { channel: u16, value: i16 }
///
/// static mut SLOTS: [Reading; 8] = [Reading { channel: 0, value: 0 }; 8];
///
/// let readings = TypedDataQueue::<Reading, _>::new(&kernel, "readings");
/// readings.create(unsafe { &mut SLOTS }, WaitPolicy::Priority)?;
/// readings.try_send(&Reading { channel: 2, value: -40 })?;
/// let r = readings.receive()?;
/// ```
pub struct TypedDataQueue<'a, T: Pod, S: Scheduler, const W: usize = MAX_WAITERS> {
    raw: DataQueue<'a, S, W>,
    _marker: PhantomData<T>,
}

impl<'a, T: Pod, S: Scheduler, const W: usize> TypedDataQueue<'a, T, S, W> {
    pub const fn new(sched: &'a S, name: &'static str) -> Self {
        Self {
            raw: DataQueue::new(sched, name),
            _marker: PhantomData,
        }
    }

    /// Creates the queue over `slots`; its capacity is `slots.len()`.
    pub fn create(&self, slots: &'a mut [T], policy: WaitPolicy) -> Result<QueueId> {
        let capacity = slots.len();
        let bytes: &'a mut [u8] = if size_of::<T>() == 0 {
            // zero-sized items have no byte view; create reports DataSize
            &mut []
        } else {
            bytemuck::cast_slice_mut(slots)
        };
        self.raw.create(bytes, capacity, size_of::<T>(), policy)
    }

    /// The underlying byte queue, for delete, flush, abort and introspection.
    pub fn raw(&self) -> &DataQueue<'a, S, W> {
        &self.raw
    }

    /// Posts an item with an explicit mode and flags.
    pub fn post(&self, item: &T, mode: PostMode, flags: PostFlags) -> Result<()> {
        self.raw.post(bytemuck::bytes_of(item), mode, flags)
    }

    /// Sends an item to the back of the queue.
    ///
    /// Posting never blocks: fails with `QueueFull` when there is no room.
    pub fn try_send(&self, item: &T) -> Result<()> {
        self.post(item, PostMode::Fifo, PostFlags::empty())
    }

    /// Sends an item to the front of the queue.
    ///
    /// Items sent to front are received before items sent to back.
    pub fn send_to_front(&self, item: &T) -> Result<()> {
        self.post(item, PostMode::Lifo, PostFlags::empty())
    }

    /// Sends an item to the back, discarding the oldest one if full.
    pub fn overwrite(&self, item: &T) -> Result<()> {
        self.post(item, PostMode::FifoOverwrite, PostFlags::empty())
    }

    /// Receives an item, blocking indefinitely.
    pub fn receive(&self) -> Result<T> {
        self.pend(Timeout::Forever, PendMode::Blocking)
    }

    /// Receives an item, blocking for at most `ticks` (0 blocks forever).
    pub fn receive_timeout(&self, ticks: Tick) -> Result<T> {
        self.pend(Timeout::from_ticks(ticks), PendMode::Blocking)
    }

    /// Attempts to receive an item without blocking.
    pub fn try_receive(&self) -> Result<T> {
        self.pend(Timeout::Forever, PendMode::NonBlocking)
    }

    /// Copies the front item without removing it.
    pub fn peek(&self) -> Result<T> {
        self.pend(Timeout::Forever, PendMode::Peek)
    }

    fn pend(&self, timeout: Timeout, mode: PendMode) -> Result<T> {
        let mut item = T::zeroed();
        self.raw.pend(bytemuck::bytes_of_mut(&mut item), timeout, mode)?;
        Ok(item)
    }

    /// Number of items currently buffered.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.raw.is_full()
    }
}
