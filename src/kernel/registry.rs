/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * The registry is provided to allow kernel aware debuggers and introspection
 * code to locate live data queues.  It has no purpose unless something reads
 * it.  Queues are added when created and removed when deleted.
 */

//! Data Queue Registry
//!
//! Process-wide table of live queues, guarded by its own `spin::Mutex` so it
//! never nests inside a queue's critical section. It must be brought up with
//! [`init`] before queues register; until then (and after [`teardown`])
//! registration is silently skipped.

use core::sync::atomic::{AtomicU32, Ordering};

use heapless::Vec;
use spin::Mutex;

use crate::config::REGISTRY_SIZE;
use crate::trace::*;
use crate::types::QueueId;

/// What the registry records about a live queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub id: QueueId,
    pub name: &'static str,
    pub capacity: usize,
    pub item_size: usize,
}

struct Registry {
    up: bool,
    entries: Vec<Entry, REGISTRY_SIZE>,
}

static REGISTRY: Mutex<Registry> = Mutex::new(Registry {
    up: false,
    entries: Vec::new(),
});

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Bring the registry up. Calling it again keeps existing entries.
pub fn init() {
    REGISTRY.lock().up = true;
}

/// Drop every entry and stop tracking new queues.
pub fn teardown() {
    let mut reg = REGISTRY.lock();
    reg.up = false;
    reg.entries.clear();
}

pub fn is_initialised() -> bool {
    REGISTRY.lock().up
}

/// Hand out the id for a newly created queue.
pub fn next_id() -> QueueId {
    QueueId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Record a live queue. Returns `false` when it was not tracked.
pub fn register(entry: Entry) -> bool {
    let mut reg = REGISTRY.lock();
    if !reg.up {
        trace_registry_skip(entry.id, "registry is down");
        return false;
    }
    if reg.entries.push(entry).is_err() {
        trace_registry_skip(entry.id, "registry is full");
        return false;
    }
    trace_registry_add(entry.name, entry.id);
    true
}

/// Forget a queue. Returns `false` if it was not tracked.
pub fn unregister(id: QueueId) -> bool {
    let mut reg = REGISTRY.lock();
    match reg.entries.iter().position(|e| e.id == id) {
        Some(index) => {
            reg.entries.swap_remove(index);
            trace_registry_remove(id);
            true
        }
        None => false,
    }
}

pub fn find(id: QueueId) -> Option<Entry> {
    REGISTRY.lock().entries.iter().find(|e| e.id == id).copied()
}

/// Number of live queues tracked.
pub fn count() -> usize {
    REGISTRY.lock().entries.len()
}

/// Copy of every tracked entry.
pub fn snapshot() -> Vec<Entry, REGISTRY_SIZE> {
    REGISTRY.lock().entries.clone()
}
