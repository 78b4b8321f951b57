/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * The kernel calls a trace hook at every data queue event.  The hooks forward
 * to the `log` facade, so they cost nothing until a logger is installed.
 */

//! Trace Hooks
//!
//! Hooks are called at key points in the data queue code, outside of the
//! queue's critical section.
//!
//! ## Levels
//!
//! - `trace!` - per-item traffic (post, pend, block)
//! - `debug!` - lifecycle (create, delete, flush, abort, registry)
//! - `warn!` - failed calls that indicate a programming error in the caller

use log::{debug, trace, warn};

use crate::error::{Error, ErrorKind};
use crate::types::*;

#[inline]
fn failed(op: &str, name: &str, err: Error) {
    match err.kind() {
        ErrorKind::Outcome => trace!("{op} on {name:?} failed: {err}"),
        _ => warn!("{op} on {name:?} failed: {err}"),
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[inline]
pub fn trace_data_create(name: &str, id: QueueId, capacity: usize, item_size: usize) {
    debug!("created {id} {name:?}: {capacity} x {item_size} bytes");
}

#[inline]
pub fn trace_data_create_failed(name: &str, err: Error) {
    failed("create", name, err);
}

#[inline]
pub fn trace_data_del(name: &str, id: QueueId, woken: usize) {
    debug!("deleted {id} {name:?}, {woken} waiter(s) woken");
}

#[inline]
pub fn trace_data_del_failed(name: &str, err: Error) {
    failed("delete", name, err);
}

#[inline]
pub fn trace_data_flush(name: &str, discarded: usize) {
    debug!("flushed {name:?}, {discarded} item(s) discarded");
}

#[inline]
pub fn trace_data_flush_failed(name: &str, err: Error) {
    failed("flush", name, err);
}

// =============================================================================
// Traffic
// =============================================================================

#[inline]
pub fn trace_data_post(name: &str, handed_to: Option<ContextId>) {
    match handed_to {
        Some(ctx) => trace!("post on {name:?} handed to {ctx}"),
        None => trace!("post on {name:?} buffered"),
    }
}

#[inline]
pub fn trace_data_post_failed(name: &str, err: Error) {
    failed("post", name, err);
}

#[inline]
pub fn trace_data_pend(name: &str, peek: bool) {
    if peek {
        trace!("peek on {name:?}");
    } else {
        trace!("pend on {name:?}");
    }
}

#[inline]
pub fn trace_data_pend_block(name: &str, ctx: ContextId, timeout: Timeout) {
    trace!("{ctx} blocks on {name:?} ({timeout:?})");
}

#[inline]
pub fn trace_data_pend_failed(name: &str, err: Error) {
    failed("pend", name, err);
}

#[inline]
pub fn trace_data_abort(name: &str, aborted: usize) {
    debug!("aborted {aborted} waiter(s) on {name:?}");
}

#[inline]
pub fn trace_data_abort_failed(name: &str, err: Error) {
    failed("abort", name, err);
}

// =============================================================================
// Registry
// =============================================================================

#[inline]
pub fn trace_registry_add(name: &str, id: QueueId) {
    debug!("registry: added {id} {name:?}");
}

#[inline]
pub fn trace_registry_remove(id: QueueId) {
    debug!("registry: removed {id}");
}

#[inline]
pub fn trace_registry_skip(id: QueueId, reason: &str) {
    debug!("registry: {id} not tracked, {reason}");
}
