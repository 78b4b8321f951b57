/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * Error codes returned by the data queue services.
 */

//! Kernel error codes
//!
//! Every data queue operation reports failure through [`Error`]. Each
//! variant is a distinct kind so callers can react to, for example, a
//! timeout differently from an abort. [`Error::kind`] groups them the way
//! the kernel checks them: validation first, then context, then object
//! state, and finally the outcome of the operation itself.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Broad class of an [`Error`], in the order the kernel checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad argument; nothing was touched.
    Validation,
    /// The call was made from a context that may not make it.
    Context,
    /// The object is not in a state that permits the call.
    State,
    /// The operation ran and this is how it ended.
    Outcome,
    /// A fixed-size kernel resource ran out.
    Resource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    // --- validation ---
    #[error("storage area is too small for capacity * item size")]
    PtrInvalid,
    #[error("queue capacity must be at least one item")]
    QueueSize,
    #[error("item size is zero or does not match the queue")]
    DataSize,
    #[error("invalid option")]
    OptInvalid,

    // --- context ---
    #[error("cannot create a queue from an interrupt handler")]
    CreateIsr,
    #[error("cannot delete a queue from an interrupt handler")]
    DeleteIsr,
    #[error("cannot flush a queue from an interrupt handler")]
    FlushIsr,
    #[error("cannot block from an interrupt handler")]
    PendIsr,
    #[error("cannot block from a timer callback")]
    PendTimer,
    #[error("cannot abort waiters from an interrupt handler")]
    PendAbortIsr,
    #[error("kernel is not running")]
    OsNotRunning,
    #[error("cannot block while the scheduler is locked")]
    SchedLocked,
    #[error("objects cannot be created after safety-critical start")]
    IllegalCreateRunTime,
    #[error("objects cannot be deleted after safety-critical start")]
    IllegalDeleteRunTime,

    // --- state ---
    #[error("object is not an active data queue")]
    ObjType,
    #[error("data queue was already created")]
    ObjCreated,

    // --- outcome ---
    #[error("queue is empty and the pend would block")]
    PendWouldBlock,
    #[error("queue is empty, nothing to peek at")]
    PendEmpty,
    #[error("queue is full")]
    QueueFull,
    #[error("timed out waiting for data")]
    Timeout,
    #[error("wait was aborted")]
    PendAbort,
    #[error("queue was deleted while waiting")]
    ObjDeleted,
    #[error("tasks are waiting on the queue")]
    TaskWaiting,
    #[error("no task was waiting on the queue")]
    PendAbortNone,

    // --- resource ---
    #[error("too many contexts waiting on the queue")]
    WaitListFull,
}

impl Error {
    /// Group this error belongs to.
    pub const fn kind(self) -> ErrorKind {
        use Error::*;
        match self {
            PtrInvalid | QueueSize | DataSize | OptInvalid => ErrorKind::Validation,
            CreateIsr | DeleteIsr | FlushIsr | PendIsr | PendTimer | PendAbortIsr
            | OsNotRunning | SchedLocked | IllegalCreateRunTime | IllegalDeleteRunTime => {
                ErrorKind::Context
            }
            ObjType | ObjCreated => ErrorKind::State,
            PendWouldBlock | PendEmpty | QueueFull | Timeout | PendAbort | ObjDeleted
            | TaskWaiting | PendAbortNone => ErrorKind::Outcome,
            WaitListFull => ErrorKind::Resource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_check_order() {
        assert_eq!(Error::DataSize.kind(), ErrorKind::Validation);
        assert_eq!(Error::PendIsr.kind(), ErrorKind::Context);
        assert_eq!(Error::ObjType.kind(), ErrorKind::State);
        assert_eq!(Error::Timeout.kind(), ErrorKind::Outcome);
        assert_eq!(Error::WaitListFull.kind(), ErrorKind::Resource);
    }

    #[test]
    fn display_is_human_readable() {
        extern crate std;
        use std::string::ToString;
        assert_eq!(Error::QueueFull.to_string(), "queue is full");
        assert_eq!(Error::ObjDeleted.to_string(), "queue was deleted while waiting");
    }
}
