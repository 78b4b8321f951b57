/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * Console logger for the host port.  Kernel trace hooks go through the `log`
 * facade; on the host this prints them to stderr, one line per record.
 */

//! Host console logger
//!
//! ```ignore
//! rtos_data_queue::port::console::init(log::LevelFilter::Debug)?;
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static CURRENT_LEVEL: AtomicUsize = AtomicUsize::new(LevelFilter::Info as usize);

struct ConsoleLogger;

impl ConsoleLogger {
    fn level_prefix(level: Level) -> &'static str {
        match level {
            Level::Error => "[ERROR]",
            Level::Warn => "[WARN] ",
            Level::Info => "[INFO] ",
            Level::Debug => "[DEBUG]",
            Level::Trace => "[TRACE]",
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= current_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let current = thread::current();
        let thread_name = current.name().unwrap_or("-");
        // eprintln! so the test harness captures the line
        std::eprintln!(
            "{} [{}] [{}] {}",
            Self::level_prefix(record.level()),
            thread_name,
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Install the console logger at `level`.
///
/// Fails if another logger is already installed. A second call after a
/// successful one only changes the level.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    if INITIALIZED.load(Ordering::Acquire) {
        set_level(level);
        return Ok(());
    }
    log::set_logger(&LOGGER)?;
    INITIALIZED.store(true, Ordering::Release);
    set_level(level);
    Ok(())
}

/// Change the level at run time.
pub fn set_level(level: LevelFilter) {
    CURRENT_LEVEL.store(level as usize, Ordering::Relaxed);
    log::set_max_level(level);
}

pub fn current_level() -> LevelFilter {
    LevelFilter::iter()
        .nth(CURRENT_LEVEL.load(Ordering::Relaxed))
        .unwrap_or(LevelFilter::Info)
}
