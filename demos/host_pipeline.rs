//! Data Queue Demo Application
//!
//! Runs on the host port and shows the data queue in a small pipeline:
//! - a simulated sensor interrupt posts readings with FIFO-overwrite, so a
//!   slow consumer only ever sees the newest ones
//! - a filter task pends with a timeout and forwards averages on a second
//!   queue
//! - a logger task blocks forever on the second queue until it is deleted
//!
//! Run with `cargo run --example host_pipeline --features std`.

use std::thread;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use log::{info, warn};

use rtos_data_queue::kernel::registry;
use rtos_data_queue::port::{console, HostKernel};
use rtos_data_queue::sync::TypedDataQueue;
use rtos_data_queue::{DeletePolicy, Error, PostFlags, PostMode, Priority, WaitPolicy};

// =============================================================================
// Task Priorities
// =============================================================================

const PRIORITY_LOGGER: Priority = Priority(1);
const PRIORITY_FILTER: Priority = Priority(3);
const PRIORITY_SENSOR: Priority = Priority(5);

const READINGS: u16 = 40;

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Reading {
    channel: u16,
    seq: u16,
    millivolts: i32,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Average {
    samples: u32,
    millivolts: i32,
}

fn main() {
    if let Err(err) = console::init(log::LevelFilter::Debug) {
        eprintln!("logger: {err}");
    }
    registry::init();

    let kernel = HostKernel::new();
    let mut reading_slots = [Reading::zeroed(); 4];
    let mut average_slots = [Average::zeroed(); 2];

    let readings: TypedDataQueue<'_, Reading, HostKernel> = TypedDataQueue::new(&kernel, "readings");
    let averages: TypedDataQueue<'_, Average, HostKernel> = TypedDataQueue::new(&kernel, "averages");
    readings
        .create(&mut reading_slots, WaitPolicy::Priority)
        .expect("create readings");
    averages
        .create(&mut average_slots, WaitPolicy::Priority)
        .expect("create averages");
    info!("{} queue(s) registered", registry::count());

    kernel.start();

    thread::scope(|s| {
        // Logger: blocks until the averages queue is deleted.
        let logger = kernel.spawn(s, PRIORITY_LOGGER, || loop {
            match averages.receive() {
                Ok(avg) => info!("average of {} samples: {} mV", avg.samples, avg.millivolts),
                // deleted while waiting, or before the next receive
                Err(Error::ObjDeleted | Error::ObjType) => break,
                Err(err) => warn!("logger: {err}"),
            }
        });

        // Filter: averages whatever arrived within each 20 tick window.
        let filter = kernel.spawn(s, PRIORITY_FILTER, || {
            let (mut samples, mut sum) = (0u32, 0i32);
            let forward = |samples: u32, sum: i32| {
                if samples == 0 {
                    return;
                }
                let avg = Average {
                    samples,
                    millivolts: sum / samples as i32,
                };
                if let Err(err) = averages.overwrite(&avg) {
                    warn!("filter: {err}");
                }
            };
            loop {
                match readings.receive_timeout(20) {
                    Ok(r) => {
                        log::trace!("ch{} #{}: {} mV", r.channel, r.seq, r.millivolts);
                        samples += 1;
                        sum += r.millivolts;
                        if r.seq + 1 == READINGS {
                            forward(samples, sum);
                            break;
                        }
                    }
                    Err(Error::Timeout) => {
                        forward(samples, sum);
                        (samples, sum) = (0, 0);
                    }
                    Err(err) => {
                        warn!("filter: {err}");
                        break;
                    }
                }
            }
        });

        // Sensor interrupt: bursts of readings, newest wins when the queue is full.
        kernel.spawn(s, PRIORITY_SENSOR, || {
            for seq in 0..READINGS {
                let isr = kernel.enter_isr();
                let reading = Reading {
                    channel: 0,
                    seq,
                    millivolts: 3300 - i32::from(seq) * 7,
                };
                if let Err(err) = readings.post(&reading, PostMode::FifoOverwrite, PostFlags::NO_SCHED) {
                    warn!("sensor: {err}");
                }
                drop(isr);
                if seq % 8 == 7 {
                    thread::sleep(Duration::from_millis(50));
                }
            }
        });

        filter.join().expect("filter task");
        // let the logger drain the last average
        while !averages.is_empty() {
            thread::yield_now();
        }
        let woken = averages.raw().delete(DeletePolicy::Always).expect("delete averages");
        info!("averages deleted, {woken} waiter(s) released");
        logger.join().expect("logger task");
    });

    info!(
        "readings peaked at {} of {} slots",
        readings.raw().max_count(),
        readings.raw().capacity()
    );
}
