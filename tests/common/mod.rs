#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};

use rtos_data_queue::port::{console, HostKernel};
use rtos_data_queue::DataQueue;

pub type Queue<'a> = DataQueue<'a, HostKernel>;

pub fn init_logging() {
    let _ = console::init(log::LevelFilter::Debug);
}

pub fn started_kernel() -> HostKernel {
    init_logging();
    let kernel = HostKernel::new();
    kernel.start();
    kernel
}

/// Spin until `n` contexts are blocked on `q`.
pub fn wait_for_waiters<S, const W: usize>(q: &DataQueue<'_, S, W>, n: usize)
where
    S: rtos_data_queue::Scheduler,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while q.waiter_count() != n {
        assert!(Instant::now() < deadline, "expected {n} waiter(s), have {}", q.waiter_count());
        thread::sleep(Duration::from_millis(1));
    }
}
