//! The live-queue registry follows queues through create and delete once it
//! has been brought up. Kept to a single test: the registry is process-wide.

mod common;

use common::*;
use rtos_data_queue::kernel::registry;
use rtos_data_queue::{DeletePolicy, WaitPolicy};

#[test]
fn registry_tracks_live_queues() {
    let kernel = started_kernel();
    let (mut a, mut b, mut c) = ([0u8; 8], [0u8; 8], [0u8; 8]);

    // down: creation works, nothing is recorded
    let early = Queue::new(&kernel, "early");
    let early_id = early.create(&mut a, 4, 2, WaitPolicy::Priority).unwrap();
    assert_eq!(registry::find(early_id), None);

    registry::init();
    assert!(registry::is_initialised());
    let sensors = Queue::new(&kernel, "sensors");
    let id = sensors.create(&mut b, 2, 4, WaitPolicy::Arrival).unwrap();
    let entry = registry::find(id).unwrap();
    assert_eq!((entry.name, entry.capacity, entry.item_size), ("sensors", 2, 4));
    assert_eq!(registry::count(), 1);
    assert!(registry::snapshot().iter().any(|e| e.id == id));

    sensors.delete(DeletePolicy::NoPend).unwrap();
    assert_eq!(registry::find(id), None);
    assert_eq!(registry::count(), 0);

    // dropping a live queue removes its entry
    {
        let mut scratch = [0u8; 4];
        let scoped = Queue::new(&kernel, "scoped");
        let scoped_id = scoped.create(&mut scratch, 4, 1, WaitPolicy::Priority).unwrap();
        assert!(registry::find(scoped_id).is_some());
        drop(scoped);
        assert_eq!(registry::find(scoped_id), None);
    }
    assert_eq!(registry::count(), 0);

    let late = Queue::new(&kernel, "late");
    let late_id = late.create(&mut c, 8, 1, WaitPolicy::Priority).unwrap();
    assert!(registry::find(late_id).is_some());
    registry::teardown();
    assert!(!registry::is_initialised());
    assert_eq!(registry::count(), 0);
    // deleting an untracked queue is harmless
    late.delete(DeletePolicy::Always).unwrap();
}
