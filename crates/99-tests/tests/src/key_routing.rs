use std::thread;
use std::time::Duration;

use host::{Runtime, SimHost, SimHostConfig};
use script_abi::{KeyEvent, TaskId};
use testdata::{Entry, Journal, Probe, ProbeCatalog};

use crate::tests::init_logging;

fn sim() -> SimHost {
    SimHost::new(SimHostConfig {
        frame_interval: Duration::from_millis(10),
    })
}

#[test]
fn keys_posted_from_other_threads_arrive_in_order() {
    init_logging();
    let journal = Journal::new();
    let catalog = ProbeCatalog::new([Probe::new("listener", &journal)]);
    let mut runtime = Runtime::default();
    let mut host = sim();
    host.run(&mut runtime, &catalog, 1);

    let router = runtime.key_router().expect("running");
    thread::spawn(move || {
        for key in 1..=50 {
            let posted = router.post(TaskId(0), key % 2 == 1, KeyEvent::new(key));
            assert!(matches!(posted, Ok(true)));
        }
    })
    .join()
    .expect("producer thread");

    host.run_frame(&mut runtime, &catalog);
    let keys: Vec<Entry> = journal
        .entries("listener")
        .into_iter()
        .filter(|entry| matches!(entry, Entry::KeyDown(_) | Entry::KeyUp(_)))
        .collect();
    let expected: Vec<Entry> = (1..=50)
        .map(|key| {
            if key % 2 == 1 {
                Entry::KeyDown(key)
            } else {
                Entry::KeyUp(key)
            }
        })
        .collect();
    assert_eq!(keys, expected);
}

#[test]
fn keys_for_a_waiting_script_are_delivered_after_the_wait() {
    init_logging();
    let journal = Journal::new();
    let catalog = ProbeCatalog::new([
        Probe::new("sleeper", &journal).waits([Duration::from_millis(50)])
    ]);
    let mut runtime = Runtime::default();
    let mut host = sim();
    host.schedule_press(2, 1, 0x41);

    // Tick 1 starts waiting on frame 1 and resumes on frame 6; the press
    // lands mid-wait and is drained when tick 2 starts on frame 7.
    host.run(&mut runtime, &catalog, 8);
    let entries = journal.entries("sleeper");
    let resumed = entries
        .iter()
        .position(|entry| matches!(entry, Entry::Resumed { tick: 1, .. }))
        .expect("first wait finished");
    let down = entries
        .iter()
        .position(|entry| *entry == Entry::KeyDown(0x41))
        .expect("key delivered");
    let tick2 = entries
        .iter()
        .position(|entry| *entry == Entry::Tick(2))
        .expect("second cycle");
    assert!(resumed < down);
    assert!(down < tick2);
}

#[test]
fn retired_scripts_stop_receiving_keys() {
    init_logging();
    let journal = Journal::new();
    let catalog = ProbeCatalog::new([
        Probe::new("quitter", &journal).retiring_on(1),
        Probe::new("stayer", &journal),
    ]);
    let mut runtime = Runtime::default();
    let mut host = sim();
    host.schedule_press(3, 1, 0x20);

    let reports = host.run(&mut runtime, &catalog, 5);
    assert_eq!(reports[3].key_deliveries, 1);
    assert!(!journal.entries("quitter").contains(&Entry::KeyDown(0x20)));
    assert!(journal.entries("stayer").contains(&Entry::KeyDown(0x20)));

    let router = runtime.key_router().expect("running");
    assert_eq!(router.live(), 1);
    assert!(matches!(
        router.post(TaskId(0), true, KeyEvent::new(1)),
        Ok(false)
    ));
}
