use std::time::Duration;

use demo_scripts::{DemoCatalog, SCRIPT_NAMES};
use domain::{TaskInfo, TaskState};
use host::{Runtime, RuntimeState, SimHost, SimHostConfig};

use crate::tests::init_logging;

fn task<'a>(tasks: &'a [TaskInfo], name: &str) -> &'a TaskInfo {
    tasks
        .iter()
        .find(|task| task.name == name)
        .expect("bundled script")
}

#[test]
fn bundled_scripts_run_for_two_virtual_seconds() {
    init_logging();
    let catalog = DemoCatalog::all();
    let mut runtime = Runtime::default();
    let mut host = SimHost::new(SimHostConfig {
        frame_interval: Duration::from_millis(10),
    });
    host.schedule_press(5, 1, 0x20);

    let reports = host.run(&mut runtime, &catalog, 200);
    assert_eq!(runtime.state(), RuntimeState::Running);
    assert_eq!(host.registered(), SCRIPT_NAMES.len());

    // Everything but the faulty script is live when the key goes down.
    assert_eq!(reports[5].key_deliveries, SCRIPT_NAMES.len() - 1);
    // Only the blinker draws.
    assert!(reports.iter().all(|report| report.present.delivered == 1));
    assert!(reports.iter().all(|report| report.present.failed == 0));

    let tasks: Vec<TaskInfo> = runtime.domain().expect("running").tasks().collect();
    assert_eq!(task(&tasks, "faulty").state, TaskState::Defective);
    assert_eq!(task(&tasks, "countdown").state, TaskState::Defective);
    assert_eq!(task(&tasks, "heartbeat").state, TaskState::Ready);
    // Each key-counter cycle yields once, so it completes every other frame.
    assert_eq!(task(&tasks, "key-counter").ticks, 99);

    let flaky = task(&tasks, "flaky");
    assert_eq!(flaky.state, TaskState::Ready);
    assert!(flaky.failures > 0);

    runtime.unload(&mut host);
    assert_eq!(host.registered(), 0);
}
