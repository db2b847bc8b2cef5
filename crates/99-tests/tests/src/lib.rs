//! End-to-end suite: scripts driven through the simulated host.

#[cfg(test)]
mod demo_run;

#[cfg(test)]
mod key_routing;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use domain::TaskState;
    use host::{Runtime, RuntimeState, SimHost, SimHostConfig};
    use script_abi::TaskId;
    use testdata::{Entry, Journal, Probe, ProbeCatalog};

    pub(crate) fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn waiting_script_does_not_hold_up_its_neighbours() {
        init_logging();
        let journal = Journal::new();
        let catalog = ProbeCatalog::new([
            Probe::new("sleeper", &journal).waits([Duration::from_millis(250)]),
            Probe::new("busy", &journal),
            Probe::new("broken", &journal).failing_init(),
        ]);
        let mut runtime = Runtime::default();
        let mut host = SimHost::new(SimHostConfig {
            frame_interval: Duration::from_millis(10),
        });

        // Frame 0 initializes; the sleeper starts waiting on frame 1 and is
        // due again on frame 26, then starts its second cycle on frame 27.
        host.run(&mut runtime, &catalog, 30);
        assert_eq!(runtime.state(), RuntimeState::Running);
        assert_eq!(journal.ticks("busy"), 29);
        assert_eq!(journal.ticks("sleeper"), 2);
        assert!(journal.entries("sleeper").contains(&Entry::Resumed {
            tick: 1,
            delay: Duration::from_millis(250)
        }));
        assert_eq!(journal.entries("broken"), vec![Entry::Init]);

        let domain = runtime.domain().expect("running");
        assert_eq!(domain.task(TaskId(1)).expect("busy").ticks, 29);
        assert_eq!(
            domain.task(TaskId(2)).expect("broken").state,
            TaskState::Defective
        );
    }

    #[test]
    fn failures_in_one_script_leave_the_others_running() {
        init_logging();
        let journal = Journal::new();
        let catalog = ProbeCatalog::new([
            Probe::new("panicky", &journal).panicking_ticks([2, 4]),
            Probe::new("steady", &journal),
            Probe::new("quitter", &journal).retiring_on(3),
        ]);
        let mut runtime = Runtime::default();
        let mut host = SimHost::default();

        host.run(&mut runtime, &catalog, 8);
        assert_eq!(journal.ticks("panicky"), 7);
        assert_eq!(journal.ticks("steady"), 7);
        assert_eq!(journal.ticks("quitter"), 3);

        let domain = runtime.domain().expect("running");
        let panicky = domain.task(TaskId(0)).expect("panicky");
        assert_eq!(panicky.state, TaskState::Ready);
        assert_eq!(panicky.failures, 2);
        assert_eq!(
            domain.task(TaskId(2)).expect("quitter").state,
            TaskState::Defective
        );
    }
}
