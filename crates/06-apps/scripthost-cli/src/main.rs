//! Runs the bundled scripts under the simulated host and prints a summary.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use demo_scripts::{DemoCatalog, SCRIPT_NAMES};
use domain::{DomainConfig, TaskInfo, MAX_SLOTS};
use host::{FrameReport, Runtime, RuntimeConfig, RuntimeState, SimHost, SimHostConfig};
use log::info;

/// Text rendering helpers used by the CLI.
mod render {
    use domain::TaskInfo;
    use host::FrameReport;
    use std::fmt::Write;

    /// Format one row per task, with the host invocation count of the slot
    /// the task ran in (`-` for tasks that never got a slot).
    pub fn tasks(tasks: &[TaskInfo], invocations: &[Option<u64>]) -> String {
        let mut out = String::new();
        writeln!(
            out,
            "{:<4} {:<16} {:<14} {:>6} {:>8} {:>6}",
            "ID", "NAME", "STATE", "TICKS", "FAILURES", "CALLS"
        )
        .expect("write header");
        for (idx, task) in tasks.iter().enumerate() {
            let calls = match invocations.get(idx).copied().flatten() {
                Some(calls) => calls.to_string(),
                None => "-".to_string(),
            };
            writeln!(
                out,
                "{:<4} {:<16} {:<14} {:>6} {:>8} {:>6}",
                task.id.0,
                task.name,
                task.state.to_string(),
                task.ticks,
                task.failures,
                calls
            )
            .expect("write task");
        }
        out
    }

    /// Format the totals over a run of frames.
    pub fn frames(reports: &[FrameReport]) -> String {
        let invoked: usize = reports.iter().map(|r| r.invoked).sum();
        let keys: usize = reports.iter().map(|r| r.key_deliveries).sum();
        let presented: usize = reports.iter().map(|r| r.present.delivered).sum();
        let failed: usize = reports.iter().map(|r| r.present.failed).sum();
        format!(
            "Ran {} frame(s): {invoked} invocation(s), {keys} key delivery(ies), \
             {presented} present(s), {failed} present failure(s)\n",
            reports.len()
        )
    }

    /// Format the list of bundled scripts.
    pub fn script_list(names: &[&str]) -> String {
        let mut out = String::new();
        for (idx, name) in names.iter().enumerate() {
            writeln!(out, "{idx:>2}: {name}").expect("write name");
        }
        out
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Run scripts under a simulated game host", long_about = None)]
struct Cli {
    /// Number of frames to simulate.
    #[arg(short, long, value_parser = parse_u64, default_value_t = 120)]
    frames: u64,

    /// Virtual milliseconds per frame.
    #[arg(long, value_parser = parse_u64, default_value_t = 16)]
    frame_ms: u64,

    /// Only load the named script (repeatable). Defaults to every bundled script.
    #[arg(short, long = "script", value_name = "NAME")]
    scripts: Vec<String>,

    /// Maximum number of scripts bound to host slots.
    #[arg(long, value_parser = parse_u64, default_value_t = MAX_SLOTS as u64)]
    slot_limit: u64,

    /// Press a key at a frame, e.g. `0x20@10` (repeatable).
    #[arg(short, long = "key", value_parser = parse_key_press, value_name = "KEY@FRAME")]
    keys: Vec<KeyPress>,

    /// Frames a scheduled key stays down.
    #[arg(long, value_parser = parse_u64, default_value_t = 2)]
    hold: u64,

    /// Print the bundled scripts and exit.
    #[arg(long)]
    list: bool,

    /// Log filter, in `RUST_LOG` syntax. `RUST_LOG` wins when set.
    #[arg(long, default_value = "info")]
    log: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct KeyPress {
    key: u32,
    frame: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log.as_str()))
        .init();

    if cli.list {
        print!("{}", render::script_list(&SCRIPT_NAMES));
        return Ok(());
    }

    let catalog = if cli.scripts.is_empty() {
        DemoCatalog::all()
    } else {
        DemoCatalog::only(cli.scripts.iter().cloned())
    };
    let slot_limit = usize::try_from(cli.slot_limit).context("slot limit out of range")?;
    let mut runtime = Runtime::new(RuntimeConfig {
        domain: DomainConfig { slot_limit },
    });
    let mut host = SimHost::new(SimHostConfig {
        frame_interval: Duration::from_millis(cli.frame_ms),
    });
    for press in &cli.keys {
        host.schedule_press(press.frame, cli.hold, press.key);
    }

    info!(
        "simulating {} frame(s) of {} ms over {:?}",
        cli.frames,
        cli.frame_ms,
        catalog.names()
    );
    let reports: Vec<FrameReport> = host.run(&mut runtime, &catalog, cli.frames);
    if runtime.state() == RuntimeState::Failed {
        bail!("script runtime failed to start; see the log for the cause");
    }

    let domain = runtime.domain().context("script runtime is not running")?;
    let tasks: Vec<TaskInfo> = domain.tasks().collect();
    let invocations: Vec<Option<u64>> = tasks
        .iter()
        .map(|task| {
            domain
                .slots()
                .slot_for(task.id)
                .and_then(|slot| host.invocations(slot.index()))
        })
        .collect();

    print!("{}", render::frames(&reports));
    print!("{}", render::tasks(&tasks, &invocations));

    runtime.unload(&mut host);
    Ok(())
}

fn parse_u64(input: &str) -> Result<u64, String> {
    if let Some(stripped) = input.strip_prefix("0x") {
        u64::from_str_radix(stripped, 16).map_err(|_| format!("invalid hex value '{input}'"))
    } else {
        input
            .parse::<u64>()
            .map_err(|_| format!("invalid number '{input}'"))
    }
}

fn parse_u32(input: &str) -> Result<u32, String> {
    if let Some(stripped) = input.strip_prefix("0x") {
        u32::from_str_radix(stripped, 16).map_err(|_| format!("invalid hex value '{input}'"))
    } else {
        input
            .parse::<u32>()
            .map_err(|_| format!("invalid number '{input}'"))
    }
}

fn parse_key_press(input: &str) -> Result<KeyPress, String> {
    let (key, frame) = input
        .split_once('@')
        .ok_or_else(|| format!("expected KEY@FRAME, got '{input}'"))?;
    Ok(KeyPress {
        key: parse_u32(key)?,
        frame: parse_u64(frame)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{PresentReport, TaskState};
    use script_abi::TaskId;

    #[test]
    fn key_press_accepts_hex_and_decimal() {
        assert_eq!(
            parse_key_press("0x20@10"),
            Ok(KeyPress {
                key: 0x20,
                frame: 10
            })
        );
        assert_eq!(
            parse_key_press("65@0x3"),
            Ok(KeyPress { key: 65, frame: 3 })
        );
    }

    #[test]
    fn key_press_rejects_malformed_input() {
        assert!(parse_key_press("65").is_err());
        assert!(parse_key_press("0xZZ@1").is_err());
        assert!(parse_key_press("65@soon").is_err());
    }

    #[test]
    fn task_table_marks_unbound_tasks() {
        let tasks = [
            TaskInfo {
                id: TaskId(0),
                name: "heartbeat".into(),
                state: TaskState::Ready,
                ticks: 3,
                failures: 0,
            },
            TaskInfo {
                id: TaskId(1),
                name: "faulty".into(),
                state: TaskState::Uninitialized,
                ticks: 0,
                failures: 0,
            },
        ];
        let out = render::tasks(&tasks, &[Some(7), None]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert_eq!(
            lines[1].split_whitespace().collect::<Vec<_>>(),
            ["0", "heartbeat", "ready", "3", "0", "7"]
        );
        assert_eq!(
            lines[2].split_whitespace().collect::<Vec<_>>(),
            ["1", "faulty", "uninitialized", "0", "0", "-"]
        );
    }

    #[test]
    fn frame_totals_sum_every_report() {
        let reports = [
            FrameReport {
                frame: 0,
                key_deliveries: 0,
                invoked: 2,
                present: PresentReport {
                    delivered: 1,
                    failed: 0,
                },
            },
            FrameReport {
                frame: 1,
                key_deliveries: 2,
                invoked: 1,
                present: PresentReport {
                    delivered: 1,
                    failed: 1,
                },
            },
        ];
        assert_eq!(
            render::frames(&reports),
            "Ran 2 frame(s): 3 invocation(s), 2 key delivery(ies), 2 present(s), 1 present failure(s)\n"
        );
    }

    #[test]
    fn script_list_is_numbered() {
        assert_eq!(render::script_list(&["a", "b"]), " 0: a\n 1: b\n");
    }

    #[test]
    fn cli_parses_repeated_flags() {
        let cli = Cli::try_parse_from([
            "scripthost",
            "--frames",
            "10",
            "-s",
            "heartbeat",
            "-s",
            "blinker",
            "-k",
            "0x41@2",
        ])
        .expect("valid arguments");
        assert_eq!(cli.frames, 10);
        assert_eq!(cli.scripts, ["heartbeat", "blinker"]);
        assert_eq!(cli.keys, [KeyPress { key: 0x41, frame: 2 }]);
        assert_eq!(cli.slot_limit, MAX_SLOTS as u64);
    }
}
