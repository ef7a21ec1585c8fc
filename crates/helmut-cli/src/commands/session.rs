//! Foreground timer session driven from stdin.
//!
//! Commands, one per line: `p` pause, `r` resume, `s` skip, `c` complete,
//! `x` stop, `n` start the current task, `q` quit. Each committed tick
//! prints the remaining time as `MM:SS` with the share already elapsed. When
//! stdin closes the session keeps running until the timer goes idle.

use clap::Args;
use helmut_core::{format_time, SessionCoordinator, TaskId, TimerPhase};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{coordinator, open_store, CliResult};

#[derive(Args)]
pub struct SessionArgs {
    /// Task to start with (default: the first active task)
    #[arg(long)]
    task: Option<TaskId>,
}

pub fn run(args: SessionArgs) -> CliResult {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_session(args))
}

enum Flow {
    Continue,
    Quit,
}

async fn run_session(args: SessionArgs) -> CliResult {
    let coordinator = coordinator(open_store()?)?;
    if let Some(id) = args.task {
        coordinator.select_task(id)?;
    }
    if !start_current(&coordinator)? {
        return Ok(());
    }

    let mut timer = coordinator.engine().subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            changed = timer.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = timer.borrow_and_update().clone();
                match snap.phase {
                    TimerPhase::Running => println!(
                        "{} ({:.0}%)",
                        format_time(snap.remaining_secs as i64),
                        snap.progress() * 100.0
                    ),
                    TimerPhase::Paused => println!("paused at {}", format_time(snap.remaining_secs as i64)),
                    TimerPhase::Idle if !stdin_open => break,
                    TimerPhase::Idle => {}
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(cmd) => {
                        if let Flow::Quit = handle(&coordinator, cmd.trim())? {
                            break;
                        }
                    }
                    None => {
                        stdin_open = false;
                        if coordinator.timer().phase == TimerPhase::Idle {
                            break;
                        }
                    }
                }
            }
        }
    }

    coordinator.stop_timer();
    coordinator.alerts_settled().await;
    Ok(())
}

/// Start the current task. Returns false when the list is empty.
fn start_current(coordinator: &SessionCoordinator) -> Result<bool, Box<dyn std::error::Error>> {
    match coordinator.start_current()? {
        Some(task) => {
            println!(
                "started: {} ({})",
                task.title,
                format_time(task.estimated_secs() as i64)
            );
            Ok(true)
        }
        None => {
            println!("no active tasks");
            Ok(false)
        }
    }
}

fn handle(coordinator: &SessionCoordinator, cmd: &str) -> Result<Flow, Box<dyn std::error::Error>> {
    match cmd {
        "p" => {
            if coordinator.pause_timer().is_none() {
                println!("not running");
            }
        }
        "r" => {
            if coordinator.resume_timer().is_none() {
                println!("not paused");
            }
        }
        "x" => {
            if coordinator.stop_timer().is_some() {
                println!("stopped");
            }
        }
        "s" => match coordinator.skip_task() {
            Some(task) => println!("current: {}", task.title),
            None => println!("no active tasks"),
        },
        "c" => {
            let id = coordinator
                .engine()
                .active_task()
                .or_else(|| coordinator.current_task().map(|t| t.id));
            match id {
                Some(id) => {
                    let task = coordinator.complete_task(id)?;
                    println!("completed: {}", task.title);
                    if let Some(next) = coordinator.current_task() {
                        println!("current: {}", next.title);
                    }
                }
                None => println!("no active tasks"),
            }
        }
        "n" => {
            start_current(coordinator)?;
        }
        "q" => return Ok(Flow::Quit),
        "" => {}
        other => println!("unknown command: {other} (p r s c x n q)"),
    }
    Ok(Flow::Continue)
}
