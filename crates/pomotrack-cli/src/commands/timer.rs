use std::time::Duration;

use clap::Subcommand;
use pomotrack_core::{AppConfig, ControllerOptions, Event, TimerController, Tracker};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::{open_tracker, CmdResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run a timer, reading commands from stdin and printing events as JSON lines.
    ///
    /// Commands: start, pause, toggle, reset, interrupt <reason>, abort,
    /// status, reload, retry, quit.
    ///
    /// `reload` re-reads the user's settings; a started interval keeps its
    /// length and the new values apply from the next phase.
    Run {
        /// Start the next phase without waiting
        #[arg(long)]
        auto_start: bool,
        /// Record finished breaks as sessions
        #[arg(long)]
        record_breaks: bool,
        /// Milliseconds per timer second [default: from config]
        #[arg(long)]
        tick_ms: Option<u64>,
    },
}

pub fn run(action: TimerAction, user: &str, config: &AppConfig) -> CmdResult {
    match action {
        TimerAction::Run {
            auto_start,
            record_breaks,
            tick_ms,
        } => {
            let tracker = open_tracker(config)?;
            let options = ControllerOptions {
                tick_interval: Duration::from_millis(tick_ms.unwrap_or(config.timer.tick_ms).max(1)),
                record_breaks: record_breaks || config.timer.record_breaks,
                auto_start: auto_start || config.timer.auto_start,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let result = runtime.block_on(async {
                let controller = tracker.controller(user, options)?;
                run_interactive(&tracker, controller).await
            });
            // The stdin reader blocks a worker thread until the next line.
            runtime.shutdown_timeout(Duration::from_millis(100));
            result
        }
    }
}

fn print_line<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Continue reading commands unless this returns false.
async fn handle_command(
    tracker: &Tracker,
    controller: &TimerController,
    line: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let (command, rest) = line
        .split_once(char::is_whitespace)
        .map(|(c, r)| (c, r.trim()))
        .unwrap_or((line, ""));

    match command {
        "" => {}
        "start" => {
            controller.start().await;
        }
        "pause" => {
            controller.pause().await;
        }
        "toggle" | "t" => {
            controller.toggle().await;
        }
        "reset" => {
            controller.reset().await;
        }
        "interrupt" => {
            if rest.is_empty() {
                return Err("interrupt needs a reason; use abort otherwise".into());
            }
            controller.interrupt(Some(rest.to_string())).await?;
        }
        "abort" => {
            controller.interrupt(None).await?;
        }
        "status" => print_line(&controller.snapshot().await)?,
        "reload" => {
            let settings = tracker.settings(controller.user())?;
            controller.apply_settings(settings).await;
            info!(user = controller.user(), "settings reloaded");
        }
        "retry" => {
            let n = controller.retry_pending();
            info!(count = n, "retrying pending recordings");
        }
        "quit" | "q" | "exit" => return Ok(false),
        other => return Err(format!("unknown command: {other}").into()),
    }
    Ok(true)
}

async fn run_interactive(tracker: &Tracker, controller: TimerController) -> CmdResult {
    let mut events = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_line(&controller.snapshot().await)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_command(tracker, &controller, line.trim()).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            event = events.recv() => match event {
                Ok(event) => print_line(&event)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event output fell behind"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.shutdown().await;
    drain(&mut events)?;

    let pending = controller.pending();
    if !pending.is_empty() {
        warn!(count = pending.len(), "exiting with unrecorded intervals");
        print_line(&pending)?;
    }
    Ok(())
}

fn drain(events: &mut tokio::sync::broadcast::Receiver<Event>) -> CmdResult {
    while let Ok(event) = events.try_recv() {
        print_line(&event)?;
    }
    Ok(())
}
