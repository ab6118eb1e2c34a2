use std::io::{self, BufRead, Write};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use super::{Context, resolve_task};
use crate::session::{Pacer, SessionState};

const POLL: Duration = Duration::from_millis(200);

/// Runs a focus session in the foreground, on `token` or on the head of
/// today's stack.
#[instrument(skip(ctx, now))]
pub(super) fn focus(ctx: &mut Context<'_>, token: Option<&str>, now: DateTime<Utc>) -> anyhow::Result<()> {
    match token {
        Some(token) => {
            let id = resolve_task(ctx.workspace, token, now)?;
            let started = ctx.workspace.start_task(&id, now);
            ctx.settle(started)?;
        }
        None => {
            if ctx.workspace.start_focus_session(now).is_none() {
                ctx.flush()?;
                println!("Nothing pending in today's stack.");
                return Ok(());
            }
        }
    }
    ctx.flush()?;
    run_loop(ctx)
}

#[instrument(skip(ctx, now))]
pub(super) fn timer(
    ctx: &mut Context<'_>,
    work: Option<u32>,
    break_minutes: Option<u32>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let settings = ctx.workspace.session().settings().clone();
    ctx.workspace.set_standalone_durations(
        work.unwrap_or(settings.standalone_work_minutes),
        break_minutes.unwrap_or(settings.standalone_break_minutes),
    );
    ctx.workspace.start_standalone(now);
    ctx.flush()?;
    run_loop(ctx)
}

/// Drives the session off the wall clock until it goes idle. The only
/// interactive points are the post-focus choice and the standalone
/// phase changes.
fn run_loop(ctx: &mut Context<'_>) -> anyhow::Result<()> {
    let mut pacer = Pacer::start(Instant::now());
    draw(ctx)?;

    loop {
        match ctx.workspace.session().state() {
            SessionState::Idle => break,
            SessionState::Completed(task) => {
                let title = task.title.clone();
                println!();
                let choice = prompt(&format!(
                    "\"{title}\" complete. [b]reak, [n]ext task or [f]inish? "
                ))?;
                let now = Utc::now();
                match choice.as_deref() {
                    Some("" | "b" | "break") => {
                        ctx.workspace.take_break();
                    }
                    Some("n" | "next") => {
                        ctx.workspace.start_next(now);
                        if ctx.workspace.session().state() == &SessionState::Idle {
                            println!("No pending tasks left today.");
                        }
                    }
                    _ => {
                        ctx.workspace.finish();
                    }
                }
                ctx.flush()?;
                pacer.resync(Instant::now());
                draw(ctx)?;
                continue;
            }
            SessionState::Paused(c) => {
                let question = if c.is_break {
                    "Start your break? [Y/n] "
                } else {
                    "Break over. Start another focus round? [Y/n] "
                };
                println!();
                let answer = prompt(question)?;
                match answer.as_deref() {
                    None | Some("n" | "no") => {
                        ctx.workspace.stop(Utc::now());
                        break;
                    }
                    Some(_) => {
                        ctx.workspace.resume();
                    }
                }
                pacer.resync(Instant::now());
                draw(ctx)?;
                continue;
            }
            _ => {}
        }

        thread::sleep(POLL);
        let elapsed = pacer.elapsed(Instant::now());
        if elapsed.is_zero() {
            continue;
        }
        let events = ctx.workspace.advance(elapsed, Utc::now());
        if !events.is_empty() {
            debug!(count = events.len(), "session events");
            println!();
            ctx.flush()?;
        }
        draw(ctx)?;
    }

    println!();
    info!("session loop finished");
    ctx.flush()
}

fn draw(ctx: &mut Context<'_>) -> anyhow::Result<()> {
    let session = ctx.workspace.session();
    let title = session.active_task().map(|t| t.title.as_str());
    ctx.renderer.print_session(session, title)
}

/// One trimmed, lowercased line from stdin; `None` at end of input.
fn prompt(question: &str) -> anyhow::Result<Option<String>> {
    print!("{question}");
    io::stdout().flush()?;
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_ascii_lowercase()))
}
