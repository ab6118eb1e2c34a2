use chrono::{DateTime, Utc};
use tracing::instrument;

use super::Context;
use crate::notice::Notice;
use crate::reflection::{Mood, prompts};

const INTRO: [(&str, &str); 4] = [
    (
        "Welcome to HabitStack!",
        "Your personal productivity companion for building better habits through focused work sessions.",
    ),
    (
        "Create your tasks",
        "Add the tasks you want to complete with `habitstack add`, each with a realistic time estimate.",
    ),
    (
        "Focus with the pomodoro timer",
        "`habitstack focus` counts down the head of today's stack; `habitstack timer` runs a plain pomodoro.",
    ),
    (
        "Track your progress",
        "`habitstack stats` shows today's completion rate and `habitstack reflect` keeps a daily journal.",
    ),
];

pub(super) fn stats(ctx: &mut Context<'_>, now: DateTime<Utc>) -> anyhow::Result<()> {
    let stats = ctx.workspace.stats(now);
    ctx.renderer.print_stats(&stats)
}

/// With no text, shows today's entry or the writing prompts; otherwise
/// saves today's entry with the current counters.
#[instrument(skip(ctx, text, now))]
pub(super) fn reflect(
    ctx: &mut Context<'_>,
    mood: Option<&str>,
    text: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let (completed, focus_minutes) = ctx.workspace.reflection_counters(now);

    if text.is_empty() {
        if let Some(existing) = ctx.reflections.get(now) {
            return ctx.renderer.print_reflection(existing);
        }
        println!("No reflection yet today. Some prompts:");
        for prompt in prompts(completed) {
            println!("  - {prompt}");
        }
        return Ok(());
    }

    let mood = match mood {
        Some(raw) => raw.parse::<Mood>()?,
        None => Mood::default(),
    };
    let saved = ctx
        .reflections
        .save(now, mood, &text.join(" "), completed, focus_minutes)?
        .clone();
    let notice = Notice::success("Reflection saved", "Your daily reflection has been saved.");
    ctx.renderer.print_notices(&[notice])?;
    ctx.renderer.print_reflection(&saved)
}

pub(super) fn intro(ctx: &mut Context<'_>) -> anyhow::Result<()> {
    let total = INTRO.len();
    for (idx, (title, body)) in INTRO.iter().enumerate() {
        println!("[{}/{total}] {title}", idx + 1);
        println!("    {body}");
        println!();
    }
    ctx.prefs.mark_intro_seen()?;
    Ok(())
}
