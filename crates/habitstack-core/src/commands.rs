mod focus;
mod journal;
mod settings;
mod tasks;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::cli::Command;
use crate::config::Config;
use crate::prefs::PreferenceStore;
use crate::reflection::ReflectionLog;
use crate::render::Renderer;
use crate::store::TaskStore;
use crate::task::TaskId;
use crate::workspace::Workspace;

pub type AppWorkspace = Workspace<Box<dyn TaskStore>>;

/// Everything a command handler may touch for one invocation.
pub struct Context<'a> {
    pub workspace: &'a mut AppWorkspace,
    pub prefs: PreferenceStore,
    pub reflections: ReflectionLog,
    pub cfg: &'a Config,
    pub renderer: &'a mut Renderer,
}

impl Context<'_> {
    /// Prints and clears pending notices.
    pub(crate) fn flush(&mut self) -> anyhow::Result<()> {
        let notices = self.workspace.drain_notices();
        self.renderer.print_notices(&notices)
    }

    /// Flushes notices raised so far, then surfaces the action's error.
    pub(crate) fn settle<T>(&mut self, result: crate::error::Result<T>) -> anyhow::Result<T> {
        self.flush()?;
        Ok(result?)
    }
}

#[instrument(skip(ctx, command))]
pub fn dispatch(ctx: &mut Context<'_>, command: Option<Command>) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = command.unwrap_or(Command::List { all: false });
    debug!(?command, "dispatching");

    if needs_tasks(&command) {
        let loaded = ctx.workspace.reload();
        ctx.settle(loaded)?;
    }

    match command {
        Command::Add(args) => tasks::add(ctx, args, now),
        Command::List { all } => tasks::list(ctx, all, now),
        Command::Edit(args) => tasks::edit(ctx, args, now),
        Command::Done { task } => tasks::done(ctx, &task, now),
        Command::Undone { task } => tasks::undone(ctx, &task, now),
        Command::Delete { task } => tasks::delete(ctx, &task, now),
        Command::Up { task } => tasks::move_up(ctx, &task, now),
        Command::Down { task } => tasks::move_down(ctx, &task, now),
        Command::Assign { task } => tasks::assign(ctx, &task, now),
        Command::Unassign { task } => tasks::unassign(ctx, &task, now),
        Command::Focus { task } => focus::focus(ctx, task.as_deref(), now),
        Command::Timer { work, break_minutes } => focus::timer(ctx, work, break_minutes, now),
        Command::Stats => journal::stats(ctx, now),
        Command::Reflect { mood, text } => journal::reflect(ctx, mood.as_deref(), &text, now),
        Command::Intro => journal::intro(ctx),
        Command::Theme {
            id,
            custom,
            clear_custom,
        } => settings::theme(ctx, id.as_deref(), custom, clear_custom),
        Command::Background { path, clear } => settings::background(ctx, path.as_deref(), clear),
        Command::Notifications { state } => settings::notifications(ctx, &state),
        Command::Show => settings::show(ctx),
    }
}

fn needs_tasks(command: &Command) -> bool {
    !matches!(
        command,
        Command::Theme { .. }
            | Command::Background { .. }
            | Command::Notifications { .. }
            | Command::Intro
            | Command::Show
    )
}

/// Accepts a full id, a 1-based position in today's stack, or an
/// unambiguous id prefix.
pub(crate) fn resolve_task(
    ws: &AppWorkspace,
    token: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<TaskId> {
    let token = token.trim();
    if let Some(task) = ws.tasks().iter().find(|t| t.id.as_str() == token) {
        return Ok(task.id.clone());
    }

    if let Ok(position) = token.parse::<usize>() {
        let today = ws.todays_tasks(now);
        return position
            .checked_sub(1)
            .and_then(|idx| today.get(idx))
            .map(|t| t.id.clone())
            .ok_or_else(|| anyhow!("no task at position {position} in today's stack"));
    }

    let mut matches = ws.tasks().iter().filter(|t| t.id.as_str().starts_with(token));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id.clone()),
        (Some(_), Some(_)) => Err(anyhow!("task id prefix '{token}' is ambiguous")),
        (None, _) => Err(anyhow!("no task matches '{token}'")),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::session::SessionSettings;
    use crate::store::MemoryTaskStore;
    use crate::task::tests::sample;

    fn workspace() -> AppWorkspace {
        let now = Utc::now().timestamp_millis();
        let store: Box<dyn TaskStore> = Box::new(MemoryTaskStore::with_tasks(vec![
            sample("abc123", now),
            sample("abd456", now + 1),
        ]));
        let mut ws = Workspace::new(store, Some("u".to_string()), SessionSettings::default());
        ws.reload().expect("reload");
        ws
    }

    #[test]
    fn resolves_by_id_position_and_prefix() {
        let ws = workspace();
        let now = Utc::now();
        let first = ws.todays_tasks(now)[0].id.clone();

        assert_eq!(resolve_task(&ws, "abc123", now).expect("id").as_str(), "abc123");
        assert_eq!(resolve_task(&ws, "1", now).expect("position"), first);
        assert_eq!(resolve_task(&ws, "abd", now).expect("prefix").as_str(), "abd456");
        assert!(resolve_task(&ws, "ab", now).is_err());
        assert!(resolve_task(&ws, "9", now).is_err());
        assert!(resolve_task(&ws, "zzz", now).is_err());
    }
}
