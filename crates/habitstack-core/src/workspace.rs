//! Application controller: the task collection, the single focus session
//! and the store they are persisted through.
//!
//! Every mutation goes to the store first and is followed by a full reload;
//! the in-memory collection is never patched on success. The one exception
//! is session completion, which marks the task locally before the store
//! answers and keeps that mark even if the write fails.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::notice::{Notice, NoticeQueue};
use crate::ordering;
use crate::session::{FocusSession, SessionEvent, SessionSettings};
use crate::store::TaskStore;
use crate::task::{NewTask, Task, TaskEdit, TaskId, TaskPatch};
use crate::views::{self, DailyStats};

pub struct Workspace<S: TaskStore> {
    store: S,
    user: Option<String>,
    tasks: Vec<Task>,
    session: FocusSession,
    notices: NoticeQueue,
}

impl<S: TaskStore> Workspace<S> {
    pub fn new(store: S, user: Option<String>, settings: SessionSettings) -> Self {
        Self {
            store,
            user,
            tasks: Vec::new(),
            session: FocusSession::new(settings),
            notices: NoticeQueue::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Every task, newest-created first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn session(&self) -> &FocusSession {
        &self.session
    }

    pub fn todays_tasks(&self, now: DateTime<Utc>) -> Vec<&Task> {
        ordering::todays_tasks(&self.tasks, now)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> DailyStats {
        DailyStats::compute(&self.tasks, now)
    }

    /// Counters captured into a reflection when it is saved.
    pub fn reflection_counters(&self, now: DateTime<Utc>) -> (usize, u32) {
        (
            views::completed_today(&self.tasks, now).len(),
            views::total_time_spent(&self.tasks, now),
        )
    }

    /// First pending task of today's stack other than the one in session.
    pub fn next_pending(&self, now: DateTime<Utc>) -> Option<&Task> {
        ordering::pending_today(&self.tasks, now)
            .into_iter()
            .find(|t| !self.session.is_bound_to(&t.id))
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// Reduces a failed action to an error notice.
    pub fn report<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(error = %err, "action failed");
                self.notices.push(Notice::from_error(&err));
                None
            }
        }
    }

    #[instrument(skip(self))]
    pub fn reload(&mut self) -> Result<()> {
        self.tasks = self.store.list_tasks()?;
        debug!(count = self.tasks.len(), "task collection reloaded");
        Ok(())
    }

    fn require_user(&self) -> Result<String> {
        self.user.clone().ok_or(Error::AuthRequired)
    }

    fn find(&self, id: &TaskId) -> Result<&Task> {
        self.task(id).ok_or_else(|| Error::NotFound(id.clone()))
    }

    fn persist(&mut self, id: &TaskId, patch: TaskPatch) -> Result<()> {
        self.require_user()?;
        self.store.update_task(id, patch)?;
        self.reload()
    }

    #[instrument(skip(self, fields), fields(title = %fields.title))]
    pub fn create_task(&mut self, fields: NewTask) -> Result<Task> {
        let mut fields = fields.validated()?;
        fields.user_id = Some(self.require_user()?);
        let task = self.store.create_task(fields)?;
        info!(id = %task.id, "task created");
        self.reload()?;
        self.notices
            .push(Notice::success("Task created", format!("\"{}\" added to your stack", task.title)));
        Ok(task)
    }

    #[instrument(skip(self, edit), fields(id = %id))]
    pub fn edit_task(&mut self, id: &TaskId, edit: TaskEdit) -> Result<()> {
        self.find(id)?;
        let patch = edit.into_patch()?;
        if patch.is_empty() {
            return Ok(());
        }
        self.persist(id, patch)
    }

    /// Marks a task done from the list. A session bound to it is stopped.
    #[instrument(skip(self), fields(id = %id))]
    pub fn complete_task(&mut self, id: &TaskId, now: DateTime<Utc>) -> Result<()> {
        let task = self.find(id)?;
        if task.completed {
            return Err(Error::validation(format!("\"{}\" is already completed", task.title)));
        }
        self.persist(id, TaskPatch::complete(now))?;
        if self.session.is_bound_to(id) {
            self.session.stop();
        }
        Ok(())
    }

    #[instrument(skip(self), fields(id = %id))]
    pub fn reopen_task(&mut self, id: &TaskId) -> Result<()> {
        self.find(id)?;
        self.persist(id, TaskPatch::reopen())
    }

    /// Deletes the task; a session bound to it is stopped.
    #[instrument(skip(self), fields(id = %id))]
    pub fn delete_task(&mut self, id: &TaskId) -> Result<()> {
        self.require_user()?;
        self.store.delete_task(id)?;
        if self.session.is_bound_to(id) {
            info!("deleted task was active; stopping session");
            self.session.stop();
        }
        self.reload()
    }

    /// Returns false when the move was a no-op at the top of the stack.
    pub fn move_up(&mut self, id: &TaskId, now: DateTime<Utc>) -> Result<bool> {
        match ordering::move_up(&self.tasks, id, now)? {
            Some(patch) => self.persist(id, patch).map(|_| true),
            None => Ok(false),
        }
    }

    /// Returns false when the move was a no-op at the bottom of the stack.
    pub fn move_down(&mut self, id: &TaskId, now: DateTime<Utc>) -> Result<bool> {
        match ordering::move_down(&self.tasks, id, now)? {
            Some(patch) => self.persist(id, patch).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn assign_to_today(&mut self, id: &TaskId, now: DateTime<Utc>) -> Result<()> {
        let patch = ordering::assign_to_today(&self.tasks, id, now)?;
        self.persist(id, patch)
    }

    pub fn remove_from_today(&mut self, id: &TaskId) -> Result<()> {
        let patch = ordering::remove_from_today(&self.tasks, id)?;
        self.persist(id, patch)
    }

    pub fn start_task(&mut self, id: &TaskId, now: DateTime<Utc>) -> Result<()> {
        let task = self.find(id)?.clone();
        if task.completed {
            return Err(Error::validation(format!("\"{}\" is already completed", task.title)));
        }
        let events = self.session.start(&task);
        self.handle_events(events, now);
        Ok(())
    }

    /// Starts the first pending task of today's stack, if any.
    pub fn start_focus_session(&mut self, now: DateTime<Utc>) -> Option<TaskId> {
        let next = ordering::pending_today(&self.tasks, now).first().map(|t| (*t).clone())?;
        let events = self.session.start(&next);
        self.handle_events(events, now);
        Some(next.id)
    }

    pub fn start_standalone(&mut self, now: DateTime<Utc>) {
        let events = self.session.start_standalone();
        self.handle_events(events, now);
    }

    pub fn set_standalone_durations(&mut self, work_minutes: u32, break_minutes: u32) {
        self.session.set_standalone_durations(work_minutes, break_minutes);
    }

    pub fn pause(&mut self) -> bool {
        self.session.pause()
    }

    pub fn resume(&mut self) -> bool {
        self.session.resume()
    }

    pub fn reset(&mut self) -> bool {
        self.session.reset()
    }

    pub fn stop(&mut self, now: DateTime<Utc>) {
        let events = self.session.stop();
        self.handle_events(events, now);
    }

    pub fn take_break(&mut self) -> bool {
        self.session.take_break()
    }

    pub fn start_next(&mut self, now: DateTime<Utc>) -> bool {
        let upcoming = self.next_pending(now).cloned();
        self.session.start_next(upcoming.as_ref())
    }

    pub fn finish(&mut self) -> bool {
        self.session.finish()
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        let upcoming = self.next_pending(now).cloned();
        let events = self.session.tick(upcoming.as_ref());
        self.handle_events(events.clone(), now);
        events
    }

    pub fn advance(&mut self, elapsed: Duration, now: DateTime<Utc>) -> Vec<SessionEvent> {
        let upcoming = self.next_pending(now).cloned();
        let events = self.session.advance(elapsed, upcoming.as_ref());
        self.handle_events(events.clone(), now);
        events
    }

    fn handle_events(&mut self, events: Vec<SessionEvent>, now: DateTime<Utc>) {
        for event in events {
            debug!(?event, "session event");
            match event {
                SessionEvent::TaskCompleted(id) => self.record_completion(&id, now),
                SessionEvent::FocusComplete => self.notices.push(Notice::success(
                    "Focus session complete",
                    "Time for a well-deserved break.",
                )),
                SessionEvent::BreakComplete => self
                    .notices
                    .push(Notice::info("Break complete", "Ready to get back to work?")),
                SessionEvent::AutoStarted(id) => {
                    let title = self.task(&id).map(|t| t.title.clone()).unwrap_or_default();
                    self.notices
                        .push(Notice::info("Next task started", format!("Now focusing on \"{title}\"")));
                }
                SessionEvent::Stopped { task } => {
                    debug!(task = ?task, "active task cleared");
                }
                SessionEvent::StandaloneCancelled => self.notices.push(Notice::info(
                    "Timer closed",
                    "The standalone timer was stopped for this task.",
                )),
            }
        }
    }

    /// Marks the task complete locally, then persists. A failed write is
    /// reported and the local mark stays.
    fn record_completion(&mut self, id: &TaskId, now: DateTime<Utc>) {
        let patch = TaskPatch::complete(now);
        let title = match self.tasks.iter_mut().find(|t| &t.id == id) {
            Some(task) => {
                task.apply(&patch);
                task.title.clone()
            }
            None => String::new(),
        };
        let persisted = self.require_user().and_then(|_| self.store.update_task(id, patch));
        match persisted {
            Ok(()) => {
                self.notices.push(Notice::success(
                    "Task completed",
                    format!("Great job completing \"{title}\"!"),
                ));
                let reloaded = self.reload();
                self.report(reloaded);
            }
            Err(err) => {
                warn!(id = %id, error = %err, "completion not persisted");
                self.notices.push(Notice::from_error(&err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::notice::Level;
    use crate::session::SessionState;
    use crate::store::MemoryTaskStore;

    fn workspace() -> Workspace<MemoryTaskStore> {
        Workspace::new(
            MemoryTaskStore::new(),
            Some("user-1".to_string()),
            SessionSettings::default(),
        )
    }

    fn add(ws: &mut Workspace<MemoryTaskStore>, title: &str, minutes: u32) -> Task {
        let fields = NewTask {
            estimated_time: minutes,
            ..NewTask::new(title, Utc::now())
        };
        ws.create_task(fields).expect("create task")
    }

    #[test]
    fn created_task_shows_up_today_and_pending() {
        let mut ws = workspace();
        let task = add(&mut ws, "Write report", 30);
        let now = Utc::now();
        assert!(!task.completed);
        assert_eq!(task.user_id.as_deref(), Some("user-1"));
        assert_eq!(ws.tasks().len(), 1);
        assert_eq!(ws.todays_tasks(now).len(), 1);
    }

    #[test]
    fn mutations_require_a_user() {
        let mut ws = Workspace::new(MemoryTaskStore::new(), None, SessionSettings::default());
        let err = ws
            .create_task(NewTask::new("x", Utc::now()))
            .expect_err("no user");
        assert!(matches!(err, Error::AuthRequired));
        assert!(ws.tasks().is_empty());
    }

    #[test]
    fn completing_a_done_task_is_rejected() {
        let mut ws = workspace();
        let task = add(&mut ws, "Yesterday's work", 10);
        let yesterday = Utc::now() - chrono::Duration::days(1);
        ws.complete_task(&task.id, yesterday).expect("first completion");

        let err = ws.complete_task(&task.id, Utc::now()).expect_err("already done");
        assert!(matches!(err, Error::Validation(_)));
        let stored = &ws.store().list_tasks().expect("list")[0];
        assert_eq!(stored.completed_at, Some(yesterday));
        assert_eq!(ws.reflection_counters(Utc::now()), (0, 0));
    }

    #[test]
    fn updates_and_deletes_require_a_user() {
        let now = Utc::now();
        let seeded = crate::task::tests::sample("t1", 1);
        let mut ws = Workspace::new(
            MemoryTaskStore::with_tasks(vec![seeded.clone()]),
            None,
            SessionSettings::default(),
        );
        ws.reload().expect("reload");

        assert!(matches!(ws.complete_task(&seeded.id, now), Err(Error::AuthRequired)));
        assert!(matches!(ws.assign_to_today(&seeded.id, now), Err(Error::AuthRequired)));
        assert!(matches!(ws.delete_task(&seeded.id), Err(Error::AuthRequired)));

        let stored = ws.store().list_tasks().expect("list");
        assert_eq!(stored, vec![seeded]);
    }

    #[test]
    fn deleting_active_task_stops_session() {
        let mut ws = workspace();
        let task = add(&mut ws, "Email", 15);
        let now = Utc::now();
        ws.start_task(&task.id, now).expect("start");
        assert!(ws.session().is_bound_to(&task.id));

        ws.delete_task(&task.id).expect("delete");
        assert_eq!(ws.session().state(), &SessionState::Idle);
        assert!(ws.tasks().is_empty());
    }

    #[test]
    fn session_completion_persists_once() {
        let mut ws = workspace();
        let task = add(&mut ws, "Focus", 1);
        let now = Utc::now();
        ws.start_task(&task.id, now).expect("start");

        let mut completed = 0;
        for _ in 0..120 {
            completed += ws
                .tick(now)
                .iter()
                .filter(|e| matches!(e, SessionEvent::TaskCompleted(_)))
                .count();
        }
        assert_eq!(completed, 1);
        let stored = ws.store().list_tasks().expect("list");
        assert!(stored[0].completed);
        assert!(stored[0].completed_at.is_some());
    }

    #[test]
    fn failed_completion_write_keeps_local_mark() {
        let mut ws = workspace();
        let task = add(&mut ws, "Focus", 1);
        let now = Utc::now();
        ws.start_task(&task.id, now).expect("start");
        ws.drain_notices();
        ws.store_mut().fail_writes(true);

        ws.advance(Duration::from_secs(60), now);
        assert!(matches!(ws.session().state(), SessionState::Completed(_)));
        assert!(ws.task(&task.id).expect("local task").completed);
        assert!(!ws.store().list_tasks().expect("list")[0].completed);
        let notices = ws.drain_notices();
        assert!(notices.iter().any(|n| n.level == Level::Error));
    }

    #[test]
    fn focus_session_picks_head_of_stack() {
        let mut ws = workspace();
        let now = Utc::now();
        let first = add(&mut ws, "First", 10);
        let second = add(&mut ws, "Second", 10);
        ws.move_up(&second.id, now).expect("move up");

        let started = ws.start_focus_session(now).expect("pending task");
        assert_eq!(started, second.id);
        assert_eq!(ws.next_pending(now).map(|t| t.id.clone()), Some(first.id));
    }

    #[test]
    fn break_auto_starts_next_pending_task() {
        let settings = SessionSettings {
            break_minutes: 1,
            auto_start_delay_secs: 1,
            ..SessionSettings::default()
        };
        let mut ws = Workspace::new(MemoryTaskStore::new(), Some("u".to_string()), settings);
        let now = Utc::now();
        let a = add(&mut ws, "A", 1);
        let b = add(&mut ws, "B", 2);
        ws.start_task(&a.id, now).expect("start a");
        ws.advance(Duration::from_secs(60), now);
        assert!(ws.take_break());
        ws.advance(Duration::from_secs(60), now);
        let events = ws.advance(Duration::from_secs(1), now);
        assert_eq!(events, vec![SessionEvent::AutoStarted(b.id.clone())]);
        assert!(ws.session().is_bound_to(&b.id));
    }

    #[test]
    fn remote_failure_leaves_state_unchanged() {
        let mut ws = workspace();
        let now = Utc::now();
        let a = add(&mut ws, "A", 10);
        let before = ws.tasks().to_vec();
        ws.store_mut().fail_writes(true);

        let result = ws.assign_to_today(&a.id, now);
        assert!(ws.report(result).is_none());
        assert_eq!(ws.tasks(), before.as_slice());
        let notices = ws.drain_notices();
        assert_eq!(notices.last().map(|n| n.level), Some(Level::Error));
    }

    #[test]
    fn edit_rejects_blank_title() {
        let mut ws = workspace();
        let a = add(&mut ws, "A", 10);
        let edit = TaskEdit {
            title: Some("  ".to_string()),
            ..TaskEdit::default()
        };
        assert!(matches!(ws.edit_task(&a.id, edit), Err(Error::Validation(_))));

        let edit = TaskEdit {
            estimated_time: Some(45),
            ..TaskEdit::default()
        };
        ws.edit_task(&a.id, edit).expect("edit estimate");
        assert_eq!(ws.task(&a.id).map(|t| t.estimated_time), Some(45));
    }
}
