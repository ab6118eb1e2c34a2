//! Focus session state machine.
//!
//! One owned [`FocusSession`] holds at most one countdown, either bound to
//! a task or running standalone. Time enters only through [`FocusSession::tick`]
//! (one second) and [`FocusSession::advance`]; [`Pacer`] turns monotonic
//! clock readings into whole seconds so a late wake-up catches up instead
//! of drifting. Transitions never fail: calls that do not apply to the
//! current state are no-ops. Side effects are returned as
//! [`SessionEvent`]s for the owner to act on.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::datetime::format_clock;
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Break offered after a task-bound session, minutes.
    pub break_minutes: u32,
    pub standalone_work_minutes: u32,
    pub standalone_break_minutes: u32,
    /// Start the next pending task once a break runs out.
    pub auto_start_next: bool,
    /// Seconds between the end of a break and the auto-started session.
    pub auto_start_delay_secs: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            break_minutes: 5,
            standalone_work_minutes: 25,
            standalone_break_minutes: 5,
            auto_start_next: true,
            auto_start_delay_secs: 3,
        }
    }
}

/// What a session needs to remember about its task. The duration is
/// captured at start; later edits to the task do not reach a running
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRef {
    pub id: TaskId,
    pub title: String,
    pub estimated_time: u32,
}

impl From<&Task> for TaskRef {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            estimated_time: task.estimated_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Binding {
    Task(TaskRef),
    Standalone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub binding: Binding,
    pub is_break: bool,
    pub total: u32,
    pub remaining: u32,
}

impl Countdown {
    fn new(binding: Binding, is_break: bool, seconds: u32) -> Self {
        Self {
            binding,
            is_break,
            total: seconds,
            remaining: seconds,
        }
    }

    fn focus(task: TaskRef) -> Self {
        let seconds = task.estimated_time.saturating_mul(60);
        Self::new(Binding::Task(task), false, seconds)
    }

    /// Counts one second down; true when this tick reached zero.
    fn step(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }

    fn is_standalone(&self) -> bool {
        matches!(self.binding, Binding::Standalone)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Running(Countdown),
    Paused(Countdown),
    /// Focus countdown for the task ran out; waiting for the user's choice.
    Completed(TaskRef),
    BreakRunning { total: u32, remaining: u32 },
    /// Break is over and `next` starts once `remaining` reaches zero.
    Handoff { next: TaskRef, remaining: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    None,
    TaskBound,
    Standalone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionEvent {
    /// Focus time for the task ran out; persist `completed`.
    TaskCompleted(TaskId),
    /// Standalone focus phase ended; its break is ready to start.
    FocusComplete,
    BreakComplete,
    AutoStarted(TaskId),
    /// Session stopped by the user; `task` was the active task, if any.
    Stopped { task: Option<TaskId> },
    /// A standalone timer was cancelled to make room for a task session.
    StandaloneCancelled,
}

#[derive(Debug, Clone)]
pub struct FocusSession {
    state: SessionState,
    settings: SessionSettings,
}

impl Default for FocusSession {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl FocusSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            state: SessionState::Idle,
            settings,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn mode(&self) -> Mode {
        match &self.state {
            SessionState::Idle => Mode::None,
            SessionState::Running(c) | SessionState::Paused(c) if c.is_standalone() => {
                Mode::Standalone
            }
            _ => Mode::TaskBound,
        }
    }

    /// Task the session is bound to, including a completed task awaiting a
    /// choice and the task queued behind a finished break.
    pub fn active_task(&self) -> Option<&TaskRef> {
        match &self.state {
            SessionState::Running(c) | SessionState::Paused(c) => match &c.binding {
                Binding::Task(task) => Some(task),
                Binding::Standalone => None,
            },
            SessionState::Completed(task) => Some(task),
            SessionState::Handoff { next, .. } => Some(next),
            SessionState::Idle | SessionState::BreakRunning { .. } => None,
        }
    }

    pub fn is_bound_to(&self, id: &TaskId) -> bool {
        self.active_task().is_some_and(|t| &t.id == id)
    }

    /// True while time moves the state forward.
    pub fn is_counting(&self) -> bool {
        matches!(
            self.state,
            SessionState::Running(_)
                | SessionState::BreakRunning { .. }
                | SessionState::Handoff { .. }
        )
    }

    pub fn remaining(&self) -> u32 {
        match &self.state {
            SessionState::Running(c) | SessionState::Paused(c) => c.remaining,
            SessionState::BreakRunning { remaining, .. } => *remaining,
            SessionState::Handoff { remaining, .. } => *remaining,
            SessionState::Idle | SessionState::Completed(_) => 0,
        }
    }

    /// Fraction of the current countdown already elapsed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let (total, remaining) = match &self.state {
            SessionState::Running(c) | SessionState::Paused(c) => (c.total, c.remaining),
            SessionState::BreakRunning { total, remaining } => (*total, *remaining),
            SessionState::Completed(_) => return 1.0,
            SessionState::Idle | SessionState::Handoff { .. } => return 0.0,
        };
        if total == 0 {
            return 1.0;
        }
        f64::from(total - remaining.min(total)) / f64::from(total)
    }

    pub fn clock(&self) -> String {
        format_clock(self.remaining())
    }

    /// Starts (or resumes) a focus countdown for `task`. Any standalone
    /// timer is cancelled first; any other task session is replaced.
    #[instrument(skip(self, task), fields(task = %task.id))]
    pub fn start(&mut self, task: &Task) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let SessionState::Paused(c) = &self.state
            && matches!(&c.binding, Binding::Task(t) if t.id == task.id)
        {
            self.resume();
            return events;
        }
        if self.mode() == Mode::Standalone {
            info!("cancelling standalone timer for task session");
            events.push(SessionEvent::StandaloneCancelled);
        }
        let countdown = Countdown::focus(TaskRef::from(task));
        info!(seconds = countdown.total, "focus session started");
        self.state = SessionState::Running(countdown);
        events
    }

    /// Starts the standalone work countdown. A task-bound session is
    /// stopped first, which clears the active task.
    #[instrument(skip(self))]
    pub fn start_standalone(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        match &self.state {
            SessionState::Running(c) if c.is_standalone() => return events,
            SessionState::Paused(c) if c.is_standalone() => {
                self.resume();
                return events;
            }
            SessionState::Idle => {}
            _ => events.extend(self.stop()),
        }
        let seconds = self.settings.standalone_work_minutes.saturating_mul(60);
        self.state = SessionState::Running(Countdown::new(Binding::Standalone, false, seconds));
        info!(seconds, "standalone timer started");
        events
    }

    pub fn pause(&mut self) -> bool {
        let SessionState::Running(c) = &self.state else {
            return false;
        };
        debug!(remaining = c.remaining, "pause");
        self.state = SessionState::Paused(c.clone());
        true
    }

    pub fn resume(&mut self) -> bool {
        let SessionState::Paused(c) = &self.state else {
            return false;
        };
        debug!(remaining = c.remaining, "resume");
        self.state = SessionState::Running(c.clone());
        true
    }

    /// Restores the full duration and keeps the running/paused flag.
    pub fn reset(&mut self) -> bool {
        match &mut self.state {
            SessionState::Running(c) | SessionState::Paused(c) => {
                c.remaining = c.total;
                debug!(total = c.total, "reset");
                true
            }
            _ => false,
        }
    }

    #[instrument(skip(self))]
    pub fn stop(&mut self) -> Vec<SessionEvent> {
        let task = self.active_task().map(|t| t.id.clone());
        info!(task = ?task, "session stopped");
        self.state = SessionState::Idle;
        vec![SessionEvent::Stopped { task }]
    }

    /// Completed → break countdown.
    pub fn take_break(&mut self) -> bool {
        if !matches!(self.state, SessionState::Completed(_)) {
            return false;
        }
        let seconds = self.settings.break_minutes.saturating_mul(60);
        info!(seconds, "break started");
        self.state = SessionState::BreakRunning {
            total: seconds,
            remaining: seconds,
        };
        true
    }

    /// Completed → focus on `upcoming`, or Idle when nothing is pending.
    pub fn start_next(&mut self, upcoming: Option<&Task>) -> bool {
        if !matches!(self.state, SessionState::Completed(_)) {
            return false;
        }
        self.state = match upcoming {
            Some(task) => {
                info!(task = %task.id, "starting next task");
                SessionState::Running(Countdown::focus(TaskRef::from(task)))
            }
            None => SessionState::Idle,
        };
        true
    }

    /// Completed → Idle.
    pub fn finish(&mut self) -> bool {
        if !matches!(self.state, SessionState::Completed(_)) {
            return false;
        }
        self.state = SessionState::Idle;
        true
    }

    /// Applies new standalone durations. An open standalone timer that is
    /// not running restarts its current phase at the new length.
    pub fn set_standalone_durations(&mut self, work_minutes: u32, break_minutes: u32) {
        self.settings.standalone_work_minutes = work_minutes.max(1);
        self.settings.standalone_break_minutes = break_minutes.max(1);
        if let SessionState::Paused(c) = &mut self.state
            && c.is_standalone()
        {
            let minutes = if c.is_break {
                self.settings.standalone_break_minutes
            } else {
                self.settings.standalone_work_minutes
            };
            c.total = minutes.saturating_mul(60);
            c.remaining = c.total;
        }
    }

    /// One elapsed second. `upcoming` is the next pending task, consulted
    /// only when a break runs out.
    pub fn tick(&mut self, upcoming: Option<&Task>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        match &mut self.state {
            SessionState::Running(c) => {
                if !c.step() {
                    return events;
                }
                let finished = c.clone();
                if finished.is_break {
                    // Standalone breaks never hand off to a task.
                    info!("standalone break complete");
                    events.push(SessionEvent::BreakComplete);
                    let seconds = self.settings.standalone_work_minutes.saturating_mul(60);
                    self.state = SessionState::Paused(Countdown::new(Binding::Standalone, false, seconds));
                } else {
                    match finished.binding {
                        Binding::Task(task) => {
                            info!(task = %task.id, "focus time complete");
                            events.push(SessionEvent::TaskCompleted(task.id.clone()));
                            self.state = SessionState::Completed(task);
                        }
                        Binding::Standalone => {
                            info!("standalone focus complete");
                            events.push(SessionEvent::FocusComplete);
                            let seconds = self.settings.standalone_break_minutes.saturating_mul(60);
                            self.state = SessionState::Paused(Countdown::new(
                                Binding::Standalone,
                                true,
                                seconds,
                            ));
                        }
                    }
                }
            }
            SessionState::BreakRunning { remaining, .. } => {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    info!("break complete");
                    events.push(SessionEvent::BreakComplete);
                    let delay = self.settings.auto_start_delay_secs;
                    self.after_break(upcoming, delay, &mut events);
                }
            }
            SessionState::Handoff { next, remaining } => {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    let next = next.clone();
                    events.push(SessionEvent::AutoStarted(next.id.clone()));
                    self.state = SessionState::Running(Countdown::focus(next));
                }
            }
            SessionState::Idle | SessionState::Paused(_) | SessionState::Completed(_) => {}
        }
        events
    }

    /// Advances by whole seconds of `elapsed`; stops early once the state
    /// no longer counts (completed, paused, idle).
    pub fn advance(&mut self, elapsed: Duration, upcoming: Option<&Task>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for _ in 0..elapsed.as_secs() {
            if !self.is_counting() {
                break;
            }
            events.extend(self.tick(upcoming));
        }
        events
    }

    fn after_break(&mut self, upcoming: Option<&Task>, delay: u32, events: &mut Vec<SessionEvent>) {
        let next = if self.settings.auto_start_next {
            upcoming.map(TaskRef::from)
        } else {
            None
        };
        self.state = match next {
            Some(next) if delay > 0 => {
                debug!(task = %next.id, delay, "queued next task");
                SessionState::Handoff {
                    next,
                    remaining: delay,
                }
            }
            Some(next) => {
                events.push(SessionEvent::AutoStarted(next.id.clone()));
                SessionState::Running(Countdown::focus(next))
            }
            None => SessionState::Idle,
        };
    }
}

/// Converts monotonic wake-ups into whole elapsed seconds, carrying the
/// sub-second remainder between calls.
#[derive(Debug, Clone)]
pub struct Pacer {
    last: Instant,
    carry: Duration,
}

impl Pacer {
    pub fn start(now: Instant) -> Self {
        Self {
            last: now,
            carry: Duration::ZERO,
        }
    }

    /// Forgets time since the last reading, e.g. across a pause.
    pub fn resync(&mut self, now: Instant) {
        self.last = now;
        self.carry = Duration::ZERO;
    }

    pub fn elapsed(&mut self, now: Instant) -> Duration {
        let delta = now.saturating_duration_since(self.last) + self.carry;
        self.last = now;
        let whole = Duration::from_secs(delta.as_secs());
        self.carry = delta - whole;
        whole
    }
}
