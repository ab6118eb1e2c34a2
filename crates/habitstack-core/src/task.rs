use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime::to_local_date;
use crate::error::{Error, Result};

pub const DEFAULT_ESTIMATE_MINUTES: u32 = 25;
pub const PRESET_ESTIMATES: [u32; 6] = [15, 25, 30, 45, 60, 90];
pub const SUGGESTED_CATEGORIES: [&str; 5] = ["Work", "Personal", "Learning", "Health", "Creativity"];

/// Server-assigned opaque identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::str::FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(Self::Low),
            "m" | "medium" => Ok(Self::Medium),
            "h" | "high" => Ok(Self::High),
            other => Err(Error::validation(format!("unknown priority: {other}"))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(label)
    }
}

/// Row shape of the remote `tasks` table. Also the line format of the
/// local task file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub estimated_time: u32,

    #[serde(default)]
    pub actual_time: Option<u32>,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub category: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub assigned_to_today: bool,

    #[serde(default)]
    pub task_order: i64,

    #[serde(default)]
    pub user_id: Option<String>,
}

impl Task {
    /// Member of today's stack: created on the current local day, or pinned.
    pub fn is_today(&self, now: DateTime<Utc>) -> bool {
        self.assigned_to_today || to_local_date(self.created_at) == to_local_date(now)
    }

    pub fn is_pending(&self) -> bool {
        !self.completed
    }

    pub fn completed_on_day_of(&self, now: DateTime<Utc>) -> bool {
        match (self.completed, self.completed_at) {
            (true, Some(at)) => to_local_date(at) == to_local_date(now),
            _ => false,
        }
    }

    /// Applies the set fields of `patch`, keeping `completed_at` in step
    /// with `completed`.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(estimate) = patch.estimated_time {
            self.estimated_time = estimate;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(flag) = patch.assigned_to_today {
            self.assigned_to_today = flag;
        }
        if let Some(order) = patch.task_order {
            self.task_order = order;
        }
        if let Some(completed) = patch.completed {
            self.completed_at = match (self.completed, completed) {
                (_, false) => None,
                // Already done: the original completion time stands.
                (true, true) => self.completed_at.or(patch.completed_at.flatten()),
                (false, true) => patch.completed_at.flatten(),
            }
            .or_else(|| completed.then(Utc::now));
            self.completed = completed;
        }
    }
}

/// Fields supplied by the user when creating a task; the store assigns
/// `id` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub estimated_time: u32,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub task_order: i64,
    pub completed: bool,
    pub assigned_to_today: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: None,
            estimated_time: DEFAULT_ESTIMATE_MINUTES,
            priority: Priority::default(),
            category: None,
            task_order: now.timestamp_millis(),
            completed: false,
            assigned_to_today: false,
            user_id: None,
        }
    }

    /// Trims free text and rejects an empty title or a zero estimate.
    pub fn validated(mut self) -> Result<Self> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(Error::validation("task title cannot be empty"));
        }
        if self.estimated_time == 0 {
            return Err(Error::validation("estimated time must be at least one minute"));
        }
        self.description = non_blank(self.description);
        self.category = non_blank(self.category);
        Ok(self)
    }

    pub fn into_task(self, id: TaskId, created_at: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            estimated_time: self.estimated_time,
            actual_time: None,
            completed: false,
            completed_at: None,
            priority: self.priority,
            category: self.category,
            created_at,
            assigned_to_today: self.assigned_to_today,
            task_order: self.task_order,
            user_id: self.user_id,
        }
    }
}

/// Partial update. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_today: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_order: Option<i64>,
}

impl TaskPatch {
    pub fn complete(now: DateTime<Utc>) -> Self {
        Self {
            completed: Some(true),
            completed_at: Some(Some(now)),
            ..Self::default()
        }
    }

    pub fn reopen() -> Self {
        Self {
            completed: Some(false),
            completed_at: Some(None),
            ..Self::default()
        }
    }

    pub fn order(task_order: i64) -> Self {
        Self {
            task_order: Some(task_order),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// User-editable subset exposed by the edit dialog.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub estimated_time: Option<u32>,
}

impl TaskEdit {
    pub fn into_patch(self) -> Result<TaskPatch> {
        let mut patch = TaskPatch::default();
        if let Some(title) = self.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(Error::validation("task title cannot be empty"));
            }
            patch.title = Some(title);
        }
        if let Some(description) = self.description {
            patch.description = Some(non_blank(Some(description)));
        }
        if let Some(estimate) = self.estimated_time {
            if estimate == 0 {
                return Err(Error::validation("estimated time must be at least one minute"));
            }
            patch.estimated_time = Some(estimate);
        }
        Ok(patch)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
