//! Task persistence. Every backend holds the full collection for one user;
//! callers reload after each successful mutation rather than patching
//! their in-memory copy.

pub mod local;
pub mod remote;

use chrono::Utc;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::task::{NewTask, Task, TaskId, TaskPatch};

pub use local::LocalTaskStore;
pub use remote::{RemoteConfig, RemoteTaskStore};

pub trait TaskStore {
    /// Entire collection, newest-created first.
    fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Not idempotent: two calls create two tasks.
    fn create_task(&mut self, fields: NewTask) -> Result<Task>;

    fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> Result<()>;

    fn delete_task(&mut self, id: &TaskId) -> Result<()>;
}

impl<S: TaskStore + ?Sized> TaskStore for Box<S> {
    fn list_tasks(&self) -> Result<Vec<Task>> {
        (**self).list_tasks()
    }

    fn create_task(&mut self, fields: NewTask) -> Result<Task> {
        (**self).create_task(fields)
    }

    fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> Result<()> {
        (**self).update_task(id, patch)
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<()> {
        (**self).delete_task(id)
    }
}

pub(crate) fn newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// In-process store. Writes can be switched to fail to exercise the
/// service-error paths.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: Vec<Task>,
    next_id: u64,
    fail_writes: bool,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            next_id: tasks.len() as u64,
            tasks,
            fail_writes: false,
        }
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            Err(Error::remote("write rejected by service"))
        } else {
            Ok(())
        }
    }
}

impl TaskStore for MemoryTaskStore {
    fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut out = self.tasks.clone();
        newest_first(&mut out);
        Ok(out)
    }

    #[instrument(skip(self, fields), fields(title = %fields.title))]
    fn create_task(&mut self, fields: NewTask) -> Result<Task> {
        self.check_writable()?;
        self.next_id += 1;
        let task = fields.into_task(TaskId::new(self.next_id.to_string()), Utc::now());
        self.tasks.push(task.clone());
        debug!(id = %task.id, "created task in memory");
        Ok(task)
    }

    fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> Result<()> {
        self.check_writable()?;
        let task = self
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        task.apply(&patch);
        Ok(())
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<()> {
        self.check_writable()?;
        let before = self.tasks.len();
        self.tasks.retain(|t| &t.id != id);
        if self.tasks.len() == before {
            return Err(Error::NotFound(id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn duplicate_creates_produce_duplicate_tasks() {
        let mut store = MemoryTaskStore::new();
        let fields = NewTask::new("Stretch", Utc::now());
        let a = store.create_task(fields.clone()).expect("create a");
        let b = store.create_task(fields).expect("create b");
        assert_ne!(a.id, b.id);
        assert_eq!(store.list_tasks().expect("list").len(), 2);
    }

    #[test]
    fn failing_writes_leave_collection_unchanged() {
        let mut store = MemoryTaskStore::new();
        let task = store
            .create_task(NewTask::new("Read", Utc::now()))
            .expect("create");
        store.fail_writes(true);
        let err = store
            .update_task(&task.id, TaskPatch::complete(Utc::now()))
            .expect_err("write should fail");
        assert!(matches!(err, Error::RemoteService(_)));
        assert!(!store.list_tasks().expect("list")[0].completed);
    }
}
