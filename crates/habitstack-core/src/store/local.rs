use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{TaskStore, newest_first};
use crate::error::{Error, Result};
use crate::task::{NewTask, Task, TaskId, TaskPatch};

/// JSON-lines task file in the data directory. Each mutation rewrites the
/// whole file through a temp file and an atomic rename.
#[derive(Debug)]
pub struct LocalTaskStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
}

impl LocalTaskStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let tasks_path = data_dir.join("tasks.data");
        if !tasks_path.exists() {
            fs::write(&tasks_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            "opened local task store"
        );

        Ok(Self {
            data_dir,
            tasks_path,
        })
    }

    fn load(&self) -> Result<Vec<Task>> {
        load_jsonl(&self.tasks_path).map_err(|err| match err {
            Error::Io(io) => Error::remote(format!(
                "failed reading {}: {io}",
                self.tasks_path.display()
            )),
            other => other,
        })
    }

    fn save(&self, tasks: &[Task]) -> Result<()> {
        save_jsonl_atomic(&self.tasks_path, tasks)
    }
}

impl TaskStore for LocalTaskStore {
    #[instrument(skip(self))]
    fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks = self.load()?;
        newest_first(&mut tasks);
        Ok(tasks)
    }

    #[instrument(skip(self, fields), fields(title = %fields.title))]
    fn create_task(&mut self, fields: NewTask) -> Result<Task> {
        let mut tasks = self.load()?;
        let task = fields.into_task(TaskId::new(Uuid::new_v4().to_string()), Utc::now());
        tasks.push(task.clone());
        self.save(&tasks)?;
        debug!(id = %task.id, count = tasks.len(), "task appended");
        Ok(task)
    }

    #[instrument(skip(self, patch), fields(id = %id))]
    fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> Result<()> {
        let mut tasks = self.load()?;
        let task = tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        task.apply(&patch);
        self.save(&tasks)
    }

    #[instrument(skip(self), fields(id = %id))]
    fn delete_task(&mut self, id: &TaskId) -> Result<()> {
        let tasks = self.load()?;
        let before = tasks.len();
        let kept: Vec<Task> = tasks.into_iter().filter(|t| &t.id != id).collect();
        if kept.len() == before {
            return Err(Error::NotFound(id.clone()));
        }
        info!(before, after = kept.len(), "deleted task");
        self.save(&kept)
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> Result<Vec<Task>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let task: Task = serde_json::from_str(trimmed).map_err(|err| {
            Error::remote(format!("failed parsing {} line {}: {err}", path.display(), idx + 1))
        })?;
        out.push(task);
    }

    debug!(count = out.len(), "loaded tasks from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, tasks))]
fn save_jsonl_atomic(path: &Path, tasks: &[Task]) -> Result<()> {
    debug!(file = %path.display(), count = tasks.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for task in tasks {
        let serialized = serde_json::to_string(task)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| Error::remote(format!("failed to persist {}: {}", path.display(), err)))?;

    Ok(())
}
