//! Today's stack: which tasks belong to the current day and in what order.
//!
//! Order is a single numeric key per task. Moves only ever touch the moved
//! task's key, so keys are never rebalanced and two tasks may end up with
//! equal keys; the stable sort then falls back to collection order.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::task::{Task, TaskId, TaskPatch};

/// Members of today's stack, ascending by `task_order`.
pub fn todays_tasks(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    let mut today: Vec<&Task> = tasks.iter().filter(|t| t.is_today(now)).collect();
    today.sort_by_key(|t| t.task_order);
    today
}

/// Pending members of today's stack in stack order; the head is what a
/// focus session picks up next.
pub fn pending_today(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    todays_tasks(tasks, now)
        .into_iter()
        .filter(|t| t.is_pending())
        .collect()
}

fn position(today: &[&Task], id: &TaskId) -> Result<usize> {
    today
        .iter()
        .position(|t| &t.id == id)
        .ok_or_else(|| Error::NotFound(id.clone()))
}

/// Places the task just before its predecessor. `None` when it already
/// heads the stack.
pub fn move_up(tasks: &[Task], id: &TaskId, now: DateTime<Utc>) -> Result<Option<TaskPatch>> {
    let today = todays_tasks(tasks, now);
    let idx = position(&today, id)?;
    if idx == 0 {
        return Ok(None);
    }
    let predecessor = today[idx - 1].task_order;
    Ok(Some(TaskPatch::order(predecessor.saturating_sub(1))))
}

/// Places the task just after its successor. `None` when it is already last.
pub fn move_down(tasks: &[Task], id: &TaskId, now: DateTime<Utc>) -> Result<Option<TaskPatch>> {
    let today = todays_tasks(tasks, now);
    let idx = position(&today, id)?;
    if idx + 1 >= today.len() {
        return Ok(None);
    }
    let successor = today[idx + 1].task_order;
    Ok(Some(TaskPatch::order(successor.saturating_add(1))))
}

/// Pins the task to today and pushes it to the end of the stack.
pub fn assign_to_today(tasks: &[Task], id: &TaskId, now: DateTime<Utc>) -> Result<TaskPatch> {
    if !tasks.iter().any(|t| &t.id == id) {
        return Err(Error::NotFound(id.clone()));
    }
    Ok(TaskPatch {
        assigned_to_today: Some(true),
        task_order: Some(now.timestamp_millis()),
        ..TaskPatch::default()
    })
}

/// Clears the pin only; the order key is left as is.
pub fn remove_from_today(tasks: &[Task], id: &TaskId) -> Result<TaskPatch> {
    if !tasks.iter().any(|t| &t.id == id) {
        return Err(Error::NotFound(id.clone()));
    }
    Ok(TaskPatch {
        assigned_to_today: Some(false),
        ..TaskPatch::default()
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::task::tests::sample;

    fn apply(tasks: &mut [Task], id: &TaskId, patch: &TaskPatch) {
        if let Some(task) = tasks.iter_mut().find(|t| &t.id == id) {
            task.apply(patch);
        }
    }

    fn ids(today: &[&Task]) -> Vec<String> {
        today.iter().map(|t| t.id.to_string()).collect()
    }

    #[test]
    fn today_is_sorted_and_filtered() {
        let now = Utc::now();
        let mut old = sample("old", 1);
        old.created_at = now - Duration::days(5);
        let mut pinned = sample("pinned", 5);
        pinned.created_at = now - Duration::days(5);
        pinned.assigned_to_today = true;
        let tasks = vec![sample("c", 30), old, sample("a", 10), pinned];

        let today = todays_tasks(&tasks, now);
        assert_eq!(ids(&today), vec!["pinned", "a", "c"]);
        assert!(today.windows(2).all(|w| w[0].task_order <= w[1].task_order));
    }

    #[test]
    fn move_down_jumps_past_successor() {
        let now = Utc::now();
        let a = TaskId::new("A");
        let mut tasks = vec![sample("A", 10), sample("B", 20)];

        let patch = move_down(&tasks, &a, now)
            .expect("move down")
            .expect("not last");
        assert_eq!(patch.task_order, Some(21));
        apply(&mut tasks, &a, &patch);

        assert_eq!(ids(&todays_tasks(&tasks, now)), vec!["B", "A"]);
    }

    #[test]
    fn move_up_lands_before_predecessor() {
        let now = Utc::now();
        let b = TaskId::new("B");
        let tasks = vec![sample("A", 10), sample("B", 20)];
        let patch = move_up(&tasks, &b, now)
            .expect("move up")
            .expect("not first");
        assert_eq!(patch.task_order, Some(9));
    }

    #[test]
    fn moves_at_boundaries_are_noops() {
        let now = Utc::now();
        let tasks = vec![sample("A", 10), sample("B", 20)];
        assert!(move_up(&tasks, &TaskId::new("A"), now).expect("up").is_none());
        assert!(move_down(&tasks, &TaskId::new("B"), now).expect("down").is_none());
    }

    #[test]
    fn colliding_keys_keep_collection_order() {
        let now = Utc::now();
        let tasks = vec![sample("first", 7), sample("second", 7)];
        assert_eq!(ids(&todays_tasks(&tasks, now)), vec!["first", "second"]);
    }

    #[test]
    fn assign_pushes_to_end_and_remove_keeps_order() {
        let now = Utc::now();
        let mut stale = sample("stale", 3);
        stale.created_at = now - Duration::days(2);
        let id = stale.id.clone();
        let mut tasks = vec![sample("a", 10), stale];

        let patch = assign_to_today(&tasks, &id, now).expect("assign");
        apply(&mut tasks, &id, &patch);
        assert_eq!(ids(&todays_tasks(&tasks, now)), vec!["a", "stale"]);

        let patch = remove_from_today(&tasks, &id).expect("remove");
        assert_eq!(patch.task_order, None);
        apply(&mut tasks, &id, &patch);
        assert_eq!(ids(&todays_tasks(&tasks, now)), vec!["a"]);
    }

    #[test]
    fn unknown_task_is_not_found() {
        let tasks = vec![sample("a", 1)];
        let err = move_up(&tasks, &TaskId::new("zzz"), Utc::now()).expect_err("missing");
        assert!(matches!(err, Error::NotFound(_)));
    }
}
