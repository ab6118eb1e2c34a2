//! Derived views over the full task collection. Everything is recomputed
//! on each call; the collection is small and there is nothing to invalidate.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ordering::todays_tasks;
use crate::task::Task;

pub const UNCATEGORIZED: &str = "Uncategorized";

pub fn completed_today(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    tasks.iter().filter(|t| t.completed_on_day_of(now)).collect()
}

/// Percentage in `[0, 100]`; zero for an empty stack.
pub fn completion_rate(tasks: &[Task], now: DateTime<Utc>) -> f64 {
    let total = todays_tasks(tasks, now).len();
    if total == 0 {
        return 0.0;
    }
    let done = completed_today(tasks, now).len();
    (done as f64 / total as f64 * 100.0).min(100.0)
}

/// Minutes, approximated by the estimates of today's completed tasks.
pub fn total_time_spent(tasks: &[Task], now: DateTime<Utc>) -> u32 {
    completed_today(tasks, now)
        .iter()
        .map(|t| t.estimated_time)
        .sum()
}

pub fn average_task_time(tasks: &[Task], now: DateTime<Utc>) -> f64 {
    let done = completed_today(tasks, now).len();
    if done == 0 {
        return 0.0;
    }
    total_time_spent(tasks, now) as f64 / done as f64
}

/// Counts of today's completed tasks per category, in first-seen order.
pub fn category_breakdown(tasks: &[Task], now: DateTime<Utc>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for task in completed_today(tasks, now) {
        let label = task.category.as_deref().unwrap_or(UNCATEGORIZED);
        match counts.iter_mut().find(|(name, _)| name == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label.to_string(), 1)),
        }
    }
    counts
}

/// Category with the highest count; the first one encountered wins ties.
pub fn top_category(tasks: &[Task], now: DateTime<Utc>) -> Option<(String, usize)> {
    let mut best: Option<(String, usize)> = None;
    for (name, count) in category_breakdown(tasks, now) {
        if best.as_ref().is_none_or(|(_, n)| count > *n) {
            best = Some((name, count));
        }
    }
    best
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Performance {
    Excellent,
    Good,
    Steady,
    GettingStarted,
}

impl Performance {
    pub fn from_rate(rate: f64) -> Self {
        if rate >= 80.0 {
            Self::Excellent
        } else if rate >= 60.0 {
            Self::Good
        } else if rate >= 40.0 {
            Self::Steady
        } else {
            Self::GettingStarted
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent productivity!",
            Self::Good => "Good progress!",
            Self::Steady => "Keep it up!",
            Self::GettingStarted => "Let's build momentum!",
        }
    }
}

/// Snapshot of today's progress panel.
#[derive(Debug, Clone, Serialize)]
pub struct DailyStats {
    pub todays_count: usize,
    pub completed_count: usize,
    pub completion_rate: f64,
    pub total_time_spent: u32,
    pub average_task_time: f64,
    pub categories: Vec<(String, usize)>,
    pub top_category: Option<(String, usize)>,
    pub performance: Performance,
}

impl DailyStats {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let completion_rate = completion_rate(tasks, now);
        Self {
            todays_count: todays_tasks(tasks, now).len(),
            completed_count: completed_today(tasks, now).len(),
            completion_rate,
            total_time_spent: total_time_spent(tasks, now),
            average_task_time: average_task_time(tasks, now),
            categories: category_breakdown(tasks, now),
            top_category: top_category(tasks, now),
            performance: Performance::from_rate(completion_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::task::TaskPatch;
    use crate::task::tests::sample;

    fn done(id: &str, minutes: u32, category: Option<&str>) -> Task {
        let mut task = sample(id, 0);
        task.estimated_time = minutes;
        task.category = category.map(str::to_string);
        task.apply(&TaskPatch::complete(Utc::now()));
        task
    }

    #[test]
    fn empty_collection_has_zero_rate() {
        let now = Utc::now();
        assert_eq!(completion_rate(&[], now), 0.0);
        assert_eq!(average_task_time(&[], now), 0.0);
        assert!(top_category(&[], now).is_none());
    }

    #[test]
    fn rate_and_time_follow_completed_today() {
        let now = Utc::now();
        let mut yesterday = done("y", 90, None);
        yesterday.completed_at = Some(now - Duration::days(1));
        let tasks = vec![
            done("a", 25, Some("Work")),
            done("b", 30, None),
            sample("c", 0),
            sample("d", 0),
            yesterday,
        ];

        let rate = completion_rate(&tasks, now);
        assert!((rate - 40.0).abs() < f64::EPSILON);
        assert_eq!(total_time_spent(&tasks, now), 55);
        assert!((average_task_time(&tasks, now) - 27.5).abs() < f64::EPSILON);
        assert_eq!(Performance::from_rate(rate), Performance::Steady);
    }

    #[test]
    fn top_category_breaks_ties_by_first_seen() {
        let now = Utc::now();
        let tasks = vec![
            done("a", 10, None),
            done("b", 10, Some("Health")),
            done("c", 10, Some("Health")),
            done("d", 10, None),
        ];
        let breakdown = category_breakdown(&tasks, now);
        assert_eq!(
            breakdown,
            vec![(UNCATEGORIZED.to_string(), 2), ("Health".to_string(), 2)]
        );
        assert_eq!(top_category(&tasks, now), Some((UNCATEGORIZED.to_string(), 2)));
    }

    #[test]
    fn rate_stays_within_bounds_when_completed_outside_stack() {
        let now = Utc::now();
        let mut old = done("old", 10, None);
        old.created_at = now - Duration::days(4);
        let tasks = vec![old, sample("today", 0)];
        let rate = completion_rate(&tasks, now);
        assert!((0.0..=100.0).contains(&rate));
    }

    #[test]
    fn rate_is_capped_when_more_done_than_stacked() {
        let now = Utc::now();
        let mut tasks: Vec<Task> = ["old1", "old2", "old3"]
            .into_iter()
            .map(|id| {
                let mut t = done(id, 10, None);
                t.created_at = now - Duration::days(4);
                t
            })
            .collect();
        tasks.push(sample("today", 0));

        assert_eq!(completed_today(&tasks, now).len(), 3);
        assert_eq!(todays_tasks(&tasks, now).len(), 1);
        assert!((completion_rate(&tasks, now) - 100.0).abs() < f64::EPSILON);
        assert_eq!(Performance::from_rate(completion_rate(&tasks, now)), Performance::Excellent);
    }
}
