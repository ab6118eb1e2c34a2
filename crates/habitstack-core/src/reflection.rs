//! Daily mood journal, one record per local calendar day.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::datetime::day_key;
use crate::error::{Error, Result};
use crate::prefs::{read_json_or_default, write_json_atomic};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Great,
    #[default]
    Good,
    Okay,
    Difficult,
    Challenging,
}

impl std::str::FromStr for Mood {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "great" => Ok(Self::Great),
            "good" => Ok(Self::Good),
            "okay" | "ok" => Ok(Self::Okay),
            "difficult" => Ok(Self::Difficult),
            "challenging" => Ok(Self::Challenging),
            other => Err(Error::validation(format!("unknown mood: {other}"))),
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Great => "Great",
            Self::Good => "Good",
            Self::Okay => "Okay",
            Self::Difficult => "Difficult",
            Self::Challenging => "Challenging",
        };
        f.write_str(label)
    }
}

/// Counters are a snapshot taken when the record is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub date: String,
    pub mood: Mood,
    pub reflection: String,
    pub completed_tasks: usize,
    pub total_focus_time: u32,
}

const FOCUS_PROMPTS: [&str; 5] = [
    "What went well with your focus today?",
    "Which task felt most rewarding to complete?",
    "What would you do differently tomorrow?",
    "How did the pomodoro technique help you?",
    "What challenges did you overcome today?",
];

const GENTLE_PROMPTS: [&str; 2] = [
    "How are you feeling about today?",
    "What can you learn from today's experience?",
];

pub fn prompts(completed_today: usize) -> &'static [&'static str] {
    if completed_today == 0 {
        &GENTLE_PROMPTS
    } else {
        &FOCUS_PROMPTS
    }
}

#[derive(Debug)]
pub struct ReflectionLog {
    path: PathBuf,
    entries: BTreeMap<String, Reflection>,
}

impl ReflectionLog {
    #[instrument(skip(data_dir))]
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("reflections.json");
        let entries = read_json_or_default(&path)?;
        Ok(Self { path, entries })
    }

    pub fn get(&self, now: DateTime<Utc>) -> Option<&Reflection> {
        self.entries.get(&day_key(now))
    }

    pub fn history(&self) -> impl Iterator<Item = &Reflection> {
        self.entries.values()
    }

    /// Overwrites today's record with `mood`, `text` and the given counters.
    #[instrument(skip(self, text))]
    pub fn save(
        &mut self,
        now: DateTime<Utc>,
        mood: Mood,
        text: &str,
        completed_tasks: usize,
        total_focus_time: u32,
    ) -> Result<&Reflection> {
        if text.trim().is_empty() {
            return Err(Error::validation("reflection text cannot be empty"));
        }
        let date = day_key(now);
        let record = Reflection {
            date: date.clone(),
            mood,
            reflection: text.trim().to_string(),
            completed_tasks,
            total_focus_time,
        };
        let mut next = self.entries.clone();
        next.insert(date.clone(), record);
        write_json_atomic(&self.path, &next)?;
        self.entries = next;
        info!(date = %date, "reflection saved");
        self.entries
            .get(&date)
            .ok_or_else(|| Error::validation("reflection vanished after save"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn save_overwrites_todays_record_only() {
        let dir = tempdir().expect("tempdir");
        let mut log = ReflectionLog::load(dir.path()).expect("load");
        let now = Utc::now();
        assert!(log.get(now).is_none());

        log.save(now - Duration::days(2), Mood::Okay, "old day", 1, 25)
            .expect("save old");
        log.save(now, Mood::Great, "first take", 2, 50).expect("save");
        log.save(now, Mood::Difficult, "  second take ", 3, 75)
            .expect("overwrite");

        let reloaded = ReflectionLog::load(dir.path()).expect("reload");
        let today = reloaded.get(now).expect("today's reflection");
        assert_eq!(today.mood, Mood::Difficult);
        assert_eq!(today.reflection, "second take");
        assert_eq!(today.completed_tasks, 3);
        assert_eq!(today.total_focus_time, 75);
        assert_eq!(reloaded.history().count(), 2);
    }

    #[test]
    fn blank_text_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let mut log = ReflectionLog::load(dir.path()).expect("load");
        let err = log
            .save(Utc::now(), Mood::Good, "   ", 0, 0)
            .expect_err("blank");
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn prompts_depend_on_progress() {
        assert_eq!(prompts(0).len(), 2);
        assert_eq!(prompts(4).len(), 5);
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let record = Reflection {
            date: "2026-03-01".to_string(),
            mood: Mood::Great,
            reflection: "ok".to_string(),
            completed_tasks: 1,
            total_focus_time: 25,
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["completedTasks"], 1);
        assert_eq!(json["totalFocusTime"], 25);
        assert_eq!(json["mood"], "great");
    }
}
