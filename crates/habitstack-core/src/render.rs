use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::{Config, strict_bool};
use crate::datetime::format_local;
use crate::notice::{Level, Notice};
use crate::prefs::{Preferences, Theme};
use crate::reflection::Reflection;
use crate::session::{FocusSession, Mode, SessionState};
use crate::task::{Priority, Task, TaskId};
use crate::views::DailyStats;

const SHORT_ID: usize = 8;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    notifications: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = strict_bool(&color_cfg)
            .ok_or_else(|| anyhow!("invalid color setting: {color_cfg}"))?;

        Ok(Self {
            color,
            notifications: true,
        })
    }

    /// Success and info notices are dropped when notifications are off;
    /// errors always print.
    pub fn set_notifications(&mut self, enabled: bool) {
        self.notifications = enabled;
    }

    /// `numbered` shows stack positions, which commands accept in place of
    /// an id.
    #[tracing::instrument(skip(self, tasks, active))]
    pub fn print_task_table(
        &mut self,
        tasks: &[&Task],
        active: Option<&TaskId>,
        numbered: bool,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if tasks.is_empty() {
            writeln!(out, "No tasks yet. Create your first task to start building your habit stack!")?;
            return Ok(());
        }

        let headers = vec![
            "#".to_string(),
            "ID".to_string(),
            "Pri".to_string(),
            "Est".to_string(),
            "Category".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for (idx, task) in tasks.iter().enumerate() {
            let id = short_id(&task.id);
            let marker = if task.completed {
                self.paint("done", "32")
            } else if active == Some(&task.id) {
                self.paint("now", "33")
            } else if numbered {
                (idx + 1).to_string()
            } else {
                "-".to_string()
            };
            let priority = match task.priority {
                Priority::High => self.paint("high", "31"),
                Priority::Medium => "medium".to_string(),
                Priority::Low => self.paint("low", "2"),
            };
            let title = if task.assigned_to_today {
                format!("{} (pinned)", task.title)
            } else {
                task.title.clone()
            };

            rows.push(vec![
                marker,
                id,
                priority,
                format!("{}m", task.estimated_time),
                task.category.clone().unwrap_or_default(),
                title,
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    pub fn print_stats(&mut self, stats: &DailyStats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "Daily completion  {} / {}  ({:.0}%)",
            stats.completed_count, stats.todays_count, stats.completion_rate
        )?;
        writeln!(out, "{}", progress_bar(stats.completion_rate / 100.0, 30))?;
        writeln!(out, "{}", stats.performance.message())?;
        writeln!(out, "Time invested     {}m", stats.total_time_spent)?;
        if stats.average_task_time > 0.0 {
            writeln!(out, "Avg. per task     {:.0}m", stats.average_task_time)?;
        }
        if let Some((name, count)) = &stats.top_category {
            writeln!(out, "Top category      {name} ({count} tasks)")?;
        }
        for (name, count) in &stats.categories {
            writeln!(out, "  {name:<16}{count}")?;
        }
        Ok(())
    }

    /// Single status line, redrawn in place on a terminal.
    pub fn print_session(&mut self, session: &FocusSession, title: Option<&str>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let label = match session.state() {
            SessionState::Idle => "idle".to_string(),
            SessionState::Running(c) if c.is_break => "break".to_string(),
            SessionState::Running(_) => "focus".to_string(),
            SessionState::Paused(_) => "paused".to_string(),
            SessionState::Completed(_) => "done".to_string(),
            SessionState::BreakRunning { .. } => "break".to_string(),
            SessionState::Handoff { .. } => "next up".to_string(),
        };
        let name = match (session.mode(), title) {
            (Mode::Standalone, _) => "Pomodoro".to_string(),
            (_, Some(title)) => title.to_string(),
            (_, None) => String::new(),
        };
        let line = format!(
            "{} {} {} {:>3.0}%  {}",
            self.paint(&session.clock(), "1"),
            progress_bar(session.progress(), 24),
            label,
            session.progress() * 100.0,
            name
        );
        if io::stdout().is_terminal() {
            write!(out, "\r\x1b[2K{line}")?;
        } else {
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn print_notices(&mut self, notices: &[Notice]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let mut err = io::stderr().lock();
        for notice in notices {
            match notice.level {
                Level::Error => {
                    writeln!(err, "{}: {}", self.paint(&notice.title, "31"), notice.detail)?;
                }
                Level::Success | Level::Info if self.notifications => {
                    let code = if notice.level == Level::Success { "32" } else { "36" };
                    writeln!(out, "{}: {}", self.paint(&notice.title, code), notice.detail)?;
                }
                Level::Success | Level::Info => {}
            }
        }
        Ok(())
    }

    pub fn print_themes(&mut self, themes: &[Theme], prefs: &Preferences) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        for theme in themes {
            let selected = if theme.id == prefs.theme.id { "*" } else { " " };
            writeln!(out, "{selected} {:<10} {:<10} {}", theme.id, theme.name, theme.colors.gradient)?;
        }
        if let Some(custom) = &prefs.theme.custom {
            writeln!(out, "custom gradient: {} -> {}", custom.from, custom.to)?;
        }
        Ok(())
    }

    pub fn print_reflection(&mut self, reflection: &Reflection) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}  mood: {}", reflection.date, reflection.mood)?;
        writeln!(
            out,
            "tasks done: {}  focus time: {}m",
            reflection.completed_tasks, reflection.total_focus_time
        )?;
        writeln!(out)?;
        writeln!(out, "{}", reflection.reflection)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&mut self, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        if let Some(description) = &task.description {
            writeln!(out, "desc      {description}")?;
        }
        writeln!(out, "estimate  {}m", task.estimated_time)?;
        writeln!(out, "priority  {}", task.priority)?;
        writeln!(out, "category  {}", task.category.clone().unwrap_or_default())?;
        writeln!(out, "created   {}", format_local(task.created_at))?;
        if let Some(done) = task.completed_at {
            writeln!(out, "completed {}", format_local(done))?;
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn short_id(id: &TaskId) -> String {
    id.as_str().chars().take(SHORT_ID).collect()
}

fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0)) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_pads_by_visible_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["A".to_string(), "B".to_string()],
            vec![vec!["\x1b[31mred\x1b[0m".to_string(), "x".to_string()]],
        )
        .expect("write table");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A   B ");
        assert_eq!(strip_ansi(lines[2]), "red x ");
    }

    #[test]
    fn progress_bar_clamps() {
        assert_eq!(progress_bar(0.5, 4), "[##--]");
        assert_eq!(progress_bar(2.0, 2), "[##]");
    }
}
