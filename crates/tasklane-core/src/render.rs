use std::collections::HashMap;
use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::dnd::{ColumnGroup, index_tasks};
use crate::task::{Task, TaskPatch};
use crate::views::week::WeekView;
use crate::views::work::WorkView;

const SHORT_ID_LEN: usize = 13;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => io::stdout().is_terminal(),
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_board(&self, view: &WorkView, tasks: &[Task]) -> anyhow::Result<()> {
        self.write_board(io::stdout().lock(), view, tasks)
    }

    pub fn write_board<W: Write>(
        &self,
        mut out: W,
        view: &WorkView,
        tasks: &[Task],
    ) -> anyhow::Result<()> {
        let by_id = index_tasks(tasks);
        for column in view.columns(tasks) {
            writeln!(out, "{} ({})", self.paint(column.title, "1"), column.total)?;
            self.write_groups(&mut out, &column.groups, &by_id)?;
            if !column.done.is_empty() {
                writeln!(out, "  done: {}", column.done.len())?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_week(&self, view: &WeekView, tasks: &[Task]) -> anyhow::Result<()> {
        self.write_week(io::stdout().lock(), view, tasks)
    }

    pub fn write_week<W: Write>(
        &self,
        mut out: W,
        view: &WeekView,
        tasks: &[Task],
    ) -> anyhow::Result<()> {
        let by_id = index_tasks(tasks);
        writeln!(out, "{}", self.paint(&view.week_label(), "1"))?;

        let overdue = view.overdue_tasks(tasks);
        if !overdue.is_empty() {
            writeln!(out, "{}", self.paint(&format!("Overdue ({})", overdue.len()), "31"))?;
            let rows = overdue
                .iter()
                .map(|t| task_row(t, None))
                .collect::<Vec<_>>();
            write_table(&mut out, row_headers(), rows)?;
            writeln!(out)?;
        }

        for day in view.day_columns(tasks) {
            let mut title = format!("{} ({})", day.title, day.total);
            if day.is_today {
                title = self.paint(&format!("{title} today"), "32");
            } else if day.is_past {
                title = self.paint(&title, "2");
            }
            writeln!(out, "{title}")?;
            self.write_groups(&mut out, &day.groups, &by_id)?;
            writeln!(out)?;
        }

        if !view.weekend_expanded() {
            let hidden = view.weekend_task_count(tasks);
            if hidden > 0 {
                writeln!(out, "Weekend: {hidden} hidden")?;
                writeln!(out)?;
            }
        }

        writeln!(out, "{} ({})", self.paint("Unscheduled", "1"), view.column_count(tasks, None))?;
        self.write_groups(&mut out, &view.unscheduled_groups(tasks), &by_id)?;
        Ok(())
    }

    fn write_groups<W: Write>(
        &self,
        out: &mut W,
        groups: &[ColumnGroup],
        by_id: &HashMap<&str, &Task>,
    ) -> anyhow::Result<()> {
        let mut rows = Vec::new();
        for group in groups {
            for id in &group.task_ids {
                let Some(task) = by_id.get(id.as_str()) else {
                    continue;
                };
                let label = group.label.as_deref().map(|l| self.paint(l, "33"));
                rows.push(task_row(task, label));
            }
        }
        if rows.is_empty() {
            writeln!(out, "  (empty)")?;
            return Ok(());
        }
        write_table(out, row_headers(), rows)
    }

    /// One line per container token, followed by its item tokens.
    pub fn write_tokens<W: Write>(&self, mut out: W, groups: &[ColumnGroup]) -> anyhow::Result<()> {
        for group in groups {
            writeln!(out, "{}", self.paint(&group.token(), "36"))?;
            for item in group.item_tokens() {
                writeln!(out, "  {item}")?;
            }
        }
        Ok(())
    }

    pub fn print_patches(&self, patches: &[TaskPatch]) -> anyhow::Result<()> {
        self.write_patches(io::stdout().lock(), patches)
    }

    pub fn write_patches<W: Write>(&self, mut out: W, patches: &[TaskPatch]) -> anyhow::Result<()> {
        if patches.is_empty() {
            writeln!(out, "No changes.")?;
            return Ok(());
        }
        let headers = vec!["ID".to_string(), "Fields".to_string(), "Patch".to_string()];
        let rows = patches
            .iter()
            .map(|patch| -> anyhow::Result<Vec<String>> {
                Ok(vec![
                    short_id(&patch.id).to_string(),
                    patch.field_names().join(","),
                    serde_json::to_string(patch)?,
                ])
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        write_table(out, headers, rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

fn row_headers() -> Vec<String> {
    ["ID", "Group", "Title", "Due"]
        .iter()
        .map(|h| h.to_string())
        .collect()
}

fn task_row(task: &Task, label: Option<String>) -> Vec<String> {
    vec![
        short_id(&task.id).to_string(),
        label.unwrap_or_default(),
        task.title.clone(),
        task.due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    ]
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|h| UnicodeWidthStr::width(h.as_str()))
        .collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    write!(writer, "  ")?;
    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for row in rows {
        write!(writer, "  ")?;
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
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
