use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::task::{Task, TaskPatch, apply_patches};

/// JSON-lines task store: `tasks.data` holds every task, `undo.data` a stack of
/// pre-change snapshots.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
    pub undo_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UndoEntry {
    label: String,
    at: DateTime<Utc>,
    tasks: Vec<Task>,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.data");
        let undo_path = data_dir.join("undo.data");

        for path in [&tasks_path, &undo_path] {
            if !path.exists() {
                fs::write(path, "")
                    .with_context(|| format!("failed to create {}", path.display()))?;
            }
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            undo = %undo_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            undo_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.tasks_path).context("failed to load tasks.data")
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, tasks).context("failed to save tasks.data")
    }

    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn add_task(&self, task: Task) -> anyhow::Result<Vec<Task>> {
        let mut tasks = self.load_tasks()?;
        if tasks.iter().any(|t| t.id == task.id) {
            bail!("task id already exists: {}", task.id);
        }
        let before = tasks.clone();
        tasks.push(task);
        self.commit("add", &before, &tasks)?;
        Ok(tasks)
    }

    /// Applies every patch or none: an unknown id rejects the whole batch
    /// before anything is written.
    #[tracing::instrument(skip(self, patches, now), fields(patches = patches.len()))]
    pub fn apply_batch(
        &self,
        patches: &[TaskPatch],
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Task>> {
        let mut tasks = self.load_tasks()?;
        if patches.is_empty() {
            return Ok(tasks);
        }

        let known: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        if let Some(missing) = patches.iter().find(|p| !known.contains(p.id.as_str())) {
            bail!("batch references unknown task: {}", missing.id);
        }

        let before = tasks.clone();
        let changed = apply_patches(&mut tasks, patches, now);
        self.commit("batch", &before, &tasks)?;
        info!(changed, "applied batch update");
        Ok(tasks)
    }

    #[tracing::instrument(skip(self, now))]
    pub fn mark_done(&self, id: &str, now: DateTime<Utc>) -> anyhow::Result<Task> {
        let mut tasks = self.load_tasks()?;
        let idx = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| anyhow!("task not found: {id}"))?;
        if tasks[idx].is_done {
            bail!("task is already done: {id}");
        }

        let before = tasks.clone();
        tasks[idx].mark_done(now);
        let done = tasks[idx].clone();
        self.commit("done", &before, &tasks)?;
        Ok(done)
    }

    /// Saves `after`, then records `before` as the undo snapshot. When the
    /// snapshot cannot be written, `tasks.data` is put back to `before`.
    fn commit(&self, label: &str, before: &[Task], after: &[Task]) -> anyhow::Result<()> {
        self.save_tasks(after)?;
        if let Err(err) = self.push_undo_snapshot(label, before) {
            warn!(label, error = %err, "undo snapshot failed, restoring tasks.data");
            self.save_tasks(before)
                .context("failed to restore tasks.data after undo snapshot failure")?;
            return Err(err.context("failed to record undo snapshot"));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, tasks))]
    fn push_undo_snapshot(&self, label: &str, tasks: &[Task]) -> anyhow::Result<()> {
        let mut entries: Vec<UndoEntry> = load_jsonl(&self.undo_path)?;
        entries.push(UndoEntry {
            label: label.to_string(),
            at: Utc::now(),
            tasks: tasks.to_vec(),
        });
        save_jsonl_atomic(&self.undo_path, &entries)
    }

    /// Restores the newest snapshot; returns the label of the change undone.
    #[tracing::instrument(skip(self))]
    pub fn undo(&self) -> anyhow::Result<Option<String>> {
        let mut entries: Vec<UndoEntry> = load_jsonl(&self.undo_path)?;
        let Some(entry) = entries.pop() else {
            return Ok(None);
        };
        self.save_tasks(&entry.tasks)?;
        save_jsonl_atomic(&self.undo_path, &entries)?;
        info!(label = %entry.label, at = %entry.at, "restored undo snapshot");
        Ok(Some(entry.label))
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    debug!(count = out.len(), "loaded jsonl records");
    Ok(out)
}

#[tracing::instrument(skip(path, records))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = records.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
