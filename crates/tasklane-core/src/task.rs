use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use tasklane_shared::{Priority, Queue, TaskPatch};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub is_done: bool,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub queue: Option<Queue>,

    #[serde(default)]
    pub priority: Option<Priority>,

    #[serde(default)]
    pub order: Option<i64>,

    #[serde(default)]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: String, now: DateTime<Utc>) -> Self {
        Self {
            id: new_task_id(),
            title,
            description: String::new(),
            is_done: false,
            category: None,
            queue: None,
            priority: None,
            order: None,
            due_date: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies every present field of `patch`; returns whether anything changed.
    pub fn apply_patch(&mut self, patch: &TaskPatch, now: DateTime<Utc>) -> bool {
        let before = (self.order, self.queue, self.priority, self.due_date);

        if let Some(order) = patch.order {
            self.order = Some(order);
        }
        if let Some(queue) = patch.queue {
            self.queue = queue;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }

        let changed = before != (self.order, self.queue, self.priority, self.due_date);
        if !patch.is_empty() {
            self.updated_at = now;
        }
        changed
    }

    pub fn mark_done(&mut self, now: DateTime<Utc>) {
        self.is_done = true;
        self.completed_at = Some(now);
        self.updated_at = now;
    }
}

pub fn new_task_id() -> String {
    format!("task-{}", Uuid::new_v4().simple())
}

/// Applies a batch to a task list in place, skipping ids that are not present.
/// Returns how many tasks actually changed.
pub fn apply_patches(tasks: &mut [Task], patches: &[TaskPatch], now: DateTime<Utc>) -> usize {
    let mut changed = 0;
    for patch in patches {
        if let Some(task) = tasks.iter_mut().find(|task| task.id == patch.id)
            && task.apply_patch(patch, now)
        {
            changed += 1;
        }
    }
    changed
}
