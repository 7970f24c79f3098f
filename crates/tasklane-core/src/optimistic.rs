//! Client-side task cache that applies
//! batches immediately and keeps enough
//! to undo each one until the store
//! confirms it.

use chrono::{
  DateTime,
  Utc
};
use tracing::{
  debug,
  warn
};

use crate::task::{
  Task,
  TaskPatch,
  apply_patches
};
use crate::views::MutationBoundary;

pub type BatchId = u64;

#[derive(Debug, Clone)]
struct InflightBatch {
  id:         BatchId,
  patches:    Vec<TaskPatch>,
  applied_at: DateTime<Utc>,
  /// Tasks as they were before the
  /// batch touched them.
  previous:   Vec<Task>
}

#[derive(Debug, Clone, Default)]
pub struct OptimisticTasks {
  tasks:      Vec<Task>,
  inflight:   Vec<InflightBatch>,
  next_batch: BatchId
}

impl OptimisticTasks {
  pub fn new(tasks: Vec<Task>) -> Self {
    Self {
      tasks,
      inflight: Vec::new(),
      next_batch: 0
    }
  }

  pub fn tasks(&self) -> &[Task] {
    &self.tasks
  }

  pub fn into_tasks(self) -> Vec<Task> {
    self.tasks
  }

  /// Unconfirmed batches, oldest first.
  pub fn pending(
    &self
  ) -> Vec<(BatchId, &[TaskPatch])> {
    self
      .inflight
      .iter()
      .map(|b| (b.id, b.patches.as_slice()))
      .collect()
  }

  /// Applies `patches` locally and
  /// remembers how to revert them.
  pub fn apply_at(
    &mut self,
    patches: Vec<TaskPatch>,
    now: DateTime<Utc>
  ) -> BatchId {
    let id = self.next_batch;
    self.next_batch += 1;

    let previous = self.snapshot(&patches);
    let missing = patches
      .iter()
      .filter(|p| {
        !previous.iter().any(|t| t.id == p.id)
      })
      .count();
    if missing > 0 {
      warn!(
        batch = id,
        missing,
        "batch referenced tasks missing from the cache"
      );
    }
    let changed = apply_patches(
      &mut self.tasks,
      &patches,
      now
    );
    debug!(
      batch = id,
      changed,
      "applied optimistic batch"
    );

    self.inflight.push(InflightBatch {
      id,
      patches,
      applied_at: now,
      previous
    });
    id
  }

  /// The store accepted the batch.
  pub fn confirm(
    &mut self,
    id: BatchId
  ) -> bool {
    let before = self.inflight.len();
    self.inflight.retain(|b| b.id != id);
    before != self.inflight.len()
  }

  /// The store rejected the batch. Newer
  /// in-flight batches are unwound, the
  /// rejected one is reverted, then the
  /// newer ones are applied again on top.
  pub fn rollback(
    &mut self,
    id: BatchId
  ) -> bool {
    let Some(index) = self
      .inflight
      .iter()
      .position(|b| b.id == id)
    else {
      return false;
    };
    let newer =
      self.inflight.split_off(index + 1);
    let Some(batch) = self.inflight.pop()
    else {
      return false;
    };

    for later in newer.iter().rev() {
      self.restore(&later.previous);
    }
    self.restore(&batch.previous);

    let replayed = newer.len();
    for later in newer {
      let previous =
        self.snapshot(&later.patches);
      apply_patches(
        &mut self.tasks,
        &later.patches,
        later.applied_at
      );
      self.inflight.push(InflightBatch {
        previous,
        ..later
      });
    }
    warn!(
      batch = id,
      replayed, "rolled back batch"
    );
    true
  }

  fn snapshot(
    &self,
    patches: &[TaskPatch]
  ) -> Vec<Task> {
    self
      .tasks
      .iter()
      .filter(|t| {
        patches.iter().any(|p| p.id == t.id)
      })
      .cloned()
      .collect()
  }

  fn restore(&mut self, snapshots: &[Task]) {
    for snapshot in snapshots {
      if let Some(task) = self
        .tasks
        .iter_mut()
        .find(|t| t.id == snapshot.id)
      {
        *task = snapshot.clone();
      }
    }
  }
}

impl MutationBoundary for OptimisticTasks {
  fn batch_update(
    &mut self,
    patches: Vec<TaskPatch>
  ) {
    self.apply_at(patches, Utc::now());
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };
  use pretty_assertions::assert_eq;

  use super::OptimisticTasks;
  use crate::task::{
    Queue,
    Task,
    TaskPatch
  };

  fn cache() -> OptimisticTasks {
    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 1, 9, 0, 0
      )
      .single()
      .expect("valid now");
    let mut a = Task::new("a".into(), now);
    a.id = "a".into();
    a.order = Some(0);
    OptimisticTasks::new(vec![a])
  }

  fn move_to_day() -> Vec<TaskPatch> {
    let mut patch = TaskPatch::new("a");
    patch.queue = Some(Some(Queue::Day));
    vec![patch]
  }

  #[test]
  fn rollback_restores_snapshot() {
    let mut tasks = cache();
    let original = tasks.tasks().to_vec();
    let id = tasks.apply_at(
      move_to_day(),
      Utc::now()
    );
    assert_eq!(
      tasks.tasks()[0].queue,
      Some(Queue::Day)
    );
    assert_eq!(tasks.pending().len(), 1);

    assert!(tasks.rollback(id));
    assert_eq!(tasks.tasks(), original.as_slice());
    assert!(tasks.pending().is_empty());
    assert!(!tasks.rollback(id));
  }

  #[test]
  fn confirm_keeps_the_change() {
    let mut tasks = cache();
    let id = tasks.apply_at(
      move_to_day(),
      Utc::now()
    );
    assert!(tasks.confirm(id));
    assert!(!tasks.confirm(id));
    assert_eq!(
      tasks.tasks()[0].queue,
      Some(Queue::Day)
    );
  }

  #[test]
  fn rolling_back_an_older_batch_keeps_newer_ones()
   {
    let mut tasks = cache();
    let original = tasks.tasks().to_vec();
    let first = tasks.apply_at(
      move_to_day(),
      Utc::now()
    );
    let mut reorder = TaskPatch::new("a");
    reorder.order = Some(5);
    let second = tasks.apply_at(
      vec![reorder],
      Utc::now()
    );

    assert!(tasks.rollback(first));
    assert_eq!(tasks.tasks()[0].queue, None);
    assert_eq!(
      tasks.tasks()[0].order,
      Some(5)
    );
    assert_eq!(
      tasks
        .pending()
        .iter()
        .map(|(id, _)| *id)
        .collect::<Vec<_>>(),
      vec![second]
    );

    assert!(tasks.rollback(second));
    assert_eq!(tasks.tasks(), original.as_slice());
  }
}
