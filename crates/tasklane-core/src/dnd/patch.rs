use std::collections::{
  HashMap,
  HashSet
};

use crate::dnd::container_map::ContainerMap;
use crate::dnd::token::ContainerId;
use crate::task::{
  Task,
  TaskPatch
};

pub fn index_tasks(
  tasks: &[Task]
) -> HashMap<&str, &Task> {
  tasks
    .iter()
    .map(|t| (t.id.as_str(), t))
    .collect()
}

/// Minimal field patches that make the
/// task records agree with `containers`
/// for every touched container.
///
/// Each touched container is renumbered
/// densely from zero. Queue and due
/// date follow the container's
/// partition; priority is only implied
/// by group containers. Tasks with no
/// differences produce no patch.
pub fn reduce_patches(
  containers: &ContainerMap,
  touched: &[ContainerId],
  tasks_by_id: &HashMap<&str, &Task>
) -> Vec<TaskPatch> {
  let mut seen = HashSet::new();
  let mut patches = Vec::new();

  for container in touched {
    if !seen.insert(*container) {
      continue;
    }
    let Some(task_ids) =
      containers.get(container)
    else {
      continue;
    };
    let queue = container.implied_queue();
    let due_date =
      container.implied_date();
    let priority =
      container.implied_priority();

    for (index, task_id) in
      task_ids.iter().enumerate()
    {
      let Some(task) =
        tasks_by_id.get(task_id.as_str())
      else {
        tracing::warn!(
          task_id = %task_id,
          "container references unknown \
           task; skipping"
        );
        continue;
      };

      let mut patch =
        TaskPatch::new(task_id.clone());
      let order = index as i64;
      if task.order != Some(order) {
        patch.order = Some(order);
      }
      if let Some(queue) = queue
        && task.queue != queue
      {
        patch.queue = Some(queue);
      }
      if let Some(due_date) = due_date
        && task.due_date != due_date
      {
        patch.due_date = Some(due_date);
      }
      if let Some(priority) = priority
        && task.priority != priority
      {
        patch.priority = Some(priority);
      }

      if !patch.is_empty() {
        patches.push(patch);
      }
    }
  }

  patches
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };
  use pretty_assertions::assert_eq;

  use super::{
    index_tasks,
    reduce_patches
  };
  use crate::dnd::container_map::{
    ContainerMap,
    Layout
  };
  use crate::dnd::token::PartitionKey;
  use crate::task::{
    Priority,
    Queue,
    Task,
    TaskPatch
  };

  fn task(id: &str) -> Task {
    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 1, 9, 0, 0
      )
      .single()
      .expect("valid now");
    let mut t =
      Task::new(id.to_string(), now);
    t.id = id.to_string();
    t
  }

  #[test]
  fn unchanged_container_emits_nothing()
   {
    let mut a = task("a");
    a.order = Some(0);
    let mut b = task("b");
    b.order = Some(1);
    let tasks = vec![a, b];
    let map = ContainerMap::build(
      &tasks,
      &Layout::Queues
    );
    let backlog =
      PartitionKey::Queue(None).column();

    let patches = reduce_patches(
      &map,
      &[backlog],
      &index_tasks(&tasks)
    );
    assert!(patches.is_empty());
  }

  #[test]
  fn null_orders_are_renumbered_densely()
   {
    let tasks =
      vec![task("a"), task("b")];
    let map = ContainerMap::build(
      &tasks,
      &Layout::Queues
    );
    let backlog =
      PartitionKey::Queue(None).column();

    let patches = reduce_patches(
      &map,
      &[backlog, backlog],
      &index_tasks(&tasks)
    );
    let orders: Vec<(String, Option<i64>)> =
      patches
        .iter()
        .map(|p| (p.id.clone(), p.order))
        .collect();
    assert_eq!(
      orders,
      vec![
        ("a".to_string(), Some(0)),
        ("b".to_string(), Some(1))
      ]
    );
  }

  #[test]
  fn group_implies_priority_and_date_group_implies_due()
   {
    let day = NaiveDate::from_ymd_opt(
      2026, 10, 14
    )
    .expect("date");
    let mut a = task("a");
    a.order = Some(0);
    a.queue = Some(Queue::Week);
    a.priority = Some(Priority::P2);
    let tasks = vec![a];

    let mut map = ContainerMap::default();
    let target =
      PartitionKey::Date(Some(day))
        .group(None);
    map
      .ids_mut(target)
      .push("a".to_string());

    let patches = reduce_patches(
      &map,
      &[target],
      &index_tasks(&tasks)
    );
    let mut expected = TaskPatch::new("a");
    expected.priority = Some(None);
    expected.due_date = Some(Some(day));
    assert_eq!(patches, vec![expected]);
  }

  #[test]
  fn column_keeps_existing_priority() {
    let mut a = task("a");
    a.order = Some(0);
    a.priority = Some(Priority::P1);
    let tasks = vec![a];

    let mut map = ContainerMap::default();
    let day_column =
      PartitionKey::Queue(Some(
        Queue::Day
      ))
      .column();
    map
      .ids_mut(day_column)
      .push("a".to_string());

    let patches = reduce_patches(
      &map,
      &[day_column],
      &index_tasks(&tasks)
    );
    let mut expected = TaskPatch::new("a");
    expected.queue = Some(Some(Queue::Day));
    assert_eq!(patches, vec![expected]);
  }
}
