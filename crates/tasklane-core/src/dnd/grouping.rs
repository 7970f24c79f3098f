use std::cmp::Ordering;

use crate::dnd::token::{
  ContainerId,
  PartitionKey
};
use crate::task::{
  Priority,
  Task
};

#[derive(Debug, Clone, PartialEq)]
pub struct PriorityGroup<'a> {
  pub priority: Option<Priority>,
  pub tasks:    Vec<&'a Task>
}

/// Presentation order: explicit `order`
/// ascending, then unordered tasks
/// newest first.
pub fn compare_presentation(
  a: &Task,
  b: &Task
) -> Ordering {
  match (a.order, b.order) {
    | (Some(x), Some(y)) => x.cmp(&y),
    | (Some(_), None) => Ordering::Less,
    | (None, Some(_)) => {
      Ordering::Greater
    }
    | (None, None) => {
      b.created_at.cmp(&a.created_at)
    }
  }
}

pub fn sort_tasks(tasks: &mut [&Task]) {
  tasks.sort_by(|a, b| {
    compare_presentation(a, b)
  });
}

/// `None` means "render one flat
/// column": no task carries a priority.
/// A partition with no priorities at
/// all is never shown as a lone "no
/// priority" group.
pub fn group_by_priority<'a>(
  tasks: &[&'a Task]
) -> Option<Vec<PriorityGroup<'a>>> {
  if !tasks
    .iter()
    .any(|t| t.priority.is_some())
  {
    return None;
  }

  let buckets = Priority::ALL
    .into_iter()
    .map(Some)
    .chain(std::iter::once(None));

  let groups = buckets
    .filter_map(|priority| {
      let members: Vec<&'a Task> =
        tasks
          .iter()
          .copied()
          .filter(|t| {
            t.priority == priority
          })
          .collect();
      (!members.is_empty()).then_some(
        PriorityGroup {
          priority,
          tasks: members
        }
      )
    })
    .collect();

  Some(groups)
}

/// Containers for one partition key in
/// display order. Shared by the map
/// builder and the render path so both
/// agree exactly.
pub fn partition_containers<'a>(
  tasks: &'a [Task],
  key: PartitionKey
) -> Vec<(ContainerId, Vec<&'a Task>)> {
  let mut members: Vec<&'a Task> =
    tasks
      .iter()
      .filter(|t| {
        !t.is_done && key.contains(t)
      })
      .collect();
  sort_tasks(&mut members);

  match group_by_priority(&members) {
    | Some(groups) => {
      groups
        .into_iter()
        .map(|group| {
          (
            key.group(group.priority),
            group.tasks
          )
        })
        .collect()
    }
    | None => {
      vec![(key.column(), members)]
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    TimeZone,
    Utc
  };

  use super::{
    group_by_priority,
    partition_containers,
    sort_tasks
  };
  use crate::dnd::token::PartitionKey;
  use crate::task::{
    Priority,
    Queue,
    Task
  };

  fn task(
    id: &str,
    order: Option<i64>,
    priority: Option<Priority>,
    age_minutes: i64
  ) -> Task {
    let base = Utc
      .with_ymd_and_hms(
        2026, 10, 1, 9, 0, 0
      )
      .single()
      .expect("valid base");
    let mut t = Task::new(
      id.to_string(),
      base - Duration::minutes(
        age_minutes
      )
    );
    t.id = id.to_string();
    t.order = order;
    t.priority = priority;
    t
  }

  fn ids(tasks: &[&Task]) -> Vec<String> {
    tasks
      .iter()
      .map(|t| t.id.clone())
      .collect()
  }

  #[test]
  fn ordered_tasks_precede_unordered_newest_first()
   {
    let a = task("a", Some(2), None, 0);
    let b = task("b", None, None, 30);
    let c = task("c", Some(0), None, 0);
    let d = task("d", None, None, 5);
    let mut refs = vec![&a, &b, &c, &d];
    sort_tasks(&mut refs);
    assert_eq!(
      ids(&refs),
      vec!["c", "a", "d", "b"]
    );
  }

  #[test]
  fn unprioritized_partition_stays_flat()
   {
    let a = task("a", None, None, 0);
    let b = task("b", None, None, 1);
    assert!(
      group_by_priority(&[&a, &b])
        .is_none()
    );
    assert!(
      group_by_priority(&[]).is_none()
    );
  }

  #[test]
  fn groups_follow_rank_with_no_priority_last()
   {
    let a =
      task("a", None, None, 0);
    let b = task(
      "b",
      None,
      Some(Priority::P3),
      1
    );
    let c = task(
      "c",
      None,
      Some(Priority::P0),
      2
    );
    let d = task(
      "d",
      None,
      Some(Priority::P3),
      3
    );

    let groups =
      group_by_priority(&[&a, &b, &c, &d])
        .expect("grouped");
    let labels: Vec<Option<Priority>> =
      groups
        .iter()
        .map(|g| g.priority)
        .collect();
    assert_eq!(
      labels,
      vec![
        Some(Priority::P0),
        Some(Priority::P3),
        None
      ]
    );
    assert_eq!(
      ids(&groups[1].tasks),
      vec!["b", "d"]
    );
  }

  #[test]
  fn one_p1_and_one_unprioritized_make_two_groups()
   {
    let a = task(
      "a",
      None,
      Some(Priority::P1),
      0
    );
    let b = task("b", None, None, 1);
    let groups =
      group_by_priority(&[&a, &b])
        .expect("grouped");
    let labels: Vec<&str> = groups
      .iter()
      .map(|g| {
        g.priority.map_or(
          "no priority",
          Priority::label
        )
      })
      .collect();
    assert_eq!(
      labels,
      vec!["P1 - Important", "no priority"]
    );
  }

  #[test]
  fn partition_skips_done_and_foreign_tasks()
   {
    let mut a = task("a", None, None, 0);
    a.queue = Some(Queue::Day);
    let mut b = task("b", None, None, 1);
    b.queue = Some(Queue::Day);
    b.is_done = true;
    let mut c = task("c", None, None, 2);
    c.queue = Some(Queue::Week);

    let tasks = vec![a, b, c];
    let day = PartitionKey::Queue(Some(
      Queue::Day
    ));
    let containers =
      partition_containers(&tasks, day);
    assert_eq!(containers.len(), 1);
    assert_eq!(
      containers[0].0,
      day.column()
    );
    assert_eq!(
      ids(&containers[0].1),
      vec!["a"]
    );
  }
}
