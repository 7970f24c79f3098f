use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::dnd::grouping::partition_containers;
use crate::dnd::token::{
  ContainerId,
  PartitionKey,
  item_token
};
use crate::task::{
  Priority,
  Queue,
  Task
};

pub const NO_PRIORITY_LABEL: &str =
  "No priority";

/// Which partition keys a view lays
/// out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
  /// Backlog, today, this week.
  Queues,
  /// The visible dates, then
  /// "unscheduled".
  Dates(Vec<NaiveDate>)
}

impl Layout {
  pub const QUEUES: [Option<Queue>; 3] =
    [None, Some(Queue::Day), Some(
      Queue::Week
    )];

  pub fn keys(
    &self
  ) -> Vec<PartitionKey> {
    match self {
      | Layout::Queues => {
        Self::QUEUES
          .into_iter()
          .map(PartitionKey::Queue)
          .collect()
      }
      | Layout::Dates(dates) => {
        dates
          .iter()
          .copied()
          .map(Some)
          .chain(std::iter::once(None))
          .map(PartitionKey::Date)
          .collect()
      }
    }
  }
}

/// `container -> ordered task ids` for
/// every container of a layout.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct ContainerMap {
  containers:
    BTreeMap<ContainerId, Vec<String>>
}

impl ContainerMap {
  #[tracing::instrument(
    skip(tasks),
    fields(tasks = tasks.len())
  )]
  pub fn build(
    tasks: &[Task],
    layout: &Layout
  ) -> Self {
    let mut map = Self::default();
    for key in layout.keys() {
      for (id, members) in
        partition_containers(tasks, key)
      {
        map.containers.insert(
          id,
          members
            .into_iter()
            .map(|t| t.id.clone())
            .collect()
        );
      }
    }
    tracing::trace!(
      containers = map.containers.len(),
      "built container map"
    );
    map
  }

  pub fn len(&self) -> usize {
    self.containers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.containers.is_empty()
  }

  pub fn get(
    &self,
    id: &ContainerId
  ) -> Option<&[String]> {
    self
      .containers
      .get(id)
      .map(Vec::as_slice)
  }

  pub fn contains(
    &self,
    id: &ContainerId
  ) -> bool {
    self.containers.contains_key(id)
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&ContainerId, &[String])>
  {
    self
      .containers
      .iter()
      .map(|(id, ids)| {
        (id, ids.as_slice())
      })
  }

  pub fn find_container(
    &self,
    task_id: &str
  ) -> Option<ContainerId> {
    self
      .containers
      .iter()
      .find(|(_, ids)| {
        ids.iter().any(|id| id == task_id)
      })
      .map(|(id, _)| *id)
  }

  /// Containers of one partition key,
  /// groups by priority rank with
  /// columns and the no-priority group
  /// last.
  pub fn partition_containers(
    &self,
    key: PartitionKey
  ) -> Vec<(ContainerId, &[String])> {
    let mut out: Vec<(
      ContainerId,
      &[String]
    )> = self
      .containers
      .iter()
      .filter(|(id, _)| {
        id.partition() == key
      })
      .map(|(id, ids)| {
        (*id, ids.as_slice())
      })
      .collect();
    out.sort_by_key(|(id, _)| {
      id.implied_priority()
        .flatten()
        .map_or(usize::MAX, |p| {
          p.rank()
        })
    });
    out
  }

  pub fn has_partition(
    &self,
    key: PartitionKey
  ) -> bool {
    self
      .containers
      .keys()
      .any(|id| id.partition() == key)
  }

  pub fn has_groups(
    &self,
    key: PartitionKey
  ) -> bool {
    self.containers.keys().any(|id| {
      id.is_group()
        && id.partition() == key
    })
  }

  pub fn partition_len(
    &self,
    key: PartitionKey
  ) -> usize {
    self
      .containers
      .iter()
      .filter(|(id, _)| {
        id.partition() == key
      })
      .map(|(_, ids)| ids.len())
      .sum()
  }

  /// Container a task with `priority`
  /// belongs in for `key`: the matching
  /// group when the partition is
  /// grouped, else its column. Missing
  /// containers are created empty.
  pub fn get_or_create(
    &mut self,
    key: PartitionKey,
    priority: Option<Priority>
  ) -> ContainerId {
    let id = if self.has_groups(key) {
      key.group(priority)
    } else {
      key.column()
    };
    self.containers.entry(id).or_default();
    id
  }

  /// Same map with empty containers
  /// dropped; two maps describing the
  /// same placement compare equal
  /// after this.
  pub fn without_empty(&self) -> Self {
    Self {
      containers: self
        .containers
        .iter()
        .filter(|(_, ids)| !ids.is_empty())
        .map(|(id, ids)| {
          (*id, ids.clone())
        })
        .collect()
    }
  }

  pub(crate) fn ids_mut(
    &mut self,
    id: ContainerId
  ) -> &mut Vec<String> {
    self.containers.entry(id).or_default()
  }
}

/// One droppable region as a view
/// renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroup {
  pub container_id: ContainerId,
  /// `None` for a flat column.
  pub label:        Option<String>,
  pub task_ids:     Vec<String>
}

impl ColumnGroup {
  fn new(
    container_id: ContainerId,
    task_ids: Vec<String>
  ) -> Self {
    let label = container_id
      .implied_priority()
      .map(|priority| {
        priority
          .map_or(NO_PRIORITY_LABEL, |p| {
            p.label()
          })
          .to_string()
      });
    Self {
      container_id,
      label,
      task_ids
    }
  }

  pub fn token(&self) -> String {
    self.container_id.to_string()
  }

  pub fn item_tokens(
    &self
  ) -> Vec<String> {
    self
      .task_ids
      .iter()
      .map(|id| item_token(id))
      .collect()
  }
}

/// Render model outside a gesture.
pub fn column_groups(
  tasks: &[Task],
  key: PartitionKey
) -> Vec<ColumnGroup> {
  partition_containers(tasks, key)
    .into_iter()
    .map(|(id, members)| {
      ColumnGroup::new(
        id,
        members
          .into_iter()
          .map(|t| t.id.clone())
          .collect()
      )
    })
    .collect()
}

/// Render model during a gesture. A
/// partition with no containers left
/// still renders as one empty column
/// so it stays a drop target.
pub fn column_groups_from_map(
  map: &ContainerMap,
  key: PartitionKey
) -> Vec<ColumnGroup> {
  let containers =
    map.partition_containers(key);
  if containers.is_empty() {
    return vec![ColumnGroup::new(
      key.column(),
      vec![]
    )];
  }
  containers
    .into_iter()
    .map(|(id, ids)| {
      ColumnGroup::new(id, ids.to_vec())
    })
    .collect()
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
    ContainerMap,
    Layout,
    column_groups,
    column_groups_from_map
  };
  use crate::dnd::token::PartitionKey;
  use crate::task::{
    Priority,
    Queue,
    Task
  };

  fn task(
    id: &str,
    queue: Option<Queue>,
    priority: Option<Priority>,
    order: Option<i64>
  ) -> Task {
    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 1, 9, 0, 0
      )
      .single()
      .expect("valid now");
    let mut t =
      Task::new(id.to_string(), now);
    t.id = id.to_string();
    t.queue = queue;
    t.priority = priority;
    t.order = order;
    t
  }

  #[test]
  fn every_open_task_lands_in_exactly_one_container()
   {
    let mut done = task(
      "done",
      Some(Queue::Day),
      None,
      None
    );
    done.is_done = true;
    let tasks = vec![
      task("a", None, None, Some(0)),
      task(
        "b",
        Some(Queue::Day),
        Some(Priority::P2),
        None
      ),
      task(
        "c",
        Some(Queue::Day),
        None,
        Some(1)
      ),
      task(
        "d",
        Some(Queue::Week),
        None,
        None
      ),
      done,
    ];

    let map = ContainerMap::build(
      &tasks,
      &Layout::Queues
    );
    for t in &tasks {
      let hits = map
        .iter()
        .filter(|(_, ids)| {
          ids.contains(&t.id)
        })
        .count();
      let expected =
        usize::from(!t.is_done);
      assert_eq!(
        hits, expected,
        "task {}",
        t.id
      );
    }

    let day = PartitionKey::Queue(Some(
      Queue::Day
    ));
    assert!(map.has_groups(day));
    assert!(!map.contains(&day.column()));
    assert_eq!(map.partition_len(day), 2);
  }

  #[test]
  fn date_layout_appends_unscheduled_key()
   {
    let d1 = NaiveDate::from_ymd_opt(
      2026, 10, 12
    )
    .expect("date");
    let mut scheduled =
      task("s", None, None, None);
    scheduled.due_date = Some(d1);
    let loose =
      task("u", None, None, None);
    let mut elsewhere =
      task("e", None, None, None);
    elsewhere.due_date =
      NaiveDate::from_ymd_opt(
        2027, 1, 1
      );

    let tasks =
      vec![scheduled, loose, elsewhere];
    let map = ContainerMap::build(
      &tasks,
      &Layout::Dates(vec![d1])
    );

    assert_eq!(
      map.get(
        &PartitionKey::Date(Some(d1))
          .column()
      ),
      Some(&["s".to_string()][..])
    );
    assert_eq!(
      map.get(
        &PartitionKey::Date(None)
          .column()
      ),
      Some(&["u".to_string()][..])
    );
    assert_eq!(
      map.find_container("e"),
      None
    );
  }

  #[test]
  fn render_groups_agree_with_map_outside_a_gesture()
   {
    let tasks = vec![
      task(
        "a",
        Some(Queue::Week),
        Some(Priority::P1),
        Some(1)
      ),
      task(
        "b",
        Some(Queue::Week),
        None,
        Some(0)
      ),
      task(
        "c",
        Some(Queue::Week),
        Some(Priority::P0),
        None
      ),
    ];
    let map = ContainerMap::build(
      &tasks,
      &Layout::Queues
    );
    for key in Layout::Queues.keys() {
      assert_eq!(
        column_groups(&tasks, key),
        column_groups_from_map(&map, key)
      );
    }

    let week = column_groups(
      &tasks,
      PartitionKey::Queue(Some(
        Queue::Week
      ))
    );
    let labels: Vec<Option<String>> =
      week
        .iter()
        .map(|g| g.label.clone())
        .collect();
    assert_eq!(
      labels,
      vec![
        Some("P0 - Critical".to_string()),
        Some(
          "P1 - Important".to_string()
        ),
        Some("No priority".to_string())
      ]
    );
    assert_eq!(
      week[2].item_tokens(),
      vec!["item::b".to_string()]
    );
  }

  #[test]
  fn empty_partition_renders_as_empty_column()
   {
    let map = ContainerMap::default();
    let backlog =
      PartitionKey::Queue(None);
    let groups =
      column_groups_from_map(&map, backlog);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].label, None);
    assert_eq!(
      groups[0].token(),
      "column::null"
    );
  }

  #[test]
  fn get_or_create_respects_partition_form()
   {
    let tasks = vec![
      task(
        "a",
        Some(Queue::Day),
        Some(Priority::P1),
        None
      ),
      task("b", None, None, None),
    ];
    let mut map = ContainerMap::build(
      &tasks,
      &Layout::Queues
    );

    let day = PartitionKey::Queue(Some(
      Queue::Day
    ));
    let created = map.get_or_create(
      day,
      Some(Priority::P4)
    );
    assert_eq!(
      created,
      day.group(Some(Priority::P4))
    );
    assert_eq!(
      map
        .get(&created)
        .map(<[String]>::len),
      Some(0)
    );

    let backlog =
      PartitionKey::Queue(None);
    assert_eq!(
      map.get_or_create(
        backlog,
        Some(Priority::P0)
      ),
      backlog.column()
    );
    let week = PartitionKey::Queue(Some(
      Queue::Week
    ));
    assert_eq!(
      map.get_or_create(week, None),
      week.column()
    );
  }
}
