use super::{
  DragController,
  DragEvent,
  MutationBoundary,
  Transition
};
use crate::dnd::{
  ColumnGroup,
  Layout,
  PartitionKey
};
use crate::task::{
  Queue,
  Task
};

pub fn queue_title(
  queue: Option<Queue>
) -> &'static str {
  match queue {
    | None => "Backlog",
    | Some(Queue::Day) => "Today",
    | Some(Queue::Week) => "This Week"
  }
}

#[derive(Debug, Clone)]
pub struct WorkColumn<'a> {
  pub title:  &'static str,
  pub queue:  Option<Queue>,
  pub groups: Vec<ColumnGroup>,
  pub total:  usize,
  pub done:   Vec<&'a Task>
}

/// Backlog, today and this-week columns.
#[derive(Debug, Clone)]
pub struct WorkView {
  controller: DragController
}

impl Default for WorkView {
  fn default() -> Self {
    Self::new()
  }
}

impl WorkView {
  pub fn new() -> Self {
    Self {
      controller: DragController::new(
        Layout::Queues
      )
    }
  }

  pub fn controller(
    &self
  ) -> &DragController {
    &self.controller
  }

  pub fn handle<B>(
    &mut self,
    event: &DragEvent,
    tasks: &[Task],
    boundary: &mut B
  ) -> Transition
  where
    B: MutationBoundary + ?Sized
  {
    self
      .controller
      .handle(event, tasks, boundary)
  }

  pub fn column_groups(
    &self,
    tasks: &[Task],
    queue: Option<Queue>
  ) -> Vec<ColumnGroup> {
    self.controller.column_groups(
      tasks,
      PartitionKey::Queue(queue)
    )
  }

  pub fn column_count(
    &self,
    tasks: &[Task],
    queue: Option<Queue>
  ) -> usize {
    self.controller.column_count(
      tasks,
      PartitionKey::Queue(queue)
    )
  }

  pub fn columns<'a>(
    &self,
    tasks: &'a [Task]
  ) -> Vec<WorkColumn<'a>> {
    Layout::QUEUES
      .iter()
      .map(|&queue| {
        WorkColumn {
          title: queue_title(queue),
          queue,
          groups: self
            .column_groups(tasks, queue),
          total: self
            .column_count(tasks, queue),
          done: done_tasks(tasks, queue)
        }
      })
      .collect()
  }

  pub fn send_to<B>(
    &self,
    task_id: &str,
    queue: Option<Queue>,
    tasks: &[Task],
    boundary: &mut B
  ) -> Transition
  where
    B: MutationBoundary + ?Sized
  {
    self.controller.send_to(
      task_id,
      PartitionKey::Queue(queue),
      tasks,
      boundary
    )
  }
}

/// Completed tasks of a queue, most
/// recently touched first.
pub fn done_tasks(
  tasks: &[Task],
  queue: Option<Queue>
) -> Vec<&Task> {
  let mut done: Vec<&Task> = tasks
    .iter()
    .filter(|t| {
      t.is_done && t.queue == queue
    })
    .collect();
  done.sort_by(|a, b| {
    b.updated_at.cmp(&a.updated_at)
  });
  done
}
