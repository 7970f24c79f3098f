//! Drag orchestration shared by the
//! queue-based and date-based views.

pub mod sensor;
pub mod week;
pub mod work;

use tracing::{
  debug,
  info,
  warn
};

pub use tasklane_shared::DragEventDto as DragEvent;

use crate::dnd::{
  ColumnGroup,
  ContainerMap,
  DragSession,
  Layout,
  PartitionKey,
  Token,
  column_groups,
  column_groups_from_map,
  index_tasks,
  reduce_patches
};
use crate::task::{
  Task,
  TaskPatch
};

/// Where finished gestures send their
/// patches. Implementations apply the
/// batch atomically and own any
/// rollback; the caller never waits on
/// the outcome.
pub trait MutationBoundary {
  fn batch_update(
    &mut self,
    patches: Vec<TaskPatch>
  );
}

/// Records every batch it receives.
impl MutationBoundary
  for Vec<Vec<TaskPatch>>
{
  fn batch_update(
    &mut self,
    patches: Vec<TaskPatch>
  ) {
    self.push(patches);
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Transition {
  /// Event had no effect on the
  /// controller state.
  Ignored,
  Started,
  Moved,
  /// A session exists but the event
  /// changed nothing.
  Unchanged,
  Dropped {
    patches: usize
  },
  Cancelled
}

/// Holds at most one live
/// [`DragSession`] and turns drag
/// events into at most one batch per
/// gesture.
#[derive(Debug, Clone)]
pub struct DragController {
  layout:  Layout,
  session: Option<DragSession>
}

impl DragController {
  pub fn new(layout: Layout) -> Self {
    Self {
      layout,
      session: None
    }
  }

  pub fn layout(&self) -> &Layout {
    &self.layout
  }

  /// Refused while a gesture is
  /// running.
  pub fn set_layout(
    &mut self,
    layout: Layout
  ) -> bool {
    if self.is_dragging() {
      return false;
    }
    self.layout = layout;
    true
  }

  pub fn is_dragging(&self) -> bool {
    self.session.is_some()
  }

  pub fn session(
    &self
  ) -> Option<&DragSession> {
    self.session.as_ref()
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
    match event {
      | DragEvent::Start {
        active
      } => self.start(active, tasks),
      | DragEvent::Over {
        active,
        over
      } => {
        self.over(active, over.as_deref())
      }
      | DragEvent::End {
        active,
        over
      } => {
        self.end(
          active,
          over.as_deref(),
          tasks,
          boundary
        )
      }
      | DragEvent::Cancel {
        ..
      } => self.cancel()
    }
  }

  fn start(
    &mut self,
    active: &str,
    tasks: &[Task]
  ) -> Transition {
    if let Some(previous) =
      self.session.take()
    {
      warn!(
        previous = %previous.active_id(),
        "drag started while another was active; discarding the old one"
      );
      previous.cancel();
    }
    match DragSession::start(
      active,
      tasks,
      &self.layout
    ) {
      | Some(session) => {
        debug!(
          task_id = %session.active_id(),
          "drag started"
        );
        self.session = Some(session);
        Transition::Started
      }
      | None => Transition::Ignored
    }
  }

  fn over(
    &mut self,
    active: &str,
    over: Option<&str>
  ) -> Transition {
    let Some(session) =
      self.session.as_mut()
    else {
      return Transition::Ignored;
    };
    if !names_session(session, active) {
      debug!(
        active,
        "over event for a different draggable"
      );
      return Transition::Unchanged;
    }
    let Some(over) = over else {
      return Transition::Unchanged;
    };
    if session.hover(over) {
      Transition::Moved
    } else {
      Transition::Unchanged
    }
  }

  fn end<B>(
    &mut self,
    active: &str,
    over: Option<&str>,
    tasks: &[Task],
    boundary: &mut B
  ) -> Transition
  where
    B: MutationBoundary + ?Sized
  {
    let Some(session) =
      self.session.take()
    else {
      return Transition::Ignored;
    };
    if !names_session(&session, active) {
      debug!(
        active,
        session = %session.active_id(),
        "end event names another draggable; using the session's"
      );
    }

    let Some(outcome) =
      session.finish(over)
    else {
      return Transition::Cancelled;
    };

    let patches = reduce_patches(
      &outcome.containers,
      &outcome.touched,
      &index_tasks(tasks)
    );
    let count = patches.len();
    if count > 0 {
      info!(
        patches = count,
        containers = outcome.touched.len(),
        "dispatching drop batch"
      );
      boundary.batch_update(patches);
    }
    Transition::Dropped {
      patches: count
    }
  }

  fn cancel(&mut self) -> Transition {
    match self.session.take() {
      | Some(session) => {
        session.cancel();
        Transition::Cancelled
      }
      | None => Transition::Ignored
    }
  }

  /// Moves a task to the end of the
  /// container it would occupy in
  /// `key`, without a gesture. The task
  /// keeps its priority.
  pub fn send_to<B>(
    &self,
    task_id: &str,
    key: PartitionKey,
    tasks: &[Task],
    boundary: &mut B
  ) -> Transition
  where
    B: MutationBoundary + ?Sized
  {
    if self.is_dragging()
      || !self.layout.keys().contains(&key)
    {
      return Transition::Ignored;
    }
    let Some(task) = tasks
      .iter()
      .find(|t| t.id == task_id)
    else {
      return Transition::Ignored;
    };

    let mut map = ContainerMap::build(
      tasks,
      &self.layout
    );
    let Some(source) =
      map.find_container(task_id)
    else {
      return Transition::Ignored;
    };
    let destination =
      map.get_or_create(key, task.priority);
    if destination == source {
      return Transition::Unchanged;
    }

    map
      .ids_mut(source)
      .retain(|id| id != task_id);
    map
      .ids_mut(destination)
      .push(task_id.to_string());

    let patches = reduce_patches(
      &map,
      &[source, destination],
      &index_tasks(tasks)
    );
    let count = patches.len();
    if count > 0 {
      info!(
        task_id,
        %destination,
        patches = count,
        "dispatching send-to batch"
      );
      boundary.batch_update(patches);
    }
    Transition::Dropped {
      patches: count
    }
  }

  /// Groups to render for `key`: the
  /// live session map while dragging,
  /// the task list otherwise.
  pub fn column_groups(
    &self,
    tasks: &[Task],
    key: PartitionKey
  ) -> Vec<ColumnGroup> {
    match &self.session {
      | Some(session) => {
        column_groups_from_map(
          session.containers(),
          key
        )
      }
      | None => column_groups(tasks, key)
    }
  }

  pub fn column_count(
    &self,
    tasks: &[Task],
    key: PartitionKey
  ) -> usize {
    match &self.session {
      | Some(session) => {
        session
          .containers()
          .partition_len(key)
      }
      | None => {
        tasks
          .iter()
          .filter(|t| {
            !t.is_done && key.contains(t)
          })
          .count()
      }
    }
  }
}

fn names_session(
  session: &DragSession,
  active: &str
) -> bool {
  Token::parse(active)
    .as_ref()
    .and_then(Token::as_item)
    == Some(session.active_id())
}
