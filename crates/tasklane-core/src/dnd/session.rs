//! Live container map for one drag
//! gesture.
//!
//! A [`DragSession`] exists from pick-up
//! to drop or cancel. Every transition
//! is synchronous and degrades to a
//! no-op when a token does not resolve;
//! a no-op never touches the map.

use tracing::{
  debug,
  trace
};

use crate::dnd::container_map::{
  ContainerMap,
  Layout
};
use crate::dnd::token::{
  ContainerId,
  Token
};
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct DragSession {
  active:     Task,
  containers: ContainerMap
}

/// Final placement handed to the patch
/// reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropOutcome {
  pub containers: ContainerMap,
  /// Source first, then destination
  /// when it differs.
  pub touched:    Vec<ContainerId>
}

/// Where the dragged item goes inside
/// its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
  Anchor(String),
  End,
  Stay
}

impl DragSession {
  /// Picks up the task named by an
  /// `item::` token. `None` keeps the
  /// caller idle.
  #[tracing::instrument(
    skip(tasks, layout),
    fields(tasks = tasks.len())
  )]
  pub fn start(
    active_token: &str,
    tasks: &[Task],
    layout: &Layout
  ) -> Option<Self> {
    let Some(Token::Item(task_id)) =
      Token::parse(active_token)
    else {
      debug!(
        "active token is not an item"
      );
      return None;
    };
    let Some(task) = tasks
      .iter()
      .find(|t| t.id == task_id)
    else {
      debug!(
        task_id = %task_id,
        "dragged task not found"
      );
      return None;
    };

    Some(Self {
      active:     task.clone(),
      containers: ContainerMap::build(
        tasks, layout
      )
    })
  }

  pub fn active_task(&self) -> &Task {
    &self.active
  }

  pub fn active_id(&self) -> &str {
    &self.active.id
  }

  pub fn containers(
    &self
  ) -> &ContainerMap {
    &self.containers
  }

  /// Pointer moved over `over_token`.
  /// Returns whether the map changed.
  pub fn hover(
    &mut self,
    over_token: &str
  ) -> bool {
    let Some(token) =
      Token::parse(over_token)
    else {
      trace!(
        over_token,
        "hover over unrecognized token"
      );
      return false;
    };
    let Some(source) = self
      .containers
      .find_container(&self.active.id)
    else {
      return false;
    };
    let Some(raw_destination) =
      resolve_destination(
        &self.containers,
        &token
      )
    else {
      return false;
    };
    if raw_destination == source {
      return false;
    }

    let destination =
      redirect_column_drop(
        &self.containers,
        raw_destination
      );
    if destination == source {
      return false;
    }

    let placement = match &token {
      | Token::Item(id) => {
        Placement::Anchor(id.clone())
      }
      | Token::Container(_) => {
        Placement::End
      }
    };

    let moved = move_between(
      &mut self.containers,
      &self.active.id,
      source,
      destination,
      &placement
    );
    if moved {
      trace!(
        %source,
        %destination,
        "moved dragged item"
      );
    }
    moved
  }

  /// Ends the gesture. `over_token ==
  /// None` (released outside every
  /// target) is a cancel.
  pub fn finish(
    self,
    over_token: Option<&str>
  ) -> Option<DropOutcome> {
    let Some(over_token) = over_token
    else {
      debug!(
        "released outside any target; \
         cancelling"
      );
      return None;
    };

    let DragSession {
      active,
      mut containers
    } = self;
    let active_id = active.id;

    let source = containers
      .find_container(&active_id)?;

    let (destination, placement) =
      match Token::parse(over_token) {
        | Some(token) => {
          match resolve_destination(
            &containers,
            &token
          ) {
            | Some(raw) => {
              let placement = match token
              {
                | Token::Item(id) => {
                  Placement::Anchor(id)
                }
                | Token::Container(_) => {
                  Placement::End
                }
              };
              (
                redirect_column_drop(
                  &containers,
                  raw
                ),
                placement
              )
            }
            | None => {
              (source, Placement::Stay)
            }
          }
        }
        | None => {
          (source, Placement::Stay)
        }
      };

    let touched = if destination
      == source
    {
      reorder_within(
        &mut containers,
        &active_id,
        source,
        &placement
      );
      vec![source]
    } else {
      settle_across(
        &mut containers,
        &active_id,
        source,
        destination,
        &placement
      );
      vec![source, destination]
    };

    debug!(
      task_id = %active_id,
      touched = touched.len(),
      "drop resolved"
    );
    Some(DropOutcome {
      containers,
      touched
    })
  }

  /// Explicit cancel; nothing is
  /// emitted.
  pub fn cancel(self) {
    debug!(
      task_id = %self.active.id,
      "drag cancelled"
    );
  }
}

/// Hovered item -> its container;
/// hovered container -> itself, as long
/// as its partition is laid out.
pub fn resolve_destination(
  containers: &ContainerMap,
  over: &Token
) -> Option<ContainerId> {
  match over {
    | Token::Item(id) => {
      containers.find_container(id)
    }
    | Token::Container(id) => {
      containers
        .has_partition(id.partition())
        .then_some(*id)
    }
  }
}

/// A column whose partition currently
/// also has group containers is not a
/// valid resting place; send the drop
/// to that partition's no-priority
/// group instead. The group may not
/// exist yet; it is created when the
/// move is applied.
pub fn redirect_column_drop(
  containers: &ContainerMap,
  destination: ContainerId
) -> ContainerId {
  if !destination.is_column() {
    return destination;
  }
  let key = destination.partition();
  if containers.has_groups(key) {
    key.group(None)
  } else {
    destination
  }
}

fn move_between(
  containers: &mut ContainerMap,
  active_id: &str,
  source: ContainerId,
  destination: ContainerId,
  placement: &Placement
) -> bool {
  let Some(index) = containers
    .get(&source)
    .and_then(|ids| {
      ids
        .iter()
        .position(|id| id == active_id)
    })
  else {
    return false;
  };

  let moving =
    containers.ids_mut(source).remove(
      index
    );
  insert_at_placement(
    containers.ids_mut(destination),
    moving,
    placement
  );
  true
}

fn reorder_within(
  containers: &mut ContainerMap,
  active_id: &str,
  container: ContainerId,
  placement: &Placement
) {
  let items =
    containers.ids_mut(container);
  let Some(current) = items
    .iter()
    .position(|id| id == active_id)
  else {
    return;
  };
  let desired = match placement {
    | Placement::Anchor(anchor) => {
      items
        .iter()
        .position(|id| id == anchor)
        .unwrap_or(current)
    }
    | Placement::End => items.len() - 1,
    | Placement::Stay => current
  };
  if desired != current {
    let moving = items.remove(current);
    items.insert(desired, moving);
  }
}

/// Hovers may have left the item in
/// either list; rebuild the final
/// placement from scratch.
fn settle_across(
  containers: &mut ContainerMap,
  active_id: &str,
  source: ContainerId,
  destination: ContainerId,
  placement: &Placement
) {
  containers
    .ids_mut(source)
    .retain(|id| id != active_id);

  let items =
    containers.ids_mut(destination);
  items.retain(|id| id != active_id);
  insert_at_placement(
    items,
    active_id.to_string(),
    placement
  );
}

fn insert_at_placement(
  items: &mut Vec<String>,
  moving: String,
  placement: &Placement
) {
  let anchor_index = match placement {
    | Placement::Anchor(anchor) => {
      items
        .iter()
        .position(|id| id == anchor)
    }
    | Placement::End
    | Placement::Stay => None
  };
  match anchor_index {
    | Some(index) => {
      items.insert(index + 1, moving)
    }
    | None => items.push(moving)
  }
}
