//! Grouping and reordering engine behind
//! drag-and-drop.
//!
//! Tasks are partitioned by a
//! [`PartitionKey`] (queue or date) into
//! containers that are either one flat
//! column or a set of priority groups.
//! A gesture snapshots the
//! [`ContainerMap`], mutates it through
//! a [`DragSession`] and ends in a
//! [`DropOutcome`] that
//! [`reduce_patches`] turns into field
//! patches.

pub mod container_map;
pub mod grouping;
pub mod patch;
pub mod session;
pub mod token;

pub use container_map::{
  ColumnGroup,
  ContainerMap,
  Layout,
  NO_PRIORITY_LABEL,
  column_groups,
  column_groups_from_map
};
pub use grouping::{
  PriorityGroup,
  compare_presentation,
  group_by_priority,
  partition_containers,
  sort_tasks
};
pub use patch::{
  index_tasks,
  reduce_patches
};
pub use session::{
  DragSession,
  DropOutcome,
  redirect_column_drop,
  resolve_destination
};
pub use token::{
  ContainerId,
  PartitionKey,
  Token,
  item_token
};
