//! Date columns for one Monday-to-Sunday
//! week plus an "unscheduled" column.
//!
//! Week navigation and the weekend
//! toggle change which dates are laid
//! out, so both are refused while a
//! drag is live.

use chrono::{
  Duration,
  NaiveDate
};
use tracing::info;

use super::{
  DragController,
  DragEvent,
  MutationBoundary,
  Transition
};
use crate::datetime::{
  format_day_title,
  format_week_label,
  is_weekend,
  week_days
};
use crate::dnd::{
  ColumnGroup,
  Layout,
  PartitionKey,
  sort_tasks
};
use crate::task::{
  Task,
  TaskPatch
};

#[derive(Debug, Clone)]
pub struct DayColumn {
  pub date:     NaiveDate,
  pub title:    String,
  pub is_today: bool,
  pub is_past:  bool,
  pub groups:   Vec<ColumnGroup>,
  pub total:    usize
}

#[derive(Debug, Clone)]
pub struct WeekView {
  controller:       DragController,
  today:            NaiveDate,
  week_offset:      i64,
  weekend_expanded: bool
}

impl WeekView {
  pub fn new(
    today: NaiveDate,
    weekend_expanded: bool
  ) -> Self {
    let mut view = Self {
      controller: DragController::new(
        Layout::Dates(Vec::new())
      ),
      today,
      week_offset: 0,
      weekend_expanded
    };
    view.refresh_layout();
    view
  }

  pub fn controller(
    &self
  ) -> &DragController {
    &self.controller
  }

  pub fn today(&self) -> NaiveDate {
    self.today
  }

  pub fn week_offset(&self) -> i64 {
    self.week_offset
  }

  pub fn weekend_expanded(&self) -> bool {
    self.weekend_expanded
  }

  pub fn week_days(&self) -> [NaiveDate; 7] {
    week_days(
      self.today
        + Duration::weeks(self.week_offset)
    )
  }

  /// Weekdays, plus Saturday and Sunday
  /// when the weekend is expanded.
  pub fn visible_dates(
    &self
  ) -> Vec<NaiveDate> {
    self
      .week_days()
      .into_iter()
      .filter(|d| {
        self.weekend_expanded
          || !is_weekend(*d)
      })
      .collect()
  }

  pub fn week_label(&self) -> String {
    format_week_label(
      &self.week_days(),
      self.today
    )
  }

  pub fn shift_week(
    &mut self,
    delta: i64
  ) -> bool {
    if self.controller.is_dragging() {
      return false;
    }
    self.week_offset += delta;
    self.refresh_layout();
    true
  }

  pub fn reset_week(&mut self) -> bool {
    if self.controller.is_dragging() {
      return false;
    }
    self.week_offset = 0;
    self.refresh_layout();
    true
  }

  pub fn set_weekend_expanded(
    &mut self,
    expanded: bool
  ) -> bool {
    if self.controller.is_dragging() {
      return false;
    }
    self.weekend_expanded = expanded;
    self.refresh_layout();
    true
  }

  fn refresh_layout(&mut self) {
    let layout =
      Layout::Dates(self.visible_dates());
    self.controller.set_layout(layout);
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
    date: Option<NaiveDate>
  ) -> Vec<ColumnGroup> {
    self.controller.column_groups(
      tasks,
      PartitionKey::Date(date)
    )
  }

  pub fn column_count(
    &self,
    tasks: &[Task],
    date: Option<NaiveDate>
  ) -> usize {
    self.controller.column_count(
      tasks,
      PartitionKey::Date(date)
    )
  }

  pub fn day_columns(
    &self,
    tasks: &[Task]
  ) -> Vec<DayColumn> {
    self
      .visible_dates()
      .into_iter()
      .map(|date| {
        DayColumn {
          date,
          title: format_day_title(date),
          is_today: date == self.today,
          is_past: date < self.today,
          groups: self
            .column_groups(tasks, Some(date)),
          total: self
            .column_count(tasks, Some(date))
        }
      })
      .collect()
  }

  pub fn unscheduled_groups(
    &self,
    tasks: &[Task]
  ) -> Vec<ColumnGroup> {
    self.column_groups(tasks, None)
  }

  /// Open tasks due on the displayed
  /// Saturday or Sunday; shown as a
  /// badge while the weekend is
  /// collapsed.
  pub fn weekend_task_count(
    &self,
    tasks: &[Task]
  ) -> usize {
    let weekend: Vec<NaiveDate> = self
      .week_days()
      .into_iter()
      .filter(|d| is_weekend(*d))
      .collect();
    tasks
      .iter()
      .filter(|t| {
        !t.is_done
          && t
            .due_date
            .is_some_and(|d| weekend.contains(&d))
      })
      .count()
  }

  /// Open tasks due before today that
  /// the displayed week does not
  /// already show.
  pub fn overdue_tasks<'a>(
    &self,
    tasks: &'a [Task]
  ) -> Vec<&'a Task> {
    let shown = self.week_days();
    let mut overdue: Vec<&Task> = tasks
      .iter()
      .filter(|t| !t.is_done)
      .filter(|t| {
        t.due_date.is_some_and(|d| {
          d < self.today
            && !shown.contains(&d)
        })
      })
      .collect();
    sort_tasks(&mut overdue);
    overdue.sort_by_key(|t| t.due_date);
    overdue
  }

  /// Moves every overdue task to `to`.
  /// Returns the number of patches
  /// dispatched.
  pub fn reschedule_overdue<B>(
    &self,
    tasks: &[Task],
    to: NaiveDate,
    boundary: &mut B
  ) -> usize
  where
    B: MutationBoundary + ?Sized
  {
    let ids: Vec<&str> = self
      .overdue_tasks(tasks)
      .into_iter()
      .map(|t| t.id.as_str())
      .collect();
    self.dispatch_reschedule(
      &ids, to, boundary
    )
  }

  /// Moves every open task due on `day`
  /// to `to`.
  pub fn reschedule_day<B>(
    &self,
    tasks: &[Task],
    day: NaiveDate,
    to: NaiveDate,
    boundary: &mut B
  ) -> usize
  where
    B: MutationBoundary + ?Sized
  {
    if day == to {
      return 0;
    }
    let ids: Vec<&str> = tasks
      .iter()
      .filter(|t| {
        !t.is_done
          && t.due_date == Some(day)
      })
      .map(|t| t.id.as_str())
      .collect();
    self.dispatch_reschedule(
      &ids, to, boundary
    )
  }

  fn dispatch_reschedule<B>(
    &self,
    ids: &[&str],
    to: NaiveDate,
    boundary: &mut B
  ) -> usize
  where
    B: MutationBoundary + ?Sized
  {
    if self.controller.is_dragging()
      || ids.is_empty()
    {
      return 0;
    }
    let patches: Vec<TaskPatch> = ids
      .iter()
      .map(|id| {
        let mut patch = TaskPatch::new(*id);
        patch.due_date = Some(Some(to));
        patch
      })
      .collect();
    let count = patches.len();
    info!(
      patches = count,
      %to,
      "dispatching reschedule batch"
    );
    boundary.batch_update(patches);
    count
  }

  pub fn send_to<B>(
    &self,
    task_id: &str,
    date: Option<NaiveDate>,
    tasks: &[Task],
    boundary: &mut B
  ) -> Transition
  where
    B: MutationBoundary + ?Sized
  {
    self.controller.send_to(
      task_id,
      PartitionKey::Date(date),
      tasks,
      boundary
    )
  }
}
