//! Drop-target identity and its wire
//! token form.
//!
//! Host drag libraries identify
//! draggables and droppables by string;
//! everything inside the engine works on
//! [`ContainerId`] / [`Token`] values and
//! only [`Token::parse`] and `Display`
//! touch the string form.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::task::{
  Priority,
  Queue,
  Task
};

const DELIM: &str = "::";
const NULL_SENTINEL: &str = "null";
const UNSCHEDULED_SENTINEL: &str =
  "unscheduled";
const DATE_FORMAT: &str = "%Y-%m-%d";

const COLUMN_TAG: &str = "column";
const GROUP_TAG: &str = "group";
const DATE_COLUMN_TAG: &str = "datecol";
const DATE_GROUP_TAG: &str = "dategrp";
const ITEM_TAG: &str = "item";

/// The value tasks are partitioned by:
/// a work queue or a calendar date.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub enum PartitionKey {
  Queue(Option<Queue>),
  Date(Option<NaiveDate>)
}

impl PartitionKey {
  pub fn column(self) -> ContainerId {
    match self {
      | PartitionKey::Queue(queue) => {
        ContainerId::Column {
          queue
        }
      }
      | PartitionKey::Date(date) => {
        ContainerId::DateColumn {
          date
        }
      }
    }
  }

  pub fn group(
    self,
    priority: Option<Priority>
  ) -> ContainerId {
    match self {
      | PartitionKey::Queue(queue) => {
        ContainerId::Group {
          queue,
          priority
        }
      }
      | PartitionKey::Date(date) => {
        ContainerId::DateGroup {
          date,
          priority
        }
      }
    }
  }

  /// Partition membership only; the
  /// done flag is checked by callers.
  pub fn contains(
    &self,
    task: &Task
  ) -> bool {
    match self {
      | PartitionKey::Queue(queue) => {
        task.queue == *queue
      }
      | PartitionKey::Date(date) => {
        task.due_date == *date
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub enum ContainerId {
  Column {
    queue: Option<Queue>
  },
  Group {
    queue:    Option<Queue>,
    priority: Option<Priority>
  },
  DateColumn {
    date: Option<NaiveDate>
  },
  DateGroup {
    date:     Option<NaiveDate>,
    priority: Option<Priority>
  }
}

impl ContainerId {
  pub fn partition(
    &self
  ) -> PartitionKey {
    match *self {
      | ContainerId::Column {
        queue
      }
      | ContainerId::Group {
        queue,
        ..
      } => PartitionKey::Queue(queue),
      | ContainerId::DateColumn {
        date
      }
      | ContainerId::DateGroup {
        date,
        ..
      } => PartitionKey::Date(date)
    }
  }

  pub fn is_column(&self) -> bool {
    matches!(
      self,
      ContainerId::Column { .. }
        | ContainerId::DateColumn { .. }
    )
  }

  pub fn is_group(&self) -> bool {
    !self.is_column()
  }

  /// `Some` only for groups: dropping
  /// into a column never implies a
  /// priority.
  pub fn implied_priority(
    &self
  ) -> Option<Option<Priority>> {
    match *self {
      | ContainerId::Group {
        priority,
        ..
      }
      | ContainerId::DateGroup {
        priority,
        ..
      } => Some(priority),
      | _ => None
    }
  }

  pub fn implied_queue(
    &self
  ) -> Option<Option<Queue>> {
    match self.partition() {
      | PartitionKey::Queue(queue) => {
        Some(queue)
      }
      | PartitionKey::Date(_) => None
    }
  }

  pub fn implied_date(
    &self
  ) -> Option<Option<NaiveDate>> {
    match self.partition() {
      | PartitionKey::Date(date) => {
        Some(date)
      }
      | PartitionKey::Queue(_) => None
    }
  }
}

impl fmt::Display for ContainerId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match *self {
      | ContainerId::Column {
        queue
      } => {
        write!(
          f,
          "{COLUMN_TAG}{DELIM}{}",
          encode_queue(queue)
        )
      }
      | ContainerId::Group {
        queue,
        priority
      } => {
        write!(
          f,
          "{GROUP_TAG}{DELIM}{}{DELIM}{}",
          encode_queue(queue),
          encode_priority(priority)
        )
      }
      | ContainerId::DateColumn {
        date
      } => {
        write!(
          f,
          "{DATE_COLUMN_TAG}{DELIM}{}",
          encode_date(date)
        )
      }
      | ContainerId::DateGroup {
        date,
        priority
      } => {
        write!(
          f,
          "{DATE_GROUP_TAG}{DELIM}{}{DELIM}{}",
          encode_date(date),
          encode_priority(priority)
        )
      }
    }
  }
}

impl FromStr for ContainerId {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match Token::parse(s) {
      | Some(Token::Container(id)) => {
        Ok(id)
      }
      | Some(Token::Item(_)) => {
        Err(format!(
          "item token is not a \
           container: {s}"
        ))
      }
      | None => {
        Err(format!(
          "unrecognized container \
           token: {s}"
        ))
      }
    }
  }
}

/// Anything a drag event can name: a
/// container or a single task.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash,
)]
pub enum Token {
  Container(ContainerId),
  Item(String)
}

impl Token {
  pub fn item(
    task_id: impl Into<String>
  ) -> Self {
    Token::Item(task_id.into())
  }

  /// Returns `None` for anything that
  /// is not exactly one of the known
  /// shapes.
  pub fn parse(
    raw: &str
  ) -> Option<Token> {
    let (tag, rest) =
      raw.split_once(DELIM)?;

    if tag == ITEM_TAG {
      if rest.is_empty() {
        return None;
      }
      return Some(Token::Item(
        rest.to_string()
      ));
    }

    let parts: Vec<&str> =
      rest.split(DELIM).collect();
    let id = match (
      tag,
      parts.as_slice()
    ) {
      | (COLUMN_TAG, [queue]) => {
        ContainerId::Column {
          queue: decode_queue(queue)?
        }
      }
      | (
        GROUP_TAG,
        [queue, priority]
      ) => {
        ContainerId::Group {
          queue:    decode_queue(
            queue
          )?,
          priority: decode_priority(
            priority
          )?
        }
      }
      | (DATE_COLUMN_TAG, [date]) => {
        ContainerId::DateColumn {
          date: decode_date(date)?
        }
      }
      | (
        DATE_GROUP_TAG,
        [date, priority]
      ) => {
        ContainerId::DateGroup {
          date:     decode_date(date)?,
          priority: decode_priority(
            priority
          )?
        }
      }
      | _ => return None
    };

    Some(Token::Container(id))
  }

  pub fn as_item(
    &self
  ) -> Option<&str> {
    match self {
      | Token::Item(id) => Some(id),
      | Token::Container(_) => None
    }
  }
}

impl fmt::Display for Token {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Token::Container(id) => {
        id.fmt(f)
      }
      | Token::Item(task_id) => {
        write!(
          f,
          "{ITEM_TAG}{DELIM}{task_id}"
        )
      }
    }
  }
}

impl From<ContainerId> for Token {
  fn from(id: ContainerId) -> Self {
    Token::Container(id)
  }
}

pub fn item_token(
  task_id: &str
) -> String {
  format!("{ITEM_TAG}{DELIM}{task_id}")
}

fn encode_queue(
  queue: Option<Queue>
) -> &'static str {
  queue
    .map(Queue::as_str)
    .unwrap_or(NULL_SENTINEL)
}

fn encode_priority(
  priority: Option<Priority>
) -> &'static str {
  priority
    .map(Priority::label)
    .unwrap_or(NULL_SENTINEL)
}

fn encode_date(
  date: Option<NaiveDate>
) -> String {
  date
    .map(|d| {
      d.format(DATE_FORMAT).to_string()
    })
    .unwrap_or_else(|| {
      UNSCHEDULED_SENTINEL.to_string()
    })
}

fn decode_queue(
  raw: &str
) -> Option<Option<Queue>> {
  match raw {
    | NULL_SENTINEL => Some(None),
    | "day" => Some(Some(Queue::Day)),
    | "week" => Some(Some(Queue::Week)),
    | _ => None
  }
}

fn decode_priority(
  raw: &str
) -> Option<Option<Priority>> {
  if raw == NULL_SENTINEL {
    return Some(None);
  }
  Priority::from_label(raw).map(Some)
}

fn decode_date(
  raw: &str
) -> Option<Option<NaiveDate>> {
  if raw == UNSCHEDULED_SENTINEL {
    return Some(None);
  }
  NaiveDate::parse_from_str(
    raw,
    DATE_FORMAT
  )
  .ok()
  .map(Some)
}
