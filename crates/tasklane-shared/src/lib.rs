use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Queue {
  Day,
  Week
}

impl Queue {
  pub const fn as_str(
    self
  ) -> &'static str {
    match self {
      | Queue::Day => "day",
      | Queue::Week => "week"
    }
  }
}

impl fmt::Display for Queue {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Queue {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "day" | "today" => Ok(Queue::Day),
      | "week" | "thisweek"
      | "this-week" => Ok(Queue::Week),
      | other => {
        Err(format!(
          "unknown queue: {other}"
        ))
      }
    }
  }
}

/// Closed priority scale; declaration
/// order is presentation rank.
#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub enum Priority {
  #[serde(rename = "P0 - Critical")]
  P0,
  #[serde(rename = "P1 - Important")]
  P1,
  #[serde(rename = "P2 - Standard")]
  P2,
  #[serde(rename = "P3 - Optional")]
  P3,
  #[serde(rename = "P4 - Later")]
  P4
}

impl Priority {
  pub const ALL: [Priority; 5] = [
    Priority::P0,
    Priority::P1,
    Priority::P2,
    Priority::P3,
    Priority::P4
  ];

  pub const fn label(
    self
  ) -> &'static str {
    match self {
      | Priority::P0 => "P0 - Critical",
      | Priority::P1 => "P1 - Important",
      | Priority::P2 => "P2 - Standard",
      | Priority::P3 => "P3 - Optional",
      | Priority::P4 => "P4 - Later"
    }
  }

  pub const fn rank(self) -> usize {
    self as usize
  }

  pub fn from_label(
    label: &str
  ) -> Option<Self> {
    Self::ALL
      .into_iter()
      .find(|p| p.label() == label)
  }
}

impl fmt::Display for Priority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for Priority {
  type Err = String;

  /// Accepts the full label or the
  /// short `P0`..`P4` form.
  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    if let Some(p) =
      Self::from_label(trimmed)
    {
      return Ok(p);
    }
    match trimmed
      .to_ascii_uppercase()
      .as_str()
    {
      | "P0" => Ok(Priority::P0),
      | "P1" => Ok(Priority::P1),
      | "P2" => Ok(Priority::P2),
      | "P3" => Ok(Priority::P3),
      | "P4" => Ok(Priority::P4),
      | _ => {
        Err(format!(
          "unknown priority: {trimmed}"
        ))
      }
    }
  }
}

/// Field patch for one task as sent
/// to the mutation boundary. The outer
/// `Option` means "field untouched",
/// the inner one is the nullable value.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskPatch {
  pub id:       String,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub order:    Option<i64>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    with = "double_option"
  )]
  pub queue:    Option<Option<Queue>>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    with = "double_option"
  )]
  pub priority:
    Option<Option<Priority>>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    with = "double_option"
  )]
  pub due_date:
    Option<Option<NaiveDate>>
}

impl TaskPatch {
  pub fn new(
    id: impl Into<String>
  ) -> Self {
    Self {
      id:       id.into(),
      order:    None,
      queue:    None,
      priority: None,
      due_date: None
    }
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_none()
      && self.queue.is_none()
      && self.priority.is_none()
      && self.due_date.is_none()
  }

  pub fn field_names(
    &self
  ) -> Vec<&'static str> {
    let mut out = Vec::new();
    if self.order.is_some() {
      out.push("order");
    }
    if self.queue.is_some() {
      out.push("queue");
    }
    if self.priority.is_some() {
      out.push("priority");
    }
    if self.due_date.is_some() {
      out.push("due_date");
    }
    out
  }
}

/// Wire form of one drag event as
/// delivered by a host event source.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(
  tag = "kind",
  rename_all = "snake_case"
)]
pub enum DragEventDto {
  Start {
    active: String
  },
  Over {
    active: String,
    #[serde(default)]
    over:   Option<String>
  },
  End {
    active: String,
    #[serde(default)]
    over:   Option<String>
  },
  Cancel {
    active: String
  }
}

impl DragEventDto {
  pub fn active(&self) -> &str {
    match self {
      | DragEventDto::Start {
        active
      }
      | DragEventDto::Over {
        active,
        ..
      }
      | DragEventDto::End {
        active,
        ..
      }
      | DragEventDto::Cancel {
        active
      } => active
    }
  }
}

mod double_option {
  use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer
  };

  pub fn serialize<S, T>(
    value: &Option<Option<T>>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
    T: Serialize
  {
    match value {
      | Some(inner) => {
        inner.serialize(serializer)
      }
      | None => {
        serializer.serialize_none()
      }
    }
  }

  pub fn deserialize<'de, D, T>(
    deserializer: D
  ) -> Result<Option<Option<T>>, D::Error>
  where
    D: Deserializer<'de>,
    T: Deserialize<'de>
  {
    Option::<T>::deserialize(
      deserializer
    )
    .map(Some)
  }
}

#[cfg(test)]
mod tests {
  use super::{
    DragEventDto,
    Priority,
    Queue,
    TaskPatch
  };

  #[test]
  fn patch_distinguishes_untouched_from_cleared()
   {
    let mut patch =
      TaskPatch::new("task-1");
    patch.order = Some(2);
    patch.priority = Some(None);

    let json =
      serde_json::to_string(&patch)
        .expect("serialize patch");
    assert_eq!(
      json,
      r#"{"id":"task-1","order":2,"priority":null}"#
    );

    let back: TaskPatch =
      serde_json::from_str(&json)
        .expect("deserialize patch");
    assert_eq!(back, patch);
    assert_eq!(back.queue, None);
    assert_eq!(
      back.field_names(),
      vec!["order", "priority"]
    );
  }

  #[test]
  fn priority_accepts_label_and_short_form()
   {
    assert_eq!(
      "P1 - Important"
        .parse::<Priority>()
        .expect("label"),
      Priority::P1
    );
    assert_eq!(
      "p3"
        .parse::<Priority>()
        .expect("short"),
      Priority::P3
    );
    assert!(
      "P9".parse::<Priority>().is_err()
    );
    assert!(
      Priority::P0.rank()
        < Priority::P4.rank()
    );
  }

  #[test]
  fn queue_serializes_lowercase() {
    let json = serde_json::to_string(
      &Some(Queue::Week)
    )
    .expect("serialize queue");
    assert_eq!(json, r#""week""#);
    assert_eq!(
      "today"
        .parse::<Queue>()
        .expect("alias"),
      Queue::Day
    );
  }

  #[test]
  fn drag_event_is_tagged_by_kind() {
    let event: DragEventDto =
      serde_json::from_str(
        r#"{"kind":"over","active":"item::a","over":"column::day"}"#
      )
      .expect("parse event");
    assert_eq!(
      event,
      DragEventDto::Over {
        active: "item::a".to_string(),
        over:   Some(
          "column::day".to_string()
        )
      }
    );
    assert_eq!(event.active(), "item::a");
  }
}
