//! Input sensors that turn raw pointer
//! and keyboard input into
//! [`DragEvent`]s.

use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use super::DragEvent;

/// Default distance a pointer must
/// travel before a press becomes a
/// drag.
pub const DEFAULT_ACTIVATION_DISTANCE: f64 =
  5.0;

/// Raw pointer input; replay files carry
/// it as `{"pointer": "move", ...}`.
#[derive(
  Debug, Clone, PartialEq, Serialize, Deserialize,
)]
#[serde(
  tag = "pointer",
  rename_all = "snake_case"
)]
pub enum PointerInput {
  Down {
    token: String,
    x:     f64,
    y:     f64
  },
  Move {
    x:    f64,
    y:    f64,
    #[serde(default)]
    over: Option<String>
  },
  Up {
    #[serde(default)]
    over: Option<String>
  },
  Escape
}

#[derive(Debug, Clone, PartialEq)]
enum PointerState {
  Idle,
  Pressed {
    token:  String,
    origin: (f64, f64)
  },
  Dragging {
    token: String
  }
}

/// Activates once the pointer has moved
/// at least `activation_distance` from
/// where it went down, so clicks stay
/// clicks.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerSensor {
  activation_distance: f64,
  state:               PointerState
}

impl Default for PointerSensor {
  fn default() -> Self {
    Self::new(DEFAULT_ACTIVATION_DISTANCE)
  }
}

impl PointerSensor {
  pub fn new(
    activation_distance: f64
  ) -> Self {
    Self {
      activation_distance:
        activation_distance.max(0.0),
      state: PointerState::Idle
    }
  }

  pub fn is_dragging(&self) -> bool {
    matches!(
      self.state,
      PointerState::Dragging { .. }
    )
  }

  pub fn feed(
    &mut self,
    input: PointerInput
  ) -> Vec<DragEvent> {
    let state = std::mem::replace(
      &mut self.state,
      PointerState::Idle
    );
    let (next, events) =
      self.step(state, input);
    self.state = next;
    events
  }

  fn step(
    &self,
    state: PointerState,
    input: PointerInput
  ) -> (PointerState, Vec<DragEvent>) {
    match (state, input) {
      | (
        PointerState::Idle,
        PointerInput::Down {
          token,
          x,
          y
        }
      ) => {
        (
          PointerState::Pressed {
            token,
            origin: (x, y)
          },
          Vec::new()
        )
      }
      | (
        PointerState::Pressed {
          token,
          origin
        },
        PointerInput::Move {
          x,
          y,
          over
        }
      ) => {
        let travelled = (x - origin.0)
          .hypot(y - origin.1);
        if travelled
          < self.activation_distance
        {
          trace!(
            travelled,
            "below activation distance"
          );
          return (
            PointerState::Pressed {
              token,
              origin
            },
            Vec::new()
          );
        }
        let mut events =
          vec![DragEvent::Start {
            active: token.clone()
          }];
        if over.is_some() {
          events.push(DragEvent::Over {
            active: token.clone(),
            over
          });
        }
        (
          PointerState::Dragging {
            token
          },
          events
        )
      }
      | (
        PointerState::Dragging {
          token
        },
        PointerInput::Move {
          over, ..
        }
      ) => {
        let events = if over.is_some() {
          vec![DragEvent::Over {
            active: token.clone(),
            over
          }]
        } else {
          Vec::new()
        };
        (
          PointerState::Dragging {
            token
          },
          events
        )
      }
      | (
        PointerState::Dragging {
          token
        },
        PointerInput::Up {
          over
        }
      ) => {
        (
          PointerState::Idle,
          vec![DragEvent::End {
            active: token,
            over
          }]
        )
      }
      | (
        PointerState::Dragging {
          token
        },
        PointerInput::Escape
      ) => {
        (
          PointerState::Idle,
          vec![DragEvent::Cancel {
            active: token
          }]
        )
      }
      | (
        PointerState::Pressed {
          ..
        },
        PointerInput::Up {
          ..
        }
        | PointerInput::Escape
      ) => (PointerState::Idle, Vec::new()),
      | (state, _) => (state, Vec::new())
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
  /// Picks up the focused draggable.
  Pick(String),
  /// Moves the keyboard cursor onto a
  /// droppable.
  Target(String),
  Drop,
  Escape
}

/// Keyboard dragging: pick, move the
/// cursor over targets, drop. The
/// cursor starts on the picked item, so
/// an immediate drop changes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardSensor {
  active: Option<String>,
  over:   Option<String>
}

impl KeyboardSensor {
  pub fn is_dragging(&self) -> bool {
    self.active.is_some()
  }

  pub fn feed(
    &mut self,
    input: KeyInput
  ) -> Vec<DragEvent> {
    match input {
      | KeyInput::Pick(token) => {
        if self.active.is_some() {
          return Vec::new();
        }
        self.over = Some(token.clone());
        self.active = Some(token.clone());
        vec![DragEvent::Start {
          active: token
        }]
      }
      | KeyInput::Target(target) => {
        let Some(active) = &self.active
        else {
          return Vec::new();
        };
        self.over = Some(target.clone());
        vec![DragEvent::Over {
          active: active.clone(),
          over:   Some(target)
        }]
      }
      | KeyInput::Drop => {
        let Some(active) =
          self.active.take()
        else {
          return Vec::new();
        };
        vec![DragEvent::End {
          active,
          over: self.over.take()
        }]
      }
      | KeyInput::Escape => {
        self.over = None;
        match self.active.take() {
          | Some(active) => {
            vec![DragEvent::Cancel {
              active
            }]
          }
          | None => Vec::new()
        }
      }
    }
  }
}
