//! Event identifiers routed to scripts.
//!
//! An [`EventId`] is the routing key: scripts declare `Trigger::On(EventId)`
//! and the stage's event router starts (or restarts) their action sequences
//! when a matching [`Event`] fires. Payload data that does not affect routing
//! travels alongside in [`EventPayload`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A gamepad button that can trigger scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GamepadButton {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
}

/// Routing key for script triggers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventId {
    /// The scene was activated for the first time (or after a reset).
    Start,
    /// A clone was just spawned. Only delivered to the new clone.
    StartAsClone,
    /// The host's back button was pressed.
    BackPressed,
    /// The mouse wheel was scrolled.
    MouseWheelScrolled,
    /// A gamepad button was pressed.
    Gamepad(GamepadButton),
    /// A user-named broadcast message.
    Broadcast(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Start => write!(f, "start"),
            EventId::StartAsClone => write!(f, "start-as-clone"),
            EventId::BackPressed => write!(f, "back-pressed"),
            EventId::MouseWheelScrolled => write!(f, "mouse-wheel-scrolled"),
            EventId::Gamepad(button) => write!(f, "gamepad-{button:?}"),
            EventId::Broadcast(message) => write!(f, "broadcast:{message}"),
        }
    }
}

/// Data carried by an event that does not take part in routing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum EventPayload {
    #[default]
    None,
    /// Wheel movement, positive when scrolling up.
    Scroll { amount: f64 },
}

/// An event as pushed by an input, lifecycle, or script source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    #[serde(default)]
    pub payload: EventPayload,
}

impl Event {
    /// An event without payload.
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            payload: EventPayload::None,
        }
    }

    /// A user broadcast message.
    pub fn broadcast(message: impl Into<String>) -> Self {
        Self::new(EventId::Broadcast(message.into()))
    }

    /// A gamepad button press.
    pub fn gamepad(button: GamepadButton) -> Self {
        Self::new(EventId::Gamepad(button))
    }

    /// A mouse wheel scroll by `amount`.
    pub fn scrolled(amount: f64) -> Self {
        Self {
            id: EventId::MouseWheelScrolled,
            payload: EventPayload::Scroll { amount },
        }
    }
}

impl From<EventId> for Event {
    fn from(id: EventId) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_event_carries_amount() {
        let event = Event::scrolled(-2.5);
        assert_eq!(event.id, EventId::MouseWheelScrolled);
        assert_eq!(event.payload, EventPayload::Scroll { amount: -2.5 });
    }

    #[test]
    fn gamepad_buttons_route_separately() {
        assert_ne!(
            Event::gamepad(GamepadButton::A).id,
            Event::gamepad(GamepadButton::B).id
        );
    }

    #[test]
    fn event_ids_display_readably() {
        assert_eq!(EventId::StartAsClone.to_string(), "start-as-clone");
        assert_eq!(Event::broadcast("go").id.to_string(), "broadcast:go");
    }
}
