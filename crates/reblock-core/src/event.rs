//! Inbound UI events

use crate::cell::ChannelStatus;
use crate::identity::{CellId, ComponentKey};
use crate::{Value, ValueMap};
use serde::{Deserialize, Serialize};

/// The single event a render may receive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// An interactive element was pressed; `target` is the element's `action` key
    Press { target: ComponentKey },
    /// A timer armed by `Effect::StartTimer` elapsed
    TimerFired { owner: CellId },
    /// A form shown by `Effect::ShowForm` was submitted
    FormSubmitted { owner: CellId, values: ValueMap },
    /// A message arrived on a subscribed channel
    ChannelMessage {
        owner: CellId,
        name: String,
        payload: Value,
    },
    /// The host's connection to a channel changed state
    ChannelStatusChanged {
        owner: CellId,
        status: ChannelStatus,
    },
}

impl Event {
    /// Create a press event
    pub fn press(target: impl Into<ComponentKey>) -> Self {
        Event::Press {
            target: target.into(),
        }
    }

    /// Short name of the event kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Press { .. } => "press",
            Event::TimerFired { .. } => "timer_fired",
            Event::FormSubmitted { .. } => "form_submitted",
            Event::ChannelMessage { .. } => "channel_message",
            Event::ChannelStatusChanged { .. } => "channel_status",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        assert_eq!(Event::press("0.App/0.button").kind(), "press");
        let owner = CellId::new(ComponentKey::new("0.App"), 0);
        assert_eq!(Event::TimerFired { owner }.kind(), "timer_fired");
    }
}
