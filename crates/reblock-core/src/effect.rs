//! Effects: declarative side effects for the host to perform
//!
//! Effects are appended in emission order and never deduplicated or
//! cancelled. A cell that stops and restarts its timer in one render emits
//! `StopTimer` followed by `StartTimer`, and the host applies them in order.

use crate::cell::FormSchema;
use crate::identity::CellId;
use serde::{Deserialize, Serialize};

/// Visual style of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToastAppearance {
    #[default]
    Neutral,
    Success,
}

/// A side effect requested by a render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Arm a timer; the host sends `Event::TimerFired { owner }` when it elapses
    StartTimer { duration_ms: u64, owner: CellId },
    /// Disarm a timer
    StopTimer { owner: CellId },
    /// Show a modal form; the host sends `Event::FormSubmitted { owner, .. }`
    ShowForm { schema: FormSchema, owner: CellId },
    /// Show a transient toast
    ShowToast {
        text: String,
        appearance: ToastAppearance,
    },
    /// Open a realtime subscription; messages come back as `Event::ChannelMessage`
    SubscribeChannel { name: String, owner: CellId },
    /// Close a realtime subscription
    UnsubscribeChannel { name: String },
    /// Navigate the client to a URL
    Navigate { target: String },
}

impl Effect {
    /// Short name of the effect kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::StartTimer { .. } => "start_timer",
            Effect::StopTimer { .. } => "stop_timer",
            Effect::ShowForm { .. } => "show_form",
            Effect::ShowToast { .. } => "show_toast",
            Effect::SubscribeChannel { .. } => "subscribe_channel",
            Effect::UnsubscribeChannel { .. } => "unsubscribe_channel",
            Effect::Navigate { .. } => "navigate",
        }
    }

    /// The cell this effect belongs to, if any
    pub fn owner(&self) -> Option<&CellId> {
        match self {
            Effect::StartTimer { owner, .. }
            | Effect::StopTimer { owner }
            | Effect::ShowForm { owner, .. }
            | Effect::SubscribeChannel { owner, .. } => Some(owner),
            Effect::ShowToast { .. } | Effect::UnsubscribeChannel { .. } | Effect::Navigate { .. } => {
                None
            }
        }
    }
}

/// Ordered list of effects for one render
///
/// Effects collected through [`collect_provisional`](Self::collect_provisional)
/// belong to the current render pass. They are dropped by
/// [`discard_provisional`](Self::discard_provisional) when that pass is
/// superseded, and kept otherwise.
#[derive(Debug, Clone, Default)]
pub struct EffectCollector {
    effects: Vec<Effect>,
    /// Positions of provisional effects, ascending
    provisional: Vec<usize>,
}

impl EffectCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an effect
    pub fn collect(&mut self, effect: Effect) {
        tracing::trace!(kind = effect.kind(), "effect collected");
        self.effects.push(effect);
    }

    /// Append an effect that is only kept if the current pass is final
    pub fn collect_provisional(&mut self, effect: Effect) {
        self.provisional.push(self.effects.len());
        self.collect(effect);
    }

    /// Drop the provisional effects of a superseded pass
    pub fn discard_provisional(&mut self) {
        for position in self.provisional.drain(..).rev() {
            let effect = self.effects.remove(position);
            tracing::trace!(kind = effect.kind(), "provisional effect discarded");
        }
    }

    /// Take all collected effects, leaving the collector empty
    pub fn flush(&mut self) -> Vec<Effect> {
        self.provisional.clear();
        std::mem::take(&mut self.effects)
    }

    /// Iterate over the effects collected so far
    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
