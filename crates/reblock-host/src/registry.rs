//! Worker-scoped registry of host-side activity
//!
//! Tracks what the worker has asked clients to run: armed timers, open forms
//! and channel subscriptions. It is rebuilt from the effects of each response
//! and only feeds diagnostics; renders never read it.

use indexmap::{IndexMap, IndexSet};
use reblock_core::{CellId, Effect, Event};

/// Activity observed by one worker since it started
#[derive(Debug, Clone, Default)]
pub struct Registry {
    timers: IndexMap<CellId, u64>,
    forms: IndexSet<CellId>,
    subscriptions: IndexMap<String, CellId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event the worker has just served
    pub fn observe_event(&mut self, event: &Event) {
        if let Event::FormSubmitted { owner, .. } = event {
            self.forms.shift_remove(owner);
        }
    }

    /// Record the effects of a response, in order
    pub fn observe(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::StartTimer { duration_ms, owner } => {
                    self.timers.insert(owner.clone(), *duration_ms);
                }
                Effect::StopTimer { owner } => {
                    self.timers.shift_remove(owner);
                }
                Effect::ShowForm { owner, .. } => {
                    self.forms.insert(owner.clone());
                }
                Effect::SubscribeChannel { name, owner } => {
                    self.subscriptions.insert(name.clone(), owner.clone());
                }
                Effect::UnsubscribeChannel { name } => {
                    self.subscriptions.shift_remove(name);
                }
                Effect::ShowToast { .. } | Effect::Navigate { .. } => {}
            }
        }
    }

    /// Armed timers and their intervals
    pub fn timers(&self) -> impl Iterator<Item = (&CellId, u64)> {
        self.timers.iter().map(|(id, duration)| (id, *duration))
    }

    /// Forms shown and not yet submitted
    pub fn open_forms(&self) -> impl Iterator<Item = &CellId> {
        self.forms.iter()
    }

    /// Active subscriptions by channel name
    pub fn subscriptions(&self) -> impl Iterator<Item = (&str, &CellId)> {
        self.subscriptions.iter().map(|(name, owner)| (name.as_str(), owner))
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty() && self.forms.is_empty() && self.subscriptions.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
        self.forms.clear();
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reblock_core::{ComponentKey, FormSchema, ValueMap};

    fn owner(index: u32) -> CellId {
        CellId::new(ComponentKey::new("0.Post"), index)
    }

    #[test]
    fn test_registry_follows_effects() {
        let mut registry = Registry::new();
        registry.observe(&[
            Effect::StartTimer {
                duration_ms: 1000,
                owner: owner(0),
            },
            Effect::ShowForm {
                schema: FormSchema::new(),
                owner: owner(1),
            },
            Effect::SubscribeChannel {
                name: "comments".into(),
                owner: owner(2),
            },
        ]);
        assert_eq!(registry.timers().collect::<Vec<_>>(), vec![(&owner(0), 1000)]);
        assert_eq!(registry.open_forms().count(), 1);
        assert_eq!(
            registry.subscriptions().collect::<Vec<_>>(),
            vec![("comments", &owner(2))]
        );

        registry.observe_event(&Event::FormSubmitted {
            owner: owner(1),
            values: ValueMap::new(),
        });
        registry.observe(&[
            Effect::StopTimer { owner: owner(0) },
            Effect::UnsubscribeChannel {
                name: "comments".into(),
            },
        ]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut registry = Registry::new();
        registry.observe(&[Effect::StartTimer {
            duration_ms: 500,
            owner: owner(0),
        }]);
        registry.clear();
        assert!(registry.is_empty());
    }
}
