//! Routing of the inbound event to the handler registered for its target
//!
//! Handlers are collected while a pass walks the tree. After the first
//! complete walk the engine asks [`locate`] for the event's target and
//! delivers the event there. Events whose target no longer exists, or whose
//! cell is not in a state to accept them, are logged and dropped.

use crate::context::{Dispatch, Session, TimerFire};
use crate::error::Result;
use crate::event::Event;
use crate::identity::{CellId, ComponentKey};
use crate::node::PressHandler;
use crate::{Value, ValueMap};
use indexmap::IndexMap;
use std::rc::Rc;

pub(crate) type TimerHandler = Rc<dyn Fn(&mut Dispatch<'_>) -> Result<()>>;
pub(crate) type SubmitHandler = Rc<dyn Fn(&ValueMap, &mut Dispatch<'_>) -> Result<()>>;
pub(crate) type MessageHandler = Rc<dyn Fn(&Value, &mut Dispatch<'_>) -> Result<()>>;

/// Handlers registered during one render pass
#[derive(Default)]
pub struct HandlerTable {
    pub(crate) press: IndexMap<ComponentKey, PressHandler>,
    pub(crate) timers: IndexMap<CellId, TimerHandler>,
    pub(crate) forms: IndexMap<CellId, SubmitHandler>,
    pub(crate) channels: IndexMap<CellId, MessageHandler>,
}

impl HandlerTable {
    /// Keys of the interactive elements in this pass
    pub fn press_targets(&self) -> impl Iterator<Item = &ComponentKey> {
        self.press.keys()
    }

    pub fn len(&self) -> usize {
        self.press.len() + self.timers.len() + self.forms.len() + self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where an event lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Element(ComponentKey),
    Timer(CellId),
    Form(CellId),
    Channel(CellId),
}

/// Find the live target of an event, if it still exists
pub fn locate(handlers: &HandlerTable, event: &Event) -> Option<Target> {
    match event {
        Event::Press { target } => handlers
            .press
            .contains_key(target)
            .then(|| Target::Element(target.clone())),
        Event::TimerFired { owner } => handlers
            .timers
            .contains_key(owner)
            .then(|| Target::Timer(owner.clone())),
        Event::FormSubmitted { owner, .. } => handlers
            .forms
            .contains_key(owner)
            .then(|| Target::Form(owner.clone())),
        Event::ChannelMessage { owner, .. } | Event::ChannelStatusChanged { owner, .. } => handlers
            .channels
            .contains_key(owner)
            .then(|| Target::Channel(owner.clone())),
    }
}

fn stale(event: &Event, reason: &str) -> Result<bool> {
    tracing::warn!(event = event.kind(), reason, "dropping stale event");
    Ok(false)
}

fn invoke(
    session: &mut Session,
    handler: impl FnOnce(&mut Dispatch<'_>) -> Result<()>,
) -> Result<()> {
    let mut dispatch = Dispatch::new(session);
    handler(&mut dispatch)?;
    dispatch.commit()
}

/// Deliver `event` to its handler
///
/// Returns whether the store changed, i.e. whether a follow-up pass is needed.
pub(crate) fn deliver(handlers: &HandlerTable, event: &Event, session: &mut Session) -> Result<bool> {
    let Some(target) = locate(handlers, event) else {
        return stale(event, "no matching element or cell in the current tree");
    };
    tracing::debug!(event = event.kind(), target = ?target, "delivering event");

    let before = session.revision();
    match (&target, event) {
        (Target::Element(key), Event::Press { .. }) => {
            let Some(handler) = handlers.press.get(key) else {
                return stale(event, "element is not interactive");
            };
            invoke(session, |dispatch| handler(dispatch))?;
        }
        (Target::Timer(owner), Event::TimerFired { .. }) => {
            let Some(handler) = handlers.timers.get(owner) else {
                return stale(event, "timer not declared");
            };
            match session.fire_timer(owner)? {
                TimerFire::Due => {}
                TimerFire::Early { remaining_ms } => {
                    tracing::debug!(cell = %owner, remaining_ms, "early timer fire re-armed");
                    return Ok(false);
                }
                TimerFire::Stopped => return stale(event, "timer is not running"),
            }
            invoke(session, |dispatch| handler(dispatch))?;
            session.rearm_timer(owner)?;
        }
        (Target::Form(owner), Event::FormSubmitted { values, .. }) => {
            let Some(handler) = handlers.forms.get(owner) else {
                return stale(event, "form not declared");
            };
            let form = session.form(owner)?;
            if !form.pending {
                return stale(event, "form is not awaiting a submission");
            }
            let decoded = form.schema.decode(values)?;
            // Cleared first so the handler may open the form again
            session.close_form(owner)?;
            invoke(session, |dispatch| handler(&decoded, dispatch))?;
        }
        (Target::Channel(owner), Event::ChannelMessage { name, payload, .. }) => {
            let Some(handler) = handlers.channels.get(owner) else {
                return stale(event, "channel not declared");
            };
            let channel = session.channel(owner)?;
            if !channel.active || &channel.name != name {
                return stale(event, "channel is not subscribed under that name");
            }
            session.set_channel_status(owner, crate::cell::ChannelStatus::Connected)?;
            invoke(session, |dispatch| handler(payload, dispatch))?;
        }
        (Target::Channel(owner), Event::ChannelStatusChanged { status, .. }) => {
            session.set_channel_status(owner, *status)?;
        }
        _ => return stale(event, "event does not match its target"),
    }

    Ok(session.revision() != before)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(index: u32) -> CellId {
        CellId::new(ComponentKey::new("0.App"), index)
    }

    fn noop(_: &mut Dispatch<'_>) -> Result<()> {
        Ok(())
    }

    fn ignore(_: &Value, _: &mut Dispatch<'_>) -> Result<()> {
        Ok(())
    }

    fn table() -> HandlerTable {
        let mut table = HandlerTable::default();
        table.press.insert(ComponentKey::new("0.App/0.button"), Rc::new(noop));
        table.timers.insert(owner(0), Rc::new(noop));
        table.channels.insert(owner(1), Rc::new(ignore));
        table
    }

    #[test]
    fn test_locate_targets() {
        let table = table();
        assert_eq!(table.len(), 3);
        assert_eq!(
            locate(&table, &Event::press("0.App/0.button")),
            Some(Target::Element(ComponentKey::new("0.App/0.button")))
        );
        assert_eq!(
            locate(&table, &Event::TimerFired { owner: owner(0) }),
            Some(Target::Timer(owner(0)))
        );
        assert_eq!(
            locate(
                &table,
                &Event::ChannelStatusChanged {
                    owner: owner(1),
                    status: crate::cell::ChannelStatus::Connected,
                }
            ),
            Some(Target::Channel(owner(1)))
        );
    }

    #[test]
    fn test_locate_stale() {
        let table = table();
        assert_eq!(locate(&table, &Event::press("0.App/1.button")), None);
        assert_eq!(locate(&table, &Event::TimerFired { owner: owner(5) }), None);
        assert_eq!(
            locate(
                &table,
                &Event::FormSubmitted {
                    owner: owner(0),
                    values: ValueMap::new(),
                }
            ),
            None
        );
    }
}
