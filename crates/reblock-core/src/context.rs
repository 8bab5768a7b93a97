//! Contexts handed to component bodies and event handlers
//!
//! Every component invocation receives a [`Scope`] and every event handler a
//! [`Dispatch`]. Both implement [`Context`], which is the only way component
//! code reaches the store, the effect list and the host capabilities. Nothing
//! is ambient: a render is a function of (tree, store, event).
//!
//! ```text
//! Engine::render
//!  │
//!  ├── Session (store + effects + capabilities, one per render)
//!  │
//!  ├── walk ──▶ Scope     declares cells, reads values, arms timers
//!  │
//!  └── deliver ──▶ Dispatch  buffers writes, applied after the handler
//! ```

use crate::capability::Capabilities;
use crate::cell::{
    CellState, ChannelCell, ChannelState, ChannelStatus, FormCell, FormSchema, FormState,
    Loaded, TimerCell, TimerState, ValueCell, MIN_TIMER_DURATION_MS,
};
use crate::dispatch::HandlerTable;
use crate::effect::{Effect, EffectCollector, ToastAppearance};
use crate::error::{Error, Result, UsageError};
use crate::identity::{CellId, ComponentKey};
use crate::store::Store;
use crate::{Value, ValueMap};
use indexmap::{IndexMap, IndexSet};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// Deferred initial value of a value cell
pub type Deferred = Pin<Box<dyn Future<Output = Result<Value>>>>;

fn mismatch(cell: &CellId, declared: &'static str, stored: &CellState) -> Error {
    UsageError::CellKindMismatch {
        cell: cell.clone(),
        declared,
        stored: stored.kind_name(),
    }
    .into()
}

fn unknown(cell: &CellId) -> Error {
    UsageError::UnknownCell { cell: cell.clone() }.into()
}

/// State owned by one render invocation
///
/// Created from the loaded store when a render starts and taken apart when it
/// ends; component code only ever sees it through [`Context`].
pub struct Session {
    store: Store,
    effects: EffectCollector,
    capabilities: Capabilities,
    now_ms: i64,
    /// Timers started during the current pass (or handler phase)
    started: IndexSet<CellId>,
    /// Bumped on every store mutation
    revision: u64,
}

macro_rules! cell_access {
    ($get:ident, $get_mut:ident, $variant:ident, $state:ty, $name:literal) => {
        pub(crate) fn $get(&self, id: &CellId) -> Result<&$state> {
            match self.store.get(id) {
                Some(CellState::$variant(state)) => Ok(state),
                Some(other) => Err(mismatch(id, $name, other)),
                None => Err(unknown(id)),
            }
        }

        pub(crate) fn $get_mut(&mut self, id: &CellId) -> Result<&mut $state> {
            match self.store.get_mut(id) {
                Some(CellState::$variant(state)) => Ok(state),
                Some(other) => Err(mismatch(id, $name, other)),
                None => Err(unknown(id)),
            }
        }
    };
}

impl Session {
    pub(crate) fn new(store: Store, capabilities: Capabilities, now_ms: i64) -> Self {
        Self {
            store,
            effects: EffectCollector::new(),
            capabilities,
            now_ms,
            started: IndexSet::new(),
            revision: 0,
        }
    }

    /// Reset per-pass bookkeeping
    pub(crate) fn begin_phase(&mut self) {
        self.started.clear();
    }

    pub(crate) fn into_parts(self) -> (Store, EffectCollector) {
        (self.store, self.effects)
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut Store {
        self.revision += 1;
        &mut self.store
    }

    pub(crate) fn effects_mut(&mut self) -> &mut EffectCollector {
        &mut self.effects
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    cell_access!(value, value_mut, Value, Value, "value");
    cell_access!(timer, timer_mut, Timer, TimerState, "timer");
    cell_access!(form, form_mut, Form, FormState, "form");
    cell_access!(channel, channel_mut, Channel, ChannelState, "channel");

    /// Seed a cell if absent and check that the stored kind matches the declaration
    fn declare(
        &mut self,
        id: &CellId,
        declared: &'static str,
        seed: impl FnOnce() -> CellState,
    ) -> Result<&mut CellState> {
        if !self.store.contains(id) {
            self.revision += 1;
            self.store.set(id.clone(), seed());
        }
        match self.store.get_mut(id) {
            Some(state) if state.kind_name() == declared => Ok(state),
            Some(other) => Err(mismatch(id, declared, other)),
            None => Err(unknown(id)),
        }
    }

    pub(crate) fn write_value(&mut self, id: &CellId, value: Value) -> Result<()> {
        *self.value_mut(id)? = value;
        self.revision += 1;
        Ok(())
    }

    pub(crate) fn start_timer(&mut self, id: &CellId) -> Result<()> {
        self.timer(id)?;
        if self.started.contains(id) {
            return Err(UsageError::TimerAlreadyStarted { cell: id.clone() }.into());
        }

        let running_sibling = self
            .store
            .cells_of(&id.component)
            .find_map(|(other, state)| match state {
                CellState::Timer(timer) if timer.running && other != id => Some(other.clone()),
                _ => None,
            });
        if let Some(running) = running_sibling {
            return Err(UsageError::ConcurrentTimer {
                cell: id.clone(),
                running,
            }
            .into());
        }

        let now = self.now_ms;
        let timer = self.timer_mut(id)?;
        // Already armed by an earlier render: re-declaring it is a no-op
        let armed = if timer.running {
            None
        } else {
            timer.running = true;
            timer.last_fired_ms = Some(now);
            Some(timer.duration_ms)
        };

        self.started.insert(id.clone());
        if let Some(duration_ms) = armed {
            self.revision += 1;
            self.effects.collect(Effect::StartTimer {
                duration_ms,
                owner: id.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn stop_timer(&mut self, id: &CellId) -> Result<()> {
        let timer = self.timer_mut(id)?;
        let was_running = timer.running;
        timer.running = false;

        self.started.shift_remove(id);
        if was_running {
            self.revision += 1;
            self.effects.collect(Effect::StopTimer { owner: id.clone() });
        }
        Ok(())
    }

    /// Record a fire if the timer is due
    ///
    /// A fire that arrives before the interval elapsed re-arms the host timer
    /// for the time left, so clock skew between hosts never leaves a running
    /// timer without a pending fire.
    pub(crate) fn fire_timer(&mut self, id: &CellId) -> Result<TimerFire> {
        let now = self.now_ms;
        let timer = self.timer_mut(id)?;
        if !timer.running {
            return Ok(TimerFire::Stopped);
        }
        if let Some(remaining_ms) = timer.remaining_ms(now) {
            self.effects.collect(Effect::StartTimer {
                duration_ms: remaining_ms,
                owner: id.clone(),
            });
            return Ok(TimerFire::Early { remaining_ms });
        }
        timer.last_fired_ms = Some(now);
        self.revision += 1;
        Ok(TimerFire::Due)
    }

    /// Re-arm a timer that is still running after its callback
    ///
    /// Skipped when the callback restarted the timer itself.
    pub(crate) fn rearm_timer(&mut self, id: &CellId) -> Result<()> {
        if self.started.contains(id) {
            return Ok(());
        }
        let timer = self.timer(id)?;
        if timer.running {
            let duration_ms = timer.duration_ms;
            self.effects.collect(Effect::StartTimer {
                duration_ms,
                owner: id.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn open_form(&mut self, id: &CellId) -> Result<()> {
        let form = self.form_mut(id)?;
        form.pending = true;
        let schema = form.schema.clone();

        self.revision += 1;
        self.effects.collect(Effect::ShowForm {
            schema,
            owner: id.clone(),
        });
        Ok(())
    }

    pub(crate) fn close_form(&mut self, id: &CellId) -> Result<()> {
        self.form_mut(id)?.pending = false;
        self.revision += 1;
        Ok(())
    }

    pub(crate) fn subscribe(&mut self, id: &CellId) -> Result<()> {
        let channel = self.channel_mut(id)?;
        if channel.active {
            return Ok(());
        }
        channel.active = true;
        channel.status = ChannelStatus::Connecting;
        let name = channel.name.clone();

        self.revision += 1;
        self.effects.collect(Effect::SubscribeChannel {
            name,
            owner: id.clone(),
        });
        Ok(())
    }

    pub(crate) fn unsubscribe(&mut self, id: &CellId) -> Result<()> {
        let channel = self.channel_mut(id)?;
        if !channel.active {
            return Ok(());
        }
        channel.active = false;
        channel.status = ChannelStatus::Disconnecting;
        let name = channel.name.clone();

        self.revision += 1;
        self.effects.collect(Effect::UnsubscribeChannel { name });
        Ok(())
    }

    pub(crate) fn set_channel_status(&mut self, id: &CellId, status: ChannelStatus) -> Result<()> {
        let channel = self.channel_mut(id)?;
        if channel.status != status {
            channel.status = status;
            self.revision += 1;
        }
        Ok(())
    }

    /// Point a channel cell at a new name, moving an active subscription over
    fn rename_channel(&mut self, id: &CellId, name: &str) -> Result<()> {
        let channel = self.channel_mut(id)?;
        if channel.name == name {
            return Ok(());
        }
        let old = std::mem::replace(&mut channel.name, name.to_string());
        let active = channel.active;
        if active {
            channel.status = ChannelStatus::Connecting;
        }

        self.revision += 1;
        if active {
            self.effects.collect(Effect::UnsubscribeChannel { name: old });
            self.effects.collect(Effect::SubscribeChannel {
                name: name.to_string(),
                owner: id.clone(),
            });
        }
        Ok(())
    }
}

/// Outcome of a `TimerFired` event against the stored timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerFire {
    /// Interval elapsed; run the callback
    Due,
    /// Fired ahead of schedule; re-armed for the rest of the interval
    Early { remaining_ms: u64 },
    /// Timer is not running
    Stopped,
}

/// Why a render pass is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PassCause {
    /// First pass of the render
    Initial,
    /// Restarted after deferred initializers resolved
    Resumed,
    /// Follow-up after an event handler changed state
    Event,
}

/// Transient record of one render pass
pub(crate) struct PassRecord {
    pub(crate) number: u32,
    pub(crate) cause: PassCause,
    pub(crate) handlers: HandlerTable,
    pub(crate) suspended: Vec<(CellId, Deferred)>,
    /// Components rendered in this pass and how many cells each declared
    pub(crate) mounted: IndexMap<ComponentKey, u32>,
}

impl PassRecord {
    pub(crate) fn new(number: u32, cause: PassCause) -> Self {
        Self {
            number,
            cause,
            handlers: HandlerTable::default(),
            suspended: Vec::new(),
            mounted: IndexMap::new(),
        }
    }
}

/// Operations shared by component bodies and event handlers
pub trait Context {
    /// Read a value cell
    fn get(&self, cell: &ValueCell) -> Result<Value>;

    /// Replace the value of a value cell
    fn set(&mut self, cell: &ValueCell, value: impl Into<Value>) -> Result<()>;

    /// Write a value cell as a function of its current value
    fn update(&mut self, cell: &ValueCell, f: impl FnOnce(&Value) -> Value) -> Result<()> {
        let next = f(&self.get(cell)?);
        self.set(cell, next)
    }

    #[doc(hidden)]
    fn session(&mut self) -> &mut Session;

    #[doc(hidden)]
    fn session_ref(&self) -> &Session;

    /// Queue a toast or navigation effect
    #[doc(hidden)]
    fn emit(&mut self, effect: Effect) {
        self.session().effects_mut().collect(effect);
    }

    /// Arm a timer; emits `StartTimer` unless it is already running
    fn start(&mut self, timer: &TimerCell) -> Result<()> {
        self.session().start_timer(timer.id())
    }

    /// Disarm a timer; emits `StopTimer` if it was running
    fn stop(&mut self, timer: &TimerCell) -> Result<()> {
        self.session().stop_timer(timer.id())
    }

    fn is_running(&self, timer: &TimerCell) -> Result<bool> {
        Ok(self.session_ref().timer(timer.id())?.running)
    }

    /// Show the form and wait for its submission
    fn open(&mut self, form: &FormCell) -> Result<()> {
        self.session().open_form(form.id())
    }

    fn is_open(&self, form: &FormCell) -> Result<bool> {
        Ok(self.session_ref().form(form.id())?.pending)
    }

    /// Open the channel subscription; a no-op while already subscribed
    fn subscribe(&mut self, channel: &ChannelCell) -> Result<()> {
        self.session().subscribe(channel.id())
    }

    fn unsubscribe(&mut self, channel: &ChannelCell) -> Result<()> {
        self.session().unsubscribe(channel.id())
    }

    fn channel_status(&self, channel: &ChannelCell) -> Result<ChannelStatus> {
        Ok(self.session_ref().channel(channel.id())?.status)
    }

    fn show_toast(&mut self, text: impl Into<String>) {
        self.show_toast_with(text, ToastAppearance::Neutral);
    }

    fn show_toast_with(&mut self, text: impl Into<String>, appearance: ToastAppearance) {
        self.emit(Effect::ShowToast {
            text: text.into(),
            appearance,
        });
    }

    fn navigate_to(&mut self, target: impl Into<String>) {
        self.emit(Effect::Navigate {
            target: target.into(),
        });
    }

    /// Host capabilities; valid only for the duration of this render
    fn capabilities(&self) -> &Capabilities {
        &self.session_ref().capabilities
    }

    /// Host time of the current request, in milliseconds
    fn now_ms(&self) -> i64 {
        self.session_ref().now_ms
    }
}

/// Context of one component invocation during a render walk
///
/// Cells are addressed by declaration order: the n-th `use_*` call of a
/// component always maps to cell n of its key. Declaring cells conditionally
/// or in a different order corrupts that mapping.
pub struct Scope<'a> {
    session: &'a mut Session,
    pass: &'a mut PassRecord,
    key: ComponentKey,
    cursor: u32,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(session: &'a mut Session, pass: &'a mut PassRecord, key: ComponentKey) -> Self {
        Self {
            session,
            pass,
            key,
            cursor: 0,
        }
    }

    /// Identity key of the component being rendered
    pub fn key(&self) -> &ComponentKey {
        &self.key
    }

    /// Number of cells declared so far
    pub fn declared(&self) -> u32 {
        self.cursor
    }

    fn next_cell(&mut self) -> CellId {
        let id = CellId::new(self.key.clone(), self.cursor);
        self.cursor += 1;
        id
    }

    /// Declare a value cell seeded with `initial`
    pub fn use_state(&mut self, initial: impl Into<Value>) -> Result<ValueCell> {
        let initial = initial.into();
        self.use_state_with(move || initial)
    }

    /// Declare a value cell whose initial value is computed only when absent
    pub fn use_state_with(&mut self, init: impl FnOnce() -> Value) -> Result<ValueCell> {
        let id = self.next_cell();
        self.session
            .declare(&id, "value", || CellState::Value(init()))?;
        Ok(ValueCell::new(id))
    }

    /// Declare a value cell with an asynchronous initializer
    ///
    /// When the cell is absent the initializer is queued and `Loaded::Pending`
    /// is returned; the engine resolves it after the walk and restarts the
    /// render from the root.
    pub fn use_async_state<F, Fut>(&mut self, init: F) -> Result<Loaded<ValueCell>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>> + 'static,
    {
        let id = self.next_cell();
        match self.session.store().get(&id) {
            Some(CellState::Value(_)) => Ok(Loaded::Ready(ValueCell::new(id))),
            Some(other) => Err(mismatch(&id, "value", other)),
            None => {
                tracing::debug!(cell = %id, pass = self.pass.number, "initializer suspended");
                self.pass.suspended.push((id, Box::pin(init())));
                Ok(Loaded::Pending)
            }
        }
    }

    /// Declare a repeating timer calling `on_tick` every `duration_ms`
    pub fn use_interval(
        &mut self,
        duration_ms: u64,
        on_tick: impl Fn(&mut Dispatch<'_>) -> Result<()> + 'static,
    ) -> Result<TimerCell> {
        let id = self.next_cell();
        if duration_ms < MIN_TIMER_DURATION_MS {
            return Err(UsageError::InvalidDuration {
                cell: id,
                duration_ms,
                minimum_ms: MIN_TIMER_DURATION_MS,
            }
            .into());
        }

        let state = self.session.declare(&id, "timer", || {
            CellState::Timer(TimerState::new(duration_ms))
        })?;
        if let CellState::Timer(timer) = state {
            timer.duration_ms = duration_ms;
        }

        self.pass.handlers.timers.insert(id.clone(), Rc::new(on_tick));
        Ok(TimerCell::new(id))
    }

    /// Declare a form; `on_submit` receives the decoded field values
    pub fn use_form(
        &mut self,
        schema: FormSchema,
        on_submit: impl Fn(&ValueMap, &mut Dispatch<'_>) -> Result<()> + 'static,
    ) -> Result<FormCell> {
        let id = self.next_cell();
        let seed = schema.clone();
        let state = self.session.declare(&id, "form", || {
            CellState::Form(FormState {
                schema: seed,
                pending: false,
            })
        })?;
        if let CellState::Form(form) = state {
            form.schema = schema;
        }

        self.pass.handlers.forms.insert(id.clone(), Rc::new(on_submit));
        Ok(FormCell::new(id))
    }

    /// Declare a realtime channel; `on_message` receives each payload
    pub fn use_channel(
        &mut self,
        name: impl Into<String>,
        on_message: impl Fn(&Value, &mut Dispatch<'_>) -> Result<()> + 'static,
    ) -> Result<ChannelCell> {
        let id = self.next_cell();
        let name = name.into();
        let seed = name.clone();
        self.session
            .declare(&id, "channel", || CellState::Channel(ChannelState::new(seed)))?;
        self.session.rename_channel(&id, &name)?;

        self.pass.handlers.channels.insert(id.clone(), Rc::new(on_message));
        Ok(ChannelCell::new(id))
    }
}

impl Context for Scope<'_> {
    fn get(&self, cell: &ValueCell) -> Result<Value> {
        self.session.value(cell.id()).cloned()
    }

    fn set(&mut self, cell: &ValueCell, _value: impl Into<Value>) -> Result<()> {
        Err(UsageError::WriteDuringRender {
            cell: cell.id().clone(),
        }
        .into())
    }

    fn session(&mut self) -> &mut Session {
        &mut *self.session
    }

    fn session_ref(&self) -> &Session {
        &*self.session
    }

    /// Body effects only survive if this pass turns out to be the last one
    fn emit(&mut self, effect: Effect) {
        self.session.effects_mut().collect_provisional(effect);
    }
}

/// Context of an event handler running between render passes
///
/// Value writes are buffered and applied when the handler returns, so several
/// writes to one cell in a single handler collapse into its final value.
pub struct Dispatch<'a> {
    session: &'a mut Session,
    writes: IndexMap<CellId, Value>,
}

impl<'a> Dispatch<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self {
            session,
            writes: IndexMap::new(),
        }
    }

    /// Apply buffered writes to the store
    pub(crate) fn commit(self) -> Result<()> {
        for (id, value) in self.writes {
            self.session.write_value(&id, value)?;
        }
        Ok(())
    }
}

impl Context for Dispatch<'_> {
    fn get(&self, cell: &ValueCell) -> Result<Value> {
        match self.writes.get(cell.id()) {
            Some(pending) => Ok(pending.clone()),
            None => self.session.value(cell.id()).cloned(),
        }
    }

    fn set(&mut self, cell: &ValueCell, value: impl Into<Value>) -> Result<()> {
        self.session.value(cell.id())?;
        self.writes.insert(cell.id().clone(), value.into());
        Ok(())
    }

    fn session(&mut self) -> &mut Session {
        &mut *self.session
    }

    fn session_ref(&self) -> &Session {
        &*self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{FieldKind, FormField};

    fn session() -> Session {
        Session::new(Store::new(), Capabilities::default(), 10_000)
    }

    fn component() -> ComponentKey {
        ComponentKey::new("0.App")
    }

    #[test]
    fn test_scope_declares_in_order() {
        let mut session = session();
        let mut pass = PassRecord::new(1, PassCause::Initial);
        let mut scope = Scope::new(&mut session, &mut pass, component());

        let a = scope.use_state(1i64).unwrap();
        let b = scope.use_state_with(|| Value::from("lazy")).unwrap();
        assert_eq!(a.id().index, 0);
        assert_eq!(b.id().index, 1);
        assert_eq!(scope.declared(), 2);
        assert_eq!(scope.get(&a).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_scope_rejects_writes() {
        let mut session = session();
        let mut pass = PassRecord::new(1, PassCause::Initial);
        let mut scope = Scope::new(&mut session, &mut pass, component());

        let count = scope.use_state(0i64).unwrap();
        let err = scope.set(&count, 1i64).unwrap_err();
        assert_eq!(
            err.usage(),
            Some(&UsageError::WriteDuringRender {
                cell: count.id().clone()
            })
        );
    }

    #[test]
    fn test_kind_mismatch_detected() {
        let mut session = session();
        session.store_mut().set(
            CellId::new(component(), 0),
            CellState::Value(Value::Int(3)),
        );
        let mut pass = PassRecord::new(1, PassCause::Initial);
        let mut scope = Scope::new(&mut session, &mut pass, component());

        let err = scope.use_interval(1000, |_| Ok(())).unwrap_err();
        assert!(matches!(
            err.usage(),
            Some(UsageError::CellKindMismatch {
                declared: "timer",
                stored: "value",
                ..
            })
        ));
    }

    #[test]
    fn test_timer_minimum_duration() {
        let mut session = session();
        let mut pass = PassRecord::new(1, PassCause::Initial);
        let mut scope = Scope::new(&mut session, &mut pass, component());

        let err = scope.use_interval(10, |_| Ok(())).unwrap_err();
        assert!(matches!(
            err.usage(),
            Some(UsageError::InvalidDuration { duration_ms: 10, .. })
        ));
    }

    #[test]
    fn test_dispatch_batches_writes() {
        let mut session = session();
        let mut pass = PassRecord::new(1, PassCause::Initial);
        let count = Scope::new(&mut session, &mut pass, component())
            .use_state(0i64)
            .unwrap();

        let mut dispatch = Dispatch::new(&mut session);
        dispatch.set(&count, 1i64).unwrap();
        dispatch.set(&count, 2i64).unwrap();
        assert_eq!(dispatch.get(&count).unwrap(), Value::Int(2));
        dispatch.commit().unwrap();

        assert_eq!(session.value(count.id()).unwrap(), &Value::Int(2));
    }

    #[test]
    fn test_form_and_channel_effects() {
        let mut session = session();
        let mut pass = PassRecord::new(1, PassCause::Initial);
        let schema =
            FormSchema::new().field(FormField::new("name", "Name", FieldKind::String));
        let (form, channel) = {
            let mut scope = Scope::new(&mut session, &mut pass, component());
            let form = scope.use_form(schema, |_, _| Ok(())).unwrap();
            let channel = scope.use_channel("scores", |_, _| Ok(())).unwrap();
            scope.subscribe(&channel).unwrap();
            scope.subscribe(&channel).unwrap();
            (form, channel)
        };

        let mut dispatch = Dispatch::new(&mut session);
        dispatch.open(&form).unwrap();
        assert!(dispatch.is_open(&form).unwrap());
        assert_eq!(
            dispatch.channel_status(&channel).unwrap(),
            ChannelStatus::Connecting
        );
        dispatch.show_toast("saved");
        dispatch.commit().unwrap();

        let kinds: Vec<_> = session.effects.iter().map(Effect::kind).collect();
        assert_eq!(kinds, vec!["subscribe_channel", "show_form", "show_toast"]);
    }
}
