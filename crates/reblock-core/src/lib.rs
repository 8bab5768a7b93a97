//! Reblock Core - Stateless UI reconciliation engine
//!
//! A render takes a component tree, the serialized state of the previous
//! render and at most one inbound event, and produces a new element tree, an
//! ordered list of effects and the new serialized state. Nothing survives
//! between renders except the state blob the host hands back.
//!
//! - Dynamic values (`Value`, `ValueMap`)
//! - Positional component identity (`ComponentKey`, `CellId`)
//! - Persisted cells: values, timers, forms and channels
//! - Effects for the host to perform (`Effect`)
//! - Event routing to the handler that registered for it
//! - Host capabilities injected per render (`Capabilities`)
//!
//! ## Example
//!
//! ```no_run
//! use reblock_core::{Component, Context, Element, Engine, Node, Store, Capabilities, Value};
//!
//! # async fn demo() -> reblock_core::Result<()> {
//! let app: Node = Component::new("Counter", |_, scope| {
//!     let count = scope.use_state(0i64)?;
//!     let label = format!("Count: {}", scope.get(&count)?);
//!     Ok(Element::new("button")
//!         .prop("text", label)
//!         .on_press(move |d| d.update(&count, |v| Value::Int(v.as_int().unwrap_or(0) + 1)))
//!         .into())
//! })
//! .into();
//!
//! let rendered = Engine::default()
//!     .render(&app, Store::new(), None, Capabilities::default(), 0)
//!     .await?;
//! let blob = rendered.store.serialize()?;
//! # let _ = blob;
//! # Ok(())
//! # }
//! ```

mod capability;
mod cell;
mod config;
mod context;
pub mod dispatch;
mod effect;
mod engine;
mod error;
mod event;
mod identity;
mod node;
mod store;
mod value;

pub use capability::{
    CapabilityError, CapabilityResult, Capabilities, Fetch, FetchRequest, FetchResponse,
    KeyValueStore, MemoryStore, Messaging, NoFetch, NoMessaging, NoScheduler, Scheduler,
};
pub use cell::{
    CellState, ChannelCell, ChannelState, ChannelStatus, FieldKind, FormCell, FormField,
    FormSchema, FormState, Loaded, TimerCell, TimerState, ValueCell, MIN_TIMER_DURATION_MS,
};
pub use config::{EngineConfig, DEFAULT_MAX_RESTARTS};
pub use context::{Context, Deferred, Dispatch, Scope, Session};
pub use effect::{Effect, EffectCollector, ToastAppearance};
pub use engine::{Engine, Rendered};
pub use error::{Error, FormError, Result, UsageError};
pub use event::Event;
pub use identity::{CellId, ComponentKey};
pub use node::{Component, Element, Node, PressHandler, RenderFn, RenderedNode};
pub use store::Store;
pub use value::{Value, ValueMap};
