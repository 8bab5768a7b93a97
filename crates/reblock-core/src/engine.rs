//! Render engine: one reconciliation from (tree, state, event) to output
//!
//! A render runs one or more passes over the component tree:
//!
//! 1. Walk the tree depth-first, expanding components and collecting handlers
//! 2. If any deferred initializer is pending, await them all, store the
//!    results and restart from the root (bounded by `max_restarts`)
//! 3. After the first complete walk, deliver the event (if any); when the
//!    handler changed the store, walk once more so the output reflects it
//! 4. Prune cells of components that were not rendered in the last pass
//!
//! Store changes and cell effects made by an aborted pass are kept: a pass
//! that suspends still arms the timers it started before suspending. Toasts
//! and navigations requested by component bodies only count for the last
//! pass, since every earlier pass is rendered again.

use crate::capability::Capabilities;
use crate::cell::CellState;
use crate::config::EngineConfig;
use crate::context::{PassCause, PassRecord, Scope, Session};
use crate::dispatch;
use crate::effect::Effect;
use crate::error::{Error, Result, UsageError};
use crate::event::Event;
use crate::identity::ComponentKey;
use crate::node::{Node, RenderedNode};
use crate::store::Store;
use indexmap::{IndexMap, IndexSet};
use tracing::Instrument;

/// Output of one render
#[derive(Debug)]
pub struct Rendered {
    /// Root of the rendered tree; `None` when the root renders nothing
    pub tree: Option<RenderedNode>,
    /// Effects in emission order
    pub effects: Vec<Effect>,
    /// Store to persist for the next render
    pub store: Store,
    /// Number of passes the render took
    pub passes: u32,
}

/// Stateless render engine
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Render `root` against `store`, delivering at most one `event`
    ///
    /// Any error aborts the whole render; no partial output is returned.
    pub async fn render(
        &self,
        root: &Node,
        store: Store,
        event: Option<Event>,
        capabilities: Capabilities,
        now_ms: i64,
    ) -> Result<Rendered> {
        let span = tracing::debug_span!(
            "render",
            event = event.as_ref().map(Event::kind).unwrap_or("none"),
            now_ms
        );
        self.run(root, Session::new(store, capabilities, now_ms), event)
            .instrument(span)
            .await
    }

    async fn run(&self, root: &Node, mut session: Session, mut event: Option<Event>) -> Result<Rendered> {
        let mut passes = 0u32;
        let mut restarts = 0u32;
        let mut cause = PassCause::Initial;

        loop {
            passes += 1;
            session.begin_phase();
            let mut pass = PassRecord::new(passes, cause);
            tracing::debug!(pass = pass.number, cause = ?pass.cause, "render pass");

            let mut roots = IndexSet::new();
            let tree = walk(root, &ComponentKey::root(), 0, &mut roots, &mut session, &mut pass)?;

            if !pass.suspended.is_empty() {
                if restarts >= self.config.max_restarts() {
                    return Err(Error::RestartLimit {
                        limit: self.config.max_restarts(),
                        restarts,
                        pending: pass.suspended.len(),
                    });
                }
                restarts += 1;
                tracing::debug!(
                    pending = pass.suspended.len(),
                    restarts,
                    "awaiting deferred initializers"
                );
                session.effects_mut().discard_provisional();
                for (id, initializer) in pass.suspended.drain(..) {
                    let value = initializer.await?;
                    session.store_mut().set(id, CellState::Value(value));
                }
                cause = PassCause::Resumed;
                continue;
            }

            if let Some(event) = event.take() {
                session.begin_phase();
                if dispatch::deliver(&pass.handlers, &event, &mut session)? {
                    session.effects_mut().discard_provisional();
                    cause = PassCause::Event;
                    continue;
                }
            }

            unmount(&mut session, &pass.mounted);
            let (store, mut effects) = session.into_parts();
            let effects = effects.flush();
            tracing::debug!(
                passes,
                effects = effects.len(),
                cells = store.len(),
                "render complete"
            );
            return Ok(Rendered {
                tree,
                effects,
                store,
                passes,
            });
        }
    }
}

/// Derive a child's key and reject duplicates among its siblings
fn claim(
    parent: &ComponentKey,
    ordinal: usize,
    name: &str,
    explicit: Option<&str>,
    siblings: &mut IndexSet<ComponentKey>,
) -> Result<ComponentKey> {
    let key = parent.child(ordinal, name, explicit)?;
    if !siblings.insert(key.clone()) {
        return Err(UsageError::DuplicateKey {
            parent: parent.clone(),
            key,
        }
        .into());
    }
    Ok(key)
}

fn walk(
    node: &Node,
    parent: &ComponentKey,
    ordinal: usize,
    siblings: &mut IndexSet<ComponentKey>,
    session: &mut Session,
    pass: &mut PassRecord,
) -> Result<Option<RenderedNode>> {
    match node {
        Node::Empty => Ok(None),
        Node::Element(element) => {
            let key = claim(parent, ordinal, &element.tag, element.key.as_deref(), siblings)?;
            if let Some(handler) = &element.on_press {
                pass.handlers.press.insert(key.clone(), handler.clone());
            }

            let mut child_keys = IndexSet::new();
            let mut children = Vec::with_capacity(element.children.len());
            for (index, child) in element.children.iter().enumerate() {
                if let Some(rendered) = walk(child, &key, index, &mut child_keys, session, pass)? {
                    children.push(rendered);
                }
            }

            Ok(Some(RenderedNode {
                tag: element.tag.clone(),
                action: element.on_press.as_ref().map(|_| key.clone()),
                key,
                props: element.props.clone(),
                children,
            }))
        }
        Node::Component(component) => {
            let key = claim(parent, ordinal, &component.name, component.key.as_deref(), siblings)?;
            let (output, declared) = {
                let mut scope = Scope::new(session, pass, key.clone());
                let output = (component.render)(&component.props, &mut scope)?;
                (output, scope.declared())
            };
            pass.mounted.insert(key.clone(), declared);

            let mut child_keys = IndexSet::new();
            walk(&output, &key, 0, &mut child_keys, session, pass)
        }
    }
}

/// Drop cells of components that did not render, releasing what they held
fn unmount(session: &mut Session, mounted: &IndexMap<ComponentKey, u32>) {
    let removed = session
        .store_mut()
        .drain_where(|id, _| match mounted.get(&id.component) {
            Some(declared) => id.index >= *declared,
            None => true,
        });

    for (id, state) in removed {
        tracing::debug!(cell = %id, kind = state.kind_name(), "cell unmounted");
        match state {
            CellState::Timer(timer) => {
                if timer.running {
                    session
                        .effects_mut()
                        .collect(Effect::StopTimer { owner: id });
                }
            }
            CellState::Channel(channel) => {
                if channel.active {
                    session
                        .effects_mut()
                        .collect(Effect::UnsubscribeChannel { name: channel.name });
                }
            }
            CellState::Value(_) | CellState::Form(_) => {}
        }
    }
}
