//! Worker: serves render requests for one app
//!
//! A worker owns the engine, the host capabilities and the app's root
//! factory. It holds no per-session state: everything a session needs comes
//! in with the request and goes back out with the response.

use crate::config::WorkerConfig;
use crate::envelope::StateEnvelope;
use crate::registry::Registry;
use crate::request::{Request, Response};
use crate::Result;
use reblock_core::{Capabilities, Engine, Node, Value};
use std::rc::Rc;

/// Builds the root node of the app from request props
pub type AppFn = Rc<dyn Fn(&Value) -> Node>;

pub struct Worker {
    engine: Engine,
    capabilities: Capabilities,
    app: AppFn,
    state_version: u32,
    registry: Registry,
    served: u64,
}

impl Worker {
    pub fn new(
        config: &WorkerConfig,
        capabilities: Capabilities,
        app: impl Fn(&Value) -> Node + 'static,
    ) -> Self {
        tracing::info!(
            max_restarts = config.engine.max_restarts(),
            state_version = config.state_version,
            "worker started"
        );
        Self {
            engine: Engine::new(config.engine.clone()),
            capabilities,
            app: Rc::new(app),
            state_version: config.state_version,
            registry: Registry::new(),
            served: 0,
        }
    }

    /// Render one request
    ///
    /// On error nothing is returned and the worker is unchanged; the client
    /// keeps its previous state bytes.
    pub async fn handle(&mut self, request: Request) -> Result<Response> {
        let Request {
            state,
            event,
            now_ms,
            props,
        } = request;

        let store = StateEnvelope::decode(&state, self.state_version)?;
        let root = (self.app)(&props);
        let rendered = match self
            .engine
            .render(&root, store, event.clone(), self.capabilities.clone(), now_ms)
            .await
        {
            Ok(rendered) => rendered,
            Err(err) => {
                tracing::error!(error = %err, "render failed");
                return Err(err.into());
            }
        };
        let state = StateEnvelope::encode(&rendered.store, self.state_version)?;

        if let Some(event) = &event {
            self.registry.observe_event(event);
        }
        self.registry.observe(&rendered.effects);
        self.served += 1;
        tracing::debug!(
            passes = rendered.passes,
            effects = rendered.effects.len(),
            state_bytes = state.len(),
            "request served"
        );

        Ok(Response {
            tree: rendered.tree,
            effects: rendered.effects,
            state,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of requests served successfully
    pub fn served(&self) -> u64 {
        self.served
    }

    /// Stop the worker, forgetting everything it observed
    pub fn shutdown(&mut self) {
        tracing::info!(served = self.served, "worker shutting down");
        self.registry.clear();
    }
}
