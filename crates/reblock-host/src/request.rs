//! Request and response surface of a worker

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use reblock_core::{Effect, Event, RenderedNode, Value};
use serde::{Deserialize, Serialize};

/// One inbound render request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// State bytes returned by the previous response; empty for a new session
    #[serde(default)]
    pub state: Vec<u8>,
    #[serde(default)]
    pub event: Option<Event>,
    /// Host time in milliseconds since the Unix epoch
    pub now_ms: i64,
    /// Props handed to the app's root factory
    #[serde(default)]
    pub props: Value,
}

impl Request {
    /// Create a request stamped with the current wall-clock time
    pub fn new(state: Vec<u8>) -> Self {
        Self {
            state,
            event: None,
            now_ms: Utc::now().timestamp_millis(),
            props: Value::Null,
        }
    }

    /// Start a fresh session
    pub fn fresh() -> Self {
        Self::new(Vec::new())
    }

    pub fn event(mut self, event: Event) -> Self {
        self.event = Some(event);
        self
    }

    pub fn props(mut self, props: impl Into<Value>) -> Self {
        self.props = props.into();
        self
    }

    /// Pin the request time
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now_ms = now.timestamp_millis();
        self
    }

    pub fn at_ms(mut self, now_ms: i64) -> Self {
        self.now_ms = now_ms;
        self
    }
}

/// Output of a successful render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub tree: Option<RenderedNode>,
    pub effects: Vec<Effect>,
    /// Opaque state to send back with the next request
    pub state: Vec<u8>,
}

impl Response {
    /// Continue the session with a follow-up request
    pub fn next(&self) -> Request {
        Request::new(self.state.clone())
    }

    /// Find the `action` key of the element whose `id` prop is `id`
    pub fn action(&self, id: &str) -> Option<Event> {
        self.tree
            .as_ref()?
            .find_by_id(id)?
            .action
            .clone()
            .map(Event::press)
    }

    /// Export as pretty-printed RON
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::Export(e.to_string()))
    }

    /// Export as pretty-printed JSON
    #[cfg(feature = "serde_json")]
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Export(e.to_string()))
    }

    #[cfg(not(feature = "serde_json"))]
    pub fn to_json(&self) -> Result<String> {
        Err(Error::Export(
            "JSON export requires the 'serde_json' feature".to_string(),
        ))
    }
}
