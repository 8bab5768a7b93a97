//! Reblock Host - Request/response surface for reblock apps
//!
//! Wraps the stateless engine in the shape a serverless host needs:
//! - `Request` / `Response` carrying the opaque state blob
//! - `StateEnvelope` versioning of that blob
//! - `Worker` serving requests for one app, with a diagnostics `Registry`
//! - `WorkerConfig` loaded from RON and `logging::init` for `tracing`
//!
//! ## JSON Feature
//!
//! Enable the `serde_json` feature for `Response::to_json`:
//! ```toml
//! reblock-host = { version = "0.1", features = ["serde_json"] }
//! ```

mod config;
mod envelope;
mod error;
pub mod logging;
mod registry;
mod request;
mod worker;

pub use config::{WorkerConfig, STATE_VERSION};
pub use envelope::StateEnvelope;
pub use error::{Error, Result};
pub use registry::Registry;
pub use request::{Request, Response};
pub use worker::{AppFn, Worker};
