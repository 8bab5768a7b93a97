//! Versioned wrapper around the engine's state blob
//!
//! The engine treats state as opaque bytes. The host stamps them with a
//! version so that a worker never loads a blob written by an incompatible
//! build.

use crate::{Error, Result};
use reblock_core::Store;
use serde::{Deserialize, Serialize};

/// Host-level framing of a serialized store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEnvelope {
    pub version: u32,
    /// Bytes produced by `Store::serialize`
    pub cells: Vec<u8>,
}

impl StateEnvelope {
    /// Wrap a store for the client to hold until the next request
    pub fn encode(store: &Store, version: u32) -> Result<Vec<u8>> {
        let envelope = StateEnvelope {
            version,
            cells: store.serialize()?,
        };
        Ok(bincode::serialize(&envelope)?)
    }

    /// Unwrap a store; empty bytes are a fresh session
    pub fn decode(bytes: &[u8], expected: u32) -> Result<Store> {
        if bytes.is_empty() {
            return Ok(Store::new());
        }
        let envelope: StateEnvelope = bincode::deserialize(bytes)?;
        if envelope.version != expected {
            return Err(Error::IncompatibleState {
                expected,
                found: envelope.version,
            });
        }
        Ok(Store::load(&envelope.cells)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reblock_core::{CellId, CellState, ComponentKey, Value};

    #[test]
    fn test_empty_is_fresh() {
        assert!(StateEnvelope::decode(&[], 1).unwrap().is_empty());
    }

    #[test]
    fn test_version_checked() {
        let mut store = Store::new();
        store.set(
            CellId::new(ComponentKey::new("0.App"), 0),
            CellState::Value(Value::Int(4)),
        );
        let bytes = StateEnvelope::encode(&store, 1).unwrap();

        assert_eq!(StateEnvelope::decode(&bytes, 1).unwrap(), store);
        assert!(matches!(
            StateEnvelope::decode(&bytes, 2),
            Err(Error::IncompatibleState {
                expected: 2,
                found: 1
            })
        ));
    }
}
