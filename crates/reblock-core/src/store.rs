//! State store: every persisted cell of the previous render
//!
//! The store is loaded from the previous render's blob, mutated in place by
//! the current render, and serialized again at the end. Serialization sorts
//! entries by [`CellId`], so the bytes depend only on the logical content and
//! never on insertion order.

use crate::cell::CellState;
use crate::error::Result;
use crate::identity::{CellId, ComponentKey};
use indexmap::IndexMap;

/// Mapping from cell address to persisted cell contents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    cells: IndexMap<CellId, CellState>,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a serialized blob
    ///
    /// An empty blob is a fresh session with no state.
    pub fn load(blob: &[u8]) -> Result<Self> {
        if blob.is_empty() {
            return Ok(Self::new());
        }
        let entries: Vec<(CellId, CellState)> = bincode::deserialize(blob)?;
        Ok(Self {
            cells: entries.into_iter().collect(),
        })
    }

    /// Serialize the store deterministically
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut entries: Vec<(&CellId, &CellState)> = self.cells.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(bincode::serialize(&entries)?)
    }

    /// Get a cell; `None` means the slot was never initialized
    pub fn get(&self, id: &CellId) -> Option<&CellState> {
        self.cells.get(id)
    }

    /// Get a cell mutably
    pub fn get_mut(&mut self, id: &CellId) -> Option<&mut CellState> {
        self.cells.get_mut(id)
    }

    /// Write a cell
    pub fn set(&mut self, id: CellId, state: CellState) {
        self.cells.insert(id, state);
    }

    /// Remove a cell, returning its last contents
    pub fn remove(&mut self, id: &CellId) -> Option<CellState> {
        self.cells.shift_remove(id)
    }

    /// Check if a cell has been initialized
    pub fn contains(&self, id: &CellId) -> bool {
        self.cells.contains_key(id)
    }

    /// All cells owned by one component instance
    pub fn cells_of<'a>(
        &'a self,
        component: &'a ComponentKey,
    ) -> impl Iterator<Item = (&'a CellId, &'a CellState)> + 'a {
        self.cells
            .iter()
            .filter(move |(id, _)| &id.component == component)
    }

    /// Iterate over all cells
    pub fn iter(&self) -> impl Iterator<Item = (&CellId, &CellState)> {
        self.cells.iter()
    }

    /// Remove every cell matching `drop`, returning the removed cells
    pub fn drain_where(
        &mut self,
        mut drop: impl FnMut(&CellId, &CellState) -> bool,
    ) -> Vec<(CellId, CellState)> {
        let doomed: Vec<CellId> = self
            .cells
            .iter()
            .filter(|(id, state)| drop(id, state))
            .map(|(id, _)| id.clone())
            .collect();

        doomed
            .into_iter()
            .filter_map(|id| self.cells.shift_remove(&id).map(|state| (id, state)))
            .collect()
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the store holds no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::TimerState;
    use crate::Value;

    fn id(key: &str, index: u32) -> CellId {
        CellId::new(ComponentKey::new(key), index)
    }

    #[test]
    fn test_absent_vs_falsy() {
        let mut store = Store::new();
        let slot = id("0.App", 0);
        assert!(store.get(&slot).is_none());

        store.set(slot.clone(), CellState::Value(Value::Bool(false)));
        assert_eq!(store.get(&slot), Some(&CellState::Value(Value::Bool(false))));
    }

    #[test]
    fn test_serialize_is_order_independent() {
        let mut a = Store::new();
        a.set(id("0.App", 0), CellState::Value(Value::Int(1)));
        a.set(id("0.App/0.Counter", 0), CellState::Value(Value::Int(5)));
        a.set(id("0.App", 1), CellState::Timer(TimerState::new(1000)));

        let mut b = Store::new();
        b.set(id("0.App", 1), CellState::Timer(TimerState::new(1000)));
        b.set(id("0.App/0.Counter", 0), CellState::Value(Value::Int(5)));
        b.set(id("0.App", 0), CellState::Value(Value::Int(1)));

        assert_eq!(a.serialize().unwrap(), b.serialize().unwrap());
    }

    #[test]
    fn test_load_roundtrip_and_empty_blob() {
        assert!(Store::load(&[]).unwrap().is_empty());

        let mut store = Store::new();
        store.set(id("0.App", 0), CellState::Value(Value::String("hi".into())));
        let loaded = Store::load(&store.serialize().unwrap()).unwrap();
        assert_eq!(loaded.get(&id("0.App", 0)), store.get(&id("0.App", 0)));
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(Store::load(&[0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_cells_of_and_drain() {
        let mut store = Store::new();
        store.set(id("0.App", 0), CellState::Value(Value::Int(1)));
        store.set(id("0.App/0.Counter", 0), CellState::Value(Value::Int(2)));
        store.set(id("0.App/0.Counter", 1), CellState::Value(Value::Int(3)));

        let counter = ComponentKey::new("0.App/0.Counter");
        assert_eq!(store.cells_of(&counter).count(), 2);

        let dropped = store.drain_where(|cell, _| cell.component == counter);
        assert_eq!(dropped.len(), 2);
        assert_eq!(store.len(), 1);
    }
}
