//! Identity keys for component instances and state cells
//!
//! A component's key is the path of segments from the root to its position in
//! the tree. Each segment is either positional (`{ordinal}.{name}`) or explicit
//! (`{name}#{key}`). The same ancestor chain and position always resolve to the
//! same key, so state survives across stateless renders as long as the tree
//! shape upstream of a node is unchanged.
//!
//! Positional keys only see an ordinal and a name. Two sibling invocations of
//! the same component without explicit keys are indistinguishable, so
//! swapping them leaves each position with the state it had before; the
//! state does not travel with the invocation. Give homogeneous siblings an
//! explicit key when their state must follow them through a reorder.

use crate::error::{Result, UsageError};
use serde::{Deserialize, Serialize};
use std::fmt;

const SEPARATOR: char = '/';
const EXPLICIT_MARK: char = '#';
const ORDINAL_MARK: char = '.';

fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains([SEPARATOR, EXPLICIT_MARK, ORDINAL_MARK])
}

/// Path-based identity of a component instance (or element) in the tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentKey(String);

impl ComponentKey {
    /// The key every tree is rooted at
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Wrap a key string received back from the host
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Resolve the key of a child at `ordinal` under this key
    ///
    /// An explicit key replaces the ordinal, so homogeneous siblings keep their
    /// identity when reordered.
    pub fn child(&self, ordinal: usize, name: &str, explicit: Option<&str>) -> Result<Self> {
        if !valid_name(name) {
            return Err(UsageError::InvalidName {
                parent: self.clone(),
                name: name.to_string(),
            }
            .into());
        }
        let segment = match explicit {
            Some(key) => {
                if key.is_empty() || key.contains(SEPARATOR) || key.contains(EXPLICIT_MARK) {
                    return Err(UsageError::InvalidKey {
                        parent: self.clone(),
                        key: key.to_string(),
                    }
                    .into());
                }
                format!("{}{}{}", name, EXPLICIT_MARK, key)
            }
            None => format!("{}{}{}", ordinal, ORDINAL_MARK, name),
        };

        if self.0.is_empty() {
            Ok(Self(segment))
        } else {
            Ok(Self(format!("{}{}{}", self.0, SEPARATOR, segment)))
        }
    }

    /// Check if this key is the root
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether `self` lies inside the subtree rooted at `ancestor`
    pub fn is_within(&self, ancestor: &ComponentKey) -> bool {
        if ancestor.is_root() {
            return true;
        }
        match self.0.strip_prefix(ancestor.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
            None => false,
        }
    }

    /// Number of segments in the path
    pub fn depth(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.0.split(SEPARATOR).count()
        }
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for ComponentKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Address of a state cell: the owning component plus its declaration index
///
/// Ordering is by component key first, then index, which is what the store
/// uses to serialize deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId {
    /// Owning component instance
    pub component: ComponentKey,
    /// Position of the cell among the component's declarations
    pub index: u32,
}

impl CellId {
    /// Create a new cell address
    pub fn new(component: ComponentKey, index: u32) -> Self {
        Self { component, index }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.component, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_positional_keys_are_stable() {
        let root = ComponentKey::root();
        let a = root.child(0, "App", None).unwrap();
        let b = root.child(0, "App", None).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0.App");

        let counter = a.child(1, "Counter", None).unwrap();
        assert_eq!(counter.as_str(), "0.App/1.Counter");
        assert_eq!(counter.depth(), 2);
    }

    #[test]
    fn test_position_change_changes_identity() {
        let app = ComponentKey::root().child(0, "App", None).unwrap();
        let first = app.child(0, "Counter", None).unwrap();
        let moved = app.child(1, "Counter", None).unwrap();
        assert_ne!(first, moved);
    }

    #[test]
    fn test_explicit_key_ignores_ordinal() {
        let app = ComponentKey::root().child(0, "App", None).unwrap();
        let a = app.child(0, "Row", Some("item-7")).unwrap();
        let b = app.child(5, "Row", Some("item-7")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0.App/Row#item-7");
    }

    #[test]
    fn test_invalid_explicit_key() {
        let root = ComponentKey::root();
        for bad in ["", "a/b", "a#b"] {
            let err = root.child(0, "Row", Some(bad)).unwrap_err();
            assert!(matches!(err, Error::Usage(UsageError::InvalidKey { .. })));
        }
    }

    #[test]
    fn test_invalid_name() {
        let app = ComponentKey::new("0.App");
        for bad in ["", "Row/Cell", "Row#1", "ui.Row"] {
            let err = app.child(0, bad, None).unwrap_err();
            assert!(matches!(err, Error::Usage(UsageError::InvalidName { .. })));
            // Explicit keys do not bypass the check
            assert!(app.child(0, bad, Some("k")).is_err());
        }
        assert!(app.child(0, "text-input", None).is_ok());
    }

    #[test]
    fn test_is_within() {
        let app = ComponentKey::new("0.App");
        assert!(ComponentKey::new("0.App/1.Counter").is_within(&app));
        assert!(app.is_within(&app));
        assert!(!ComponentKey::new("0.AppShell").is_within(&app));
        assert!(app.is_within(&ComponentKey::root()));
    }

    #[test]
    fn test_cell_id_display_and_order() {
        let a = CellId::new(ComponentKey::new("0.App"), 1);
        let b = CellId::new(ComponentKey::new("0.App"), 0);
        assert_eq!(format!("{}", a), "0.App:1");
        assert!(b < a);
        assert_eq!(format!("{}", ComponentKey::root()), "<root>");
    }
}
