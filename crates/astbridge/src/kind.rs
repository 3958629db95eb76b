//! Node and token kind identifiers.
//!
//! The set of kinds belongs to the external parser's grammar version, so kinds
//! are plain numeric identifiers here. A [`KindTable`] pairs them with their
//! names; the [`Grammar`](crate::Grammar) holds one table for non-terminals
//! and one for terminals and rejects payloads using ids it does not know.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Deserialize;

/// A non-terminal kind identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKind(pub u32);

impl NodeKind {
    /// Extract the raw identifier.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeKind {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node kind {}", self.0)
    }
}

/// A terminal kind identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenKind(pub u32);

impl TokenKind {
    /// Extract the raw identifier.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for TokenKind {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token kind {}", self.0)
    }
}

/// Bidirectional mapping between kind identifiers and names.
///
/// Both ids and names are unique within a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<u32, String>")]
pub struct KindTable {
    names: BTreeMap<u32, String>,
    ids: HashMap<String, u32>,
}

impl KindTable {
    /// Build a table from `(id, name)` pairs.
    ///
    /// # Errors
    ///
    /// Returns a description of the conflict if an id or a name appears twice,
    /// or if a name is empty.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for (id, name) in entries {
            let name = name.into();
            if name.is_empty() {
                return Err(format!("kind {id} has an empty name"));
            }
            if let Some(existing) = table.names.get(&id) {
                return Err(format!("kind {id} is named both '{existing}' and '{name}'"));
            }
            if let Some(existing) = table.ids.get(&name) {
                return Err(format!("kind name '{name}' is used by both {existing} and {id}"));
            }
            table.ids.insert(name.clone(), id);
            table.names.insert(id, name);
        }
        Ok(table)
    }

    /// Name of the kind with the given id.
    #[must_use]
    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Id of the kind with the given name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    /// Whether the table knows this id.
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.names.contains_key(&id)
    }

    /// Number of kinds in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over `(id, name)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

impl TryFrom<BTreeMap<u32, String>> for KindTable {
    type Error = String;

    fn try_from(entries: BTreeMap<u32, String>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_work_in_both_directions() {
        let table = KindTable::from_entries([(9000, "n_PROGRAM"), (9001, "n_STATEMENT")])
            .expect("valid table");

        assert_eq!(table.name(9001), Some("n_STATEMENT"));
        assert_eq!(table.id("n_PROGRAM"), Some(9000));
        assert_eq!(table.name(42), None);
        assert_eq!(table.id("n_MISSING"), None);
        assert!(table.contains(9000));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let error = KindTable::from_entries([(1, "T_STRING"), (2, "T_STRING")])
            .expect_err("duplicate name should fail");
        assert!(error.contains("T_STRING"));
    }

    #[test]
    fn empty_names_are_rejected() {
        assert!(KindTable::from_entries([(1, "")]).is_err());
    }

    #[test]
    fn iteration_is_ordered_by_id() {
        let table = KindTable::from_entries([(3, "c"), (1, "a"), (2, "b")]).expect("valid table");
        let ids: Vec<u32> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn deserializes_from_yaml_map() {
        let table: KindTable =
            serde_yaml::from_str("9000: n_PROGRAM\n9001: n_STATEMENT\n").expect("valid yaml");
        assert_eq!(table.name(9000), Some("n_PROGRAM"));
    }
}
