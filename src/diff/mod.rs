//! Change-set computation between two namespace snapshots.
//!
//! [`diff`] is a pure function over two key/value maps. It is the only place
//! that decides what counts as a change, and it never emits an entry whose
//! old and new values are equal.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;


/// Kind of change applied to one key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    /// Key did not exist before
    Add,
    /// Key exists on both sides with different values
    Modify,
    /// Key no longer exists
    Delete,
}

impl fmt::Display for ChangeType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            ChangeType::Add => "ADD",
            ChangeType::Modify => "MODIFY",
            ChangeType::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// A single key change. Absent sides are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub old_value: String,
    pub new_value: String,
    pub change_type: ChangeType,
}

impl Change {
    /// A key absent from the old map. An added empty value yields
    /// `old_value == new_value == ""`; the kind tells it apart.
    pub fn added(new_value: impl Into<String>) -> Self {
        Self {
            old_value: String::new(),
            new_value: new_value.into(),
            change_type: ChangeType::Add,
        }
    }

    pub fn modified(
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            old_value: old_value.into(),
            new_value: new_value.into(),
            change_type: ChangeType::Modify,
        }
    }

    pub fn deleted(old_value: impl Into<String>) -> Self {
        Self {
            old_value: old_value.into(),
            new_value: String::new(),
            change_type: ChangeType::Delete,
        }
    }
}

/// Every key that differs between two snapshots of one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub namespace: String,
    pub changes: HashMap<String, Change>,
}

impl ChangeEvent {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            changes: HashMap::new(),
        }
    }

    /// An empty change-set is "no event" and must not be delivered.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&Change> {
        self.changes.get(key)
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Computes the change-set turning `old` into `new`.
///
/// Three passes:
/// 1. every key of `old` gets a tentative Delete
/// 2. every key of `new` either cancels its tentative entry (equal value),
///    converts it to Modify (different value), or is recorded as Add
/// 3. surviving tentative Deletes are final
///
/// Add and Delete are decided by key presence, not by value, so a key added
/// (or deleted) with an empty value is still reported even though both value
/// sides are empty. Modify always has `old_value != new_value`.
pub fn diff(
    namespace: &str,
    old: &HashMap<String, String>,
    new: &HashMap<String, String>,
) -> ChangeEvent {
    let mut changes: HashMap<String, Change> = old
        .iter()
        .map(|(key, value)| (key.clone(), Change::deleted(value.as_str())))
        .collect();

    for (key, new_value) in new {
        match changes.remove(key) {
            Some(tentative) if tentative.old_value == *new_value => {}
            Some(tentative) => {
                changes.insert(key.clone(), Change::modified(tentative.old_value, new_value.as_str()));
            }
            None => {
                changes.insert(key.clone(), Change::added(new_value.as_str()));
            }
        }
    }

    ChangeEvent {
        namespace: namespace.to_string(),
        changes,
    }
}
