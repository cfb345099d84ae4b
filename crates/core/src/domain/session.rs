use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-visitor key-value state, loaded at the start of a request and saved
/// by the host when `is_modified` is set.
///
/// `version` is the stored version this value was loaded at (0 for a session
/// that has never been persisted).
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    id: SessionId,
    values: Map<String, Value>,
    version: u64,
    modified: bool,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self { id, values: Map::new(), version: 0, modified: false }
    }

    pub fn restore(id: SessionId, values: Map<String, Value>, version: u64) -> Self {
        Self { id, values, version, modified: false }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Called by stores after a successful save.
    pub fn mark_saved(&mut self, version: u64) {
        self.version = version;
        self.modified = false;
    }
}
