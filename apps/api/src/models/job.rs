use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A job posting from the catalog.
/// Only `id` is interpreted; every other field is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[cfg(test)]
impl Job {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}
