use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::constants::{LABEL_MANAGED_BY, MANAGED_BY};

/// Labels attached to a created resource.
///
/// Ordered so that serialized resources are stable across calls.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Labels pre-populated with the ownership marker.
    pub fn managed() -> Self {
        let mut labels = Self::new();
        labels.insert(LABEL_MANAGED_BY, MANAGED_BY);
        labels
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Insert or overwrite a label. Returns `self` for chaining.
    pub fn insert<K, V>(&mut self, key: K, val: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), val.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
