//! Runtime settings supplied next to the objects definition file.

use std::collections::HashMap;

/// Per-entity spawn point override strings, keyed by entity id
///
/// Values are raw `"x,y,z,roll,pitch,yaw"` strings. Parsing happens at
/// resolution time so that a malformed override only affects its own entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnPointOverrides(HashMap<String, String>);

impl SpawnPointOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the override for an entity
    pub fn insert(&mut self, entity_id: impl Into<String>, raw: impl Into<String>) {
        self.0.insert(entity_id.into(), raw.into());
    }

    pub fn get(&self, entity_id: &str) -> Option<&str> {
        self.0.get(entity_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `other` into `self`; entries of `other` win
    pub fn merge(&mut self, other: SpawnPointOverrides) {
        self.0.extend(other.0);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SpawnPointOverrides {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Run-wide settings chosen once at startup
#[derive(Debug, Clone, Default)]
pub struct RuntimeSettings {
    /// Only provision sensors of entities spawned by another process
    pub sensors_only: bool,

    /// Spawn point overrides by entity id
    pub overrides: SpawnPointOverrides,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_incoming_entries() {
        let mut base: SpawnPointOverrides =
            [("ego", "0,0,0,0,0,0"), ("hero", "1,1,1,0,0,0")].into_iter().collect();
        let cli: SpawnPointOverrides = [("ego", "5,5,5,0,0,90")].into_iter().collect();

        base.merge(cli);

        assert_eq!(base.len(), 2);
        assert_eq!(base.get("ego"), Some("5,5,5,0,0,90"));
        assert_eq!(base.get("hero"), Some("1,1,1,0,0,0"));
        assert_eq!(base.get("other"), None);
    }
}
