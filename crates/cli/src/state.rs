//! The state file: every resource the CLI manages with its last known
//! attributes, in creation order.

use std::path::Path;

use anyhow::Context;
use kcp::provider::ResourceData;

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct StateEntry {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    pub data: ResourceData,
}

impl StateEntry {
    pub fn address(&self) -> String {
        format!("{}.{}", self.type_name, self.name)
    }
}

#[derive(Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct State {
    #[serde(default)]
    pub resources: Vec<StateEntry>,
}

impl State {
    /// A missing file is an empty state.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read state {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("invalid state {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("unable to write state {}", path.display()))
    }

    pub fn get(&self, address: &str) -> Option<&StateEntry> {
        self.resources.iter().find(|entry| entry.address() == address)
    }

    /// Replaces the entry in place or appends a new one.
    pub fn upsert(&mut self, type_name: &str, name: &str, data: ResourceData) {
        let address = format!("{type_name}.{name}");
        match self.resources.iter_mut().find(|entry| entry.address() == address) {
            Some(entry) => entry.data = data,
            None => self.resources.push(StateEntry {
                type_name: type_name.to_string(),
                name: name.to_string(),
                data,
            }),
        }
    }

    pub fn remove(&mut self, address: &str) -> Option<StateEntry> {
        let index = self
            .resources
            .iter()
            .position(|entry| entry.address() == address)?;
        Some(self.resources.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn entries_keep_their_order() {
        let mut state = State::default();
        state.upsert("keycloak_realm", "main", ResourceData::default().with_id("acme"));
        state.upsert("keycloak_group", "dev", ResourceData::default().with_id("g1"));
        state.upsert("keycloak_realm", "main", ResourceData::default().with_id("acme2"));
        assert_eq!(state.resources.len(), 2);
        assert_eq!(state.resources[0].data.id(), "acme2");
        assert_eq!(state.get("keycloak_group.dev").unwrap().data.id(), "g1");

        let removed = state.remove("keycloak_realm.main").unwrap();
        assert_eq!(removed.name, "main");
        assert!(state.remove("keycloak_realm.main").is_none());
        assert_eq!(state.resources[0].address(), "keycloak_group.dev");
    }

    #[test]
    fn saved_state_loads_again() {
        let path = std::env::temp_dir().join(format!("kcp-state-{}.json", std::process::id()));
        assert_eq!(State::load(&path).unwrap(), State::default());

        let mut state = State::default();
        state.upsert(
            "keycloak_group",
            "dev",
            ResourceData::from(json!({"realm_id": "test", "name": "dev"})).with_id("g1"),
        );
        state.save(&path).unwrap();
        let loaded = State::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.resources[0].data.get_str("realm_id"), "test");
    }
}
