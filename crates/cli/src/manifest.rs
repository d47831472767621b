//! Manifest files: the provider configuration plus the data sources and
//! resources to manage, in the order they are applied.

use std::{collections::BTreeMap, path::Path};

use anyhow::Context;
use kcp::provider::ResourceData;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

lazy_static! {
    static ref REFERENCE: Regex =
        Regex::new(r"\$\{((?:data\.)?[a-z0-9_]+\.[A-Za-z0-9_-]+)\.([a-z0-9_]+)\}")
            .expect("invalid reference regex");
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl ManifestEntry {
    pub fn address(&self) -> String {
        format!("{}.{}", self.type_name, self.name)
    }
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub provider: Map<String, Value>,
    #[serde(default)]
    pub data: Vec<ManifestEntry>,
    #[serde(default)]
    pub resources: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read manifest {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid manifest {}", path.display()))
    }

    pub fn contains(&self, address: &str) -> bool {
        self.resources.iter().any(|entry| entry.address() == address)
    }
}

/// Known resource and data source states by address. Data sources are
/// addressed as `data.{type}.{name}`.
#[derive(Debug, Default)]
pub struct References {
    known: BTreeMap<String, ResourceData>,
}

impl References {
    pub fn insert(&mut self, address: String, data: ResourceData) {
        self.known.insert(address, data);
    }

    fn lookup(&self, address: &str, attribute: &str) -> anyhow::Result<Value> {
        let data = self
            .known
            .get(address)
            .with_context(|| format!("reference to unknown resource {address}"))?;
        if attribute == "id" {
            return Ok(Value::String(data.id().to_string()));
        }
        data.get(attribute)
            .cloned()
            .with_context(|| format!("{address} has no attribute {attribute}"))
    }

    /// A string that is exactly one reference takes the referenced value
    /// with its type; references inside longer strings are interpolated.
    fn resolve(&self, value: &Value) -> anyhow::Result<Value> {
        match value {
            Value::String(s) => {
                if let Some(captures) = REFERENCE.captures(s) {
                    if captures[0].len() == s.len() {
                        return self.lookup(&captures[1], &captures[2]);
                    }
                }
                let mut error = None;
                let resolved = REFERENCE.replace_all(s, |captures: &Captures| {
                    match self.lookup(&captures[1], &captures[2]) {
                        Ok(Value::String(s)) => s,
                        Ok(other) => other.to_string(),
                        Err(err) => {
                            error.get_or_insert(err);
                            String::new()
                        }
                    }
                });
                match error {
                    Some(err) => Err(err),
                    None => Ok(Value::String(resolved.into_owned())),
                }
            }
            Value::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve(item))
                    .collect::<anyhow::Result<_>>()?,
            )),
            Value::Object(map) => Ok(Value::Object(self.resolve_config(map)?)),
            other => Ok(other.clone()),
        }
    }

    pub fn resolve_config(&self, config: &Map<String, Value>) -> anyhow::Result<Map<String, Value>> {
        config
            .iter()
            .map(|(key, value)| Ok((key.clone(), self.resolve(value)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn references() -> References {
        let mut references = References::default();
        references.insert(
            "keycloak_realm.main".into(),
            ResourceData::from(json!({"realm": "acme", "internal_id": "r-1"})).with_id("acme"),
        );
        references.insert(
            "data.keycloak_role.admin".into(),
            ResourceData::from(json!({"composite_roles": ["c1", "c2"]})).with_id("role-1"),
        );
        references
    }

    #[test]
    fn whole_references_keep_their_type() {
        let config = json!({
            "realm_id": "${keycloak_realm.main.id}",
            "roles": "${data.keycloak_role.admin.composite_roles}",
            "role": [{"id": "${data.keycloak_role.admin.id}"}],
            "enabled": true
        });
        let resolved = references()
            .resolve_config(config.as_object().unwrap())
            .unwrap();
        assert_eq!(resolved["realm_id"], json!("acme"));
        assert_eq!(resolved["roles"], json!(["c1", "c2"]));
        assert_eq!(resolved["role"][0]["id"], json!("role-1"));
        assert_eq!(resolved["enabled"], json!(true));
    }

    #[test]
    fn embedded_references_are_interpolated() {
        let config = json!({"description": "realm ${keycloak_realm.main.realm} (${keycloak_realm.main.internal_id})"});
        let resolved = references()
            .resolve_config(config.as_object().unwrap())
            .unwrap();
        assert_eq!(resolved["description"], json!("realm acme (r-1)"));
    }

    #[test]
    fn unknown_references_fail() {
        let config = json!({"realm_id": "x-${keycloak_realm.other.id}"});
        let err = references()
            .resolve_config(config.as_object().unwrap())
            .unwrap_err();
        assert_eq!(err.to_string(), "reference to unknown resource keycloak_realm.other");

        let config = json!({"realm_id": "${keycloak_realm.main.color}"});
        assert!(references()
            .resolve_config(config.as_object().unwrap())
            .is_err());
    }

    #[test]
    fn manifest_entries_have_addresses() {
        let manifest: Manifest = serde_json::from_value(json!({
            "resources": [{"type": "keycloak_realm", "name": "main", "config": {"realm": "acme"}}]
        }))
        .unwrap();
        assert!(manifest.provider.is_empty());
        assert!(manifest.contains("keycloak_realm.main"));
        assert!(!manifest.contains("keycloak_realm.other"));
    }
}
