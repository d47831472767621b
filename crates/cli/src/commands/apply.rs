//! # apply command
//!
//! Reads the manifest's data sources, then creates, updates or replaces its
//! resources in order. Resources in state that left the manifest are
//! destroyed last, newest first.
//!

use kcp::provider::{Provider, ResourceData};
use serde_json::{Map, Value};

use crate::{
    commands::{ApplyCommand, Opts},
    manifest::{ManifestEntry, References},
    state::State,
};

/// Whether a planned configuration differs from the last known state on
/// any attribute it sets.
fn is_changed(current: &ResourceData, planned: &Map<String, Value>) -> bool {
    planned
        .iter()
        .any(|(name, value)| !value.is_null() && current.get(name) != Some(value))
}

async fn apply_resource(
    provider: &Provider,
    entry: &ManifestEntry,
    current: Option<&ResourceData>,
    config: &Map<String, Value>,
) -> anyhow::Result<ResourceData> {
    let address = entry.address();
    let type_name = entry.type_name.as_str();
    let Some(current) = current else {
        tracing::info!("creating {address}");
        return Ok(provider.create(type_name, config).await?);
    };
    let planned = provider.plan(type_name, config)?;
    if provider.requires_replacement(type_name, current, &planned)? {
        tracing::info!("replacing {address}");
        provider.delete(type_name, current.clone()).await?;
        return Ok(provider.create(type_name, config).await?);
    }
    if is_changed(current, &planned) {
        tracing::info!("updating {address}");
        return Ok(provider.update(type_name, current.clone(), config).await?);
    }
    tracing::info!("{address} is up to date");
    Ok(current.clone())
}

impl ApplyCommand {
    pub async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let manifest = opts.manifest()?;
        let provider = opts.provider(&manifest).await?;
        let mut state = State::load(&opts.state)?;
        let mut references = References::default();
        for entry in &state.resources {
            references.insert(entry.address(), entry.data.clone());
        }

        for entry in &manifest.data {
            let config = references.resolve_config(&entry.config)?;
            tracing::info!("reading data.{}", entry.address());
            let data = provider.read_data_source(&entry.type_name, &config).await?;
            references.insert(format!("data.{}", entry.address()), data);
        }

        for entry in &manifest.resources {
            let address = entry.address();
            let config = references.resolve_config(&entry.config)?;
            let current = state.get(&address).map(|e| e.data.clone());
            let data = apply_resource(&provider, entry, current.as_ref(), &config).await?;
            references.insert(address, data.clone());
            state.upsert(&entry.type_name, &entry.name, data);
            state.save(&opts.state)?;
        }

        let orphans: Vec<_> = state
            .resources
            .iter()
            .rev()
            .filter(|entry| !manifest.contains(&entry.address()))
            .cloned()
            .collect();
        for orphan in orphans {
            let address = orphan.address();
            tracing::info!("destroying {address}, it is no longer in the manifest");
            provider.delete(&orphan.type_name, orphan.data).await?;
            state.remove(&address);
            state.save(&opts.state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::is_changed;
    use kcp::provider::ResourceData;

    #[test]
    fn only_configured_attributes_are_compared() {
        let current = ResourceData::from(json!({
            "realm_id": "test",
            "name": "dev",
            "path": "/dev"
        }))
        .with_id("g1");
        let planned = json!({"realm_id": "test", "name": "dev", "parent_id": null});
        assert!(!is_changed(&current, planned.as_object().unwrap()));
        let planned = json!({"realm_id": "test", "name": "ops"});
        assert!(is_changed(&current, planned.as_object().unwrap()));
    }
}
