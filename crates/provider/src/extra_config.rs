//! Free-form `extra_config` maps merged into the config of clients,
//! identity providers and their mappers.

use std::collections::BTreeMap;

use crate::{
    data::ResourceData,
    error::{ProviderError, Result},
};

pub const EXTRA_CONFIG: &str = "extra_config";

pub fn get_extra_config(data: &ResourceData) -> BTreeMap<String, String> {
    data.get_string_map(EXTRA_CONFIG)
}

/// Writes back the keys Keycloak returned that no typed attribute consumed.
/// Empty values are keys being removed and are not kept.
pub fn set_extra_config(data: &mut ResourceData, extra_config: &BTreeMap<String, String>) {
    let kept: BTreeMap<String, String> = extra_config
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    data.set_string_map(EXTRA_CONFIG, &kept);
}

/// Keys that belong to top-level attributes must be set there.
pub fn validate_extra_config(
    extra_config: &BTreeMap<String, String>,
    reserved: &[&str],
) -> Result<()> {
    match extra_config.keys().find(|k| reserved.contains(&k.as_str())) {
        Some(key) => Err(ProviderError::validation(format!(
            "extra_config key \"{key}\" is not allowed, as it conflicts with a top-level schema attribute"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reserved_keys_are_rejected() {
        let data = ResourceData::from(json!({"extra_config": {"syncMode": "FORCE", "foo": "bar"}}));
        let extra = get_extra_config(&data);
        assert!(validate_extra_config(&extra, &["clientId"]).is_ok());
        let err = validate_extra_config(&extra, &["syncMode"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: extra_config key \"syncMode\" is not allowed, as it conflicts with a top-level schema attribute"
        );
    }

    #[test]
    fn empty_values_are_not_kept() {
        let mut data = ResourceData::default();
        let extra = BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), String::new()),
        ]);
        set_extra_config(&mut data, &extra);
        let kept = get_extra_config(&data);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept["a"], "1");
    }
}
