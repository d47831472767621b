use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Attribute bag of one resource instance: its id plus the attribute values
/// as JSON. An empty id means the instance is gone and must be dropped from
/// state.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ResourceData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    attributes: Map<String, Value>,
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl ResourceData {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self {
            id: String::new(),
            attributes,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn is_removed(&self) -> bool {
        self.id.is_empty()
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.attributes
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    /// Like [`ResourceData::get`], but zero values (`""`, `false`, `0`,
    /// empty lists and maps) count as unset.
    pub fn get_ok(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !is_zero(v))
    }

    pub fn get_str(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get_str(key).to_string()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or_default()
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.get(key).and_then(Value::as_i64).unwrap_or_default()
    }

    pub fn get_list(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.get_list(key).iter().map(value_to_string).collect()
    }

    pub fn get_string_map(&self, key: &str) -> BTreeMap<String, String> {
        self.get(key)
            .and_then(Value::as_object)
            .map(|o| {
                o.iter()
                    .map(|(k, v)| (k.clone(), value_to_string(v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn set_string_map(&mut self, key: &str, map: &BTreeMap<String, String>) {
        let map: Map<String, Value> = map
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        self.set(key, map);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    /// Takes every attribute of `config` over, keeping computed values the
    /// configuration does not mention.
    pub fn merge(&mut self, config: &Map<String, Value>) {
        for (key, value) in config {
            self.attributes.insert(key.clone(), value.clone());
        }
    }
}

impl From<Value> for ResourceData {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(attributes) => Self::new(attributes),
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ResourceData;

    #[test]
    fn typed_getters() {
        let data = ResourceData::from(json!({
            "realm": "test",
            "enabled": true,
            "priority": 3,
            "uris": ["/a", "/b"],
            "attributes": {"k": "v", "n": 1},
            "description": "",
            "parent": null
        }));
        assert_eq!(data.get_str("realm"), "test");
        assert!(data.get_bool("enabled"));
        assert_eq!(data.get_int("priority"), 3);
        assert_eq!(data.get_string_list("uris"), vec!["/a", "/b"]);
        let attributes = data.get_string_map("attributes");
        assert_eq!(attributes["k"], "v");
        assert_eq!(attributes["n"], "1");
        assert_eq!(data.get_str("missing"), "");
        assert!(data.get("description").is_some());
        assert!(data.get_ok("description").is_none());
        assert!(data.get("parent").is_none());
    }

    #[test]
    fn empty_id_means_removed() {
        let mut data = ResourceData::default().with_id("abc");
        assert!(!data.is_removed());
        data.set_id("");
        assert!(data.is_removed());
    }
}
