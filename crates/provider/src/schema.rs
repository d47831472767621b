//! Attribute schemas of resources, data sources and the provider itself.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{
    error::{ProviderError, Result},
    validation::Validator,
};

#[derive(Debug, Clone)]
pub enum ValueType {
    String,
    Bool,
    Int,
    List(Box<ValueType>),
    Set(Box<ValueType>),
    Map(Box<ValueType>),
    /// Nested block with its own attributes.
    Block(Box<Schema>),
}

impl ValueType {
    fn describe(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::List(_) => "list",
            ValueType::Set(_) => "set",
            ValueType::Map(_) => "map",
            ValueType::Block(_) => "block",
        }
    }

    fn check(&self, path: &str, value: &Value, errors: &mut Vec<String>) {
        let matches = match (self, value) {
            (_, Value::Null) => true,
            (ValueType::String, Value::String(_)) => true,
            (ValueType::Bool, Value::Bool(_)) => true,
            (ValueType::Int, Value::Number(n)) => n.is_i64(),
            (ValueType::List(elem) | ValueType::Set(elem), Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    elem.check(&format!("{path}.{i}"), item, errors);
                }
                true
            }
            (ValueType::Map(elem), Value::Object(entries)) => {
                for (key, item) in entries {
                    elem.check(&format!("{path}.{key}"), item, errors);
                }
                true
            }
            (ValueType::Block(schema), Value::Object(attributes)) => {
                schema.collect_errors(path, attributes, errors);
                true
            }
            _ => false,
        };
        if !matches {
            errors.push(format!("{path}: expected {}", self.describe()));
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub value_type: ValueType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    pub sensitive: bool,
    pub default: Option<Value>,
    pub min_items: usize,
    pub description: &'static str,
    pub conflicts_with: Vec<&'static str>,
    pub validators: Vec<Validator>,
}

impl Attribute {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            min_items: 0,
            description: "",
            conflicts_with: Vec::new(),
            validators: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(ValueType::String)
    }

    pub fn bool() -> Self {
        Self::new(ValueType::Bool)
    }

    pub fn int() -> Self {
        Self::new(ValueType::Int)
    }

    pub fn string_list() -> Self {
        Self::new(ValueType::List(Box::new(ValueType::String)))
    }

    pub fn string_set() -> Self {
        Self::new(ValueType::Set(Box::new(ValueType::String)))
    }

    pub fn string_map() -> Self {
        Self::new(ValueType::Map(Box::new(ValueType::String)))
    }

    pub fn block_set(schema: Schema) -> Self {
        Self::new(ValueType::Set(Box::new(ValueType::Block(Box::new(schema)))))
    }

    pub fn block_list(schema: Schema) -> Self {
        Self::new(ValueType::List(Box::new(ValueType::Block(Box::new(schema)))))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.optional = true;
        self.default = Some(value.into());
        self
    }

    pub fn min_items(mut self, min_items: usize) -> Self {
        self.min_items = min_items;
        self
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn conflicts_with(mut self, names: &[&'static str]) -> Self {
        self.conflicts_with.extend_from_slice(names);
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Schema of a nested block attribute.
    pub fn block_schema(&self) -> Option<&Schema> {
        let (ValueType::List(elem) | ValueType::Set(elem)) = &self.value_type else {
            return None;
        };
        match elem.as_ref() {
            ValueType::Block(schema) => Some(&**schema),
            _ => None,
        }
    }

    /// Attributes only the provider writes.
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// Attribute name to [`Attribute`], sorted by name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    attributes: BTreeMap<&'static str, Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Attribute)> {
        self.attributes.iter().map(|(k, v)| (*k, v))
    }

    /// Data source view of a resource schema: the `lookup` attributes keep
    /// their requiredness and validators, all others become read-only.
    pub fn lookup_by(&self, lookup: &[&'static str]) -> Schema {
        let attributes = self
            .attributes
            .iter()
            .map(|(name, attribute)| {
                let attribute = if lookup.contains(name) {
                    Attribute {
                        force_new: false,
                        default: None,
                        conflicts_with: Vec::new(),
                        ..attribute.clone()
                    }
                } else {
                    Attribute::new(attribute.value_type.clone()).computed()
                };
                (*name, attribute)
            })
            .collect();
        Schema { attributes }
    }

    /// Names of attributes whose change replaces the resource.
    pub fn force_new_attributes(&self) -> Vec<&'static str> {
        self.iter()
            .filter(|(_, a)| a.force_new)
            .map(|(name, _)| name)
            .collect()
    }

    /// Fills absent attributes that declare a default, recursing into
    /// nested blocks.
    pub fn apply_defaults(&self, attributes: &mut Map<String, Value>) {
        for (name, attribute) in &self.attributes {
            if attributes.get(*name).is_none_or(Value::is_null) {
                if let Some(default) = &attribute.default {
                    attributes.insert(name.to_string(), default.clone());
                }
                continue;
            }
            let Some(schema) = attribute.block_schema() else {
                continue;
            };
            if let Some(Value::Array(items)) = attributes.get_mut(*name) {
                for item in items.iter_mut() {
                    if let Value::Object(item) = item {
                        schema.apply_defaults(item);
                    }
                }
            }
        }
    }

    /// Checks a configuration before any API call: unknown and read-only
    /// attributes, missing required ones, types, item counts, conflicts and
    /// validators. All problems are reported at once.
    pub fn validate(&self, attributes: &Map<String, Value>) -> Result<()> {
        let mut errors = Vec::new();
        self.collect_errors("", attributes, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Validation(errors.join("; ")))
        }
    }

    fn collect_errors(&self, prefix: &str, attributes: &Map<String, Value>, errors: &mut Vec<String>) {
        let path = |name: &str| {
            if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}.{name}")
            }
        };
        for (name, value) in attributes {
            match self.attributes.get(name.as_str()) {
                None => errors.push(format!("{}: unsupported argument", path(name))),
                Some(attribute) if attribute.is_read_only() && !value.is_null() => {
                    errors.push(format!("{}: computed attribute cannot be set", path(name)))
                }
                Some(_) => {}
            }
        }
        for (name, attribute) in &self.attributes {
            let value = attributes.get(*name).filter(|v| !v.is_null());
            let Some(value) = value else {
                if attribute.required {
                    errors.push(format!("{}: required attribute is missing", path(name)));
                }
                continue;
            };
            attribute.value_type.check(&path(name), value, errors);
            if let Value::Array(items) = value {
                if items.len() < attribute.min_items {
                    errors.push(format!(
                        "{}: at least {} item(s) required",
                        path(name),
                        attribute.min_items
                    ));
                }
            }
            for other in &attribute.conflicts_with {
                if attributes.get(*other).is_some_and(|v| !v.is_null()) {
                    errors.push(format!(
                        "{}: conflicts with {}",
                        path(name),
                        path(other)
                    ));
                }
            }
            for validator in &attribute.validators {
                let result = match (&attribute.value_type, value) {
                    (ValueType::List(_) | ValueType::Set(_), Value::Array(items)) => items
                        .iter()
                        .try_for_each(|item| validator.check(&path(name), item)),
                    _ => validator.check(&path(name), value),
                };
                if let Err(err) = result {
                    errors.push(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Attribute, Schema};
    use crate::validation::Validator;

    fn schema() -> Schema {
        Schema::new()
            .attr("realm", Attribute::string().required().force_new())
            .attr("enabled", Attribute::bool().default(true))
            .attr("mode", Attribute::string().optional().validate(Validator::string_in_slice(&["A", "B"])))
            .attr("uris", Attribute::string_set().optional().min_items(1))
            .attr("secret", Attribute::string().optional().conflicts_with(&["public"]))
            .attr("public", Attribute::bool().optional())
            .attr("path", Attribute::string().computed())
            .attr(
                "roles",
                Attribute::block_set(
                    Schema::new()
                        .attr("id", Attribute::string().required())
                        .attr("required", Attribute::bool().default(false)),
                )
                .optional(),
            )
    }

    #[test]
    fn defaults_fill_absent_attributes() {
        let mut config = json!({"realm": "test", "roles": [{"id": "r1"}]})
            .as_object()
            .cloned()
            .unwrap();
        schema().apply_defaults(&mut config);
        assert_eq!(config["enabled"], json!(true));
        assert_eq!(config["roles"][0]["required"], json!(false));
        assert!(!config.contains_key("mode"));
        assert!(schema().validate(&config).is_ok());
    }

    #[test]
    fn validation_reports_every_problem() {
        let config = json!({
            "enabled": "yes",
            "mode": "C",
            "uris": [],
            "secret": "s",
            "public": true,
            "path": "/x",
            "color": "red",
            "roles": [{"required": true}]
        });
        let err = schema()
            .validate(config.as_object().unwrap())
            .unwrap_err()
            .to_string();
        assert!(err.starts_with("validation error: "));
        for expected in [
            "realm: required attribute is missing",
            "enabled: expected bool",
            "expected mode to be one of",
            "uris: at least 1 item(s) required",
            "secret: conflicts with public",
            "path: computed attribute cannot be set",
            "color: unsupported argument",
            "roles.0.id: required attribute is missing",
        ] {
            assert!(err.contains(expected), "{expected} missing in {err}");
        }
    }

    #[test]
    fn force_new_attributes_are_listed() {
        assert_eq!(schema().force_new_attributes(), vec!["realm"]);
    }

    #[test]
    fn lookup_schema_reads_everything_else_back() {
        let schema = schema().lookup_by(&["realm"]);
        assert!(schema.force_new_attributes().is_empty());
        assert!(schema.get("realm").unwrap().required);
        assert!(schema.get("enabled").unwrap().is_read_only());
        assert!(schema
            .validate(json!({"realm": "test"}).as_object().unwrap())
            .is_ok());
        assert!(schema
            .validate(json!({"realm": "test", "enabled": true}).as_object().unwrap())
            .is_err());
    }
}
