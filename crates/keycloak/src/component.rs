use std::collections::BTreeMap;

use keycloak::types::ComponentRepresentation;

use crate::{
    client::created_id,
    error::{Error, Result},
    types::non_empty,
    Keycloak,
};

pub const USER_STORAGE_PROVIDER_TYPE: &str = "org.keycloak.storage.UserStorageProvider";
pub const LDAP_STORAGE_MAPPER_TYPE: &str = "org.keycloak.storage.ldap.mappers.LDAPStorageMapper";

/// Keycloak's pluggable provider record. User federations and their
/// mappers are all stored as components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub provider_id: String,
    pub provider_type: String,
    pub parent_id: String,
    pub config: BTreeMap<String, Vec<String>>,
}

impl From<ComponentRepresentation> for Component {
    fn from(rep: ComponentRepresentation) -> Self {
        Self {
            id: rep.id.unwrap_or_default(),
            name: rep.name.unwrap_or_default(),
            provider_id: rep.provider_id.unwrap_or_default(),
            provider_type: rep.provider_type.unwrap_or_default(),
            parent_id: rep.parent_id.unwrap_or_default(),
            config: rep.config.unwrap_or_default().into_iter().collect(),
        }
    }
}

impl From<&Component> for ComponentRepresentation {
    fn from(component: &Component) -> Self {
        Self {
            id: non_empty(&component.id),
            name: Some(component.name.clone()),
            provider_id: Some(component.provider_id.clone()),
            provider_type: Some(component.provider_type.clone()),
            parent_id: Some(component.parent_id.clone()),
            config: Some(component.config.clone().into_iter().collect()),
            ..Default::default()
        }
    }
}

impl Component {
    pub fn new(name: &str, provider_id: &str, provider_type: &str, parent_id: &str) -> Self {
        Self {
            name: name.to_string(),
            provider_id: provider_id.to_string(),
            provider_type: provider_type.to_string(),
            parent_id: parent_id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_config(mut self, key: &str, value: impl ToString) -> Self {
        self.set_config(key, value);
        self
    }

    pub fn set_config(&mut self, key: &str, value: impl ToString) {
        self.config.insert(key.to_string(), vec![value.to_string()]);
    }

    pub fn set_config_list(&mut self, key: &str, values: Vec<String>) {
        self.config.insert(key.to_string(), values);
    }

    /// First value of `key`, or an empty string.
    pub fn get_config(&self, key: &str) -> &str {
        self.get_config_ok(key).unwrap_or_default()
    }

    pub fn get_config_ok(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    pub fn get_config_list(&self, key: &str) -> &[String] {
        self.config.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Empty values read as `false`.
    pub fn get_config_bool(&self, key: &str) -> Result<bool> {
        parse_bool(self.get_config(key))
            .ok_or_else(|| Error::Other(format!("unable to parse `{key}` of component {}", self.id)))
    }

    pub fn get_config_int(&self, key: &str) -> Result<i64> {
        self.get_config(key)
            .parse()
            .map_err(|_| Error::Other(format!("unable to parse `{key}` of component {}", self.id)))
    }
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "" | "false" | "FALSE" | "False" | "0" | "f" | "F" => Some(false),
        "true" | "TRUE" | "True" | "1" | "t" | "T" => Some(true),
        _ => None,
    }
}

impl Keycloak {
    pub async fn new_component(&self, realm_id: &str, component: &Component) -> Result<String> {
        let response = self
            .call(|admin| admin.realm_components_post(realm_id, component.into()))
            .await?;
        created_id(&response, "component")
    }

    pub async fn get_component(&self, realm_id: &str, id: &str) -> Result<Component> {
        let rep = self
            .call(|admin| admin.realm_components_with_id_get(realm_id, id))
            .await?;
        Ok(rep.into())
    }

    pub async fn get_components(
        &self,
        realm_id: &str,
        parent_id: &str,
        provider_type: &str,
    ) -> Result<Vec<Component>> {
        let components = self
            .call(|admin| {
                admin.realm_components_get(
                    realm_id,
                    None,
                    Some(parent_id.to_string()),
                    Some(provider_type.to_string()),
                )
            })
            .await?;
        Ok(components.into_iter().map(Component::from).collect())
    }

    pub async fn update_component(&self, realm_id: &str, component: &Component) -> Result<()> {
        self.call(|admin| {
            admin.realm_components_with_id_put(realm_id, &component.id, component.into())
        })
        .await?;
        Ok(())
    }

    pub async fn delete_component(&self, realm_id: &str, id: &str) -> Result<()> {
        self.call(|admin| admin.realm_components_with_id_delete(realm_id, id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keycloak::types::ComponentRepresentation;

    use super::{Component, LDAP_STORAGE_MAPPER_TYPE};

    #[test]
    fn config_accessors() {
        let mut component = Component::new("mapper", "full-name-ldap-mapper", LDAP_STORAGE_MAPPER_TYPE, "p1")
            .with_config("read.only", true)
            .with_config("priority", 3);
        component.set_config_list("objectClasses", vec!["a".into(), "b".into()]);
        component.set_config("empty", "");
        assert!(component.get_config_bool("read.only").unwrap());
        assert!(!component.get_config_bool("empty").unwrap());
        assert!(!component.get_config_bool("missing").unwrap());
        assert_eq!(component.get_config_int("priority").unwrap(), 3);
        assert!(component.get_config_int("missing").is_err());
        assert_eq!(component.get_config_list("objectClasses").len(), 2);
        assert_eq!(component.get_config("missing"), "");
        assert!(component.get_config_ok("missing").is_none());
    }

    #[test]
    fn serializes_wire_shape() {
        let component = Component::new("ldap", "ldap", "type", "realm").with_config("enabled", true);
        let json = serde_json::to_value(ComponentRepresentation::from(&component)).unwrap();
        assert_eq!(json["providerId"], "ldap");
        assert_eq!(json["parentId"], "realm");
        assert_eq!(json["config"]["enabled"][0], "true");
        assert!(json.get("id").is_none());
    }
}
