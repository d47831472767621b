use super::resource_server_url;
use crate::{
    client::{encode, Attributes},
    error::Result,
    Keycloak,
};

/// Scope as embedded in a resource; Keycloak matches it by name.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ResourceScope {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationResource {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip)]
    pub realm_id: String,
    #[serde(skip)]
    pub resource_server_id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub uris: Vec<String>,
    #[serde(rename = "icon_uri", default)]
    pub icon_uri: String,
    #[serde(default)]
    pub owner_managed_access: bool,
    #[serde(default)]
    pub scopes: Vec<ResourceScope>,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl AuthorizationResource {
    pub fn scope_names(&self) -> Vec<String> {
        self.scopes.iter().map(|s| s.name.clone()).collect()
    }

    pub fn set_scope_names(&mut self, names: &[String]) {
        self.scopes = names
            .iter()
            .map(|name| ResourceScope {
                id: String::new(),
                name: name.clone(),
            })
            .collect();
    }

    fn with_scope(mut self, realm_id: &str, resource_server_id: &str) -> Self {
        self.realm_id = realm_id.to_string();
        self.resource_server_id = resource_server_id.to_string();
        self
    }
}

fn resource_url(realm_id: &str, resource_server_id: &str) -> String {
    format!("{}/resource", resource_server_url(realm_id, resource_server_id))
}

impl Keycloak {
    pub async fn new_authorization_resource(&self, resource: &mut AuthorizationResource) -> Result<()> {
        let created: AuthorizationResource = self
            .post_json(
                &resource_url(&resource.realm_id, &resource.resource_server_id),
                &*resource,
            )
            .await?;
        resource.id = created.id;
        Ok(())
    }

    pub async fn get_authorization_resource(
        &self,
        realm_id: &str,
        resource_server_id: &str,
        id: &str,
    ) -> Result<AuthorizationResource> {
        let resource: AuthorizationResource = self
            .get(&format!(
                "{}/{}",
                resource_url(realm_id, resource_server_id),
                encode(id)
            ))
            .await?;
        Ok(resource.with_scope(realm_id, resource_server_id))
    }

    /// Exact name match; `None` when the resource server has no such resource.
    pub async fn get_authorization_resource_by_name(
        &self,
        realm_id: &str,
        resource_server_id: &str,
        name: &str,
    ) -> Result<Option<AuthorizationResource>> {
        let resources: Vec<AuthorizationResource> = self
            .get_with_query(
                &resource_url(realm_id, resource_server_id),
                &[("name", name.to_string())],
            )
            .await?;
        Ok(resources
            .into_iter()
            .find(|r| r.name == name)
            .map(|r| r.with_scope(realm_id, resource_server_id)))
    }

    pub async fn update_authorization_resource(&self, resource: &AuthorizationResource) -> Result<()> {
        self.put(
            &format!(
                "{}/{}",
                resource_url(&resource.realm_id, &resource.resource_server_id),
                encode(&resource.id)
            ),
            resource,
        )
        .await
    }

    pub async fn delete_authorization_resource(
        &self,
        realm_id: &str,
        resource_server_id: &str,
        id: &str,
    ) -> Result<()> {
        self.delete(&format!(
            "{}/{}",
            resource_url(realm_id, resource_server_id),
            encode(id)
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::AuthorizationResource;

    #[test]
    fn resource_wire_shape() {
        let mut resource = AuthorizationResource {
            name: "docs".into(),
            resource_type: "urn:app:docs".into(),
            ..Default::default()
        };
        resource.set_scope_names(&["read".into(), "write".into()]);
        let json = serde_json::to_value(&resource).unwrap();
        assert!(json.get("_id").is_none());
        assert_eq!(json["type"], "urn:app:docs");
        assert_eq!(json["scopes"][1]["name"], "write");

        let read: AuthorizationResource = serde_json::from_value(serde_json::json!({
            "_id": "r1",
            "name": "docs",
            "scopes": [{"id": "s1", "name": "read"}]
        }))
        .unwrap();
        assert_eq!(read.id, "r1");
        assert_eq!(read.scope_names(), vec!["read".to_string()]);
    }
}
