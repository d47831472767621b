use super::{resource_server_url, AuthorizationPolicySummary, AuthorizationResource, AuthorizationScope};
use crate::{client::encode, error::Result, Keycloak};

pub const PERMISSION_TYPES: &[&str] = &["resource", "scope"];

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationPermission {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip)]
    pub realm_id: String,
    #[serde(skip)]
    pub resource_server_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub decision_strategy: String,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// `resource` or `scope`.
    #[serde(rename = "type", default)]
    pub permission_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_type: String,
}

fn permission_url(realm_id: &str, resource_server_id: &str) -> String {
    format!("{}/permission", resource_server_url(realm_id, resource_server_id))
}

impl Keycloak {
    pub async fn new_authorization_permission(&self, permission: &mut AuthorizationPermission) -> Result<()> {
        let created: AuthorizationPermission = self
            .post_json(
                &format!(
                    "{}/{}",
                    permission_url(&permission.realm_id, &permission.resource_server_id),
                    permission.permission_type
                ),
                &*permission,
            )
            .await?;
        permission.id = created.id;
        Ok(())
    }

    /// The permission body does not list its associations, so policies,
    /// resources and scopes are read from their own endpoints.
    pub async fn get_authorization_permission(
        &self,
        realm_id: &str,
        resource_server_id: &str,
        id: &str,
    ) -> Result<AuthorizationPermission> {
        let base = format!("{}/{}", permission_url(realm_id, resource_server_id), encode(id));
        let mut permission: AuthorizationPermission = self.get(&base).await?;
        permission.realm_id = realm_id.to_string();
        permission.resource_server_id = resource_server_id.to_string();

        let policies: Vec<AuthorizationPolicySummary> = self
            .get_associated_policies(realm_id, resource_server_id, id)
            .await?;
        let resources: Vec<AuthorizationResource> = self.get(&format!("{base}/resources")).await?;
        let scopes: Vec<AuthorizationScope> = self.get(&format!("{base}/scopes")).await?;

        permission.policies = policies.into_iter().map(|p| p.id).collect();
        permission.resources = resources.into_iter().map(|r| r.id).collect();
        permission.scopes = scopes.into_iter().map(|s| s.id).collect();
        Ok(permission)
    }

    pub async fn update_authorization_permission(&self, permission: &AuthorizationPermission) -> Result<()> {
        self.put(
            &format!(
                "{}/{}/{}",
                permission_url(&permission.realm_id, &permission.resource_server_id),
                permission.permission_type,
                encode(&permission.id)
            ),
            permission,
        )
        .await
    }

    pub async fn delete_authorization_permission(
        &self,
        realm_id: &str,
        resource_server_id: &str,
        id: &str,
    ) -> Result<()> {
        self.delete(&format!(
            "{}/{}",
            permission_url(realm_id, resource_server_id),
            encode(id)
        ))
        .await
    }
}
