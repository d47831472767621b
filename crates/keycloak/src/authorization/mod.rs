//! Fine grained authorization of an OIDC client: the resource server
//! settings and the resources, scopes, policies and permissions it owns.
//!
//! Objects created here get their id from the response body, not from a
//! `Location` header.

mod permission;
mod policy;
mod resource;
mod scope;

pub use permission::{AuthorizationPermission, PERMISSION_TYPES};
pub use policy::{
    AggregatePolicy, AuthorizationGroup, AuthorizationPolicy, AuthorizationPolicySummary, ClientPolicy,
    GroupPolicy, RolePolicy, RolePolicyRole, TimePolicy,
};
pub use resource::AuthorizationResource;
pub use scope::AuthorizationScope;

use crate::{client::encode, error::Result, Keycloak};

pub const DECISION_STRATEGIES: &[&str] = &["UNANIMOUS", "AFFIRMATIVE", "CONSENSUS"];
pub const LOGICS: &[&str] = &["POSITIVE", "NEGATIVE"];
pub const POLICY_ENFORCEMENT_MODES: &[&str] = &["ENFORCING", "PERMISSIVE", "DISABLED"];

/// `/realms/{realm}/clients/{id}/authz/resource-server`
pub(crate) fn resource_server_url(realm_id: &str, resource_server_id: &str) -> String {
    format!(
        "/realms/{}/clients/{}/authz/resource-server",
        encode(realm_id),
        encode(resource_server_id)
    )
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceServer {
    #[serde(skip)]
    pub realm_id: String,
    /// Internal id of the client.
    #[serde(skip)]
    pub client_id: String,
    #[serde(default)]
    pub policy_enforcement_mode: String,
    #[serde(default)]
    pub decision_strategy: String,
    #[serde(default)]
    pub allow_remote_resource_management: bool,
}

impl Keycloak {
    pub async fn get_resource_server(&self, realm_id: &str, client_id: &str) -> Result<ResourceServer> {
        let mut server: ResourceServer = self.get(&resource_server_url(realm_id, client_id)).await?;
        server.realm_id = realm_id.to_string();
        server.client_id = client_id.to_string();
        Ok(server)
    }

    pub async fn update_resource_server(&self, server: &ResourceServer) -> Result<()> {
        self.put(&resource_server_url(&server.realm_id, &server.client_id), server)
            .await
    }
}
