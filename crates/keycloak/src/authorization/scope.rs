use super::resource_server_url;
use crate::{client::encode, error::Result, Keycloak};

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationScope {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip)]
    pub realm_id: String,
    #[serde(skip)]
    pub resource_server_id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub icon_uri: String,
}

fn scope_url(realm_id: &str, resource_server_id: &str) -> String {
    format!("{}/scope", resource_server_url(realm_id, resource_server_id))
}

impl Keycloak {
    pub async fn new_authorization_scope(&self, scope: &mut AuthorizationScope) -> Result<()> {
        let created: AuthorizationScope = self
            .post_json(&scope_url(&scope.realm_id, &scope.resource_server_id), &*scope)
            .await?;
        scope.id = created.id;
        Ok(())
    }

    pub async fn get_authorization_scope(
        &self,
        realm_id: &str,
        resource_server_id: &str,
        id: &str,
    ) -> Result<AuthorizationScope> {
        let mut scope: AuthorizationScope = self
            .get(&format!("{}/{}", scope_url(realm_id, resource_server_id), encode(id)))
            .await?;
        scope.realm_id = realm_id.to_string();
        scope.resource_server_id = resource_server_id.to_string();
        Ok(scope)
    }

    pub async fn update_authorization_scope(&self, scope: &AuthorizationScope) -> Result<()> {
        self.put(
            &format!(
                "{}/{}",
                scope_url(&scope.realm_id, &scope.resource_server_id),
                encode(&scope.id)
            ),
            scope,
        )
        .await
    }

    pub async fn delete_authorization_scope(
        &self,
        realm_id: &str,
        resource_server_id: &str,
        id: &str,
    ) -> Result<()> {
        self.delete(&format!("{}/{}", scope_url(realm_id, resource_server_id), encode(id)))
            .await
    }
}
