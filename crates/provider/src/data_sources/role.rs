use kcp_keycloak::Keycloak;

use crate::{
    data::ResourceData,
    error::Result,
    resource::DataSource,
    resources::role::{role_schema, set_role_data},
    schema::Schema,
};

/// Realm role by name, or client role when `client_id` is set.
pub struct RoleDataSource;

#[async_trait::async_trait]
impl DataSource for RoleDataSource {
    fn schema(&self) -> Schema {
        role_schema().lookup_by(&["realm_id", "client_id", "name"])
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let role = keycloak
            .get_role_by_name(
                data.get_str("realm_id"),
                data.get_str("client_id"),
                data.get_str("name"),
            )
            .await?;
        set_role_data(keycloak, data, &role).await
    }
}
