use kcp_keycloak::Keycloak;

use crate::{
    data::ResourceData,
    error::Result,
    resource::DataSource,
    resources::openid_client::{openid_client_schema, set_openid_client_data},
    schema::Schema,
};

pub struct OpenidClientDataSource;

#[async_trait::async_trait]
impl DataSource for OpenidClientDataSource {
    fn schema(&self) -> Schema {
        openid_client_schema().lookup_by(&["realm_id", "client_id"])
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let client = keycloak
            .get_openid_client_by_client_id(data.get_str("realm_id"), data.get_str("client_id"))
            .await?;
        set_openid_client_data(keycloak, data, &client).await
    }
}
