use kcp_keycloak::Keycloak;

use crate::{
    data::ResourceData,
    error::Result,
    resource::DataSource,
    resources::realm::{realm_schema, set_realm_data},
    schema::Schema,
};

pub struct RealmDataSource;

#[async_trait::async_trait]
impl DataSource for RealmDataSource {
    fn schema(&self) -> Schema {
        realm_schema().lookup_by(&["realm"])
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let realm = keycloak.get_realm(data.get_str("realm")).await?;
        set_realm_data(data, &realm)
    }
}
