use kcp_keycloak::Keycloak;

use crate::{
    data::ResourceData,
    error::Result,
    resource::DataSource,
    resources::group::{group_schema, set_group_data},
    schema::Schema,
};

pub struct GroupDataSource;

#[async_trait::async_trait]
impl DataSource for GroupDataSource {
    fn schema(&self) -> Schema {
        group_schema().lookup_by(&["realm_id", "name"])
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let group = keycloak
            .get_group_by_name(data.get_str("realm_id"), data.get_str("name"))
            .await?;
        set_group_data(data, &group);
        Ok(())
    }
}
