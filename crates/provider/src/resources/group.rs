use kcp_keycloak::{expand_attributes, flatten_attributes, group::Group, Keycloak};

use crate::{
    data::ResourceData,
    error::Result,
    import::parse_realm_scoped_import_id,
    resource::Resource,
    schema::{Attribute, Schema},
};

pub(crate) fn group_schema() -> Schema {
    Schema::new()
        .attr("realm_id", Attribute::string().required().force_new())
        .attr("parent_id", Attribute::string().optional().force_new())
        .attr("name", Attribute::string().required())
        .attr("path", Attribute::string().computed())
        .attr("attributes", Attribute::string_map().optional())
}

fn get_group_from_data(data: &ResourceData) -> Group {
    Group {
        id: data.id().to_string(),
        realm_id: data.get_string("realm_id"),
        parent_id: data.get_string("parent_id"),
        name: data.get_string("name"),
        attributes: expand_attributes(&data.get_string_map("attributes")),
        ..Default::default()
    }
}

pub(crate) fn set_group_data(data: &mut ResourceData, group: &Group) {
    data.set_id(&group.id);
    data.set("realm_id", group.realm_id.as_str());
    data.set("name", group.name.as_str());
    data.set("path", group.path.as_str());
    data.set_string_map("attributes", &flatten_attributes(&group.attributes));
    if !group.parent_id.is_empty() {
        data.set("parent_id", group.parent_id.as_str());
    }
}

pub struct GroupResource;

#[async_trait::async_trait]
impl Resource for GroupResource {
    fn schema(&self) -> Schema {
        group_schema()
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mut group = get_group_from_data(data);
        keycloak.new_group(&mut group).await?;
        data.set_id(&group.id);
        Ok(())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let group = keycloak
            .get_group(data.get_str("realm_id"), data.id())
            .await?;
        set_group_data(data, &group);
        Ok(())
    }

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let group = get_group_from_data(data);
        Ok(keycloak.update_group(&group).await?)
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak
            .delete_group(data.get_str("realm_id"), data.id())
            .await?)
    }

    async fn import(&self, keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        let id = parse_realm_scoped_import_id(import_id, keycloak.default_realm())?;
        let mut data = ResourceData::default().with_id(id.id);
        data.set("realm_id", id.realm);
        Ok(data)
    }
}
