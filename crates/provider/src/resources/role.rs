use kcp_keycloak::{expand_attributes, flatten_attributes, role::Role, Keycloak};

use crate::{
    data::ResourceData,
    error::Result,
    import::parse_realm_scoped_import_id,
    resource::Resource,
    schema::{Attribute, Schema},
};

pub(crate) fn role_schema() -> Schema {
    Schema::new()
        .attr("realm_id", Attribute::string().required().force_new())
        .attr("client_id", Attribute::string().optional().force_new())
        .attr("name", Attribute::string().required())
        .attr("description", Attribute::string().optional())
        .attr("composite_roles", Attribute::string_set().optional())
        .attr("attributes", Attribute::string_map().optional())
}

fn get_role_from_data(data: &ResourceData) -> Role {
    Role {
        id: data.id().to_string(),
        realm_id: data.get_string("realm_id"),
        client_id: data.get_string("client_id"),
        name: data.get_string("name"),
        description: data.get_string("description"),
        attributes: expand_attributes(&data.get_string_map("attributes")),
        ..Default::default()
    }
}

pub(crate) async fn set_role_data(
    keycloak: &Keycloak,
    data: &mut ResourceData,
    role: &Role,
) -> Result<()> {
    let composites = if role.composite {
        keycloak
            .get_role_composites(role)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect()
    } else {
        Vec::new()
    };
    data.set_id(&role.id);
    data.set("realm_id", role.realm_id.as_str());
    data.set("client_id", role.client_id.as_str());
    data.set("name", role.name.as_str());
    data.set("description", role.description.as_str());
    data.set("composite_roles", composites);
    data.set_string_map("attributes", &flatten_attributes(&role.attributes));
    Ok(())
}

pub struct RoleResource;

#[async_trait::async_trait]
impl Resource for RoleResource {
    fn schema(&self) -> Schema {
        role_schema()
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mut role = get_role_from_data(data);
        keycloak.new_role(&mut role).await?;
        keycloak
            .add_composites_to_role(&role, &data.get_string_list("composite_roles"))
            .await?;
        data.set_id(&role.id);
        Ok(())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let role = keycloak
            .get_role(data.get_str("realm_id"), data.id())
            .await?;
        set_role_data(keycloak, data, &role).await
    }

    /// Composites are diffed against the server: missing ones are added,
    /// unlisted ones removed.
    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let role = get_role_from_data(data);
        keycloak.update_role(&role).await?;

        let desired = data.get_string_list("composite_roles");
        let current: Vec<String> = keycloak
            .get_role_composites(&role)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        let to_add: Vec<String> = desired
            .iter()
            .filter(|id| !current.contains(id))
            .cloned()
            .collect();
        let to_remove: Vec<String> = current
            .iter()
            .filter(|id| !desired.contains(id))
            .cloned()
            .collect();
        keycloak.add_composites_to_role(&role, &to_add).await?;
        keycloak.remove_composites_from_role(&role, &to_remove).await?;
        Ok(())
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak
            .delete_role(data.get_str("realm_id"), data.id())
            .await?)
    }

    async fn import(&self, keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        let id = parse_realm_scoped_import_id(import_id, keycloak.default_realm())?;
        let mut data = ResourceData::default().with_id(id.id);
        data.set("realm_id", id.realm);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn client_roles_keep_their_client() {
        let data = ResourceData::from(json!({
            "realm_id": "test",
            "client_id": "c-1",
            "name": "viewer",
            "attributes": {"tags": "a##b"}
        }));
        let role = get_role_from_data(&data);
        assert_eq!(role.client_id, "c-1");
        assert_eq!(role.attributes["tags"], vec!["a", "b"]);
    }
}
