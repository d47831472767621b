//! Resources and scopes of a client's resource server, and the permissions
//! tying them to policies.

use kcp_keycloak::{
    authorization::{
        AuthorizationPermission, AuthorizationResource, AuthorizationScope, DECISION_STRATEGIES,
        PERMISSION_TYPES,
    },
    expand_attributes, flatten_attributes, Keycloak,
};

use crate::{
    data::ResourceData,
    error::Result,
    import::{parse_three_part_import_id, MapperImportId},
    resource::Resource,
    schema::{Attribute, Schema},
    validation::Validator,
};

/// Realm and resource server every authorization object is scoped to.
pub(crate) fn resource_server_schema() -> Schema {
    Schema::new()
        .attr("resource_server_id", Attribute::string().required().force_new())
        .attr("realm_id", Attribute::string().required().force_new())
}

pub(crate) fn import_authorization_object(import_id: &str, kind: &str) -> Result<ResourceData> {
    let formats = format!("{{{{realm}}}}/{{{{resourceServerId}}}}/{{{{{kind}Id}}}}");
    let MapperImportId { realm, parent_id, id } = parse_three_part_import_id(import_id, &formats)?;
    let mut data = ResourceData::default().with_id(id);
    data.set("realm_id", realm);
    data.set("resource_server_id", parent_id);
    Ok(data)
}

pub struct AuthorizationResourceResource;

fn get_authorization_resource_from_data(data: &ResourceData) -> AuthorizationResource {
    let mut resource = AuthorizationResource {
        id: data.id().to_string(),
        realm_id: data.get_string("realm_id"),
        resource_server_id: data.get_string("resource_server_id"),
        name: data.get_string("name"),
        display_name: data.get_string("display_name"),
        uris: data.get_string_list("uris"),
        icon_uri: data.get_string("icon_uri"),
        owner_managed_access: data.get_bool("owner_managed_access"),
        resource_type: data.get_string("type"),
        attributes: expand_attributes(&data.get_string_map("attributes")),
        ..Default::default()
    };
    resource.set_scope_names(&data.get_string_list("scopes"));
    resource
}

fn set_authorization_resource_data(data: &mut ResourceData, resource: &AuthorizationResource) {
    data.set_id(&resource.id);
    data.set("realm_id", resource.realm_id.as_str());
    data.set("resource_server_id", resource.resource_server_id.as_str());
    data.set("name", resource.name.as_str());
    data.set("display_name", resource.display_name.as_str());
    data.set("uris", resource.uris.clone());
    data.set("icon_uri", resource.icon_uri.as_str());
    data.set("owner_managed_access", resource.owner_managed_access);
    data.set("scopes", resource.scope_names());
    data.set("type", resource.resource_type.as_str());
    data.set_string_map("attributes", &flatten_attributes(&resource.attributes));
}

#[async_trait::async_trait]
impl Resource for AuthorizationResourceResource {
    fn schema(&self) -> Schema {
        resource_server_schema()
            .attr("name", Attribute::string().required())
            .attr("display_name", Attribute::string().optional())
            .attr("uris", Attribute::string_set().optional())
            .attr("icon_uri", Attribute::string().optional())
            .attr("owner_managed_access", Attribute::bool().default(false))
            .attr("scopes", Attribute::string_set().optional())
            .attr("type", Attribute::string().optional())
            .attr("attributes", Attribute::string_map().optional())
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mut resource = get_authorization_resource_from_data(data);
        keycloak.new_authorization_resource(&mut resource).await?;
        data.set_id(&resource.id);
        Ok(())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let resource = keycloak
            .get_authorization_resource(
                data.get_str("realm_id"),
                data.get_str("resource_server_id"),
                data.id(),
            )
            .await?;
        set_authorization_resource_data(data, &resource);
        Ok(())
    }

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let resource = get_authorization_resource_from_data(data);
        keycloak.update_authorization_resource(&resource).await?;
        set_authorization_resource_data(data, &resource);
        Ok(())
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak
            .delete_authorization_resource(
                data.get_str("realm_id"),
                data.get_str("resource_server_id"),
                data.id(),
            )
            .await?)
    }

    async fn import(&self, _keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        import_authorization_object(import_id, "authorizationResource")
    }
}

pub struct AuthorizationScopeResource;

fn get_authorization_scope_from_data(data: &ResourceData) -> AuthorizationScope {
    AuthorizationScope {
        id: data.id().to_string(),
        realm_id: data.get_string("realm_id"),
        resource_server_id: data.get_string("resource_server_id"),
        name: data.get_string("name"),
        display_name: data.get_string("display_name"),
        icon_uri: data.get_string("icon_uri"),
    }
}

fn set_authorization_scope_data(data: &mut ResourceData, scope: &AuthorizationScope) {
    data.set_id(&scope.id);
    data.set("realm_id", scope.realm_id.as_str());
    data.set("resource_server_id", scope.resource_server_id.as_str());
    data.set("name", scope.name.as_str());
    data.set("display_name", scope.display_name.as_str());
    data.set("icon_uri", scope.icon_uri.as_str());
}

#[async_trait::async_trait]
impl Resource for AuthorizationScopeResource {
    fn schema(&self) -> Schema {
        resource_server_schema()
            .attr("name", Attribute::string().required())
            .attr("display_name", Attribute::string().optional())
            .attr("icon_uri", Attribute::string().optional())
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mut scope = get_authorization_scope_from_data(data);
        keycloak.new_authorization_scope(&mut scope).await?;
        data.set_id(&scope.id);
        Ok(())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let scope = keycloak
            .get_authorization_scope(
                data.get_str("realm_id"),
                data.get_str("resource_server_id"),
                data.id(),
            )
            .await?;
        set_authorization_scope_data(data, &scope);
        Ok(())
    }

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let scope = get_authorization_scope_from_data(data);
        keycloak.update_authorization_scope(&scope).await?;
        set_authorization_scope_data(data, &scope);
        Ok(())
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak
            .delete_authorization_scope(
                data.get_str("realm_id"),
                data.get_str("resource_server_id"),
                data.id(),
            )
            .await?)
    }

    async fn import(&self, _keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        import_authorization_object(import_id, "authorizationScope")
    }
}

pub struct AuthorizationPermissionResource;

fn get_authorization_permission_from_data(data: &ResourceData) -> AuthorizationPermission {
    AuthorizationPermission {
        id: data.id().to_string(),
        realm_id: data.get_string("realm_id"),
        resource_server_id: data.get_string("resource_server_id"),
        name: data.get_string("name"),
        description: data.get_string("description"),
        decision_strategy: data.get_string("decision_strategy"),
        policies: data.get_string_list("policies"),
        resources: data.get_string_list("resources"),
        scopes: data.get_string_list("scopes"),
        permission_type: data.get_string("type"),
        resource_type: data.get_string("resource_type"),
    }
}

fn set_authorization_permission_data(data: &mut ResourceData, permission: &AuthorizationPermission) {
    data.set_id(&permission.id);
    data.set("realm_id", permission.realm_id.as_str());
    data.set("resource_server_id", permission.resource_server_id.as_str());
    data.set("name", permission.name.as_str());
    data.set("description", permission.description.as_str());
    data.set("decision_strategy", permission.decision_strategy.as_str());
    data.set("policies", permission.policies.clone());
    data.set("resources", permission.resources.clone());
    data.set("scopes", permission.scopes.clone());
    data.set("type", permission.permission_type.as_str());
    data.set("resource_type", permission.resource_type.as_str());
}

#[async_trait::async_trait]
impl Resource for AuthorizationPermissionResource {
    fn schema(&self) -> Schema {
        resource_server_schema()
            .attr("name", Attribute::string().required())
            .attr("description", Attribute::string().optional())
            .attr(
                "decision_strategy",
                Attribute::string()
                    .default("UNANIMOUS")
                    .validate(Validator::string_in_slice(DECISION_STRATEGIES)),
            )
            .attr("policies", Attribute::string_set().optional())
            .attr("resources", Attribute::string_set().optional())
            .attr("resource_type", Attribute::string().optional())
            .attr("scopes", Attribute::string_set().optional())
            .attr(
                "type",
                Attribute::string()
                    .default("resource")
                    .force_new()
                    .validate(Validator::string_in_slice(PERMISSION_TYPES)),
            )
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mut permission = get_authorization_permission_from_data(data);
        keycloak.new_authorization_permission(&mut permission).await?;
        data.set_id(&permission.id);
        Ok(())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let permission = keycloak
            .get_authorization_permission(
                data.get_str("realm_id"),
                data.get_str("resource_server_id"),
                data.id(),
            )
            .await?;
        set_authorization_permission_data(data, &permission);
        Ok(())
    }

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let permission = get_authorization_permission_from_data(data);
        keycloak.update_authorization_permission(&permission).await?;
        set_authorization_permission_data(data, &permission);
        Ok(())
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak
            .delete_authorization_permission(
                data.get_str("realm_id"),
                data.get_str("resource_server_id"),
                data.id(),
            )
            .await?)
    }

    async fn import(&self, _keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        import_authorization_object(import_id, "permission")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn imports_need_all_three_segments() {
        let data = import_authorization_object("test/rs-1/p-1", "permission").unwrap();
        assert_eq!(data.id(), "p-1");
        assert_eq!(data.get_str("resource_server_id"), "rs-1");

        let err = import_authorization_object("rs-1/p-1", "permission").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid import. Supported import formats: {{realm}}/{{resourceServerId}}/{{permissionId}}"
        );
    }

    #[test]
    fn resource_scopes_are_sent_by_name() {
        let data = ResourceData::from(json!({
            "realm_id": "test",
            "resource_server_id": "rs-1",
            "name": "documents",
            "scopes": ["read", "write"],
            "attributes": {"owner": "team-a"}
        }));
        let resource = get_authorization_resource_from_data(&data);
        assert_eq!(resource.scope_names(), vec!["read", "write"]);
        let body = serde_json::to_value(&resource).unwrap();
        assert_eq!(body["scopes"][1]["name"], "write");
        assert_eq!(body["attributes"]["owner"], json!(["team-a"]));
    }
}
