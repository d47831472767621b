use keycloak::types::RoleRepresentation;

use crate::{client::Attributes, error::Result, types::non_empty, Keycloak};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Role {
    pub id: String,
    pub realm_id: String,
    /// Internal id of the owning client; empty for realm roles.
    pub client_id: String,
    pub name: String,
    pub description: String,
    pub client_role: bool,
    pub container_id: String,
    pub composite: bool,
    pub attributes: Attributes,
}

impl From<RoleRepresentation> for Role {
    fn from(rep: RoleRepresentation) -> Self {
        Self {
            id: rep.id.unwrap_or_default(),
            realm_id: String::new(),
            client_id: String::new(),
            name: rep.name.unwrap_or_default(),
            description: rep.description.unwrap_or_default(),
            client_role: rep.client_role.unwrap_or_default(),
            container_id: rep.container_id.unwrap_or_default(),
            composite: rep.composite.unwrap_or_default(),
            attributes: rep.attributes.unwrap_or_default().into_iter().collect(),
        }
    }
}

impl From<&Role> for RoleRepresentation {
    fn from(role: &Role) -> Self {
        Self {
            id: non_empty(&role.id),
            name: Some(role.name.clone()),
            description: Some(role.description.clone()),
            client_role: Some(role.client_role),
            container_id: non_empty(&role.container_id),
            composite: Some(role.composite),
            attributes: Some(role.attributes.clone().into_iter().collect()),
            ..Default::default()
        }
    }
}

fn role_refs(ids: &[String]) -> Vec<RoleRepresentation> {
    ids.iter()
        .map(|id| RoleRepresentation {
            id: Some(id.clone()),
            ..Default::default()
        })
        .collect()
}

impl Role {
    fn with_scope(mut self, realm_id: &str) -> Self {
        self.realm_id = realm_id.to_string();
        if self.client_role {
            self.client_id = self.container_id.clone();
        }
        self
    }
}

impl Keycloak {
    /// Creates the role, looks up its id by name and writes the attributes,
    /// which Keycloak ignores on create.
    pub async fn new_role(&self, role: &mut Role) -> Result<()> {
        if !role.client_id.is_empty() {
            role.container_id = role.client_id.clone();
            role.client_role = true;
        }
        let realm_id = role.realm_id.as_str();
        let client_id = role.client_id.as_str();
        let rep = RoleRepresentation::from(&*role);
        if client_id.is_empty() {
            self.call(|admin| admin.realm_roles_post(realm_id, rep.clone()))
                .await?;
        } else {
            self.call(|admin| {
                admin.realm_clients_with_client_uuid_roles_post(realm_id, client_id, rep.clone())
            })
            .await?;
        }
        let created = self.get_role_by_name(realm_id, client_id, &role.name).await?;
        role.id = created.id;
        self.update_role(&*role).await
    }

    pub async fn get_role(&self, realm_id: &str, id: &str) -> Result<Role> {
        let role = self
            .call(|admin| admin.realm_roles_by_id_with_role_id_get(realm_id, id))
            .await?;
        Ok(Role::from(role).with_scope(realm_id))
    }

    pub async fn get_role_by_name(
        &self,
        realm_id: &str,
        client_id: &str,
        name: &str,
    ) -> Result<Role> {
        let role = if client_id.is_empty() {
            self.call(|admin| admin.realm_roles_with_role_name_get(realm_id, name))
                .await?
        } else {
            self.call(|admin| {
                admin.realm_clients_with_client_uuid_roles_with_role_name_get(
                    realm_id, client_id, name,
                )
            })
            .await?
        };
        Ok(Role::from(role).with_scope(realm_id))
    }

    pub async fn update_role(&self, role: &Role) -> Result<()> {
        self.call(|admin| {
            admin.realm_roles_by_id_with_role_id_put(&role.realm_id, &role.id, role.into())
        })
        .await?;
        Ok(())
    }

    pub async fn delete_role(&self, realm_id: &str, id: &str) -> Result<()> {
        self.call(|admin| admin.realm_roles_by_id_with_role_id_delete(realm_id, id))
            .await?;
        Ok(())
    }

    pub async fn get_role_composites(&self, role: &Role) -> Result<Vec<Role>> {
        let composites = self
            .call(|admin| {
                admin.realm_roles_by_id_with_role_id_composites_get(
                    &role.realm_id,
                    &role.id,
                    None,
                    None,
                    None,
                )
            })
            .await?;
        Ok(composites
            .into_iter()
            .map(|r| Role::from(r).with_scope(&role.realm_id))
            .collect())
    }

    pub async fn add_composites_to_role(&self, role: &Role, composite_ids: &[String]) -> Result<()> {
        if composite_ids.is_empty() {
            return Ok(());
        }
        self.call(|admin| {
            admin.realm_roles_by_id_with_role_id_composites_post(
                &role.realm_id,
                &role.id,
                role_refs(composite_ids),
            )
        })
        .await?;
        Ok(())
    }

    pub async fn remove_composites_from_role(
        &self,
        role: &Role,
        composite_ids: &[String],
    ) -> Result<()> {
        if composite_ids.is_empty() {
            return Ok(());
        }
        self.call(|admin| {
            admin.realm_roles_by_id_with_role_id_composites_delete(
                &role.realm_id,
                &role.id,
                role_refs(composite_ids),
            )
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keycloak::types::RoleRepresentation;

    use super::{role_refs, Role};

    #[test]
    fn composite_bodies_carry_ids_only() {
        let body = serde_json::to_value(role_refs(&["r1".to_string()])).unwrap();
        assert_eq!(body, serde_json::json!([{ "id": "r1" }]));
    }

    #[test]
    fn client_role_scope_comes_from_container() {
        let rep: RoleRepresentation = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "name": "admin",
            "clientRole": true,
            "containerId": "c1"
        }))
        .unwrap();
        let role = Role::from(rep).with_scope("test");
        assert_eq!(role.client_id, "c1");
        assert_eq!(role.realm_id, "test");
    }
}
