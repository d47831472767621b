use std::collections::BTreeMap;

use keycloak::types::ProtocolMapperRepresentation;

use crate::{
    client::created_id,
    error::{Error, Result},
    types::non_empty,
    Keycloak,
};

/// Token mapper attached to either a client or a client scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolMapper {
    pub id: String,
    pub realm_id: String,
    pub client_id: String,
    pub client_scope_id: String,
    pub name: String,
    pub protocol: String,
    pub protocol_mapper: String,
    pub config: BTreeMap<String, String>,
}

/// Object a protocol mapper hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperOwner<'a> {
    Client(&'a str),
    ClientScope(&'a str),
}

impl From<ProtocolMapperRepresentation> for ProtocolMapper {
    fn from(rep: ProtocolMapperRepresentation) -> Self {
        Self {
            id: rep.id.unwrap_or_default(),
            name: rep.name.unwrap_or_default(),
            protocol: rep.protocol.unwrap_or_default(),
            protocol_mapper: rep.protocol_mapper.unwrap_or_default(),
            config: rep.config.unwrap_or_default().into_iter().collect(),
            ..Default::default()
        }
    }
}

impl From<&ProtocolMapper> for ProtocolMapperRepresentation {
    fn from(mapper: &ProtocolMapper) -> Self {
        Self {
            id: non_empty(&mapper.id),
            name: Some(mapper.name.clone()),
            protocol: Some(mapper.protocol.clone()),
            protocol_mapper: Some(mapper.protocol_mapper.clone()),
            config: Some(mapper.config.clone().into_iter().collect()),
            ..Default::default()
        }
    }
}

impl ProtocolMapper {
    /// Exactly one of `client_id` and `client_scope_id` may be set.
    pub fn owner(&self) -> Result<MapperOwner<'_>> {
        owner_of(&self.client_id, &self.client_scope_id)
    }

    fn with_owner(mut self, realm_id: &str, owner: MapperOwner<'_>) -> Self {
        self.realm_id = realm_id.to_string();
        match owner {
            MapperOwner::Client(id) => self.client_id = id.to_string(),
            MapperOwner::ClientScope(id) => self.client_scope_id = id.to_string(),
        }
        self
    }
}

pub fn owner_of<'a>(client_id: &'a str, client_scope_id: &'a str) -> Result<MapperOwner<'a>> {
    match (client_id.is_empty(), client_scope_id.is_empty()) {
        (false, true) => Ok(MapperOwner::Client(client_id)),
        (true, false) => Ok(MapperOwner::ClientScope(client_scope_id)),
        (true, true) => Err(Error::validation(
            "one of ClientId or ClientScopeId must be set",
        )),
        (false, false) => Err(Error::validation(
            "only one of ClientId or ClientScopeId must be set",
        )),
    }
}

impl Keycloak {
    /// Rejects a mapper without a single owner, or one whose name is taken
    /// on that owner.
    pub async fn validate_protocol_mapper(&self, mapper: &ProtocolMapper) -> Result<()> {
        let owner = mapper.owner()?;
        let existing = self.list_protocol_mappers(&mapper.realm_id, owner).await?;
        if existing.iter().any(|m| m.name == mapper.name && m.id != mapper.id) {
            return Err(Error::validation(format!(
                "a protocol mapper with name {} already exists for this client",
                mapper.name
            )));
        }
        Ok(())
    }

    pub async fn new_protocol_mapper(&self, mapper: &mut ProtocolMapper) -> Result<()> {
        let realm_id = mapper.realm_id.as_str();
        let rep = ProtocolMapperRepresentation::from(&*mapper);
        let response = match mapper.owner()? {
            MapperOwner::Client(client_id) => {
                self.call(|admin| {
                    admin.realm_clients_with_client_uuid_protocol_mappers_models_post(
                        realm_id,
                        client_id,
                        rep.clone(),
                    )
                })
                .await?
            }
            MapperOwner::ClientScope(scope_id) => {
                self.call(|admin| {
                    admin.realm_client_scopes_with_client_scope_id_protocol_mappers_models_post(
                        realm_id,
                        scope_id,
                        rep.clone(),
                    )
                })
                .await?
            }
        };
        mapper.id = created_id(&response, "protocol mapper")?;
        Ok(())
    }

    pub async fn get_protocol_mapper(
        &self,
        realm_id: &str,
        client_id: &str,
        client_scope_id: &str,
        id: &str,
    ) -> Result<ProtocolMapper> {
        let owner = owner_of(client_id, client_scope_id)?;
        let rep = match owner {
            MapperOwner::Client(client_id) => {
                self.call(|admin| {
                    admin.realm_clients_with_client_uuid_protocol_mappers_models_with_id_get(
                        realm_id, client_id, id,
                    )
                })
                .await?
            }
            MapperOwner::ClientScope(scope_id) => {
                self.call(|admin| {
                    admin.realm_client_scopes_with_client_scope_id_protocol_mappers_models_with_id_get(
                        realm_id, scope_id, id,
                    )
                })
                .await?
            }
        };
        Ok(ProtocolMapper::from(rep).with_owner(realm_id, owner))
    }

    pub async fn list_protocol_mappers(
        &self,
        realm_id: &str,
        owner: MapperOwner<'_>,
    ) -> Result<Vec<ProtocolMapper>> {
        let reps = match owner {
            MapperOwner::Client(client_id) => {
                self.call(|admin| {
                    admin.realm_clients_with_client_uuid_protocol_mappers_models_get(
                        realm_id, client_id,
                    )
                })
                .await?
            }
            MapperOwner::ClientScope(scope_id) => {
                self.call(|admin| {
                    admin.realm_client_scopes_with_client_scope_id_protocol_mappers_models_get(
                        realm_id, scope_id,
                    )
                })
                .await?
            }
        };
        Ok(reps
            .into_iter()
            .map(|rep| ProtocolMapper::from(rep).with_owner(realm_id, owner))
            .collect())
    }

    pub async fn update_protocol_mapper(&self, mapper: &ProtocolMapper) -> Result<()> {
        let realm_id = mapper.realm_id.as_str();
        let id = mapper.id.as_str();
        let rep = ProtocolMapperRepresentation::from(mapper);
        match mapper.owner()? {
            MapperOwner::Client(client_id) => {
                self.call(|admin| {
                    admin.realm_clients_with_client_uuid_protocol_mappers_models_with_id_put(
                        realm_id,
                        client_id,
                        id,
                        rep.clone(),
                    )
                })
                .await?;
            }
            MapperOwner::ClientScope(scope_id) => {
                self.call(|admin| {
                    admin.realm_client_scopes_with_client_scope_id_protocol_mappers_models_with_id_put(
                        realm_id,
                        scope_id,
                        id,
                        rep.clone(),
                    )
                })
                .await?;
            }
        }
        Ok(())
    }

    pub async fn delete_protocol_mapper(
        &self,
        realm_id: &str,
        client_id: &str,
        client_scope_id: &str,
        id: &str,
    ) -> Result<()> {
        match owner_of(client_id, client_scope_id)? {
            MapperOwner::Client(client_id) => {
                self.call(|admin| {
                    admin.realm_clients_with_client_uuid_protocol_mappers_models_with_id_delete(
                        realm_id, client_id, id,
                    )
                })
                .await?;
            }
            MapperOwner::ClientScope(scope_id) => {
                self.call(|admin| {
                    admin.realm_client_scopes_with_client_scope_id_protocol_mappers_models_with_id_delete(
                        realm_id, scope_id, id,
                    )
                })
                .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keycloak::types::ProtocolMapperRepresentation;

    use super::{owner_of, MapperOwner, ProtocolMapper};

    #[test]
    fn exactly_one_owner_is_required() {
        assert_eq!(owner_of("c1", "").unwrap(), MapperOwner::Client("c1"));
        assert_eq!(owner_of("", "s1").unwrap(), MapperOwner::ClientScope("s1"));
        assert_eq!(
            owner_of("", "").unwrap_err().to_string(),
            "validation error: one of ClientId or ClientScopeId must be set"
        );
        assert_eq!(
            owner_of("c1", "s1").unwrap_err().to_string(),
            "validation error: only one of ClientId or ClientScopeId must be set"
        );
    }

    #[test]
    fn wire_shape_omits_unset_id() {
        let mapper = ProtocolMapper {
            realm_id: "test".into(),
            client_id: "c1".into(),
            name: "email".into(),
            protocol: "openid-connect".into(),
            protocol_mapper: "oidc-usermodel-attribute-mapper".into(),
            config: [("claim.name".to_string(), "mail".to_string())].into(),
            ..Default::default()
        };
        let body = serde_json::to_value(ProtocolMapperRepresentation::from(&mapper)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "email",
                "protocol": "openid-connect",
                "protocolMapper": "oidc-usermodel-attribute-mapper",
                "config": { "claim.name": "mail" }
            })
        );
    }

    #[test]
    fn read_mapper_keeps_its_owner() {
        let rep: ProtocolMapperRepresentation = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "name": "email",
            "protocol": "openid-connect",
            "protocolMapper": "oidc-usermodel-attribute-mapper"
        }))
        .unwrap();
        let mapper = ProtocolMapper::from(rep).with_owner("test", MapperOwner::ClientScope("s1"));
        assert_eq!(mapper.client_scope_id, "s1");
        assert!(mapper.client_id.is_empty());
        assert!(mapper.config.is_empty());
    }
}
