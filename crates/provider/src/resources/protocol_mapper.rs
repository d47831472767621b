use std::collections::BTreeMap;

use kcp_keycloak::{protocol_mapper::ProtocolMapper, Keycloak};

use crate::{
    data::ResourceData,
    error::{ProviderError, Result},
    import::parse_protocol_mapper_import_id,
    resource::Resource,
    schema::{Attribute, Schema},
    validation::Validator,
};

const PROTOCOLS: &[&str] = &["openid-connect", "saml"];

const USER_ATTRIBUTE_MAPPER: &str = "oidc-usermodel-attribute-mapper";
const ADD_TO_ID_TOKEN: &str = "id.token.claim";
const ADD_TO_ACCESS_TOKEN: &str = "access.token.claim";
const ADD_TO_USERINFO: &str = "userinfo.token.claim";
const USER_ATTRIBUTE: &str = "user.attribute";
const CLAIM_NAME: &str = "claim.name";
const CLAIM_VALUE_TYPE: &str = "jsonType.label";
const MULTIVALUED: &str = "multivalued";

/// Protocol mapper flavours share owner handling and differ in how their
/// attributes become the mapper type and config.
pub trait ProtocolMapperKind: Send + Sync {
    const TYPE_NAME: &'static str;

    fn extend_schema(schema: Schema) -> Schema;

    fn fill(data: &ResourceData, mapper: &mut ProtocolMapper);

    fn set_data(data: &mut ResourceData, mapper: &ProtocolMapper) -> Result<()>;
}

fn mapper_schema() -> Schema {
    Schema::new()
        .attr(
            "name",
            Attribute::string()
                .required()
                .force_new()
                .description("A human-friendly name that will appear in the Keycloak console."),
        )
        .attr(
            "realm_id",
            Attribute::string()
                .required()
                .force_new()
                .description("The realm id where the associated client or client scope exists."),
        )
        .attr(
            "client_id",
            Attribute::string()
                .optional()
                .force_new()
                .conflicts_with(&["client_scope_id"])
                .description("The mapper's associated client. Cannot be used at the same time as client_scope_id."),
        )
        .attr(
            "client_scope_id",
            Attribute::string()
                .optional()
                .force_new()
                .conflicts_with(&["client_id"])
                .description("The mapper's associated client scope. Cannot be used at the same time as client_id."),
        )
}

fn get_mapper_from_data(data: &ResourceData) -> ProtocolMapper {
    ProtocolMapper {
        id: data.id().to_string(),
        realm_id: data.get_string("realm_id"),
        client_id: data.get_string("client_id"),
        client_scope_id: data.get_string("client_scope_id"),
        name: data.get_string("name"),
        ..Default::default()
    }
}

fn set_mapper_data(data: &mut ResourceData, mapper: &ProtocolMapper) {
    data.set_id(&mapper.id);
    data.set("realm_id", mapper.realm_id.as_str());
    data.set("name", mapper.name.as_str());
    if mapper.client_id.is_empty() {
        data.set("client_scope_id", mapper.client_scope_id.as_str());
    } else {
        data.set("client_id", mapper.client_id.as_str());
    }
}

pub struct ProtocolMapperResource<K>(std::marker::PhantomData<K>);

impl<K> Default for ProtocolMapperResource<K> {
    fn default() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<K: ProtocolMapperKind> ProtocolMapperResource<K> {
    fn build(data: &ResourceData) -> ProtocolMapper {
        let mut mapper = get_mapper_from_data(data);
        K::fill(data, &mut mapper);
        mapper
    }
}

#[async_trait::async_trait]
impl<K: ProtocolMapperKind + 'static> Resource for ProtocolMapperResource<K> {
    fn schema(&self) -> Schema {
        K::extend_schema(mapper_schema())
    }

    async fn validate(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak.validate_protocol_mapper(&Self::build(data)).await?)
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mut mapper = Self::build(data);
        keycloak.new_protocol_mapper(&mut mapper).await?;
        data.set_id(&mapper.id);
        Ok(())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mapper = keycloak
            .get_protocol_mapper(
                data.get_str("realm_id"),
                data.get_str("client_id"),
                data.get_str("client_scope_id"),
                data.id(),
            )
            .await?;
        set_mapper_data(data, &mapper);
        K::set_data(data, &mapper)
    }

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mapper = Self::build(data);
        keycloak.update_protocol_mapper(&mapper).await?;
        set_mapper_data(data, &mapper);
        K::set_data(data, &mapper)
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak
            .delete_protocol_mapper(
                data.get_str("realm_id"),
                data.get_str("client_id"),
                data.get_str("client_scope_id"),
                data.id(),
            )
            .await?)
    }

    async fn import(&self, _keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        let id = parse_protocol_mapper_import_id(import_id)?;
        let mut data = ResourceData::default().with_id(id.id);
        data.set("realm_id", id.realm_id);
        if !id.client_id.is_empty() {
            data.set("client_id", id.client_id);
        }
        if !id.client_scope_id.is_empty() {
            data.set("client_scope_id", id.client_scope_id);
        }
        Ok(data)
    }
}

/// Any mapper type with a free-form config.
pub struct Generic;

impl ProtocolMapperKind for Generic {
    const TYPE_NAME: &'static str = "keycloak_generic_protocol_mapper";

    fn extend_schema(schema: Schema) -> Schema {
        schema
            .attr(
                "protocol",
                Attribute::string()
                    .required()
                    .force_new()
                    .validate(Validator::string_in_slice(PROTOCOLS))
                    .description("The protocol of the client (openid-connect / saml)."),
            )
            .attr(
                "protocol_mapper",
                Attribute::string()
                    .required()
                    .force_new()
                    .description("The type of the protocol mapper."),
            )
            .attr("config", Attribute::string_map().required())
    }

    fn fill(data: &ResourceData, mapper: &mut ProtocolMapper) {
        mapper.protocol = data.get_string("protocol");
        mapper.protocol_mapper = data.get_string("protocol_mapper");
        mapper.config = data.get_string_map("config");
    }

    fn set_data(data: &mut ResourceData, mapper: &ProtocolMapper) -> Result<()> {
        data.set("protocol", mapper.protocol.as_str());
        data.set("protocol_mapper", mapper.protocol_mapper.as_str());
        data.set_string_map("config", &mapper.config);
        Ok(())
    }
}

/// Maps a user attribute into a token claim.
pub struct OpenidUserAttribute;

impl OpenidUserAttribute {
    fn config(data: &ResourceData) -> BTreeMap<String, String> {
        [
            (ADD_TO_ID_TOKEN, data.get_bool("add_to_id_token").to_string()),
            (ADD_TO_ACCESS_TOKEN, data.get_bool("add_to_access_token").to_string()),
            (ADD_TO_USERINFO, data.get_bool("add_to_userinfo").to_string()),
            (USER_ATTRIBUTE, data.get_string("user_attribute")),
            (CLAIM_NAME, data.get_string("claim_name")),
            (CLAIM_VALUE_TYPE, data.get_string("claim_value_type")),
            (MULTIVALUED, data.get_bool("multivalued").to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    /// `multivalued` is unset on mappers created by older servers.
    fn flag(mapper: &ProtocolMapper, key: &str, empty_is_false: bool) -> Result<bool> {
        let raw = mapper.config.get(key).map(String::as_str).unwrap_or_default();
        if raw.is_empty() && empty_is_false {
            return Ok(false);
        }
        raw.parse().map_err(|_| {
            ProviderError::validation(format!(
                "{}: unable to parse `{key}` of protocol mapper {}",
                Self::TYPE_NAME,
                mapper.id
            ))
        })
    }
}

impl ProtocolMapperKind for OpenidUserAttribute {
    const TYPE_NAME: &'static str = "keycloak_openid_user_attribute_protocol_mapper";

    fn extend_schema(schema: Schema) -> Schema {
        schema
            .attr("add_to_id_token", Attribute::bool().optional().default(true))
            .attr("add_to_access_token", Attribute::bool().optional().default(true))
            .attr("add_to_userinfo", Attribute::bool().optional().default(true))
            .attr("multivalued", Attribute::bool().optional().default(false))
            .attr("user_attribute", Attribute::string().required())
            .attr("claim_name", Attribute::string().required())
            .attr(
                "claim_value_type",
                Attribute::string()
                    .optional()
                    .default("String")
                    .description("Claim type used when serializing tokens."),
            )
    }

    fn fill(data: &ResourceData, mapper: &mut ProtocolMapper) {
        mapper.protocol = "openid-connect".to_string();
        mapper.protocol_mapper = USER_ATTRIBUTE_MAPPER.to_string();
        mapper.config = Self::config(data);
    }

    fn set_data(data: &mut ResourceData, mapper: &ProtocolMapper) -> Result<()> {
        let text = |key: &str| mapper.config.get(key).cloned().unwrap_or_default();
        data.set("add_to_id_token", Self::flag(mapper, ADD_TO_ID_TOKEN, false)?);
        data.set("add_to_access_token", Self::flag(mapper, ADD_TO_ACCESS_TOKEN, false)?);
        data.set("add_to_userinfo", Self::flag(mapper, ADD_TO_USERINFO, false)?);
        data.set("multivalued", Self::flag(mapper, MULTIVALUED, true)?);
        data.set("user_attribute", text(USER_ATTRIBUTE));
        data.set("claim_name", text(CLAIM_NAME));
        data.set("claim_value_type", text(CLAIM_VALUE_TYPE));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn user_attribute_mapper_config() {
        let data = ResourceData::from(json!({
            "realm_id": "test",
            "client_scope_id": "s1",
            "name": "department",
            "add_to_id_token": true,
            "add_to_access_token": false,
            "add_to_userinfo": true,
            "multivalued": false,
            "user_attribute": "department",
            "claim_name": "dept",
            "claim_value_type": "String"
        }));
        let mapper = ProtocolMapperResource::<OpenidUserAttribute>::build(&data);
        assert_eq!(mapper.protocol_mapper, USER_ATTRIBUTE_MAPPER);
        assert_eq!(mapper.client_scope_id, "s1");
        assert_eq!(mapper.config[ADD_TO_ACCESS_TOKEN], "false");
        assert_eq!(mapper.config[CLAIM_NAME], "dept");
        assert_eq!(mapper.config[MULTIVALUED], "false");
    }

    #[test]
    fn imported_mapper_without_multivalued_reads_false() {
        let mut mapper = ProtocolMapper {
            id: "m1".into(),
            config: [
                (ADD_TO_ID_TOKEN, "true"),
                (ADD_TO_ACCESS_TOKEN, "true"),
                (ADD_TO_USERINFO, "false"),
                (MULTIVALUED, ""),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            ..Default::default()
        };
        let mut data = ResourceData::default();
        OpenidUserAttribute::set_data(&mut data, &mapper).unwrap();
        assert!(!data.get_bool("multivalued"));
        assert!(!data.get_bool("add_to_userinfo"));

        mapper.config.insert(ADD_TO_ID_TOKEN.into(), String::new());
        let err = OpenidUserAttribute::set_data(&mut data, &mapper).unwrap_err();
        assert!(err.to_string().contains("`id.token.claim`"));
    }

    #[test]
    fn write_back_keeps_a_single_owner() {
        let mut data = ResourceData::default();
        let mapper = ProtocolMapper {
            id: "m1".into(),
            realm_id: "test".into(),
            client_id: "c1".into(),
            name: "email".into(),
            ..Default::default()
        };
        set_mapper_data(&mut data, &mapper);
        assert_eq!(data.get_str("client_id"), "c1");
        assert!(data.get_ok("client_scope_id").is_none());
    }
}
