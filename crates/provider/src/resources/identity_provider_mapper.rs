use std::collections::BTreeMap;

use kcp_keycloak::{
    identity_provider_mapper::{
        IdentityProviderMapper, IdentityProviderMapperConfig, HARDCODED_ATTRIBUTE_MAPPER,
        HARDCODED_ROLE_MAPPER, HARDCODED_USER_SESSION_ATTRIBUTE_MAPPER,
    },
    Keycloak,
};

use crate::{
    data::ResourceData,
    error::{ProviderError, Result},
    extra_config::{get_extra_config, set_extra_config, validate_extra_config, EXTRA_CONFIG},
    import::parse_three_part_import_id,
    resource::Resource,
    schema::{Attribute, Schema},
};

const IMPORT_FORMATS: &str =
    "{{realm}}/{{identityProviderAlias}}/{{identityProviderMapperId}}";

/// What distinguishes one identity provider mapper type from another: its
/// extra attributes and how they map onto the mapper config.
#[async_trait::async_trait]
pub trait MapperKind: Send + Sync {
    const TYPE_NAME: &'static str;

    fn extend_schema(schema: Schema) -> Schema;

    /// Sets the mapper type and the typed config fields.
    async fn fill(
        keycloak: &Keycloak,
        data: &ResourceData,
        mapper: &mut IdentityProviderMapper,
    ) -> Result<()>;

    fn set_data(data: &mut ResourceData, mapper: &IdentityProviderMapper) -> Result<()>;

    fn reserved_keys() -> &'static [&'static str] {
        IdentityProviderMapperConfig::RESERVED_KEYS
    }
}

fn mapper_schema() -> Schema {
    Schema::new()
        .attr("realm", Attribute::string().required().force_new().description("Realm Name"))
        .attr("name", Attribute::string().required().force_new().description("IDP Mapper Name"))
        .attr(
            "identity_provider_alias",
            Attribute::string().required().force_new().description("IDP Alias"),
        )
        .attr(EXTRA_CONFIG, Attribute::string_map().optional())
}

fn get_mapper_from_data(data: &ResourceData) -> IdentityProviderMapper {
    IdentityProviderMapper {
        id: data.id().to_string(),
        realm: data.get_string("realm"),
        name: data.get_string("name"),
        identity_provider_alias: data.get_string("identity_provider_alias"),
        config: IdentityProviderMapperConfig {
            extra_config: get_extra_config(data),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn set_mapper_data(data: &mut ResourceData, mapper: &IdentityProviderMapper) {
    data.set_id(&mapper.id);
    data.set("realm", mapper.realm.as_str());
    data.set("name", mapper.name.as_str());
    data.set("identity_provider_alias", mapper.identity_provider_alias.as_str());
    set_extra_config(data, &mapper.config.extra_config);
}

pub struct IdentityProviderMapperResource<K>(std::marker::PhantomData<K>);

impl<K> Default for IdentityProviderMapperResource<K> {
    fn default() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<K: MapperKind> IdentityProviderMapperResource<K> {
    async fn build(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<IdentityProviderMapper> {
        let mut mapper = get_mapper_from_data(data);
        K::fill(keycloak, data, &mut mapper).await?;
        Ok(mapper)
    }
}

#[async_trait::async_trait]
impl<K: MapperKind + 'static> Resource for IdentityProviderMapperResource<K> {
    fn schema(&self) -> Schema {
        K::extend_schema(mapper_schema())
    }

    async fn validate(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        validate_extra_config(&get_extra_config(data), K::reserved_keys())?;
        let alias = data.get_str("identity_provider_alias");
        match keycloak.get_identity_provider(data.get_str("realm"), alias).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => Err(ProviderError::validation(format!(
                "identity provider with alias {alias} not found"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mut mapper = self.build(keycloak, data).await?;
        keycloak.new_identity_provider_mapper(&mut mapper).await?;
        data.set_id(&mapper.id);
        Ok(())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mapper = keycloak
            .get_identity_provider_mapper(
                data.get_str("realm"),
                data.get_str("identity_provider_alias"),
                data.id(),
            )
            .await?;
        set_mapper_data(data, &mapper);
        K::set_data(data, &mapper)
    }

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mapper = self.build(keycloak, data).await?;
        keycloak.update_identity_provider_mapper(&mapper).await?;
        set_mapper_data(data, &mapper);
        K::set_data(data, &mapper)
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak
            .delete_identity_provider_mapper(
                data.get_str("realm"),
                data.get_str("identity_provider_alias"),
                data.id(),
            )
            .await?)
    }

    async fn import(&self, _keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        let id = parse_three_part_import_id(import_id, IMPORT_FORMATS)?;
        let mut data = ResourceData::default().with_id(id.id);
        data.set("realm", id.realm);
        data.set("identity_provider_alias", id.parent_id);
        Ok(data)
    }
}

/// Any mapper type; the whole config lives in `extra_config`.
pub struct Custom;

#[async_trait::async_trait]
impl MapperKind for Custom {
    const TYPE_NAME: &'static str = "keycloak_custom_identity_provider_mapper";

    fn extend_schema(schema: Schema) -> Schema {
        schema.attr(
            "identity_provider_mapper",
            Attribute::string().required().description("IDP Mapper Type"),
        )
    }

    async fn fill(
        _keycloak: &Keycloak,
        data: &ResourceData,
        mapper: &mut IdentityProviderMapper,
    ) -> Result<()> {
        mapper.identity_provider_mapper = data.get_string("identity_provider_mapper");
        mapper.config = config_from_map(get_extra_config(data))?;
        Ok(())
    }

    fn set_data(data: &mut ResourceData, mapper: &IdentityProviderMapper) -> Result<()> {
        data.set("identity_provider_mapper", mapper.identity_provider_mapper.as_str());
        set_extra_config(data, &config_to_map(&mapper.config)?);
        Ok(())
    }

    fn reserved_keys() -> &'static [&'static str] {
        &[]
    }
}

fn config_from_map(map: BTreeMap<String, String>) -> Result<IdentityProviderMapperConfig> {
    let value = serde_json::to_value(map).map_err(kcp_keycloak::Error::from)?;
    Ok(serde_json::from_value(value).map_err(kcp_keycloak::Error::from)?)
}

fn config_to_map(config: &IdentityProviderMapperConfig) -> Result<BTreeMap<String, String>> {
    let value = serde_json::to_value(config).map_err(kcp_keycloak::Error::from)?;
    Ok(serde_json::from_value(value).map_err(kcp_keycloak::Error::from)?)
}

pub struct HardcodedAttribute;

#[async_trait::async_trait]
impl MapperKind for HardcodedAttribute {
    const TYPE_NAME: &'static str = "keycloak_hardcoded_attribute_identity_provider_mapper";

    fn extend_schema(schema: Schema) -> Schema {
        schema
            .attr("attribute_name", Attribute::string().optional())
            .attr("attribute_value", Attribute::string().optional())
            .attr(
                "user_session",
                Attribute::bool()
                    .required()
                    .force_new()
                    .description("Is Attribute Related To a User Session"),
            )
    }

    async fn fill(
        _keycloak: &Keycloak,
        data: &ResourceData,
        mapper: &mut IdentityProviderMapper,
    ) -> Result<()> {
        mapper.identity_provider_mapper = if data.get_bool("user_session") {
            HARDCODED_USER_SESSION_ATTRIBUTE_MAPPER
        } else {
            HARDCODED_ATTRIBUTE_MAPPER
        }
        .to_string();
        mapper.config.hardcoded_attribute = data.get_string("attribute_name");
        mapper.config.attribute_value = data.get_string("attribute_value");
        Ok(())
    }

    fn set_data(data: &mut ResourceData, mapper: &IdentityProviderMapper) -> Result<()> {
        let user_session = match mapper.identity_provider_mapper.as_str() {
            HARDCODED_USER_SESSION_ATTRIBUTE_MAPPER => true,
            HARDCODED_ATTRIBUTE_MAPPER => false,
            other => {
                return Err(ProviderError::validation(format!(
                    "{}: mapper type \"{other}\" is not valid",
                    Self::TYPE_NAME
                )))
            }
        };
        data.set("attribute_name", mapper.config.hardcoded_attribute.as_str());
        data.set("attribute_value", mapper.config.attribute_value.as_str());
        data.set("user_session", user_session);
        Ok(())
    }
}

pub struct HardcodedRole;

#[async_trait::async_trait]
impl MapperKind for HardcodedRole {
    const TYPE_NAME: &'static str = "keycloak_hardcoded_role_identity_provider_mapper";

    fn extend_schema(schema: Schema) -> Schema {
        schema.attr("role", Attribute::string().optional().description("Role Name"))
    }

    async fn fill(
        _keycloak: &Keycloak,
        data: &ResourceData,
        mapper: &mut IdentityProviderMapper,
    ) -> Result<()> {
        mapper.identity_provider_mapper = HARDCODED_ROLE_MAPPER.to_string();
        mapper.config.role = data.get_string("role");
        Ok(())
    }

    fn set_data(data: &mut ResourceData, mapper: &IdentityProviderMapper) -> Result<()> {
        data.set("role", mapper.config.role.as_str());
        Ok(())
    }
}

/// Imports a claim or assertion attribute into a user attribute. The mapper
/// type and config keys depend on the provider of the parent identity
/// provider.
pub struct AttributeImporter;

impl AttributeImporter {
    fn configure(
        provider_id: &str,
        data: &ResourceData,
        mapper: &mut IdentityProviderMapper,
    ) -> Result<()> {
        let name = data.get_str("name");
        let config = &mut mapper.config;
        config.user_attribute = data.get_string("user_attribute");
        mapper.identity_provider_mapper = format!("{provider_id}-user-attribute-idp-mapper");
        match provider_id {
            "saml" => {
                if let Some(attr) = data.get_ok("attribute_friendly_name").and_then(|v| v.as_str()) {
                    config.attribute_friendly_name = attr.to_string();
                } else if let Some(attr) = data.get_ok("attribute_name").and_then(|v| v.as_str()) {
                    config.attribute = attr.to_string();
                } else {
                    return Err(ProviderError::validation(format!(
                        "{}: {name}: either \"attribute_name\" or \"attribute_friendly_name\" should be set for {provider_id} identity provider",
                        Self::TYPE_NAME
                    )));
                }
            }
            "oidc" => {
                if data.get_ok("claim_name").is_none() {
                    return Err(ProviderError::validation(format!(
                        "{}: {name}: \"claim_name\": should be set for {provider_id} identity provider",
                        Self::TYPE_NAME
                    )));
                }
                config.claim = data.get_string("claim_name");
            }
            "facebook" | "google" | "apple" => {
                mapper.identity_provider_mapper = format!("{provider_id}-user-attribute-mapper");
                config.json_field = data.get_string("claim_name");
                config.user_attribute_name = data.get_string("user_attribute");
            }
            _ => {
                return Err(ProviderError::validation(format!(
                    "{}: {name}: \"{provider_id}\" identity provider is not supported yet",
                    Self::TYPE_NAME
                )))
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MapperKind for AttributeImporter {
    const TYPE_NAME: &'static str = "keycloak_attribute_importer_identity_provider_mapper";

    fn extend_schema(schema: Schema) -> Schema {
        schema
            .attr("user_attribute", Attribute::string().required().description("User Attribute"))
            .attr(
                "attribute_name",
                Attribute::string()
                    .optional()
                    .conflicts_with(&["attribute_friendly_name"]),
            )
            .attr(
                "attribute_friendly_name",
                Attribute::string().optional().conflicts_with(&["attribute_name"]),
            )
            .attr("claim_name", Attribute::string().optional())
    }

    async fn fill(
        keycloak: &Keycloak,
        data: &ResourceData,
        mapper: &mut IdentityProviderMapper,
    ) -> Result<()> {
        let idp = keycloak
            .get_identity_provider(&mapper.realm, &mapper.identity_provider_alias)
            .await?;
        Self::configure(&idp.provider_id, data, mapper)
    }

    fn set_data(data: &mut ResourceData, mapper: &IdentityProviderMapper) -> Result<()> {
        let config = &mapper.config;
        let claim_name = if config.claim.is_empty() {
            &config.json_field
        } else {
            &config.claim
        };
        let user_attribute = if config.user_attribute.is_empty() {
            &config.user_attribute_name
        } else {
            &config.user_attribute
        };
        data.set("attribute_name", config.attribute.as_str());
        data.set("user_attribute", user_attribute.as_str());
        data.set("attribute_friendly_name", config.attribute_friendly_name.as_str());
        data.set("claim_name", claim_name.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn mapper(data: &ResourceData) -> IdentityProviderMapper {
        get_mapper_from_data(data)
    }

    #[test]
    fn attribute_importer_type_follows_the_provider() {
        let data = ResourceData::from(json!({
            "realm": "test",
            "name": "email",
            "identity_provider_alias": "corp",
            "user_attribute": "email",
            "claim_name": "mail"
        }));

        let mut oidc = mapper(&data);
        AttributeImporter::configure("oidc", &data, &mut oidc).unwrap();
        assert_eq!(oidc.identity_provider_mapper, "oidc-user-attribute-idp-mapper");
        assert_eq!(oidc.config.claim, "mail");

        let mut google = mapper(&data);
        AttributeImporter::configure("google", &data, &mut google).unwrap();
        assert_eq!(google.identity_provider_mapper, "google-user-attribute-mapper");
        assert_eq!(google.config.json_field, "mail");
        assert_eq!(google.config.user_attribute_name, "email");

        let err = AttributeImporter::configure("saml", &data, &mut mapper(&data)).unwrap_err();
        assert!(err
            .to_string()
            .contains("either \"attribute_name\" or \"attribute_friendly_name\" should be set"));

        let err = AttributeImporter::configure("github", &data, &mut mapper(&data)).unwrap_err();
        assert!(err.to_string().ends_with("\"github\" identity provider is not supported yet"));
    }

    #[test]
    fn hardcoded_attribute_rejects_foreign_mapper_types() {
        let mut data = ResourceData::default();
        let mut m = IdentityProviderMapper {
            identity_provider_mapper: HARDCODED_USER_SESSION_ATTRIBUTE_MAPPER.into(),
            ..Default::default()
        };
        HardcodedAttribute::set_data(&mut data, &m).unwrap();
        assert!(data.get_bool("user_session"));

        m.identity_provider_mapper = HARDCODED_ROLE_MAPPER.into();
        assert!(HardcodedAttribute::set_data(&mut data, &m).is_err());
    }

    #[test]
    fn custom_mapper_keeps_known_keys_in_extra_config() {
        let config = config_from_map(BTreeMap::from([
            ("claim".to_string(), "groups".to_string()),
            ("syncMode".to_string(), "FORCE".to_string()),
        ]))
        .unwrap();
        assert_eq!(config.claim, "groups");
        let map = config_to_map(&config).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["claim"], "groups");
    }
}
