use std::collections::BTreeMap;

use keycloak::types::IdentityProviderMapperRepresentation;

use crate::{
    client::created_id,
    error::{Error, Result},
    types::{convert, non_empty},
    Keycloak,
};

pub const HARDCODED_ATTRIBUTE_MAPPER: &str = "hardcoded-attribute-idp-mapper";
pub const HARDCODED_USER_SESSION_ATTRIBUTE_MAPPER: &str =
    "hardcoded-user-session-attribute-idp-mapper";
pub const HARDCODED_ROLE_MAPPER: &str = "hardcoded-role-idp-mapper";

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct IdentityProviderMapperConfig {
    #[serde(rename = "user.attribute", default, skip_serializing_if = "String::is_empty")]
    pub user_attribute: String,
    #[serde(rename = "userAttribute", default, skip_serializing_if = "String::is_empty")]
    pub user_attribute_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub claim: String,
    #[serde(rename = "claim.value", default, skip_serializing_if = "String::is_empty")]
    pub claim_value: String,
    #[serde(rename = "attribute", default, skip_serializing_if = "String::is_empty")]
    pub hardcoded_attribute: String,
    #[serde(rename = "attribute.name", default, skip_serializing_if = "String::is_empty")]
    pub attribute: String,
    #[serde(rename = "attribute.value", default, skip_serializing_if = "String::is_empty")]
    pub attribute_value: String,
    #[serde(
        rename = "attribute.friendly.name",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub attribute_friendly_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub template: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(rename = "jsonField", default, skip_serializing_if = "String::is_empty")]
    pub json_field: String,
    #[serde(flatten)]
    pub extra_config: BTreeMap<String, String>,
}

impl IdentityProviderMapperConfig {
    pub const RESERVED_KEYS: &'static [&'static str] = &[
        "user.attribute",
        "userAttribute",
        "claim",
        "claim.value",
        "attribute",
        "attribute.name",
        "attribute.value",
        "attribute.friendly.name",
        "template",
        "role",
        "jsonField",
    ];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityProviderMapper {
    pub realm: String,
    pub id: String,
    pub name: String,
    pub identity_provider_alias: String,
    pub identity_provider_mapper: String,
    pub config: IdentityProviderMapperConfig,
}

impl TryFrom<IdentityProviderMapperRepresentation> for IdentityProviderMapper {
    type Error = Error;

    fn try_from(rep: IdentityProviderMapperRepresentation) -> Result<Self> {
        Ok(Self {
            realm: String::new(),
            id: rep.id.unwrap_or_default(),
            name: rep.name.unwrap_or_default(),
            identity_provider_alias: rep.identity_provider_alias.unwrap_or_default(),
            identity_provider_mapper: rep.identity_provider_mapper.unwrap_or_default(),
            config: convert(&rep.config.unwrap_or_default())?,
        })
    }
}

impl TryFrom<&IdentityProviderMapper> for IdentityProviderMapperRepresentation {
    type Error = Error;

    fn try_from(mapper: &IdentityProviderMapper) -> Result<Self> {
        Ok(Self {
            id: non_empty(&mapper.id),
            name: Some(mapper.name.clone()),
            identity_provider_alias: Some(mapper.identity_provider_alias.clone()),
            identity_provider_mapper: Some(mapper.identity_provider_mapper.clone()),
            config: Some(convert(&mapper.config)?),
        })
    }
}

impl Keycloak {
    pub async fn new_identity_provider_mapper(&self, mapper: &mut IdentityProviderMapper) -> Result<()> {
        let rep = IdentityProviderMapperRepresentation::try_from(&*mapper)?;
        let (realm, alias) = (mapper.realm.as_str(), mapper.identity_provider_alias.as_str());
        let response = self
            .call(|admin| {
                admin.realm_identity_provider_instances_with_alias_mappers_post(realm, alias, rep.clone())
            })
            .await?;
        mapper.id = created_id(&response, "identity provider mapper")?;
        Ok(())
    }

    pub async fn get_identity_provider_mapper(
        &self,
        realm: &str,
        alias: &str,
        id: &str,
    ) -> Result<IdentityProviderMapper> {
        let rep = self
            .call(|admin| {
                admin.realm_identity_provider_instances_with_alias_mappers_with_id_get(realm, alias, id)
            })
            .await?;
        let mut mapper = IdentityProviderMapper::try_from(rep)?;
        mapper.realm = realm.to_string();
        mapper.identity_provider_alias = alias.to_string();
        Ok(mapper)
    }

    pub async fn update_identity_provider_mapper(&self, mapper: &IdentityProviderMapper) -> Result<()> {
        let rep = IdentityProviderMapperRepresentation::try_from(mapper)?;
        self.call(|admin| {
            admin.realm_identity_provider_instances_with_alias_mappers_with_id_put(
                &mapper.realm,
                &mapper.identity_provider_alias,
                &mapper.id,
                rep.clone(),
            )
        })
        .await?;
        Ok(())
    }

    pub async fn delete_identity_provider_mapper(&self, realm: &str, alias: &str, id: &str) -> Result<()> {
        self.call(|admin| {
            admin.realm_identity_provider_instances_with_alias_mappers_with_id_delete(realm, alias, id)
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keycloak::types::IdentityProviderMapperRepresentation;

    use super::IdentityProviderMapper;

    #[test]
    fn dotted_config_keys() {
        let rep: IdentityProviderMapperRepresentation = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "name": "email",
            "identityProviderAlias": "corp",
            "identityProviderMapper": "oidc-user-attribute-idp-mapper",
            "config": {
                "user.attribute": "email",
                "claim": "mail",
                "syncMode": "INHERIT"
            }
        }))
        .unwrap();
        let mapper = IdentityProviderMapper::try_from(rep).unwrap();
        assert_eq!(mapper.config.user_attribute, "email");
        assert_eq!(mapper.config.claim, "mail");
        assert_eq!(mapper.config.extra_config["syncMode"], "INHERIT");

        let rep = IdentityProviderMapperRepresentation::try_from(&mapper).unwrap();
        let config = rep.config.unwrap();
        assert_eq!(config["user.attribute"], "email");
        assert!(!config.contains_key("attribute.value"));
    }
}
