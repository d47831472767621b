use super::{LdapMapper, LdapMapperBase};
use crate::{component::Component, error::Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LdapUserAttributeMapper {
    pub base: LdapMapperBase,
    pub ldap_attribute: String,
    pub is_mandatory_in_ldap: bool,
    pub read_only: bool,
    pub always_read_value_from_ldap: bool,
    pub user_model_attribute: String,
    pub attribute_default_value: String,
    pub is_binary_attribute: bool,
}

impl LdapMapper for LdapUserAttributeMapper {
    const PROVIDER_ID: &'static str = "user-attribute-ldap-mapper";

    fn base(&self) -> &LdapMapperBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LdapMapperBase {
        &mut self.base
    }

    fn to_component(&self) -> Result<Component> {
        Ok(self
            .base
            .component(Self::PROVIDER_ID)
            .with_config("ldap.attribute", &self.ldap_attribute)
            .with_config("is.mandatory.in.ldap", self.is_mandatory_in_ldap)
            .with_config("read.only", self.read_only)
            .with_config("always.read.value.from.ldap", self.always_read_value_from_ldap)
            .with_config("user.model.attribute", &self.user_model_attribute)
            .with_config("attribute.default.value", &self.attribute_default_value)
            .with_config("is.binary.attribute", self.is_binary_attribute))
    }

    fn from_component(component: Component, realm_id: &str) -> Result<Self> {
        Ok(Self {
            base: LdapMapperBase::from_component(&component, realm_id),
            ldap_attribute: component.get_config("ldap.attribute").to_string(),
            is_mandatory_in_ldap: component.get_config_bool("is.mandatory.in.ldap")?,
            read_only: component.get_config_bool("read.only")?,
            always_read_value_from_ldap: component.get_config_bool("always.read.value.from.ldap")?,
            user_model_attribute: component.get_config("user.model.attribute").to_string(),
            attribute_default_value: component.get_config("attribute.default.value").to_string(),
            is_binary_attribute: component.get_config_bool("is.binary.attribute")?,
        })
    }
}
