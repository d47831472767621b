use super::{LdapMapper, LdapMapperBase};
use crate::{component::Component, error::Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LdapMsadUserAccountControlMapper {
    pub base: LdapMapperBase,
    pub ldap_password_policy_hints_enabled: bool,
}

impl LdapMapper for LdapMsadUserAccountControlMapper {
    const PROVIDER_ID: &'static str = "msad-user-account-control-mapper";

    fn base(&self) -> &LdapMapperBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LdapMapperBase {
        &mut self.base
    }

    fn to_component(&self) -> Result<Component> {
        Ok(self.base.component(Self::PROVIDER_ID).with_config(
            "ldap.password.policy.hints.enabled",
            self.ldap_password_policy_hints_enabled,
        ))
    }

    fn from_component(component: Component, realm_id: &str) -> Result<Self> {
        Ok(Self {
            base: LdapMapperBase::from_component(&component, realm_id),
            ldap_password_policy_hints_enabled: component
                .get_config_bool("ldap.password.policy.hints.enabled")?,
        })
    }
}
