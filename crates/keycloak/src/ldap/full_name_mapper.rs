use super::{LdapMapper, LdapMapperBase};
use crate::{
    component::Component,
    error::{Error, Result},
    Keycloak,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LdapFullNameMapper {
    pub base: LdapMapperBase,
    pub ldap_full_name_attribute: String,
    pub read_only: bool,
    pub write_only: bool,
}

impl LdapMapper for LdapFullNameMapper {
    const PROVIDER_ID: &'static str = "full-name-ldap-mapper";

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
            .with_config("ldap.full.name.attribute", &self.ldap_full_name_attribute)
            .with_config("read.only", self.read_only)
            .with_config("write.only", self.write_only))
    }

    fn from_component(component: Component, realm_id: &str) -> Result<Self> {
        Ok(Self {
            base: LdapMapperBase::from_component(&component, realm_id),
            ldap_full_name_attribute: component.get_config("ldap.full.name.attribute").to_string(),
            read_only: component.get_config_bool("read.only")?,
            write_only: component.get_config_bool("write.only")?,
        })
    }
}

impl Keycloak {
    pub async fn validate_ldap_full_name_mapper(&self, mapper: &LdapFullNameMapper) -> Result<()> {
        if mapper.read_only && mapper.write_only {
            return Err(Error::validation(
                "ldap full name mapper cannot be both read only and write only",
            ));
        }
        if mapper.write_only && self.parent_edit_mode(&mapper.base).await? != "WRITABLE" {
            return Err(Error::validation(
                "ldap full name mapper cannot be write only when ldap provider is not writable",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LdapFullNameMapper;
    use crate::ldap::{LdapMapper, LdapMapperBase};

    #[test]
    fn flags_are_stored_as_strings() {
        let mapper = LdapFullNameMapper {
            base: LdapMapperBase {
                name: "full-name".into(),
                realm_id: "test".into(),
                ldap_user_federation_id: "f1".into(),
                ..Default::default()
            },
            ldap_full_name_attribute: "cn".into(),
            read_only: true,
            write_only: false,
        };
        let c = mapper.to_component().unwrap();
        assert_eq!(c.parent_id, "f1");
        assert_eq!(c.get_config("read.only"), "true");
        assert_eq!(c.get_config("write.only"), "false");
        let back = LdapFullNameMapper::from_component(c, "test").unwrap();
        assert_eq!(back, mapper);
    }
}
