use super::{LdapMapper, LdapMapperBase};
use crate::{
    component::Component,
    error::{Error, Result},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LdapHardcodedRoleMapper {
    pub base: LdapMapperBase,
    /// Realm role name, or `clientId.roleName` for client roles.
    pub role: String,
}

impl LdapHardcodedRoleMapper {
    pub fn validate(&self) -> Result<()> {
        if self.role.is_empty() {
            return Err(Error::validation("hardcoded role name must not be empty"));
        }
        Ok(())
    }
}

impl LdapMapper for LdapHardcodedRoleMapper {
    const PROVIDER_ID: &'static str = "hardcoded-ldap-role-mapper";

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
            .with_config("role", &self.role))
    }

    fn from_component(component: Component, realm_id: &str) -> Result<Self> {
        Ok(Self {
            base: LdapMapperBase::from_component(&component, realm_id),
            role: component.get_config("role").to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LdapHardcodedGroupMapper {
    pub base: LdapMapperBase,
    pub group: String,
}

impl LdapHardcodedGroupMapper {
    pub fn validate(&self) -> Result<()> {
        if self.group.is_empty() {
            return Err(Error::validation("hardcoded group name must not be empty"));
        }
        Ok(())
    }
}

impl LdapMapper for LdapHardcodedGroupMapper {
    const PROVIDER_ID: &'static str = "hardcoded-ldap-group-mapper";

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
            .with_config("group", &self.group))
    }

    fn from_component(component: Component, realm_id: &str) -> Result<Self> {
        Ok(Self {
            base: LdapMapperBase::from_component(&component, realm_id),
            group: component.get_config("group").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_are_rejected() {
        let role = LdapHardcodedRoleMapper::default();
        assert_eq!(
            role.validate().unwrap_err().to_string(),
            "validation error: hardcoded role name must not be empty"
        );
        let group = LdapHardcodedGroupMapper {
            group: "staff".into(),
            ..Default::default()
        };
        assert!(group.validate().is_ok());
        assert_eq!(group.to_component().unwrap().get_config("group"), "staff");
    }
}
