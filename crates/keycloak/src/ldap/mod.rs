//! LDAP user federation and the mappers attached to it.
//!
//! All of them are components: the federation is parented by the realm,
//! every mapper by its federation.

mod full_name_mapper;
mod group_mapper;
mod hardcoded_mapper;
mod msad_user_account_control_mapper;
mod user_attribute_mapper;
mod user_federation;

pub use full_name_mapper::LdapFullNameMapper;
pub use group_mapper::{
    LdapGroupMapper, GROUP_MAPPER_MEMBERSHIP_ATTRIBUTE_TYPES, GROUP_MAPPER_MODES,
    GROUP_MAPPER_USER_ROLES_RETRIEVE_STRATEGIES,
};
pub use hardcoded_mapper::{LdapHardcodedGroupMapper, LdapHardcodedRoleMapper};
pub use msad_user_account_control_mapper::LdapMsadUserAccountControlMapper;
pub use user_attribute_mapper::LdapUserAttributeMapper;
pub use user_federation::{
    LdapUserFederation, CACHE_POLICIES, EDIT_MODES, SEARCH_SCOPES, TRUSTSTORE_SPI_OPTIONS,
    VENDORS,
};

use crate::{
    component::{Component, LDAP_STORAGE_MAPPER_TYPE},
    error::{Error, Result},
    Keycloak,
};

/// Fields every LDAP mapper carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LdapMapperBase {
    pub id: String,
    pub name: String,
    pub realm_id: String,
    pub ldap_user_federation_id: String,
}

impl LdapMapperBase {
    fn component(&self, provider_id: &str) -> Component {
        let mut component = Component::new(
            &self.name,
            provider_id,
            LDAP_STORAGE_MAPPER_TYPE,
            &self.ldap_user_federation_id,
        );
        component.id = self.id.clone();
        component
    }

    fn from_component(component: &Component, realm_id: &str) -> Self {
        Self {
            id: component.id.clone(),
            name: component.name.clone(),
            realm_id: realm_id.to_string(),
            ldap_user_federation_id: component.parent_id.clone(),
        }
    }
}

/// A typed view of one LDAP mapper component.
pub trait LdapMapper: Sized {
    const PROVIDER_ID: &'static str;

    fn base(&self) -> &LdapMapperBase;
    fn base_mut(&mut self) -> &mut LdapMapperBase;
    fn to_component(&self) -> Result<Component>;
    fn from_component(component: Component, realm_id: &str) -> Result<Self>;
}

impl Keycloak {
    pub async fn new_ldap_mapper<M: LdapMapper>(&self, mapper: &mut M) -> Result<()> {
        let component = mapper.to_component()?;
        let id = self
            .new_component(&mapper.base().realm_id, &component)
            .await?;
        mapper.base_mut().id = id;
        Ok(())
    }

    pub async fn get_ldap_mapper<M: LdapMapper>(&self, realm_id: &str, id: &str) -> Result<M> {
        let component = self.get_component(realm_id, id).await?;
        if component.provider_id != M::PROVIDER_ID {
            return Err(Error::Other(format!(
                "component {id} is a {} and not a {}",
                component.provider_id,
                M::PROVIDER_ID
            )));
        }
        M::from_component(component, realm_id)
    }

    pub async fn update_ldap_mapper<M: LdapMapper>(&self, mapper: &M) -> Result<()> {
        let component = mapper.to_component()?;
        self.update_component(&mapper.base().realm_id, &component)
            .await
    }

    pub async fn delete_ldap_mapper(&self, realm_id: &str, id: &str) -> Result<()> {
        self.delete_component(realm_id, id).await
    }

    /// Edit mode of the federation a mapper hangs off.
    async fn parent_edit_mode(&self, base: &LdapMapperBase) -> Result<String> {
        let federation = self
            .get_ldap_user_federation(&base.realm_id, &base.ldap_user_federation_id)
            .await?;
        Ok(federation.edit_mode)
    }
}
