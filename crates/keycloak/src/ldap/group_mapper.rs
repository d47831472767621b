use super::{LdapMapper, LdapMapperBase};
use crate::{
    component::Component,
    error::{Error, Result},
    Keycloak,
};

pub const GROUP_MAPPER_MODES: &[&str] = &["READ_ONLY", "LDAP_ONLY", "IMPORT"];
pub const GROUP_MAPPER_MEMBERSHIP_ATTRIBUTE_TYPES: &[&str] = &["DN", "UID"];
pub const GROUP_MAPPER_USER_ROLES_RETRIEVE_STRATEGIES: &[&str] = &[
    "LOAD_GROUPS_BY_MEMBER_ATTRIBUTE",
    "GET_GROUPS_FROM_USER_MEMBEROF_ATTRIBUTE",
    "LOAD_GROUPS_BY_MEMBER_ATTRIBUTE_RECURSIVELY",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LdapGroupMapper {
    pub base: LdapMapperBase,

    pub ldap_groups_dn: String,
    pub group_name_ldap_attribute: String,
    pub group_object_classes: Vec<String>,
    pub preserve_group_inheritance: bool,
    pub ignore_missing_groups: bool,
    pub membership_ldap_attribute: String,
    pub membership_attribute_type: String,
    pub membership_user_ldap_attribute: String,
    pub groups_ldap_filter: String,
    pub mode: String,
    pub user_roles_retrieve_strategy: String,
    pub memberof_ldap_attribute: String,
    pub mapped_group_attributes: Vec<String>,
    pub drop_non_existing_groups_during_sync: bool,
    /// Only understood by Keycloak 11 and later.
    pub groups_path: String,
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl LdapMapper for LdapGroupMapper {
    const PROVIDER_ID: &'static str = "group-ldap-mapper";

    fn base(&self) -> &LdapMapperBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LdapMapperBase {
        &mut self.base
    }

    fn to_component(&self) -> Result<Component> {
        let mut c = self
            .base
            .component(Self::PROVIDER_ID)
            .with_config("groups.dn", &self.ldap_groups_dn)
            .with_config("group.name.ldap.attribute", &self.group_name_ldap_attribute)
            .with_config("group.object.classes", self.group_object_classes.join(", "))
            .with_config("preserve.group.inheritance", self.preserve_group_inheritance)
            .with_config("ignore.missing.groups", self.ignore_missing_groups)
            .with_config("membership.ldap.attribute", &self.membership_ldap_attribute)
            .with_config("membership.attribute.type", &self.membership_attribute_type)
            .with_config(
                "membership.user.ldap.attribute",
                &self.membership_user_ldap_attribute,
            )
            .with_config("mode", &self.mode)
            .with_config("user.roles.retrieve.strategy", &self.user_roles_retrieve_strategy)
            .with_config("memberof.ldap.attribute", &self.memberof_ldap_attribute)
            .with_config(
                "drop.non.existing.groups.during.sync",
                self.drop_non_existing_groups_during_sync,
            );
        if self.groups_ldap_filter.is_empty() {
            c.set_config_list("groups.ldap.filter", Vec::new());
        } else {
            c.set_config("groups.ldap.filter", &self.groups_ldap_filter);
        }
        if self.mapped_group_attributes.is_empty() {
            c.set_config_list("mapped.group.attributes", Vec::new());
        } else {
            c.set_config("mapped.group.attributes", self.mapped_group_attributes.join(", "));
        }
        if !self.groups_path.is_empty() {
            c.set_config("groups.path", &self.groups_path);
        }
        Ok(c)
    }

    fn from_component(component: Component, realm_id: &str) -> Result<Self> {
        Ok(Self {
            base: LdapMapperBase::from_component(&component, realm_id),
            ldap_groups_dn: component.get_config("groups.dn").to_string(),
            group_name_ldap_attribute: component.get_config("group.name.ldap.attribute").to_string(),
            group_object_classes: split_list(component.get_config("group.object.classes")),
            preserve_group_inheritance: component.get_config_bool("preserve.group.inheritance")?,
            ignore_missing_groups: component.get_config_bool("ignore.missing.groups")?,
            membership_ldap_attribute: component.get_config("membership.ldap.attribute").to_string(),
            membership_attribute_type: component.get_config("membership.attribute.type").to_string(),
            membership_user_ldap_attribute: component
                .get_config("membership.user.ldap.attribute")
                .to_string(),
            groups_ldap_filter: component.get_config("groups.ldap.filter").to_string(),
            mode: component.get_config("mode").to_string(),
            user_roles_retrieve_strategy: component
                .get_config("user.roles.retrieve.strategy")
                .to_string(),
            memberof_ldap_attribute: component.get_config("memberof.ldap.attribute").to_string(),
            mapped_group_attributes: split_list(component.get_config("mapped.group.attributes")),
            drop_non_existing_groups_during_sync: component
                .get_config_bool("drop.non.existing.groups.during.sync")?,
            groups_path: component.get_config("groups.path").to_string(),
        })
    }
}

impl Keycloak {
    pub async fn validate_ldap_group_mapper(&self, mapper: &LdapGroupMapper) -> Result<()> {
        if mapper.preserve_group_inheritance && mapper.membership_attribute_type == "UID" {
            return Err(Error::validation(
                "group inheritance cannot be preserved while retrieving membership using UID",
            ));
        }
        if mapper.mode == "LDAP_ONLY" && self.parent_edit_mode(&mapper.base).await? != "WRITABLE" {
            return Err(Error::validation(
                "ldap group mapper cannot use LDAP_ONLY mode unless the ldap provider is writable",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LdapGroupMapper;
    use crate::ldap::LdapMapper;

    #[test]
    fn lists_are_comma_joined() {
        let mapper = LdapGroupMapper {
            group_object_classes: vec!["groupOfNames".into(), "posixGroup".into()],
            mapped_group_attributes: vec![],
            mode: "READ_ONLY".into(),
            ..Default::default()
        };
        let c = mapper.to_component().unwrap();
        assert_eq!(c.get_config("group.object.classes"), "groupOfNames, posixGroup");
        assert!(c.get_config_list("mapped.group.attributes").is_empty());
        assert!(c.get_config_ok("groups.path").is_none());

        let back = LdapGroupMapper::from_component(c, "test").unwrap();
        assert_eq!(back.group_object_classes, mapper.group_object_classes);
        assert!(back.mapped_group_attributes.is_empty());
    }
}
