use kcp_keycloak::{
    ldap::{
        LdapFullNameMapper, LdapGroupMapper, LdapHardcodedGroupMapper, LdapHardcodedRoleMapper,
        LdapMapper, LdapMapperBase, LdapMsadUserAccountControlMapper, LdapUserAttributeMapper,
        GROUP_MAPPER_MEMBERSHIP_ATTRIBUTE_TYPES, GROUP_MAPPER_MODES,
        GROUP_MAPPER_USER_ROLES_RETRIEVE_STRATEGIES,
    },
    Keycloak, KeycloakVersion,
};
use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    data::ResourceData,
    error::Result,
    import::parse_mapper_import_id,
    resource::Resource,
    schema::{Attribute, Schema},
    validation::Validator,
};

lazy_static! {
    static ref LDAP_FILTER: Regex = Regex::new(r"\(.+\)").expect("valid ldap filter pattern");
}

/// Conversion between the attribute bag and one typed LDAP mapper.
#[async_trait::async_trait]
pub trait LdapMapperKind: Send + Sync {
    type Mapper: LdapMapper + Send + Sync;

    fn extend_schema(schema: Schema) -> Schema;

    async fn from_data(keycloak: &Keycloak, data: &ResourceData, base: LdapMapperBase) -> Result<Self::Mapper>;

    fn set_data(data: &mut ResourceData, mapper: &Self::Mapper);

    async fn validate(_keycloak: &Keycloak, _mapper: &Self::Mapper) -> Result<()> {
        Ok(())
    }
}

fn ldap_mapper_schema() -> Schema {
    Schema::new()
        .attr("name", Attribute::string().required().description("Display name of the mapper when displayed in the console."))
        .attr("realm_id", Attribute::string().required().force_new())
        .attr("ldap_user_federation_id", Attribute::string().required().force_new())
}

fn get_base_from_data(data: &ResourceData) -> LdapMapperBase {
    LdapMapperBase {
        id: data.id().to_string(),
        name: data.get_string("name"),
        realm_id: data.get_string("realm_id"),
        ldap_user_federation_id: data.get_string("ldap_user_federation_id"),
    }
}

fn set_base_data(data: &mut ResourceData, base: &LdapMapperBase) {
    data.set_id(&base.id);
    data.set("name", base.name.as_str());
    data.set("realm_id", base.realm_id.as_str());
    data.set("ldap_user_federation_id", base.ldap_user_federation_id.as_str());
}

pub struct LdapMapperResource<K>(std::marker::PhantomData<K>);

impl<K> Default for LdapMapperResource<K> {
    fn default() -> Self {
        Self(std::marker::PhantomData)
    }
}

#[async_trait::async_trait]
impl<K: LdapMapperKind + 'static> Resource for LdapMapperResource<K> {
    fn schema(&self) -> Schema {
        K::extend_schema(ldap_mapper_schema())
    }

    async fn validate(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        let mapper = K::from_data(keycloak, data, get_base_from_data(data)).await?;
        K::validate(keycloak, &mapper).await
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mut mapper = K::from_data(keycloak, data, get_base_from_data(data)).await?;
        keycloak.new_ldap_mapper(&mut mapper).await?;
        data.set_id(&mapper.base().id);
        Ok(())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mapper: K::Mapper = keycloak
            .get_ldap_mapper(data.get_str("realm_id"), data.id())
            .await?;
        set_base_data(data, mapper.base());
        K::set_data(data, &mapper);
        Ok(())
    }

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mapper = K::from_data(keycloak, data, get_base_from_data(data)).await?;
        keycloak.update_ldap_mapper(&mapper).await?;
        set_base_data(data, mapper.base());
        K::set_data(data, &mapper);
        Ok(())
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak
            .delete_ldap_mapper(data.get_str("realm_id"), data.id())
            .await?)
    }

    async fn import(&self, keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        let id = parse_mapper_import_id(import_id, keycloak.default_realm())?;
        let mut data = ResourceData::default().with_id(id.id);
        data.set("realm_id", id.realm);
        data.set("ldap_user_federation_id", id.parent_id);
        Ok(data)
    }
}

pub struct FullName;

#[async_trait::async_trait]
impl LdapMapperKind for FullName {
    type Mapper = LdapFullNameMapper;

    fn extend_schema(schema: Schema) -> Schema {
        schema
            .attr("ldap_full_name_attribute", Attribute::string().required())
            .attr("read_only", Attribute::bool().default(false))
            .attr("write_only", Attribute::bool().default(false))
    }

    async fn from_data(_keycloak: &Keycloak, data: &ResourceData, base: LdapMapperBase) -> Result<Self::Mapper> {
        Ok(LdapFullNameMapper {
            base,
            ldap_full_name_attribute: data.get_string("ldap_full_name_attribute"),
            read_only: data.get_bool("read_only"),
            write_only: data.get_bool("write_only"),
        })
    }

    fn set_data(data: &mut ResourceData, mapper: &Self::Mapper) {
        data.set("ldap_full_name_attribute", mapper.ldap_full_name_attribute.as_str());
        data.set("read_only", mapper.read_only);
        data.set("write_only", mapper.write_only);
    }

    async fn validate(keycloak: &Keycloak, mapper: &Self::Mapper) -> Result<()> {
        Ok(keycloak.validate_ldap_full_name_mapper(mapper).await?)
    }
}

pub struct UserAttribute;

#[async_trait::async_trait]
impl LdapMapperKind for UserAttribute {
    type Mapper = LdapUserAttributeMapper;

    fn extend_schema(schema: Schema) -> Schema {
        schema
            .attr("user_model_attribute", Attribute::string().required())
            .attr("ldap_attribute", Attribute::string().required())
            .attr("read_only", Attribute::bool().default(false))
            .attr("always_read_value_from_ldap", Attribute::bool().default(false))
            .attr("is_mandatory_in_ldap", Attribute::bool().default(false))
            .attr("attribute_default_value", Attribute::string().optional())
            .attr("is_binary_attribute", Attribute::bool().default(false))
    }

    async fn from_data(_keycloak: &Keycloak, data: &ResourceData, base: LdapMapperBase) -> Result<Self::Mapper> {
        Ok(LdapUserAttributeMapper {
            base,
            ldap_attribute: data.get_string("ldap_attribute"),
            is_mandatory_in_ldap: data.get_bool("is_mandatory_in_ldap"),
            read_only: data.get_bool("read_only"),
            always_read_value_from_ldap: data.get_bool("always_read_value_from_ldap"),
            user_model_attribute: data.get_string("user_model_attribute"),
            attribute_default_value: data.get_string("attribute_default_value"),
            is_binary_attribute: data.get_bool("is_binary_attribute"),
        })
    }

    fn set_data(data: &mut ResourceData, mapper: &Self::Mapper) {
        data.set("ldap_attribute", mapper.ldap_attribute.as_str());
        data.set("is_mandatory_in_ldap", mapper.is_mandatory_in_ldap);
        data.set("read_only", mapper.read_only);
        data.set("always_read_value_from_ldap", mapper.always_read_value_from_ldap);
        data.set("user_model_attribute", mapper.user_model_attribute.as_str());
        data.set("attribute_default_value", mapper.attribute_default_value.as_str());
        data.set("is_binary_attribute", mapper.is_binary_attribute);
    }
}

pub struct Group;

#[async_trait::async_trait]
impl LdapMapperKind for Group {
    type Mapper = LdapGroupMapper;

    fn extend_schema(schema: Schema) -> Schema {
        schema
            .attr("ldap_groups_dn", Attribute::string().required())
            .attr("group_name_ldap_attribute", Attribute::string().required())
            .attr("group_object_classes", Attribute::string_list().required().min_items(1))
            .attr("preserve_group_inheritance", Attribute::bool().default(true))
            .attr("ignore_missing_groups", Attribute::bool().default(false))
            .attr("membership_ldap_attribute", Attribute::string().required())
            .attr(
                "membership_attribute_type",
                Attribute::string()
                    .default("DN")
                    .validate(Validator::string_in_slice(GROUP_MAPPER_MEMBERSHIP_ATTRIBUTE_TYPES)),
            )
            .attr("membership_user_ldap_attribute", Attribute::string().required())
            .attr(
                "groups_ldap_filter",
                Attribute::string().optional().validate(Validator::string_match(
                    &LDAP_FILTER,
                    "validation error: groups ldap filter must start with '(' and end with ')'",
                )),
            )
            .attr(
                "mode",
                Attribute::string()
                    .default("READ_ONLY")
                    .validate(Validator::string_in_slice(GROUP_MAPPER_MODES)),
            )
            .attr(
                "user_roles_retrieve_strategy",
                Attribute::string()
                    .default("LOAD_GROUPS_BY_MEMBER_ATTRIBUTE")
                    .validate(Validator::string_in_slice(GROUP_MAPPER_USER_ROLES_RETRIEVE_STRATEGIES)),
            )
            .attr("memberof_ldap_attribute", Attribute::string().default("memberOf"))
            .attr("mapped_group_attributes", Attribute::string_list().optional())
            .attr("drop_non_existing_groups_during_sync", Attribute::bool().default(false))
            .attr("groups_path", Attribute::string().optional().computed())
    }

    /// `groups_path` only exists from Keycloak 11 on and is dropped for
    /// older servers.
    async fn from_data(keycloak: &Keycloak, data: &ResourceData, base: LdapMapperBase) -> Result<Self::Mapper> {
        let groups_path = if keycloak
            .version_is_greater_than_or_equal_to(KeycloakVersion::V11)
            .await?
        {
            data.get_string("groups_path")
        } else {
            String::new()
        };
        Ok(LdapGroupMapper {
            base,
            ldap_groups_dn: data.get_string("ldap_groups_dn"),
            group_name_ldap_attribute: data.get_string("group_name_ldap_attribute"),
            group_object_classes: data.get_string_list("group_object_classes"),
            preserve_group_inheritance: data.get_bool("preserve_group_inheritance"),
            ignore_missing_groups: data.get_bool("ignore_missing_groups"),
            membership_ldap_attribute: data.get_string("membership_ldap_attribute"),
            membership_attribute_type: data.get_string("membership_attribute_type"),
            membership_user_ldap_attribute: data.get_string("membership_user_ldap_attribute"),
            groups_ldap_filter: data.get_string("groups_ldap_filter"),
            mode: data.get_string("mode"),
            user_roles_retrieve_strategy: data.get_string("user_roles_retrieve_strategy"),
            memberof_ldap_attribute: data.get_string("memberof_ldap_attribute"),
            mapped_group_attributes: data.get_string_list("mapped_group_attributes"),
            drop_non_existing_groups_during_sync: data.get_bool("drop_non_existing_groups_during_sync"),
            groups_path,
        })
    }

    fn set_data(data: &mut ResourceData, mapper: &Self::Mapper) {
        data.set("ldap_groups_dn", mapper.ldap_groups_dn.as_str());
        data.set("group_name_ldap_attribute", mapper.group_name_ldap_attribute.as_str());
        data.set("group_object_classes", mapper.group_object_classes.clone());
        data.set("preserve_group_inheritance", mapper.preserve_group_inheritance);
        data.set("ignore_missing_groups", mapper.ignore_missing_groups);
        data.set("membership_ldap_attribute", mapper.membership_ldap_attribute.as_str());
        data.set("membership_attribute_type", mapper.membership_attribute_type.as_str());
        data.set("membership_user_ldap_attribute", mapper.membership_user_ldap_attribute.as_str());
        data.set("groups_ldap_filter", mapper.groups_ldap_filter.as_str());
        data.set("mode", mapper.mode.as_str());
        data.set("user_roles_retrieve_strategy", mapper.user_roles_retrieve_strategy.as_str());
        data.set("memberof_ldap_attribute", mapper.memberof_ldap_attribute.as_str());
        data.set("mapped_group_attributes", mapper.mapped_group_attributes.clone());
        data.set(
            "drop_non_existing_groups_during_sync",
            mapper.drop_non_existing_groups_during_sync,
        );
        // older servers never report a path; keep whatever the plan said
        if !mapper.groups_path.is_empty() {
            data.set("groups_path", mapper.groups_path.as_str());
        }
    }

    async fn validate(keycloak: &Keycloak, mapper: &Self::Mapper) -> Result<()> {
        Ok(keycloak.validate_ldap_group_mapper(mapper).await?)
    }
}

pub struct HardcodedRole;

#[async_trait::async_trait]
impl LdapMapperKind for HardcodedRole {
    type Mapper = LdapHardcodedRoleMapper;

    fn extend_schema(schema: Schema) -> Schema {
        schema.attr("role", Attribute::string().required().description("Role to grant to user."))
    }

    async fn from_data(_keycloak: &Keycloak, data: &ResourceData, base: LdapMapperBase) -> Result<Self::Mapper> {
        Ok(LdapHardcodedRoleMapper {
            base,
            role: data.get_string("role"),
        })
    }

    fn set_data(data: &mut ResourceData, mapper: &Self::Mapper) {
        data.set("role", mapper.role.as_str());
    }

    async fn validate(_keycloak: &Keycloak, mapper: &Self::Mapper) -> Result<()> {
        Ok(mapper.validate()?)
    }
}

pub struct HardcodedGroup;

#[async_trait::async_trait]
impl LdapMapperKind for HardcodedGroup {
    type Mapper = LdapHardcodedGroupMapper;

    fn extend_schema(schema: Schema) -> Schema {
        schema.attr("group", Attribute::string().required().description("Group to add the user in."))
    }

    async fn from_data(_keycloak: &Keycloak, data: &ResourceData, base: LdapMapperBase) -> Result<Self::Mapper> {
        Ok(LdapHardcodedGroupMapper {
            base,
            group: data.get_string("group"),
        })
    }

    fn set_data(data: &mut ResourceData, mapper: &Self::Mapper) {
        data.set("group", mapper.group.as_str());
    }

    async fn validate(_keycloak: &Keycloak, mapper: &Self::Mapper) -> Result<()> {
        Ok(mapper.validate()?)
    }
}

pub struct MsadUserAccountControl;

#[async_trait::async_trait]
impl LdapMapperKind for MsadUserAccountControl {
    type Mapper = LdapMsadUserAccountControlMapper;

    fn extend_schema(schema: Schema) -> Schema {
        schema.attr("ldap_password_policy_hints_enabled", Attribute::bool().default(false))
    }

    async fn from_data(_keycloak: &Keycloak, data: &ResourceData, base: LdapMapperBase) -> Result<Self::Mapper> {
        Ok(LdapMsadUserAccountControlMapper {
            base,
            ldap_password_policy_hints_enabled: data.get_bool("ldap_password_policy_hints_enabled"),
        })
    }

    fn set_data(data: &mut ResourceData, mapper: &Self::Mapper) {
        data.set(
            "ldap_password_policy_hints_enabled",
            mapper.ldap_password_policy_hints_enabled,
        );
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn groups_ldap_filter_needs_parentheses() {
        let schema = Group::extend_schema(ldap_mapper_schema());
        let mut config = json!({
            "name": "groups",
            "realm_id": "test",
            "ldap_user_federation_id": "f1",
            "ldap_groups_dn": "dc=example,dc=org",
            "group_name_ldap_attribute": "cn",
            "group_object_classes": ["groupOfNames"],
            "membership_ldap_attribute": "member",
            "membership_user_ldap_attribute": "cn",
            "groups_ldap_filter": "cn=admins"
        })
        .as_object()
        .cloned()
        .unwrap();
        schema.apply_defaults(&mut config);
        let err = schema.validate(&config).unwrap_err();
        assert!(err
            .to_string()
            .contains("groups ldap filter must start with '(' and end with ')'"));

        config.insert("groups_ldap_filter".into(), json!("(cn=admins)"));
        schema.validate(&config).unwrap();
        assert_eq!(config["memberof_ldap_attribute"], "memberOf");
        assert_eq!(config["preserve_group_inheritance"], true);
    }

    #[test]
    fn base_attributes_round_into_state() {
        let data = ResourceData::from(json!({
            "name": "role",
            "realm_id": "test",
            "ldap_user_federation_id": "f1"
        }))
        .with_id("m1");
        let base = get_base_from_data(&data);
        assert_eq!(base.ldap_user_federation_id, "f1");

        let mut state = ResourceData::default();
        set_base_data(&mut state, &base);
        assert_eq!(state.id(), "m1");
        assert_eq!(state.get_str("realm_id"), "test");
    }
}
