//! Every managed Keycloak object type, keyed by its resource type name.

pub mod authorization;
pub mod authorization_policy;
pub mod group;
pub mod identity_provider;
pub mod identity_provider_mapper;
pub mod ldap_mapper;
pub mod ldap_user_federation;
pub mod openid_client;
pub mod protocol_mapper;
pub mod realm;
pub mod role;

use crate::resource::Resource;

use self::{
    authorization::{
        AuthorizationPermissionResource, AuthorizationResourceResource, AuthorizationScopeResource,
    },
    authorization_policy::{
        AggregatePolicyResource, ClientPolicyResource, GroupPolicyResource, RolePolicyResource,
        TimePolicyResource,
    },
    group::GroupResource,
    identity_provider::OidcIdentityProviderResource,
    identity_provider_mapper::{
        AttributeImporter, Custom, HardcodedAttribute, HardcodedRole, IdentityProviderMapperResource,
        MapperKind,
    },
    ldap_mapper::LdapMapperResource,
    ldap_user_federation::LdapUserFederationResource,
    openid_client::OpenidClientResource,
    protocol_mapper::{Generic, OpenidUserAttribute, ProtocolMapperKind, ProtocolMapperResource},
    realm::RealmResource,
    role::RoleResource,
};

fn entry(name: &'static str, resource: impl Resource + 'static) -> (&'static str, Box<dyn Resource>) {
    (name, Box::new(resource))
}

fn identity_provider_mapper<K: MapperKind + 'static>() -> (&'static str, Box<dyn Resource>) {
    entry(K::TYPE_NAME, IdentityProviderMapperResource::<K>::default())
}

fn protocol_mapper<K: ProtocolMapperKind + 'static>() -> (&'static str, Box<dyn Resource>) {
    entry(K::TYPE_NAME, ProtocolMapperResource::<K>::default())
}

pub fn all() -> Vec<(&'static str, Box<dyn Resource>)> {
    vec![
        entry("keycloak_realm", RealmResource),
        entry("keycloak_role", RoleResource),
        entry("keycloak_group", GroupResource),
        entry("keycloak_openid_client", OpenidClientResource),
        entry("keycloak_oidc_identity_provider", OidcIdentityProviderResource),
        protocol_mapper::<Generic>(),
        protocol_mapper::<OpenidUserAttribute>(),
        identity_provider_mapper::<Custom>(),
        identity_provider_mapper::<HardcodedAttribute>(),
        identity_provider_mapper::<HardcodedRole>(),
        identity_provider_mapper::<AttributeImporter>(),
        entry("keycloak_ldap_user_federation", LdapUserFederationResource),
        entry(
            "keycloak_ldap_full_name_mapper",
            LdapMapperResource::<ldap_mapper::FullName>::default(),
        ),
        entry(
            "keycloak_ldap_user_attribute_mapper",
            LdapMapperResource::<ldap_mapper::UserAttribute>::default(),
        ),
        entry(
            "keycloak_ldap_group_mapper",
            LdapMapperResource::<ldap_mapper::Group>::default(),
        ),
        entry(
            "keycloak_ldap_hardcoded_role_mapper",
            LdapMapperResource::<ldap_mapper::HardcodedRole>::default(),
        ),
        entry(
            "keycloak_ldap_hardcoded_group_mapper",
            LdapMapperResource::<ldap_mapper::HardcodedGroup>::default(),
        ),
        entry(
            "keycloak_ldap_msad_user_account_control_mapper",
            LdapMapperResource::<ldap_mapper::MsadUserAccountControl>::default(),
        ),
        entry("keycloak_openid_client_authorization_resource", AuthorizationResourceResource),
        entry("keycloak_openid_client_authorization_scope", AuthorizationScopeResource),
        entry(
            "keycloak_openid_client_role_policy",
            RolePolicyResource::default(),
        ),
        entry(
            "keycloak_openid_client_group_policy",
            GroupPolicyResource::default(),
        ),
        entry(
            "keycloak_openid_client_aggregate_policy",
            AggregatePolicyResource::default(),
        ),
        entry(
            "keycloak_openid_client_client_policy",
            ClientPolicyResource::default(),
        ),
        entry(
            "keycloak_openid_client_time_policy",
            TimePolicyResource::default(),
        ),
        entry(
            "keycloak_openid_client_authorization_permission",
            AuthorizationPermissionResource,
        ),
    ]
}
