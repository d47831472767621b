//! Read-only lookups of existing objects. Each reuses the schema and the
//! state writer of the matching resource.

mod authorization_policy;
mod group;
mod openid_client;
mod realm;
mod role;

use crate::resource::DataSource;

pub use authorization_policy::AuthorizationPolicyDataSource;
pub use group::GroupDataSource;
pub use openid_client::OpenidClientDataSource;
pub use realm::RealmDataSource;
pub use role::RoleDataSource;

fn entry(name: &'static str, source: impl DataSource + 'static) -> (&'static str, Box<dyn DataSource>) {
    (name, Box::new(source))
}

pub fn all() -> Vec<(&'static str, Box<dyn DataSource>)> {
    vec![
        entry("keycloak_realm", RealmDataSource),
        entry("keycloak_role", RoleDataSource),
        entry("keycloak_group", GroupDataSource),
        entry("keycloak_openid_client", OpenidClientDataSource),
        entry(
            "keycloak_openid_client_authorization_policy",
            AuthorizationPolicyDataSource,
        ),
    ]
}
