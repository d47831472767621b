#[cfg(feature = "keycloak")]
pub use kcp_keycloak as keycloak;

#[cfg(feature = "provider")]
pub use kcp_provider as provider;
