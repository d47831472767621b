//! # kcp-keycloak
//!
//! Typed client for the Keycloak Admin REST API. [`Keycloak`] owns the HTTP
//! client and the admin session; every Keycloak object gets a model that
//! mirrors its JSON representation and a `new_*`/`get_*`/`update_*`/`delete_*`
//! method set on the handle.
//!
//! The connection is configured from `KEYCLOAK_` prefixed environment
//! variables, see [`config::Config`].
mod client;

pub use client::*;
pub mod authorization;
pub mod component;
pub mod config;
pub mod duration;
pub mod error;
pub mod group;
pub mod identity_provider;
pub mod identity_provider_mapper;
pub mod ldap;
pub mod openid_client;
pub mod protocol_mapper;
pub mod realm;
pub mod role;
pub mod server_info;
pub mod session;
pub mod types;

pub use error::{Error, Result};
pub use server_info::KeycloakVersion;
