//! # kcp-provider
//!
//! Declarative resources for Keycloak. Each resource type declares a
//! [`schema::Schema`] and implements [`resource::Resource`] by converting its
//! [`data::ResourceData`] into a `kcp-keycloak` model, calling the client
//! and writing the result back. [`provider::Provider`] registers all of them
//! and runs the create/read/update/delete/import lifecycle.

pub mod data;
pub mod data_sources;
pub mod duration;
pub mod error;
pub mod extra_config;
pub mod import;
pub mod provider;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod validation;

pub use data::ResourceData;
pub use error::{ProviderError, Result};
pub use provider::Provider;
pub use resource::{handle_not_found, DataSource, Resource};
