use std::collections::BTreeMap;

use kcp_keycloak::{config::Config, Keycloak};
use serde_json::{Map, Value};

use crate::{
    data::ResourceData,
    data_sources,
    error::{ProviderError, Result},
    resource::{handle_not_found, DataSource, Resource},
    resources,
    schema::{Attribute, Schema},
};

/// Registry of every resource and data source type plus the configured
/// Keycloak handle the lifecycle calls run against.
pub struct Provider {
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
    keycloak: Option<Keycloak>,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider {
    pub fn new() -> Self {
        Self {
            resources: resources::all().into_iter().collect(),
            data_sources: data_sources::all().into_iter().collect(),
            keycloak: None,
        }
    }

    /// Provider configuration. Every key falls back to its `KEYCLOAK_`
    /// environment variable.
    pub fn schema() -> Schema {
        Schema::new()
            .attr("url", Attribute::string().optional().description("The base URL of the Keycloak instance, before `/auth`"))
            .attr("base_path", Attribute::string().optional())
            .attr("client_id", Attribute::string().optional())
            .attr("client_secret", Attribute::string().optional().sensitive())
            .attr("username", Attribute::string().optional())
            .attr("password", Attribute::string().optional().sensitive())
            .attr("realm", Attribute::string().optional())
            .attr("initial_login", Attribute::bool().optional().description("Whether or not to login to Keycloak instance on provider initialization"))
            .attr("client_timeout", Attribute::int().optional().description("Timeout (in seconds) of the Keycloak client"))
            .attr("red_hat_sso", Attribute::bool().optional().description("When true, the provider will treat the Keycloak instance as a Red Hat SSO server, specifically when parsing the version returned from the /serverinfo API endpoint."))
            .attr("additional_headers", Attribute::string_map().optional())
    }

    /// Builds the Keycloak handle from the provider configuration.
    pub async fn configure(&mut self, config: &Map<String, Value>) -> Result<()> {
        Self::schema().validate(config)?;
        let data = ResourceData::new(config.clone());
        let mut cfg = Config::new().map_err(kcp_keycloak::Error::from)?;
        if let Some(url) = data.get_ok("url").and_then(Value::as_str) {
            cfg = cfg.with_url(url.trim_end_matches('/'));
        }
        if let Some(base_path) = data.get_ok("base_path").and_then(Value::as_str) {
            cfg = cfg.with_base_path(base_path);
        }
        if let Some(client_id) = data.get_ok("client_id").and_then(Value::as_str) {
            cfg = cfg.with_client_id(client_id);
        }
        if let Some(secret) = data.get_ok("client_secret").and_then(Value::as_str) {
            cfg = cfg.with_client_secret(secret);
        }
        if data.get_ok("username").is_some() || data.get_ok("password").is_some() {
            cfg = cfg.with_credentials(data.get_str("username"), data.get_str("password"));
        }
        if let Some(realm) = data.get_ok("realm").and_then(Value::as_str) {
            cfg = cfg.with_realm(realm);
        }
        if let Some(initial_login) = data.get("initial_login").and_then(Value::as_bool) {
            cfg = cfg.with_initial_login(initial_login);
        }
        if let Some(timeout) = data.get("client_timeout").and_then(Value::as_u64) {
            cfg = cfg.with_client_timeout(timeout);
        }
        if let Some(red_hat_sso) = data.get("red_hat_sso").and_then(Value::as_bool) {
            cfg = cfg.with_red_hat_sso(red_hat_sso);
        }
        for (name, value) in data.get_string_map("additional_headers") {
            cfg = cfg.with_header(&name, &value);
        }
        let keycloak = Keycloak::builder().with_config(cfg).build().await?;
        self.keycloak = Some(keycloak);
        Ok(())
    }

    pub fn with_keycloak(mut self, keycloak: Keycloak) -> Self {
        self.keycloak = Some(keycloak);
        self
    }

    pub fn keycloak(&self) -> Result<&Keycloak> {
        self.keycloak.as_ref().ok_or(ProviderError::NotConfigured)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }

    pub fn resource(&self, type_name: &str) -> Result<&dyn Resource> {
        self.resources
            .get(type_name)
            .map(|boxed| boxed.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    pub fn data_source(&self, type_name: &str) -> Result<&dyn DataSource> {
        self.data_sources
            .get(type_name)
            .map(|boxed| boxed.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// Applies defaults and checks the configuration against the schema.
    pub fn plan(&self, type_name: &str, config: &Map<String, Value>) -> Result<Map<String, Value>> {
        let schema = self.resource(type_name)?.schema();
        let mut config = config.clone();
        schema.apply_defaults(&mut config);
        schema.validate(&config)?;
        Ok(config)
    }

    /// Whether moving from `state` to `config` changes an attribute that
    /// cannot be updated in place.
    pub fn requires_replacement(
        &self,
        type_name: &str,
        state: &ResourceData,
        config: &Map<String, Value>,
    ) -> Result<bool> {
        let schema = self.resource(type_name)?.schema();
        Ok(schema
            .force_new_attributes()
            .into_iter()
            .any(|name| state.get(name) != config.get(name).filter(|v| !v.is_null())))
    }

    pub async fn create(&self, type_name: &str, config: &Map<String, Value>) -> Result<ResourceData> {
        let resource = self.resource(type_name)?;
        let keycloak = self.keycloak()?;
        let mut data = ResourceData::new(self.plan(type_name, config)?);
        resource.validate(keycloak, &data).await?;
        resource.create(keycloak, &mut data).await?;
        tracing::debug!("created {type_name} {}", data.id());
        if let Err(err) = resource.read(keycloak, &mut data).await {
            handle_not_found(err, &mut data)?;
        }
        Ok(data)
    }

    /// Refreshes `state` from the server. A removed object comes back with
    /// an empty id.
    pub async fn read(&self, type_name: &str, mut state: ResourceData) -> Result<ResourceData> {
        let resource = self.resource(type_name)?;
        let keycloak = self.keycloak()?;
        if let Err(err) = resource.read(keycloak, &mut state).await {
            handle_not_found(err, &mut state)?;
        }
        Ok(state)
    }

    pub async fn update(
        &self,
        type_name: &str,
        state: ResourceData,
        config: &Map<String, Value>,
    ) -> Result<ResourceData> {
        let resource = self.resource(type_name)?;
        let keycloak = self.keycloak()?;
        let schema = resource.schema();
        let mut attributes = self.plan(type_name, config)?;
        for (name, attribute) in schema.iter() {
            if attribute.computed && !attributes.contains_key(name) {
                if let Some(value) = state.get(name) {
                    attributes.insert(name.to_string(), value.clone());
                }
            }
        }
        let mut data = ResourceData::new(attributes).with_id(state.id());
        resource.validate(keycloak, &data).await?;
        resource.update(keycloak, &mut data).await?;
        tracing::debug!("updated {type_name} {}", data.id());
        Ok(data)
    }

    /// Deletes the object. An object that is already gone counts as
    /// deleted.
    pub async fn delete(&self, type_name: &str, state: ResourceData) -> Result<()> {
        let resource = self.resource(type_name)?;
        let keycloak = self.keycloak()?;
        let mut state = state;
        match resource.delete(keycloak, &state).await {
            Ok(()) => Ok(()),
            Err(err) => handle_not_found(err, &mut state),
        }
    }

    pub async fn import(&self, type_name: &str, import_id: &str) -> Result<ResourceData> {
        let resource = self.resource(type_name)?;
        let keycloak = self.keycloak()?;
        let mut data = resource
            .import(keycloak, import_id)
            .await
            .map_err(|err| match err {
                ProviderError::ImportNotSupported(_) => {
                    ProviderError::ImportNotSupported(type_name.to_string())
                }
                other => other,
            })?;
        resource.read(keycloak, &mut data).await?;
        Ok(data)
    }

    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: &Map<String, Value>,
    ) -> Result<ResourceData> {
        let data_source = self.data_source(type_name)?;
        let keycloak = self.keycloak()?;
        let schema = data_source.schema();
        let mut config = config.clone();
        schema.apply_defaults(&mut config);
        schema.validate(&config)?;
        let mut data = ResourceData::new(config);
        data_source.read(keycloak, &mut data).await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Provider;
    use crate::error::ProviderError;

    #[test]
    fn registry_knows_every_type() {
        let provider = Provider::new();
        let resources: Vec<_> = provider.resource_types().collect();
        assert_eq!(resources.len(), 24);
        assert!(resources.contains(&"keycloak_ldap_group_mapper"));
        assert!(resources.contains(&"keycloak_openid_client_time_policy"));
        let data_sources: Vec<_> = provider.data_source_types().collect();
        assert_eq!(data_sources.len(), 5);
        assert!(matches!(
            provider.resource("keycloak_user"),
            Err(ProviderError::UnknownResource(_))
        ));
    }

    #[test]
    fn plan_rejects_bad_configuration() {
        let provider = Provider::new();
        let err = provider
            .plan("keycloak_group", json!({"name": "dev"}).as_object().unwrap())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: realm_id: required attribute is missing"
        );
    }

    #[tokio::test]
    async fn lifecycle_needs_configuration() {
        let provider = Provider::new();
        let err = provider
            .create("keycloak_realm", json!({"realm": "test"}).as_object().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));
    }
}
