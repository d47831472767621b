use std::{collections::BTreeMap, sync::Arc};

const DEFAULT_REALM: &str = "master";
const DEFAULT_CLIENT_TIMEOUT: u64 = 15;

#[derive(Default)]
pub struct ConfigBuilder<'a> {
    prefix: Option<&'a str>,
}

impl<'a> ConfigBuilder<'a> {
    pub fn with_prefix(mut self, prefix: &'a str) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn build(self) -> envy::Result<Config> {
        let mut cfg: Config = if let Some(prefix) = self.prefix {
            envy::prefixed(prefix)
        } else {
            envy::prefixed("KEYCLOAK_")
        }
        .from_env()?;
        if cfg.realm.is_none() {
            cfg.realm = Some(DEFAULT_REALM.into());
        }
        if cfg.initial_login.is_none() {
            cfg.initial_login = Some(true);
        }
        if cfg.client_timeout.is_none() {
            cfg.client_timeout = Some(DEFAULT_CLIENT_TIMEOUT);
        }
        if let Some(url) = cfg.url.as_deref() {
            cfg.url = Some(Arc::from(url.trim_end_matches('/')));
        }
        Ok(cfg)
    }
}

/// Connection settings for the Keycloak admin API.
///
/// Read from `KEYCLOAK_*` environment variables; every field can be
/// overridden through the `with_*` setters before the client is built.
#[derive(Clone, serde::Deserialize, Debug, Default)]
pub struct Config {
    url: Option<Arc<str>>,
    base_path: Option<Arc<str>>,
    client_id: Option<Arc<str>>,
    client_secret: Option<Arc<str>>,
    user: Option<Arc<str>>,
    password: Option<Arc<str>>,
    realm: Option<Arc<str>>,
    initial_login: Option<bool>,
    client_timeout: Option<u64>,
    red_hat_sso: Option<bool>,
    user_agent: Option<Arc<str>>,
    #[serde(skip)]
    additional_headers: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> envy::Result<Self> {
        ConfigBuilder::default().build()
    }

    pub fn builder<'a>() -> ConfigBuilder<'a> {
        ConfigBuilder::default()
    }

    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or("http://127.0.0.1:8080")
    }

    pub fn base_path(&self) -> &str {
        self.base_path.as_deref().unwrap_or_default()
    }

    pub fn client_id(&self) -> &str {
        self.client_id.as_deref().unwrap_or("admin-cli")
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref().filter(|s| !s.is_empty())
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_deref().filter(|s| !s.is_empty())
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|s| !s.is_empty())
    }

    pub fn realm(&self) -> &str {
        self.realm.as_deref().unwrap_or(DEFAULT_REALM)
    }

    pub fn initial_login(&self) -> bool {
        self.initial_login.unwrap_or(true)
    }

    pub fn client_timeout(&self) -> u64 {
        self.client_timeout.unwrap_or(DEFAULT_CLIENT_TIMEOUT)
    }

    pub fn red_hat_sso(&self) -> bool {
        self.red_hat_sso.unwrap_or_default()
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .unwrap_or(concat!("kcp/", env!("CARGO_PKG_VERSION")))
    }

    pub fn additional_headers(&self) -> &BTreeMap<String, String> {
        &self.additional_headers
    }

    /// Base of every admin endpoint, e.g. `http://localhost:8080/auth/admin`.
    pub fn admin_url(&self) -> String {
        format!("{}{}/admin", self.url(), self.base_path())
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}{}/realms/{}/protocol/openid-connect/token",
            self.url(),
            self.base_path(),
            self.realm()
        )
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(Arc::from(url.trim_end_matches('/')));
        self
    }

    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = Some(Arc::from(base_path));
        self
    }

    pub fn with_client_id(mut self, client_id: &str) -> Self {
        self.client_id = Some(Arc::from(client_id));
        self
    }

    pub fn with_client_secret(mut self, client_secret: &str) -> Self {
        self.client_secret = Some(Arc::from(client_secret));
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.user = Some(Arc::from(username));
        self.password = Some(Arc::from(password));
        self
    }

    pub fn with_realm(mut self, realm: &str) -> Self {
        self.realm = Some(Arc::from(realm));
        self
    }

    pub fn with_initial_login(mut self, initial_login: bool) -> Self {
        self.initial_login = Some(initial_login);
        self
    }

    pub fn with_client_timeout(mut self, seconds: u64) -> Self {
        self.client_timeout = Some(seconds);
        self
    }

    pub fn with_red_hat_sso(mut self, red_hat_sso: bool) -> Self {
        self.red_hat_sso = Some(red_hat_sso);
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(Arc::from(user_agent));
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.additional_headers
            .insert(name.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn parse_builtin_config_test() -> envy::Result<()> {
        let cfg = super::Config::builder()
            .with_prefix("DEFAULT_KEYCLOAK_NOT_SET_IN_SHELL_")
            .build()?;
        assert_eq!(cfg.realm(), "master");
        assert_eq!(cfg.client_timeout(), 15);
        assert!(cfg.initial_login());
        assert!(!cfg.red_hat_sso());
        assert_eq!(cfg.base_path(), "");
        Ok(())
    }

    #[test]
    fn parse_prefixed_config_test() -> envy::Result<()> {
        std::env::set_var("KCP_TEST_CUSTOM_URL", "http://keycloak.local:8080/");
        std::env::set_var("KCP_TEST_CUSTOM_BASE_PATH", "/auth");
        std::env::set_var("KCP_TEST_CUSTOM_REALM", "tenant");
        std::env::set_var("KCP_TEST_CUSTOM_CLIENT_TIMEOUT", "30");
        let cfg = super::Config::builder()
            .with_prefix("KCP_TEST_CUSTOM_")
            .build()?;
        assert_eq!(cfg.url(), "http://keycloak.local:8080");
        assert_eq!(cfg.admin_url(), "http://keycloak.local:8080/auth/admin");
        assert_eq!(
            cfg.token_url(),
            "http://keycloak.local:8080/auth/realms/tenant/protocol/openid-connect/token"
        );
        assert_eq!(cfg.client_timeout(), 30);
        Ok(())
    }

    #[test]
    fn empty_secrets_are_treated_as_unset() {
        let cfg = super::Config::default()
            .with_client_secret("")
            .with_credentials("", "");
        assert!(cfg.client_secret().is_none());
        assert!(cfg.username().is_none());
        assert!(cfg.password().is_none());
    }
}
