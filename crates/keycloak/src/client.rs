use std::{collections::BTreeMap, future::Future, sync::Arc, time::Duration};

use keycloak::{DefaultResponse, KeycloakAdmin};
pub use keycloak::KeycloakError;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, LOCATION},
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::OnceCell;

use crate::{
    error::{Error, Result},
    session::{KeycloakSession, KeycloakSessionClient},
};

pub use crate::config::Config as KeycloakConfig;

async fn error_check(response: reqwest::Response) -> std::result::Result<reqwest::Response, KeycloakError> {
    if !response.status().is_success() {
        let status = response.status().into();
        let text = response.text().await.unwrap_or_default();
        return Err(KeycloakError::HttpFailure {
            status,
            body: serde_json::from_str(&text).ok(),
            text,
        });
    }

    Ok(response)
}

/// Returns the last path segment of a `Location` header, which is the id of
/// the object Keycloak just created.
pub fn id_from_location(location: &str) -> Option<&str> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
}

/// Id of the object created by a generated admin call.
pub(crate) fn created_id(response: &DefaultResponse, what: &str) -> Result<String> {
    response
        .as_ref()
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(id_from_location)
        .map(str::to_string)
        .ok_or_else(|| Error::Other(format!("create {what}: missing location header")))
}

struct Inner {
    config: KeycloakConfig,
    admin_url: String,
    client: reqwest::Client,
    session: KeycloakSession,
    admin: KeycloakAdmin<KeycloakSession>,
    version: OnceCell<semver::Version>,
}

#[derive(Default)]
pub struct KeycloakBuilder {
    config: Option<KeycloakConfig>,
    env_prefix: Option<&'static str>,
}

impl KeycloakBuilder {
    pub fn with_config(mut self, config: KeycloakConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_env_prefix(mut self, prefix: &'static str) -> Self {
        self.env_prefix = Some(prefix);
        self
    }

    pub async fn build(self) -> Result<Keycloak> {
        let config = match self.config {
            Some(config) => config,
            None => {
                let mut config_builder = KeycloakConfig::builder();
                if let Some(prefix) = self.env_prefix {
                    config_builder = config_builder.with_prefix(prefix);
                }
                config_builder.build()?
            }
        };
        let mut headers = HeaderMap::new();
        for (name, value) in config.additional_headers() {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| Error::Other(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| Error::Other(format!("invalid header value for {name}: {e}")))?;
            headers.insert(name, value);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.client_timeout()))
            .user_agent(config.user_agent())
            .default_headers(headers)
            .build()
            .map_err(KeycloakError::ReqwestFailure)?;
        let session_client = KeycloakSessionClient::new(&config, client.clone())?;
        let session = KeycloakSession::new(session_client, config.initial_login()).await?;
        let admin = KeycloakAdmin::new(
            &format!("{}{}", config.url(), config.base_path()),
            session.clone(),
            client.clone(),
        );
        Ok(Keycloak {
            inner: Arc::new(Inner {
                admin_url: config.admin_url(),
                config,
                client,
                session,
                admin,
                version: OnceCell::new(),
            }),
        })
    }
}

/// Handle to the Keycloak admin API. Cloning is cheap; clones share the
/// session and the cached server version.
#[derive(Clone)]
pub struct Keycloak {
    inner: Arc<Inner>,
}

impl Keycloak {
    pub fn builder() -> KeycloakBuilder {
        KeycloakBuilder::default()
    }

    pub async fn new() -> Result<Self> {
        KeycloakBuilder::default().build().await
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.inner.client
    }

    pub fn config(&self) -> &KeycloakConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &KeycloakSession {
        &self.inner.session
    }

    pub fn default_realm(&self) -> &str {
        self.inner.config.realm()
    }

    pub(crate) fn version_cell(&self) -> &OnceCell<semver::Version> {
        &self.inner.version
    }

    /// Runs a generated admin call. A 401 refreshes the session once and
    /// repeats the call with the new token.
    pub(crate) async fn call<'a, T, F, Fut>(&'a self, op: F) -> Result<T>
    where
        F: Fn(&'a KeycloakAdmin<KeycloakSession>) -> Fut,
        Fut: Future<Output = std::result::Result<T, KeycloakError>>,
    {
        let token = self.inner.session.access_token().await?;
        let result = match op(&self.inner.admin).await {
            Err(KeycloakError::HttpFailure { status: 401, .. }) => {
                self.inner.session.refresh(&token).await?;
                op(&self.inner.admin).await
            }
            result => result,
        };
        result.map_err(|e| {
            if !matches!(e, KeycloakError::HttpFailure { status: 404, .. }) {
                tracing::error!("{e:#?}");
            }
            Error::from(e)
        })
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{path}", self.inner.admin_url);
        let mut token = self.inner.session.access_token().await?;
        let mut retried = false;
        loop {
            let mut request = self
                .inner
                .client
                .request(method.clone(), &url)
                .bearer_auth(&token);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await.map_err(KeycloakError::ReqwestFailure)?;
            if response.status() == reqwest::StatusCode::UNAUTHORIZED && !retried {
                retried = true;
                token = self.inner.session.refresh(&token).await?;
                continue;
            }
            return error_check(response).await.map_err(|e| {
                if !matches!(e, KeycloakError::HttpFailure { status: 404, .. }) {
                    tracing::error!("{method} {url}: {e:#?}");
                }
                Error::from(e)
            });
        }
    }

    pub async fn get<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.get_with_query(path, &[]).await
    }

    pub async fn get_with_query<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let bytes = self
            .send::<()>(Method::GET, path, query, None)
            .await?
            .bytes()
            .await
            .map_err(KeycloakError::ReqwestFailure)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!("GET {path}: {e:#?}");
            Error::from(e)
        })
    }

    /// POSTs `body` and decodes the created object from the response body.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self
            .send(Method::POST, path, &[], Some(body))
            .await?
            .bytes()
            .await
            .map_err(KeycloakError::ReqwestFailure)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn put<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.send(Method::PUT, path, &[], Some(body)).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send::<()>(Method::DELETE, path, &[], None).await?;
        Ok(())
    }
}

/// Percent-encodes a path segment for the admin calls the generated API
/// does not cover.
pub(crate) fn encode(segment: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(segment)
}

/// Attribute maps are `name -> [values]` on the wire.
pub type Attributes = BTreeMap<String, Vec<String>>;

/// Joins multi-valued attributes with `##` for flat string maps.
pub fn flatten_attributes(attributes: &Attributes) -> BTreeMap<String, String> {
    attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.join("##")))
        .collect()
}

pub fn expand_attributes(attributes: &BTreeMap<String, String>) -> Attributes {
    attributes
        .iter()
        .map(|(k, v)| {
            let values = if v.is_empty() {
                vec![]
            } else {
                v.split("##").map(str::to_string).collect()
            };
            (k.clone(), values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{encode, expand_attributes, flatten_attributes, id_from_location};

    #[test]
    fn id_is_last_location_segment() {
        assert_eq!(
            id_from_location("http://localhost:8080/admin/realms/test/groups/5f1c"),
            Some("5f1c")
        );
        assert_eq!(
            id_from_location("http://localhost:8080/admin/realms/test/components/abc/"),
            Some("abc")
        );
        assert_eq!(id_from_location(""), None);
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(encode("my realm"), "my%20realm");
        assert_eq!(encode("a/b"), "a%2Fb");
        assert_eq!(encode("plain-name_1.0"), "plain-name_1.0");
    }

    #[test]
    fn multivalued_attributes() {
        let attributes = BTreeMap::from([
            ("a".to_string(), vec!["x".to_string(), "y".to_string()]),
            ("b".to_string(), vec![]),
        ]);
        let flat = flatten_attributes(&attributes);
        assert_eq!(flat["a"], "x##y");
        assert_eq!(flat["b"], "");
        assert_eq!(expand_attributes(&flat), attributes);
    }
}
