use keycloak::KeycloakError;
use keycloak::KeycloakTokenSupplier;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;

#[derive(Debug, Clone)]
pub enum KeycloakSessionError {
    ReqwestFailure(Arc<reqwest::Error>),
    HttpFailure { status: u16, text: Arc<str> },
    Decode(Arc<serde_json::Error>),
    MissingCredentials,
}

impl From<reqwest::Error> for KeycloakSessionError {
    fn from(value: reqwest::Error) -> Self {
        KeycloakSessionError::ReqwestFailure(Arc::new(value))
    }
}

impl std::error::Error for KeycloakSessionError {}
impl std::fmt::Display for KeycloakSessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeycloakSessionError::HttpFailure { status, text } => {
                write!(f, "keycloak login failed with status {status}: {}", text.as_ref())
            }
            KeycloakSessionError::ReqwestFailure(e) => e.fmt(f),
            KeycloakSessionError::Decode(e) => e.fmt(f),
            KeycloakSessionError::MissingCredentials => f.write_str(
                "must specify client id, username and password for password grant, or client secret for client credentials grant",
            ),
        }
    }
}

// Any login failure surfaces as 401 on the admin call that needed the token,
// whatever the token endpoint answered.
impl From<KeycloakSessionError> for KeycloakError {
    fn from(value: KeycloakSessionError) -> Self {
        KeycloakError::HttpFailure {
            status: 401,
            body: None,
            text: value.to_string(),
        }
    }
}

async fn error(response: reqwest::Response) -> Result<reqwest::Response, KeycloakSessionError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await;
        return match text {
            Ok(text) => Err(KeycloakSessionError::HttpFailure {
                status: status.as_u16(),
                text: Arc::from(text),
            }),
            Err(e) => Err(KeycloakSessionError::ReqwestFailure(Arc::new(e))),
        };
    }

    Ok(response)
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct KeycloakSessionToken {
    access_token: Arc<str>,
    expires_in: usize,
    #[serde(default)]
    refresh_expires_in: Option<usize>,
    // client credentials grants come without refresh token
    #[serde(default)]
    refresh_token: Option<Arc<str>>,
    token_type: String,
}

impl KeycloakSessionToken {
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_in(&self) -> usize {
        self.expires_in
    }
}

enum Grant {
    Password { username: String, password: String },
    ClientCredentials,
}

struct KeycloakSessionClientInner {
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
    grant: Grant,
    client: reqwest::Client,
}

/// Talks to the OpenID Connect token endpoint of the configured realm.
#[derive(Clone)]
pub struct KeycloakSessionClient {
    inner: Arc<KeycloakSessionClientInner>,
}

impl KeycloakSessionClient {
    pub fn new(config: &Config, client: reqwest::Client) -> Result<Self, KeycloakSessionError> {
        let grant = match (config.username(), config.password()) {
            (Some(username), Some(password)) => Grant::Password {
                username: username.to_string(),
                password: password.to_string(),
            },
            _ if config.client_secret().is_some() => Grant::ClientCredentials,
            _ => return Err(KeycloakSessionError::MissingCredentials),
        };
        Ok(Self {
            inner: Arc::new(KeycloakSessionClientInner {
                token_url: config.token_url(),
                client_id: config.client_id().to_string(),
                client_secret: config.client_secret().map(str::to_string),
                grant,
                client,
            }),
        })
    }

    async fn token_request(
        &self,
        grant: &[(&str, &str)],
    ) -> Result<KeycloakSessionToken, KeycloakSessionError> {
        let mut form: Vec<(&str, &str)> = grant.to_vec();
        form.push(("client_id", self.inner.client_id.as_str()));
        if let Some(secret) = self.inner.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }
        let result = error(
            self.inner
                .client
                .post(self.inner.token_url.as_str())
                .form(&form)
                .send()
                .await?,
        )
        .await?
        .json::<serde_json::Value>()
        .await?;
        serde_json::from_value(result).map_err(|err| KeycloakSessionError::Decode(Arc::new(err)))
    }

    pub async fn acquire(&self) -> Result<KeycloakSessionToken, KeycloakSessionError> {
        match &self.inner.grant {
            Grant::Password { username, password } => {
                tracing::debug!("acquire session for user {username}");
                self.token_request(&[
                    ("grant_type", "password"),
                    ("username", username.as_str()),
                    ("password", password.as_str()),
                ])
                .await
            }
            Grant::ClientCredentials => {
                tracing::debug!("acquire session for client {}", self.inner.client_id);
                self.token_request(&[("grant_type", "client_credentials")])
                    .await
            }
        }
    }

    pub async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<KeycloakSessionToken, KeycloakSessionError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}

async fn try_refresh(
    keycloak: &KeycloakSessionClient,
    refresh_token: Option<&str>,
) -> Result<KeycloakSessionToken, KeycloakSessionError> {
    let Some(refresh_token) = refresh_token else {
        return keycloak.acquire().await;
    };
    match keycloak.refresh(refresh_token).await {
        Ok(token) => Ok(token),
        Err(KeycloakSessionError::HttpFailure { status: 400, text }) => {
            tracing::warn!("refresh token rejected, logging in again: {text}");
            keycloak.acquire().await
        }
        Err(err) => Err(err),
    }
}

struct KeycloakSessionInner {
    client: KeycloakSessionClient,
    token: RwLock<Option<KeycloakSessionToken>>,
}

/// Holds the current admin token. Login happens on creation or lazily on
/// first use; a rejected token is replaced through [`KeycloakSession::refresh`].
#[derive(Clone)]
pub struct KeycloakSession {
    inner: Arc<KeycloakSessionInner>,
}

impl KeycloakSession {
    pub async fn new(
        client: KeycloakSessionClient,
        initial_login: bool,
    ) -> Result<Self, KeycloakSessionError> {
        let token = if initial_login {
            Some(client.acquire().await?)
        } else {
            None
        };
        Ok(Self {
            inner: Arc::new(KeycloakSessionInner {
                client,
                token: RwLock::new(token),
            }),
        })
    }

    pub async fn access_token(&self) -> Result<Arc<str>, KeycloakSessionError> {
        if let Some(token) = self.inner.token.read().await.as_ref() {
            return Ok(token.access_token.clone());
        }
        let mut guard = self.inner.token.write().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.access_token.clone());
        }
        let token = self.inner.client.acquire().await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }

    /// Replaces the token after the server rejected `rejected`. Concurrent
    /// callers holding the same stale token share one refresh.
    pub async fn refresh(&self, rejected: &str) -> Result<Arc<str>, KeycloakSessionError> {
        let mut guard = self.inner.token.write().await;
        if let Some(token) = guard.as_ref() {
            if token.access_token.as_ref() != rejected {
                return Ok(token.access_token.clone());
            }
        }
        let refresh_token = guard.as_ref().and_then(|t| t.refresh_token.clone());
        tracing::debug!("refresh keycloak session");
        let token = try_refresh(&self.inner.client, refresh_token.as_deref()).await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }

    pub async fn token(&self) -> Option<KeycloakSessionToken> {
        self.inner.token.read().await.clone()
    }
}

#[async_trait::async_trait]
impl KeycloakTokenSupplier for KeycloakSession {
    async fn get(&self, _url: &str) -> Result<String, KeycloakError> {
        Ok(self.access_token().await?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use keycloak::KeycloakError;

    use super::{KeycloakSessionError, KeycloakSessionToken};

    #[test]
    fn client_credentials_token_has_no_refresh_token() {
        let token: KeycloakSessionToken = serde_json::from_value(serde_json::json!({
            "access_token": "eyJhbGciOiJSUzI1NiJ9.e30.c2ln",
            "expires_in": 300,
            "token_type": "Bearer"
        }))
        .unwrap();
        assert!(token.refresh_token().is_none());
        assert_eq!(token.expires_in(), 300);
    }

    #[test]
    fn password_token_keeps_refresh_token() {
        let token: KeycloakSessionToken = serde_json::from_value(serde_json::json!({
            "access_token": "opaque",
            "expires_in": 60,
            "refresh_expires_in": 1800,
            "refresh_token": "r1",
            "token_type": "Bearer"
        }))
        .unwrap();
        assert_eq!(token.access_token(), "opaque");
        assert_eq!(token.refresh_token(), Some("r1"));
    }

    #[test]
    fn login_failures_never_look_like_missing_objects() {
        let err = KeycloakError::from(KeycloakSessionError::HttpFailure {
            status: 404,
            text: "Realm does not exist".into(),
        });
        match err {
            KeycloakError::HttpFailure { status, text, .. } => {
                assert_eq!(status, 401);
                assert!(text.contains("status 404"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
