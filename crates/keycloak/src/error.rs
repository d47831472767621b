use std::borrow::Cow;

use keycloak::KeycloakError;

use crate::session::KeycloakSessionError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}", error_message(.0))]
    Keycloak(#[from] KeycloakError),
    #[error(transparent)]
    Session(#[from] KeycloakSessionError),
    #[error("unable to decode keycloak response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unable to parse keycloak version: {0}")]
    Version(#[from] semver::Error),
    #[error(transparent)]
    Config(#[from] envy::Error),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(text: impl Into<String>) -> Self {
        Error::Keycloak(KeycloakError::HttpFailure {
            status: 404,
            body: None,
            text: text.into(),
        })
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Keycloak(KeycloakError::HttpFailure { status, .. }) => Some(*status),
            Error::Session(KeycloakSessionError::HttpFailure { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// True only when the admin API answered 404 for the object itself. A
    /// failed login never counts, whatever status the token endpoint used.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Keycloak(KeycloakError::HttpFailure { status: 404, .. })
        )
    }
}

pub fn error_message(err: &KeycloakError) -> Cow<'_, str> {
    match err {
        KeycloakError::ReqwestFailure(err) => Cow::Owned(err.to_string()),
        KeycloakError::HttpFailure { status, body, text } => body
            .as_ref()
            .and_then(|e| {
                e.error_message
                    .as_deref()
                    .or(e.error.as_deref())
                    .map(|m| Cow::Owned(format!("error sending request: {status} {m}")))
            })
            .unwrap_or_else(|| {
                if !text.is_empty() {
                    Cow::Owned(format!("error sending request: {status} {text}"))
                } else {
                    Cow::Owned(format!("error sending request: {status}"))
                }
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use crate::session::KeycloakSessionError;

    #[test]
    fn not_found_is_detected() {
        let err = Error::not_found("group with id g1 not found");
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            err.to_string(),
            "error sending request: 404 group with id g1 not found"
        );
    }

    #[test]
    fn validation_errors_are_prefixed() {
        let err = Error::validation("role must not be empty");
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "validation error: role must not be empty");
    }

    #[test]
    fn login_404_is_not_a_missing_object() {
        let err = Error::from(KeycloakSessionError::HttpFailure {
            status: 404,
            text: "Realm does not exist".into(),
        });
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_not_found());
    }
}
