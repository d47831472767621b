#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    Keycloak(#[from] kcp_keycloak::Error),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("Invalid import. Supported import formats: {0}")]
    InvalidImport(String),
    #[error("unknown resource type `{0}`")]
    UnknownResource(String),
    #[error("resource type `{0}` does not support import")]
    ImportNotSupported(String),
    #[error("provider is not configured")]
    NotConfigured,
}

pub type Result<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    pub fn validation(message: impl Into<String>) -> Self {
        ProviderError::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::Keycloak(err) if err.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderError;

    #[test]
    fn keycloak_not_found_passes_through() {
        let err: ProviderError = kcp_keycloak::Error::not_found("gone").into();
        assert!(err.is_not_found());
        assert!(!ProviderError::validation("x").is_not_found());
        assert_eq!(
            ProviderError::validation("bad").to_string(),
            "validation error: bad"
        );
    }
}
