use kcp_keycloak::Keycloak;

use crate::{
    data::ResourceData,
    error::{ProviderError, Result},
    schema::Schema,
};

/// A managed Keycloak object type.
///
/// Every operation converts the attribute bag into a model, makes one or a
/// few client calls and writes the model back. `create` sets the id,
/// `delete` may leave the bag untouched; the provider drops it afterwards.
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    fn schema(&self) -> Schema;

    /// Cross-field and server side checks that the schema cannot express.
    async fn validate(&self, _keycloak: &Keycloak, _data: &ResourceData) -> Result<()> {
        Ok(())
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()>;

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()>;

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()>;

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()>;

    /// Turns an import id into a bag `read` can fill in.
    async fn import(&self, _keycloak: &Keycloak, _import_id: &str) -> Result<ResourceData> {
        Err(ProviderError::ImportNotSupported(String::new()))
    }
}

/// A read-only lookup of existing Keycloak objects.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    fn schema(&self) -> Schema;

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()>;
}

/// A 404 means the object was removed outside of the provider: clear the id
/// so the host forgets it. Every other error is returned unchanged.
pub fn handle_not_found(err: ProviderError, data: &mut ResourceData) -> Result<()> {
    if err.is_not_found() {
        tracing::warn!("removing resource with id {} from state as it no longer exists", data.id());
        data.set_id("");
        return Ok(());
    }
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::handle_not_found;
    use crate::{data::ResourceData, error::ProviderError};

    #[test]
    fn not_found_clears_the_id() {
        let mut data = ResourceData::default().with_id("g1");
        handle_not_found(kcp_keycloak::Error::not_found("gone").into(), &mut data).unwrap();
        assert!(data.is_removed());

        let mut data = ResourceData::default().with_id("g1");
        let login = kcp_keycloak::Error::Session(kcp_keycloak::session::KeycloakSessionError::HttpFailure {
            status: 404,
            text: "Realm does not exist".into(),
        });
        assert!(handle_not_found(login.into(), &mut data).is_err());
        assert_eq!(data.id(), "g1");

        let err = handle_not_found(ProviderError::validation("bad"), &mut data).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert_eq!(data.id(), "g1");
    }
}
