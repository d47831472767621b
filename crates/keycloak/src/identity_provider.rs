use std::collections::BTreeMap;

use keycloak::types::IdentityProviderRepresentation;

use crate::{
    error::{Error, Result},
    types::{convert, non_empty, BoolQuoted},
    Keycloak,
};

/// Typed part of an identity provider's `config` map. Keys Keycloak knows
/// but this struct does not end up in `extra_config`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProviderConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub authorization_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_info_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jwks_url: String,
    #[serde(default)]
    pub use_jwks_url: BoolQuoted,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logout_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub login_hint: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_scope: String,
    #[serde(default)]
    pub backchannel_supported: BoolQuoted,
    #[serde(default)]
    pub validate_signature: BoolQuoted,
    #[serde(default)]
    pub disable_user_info: BoolQuoted,
    #[serde(default)]
    pub hide_on_login_page: BoolQuoted,
    #[serde(default)]
    pub ui_locales: BoolQuoted,
    #[serde(rename = "acceptsPromptNoneForwardFromClient", default)]
    pub accepts_prompt_none_forward_from_client: BoolQuoted,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sync_mode: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gui_order: String,
    #[serde(flatten)]
    pub extra_config: BTreeMap<String, String>,
}

impl IdentityProviderConfig {
    /// Config keys owned by typed fields; `extra_config` may not use them.
    pub const RESERVED_KEYS: &'static [&'static str] = &[
        "clientId",
        "clientSecret",
        "authorizationUrl",
        "tokenUrl",
        "userInfoUrl",
        "jwksUrl",
        "useJwksUrl",
        "logoutUrl",
        "issuer",
        "loginHint",
        "defaultScope",
        "backchannelSupported",
        "validateSignature",
        "disableUserInfo",
        "hideOnLoginPage",
        "uiLocales",
        "acceptsPromptNoneForwardFromClient",
        "syncMode",
        "guiOrder",
    ];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityProvider {
    pub realm: String,
    pub internal_id: String,
    pub alias: String,
    pub display_name: String,
    pub provider_id: String,
    pub enabled: bool,
    pub store_token: bool,
    pub add_read_token_role_on_create: bool,
    pub authenticate_by_default: bool,
    pub link_only: bool,
    pub trust_email: bool,
    pub first_broker_login_flow_alias: String,
    pub post_broker_login_flow_alias: String,
    pub config: IdentityProviderConfig,
}

impl TryFrom<IdentityProviderRepresentation> for IdentityProvider {
    type Error = Error;

    fn try_from(rep: IdentityProviderRepresentation) -> Result<Self> {
        Ok(Self {
            realm: String::new(),
            internal_id: rep.internal_id.unwrap_or_default(),
            alias: rep.alias.unwrap_or_default(),
            display_name: rep.display_name.unwrap_or_default(),
            provider_id: rep.provider_id.unwrap_or_default(),
            enabled: rep.enabled.unwrap_or_default(),
            store_token: rep.store_token.unwrap_or_default(),
            add_read_token_role_on_create: rep.add_read_token_role_on_create.unwrap_or_default(),
            authenticate_by_default: rep.authenticate_by_default.unwrap_or_default(),
            link_only: rep.link_only.unwrap_or_default(),
            trust_email: rep.trust_email.unwrap_or_default(),
            first_broker_login_flow_alias: rep.first_broker_login_flow_alias.unwrap_or_default(),
            post_broker_login_flow_alias: rep.post_broker_login_flow_alias.unwrap_or_default(),
            config: convert(&rep.config.unwrap_or_default())?,
        })
    }
}

impl TryFrom<&IdentityProvider> for IdentityProviderRepresentation {
    type Error = Error;

    fn try_from(idp: &IdentityProvider) -> Result<Self> {
        Ok(Self {
            internal_id: non_empty(&idp.internal_id),
            alias: Some(idp.alias.clone()),
            display_name: Some(idp.display_name.clone()),
            provider_id: Some(idp.provider_id.clone()),
            enabled: Some(idp.enabled),
            store_token: Some(idp.store_token),
            add_read_token_role_on_create: Some(idp.add_read_token_role_on_create),
            authenticate_by_default: Some(idp.authenticate_by_default),
            link_only: Some(idp.link_only),
            trust_email: Some(idp.trust_email),
            first_broker_login_flow_alias: Some(idp.first_broker_login_flow_alias.clone()),
            post_broker_login_flow_alias: Some(idp.post_broker_login_flow_alias.clone()),
            config: Some(convert(&idp.config)?),
            ..Default::default()
        })
    }
}

impl Keycloak {
    pub async fn new_identity_provider(&self, identity_provider: &IdentityProvider) -> Result<()> {
        let rep = IdentityProviderRepresentation::try_from(identity_provider)?;
        self.call(|admin| {
            admin.realm_identity_provider_instances_post(&identity_provider.realm, rep.clone())
        })
        .await?;
        Ok(())
    }

    pub async fn get_identity_provider(&self, realm: &str, alias: &str) -> Result<IdentityProvider> {
        let rep = self
            .call(|admin| admin.realm_identity_provider_instances_with_alias_get(realm, alias))
            .await?;
        let mut identity_provider = IdentityProvider::try_from(rep)?;
        identity_provider.realm = realm.to_string();
        Ok(identity_provider)
    }

    pub async fn update_identity_provider(&self, identity_provider: &IdentityProvider) -> Result<()> {
        let rep = IdentityProviderRepresentation::try_from(identity_provider)?;
        self.call(|admin| {
            admin.realm_identity_provider_instances_with_alias_put(
                &identity_provider.realm,
                &identity_provider.alias,
                rep.clone(),
            )
        })
        .await?;
        Ok(())
    }

    pub async fn delete_identity_provider(&self, realm: &str, alias: &str) -> Result<()> {
        self.call(|admin| admin.realm_identity_provider_instances_with_alias_delete(realm, alias))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keycloak::types::IdentityProviderRepresentation;

    use super::{IdentityProvider, IdentityProviderConfig};

    #[test]
    fn config_splits_known_and_extra_keys() {
        let rep: IdentityProviderRepresentation = serde_json::from_value(serde_json::json!({
            "alias": "corp",
            "providerId": "oidc",
            "config": {
                "clientId": "kc",
                "hideOnLoginPage": "true",
                "syncMode": "IMPORT",
                "prompt": "login"
            }
        }))
        .unwrap();
        let idp = IdentityProvider::try_from(rep).unwrap();
        assert_eq!(idp.config.client_id, "kc");
        assert!(idp.config.hide_on_login_page.0);
        assert_eq!(idp.config.sync_mode, "IMPORT");
        assert_eq!(idp.config.extra_config.len(), 1);
        assert_eq!(idp.config.extra_config["prompt"], "login");

        let rep = IdentityProviderRepresentation::try_from(&idp).unwrap();
        let json = serde_json::to_value(rep).unwrap();
        assert_eq!(json["config"]["prompt"], "login");
        assert_eq!(json["config"]["hideOnLoginPage"], "true");
        assert!(json.get("realm").is_none());
    }

    #[test]
    fn reserved_keys_cover_serialized_names() {
        let json = serde_json::to_value(IdentityProviderConfig {
            client_id: "a".into(),
            client_secret: "b".into(),
            authorization_url: "c".into(),
            token_url: "d".into(),
            user_info_url: "e".into(),
            jwks_url: "f".into(),
            logout_url: "g".into(),
            issuer: "h".into(),
            login_hint: "i".into(),
            default_scope: "j".into(),
            sync_mode: "k".into(),
            gui_order: "l".into(),
            ..Default::default()
        })
        .unwrap();
        for key in json.as_object().unwrap().keys() {
            assert!(
                IdentityProviderConfig::RESERVED_KEYS.contains(&key.as_str()),
                "{key} missing"
            );
        }
    }
}
