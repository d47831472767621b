use std::collections::BTreeMap;

use keycloak::types::{ClientRepresentation, UserRepresentation};

use crate::{
    authorization::ResourceServer,
    client::created_id,
    error::{Error, Result},
    types::{convert, non_empty, BoolQuoted},
    Keycloak,
};

pub const OPENID_CONNECT: &str = "openid-connect";

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenidClientAuthorizationSettings {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub policy_enforcement_mode: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub decision_strategy: String,
    #[serde(default)]
    pub allow_remote_resource_management: bool,
    #[serde(skip)]
    pub keep_defaults: bool,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct OpenidClientAttributes {
    #[serde(rename = "pkce.code.challenge.method", default)]
    pub pkce_code_challenge_method: String,
    #[serde(rename = "exclude.session.state.from.auth.response", default)]
    pub exclude_session_state_from_auth_response: BoolQuoted,
    #[serde(rename = "access.token.lifespan", default)]
    pub access_token_lifespan: String,
    #[serde(rename = "login_theme", default)]
    pub login_theme: String,
    #[serde(
        rename = "client.offline.session.idle.timeout",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub client_offline_session_idle_timeout: String,
    #[serde(
        rename = "client.offline.session.max.lifespan",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub client_offline_session_max_lifespan: String,
    #[serde(
        rename = "client.session.idle.timeout",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub client_session_idle_timeout: String,
    #[serde(
        rename = "client.session.max.lifespan",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub client_session_max_lifespan: String,
    #[serde(rename = "display.on.consent.screen", default)]
    pub display_on_consent_screen: BoolQuoted,
    #[serde(rename = "consent.screen.text", default)]
    pub consent_screen_text: String,
    #[serde(rename = "use.refresh.tokens", default)]
    pub use_refresh_tokens: BoolQuoted,
    #[serde(rename = "frontchannel.logout.url", default)]
    pub frontchannel_logout_url: String,
    #[serde(rename = "backchannel.logout.url", default)]
    pub backchannel_logout_url: String,
    #[serde(rename = "backchannel.logout.session.required", default)]
    pub backchannel_logout_session_required: BoolQuoted,
    #[serde(rename = "backchannel.logout.revoke.offline.tokens", default)]
    pub backchannel_logout_revoke_offline_tokens: BoolQuoted,
    #[serde(rename = "post.logout.redirect.uris", default)]
    pub post_logout_redirect_uris: String,
    #[serde(flatten)]
    pub extra_config: BTreeMap<String, String>,
}

impl OpenidClientAttributes {
    pub const RESERVED_KEYS: &'static [&'static str] = &[
        "pkce.code.challenge.method",
        "exclude.session.state.from.auth.response",
        "access.token.lifespan",
        "login_theme",
        "client.offline.session.idle.timeout",
        "client.offline.session.max.lifespan",
        "client.session.idle.timeout",
        "client.session.max.lifespan",
        "display.on.consent.screen",
        "consent.screen.text",
        "use.refresh.tokens",
        "frontchannel.logout.url",
        "backchannel.logout.url",
        "backchannel.logout.session.required",
        "backchannel.logout.revoke.offline.tokens",
        "post.logout.redirect.uris",
    ];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenidClient {
    pub id: String,
    pub client_id: String,
    pub realm_id: String,
    pub name: String,
    pub protocol: String,
    pub client_authenticator_type: String,
    pub client_secret: String,
    pub enabled: bool,
    pub description: String,
    pub public_client: bool,
    pub bearer_only: bool,
    pub standard_flow_enabled: bool,
    pub implicit_flow_enabled: bool,
    pub direct_access_grants_enabled: bool,
    pub service_accounts_enabled: bool,
    pub frontchannel_logout_enabled: bool,
    pub authorization_services_enabled: bool,
    pub redirect_uris: Vec<String>,
    pub web_origins: Vec<String>,
    pub admin_url: String,
    pub base_url: String,
    pub root_url: Option<String>,
    pub full_scope_allowed: bool,
    pub consent_required: bool,
    pub attributes: OpenidClientAttributes,
    pub authorization_settings: Option<OpenidClientAuthorizationSettings>,
}

impl TryFrom<ClientRepresentation> for OpenidClient {
    type Error = Error;

    fn try_from(rep: ClientRepresentation) -> Result<Self> {
        Ok(Self {
            id: rep.id.unwrap_or_default(),
            client_id: rep.client_id.unwrap_or_default(),
            realm_id: String::new(),
            name: rep.name.unwrap_or_default(),
            protocol: rep.protocol.unwrap_or_default(),
            client_authenticator_type: rep.client_authenticator_type.unwrap_or_default(),
            client_secret: rep.secret.unwrap_or_default(),
            enabled: rep.enabled.unwrap_or_default(),
            description: rep.description.unwrap_or_default(),
            public_client: rep.public_client.unwrap_or_default(),
            bearer_only: rep.bearer_only.unwrap_or_default(),
            standard_flow_enabled: rep.standard_flow_enabled.unwrap_or_default(),
            implicit_flow_enabled: rep.implicit_flow_enabled.unwrap_or_default(),
            direct_access_grants_enabled: rep.direct_access_grants_enabled.unwrap_or_default(),
            service_accounts_enabled: rep.service_accounts_enabled.unwrap_or_default(),
            frontchannel_logout_enabled: rep.frontchannel_logout.unwrap_or_default(),
            authorization_services_enabled: rep.authorization_services_enabled.unwrap_or_default(),
            redirect_uris: rep.redirect_uris.unwrap_or_default(),
            web_origins: rep.web_origins.unwrap_or_default(),
            admin_url: rep.admin_url.unwrap_or_default(),
            base_url: rep.base_url.unwrap_or_default(),
            root_url: rep.root_url,
            full_scope_allowed: rep.full_scope_allowed.unwrap_or_default(),
            consent_required: rep.consent_required.unwrap_or_default(),
            attributes: convert(&rep.attributes.unwrap_or_default())?,
            authorization_settings: rep
                .authorization_settings
                .as_ref()
                .map(convert)
                .transpose()?,
        })
    }
}

impl TryFrom<&OpenidClient> for ClientRepresentation {
    type Error = Error;

    fn try_from(client: &OpenidClient) -> Result<Self> {
        Ok(Self {
            id: non_empty(&client.id),
            client_id: Some(client.client_id.clone()),
            name: Some(client.name.clone()),
            protocol: Some(client.protocol.clone()),
            client_authenticator_type: non_empty(&client.client_authenticator_type),
            secret: non_empty(&client.client_secret),
            enabled: Some(client.enabled),
            description: Some(client.description.clone()),
            public_client: Some(client.public_client),
            bearer_only: Some(client.bearer_only),
            standard_flow_enabled: Some(client.standard_flow_enabled),
            implicit_flow_enabled: Some(client.implicit_flow_enabled),
            direct_access_grants_enabled: Some(client.direct_access_grants_enabled),
            service_accounts_enabled: Some(client.service_accounts_enabled),
            frontchannel_logout: Some(client.frontchannel_logout_enabled),
            authorization_services_enabled: Some(client.authorization_services_enabled),
            redirect_uris: Some(client.redirect_uris.clone()),
            web_origins: Some(client.web_origins.clone()),
            admin_url: Some(client.admin_url.clone()),
            base_url: Some(client.base_url.clone()),
            root_url: client.root_url.clone(),
            full_scope_allowed: Some(client.full_scope_allowed),
            consent_required: Some(client.consent_required),
            attributes: Some(convert(&client.attributes)?),
            authorization_settings: client
                .authorization_settings
                .as_ref()
                .map(convert)
                .transpose()?,
            ..Default::default()
        })
    }
}

impl OpenidClient {
    pub fn access_type(&self) -> &'static str {
        if self.public_client {
            "PUBLIC"
        } else if self.bearer_only {
            "BEARER-ONLY"
        } else {
            "CONFIDENTIAL"
        }
    }

    pub fn set_access_type(&mut self, access_type: &str) {
        self.public_client = access_type == "PUBLIC";
        self.bearer_only = access_type == "BEARER-ONLY";
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServiceAccountUser {
    pub id: String,
    pub username: String,
}

impl From<UserRepresentation> for ServiceAccountUser {
    fn from(user: UserRepresentation) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            username: user.username.unwrap_or_default(),
        }
    }
}

/// Checks that do not need the server, then the login theme against the
/// installed themes.
pub fn validate_openid_client_flows(client: &OpenidClient) -> Result<()> {
    if client.bearer_only
        && (client.standard_flow_enabled
            || client.implicit_flow_enabled
            || client.direct_access_grants_enabled
            || client.service_accounts_enabled)
    {
        return Err(Error::validation(
            "Keycloak cannot issue tokens for bearer-only clients; no oauth2 flows can be enabled for this client",
        ));
    }
    if (client.standard_flow_enabled || client.implicit_flow_enabled)
        && client.redirect_uris.is_empty()
    {
        return Err(Error::validation(
            "standard (authorization code) and implicit flows require at least one valid redirect uri",
        ));
    }
    if client.service_accounts_enabled && client.public_client {
        return Err(Error::validation(
            "service accounts (client credentials flow) cannot be enabled on public clients",
        ));
    }
    Ok(())
}

impl Keycloak {
    pub async fn validate_openid_client(&self, client: &OpenidClient) -> Result<()> {
        validate_openid_client_flows(client)?;
        let theme = &client.attributes.login_theme;
        if !theme.is_empty() && !self.server_info().await?.theme_is_installed("login", theme) {
            return Err(Error::validation(format!(
                "theme \"{theme}\" does not exist on the server"
            )));
        }
        Ok(())
    }

    /// Creates the client. Unless asked to keep them, the `Default Resource`
    /// Keycloak adds to new resource servers is removed again.
    pub async fn new_openid_client(&self, client: &mut OpenidClient) -> Result<()> {
        client.protocol = OPENID_CONNECT.to_string();
        let rep = ClientRepresentation::try_from(&*client)?;
        let realm_id = client.realm_id.as_str();
        let response = self
            .call(|admin| admin.realm_clients_post(realm_id, rep.clone()))
            .await?;
        client.id = created_id(&response, "openid client")?;
        if let Some(settings) = &client.authorization_settings {
            if !settings.keep_defaults {
                let resource = self
                    .get_authorization_resource_by_name(&client.realm_id, &client.id, "Default Resource")
                    .await?;
                if let Some(resource) = resource {
                    self.delete_authorization_resource(&client.realm_id, &client.id, &resource.id)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn openid_client_secret(&self, realm_id: &str, id: &str) -> Result<String> {
        let secret = self
            .call(|admin| admin.realm_clients_with_client_uuid_client_secret_get(realm_id, id))
            .await?;
        Ok(secret.value.unwrap_or_default())
    }

    /// Completes a fetched client with its secret and resource server
    /// settings, neither of which is part of the client body.
    async fn complete_openid_client(&self, client: &mut OpenidClient) -> Result<()> {
        if !client.public_client && !client.bearer_only {
            client.client_secret = self.openid_client_secret(&client.realm_id, &client.id).await?;
        }
        if client.authorization_services_enabled {
            let server = self.get_resource_server(&client.realm_id, &client.id).await?;
            client.authorization_settings = Some(OpenidClientAuthorizationSettings {
                policy_enforcement_mode: server.policy_enforcement_mode,
                decision_strategy: server.decision_strategy,
                allow_remote_resource_management: server.allow_remote_resource_management,
                keep_defaults: false,
            });
        }
        Ok(())
    }

    pub async fn get_openid_client(&self, realm_id: &str, id: &str) -> Result<OpenidClient> {
        let rep = self
            .call(|admin| admin.realm_clients_with_client_uuid_get(realm_id, id))
            .await?;
        let mut client = OpenidClient::try_from(rep)?;
        client.realm_id = realm_id.to_string();
        self.complete_openid_client(&mut client).await?;
        Ok(client)
    }

    pub async fn get_openid_client_by_client_id(
        &self,
        realm_id: &str,
        client_id: &str,
    ) -> Result<OpenidClient> {
        let clients = self
            .call(|admin| {
                admin.realm_clients_get(
                    realm_id,
                    Some(client_id.to_string()),
                    None,
                    None,
                    None,
                    None,
                    None,
                )
            })
            .await?;
        let rep = clients.into_iter().next().ok_or_else(|| {
            Error::not_found(format!("openid client with name {client_id} does not exist"))
        })?;
        let mut client = OpenidClient::try_from(rep)?;
        client.realm_id = realm_id.to_string();
        self.complete_openid_client(&mut client).await?;
        Ok(client)
    }

    pub async fn get_openid_client_service_account_user(
        &self,
        realm_id: &str,
        id: &str,
    ) -> Result<ServiceAccountUser> {
        let user = self
            .call(|admin| admin.realm_clients_with_client_uuid_service_account_user_get(realm_id, id))
            .await?;
        Ok(user.into())
    }

    /// Keycloak ignores `authorizationSettings` on PUT; they are written to
    /// the resource server afterwards.
    pub async fn update_openid_client(&self, client: &mut OpenidClient) -> Result<()> {
        client.protocol = OPENID_CONNECT.to_string();
        let rep = ClientRepresentation::try_from(&*client)?;
        let (realm_id, id) = (client.realm_id.as_str(), client.id.as_str());
        self.call(|admin| admin.realm_clients_with_client_uuid_put(realm_id, id, rep.clone()))
            .await?;
        if let Some(settings) = &client.authorization_settings {
            self.update_resource_server(&ResourceServer {
                realm_id: client.realm_id.clone(),
                client_id: client.id.clone(),
                policy_enforcement_mode: settings.policy_enforcement_mode.clone(),
                decision_strategy: settings.decision_strategy.clone(),
                allow_remote_resource_management: settings.allow_remote_resource_management,
            })
            .await?;
        }
        Ok(())
    }

    pub async fn delete_openid_client(&self, realm_id: &str, id: &str) -> Result<()> {
        self.call(|admin| admin.realm_clients_with_client_uuid_delete(realm_id, id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keycloak::types::ClientRepresentation;

    use super::{validate_openid_client_flows, OpenidClient, OpenidClientAuthorizationSettings};

    fn client(access_type: &str) -> OpenidClient {
        let mut client = OpenidClient {
            client_id: "app".into(),
            ..Default::default()
        };
        client.set_access_type(access_type);
        client
    }

    #[test]
    fn bearer_only_clients_cannot_enable_flows() {
        let mut c = client("BEARER-ONLY");
        c.direct_access_grants_enabled = true;
        let err = validate_openid_client_flows(&c).unwrap_err();
        assert!(err.to_string().starts_with("validation error: Keycloak cannot issue tokens"));
    }

    #[test]
    fn standard_flow_needs_redirect_uri() {
        let mut c = client("CONFIDENTIAL");
        c.standard_flow_enabled = true;
        assert!(validate_openid_client_flows(&c).is_err());
        c.redirect_uris.push("https://app.example.com/*".into());
        assert!(validate_openid_client_flows(&c).is_ok());
    }

    #[test]
    fn public_clients_have_no_service_account() {
        let mut c = client("PUBLIC");
        c.service_accounts_enabled = true;
        assert!(validate_openid_client_flows(&c)
            .unwrap_err()
            .to_string()
            .contains("service accounts"));
        assert_eq!(c.access_type(), "PUBLIC");
    }

    #[test]
    fn unknown_attributes_land_in_extra_config() {
        let rep: ClientRepresentation = serde_json::from_value(serde_json::json!({
            "id": "1",
            "clientId": "app",
            "attributes": {
                "login_theme": "keycloak",
                "use.refresh.tokens": "false",
                "custom.key": "value"
            }
        }))
        .unwrap();
        let c = OpenidClient::try_from(rep).unwrap();
        assert_eq!(c.attributes.login_theme, "keycloak");
        assert!(!c.attributes.use_refresh_tokens.0);
        assert_eq!(c.attributes.extra_config["custom.key"], "value");
        assert_eq!(c.access_type(), "CONFIDENTIAL");
    }

    #[test]
    fn authorization_settings_map_to_resource_server_enums() {
        let c = OpenidClient {
            client_id: "app".into(),
            client_secret: "s3cret".into(),
            frontchannel_logout_enabled: true,
            authorization_settings: Some(OpenidClientAuthorizationSettings {
                policy_enforcement_mode: "PERMISSIVE".into(),
                keep_defaults: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(ClientRepresentation::try_from(&c).unwrap()).unwrap();
        assert_eq!(json["secret"], "s3cret");
        assert_eq!(json["frontchannelLogout"], true);
        assert_eq!(json["authorizationSettings"]["policyEnforcementMode"], "PERMISSIVE");
        assert!(json["authorizationSettings"].get("decisionStrategy").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn unknown_policy_enforcement_mode_is_rejected() {
        let c = OpenidClient {
            authorization_settings: Some(OpenidClientAuthorizationSettings {
                policy_enforcement_mode: "LENIENT".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(ClientRepresentation::try_from(&c).is_err());
    }
}
