use kcp_keycloak::{
    openid_client::{OpenidClient, OpenidClientAttributes, OpenidClientAuthorizationSettings},
    types::BoolQuoted,
    Keycloak,
};
use serde_json::{json, Map, Value};

use crate::{
    data::ResourceData,
    error::{ProviderError, Result},
    extra_config::{get_extra_config, set_extra_config, validate_extra_config, EXTRA_CONFIG},
    import::parse_realm_scoped_import_id,
    resource::Resource,
    schema::{Attribute, Schema},
    validation::Validator,
};

pub const ACCESS_TYPES: &[&str] = &["CONFIDENTIAL", "PUBLIC", "BEARER-ONLY"];
pub const POLICY_ENFORCEMENT_MODES: &[&str] = &["ENFORCING", "PERMISSIVE", "DISABLED"];
pub const DECISION_STRATEGIES: &[&str] = &["UNANIMOUS", "AFFIRMATIVE", "CONSENSUS"];
const PKCE_CODE_CHALLENGE_METHODS: &[&str] = &["", "plain", "S256"];
const AUTHENTICATOR_TYPES: &[&str] = &[
    "client-secret",
    "client-jwt",
    "client-x509",
    "client-secret-jwt",
];

/// Post logout redirect uris share one client attribute.
const URI_SEPARATOR: &str = "##";

pub(crate) fn openid_client_schema() -> Schema {
    Schema::new()
        .attr("client_id", Attribute::string().required())
        .attr("realm_id", Attribute::string().required().force_new())
        .attr("name", Attribute::string().optional())
        .attr("enabled", Attribute::bool().default(true))
        .attr("description", Attribute::string().optional())
        .attr(
            "access_type",
            Attribute::string()
                .required()
                .validate(Validator::string_in_slice(ACCESS_TYPES)),
        )
        .attr("client_secret", Attribute::string().optional().computed().sensitive())
        .attr(
            "client_authenticator_type",
            Attribute::string()
                .default("client-secret")
                .validate(Validator::string_in_slice(AUTHENTICATOR_TYPES)),
        )
        .attr("standard_flow_enabled", Attribute::bool().default(false))
        .attr("implicit_flow_enabled", Attribute::bool().default(false))
        .attr("direct_access_grants_enabled", Attribute::bool().default(false))
        .attr("service_accounts_enabled", Attribute::bool().default(false))
        .attr("frontchannel_logout_enabled", Attribute::bool().optional().computed())
        .attr("valid_redirect_uris", Attribute::string_set().optional())
        .attr("web_origins", Attribute::string_set().optional())
        .attr("valid_post_logout_redirect_uris", Attribute::string_set().optional())
        .attr("root_url", Attribute::string().optional().computed())
        .attr("admin_url", Attribute::string().optional().computed())
        .attr("base_url", Attribute::string().optional().computed())
        .attr("service_account_user_id", Attribute::string().computed())
        .attr(
            "pkce_code_challenge_method",
            Attribute::string()
                .optional()
                .validate(Validator::string_in_slice(PKCE_CODE_CHALLENGE_METHODS)),
        )
        .attr("access_token_lifespan", Attribute::string().optional().computed())
        .attr("client_offline_session_idle_timeout", Attribute::string().optional().computed())
        .attr("client_offline_session_max_lifespan", Attribute::string().optional().computed())
        .attr("client_session_idle_timeout", Attribute::string().optional().computed())
        .attr("client_session_max_lifespan", Attribute::string().optional().computed())
        .attr("exclude_session_state_from_auth_response", Attribute::bool().optional().computed())
        .attr("resource_server_id", Attribute::string().computed())
        .attr(
            "authorization",
            Attribute::block_set(
                Schema::new()
                    .attr(
                        "policy_enforcement_mode",
                        Attribute::string()
                            .required()
                            .validate(Validator::string_in_slice(POLICY_ENFORCEMENT_MODES)),
                    )
                    .attr(
                        "decision_strategy",
                        Attribute::string()
                            .default("UNANIMOUS")
                            .validate(Validator::string_in_slice(DECISION_STRATEGIES)),
                    )
                    .attr("allow_remote_resource_management", Attribute::bool().default(false))
                    .attr("keep_defaults", Attribute::bool().default(false)),
            )
            .optional(),
        )
        .attr("full_scope_allowed", Attribute::bool().default(true))
        .attr("consent_required", Attribute::bool().optional().computed())
        .attr("display_on_consent_screen", Attribute::bool().optional().computed())
        .attr("consent_screen_text", Attribute::string().optional().computed())
        .attr("login_theme", Attribute::string().optional())
        .attr("use_refresh_tokens", Attribute::bool().default(true))
        .attr("frontchannel_logout_url", Attribute::string().optional())
        .attr("backchannel_logout_url", Attribute::string().optional())
        .attr("backchannel_logout_session_required", Attribute::bool().default(true))
        .attr("backchannel_logout_revoke_offline_sessions", Attribute::bool().default(false))
        .attr(EXTRA_CONFIG, Attribute::string_map().optional())
}

fn get_authorization_settings(data: &ResourceData) -> Option<OpenidClientAuthorizationSettings> {
    let Some(Value::Object(settings)) = data.get_list("authorization").first() else {
        return None;
    };
    let settings = ResourceData::new(settings.clone());
    Some(OpenidClientAuthorizationSettings {
        policy_enforcement_mode: settings.get_string("policy_enforcement_mode"),
        decision_strategy: settings.get_string("decision_strategy"),
        allow_remote_resource_management: settings.get_bool("allow_remote_resource_management"),
        keep_defaults: settings.get_bool("keep_defaults"),
    })
}

pub(crate) fn get_openid_client_from_data(data: &ResourceData) -> Result<OpenidClient> {
    let mut client = OpenidClient {
        id: data.id().to_string(),
        client_id: data.get_string("client_id"),
        realm_id: data.get_string("realm_id"),
        name: data.get_string("name"),
        enabled: data.get_bool("enabled"),
        description: data.get_string("description"),
        client_secret: data.get_string("client_secret"),
        client_authenticator_type: data.get_string("client_authenticator_type"),
        standard_flow_enabled: data.get_bool("standard_flow_enabled"),
        implicit_flow_enabled: data.get_bool("implicit_flow_enabled"),
        direct_access_grants_enabled: data.get_bool("direct_access_grants_enabled"),
        service_accounts_enabled: data.get_bool("service_accounts_enabled"),
        frontchannel_logout_enabled: data.get_bool("frontchannel_logout_enabled"),
        full_scope_allowed: data.get_bool("full_scope_allowed"),
        consent_required: data.get_bool("consent_required"),
        redirect_uris: data.get_string_list("valid_redirect_uris"),
        web_origins: data.get_string_list("web_origins"),
        admin_url: data.get_string("admin_url"),
        base_url: data.get_string("base_url"),
        root_url: data.get("root_url").and_then(Value::as_str).map(str::to_string),
        attributes: OpenidClientAttributes {
            pkce_code_challenge_method: data.get_string("pkce_code_challenge_method"),
            exclude_session_state_from_auth_response: BoolQuoted(
                data.get_bool("exclude_session_state_from_auth_response"),
            ),
            access_token_lifespan: data.get_string("access_token_lifespan"),
            login_theme: data.get_string("login_theme"),
            client_offline_session_idle_timeout: data.get_string("client_offline_session_idle_timeout"),
            client_offline_session_max_lifespan: data.get_string("client_offline_session_max_lifespan"),
            client_session_idle_timeout: data.get_string("client_session_idle_timeout"),
            client_session_max_lifespan: data.get_string("client_session_max_lifespan"),
            display_on_consent_screen: BoolQuoted(data.get_bool("display_on_consent_screen")),
            consent_screen_text: data.get_string("consent_screen_text"),
            use_refresh_tokens: BoolQuoted(data.get_bool("use_refresh_tokens")),
            frontchannel_logout_url: data.get_string("frontchannel_logout_url"),
            backchannel_logout_url: data.get_string("backchannel_logout_url"),
            backchannel_logout_session_required: BoolQuoted(
                data.get_bool("backchannel_logout_session_required"),
            ),
            backchannel_logout_revoke_offline_tokens: BoolQuoted(
                data.get_bool("backchannel_logout_revoke_offline_sessions"),
            ),
            post_logout_redirect_uris: data
                .get_string_list("valid_post_logout_redirect_uris")
                .join(URI_SEPARATOR),
            extra_config: get_extra_config(data),
        },
        ..Default::default()
    };
    client.set_access_type(data.get_str("access_type"));
    if let Some(settings) = get_authorization_settings(data) {
        client.authorization_services_enabled = true;
        client.authorization_settings = Some(settings);
    }

    let redirecting = client.standard_flow_enabled || client.implicit_flow_enabled;
    if !redirecting && data.get_ok("valid_redirect_uris").is_some() {
        return Err(ProviderError::validation(
            "valid_redirect_uris cannot be set when standard or implicit flow is not enabled",
        ));
    }
    if !redirecting && !client.direct_access_grants_enabled {
        for key in ["web_origins", "valid_post_logout_redirect_uris"] {
            if data.get_ok(key).is_some() {
                return Err(ProviderError::validation(format!(
                    "{key} cannot be set when standard or implicit flow is not enabled"
                )));
            }
        }
    }
    Ok(client)
}

pub(crate) async fn set_openid_client_data(
    keycloak: &Keycloak,
    data: &mut ResourceData,
    client: &OpenidClient,
) -> Result<()> {
    let service_account_user_id = if client.service_accounts_enabled {
        keycloak
            .get_openid_client_service_account_user(&client.realm_id, &client.id)
            .await?
            .id
    } else {
        String::new()
    };
    let attributes = &client.attributes;
    data.set_id(&client.id);
    data.set("client_id", client.client_id.as_str());
    data.set("realm_id", client.realm_id.as_str());
    data.set("name", client.name.as_str());
    data.set("enabled", client.enabled);
    data.set("description", client.description.as_str());
    data.set("access_type", client.access_type());
    data.set("client_secret", client.client_secret.as_str());
    data.set("client_authenticator_type", client.client_authenticator_type.as_str());
    data.set("standard_flow_enabled", client.standard_flow_enabled);
    data.set("implicit_flow_enabled", client.implicit_flow_enabled);
    data.set("direct_access_grants_enabled", client.direct_access_grants_enabled);
    data.set("service_accounts_enabled", client.service_accounts_enabled);
    data.set("frontchannel_logout_enabled", client.frontchannel_logout_enabled);
    data.set("valid_redirect_uris", client.redirect_uris.clone());
    data.set("web_origins", client.web_origins.clone());
    data.set(
        "valid_post_logout_redirect_uris",
        attributes
            .post_logout_redirect_uris
            .split(URI_SEPARATOR)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>(),
    );
    data.set("admin_url", client.admin_url.as_str());
    data.set("base_url", client.base_url.as_str());
    data.set("root_url", client.root_url.clone().unwrap_or_default());
    data.set("full_scope_allowed", client.full_scope_allowed);
    data.set("consent_required", client.consent_required);
    data.set("service_account_user_id", service_account_user_id);
    data.set("pkce_code_challenge_method", attributes.pkce_code_challenge_method.as_str());
    data.set(
        "exclude_session_state_from_auth_response",
        attributes.exclude_session_state_from_auth_response.0,
    );
    data.set("access_token_lifespan", attributes.access_token_lifespan.as_str());
    data.set("client_offline_session_idle_timeout", attributes.client_offline_session_idle_timeout.as_str());
    data.set("client_offline_session_max_lifespan", attributes.client_offline_session_max_lifespan.as_str());
    data.set("client_session_idle_timeout", attributes.client_session_idle_timeout.as_str());
    data.set("client_session_max_lifespan", attributes.client_session_max_lifespan.as_str());
    data.set("display_on_consent_screen", attributes.display_on_consent_screen.0);
    data.set("consent_screen_text", attributes.consent_screen_text.as_str());
    data.set("login_theme", attributes.login_theme.as_str());
    data.set("use_refresh_tokens", attributes.use_refresh_tokens.0);
    data.set("frontchannel_logout_url", attributes.frontchannel_logout_url.as_str());
    data.set("backchannel_logout_url", attributes.backchannel_logout_url.as_str());
    data.set("backchannel_logout_session_required", attributes.backchannel_logout_session_required.0);
    data.set(
        "backchannel_logout_revoke_offline_sessions",
        attributes.backchannel_logout_revoke_offline_tokens.0,
    );
    set_extra_config(data, &attributes.extra_config);

    if client.authorization_services_enabled {
        data.set("resource_server_id", client.id.as_str());
    } else {
        data.set("resource_server_id", "");
    }
    match &client.authorization_settings {
        Some(settings) => {
            // keep_defaults is create-only and never returned by Keycloak
            let keep_defaults = get_authorization_settings(data)
                .map(|s| s.keep_defaults)
                .unwrap_or_default();
            let mut block = Map::new();
            block.insert("policy_enforcement_mode".into(), json!(settings.policy_enforcement_mode));
            block.insert("decision_strategy".into(), json!(settings.decision_strategy));
            block.insert(
                "allow_remote_resource_management".into(),
                json!(settings.allow_remote_resource_management),
            );
            block.insert("keep_defaults".into(), json!(keep_defaults));
            data.set("authorization", vec![Value::Object(block)]);
        }
        None => data.set("authorization", Value::Array(Vec::new())),
    }
    Ok(())
}

pub struct OpenidClientResource;

#[async_trait::async_trait]
impl Resource for OpenidClientResource {
    fn schema(&self) -> Schema {
        openid_client_schema()
    }

    async fn validate(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        validate_extra_config(&get_extra_config(data), OpenidClientAttributes::RESERVED_KEYS)?;
        let client = get_openid_client_from_data(data)?;
        Ok(keycloak.validate_openid_client(&client).await?)
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mut client = get_openid_client_from_data(data)?;
        keycloak.new_openid_client(&mut client).await?;
        data.set_id(&client.id);
        Ok(())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let client = keycloak
            .get_openid_client(data.get_str("realm_id"), data.id())
            .await?;
        set_openid_client_data(keycloak, data, &client).await
    }

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mut client = get_openid_client_from_data(data)?;
        keycloak.update_openid_client(&mut client).await?;
        let client = keycloak
            .get_openid_client(&client.realm_id, &client.id)
            .await?;
        set_openid_client_data(keycloak, data, &client).await
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak
            .delete_openid_client(data.get_str("realm_id"), data.id())
            .await?)
    }

    async fn import(&self, keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        let id = parse_realm_scoped_import_id(import_id, keycloak.default_realm())?;
        let mut data = ResourceData::default().with_id(id.id);
        data.set("realm_id", id.realm);
        Ok(data)
    }
}
