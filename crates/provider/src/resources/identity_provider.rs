use kcp_keycloak::{
    identity_provider::{IdentityProvider, IdentityProviderConfig},
    types::BoolQuoted,
    Keycloak,
};

use crate::{
    data::ResourceData,
    error::Result,
    extra_config::{get_extra_config, set_extra_config, validate_extra_config, EXTRA_CONFIG},
    import::parse_realm_scoped_import_id,
    resource::Resource,
    schema::{Attribute, Schema},
    validation::Validator,
};

const SYNC_MODES: &[&str] = &["", "IMPORT", "LEGACY", "FORCE"];

/// Attributes shared by every identity provider type.
fn identity_provider_schema() -> Schema {
    Schema::new()
        .attr(
            "alias",
            Attribute::string()
                .required()
                .force_new()
                .description("The alias uniquely identifies an identity provider and it is also used to build the redirect uri."),
        )
        .attr("realm", Attribute::string().required().force_new())
        .attr("internal_id", Attribute::string().computed())
        .attr("display_name", Attribute::string().default(""))
        .attr("enabled", Attribute::bool().default(true))
        .attr("store_token", Attribute::bool().default(true))
        .attr("add_read_token_role_on_create", Attribute::bool().default(false).force_new())
        .attr("authenticate_by_default", Attribute::bool().default(false))
        .attr("link_only", Attribute::bool().default(false))
        .attr("trust_email", Attribute::bool().default(false))
        .attr("first_broker_login_flow_alias", Attribute::string().default("first broker login"))
        .attr("post_broker_login_flow_alias", Attribute::string().default(""))
        .attr(
            "sync_mode",
            Attribute::string()
                .default("")
                .validate(Validator::string_in_slice(SYNC_MODES)),
        )
        .attr("gui_order", Attribute::string().optional())
        .attr(EXTRA_CONFIG, Attribute::string_map().optional())
}

pub(crate) fn oidc_identity_provider_schema() -> Schema {
    identity_provider_schema()
        .attr(
            "provider_id",
            Attribute::string()
                .default("oidc")
                .description("provider id, is always oidc, unless you have a custom implementation"),
        )
        .attr("backchannel_supported", Attribute::bool().default(true))
        .attr("validate_signature", Attribute::bool().default(false))
        .attr("authorization_url", Attribute::string().required())
        .attr("client_id", Attribute::string().required())
        .attr("client_secret", Attribute::string().required().sensitive())
        .attr("user_info_url", Attribute::string().optional())
        .attr("jwks_url", Attribute::string().optional())
        .attr("hide_on_login_page", Attribute::bool().default(false))
        .attr("token_url", Attribute::string().required())
        .attr("logout_url", Attribute::string().optional())
        .attr("login_hint", Attribute::string().optional())
        .attr("ui_locales", Attribute::bool().default(false))
        .attr(
            "default_scopes",
            Attribute::string()
                .default("openid")
                .description("The scopes to be sent when asking for authorization. It can be a space-separated list of scopes."),
        )
        .attr("accepts_prompt_none_forward_from_client", Attribute::bool().default(false))
        .attr("disable_user_info", Attribute::bool().default(false))
        .attr("issuer", Attribute::string().optional())
}

fn get_oidc_identity_provider_from_data(data: &ResourceData) -> IdentityProvider {
    IdentityProvider {
        realm: data.get_string("realm"),
        alias: data.get_string("alias"),
        internal_id: data.get_string("internal_id"),
        display_name: data.get_string("display_name"),
        provider_id: data.get_string("provider_id"),
        enabled: data.get_bool("enabled"),
        store_token: data.get_bool("store_token"),
        add_read_token_role_on_create: data.get_bool("add_read_token_role_on_create"),
        authenticate_by_default: data.get_bool("authenticate_by_default"),
        link_only: data.get_bool("link_only"),
        trust_email: data.get_bool("trust_email"),
        first_broker_login_flow_alias: data.get_string("first_broker_login_flow_alias"),
        post_broker_login_flow_alias: data.get_string("post_broker_login_flow_alias"),
        config: IdentityProviderConfig {
            client_id: data.get_string("client_id"),
            client_secret: data.get_string("client_secret"),
            authorization_url: data.get_string("authorization_url"),
            token_url: data.get_string("token_url"),
            user_info_url: data.get_string("user_info_url"),
            jwks_url: data.get_string("jwks_url"),
            use_jwks_url: BoolQuoted(data.get_ok("jwks_url").is_some()),
            logout_url: data.get_string("logout_url"),
            issuer: data.get_string("issuer"),
            login_hint: data.get_string("login_hint"),
            default_scope: data.get_string("default_scopes"),
            backchannel_supported: BoolQuoted(data.get_bool("backchannel_supported")),
            validate_signature: BoolQuoted(data.get_bool("validate_signature")),
            disable_user_info: BoolQuoted(data.get_bool("disable_user_info")),
            hide_on_login_page: BoolQuoted(data.get_bool("hide_on_login_page")),
            ui_locales: BoolQuoted(data.get_bool("ui_locales")),
            accepts_prompt_none_forward_from_client: BoolQuoted(
                data.get_bool("accepts_prompt_none_forward_from_client"),
            ),
            sync_mode: data.get_string("sync_mode"),
            gui_order: data.get_string("gui_order"),
            extra_config: get_extra_config(data),
        },
    }
}

fn set_oidc_identity_provider_data(data: &mut ResourceData, idp: &IdentityProvider) {
    let config = &idp.config;
    data.set_id(&idp.alias);
    data.set("internal_id", idp.internal_id.as_str());
    data.set("realm", idp.realm.as_str());
    data.set("alias", idp.alias.as_str());
    data.set("provider_id", idp.provider_id.as_str());
    data.set("display_name", idp.display_name.as_str());
    data.set("enabled", idp.enabled);
    data.set("store_token", idp.store_token);
    data.set("add_read_token_role_on_create", idp.add_read_token_role_on_create);
    data.set("authenticate_by_default", idp.authenticate_by_default);
    data.set("link_only", idp.link_only);
    data.set("trust_email", idp.trust_email);
    data.set("first_broker_login_flow_alias", idp.first_broker_login_flow_alias.as_str());
    data.set("post_broker_login_flow_alias", idp.post_broker_login_flow_alias.as_str());
    data.set("backchannel_supported", config.backchannel_supported.0);
    data.set("validate_signature", config.validate_signature.0);
    data.set("authorization_url", config.authorization_url.as_str());
    data.set("client_id", config.client_id.as_str());
    data.set("user_info_url", config.user_info_url.as_str());
    data.set("jwks_url", config.jwks_url.as_str());
    data.set("hide_on_login_page", config.hide_on_login_page.0);
    data.set("token_url", config.token_url.as_str());
    data.set("logout_url", config.logout_url.as_str());
    data.set("login_hint", config.login_hint.as_str());
    data.set("ui_locales", config.ui_locales.0);
    data.set("default_scopes", config.default_scope.as_str());
    data.set(
        "accepts_prompt_none_forward_from_client",
        config.accepts_prompt_none_forward_from_client.0,
    );
    data.set("disable_user_info", config.disable_user_info.0);
    data.set("issuer", config.issuer.as_str());
    data.set("sync_mode", config.sync_mode.as_str());
    data.set("gui_order", config.gui_order.as_str());
    set_extra_config(data, &config.extra_config);
}

pub struct OidcIdentityProviderResource;

#[async_trait::async_trait]
impl Resource for OidcIdentityProviderResource {
    fn schema(&self) -> Schema {
        oidc_identity_provider_schema()
    }

    async fn validate(&self, _keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        validate_extra_config(&get_extra_config(data), IdentityProviderConfig::RESERVED_KEYS)
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let idp = get_oidc_identity_provider_from_data(data);
        keycloak.new_identity_provider(&idp).await?;
        data.set_id(&idp.alias);
        Ok(())
    }

    /// The client secret is masked on read and stays as configured.
    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let idp = keycloak
            .get_identity_provider(data.get_str("realm"), data.id())
            .await?;
        set_oidc_identity_provider_data(data, &idp);
        Ok(())
    }

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let idp = get_oidc_identity_provider_from_data(data);
        keycloak.update_identity_provider(&idp).await?;
        set_oidc_identity_provider_data(data, &idp);
        Ok(())
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak
            .delete_identity_provider(data.get_str("realm"), data.id())
            .await?)
    }

    async fn import(&self, keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        let id = parse_realm_scoped_import_id(import_id, keycloak.default_realm())?;
        let mut data = ResourceData::default().with_id(id.id.as_str());
        data.set("realm", id.realm);
        data.set("alias", id.id);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn jwks_url_switches_key_lookup() {
        let mut config = json!({
            "realm": "test",
            "alias": "corp",
            "authorization_url": "https://idp/auth",
            "token_url": "https://idp/token",
            "client_id": "kc",
            "client_secret": "secret",
            "jwks_url": "https://idp/certs",
            "extra_config": {"prompt": "login"}
        })
        .as_object()
        .cloned()
        .unwrap();
        let schema = oidc_identity_provider_schema();
        schema.apply_defaults(&mut config);
        schema.validate(&config).unwrap();

        let idp = get_oidc_identity_provider_from_data(&ResourceData::new(config));
        assert_eq!(idp.provider_id, "oidc");
        assert!(idp.config.use_jwks_url.0);
        assert!(idp.config.backchannel_supported.0);
        assert_eq!(idp.config.default_scope, "openid");
        assert_eq!(idp.first_broker_login_flow_alias, "first broker login");
        assert_eq!(idp.config.extra_config["prompt"], "login");
    }
}
