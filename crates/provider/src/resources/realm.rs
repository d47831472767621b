use kcp_keycloak::{realm::Realm, Keycloak};
use serde_json::{json, Value};

use crate::{
    data::ResourceData,
    duration::{get_duration_seconds, set_duration_seconds},
    error::{ProviderError, Result},
    import::parse_realm_import_id,
    resource::Resource,
    schema::{Attribute, Schema},
    validation::Validator,
};

const SSL_REQUIRED: &[&str] = &["none", "external", "all"];
const THEMES: &[(&str, &str)] = &[
    ("login_theme", "login"),
    ("account_theme", "account"),
    ("admin_theme", "admin"),
    ("email_theme", "email"),
];

/// Lifespan attributes paired with the realm field holding their seconds.
fn lifespans(realm: &mut Realm) -> [(&'static str, &mut Option<i64>); 9] {
    [
        ("sso_session_idle_timeout", &mut realm.sso_session_idle_timeout),
        ("sso_session_max_lifespan", &mut realm.sso_session_max_lifespan),
        ("offline_session_idle_timeout", &mut realm.offline_session_idle_timeout),
        ("offline_session_max_lifespan", &mut realm.offline_session_max_lifespan),
        ("access_token_lifespan", &mut realm.access_token_lifespan),
        (
            "access_token_lifespan_for_implicit_flow",
            &mut realm.access_token_lifespan_for_implicit_flow,
        ),
        ("access_code_lifespan", &mut realm.access_code_lifespan),
        ("access_code_lifespan_login", &mut realm.access_code_lifespan_login),
        (
            "access_code_lifespan_user_action",
            &mut realm.access_code_lifespan_user_action,
        ),
    ]
}

pub(crate) fn realm_schema() -> Schema {
    let mut schema = Schema::new()
        .attr("realm", Attribute::string().required().force_new())
        .attr("internal_id", Attribute::string().optional().computed().force_new())
        .attr("enabled", Attribute::bool().default(true))
        .attr("display_name", Attribute::string().optional())
        .attr("display_name_html", Attribute::string().optional())
        .attr("user_managed_access", Attribute::bool().default(false))
        .attr("registration_allowed", Attribute::bool().optional().computed())
        .attr("registration_email_as_username", Attribute::bool().optional().computed())
        .attr("edit_username_allowed", Attribute::bool().optional().computed())
        .attr("reset_password_allowed", Attribute::bool().optional().computed())
        .attr("remember_me", Attribute::bool().optional().computed())
        .attr("verify_email", Attribute::bool().optional().computed())
        .attr("login_with_email_allowed", Attribute::bool().optional().computed())
        .attr("duplicate_emails_allowed", Attribute::bool().optional().computed())
        .attr(
            "ssl_required",
            Attribute::string()
                .default("external")
                .description("SSL Required: Values can be 'none', 'external' or 'all'.")
                .validate(Validator::string_in_slice(SSL_REQUIRED)),
        )
        .attr("revoke_refresh_token", Attribute::bool().default(false))
        .attr("refresh_token_max_reuse", Attribute::int().default(0))
        .attr("offline_session_max_lifespan_enabled", Attribute::bool().default(false))
        .attr(
            "internationalization",
            Attribute::block_list(
                Schema::new()
                    .attr("supported_locales", Attribute::string_set().required())
                    .attr("default_locale", Attribute::string().required()),
            )
            .optional(),
        )
        .attr("password_policy", Attribute::string().optional().description("String that represents the passwordPolicies that are in place. Each policy is separated with \" and \"."))
        .attr("browser_flow", Attribute::string().optional().computed())
        .attr("registration_flow", Attribute::string().optional().computed())
        .attr("direct_grant_flow", Attribute::string().optional().computed())
        .attr("attributes", Attribute::string_map().optional());
    for &(name, _) in THEMES {
        schema = schema.attr(name, Attribute::string().optional());
    }
    for (name, _) in lifespans(&mut Realm::default()) {
        schema = schema.attr(
            name,
            Attribute::string()
                .optional()
                .computed()
                .validate(Validator::Duration),
        );
    }
    schema
}

fn get_realm_from_data(data: &ResourceData) -> Result<Realm> {
    let mut realm = Realm {
        id: data.get_string("internal_id"),
        realm: data.get_string("realm"),
        enabled: data.get_bool("enabled"),
        display_name: data.get_string("display_name"),
        display_name_html: data.get_string("display_name_html"),
        user_managed_access: data.get_bool("user_managed_access"),
        registration_allowed: data.get_bool("registration_allowed"),
        registration_email_as_username: data.get_bool("registration_email_as_username"),
        edit_username_allowed: data.get_bool("edit_username_allowed"),
        reset_password_allowed: data.get_bool("reset_password_allowed"),
        remember_me: data.get_bool("remember_me"),
        verify_email: data.get_bool("verify_email"),
        login_with_email_allowed: data.get_bool("login_with_email_allowed"),
        duplicate_emails_allowed: data.get_bool("duplicate_emails_allowed"),
        ssl_required: data.get_string("ssl_required"),
        login_theme: data.get_string("login_theme"),
        account_theme: data.get_string("account_theme"),
        admin_theme: data.get_string("admin_theme"),
        email_theme: data.get_string("email_theme"),
        revoke_refresh_token: data.get_bool("revoke_refresh_token"),
        refresh_token_max_reuse: data.get_int("refresh_token_max_reuse"),
        offline_session_max_lifespan_enabled: data.get_bool("offline_session_max_lifespan_enabled"),
        password_policy: data.get_string("password_policy"),
        browser_flow: data.get_string("browser_flow"),
        registration_flow: data.get_string("registration_flow"),
        direct_grant_flow: data.get_string("direct_grant_flow"),
        attributes: data.get_string_map("attributes"),
        ..Default::default()
    };
    if let Some(Value::Object(i18n)) = data.get_list("internationalization").first() {
        realm.internationalization_enabled = true;
        let i18n = ResourceData::new(i18n.clone());
        realm.supported_locales = i18n.get_string_list("supported_locales");
        realm.default_locale = i18n.get_string("default_locale");
    }
    for (name, field) in lifespans(&mut realm) {
        *field = get_duration_seconds(data, name)?;
    }
    Ok(realm)
}

pub(crate) fn set_realm_data(data: &mut ResourceData, realm: &Realm) -> Result<()> {
    data.set_id(&realm.realm);
    data.set("realm", realm.realm.as_str());
    data.set("internal_id", realm.id.as_str());
    data.set("enabled", realm.enabled);
    data.set("display_name", realm.display_name.as_str());
    data.set("display_name_html", realm.display_name_html.as_str());
    data.set("user_managed_access", realm.user_managed_access);
    data.set("registration_allowed", realm.registration_allowed);
    data.set("registration_email_as_username", realm.registration_email_as_username);
    data.set("edit_username_allowed", realm.edit_username_allowed);
    data.set("reset_password_allowed", realm.reset_password_allowed);
    data.set("remember_me", realm.remember_me);
    data.set("verify_email", realm.verify_email);
    data.set("login_with_email_allowed", realm.login_with_email_allowed);
    data.set("duplicate_emails_allowed", realm.duplicate_emails_allowed);
    data.set("ssl_required", realm.ssl_required.as_str());
    data.set("login_theme", realm.login_theme.as_str());
    data.set("account_theme", realm.account_theme.as_str());
    data.set("admin_theme", realm.admin_theme.as_str());
    data.set("email_theme", realm.email_theme.as_str());
    data.set("revoke_refresh_token", realm.revoke_refresh_token);
    data.set("refresh_token_max_reuse", realm.refresh_token_max_reuse);
    data.set("offline_session_max_lifespan_enabled", realm.offline_session_max_lifespan_enabled);
    data.set("password_policy", realm.password_policy.as_str());
    data.set("browser_flow", realm.browser_flow.as_str());
    data.set("registration_flow", realm.registration_flow.as_str());
    data.set("direct_grant_flow", realm.direct_grant_flow.as_str());
    data.set_string_map("attributes", &realm.attributes);
    if realm.internationalization_enabled {
        data.set(
            "internationalization",
            json!([{
                "supported_locales": realm.supported_locales,
                "default_locale": realm.default_locale,
            }]),
        );
    } else {
        data.set("internationalization", Value::Array(Vec::new()));
    }
    let mut realm = realm.clone();
    for (name, seconds) in lifespans(&mut realm) {
        set_duration_seconds(data, name, *seconds)?;
    }
    Ok(())
}

pub struct RealmResource;

#[async_trait::async_trait]
impl Resource for RealmResource {
    fn schema(&self) -> Schema {
        realm_schema()
    }

    /// Themes must be installed on the server.
    async fn validate(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        if THEMES.iter().all(|(name, _)| data.get_str(name).is_empty()) {
            return Ok(());
        }
        let info = keycloak.server_info().await?;
        for (name, theme_type) in THEMES {
            let theme = data.get_str(name);
            if !theme.is_empty() && !info.theme_is_installed(theme_type, theme) {
                return Err(ProviderError::validation(format!(
                    "theme \"{theme}\" does not exist on the server"
                )));
            }
        }
        Ok(())
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let realm = get_realm_from_data(data)?;
        keycloak.new_realm(&realm).await?;
        data.set_id(&realm.realm);
        Ok(())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let realm = keycloak.get_realm(data.id()).await?;
        set_realm_data(data, &realm)
    }

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let realm = get_realm_from_data(data)?;
        keycloak.update_realm(&realm).await?;
        set_realm_data(data, &realm)
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak.delete_realm(data.id()).await?)
    }

    async fn import(&self, _keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        let realm = parse_realm_import_id(import_id)?;
        let mut data = ResourceData::default().with_id(&realm);
        data.set("realm", realm);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lifespans_are_converted_to_seconds() {
        let mut config = json!({
            "realm": "test",
            "access_token_lifespan": "5m",
            "sso_session_idle_timeout": "1h30m",
            "internationalization": [{"supported_locales": ["en", "de"], "default_locale": "en"}]
        })
        .as_object()
        .cloned()
        .unwrap();
        let schema = realm_schema();
        schema.apply_defaults(&mut config);
        schema.validate(&config).unwrap();

        let realm = get_realm_from_data(&ResourceData::new(config)).unwrap();
        assert_eq!(realm.access_token_lifespan, Some(300));
        assert_eq!(realm.sso_session_idle_timeout, Some(5400));
        assert_eq!(realm.offline_session_idle_timeout, None);
        assert_eq!(realm.ssl_required, "external");
        assert!(realm.enabled);
        assert!(realm.internationalization_enabled);
        assert_eq!(realm.supported_locales, vec!["en", "de"]);

        let mut data = ResourceData::default();
        set_realm_data(&mut data, &realm).unwrap();
        assert_eq!(data.id(), "test");
        assert_eq!(data.get_str("access_token_lifespan"), "5m0s");
        assert_eq!(data.get_str("offline_session_idle_timeout"), "");
    }

    #[test]
    fn bad_lifespan_is_rejected_at_plan_time() {
        let config = json!({"realm": "test", "access_code_lifespan": "forever"});
        assert!(realm_schema().validate(config.as_object().unwrap()).is_err());
    }
}
