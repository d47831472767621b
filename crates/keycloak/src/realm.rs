use keycloak::types::RealmRepresentation;

use crate::{
    error::Result,
    types::{non_empty, seconds},
    Keycloak,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Realm {
    pub id: String,
    pub realm: String,
    pub enabled: bool,
    pub display_name: String,
    pub display_name_html: String,
    pub user_managed_access: bool,

    pub registration_allowed: bool,
    pub registration_email_as_username: bool,
    pub edit_username_allowed: bool,
    pub reset_password_allowed: bool,
    pub remember_me: bool,
    pub verify_email: bool,
    pub login_with_email_allowed: bool,
    pub duplicate_emails_allowed: bool,
    pub ssl_required: String,

    pub login_theme: String,
    pub account_theme: String,
    pub admin_theme: String,
    pub email_theme: String,

    pub revoke_refresh_token: bool,
    pub refresh_token_max_reuse: i64,
    // lifespans are seconds
    pub sso_session_idle_timeout: Option<i64>,
    pub sso_session_max_lifespan: Option<i64>,
    pub offline_session_idle_timeout: Option<i64>,
    pub offline_session_max_lifespan: Option<i64>,
    pub offline_session_max_lifespan_enabled: bool,
    pub access_token_lifespan: Option<i64>,
    pub access_token_lifespan_for_implicit_flow: Option<i64>,
    pub access_code_lifespan: Option<i64>,
    pub access_code_lifespan_login: Option<i64>,
    pub access_code_lifespan_user_action: Option<i64>,

    pub internationalization_enabled: bool,
    pub supported_locales: Vec<String>,
    pub default_locale: String,

    pub password_policy: String,
    pub browser_flow: String,
    pub registration_flow: String,
    pub direct_grant_flow: String,

    pub attributes: std::collections::BTreeMap<String, String>,
}

impl From<RealmRepresentation> for Realm {
    fn from(rep: RealmRepresentation) -> Self {
        Self {
            id: rep.id.unwrap_or_default(),
            realm: rep.realm.unwrap_or_default(),
            enabled: rep.enabled.unwrap_or_default(),
            display_name: rep.display_name.unwrap_or_default(),
            display_name_html: rep.display_name_html.unwrap_or_default(),
            user_managed_access: rep.user_managed_access_allowed.unwrap_or_default(),
            registration_allowed: rep.registration_allowed.unwrap_or_default(),
            registration_email_as_username: rep.registration_email_as_username.unwrap_or_default(),
            edit_username_allowed: rep.edit_username_allowed.unwrap_or_default(),
            reset_password_allowed: rep.reset_password_allowed.unwrap_or_default(),
            remember_me: rep.remember_me.unwrap_or_default(),
            verify_email: rep.verify_email.unwrap_or_default(),
            login_with_email_allowed: rep.login_with_email_allowed.unwrap_or_default(),
            duplicate_emails_allowed: rep.duplicate_emails_allowed.unwrap_or_default(),
            ssl_required: rep.ssl_required.unwrap_or_default(),
            login_theme: rep.login_theme.unwrap_or_default(),
            account_theme: rep.account_theme.unwrap_or_default(),
            admin_theme: rep.admin_theme.unwrap_or_default(),
            email_theme: rep.email_theme.unwrap_or_default(),
            revoke_refresh_token: rep.revoke_refresh_token.unwrap_or_default(),
            refresh_token_max_reuse: rep.refresh_token_max_reuse.unwrap_or_default().into(),
            sso_session_idle_timeout: rep.sso_session_idle_timeout.map(i64::from),
            sso_session_max_lifespan: rep.sso_session_max_lifespan.map(i64::from),
            offline_session_idle_timeout: rep.offline_session_idle_timeout.map(i64::from),
            offline_session_max_lifespan: rep.offline_session_max_lifespan.map(i64::from),
            offline_session_max_lifespan_enabled: rep
                .offline_session_max_lifespan_enabled
                .unwrap_or_default(),
            access_token_lifespan: rep.access_token_lifespan.map(i64::from),
            access_token_lifespan_for_implicit_flow: rep
                .access_token_lifespan_for_implicit_flow
                .map(i64::from),
            access_code_lifespan: rep.access_code_lifespan.map(i64::from),
            access_code_lifespan_login: rep.access_code_lifespan_login.map(i64::from),
            access_code_lifespan_user_action: rep.access_code_lifespan_user_action.map(i64::from),
            internationalization_enabled: rep.internationalization_enabled.unwrap_or_default(),
            supported_locales: rep.supported_locales.unwrap_or_default(),
            default_locale: rep.default_locale.unwrap_or_default(),
            password_policy: rep.password_policy.unwrap_or_default(),
            browser_flow: rep.browser_flow.unwrap_or_default(),
            registration_flow: rep.registration_flow.unwrap_or_default(),
            direct_grant_flow: rep.direct_grant_flow.unwrap_or_default(),
            attributes: rep.attributes.unwrap_or_default().into_iter().collect(),
        }
    }
}

impl From<&Realm> for RealmRepresentation {
    fn from(realm: &Realm) -> Self {
        Self {
            id: non_empty(&realm.id),
            realm: Some(realm.realm.clone()),
            enabled: Some(realm.enabled),
            display_name: Some(realm.display_name.clone()),
            display_name_html: Some(realm.display_name_html.clone()),
            user_managed_access_allowed: Some(realm.user_managed_access),
            registration_allowed: Some(realm.registration_allowed),
            registration_email_as_username: Some(realm.registration_email_as_username),
            edit_username_allowed: Some(realm.edit_username_allowed),
            reset_password_allowed: Some(realm.reset_password_allowed),
            remember_me: Some(realm.remember_me),
            verify_email: Some(realm.verify_email),
            login_with_email_allowed: Some(realm.login_with_email_allowed),
            duplicate_emails_allowed: Some(realm.duplicate_emails_allowed),
            ssl_required: non_empty(&realm.ssl_required),
            login_theme: non_empty(&realm.login_theme),
            account_theme: non_empty(&realm.account_theme),
            admin_theme: non_empty(&realm.admin_theme),
            email_theme: non_empty(&realm.email_theme),
            revoke_refresh_token: Some(realm.revoke_refresh_token),
            refresh_token_max_reuse: Some(seconds(realm.refresh_token_max_reuse)),
            sso_session_idle_timeout: realm.sso_session_idle_timeout.map(seconds),
            sso_session_max_lifespan: realm.sso_session_max_lifespan.map(seconds),
            offline_session_idle_timeout: realm.offline_session_idle_timeout.map(seconds),
            offline_session_max_lifespan: realm.offline_session_max_lifespan.map(seconds),
            offline_session_max_lifespan_enabled: Some(realm.offline_session_max_lifespan_enabled),
            access_token_lifespan: realm.access_token_lifespan.map(seconds),
            access_token_lifespan_for_implicit_flow: realm
                .access_token_lifespan_for_implicit_flow
                .map(seconds),
            access_code_lifespan: realm.access_code_lifespan.map(seconds),
            access_code_lifespan_login: realm.access_code_lifespan_login.map(seconds),
            access_code_lifespan_user_action: realm.access_code_lifespan_user_action.map(seconds),
            internationalization_enabled: Some(realm.internationalization_enabled),
            supported_locales: Some(realm.supported_locales.clone()),
            default_locale: non_empty(&realm.default_locale),
            password_policy: non_empty(&realm.password_policy),
            browser_flow: non_empty(&realm.browser_flow),
            registration_flow: non_empty(&realm.registration_flow),
            direct_grant_flow: non_empty(&realm.direct_grant_flow),
            attributes: Some(realm.attributes.clone().into_iter().collect()),
            ..Default::default()
        }
    }
}

impl Keycloak {
    pub async fn new_realm(&self, realm: &Realm) -> Result<()> {
        self.call(|admin| admin.post(realm.into())).await?;
        Ok(())
    }

    pub async fn get_realm(&self, realm: &str) -> Result<Realm> {
        Ok(self.call(|admin| admin.realm_get(realm)).await?.into())
    }

    pub async fn get_realms(&self) -> Result<Vec<Realm>> {
        let realms = self.call(|admin| admin.get(Some(false))).await?;
        Ok(realms.into_iter().map(Realm::from).collect())
    }

    pub async fn update_realm(&self, realm: &Realm) -> Result<()> {
        self.call(|admin| admin.realm_put(&realm.realm, realm.into()))
            .await?;
        Ok(())
    }

    pub async fn delete_realm(&self, realm: &str) -> Result<()> {
        self.call(|admin| admin.realm_delete(realm)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keycloak::types::RealmRepresentation;

    use super::Realm;

    #[test]
    fn lifespans_are_omitted_when_unset() {
        let realm = Realm {
            realm: "test".into(),
            enabled: true,
            access_token_lifespan: Some(300),
            ..Default::default()
        };
        let json = serde_json::to_value(RealmRepresentation::from(&realm)).unwrap();
        assert_eq!(json["accessTokenLifespan"], 300);
        assert!(json.get("ssoSessionIdleTimeout").is_none());
        assert!(json.get("loginTheme").is_none());
        assert_eq!(json["userManagedAccessAllowed"], false);
    }

    #[test]
    fn missing_fields_read_as_defaults() {
        let rep: RealmRepresentation = serde_json::from_value(serde_json::json!({
            "realm": "test",
            "enabled": true,
            "ssoSessionIdleTimeout": 1800,
            "attributes": {"frontendUrl": "https://sso.example.com"}
        }))
        .unwrap();
        let realm = Realm::from(rep);
        assert_eq!(realm.realm, "test");
        assert_eq!(realm.sso_session_idle_timeout, Some(1800));
        assert_eq!(realm.access_token_lifespan, None);
        assert!(!realm.verify_email);
        assert_eq!(realm.attributes["frontendUrl"], "https://sso.example.com");
    }
}
