use crate::{
    component::{Component, USER_STORAGE_PROVIDER_TYPE},
    duration::{duration_string_from_milliseconds, milliseconds_from_duration_string},
    error::{Error, Result},
    Keycloak,
};

pub const EDIT_MODES: &[&str] = &["READ_ONLY", "WRITABLE", "UNSYNCED"];
pub const VENDORS: &[&str] = &["OTHER", "EDIRECTORY", "AD", "RHDS", "TIVOLI"];
pub const SEARCH_SCOPES: &[&str] = &["ONE_LEVEL", "SUBTREE"];
pub const TRUSTSTORE_SPI_OPTIONS: &[&str] = &["ALWAYS", "ONLY_FOR_LDAPS", "NEVER"];
pub const CACHE_POLICIES: &[&str] = &["DEFAULT", "EVICT_DAILY", "EVICT_WEEKLY", "MAX_LIFESPAN", "NO_CACHE"];

const PROVIDER_ID: &str = "ldap";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LdapUserFederation {
    pub id: String,
    pub name: String,
    pub realm_id: String,

    pub enabled: bool,
    pub priority: i64,

    pub import_enabled: bool,
    pub edit_mode: String,
    pub sync_registrations: bool,

    pub vendor: String,
    pub username_ldap_attribute: String,
    pub rdn_ldap_attribute: String,
    pub uuid_ldap_attribute: String,
    pub user_object_classes: Vec<String>,
    pub connection_url: String,
    pub users_dn: String,
    pub bind_dn: String,
    pub bind_credential: String,
    pub custom_user_search_filter: String,
    pub search_scope: String,

    pub start_tls: bool,
    pub use_password_modify_extended_op: bool,
    pub trust_email: bool,
    pub validate_password_policy: bool,
    pub use_truststore_spi: String,
    /// Duration strings such as `5s`; empty means unset.
    pub connection_timeout: String,
    pub read_timeout: String,
    pub pagination: bool,

    pub server_principal: String,
    pub use_kerberos_for_password_authentication: bool,
    pub allow_kerberos_authentication: bool,
    pub key_tab: String,
    pub kerberos_realm: String,

    pub batch_size_for_sync: i64,
    /// Seconds, or -1 when disabled.
    pub full_sync_period: i64,
    pub changed_sync_period: i64,

    pub cache_policy: String,
    pub max_lifespan: String,
    pub eviction_day: Option<i64>,
    pub eviction_hour: Option<i64>,
    pub eviction_minute: Option<i64>,
}

impl LdapUserFederation {
    pub fn validate(&self) -> Result<()> {
        if self.bind_dn.is_empty() != self.bind_credential.is_empty() {
            return Err(Error::validation(
                "authentication requires both BindDN and BindCredential to be set",
            ));
        }
        Ok(())
    }

    pub fn to_component(&self) -> Result<Component> {
        let mut c = Component::new(&self.name, PROVIDER_ID, USER_STORAGE_PROVIDER_TYPE, &self.realm_id)
            .with_config("cachePolicy", &self.cache_policy)
            .with_config("enabled", self.enabled)
            .with_config("priority", self.priority)
            .with_config("importEnabled", self.import_enabled)
            .with_config("editMode", &self.edit_mode)
            .with_config("syncRegistrations", self.sync_registrations)
            .with_config("vendor", self.vendor.to_lowercase())
            .with_config("usernameLDAPAttribute", &self.username_ldap_attribute)
            .with_config("rdnLDAPAttribute", &self.rdn_ldap_attribute)
            .with_config("uuidLDAPAttribute", &self.uuid_ldap_attribute)
            .with_config("userObjectClasses", self.user_object_classes.join(", "))
            .with_config("connectionUrl", &self.connection_url)
            .with_config("usersDn", &self.users_dn)
            .with_config("startTls", self.start_tls)
            .with_config("usePasswordModifyExtendedOp", self.use_password_modify_extended_op)
            .with_config("validatePasswordPolicy", self.validate_password_policy)
            .with_config("trustEmail", self.trust_email)
            .with_config("pagination", self.pagination)
            .with_config("batchSizeForSync", self.batch_size_for_sync)
            .with_config("fullSyncPeriod", self.full_sync_period)
            .with_config("changedSyncPeriod", self.changed_sync_period)
            .with_config("serverPrincipal", &self.server_principal)
            .with_config(
                "useKerberosForPasswordAuthentication",
                self.use_kerberos_for_password_authentication,
            )
            .with_config("allowKerberosAuthentication", self.allow_kerberos_authentication)
            .with_config("keyTab", &self.key_tab)
            .with_config("kerberosRealm", &self.kerberos_realm);
        c.id = self.id.clone();

        if !self.bind_dn.is_empty() && !self.bind_credential.is_empty() {
            c.set_config("bindDn", &self.bind_dn);
            c.set_config("bindCredential", &self.bind_credential);
            c.set_config("authType", "simple");
        } else {
            c.set_config("authType", "none");
        }

        c.set_config(
            "searchScope",
            if self.search_scope == "ONE_LEVEL" { "1" } else { "2" },
        );

        if !self.custom_user_search_filter.is_empty() {
            c.set_config("customUserSearchFilter", &self.custom_user_search_filter);
        }

        if self.use_truststore_spi == "ONLY_FOR_LDAPS" {
            c.set_config("useTruststoreSpi", "ldapsOnly");
        } else {
            c.set_config("useTruststoreSpi", self.use_truststore_spi.to_lowercase());
        }

        // Keycloak only clears these when the key is sent with no values.
        for (key, value) in [
            ("connectionTimeout", &self.connection_timeout),
            ("readTimeout", &self.read_timeout),
        ] {
            if value.is_empty() {
                c.set_config_list(key, Vec::new());
            } else {
                c.set_config(key, milliseconds_from_duration_string(value)?);
            }
        }

        for key in ["evictionHour", "evictionMinute", "evictionDay", "maxLifespan"] {
            c.set_config_list(key, Vec::new());
        }
        if !self.cache_policy.is_empty() {
            for (key, value) in [
                ("evictionHour", self.eviction_hour),
                ("evictionMinute", self.eviction_minute),
                ("evictionDay", self.eviction_day),
            ] {
                if let Some(value) = value {
                    c.set_config(key, value);
                }
            }
            if !self.max_lifespan.is_empty() {
                c.set_config("maxLifespan", milliseconds_from_duration_string(&self.max_lifespan)?);
            }
        }

        Ok(c)
    }

    pub fn from_component(c: &Component) -> Result<Self> {
        let optional_int = |key: &str| -> Result<i64> {
            match c.get_config_ok(key) {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| Error::Other(format!("unable to parse `{key}`"))),
                None => Ok(-1),
            }
        };
        let optional_duration = |key: &str| -> Result<String> {
            match c.get_config_ok(key) {
                Some(raw) => duration_string_from_milliseconds(raw),
                None => Ok(String::new()),
            }
        };

        let use_truststore_spi = match c.get_config("useTruststoreSpi") {
            "ldapsOnly" => "ONLY_FOR_LDAPS".to_string(),
            other => other.to_uppercase(),
        };

        Ok(Self {
            id: c.id.clone(),
            name: c.name.clone(),
            realm_id: c.parent_id.clone(),
            enabled: c.get_config_bool("enabled")?,
            priority: c.get_config_int("priority")?,
            import_enabled: c.get_config_bool("importEnabled")?,
            edit_mode: c.get_config("editMode").to_string(),
            sync_registrations: c.get_config_bool("syncRegistrations")?,
            vendor: c.get_config("vendor").to_uppercase(),
            username_ldap_attribute: c.get_config("usernameLDAPAttribute").to_string(),
            rdn_ldap_attribute: c.get_config("rdnLDAPAttribute").to_string(),
            uuid_ldap_attribute: c.get_config("uuidLDAPAttribute").to_string(),
            user_object_classes: c
                .get_config("userObjectClasses")
                .split(", ")
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            connection_url: c.get_config("connectionUrl").to_string(),
            users_dn: c.get_config("usersDn").to_string(),
            bind_dn: c.get_config("bindDn").to_string(),
            bind_credential: c.get_config("bindCredential").to_string(),
            custom_user_search_filter: c.get_config("customUserSearchFilter").to_string(),
            search_scope: if c.get_config("searchScope") == "1" {
                "ONE_LEVEL".to_string()
            } else {
                "SUBTREE".to_string()
            },
            start_tls: c.get_config_bool("startTls")?,
            use_password_modify_extended_op: c.get_config_bool("usePasswordModifyExtendedOp")?,
            trust_email: c.get_config_bool("trustEmail")?,
            validate_password_policy: c.get_config_bool("validatePasswordPolicy")?,
            use_truststore_spi,
            connection_timeout: optional_duration("connectionTimeout")?,
            read_timeout: optional_duration("readTimeout")?,
            pagination: c.get_config_bool("pagination")?,
            server_principal: c.get_config("serverPrincipal").to_string(),
            use_kerberos_for_password_authentication: c
                .get_config_bool("useKerberosForPasswordAuthentication")?,
            allow_kerberos_authentication: c.get_config_bool("allowKerberosAuthentication")?,
            key_tab: c.get_config("keyTab").to_string(),
            kerberos_realm: c.get_config("kerberosRealm").to_string(),
            batch_size_for_sync: c.get_config_int("batchSizeForSync")?,
            full_sync_period: c.get_config_int("fullSyncPeriod")?,
            changed_sync_period: c.get_config_int("changedSyncPeriod")?,
            cache_policy: c.get_config("cachePolicy").to_string(),
            max_lifespan: optional_duration("maxLifespan")?,
            eviction_day: Some(optional_int("evictionDay")?),
            eviction_hour: Some(optional_int("evictionHour")?),
            eviction_minute: Some(optional_int("evictionMinute")?),
        })
    }
}

impl Keycloak {
    pub async fn new_ldap_user_federation(&self, federation: &mut LdapUserFederation) -> Result<()> {
        let component = federation.to_component()?;
        federation.id = self
            .new_component(&federation.realm_id, &component)
            .await?;
        Ok(())
    }

    pub async fn get_ldap_user_federation(&self, realm_id: &str, id: &str) -> Result<LdapUserFederation> {
        let component = self.get_component(realm_id, id).await?;
        LdapUserFederation::from_component(&component)
    }

    pub async fn update_ldap_user_federation(&self, federation: &LdapUserFederation) -> Result<()> {
        let component = federation.to_component()?;
        self.update_component(&federation.realm_id, &component)
            .await
    }

    pub async fn delete_ldap_user_federation(&self, realm_id: &str, id: &str) -> Result<()> {
        self.delete_component(realm_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::LdapUserFederation;

    fn federation() -> LdapUserFederation {
        LdapUserFederation {
            name: "openldap".into(),
            realm_id: "test".into(),
            enabled: true,
            priority: 0,
            import_enabled: true,
            edit_mode: "READ_ONLY".into(),
            vendor: "OTHER".into(),
            username_ldap_attribute: "cn".into(),
            rdn_ldap_attribute: "cn".into(),
            uuid_ldap_attribute: "entryDN".into(),
            user_object_classes: vec!["simpleSecurityObject".into(), "organizationalRole".into()],
            connection_url: "ldap://openldap".into(),
            users_dn: "dc=example,dc=org".into(),
            search_scope: "ONE_LEVEL".into(),
            use_truststore_spi: "ONLY_FOR_LDAPS".into(),
            connection_timeout: "5s".into(),
            full_sync_period: -1,
            changed_sync_period: -1,
            ..Default::default()
        }
    }

    #[test]
    fn component_config_uses_keycloak_encodings() {
        let c = federation().to_component().unwrap();
        assert_eq!(c.provider_id, "ldap");
        assert_eq!(c.parent_id, "test");
        assert_eq!(c.get_config("vendor"), "other");
        assert_eq!(c.get_config("searchScope"), "1");
        assert_eq!(c.get_config("useTruststoreSpi"), "ldapsOnly");
        assert_eq!(c.get_config("connectionTimeout"), "5000");
        assert!(c.get_config_ok("readTimeout").is_none());
        assert!(c.config.contains_key("readTimeout"));
        assert_eq!(c.get_config("authType"), "none");
        assert_eq!(
            c.get_config("userObjectClasses"),
            "simpleSecurityObject, organizationalRole"
        );
        assert!(c.get_config_ok("customUserSearchFilter").is_none());
    }

    #[test]
    fn converts_back_from_component() {
        let mut c = federation().to_component().unwrap();
        c.id = "f1".into();
        let read = LdapUserFederation::from_component(&c).unwrap();
        assert_eq!(read.id, "f1");
        assert_eq!(read.vendor, "OTHER");
        assert_eq!(read.search_scope, "ONE_LEVEL");
        assert_eq!(read.use_truststore_spi, "ONLY_FOR_LDAPS");
        assert_eq!(read.connection_timeout, "5s");
        assert_eq!(read.read_timeout, "");
        assert_eq!(read.eviction_day, Some(-1));
        assert_eq!(read.user_object_classes.len(), 2);
    }

    #[test]
    fn bind_dn_and_credential_go_together() {
        let mut ldap = federation();
        ldap.bind_dn = "cn=admin".into();
        assert_eq!(
            ldap.validate().unwrap_err().to_string(),
            "validation error: authentication requires both BindDN and BindCredential to be set"
        );
        ldap.bind_credential = "secret".into();
        assert!(ldap.validate().is_ok());
        let c = ldap.to_component().unwrap();
        assert_eq!(c.get_config("authType"), "simple");
        assert_eq!(c.get_config("bindDn"), "cn=admin");
    }
}
