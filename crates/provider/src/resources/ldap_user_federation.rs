use kcp_keycloak::{
    ldap::{LdapUserFederation, CACHE_POLICIES, EDIT_MODES, SEARCH_SCOPES, TRUSTSTORE_SPI_OPTIONS, VENDORS},
    Keycloak,
};
use serde_json::{json, Map, Value};

use crate::{
    data::ResourceData,
    error::{ProviderError, Result},
    resource::Resource,
    schema::{Attribute, Schema},
    validation::Validator,
};

/// Keycloak answers with this instead of the bind credential.
const MASKED_CREDENTIAL: &str = "**********";

fn validate_sync_period(value: &Value) -> std::result::Result<(), String> {
    match value.as_i64() {
        Some(n) if n == -1 || n >= 1 => Ok(()),
        Some(n) => Err(format!(
            "expected sync period to be either -1 (disabled), or greater than zero, got {n}"
        )),
        None => Err("expected type of sync period to be int".to_string()),
    }
}

pub(crate) fn ldap_user_federation_schema() -> Schema {
    Schema::new()
        .attr("name", Attribute::string().required().description("Display name of the provider when displayed in the console."))
        .attr("realm_id", Attribute::string().required().force_new())
        .attr("enabled", Attribute::bool().default(true))
        .attr("priority", Attribute::int().default(0))
        .attr("import_enabled", Attribute::bool().default(true))
        .attr(
            "edit_mode",
            Attribute::string()
                .default("READ_ONLY")
                .validate(Validator::string_in_slice(EDIT_MODES)),
        )
        .attr("sync_registrations", Attribute::bool().default(false))
        .attr(
            "vendor",
            Attribute::string()
                .default("OTHER")
                .validate(Validator::string_in_slice(VENDORS)),
        )
        .attr("username_ldap_attribute", Attribute::string().required())
        .attr("rdn_ldap_attribute", Attribute::string().required())
        .attr("uuid_ldap_attribute", Attribute::string().required())
        .attr("user_object_classes", Attribute::string_list().required().min_items(1))
        .attr("connection_url", Attribute::string().required())
        .attr("users_dn", Attribute::string().required())
        .attr("bind_dn", Attribute::string().optional())
        .attr("bind_credential", Attribute::string().optional().sensitive())
        .attr(
            "custom_user_search_filter",
            Attribute::string().optional().description(
                "Additional LDAP filter for filtering searched users. Must begin with '(' and end with ')'.",
            ),
        )
        .attr(
            "search_scope",
            Attribute::string()
                .default("ONE_LEVEL")
                .validate(Validator::string_in_slice(SEARCH_SCOPES)),
        )
        .attr("validate_password_policy", Attribute::bool().default(false))
        .attr("trust_email", Attribute::bool().default(false))
        .attr(
            "use_truststore_spi",
            Attribute::string()
                .default("ONLY_FOR_LDAPS")
                .validate(Validator::string_in_slice(TRUSTSTORE_SPI_OPTIONS)),
        )
        .attr("connection_timeout", Attribute::string().optional().validate(Validator::Duration))
        .attr("read_timeout", Attribute::string().optional().validate(Validator::Duration))
        .attr("pagination", Attribute::bool().default(true))
        .attr("batch_size_for_sync", Attribute::int().default(1000))
        .attr(
            "full_sync_period",
            Attribute::int()
                .default(-1)
                .validate(Validator::Custom(validate_sync_period)),
        )
        .attr(
            "changed_sync_period",
            Attribute::int()
                .default(-1)
                .validate(Validator::Custom(validate_sync_period)),
        )
        .attr(
            "kerberos",
            Attribute::block_set(
                Schema::new()
                    .attr("kerberos_realm", Attribute::string().required())
                    .attr("server_principal", Attribute::string().required())
                    .attr("key_tab", Attribute::string().required())
                    .attr(
                        "use_kerberos_for_password_authentication",
                        Attribute::bool().default(false),
                    ),
            )
            .optional(),
        )
        .attr(
            "cache",
            Attribute::block_list(
                Schema::new()
                    .attr(
                        "policy",
                        Attribute::string()
                            .default("DEFAULT")
                            .validate(Validator::string_in_slice(CACHE_POLICIES)),
                    )
                    .attr("max_lifespan", Attribute::string().optional().validate(Validator::Duration))
                    .attr("eviction_day", Attribute::int().optional().validate(Validator::IntBetween(0, 6)))
                    .attr("eviction_hour", Attribute::int().optional().validate(Validator::IntBetween(0, 23)))
                    .attr("eviction_minute", Attribute::int().optional().validate(Validator::IntBetween(0, 59))),
            )
            .optional(),
        )
}

fn first_block(data: &ResourceData, key: &str) -> Option<ResourceData> {
    match data.get_list(key).first() {
        Some(Value::Object(block)) => Some(ResourceData::new(block.clone())),
        _ => None,
    }
}

fn get_ldap_user_federation_from_data(data: &ResourceData) -> LdapUserFederation {
    let mut ldap = LdapUserFederation {
        id: data.id().to_string(),
        name: data.get_string("name"),
        realm_id: data.get_string("realm_id"),
        enabled: data.get_bool("enabled"),
        priority: data.get_int("priority"),
        import_enabled: data.get_bool("import_enabled"),
        edit_mode: data.get_string("edit_mode"),
        sync_registrations: data.get_bool("sync_registrations"),
        vendor: data.get_string("vendor"),
        username_ldap_attribute: data.get_string("username_ldap_attribute"),
        rdn_ldap_attribute: data.get_string("rdn_ldap_attribute"),
        uuid_ldap_attribute: data.get_string("uuid_ldap_attribute"),
        user_object_classes: data.get_string_list("user_object_classes"),
        connection_url: data.get_string("connection_url"),
        users_dn: data.get_string("users_dn"),
        bind_dn: data.get_string("bind_dn"),
        bind_credential: data.get_string("bind_credential"),
        custom_user_search_filter: data.get_string("custom_user_search_filter"),
        search_scope: data.get_string("search_scope"),
        validate_password_policy: data.get_bool("validate_password_policy"),
        trust_email: data.get_bool("trust_email"),
        use_truststore_spi: data.get_string("use_truststore_spi"),
        connection_timeout: data.get_string("connection_timeout"),
        read_timeout: data.get_string("read_timeout"),
        pagination: data.get_bool("pagination"),
        batch_size_for_sync: data.get_int("batch_size_for_sync"),
        full_sync_period: data.get_int("full_sync_period"),
        changed_sync_period: data.get_int("changed_sync_period"),
        ..Default::default()
    };

    if let Some(cache) = first_block(data, "cache") {
        let int_or_unset = |key: &str| cache.get(key).and_then(Value::as_i64).or(Some(-1));
        ldap.cache_policy = cache.get_string("policy");
        ldap.max_lifespan = cache.get_string("max_lifespan");
        ldap.eviction_day = int_or_unset("eviction_day");
        ldap.eviction_hour = int_or_unset("eviction_hour");
        ldap.eviction_minute = int_or_unset("eviction_minute");
    }

    if let Some(kerberos) = first_block(data, "kerberos") {
        ldap.allow_kerberos_authentication = true;
        ldap.kerberos_realm = kerberos.get_string("kerberos_realm");
        ldap.server_principal = kerberos.get_string("server_principal");
        ldap.key_tab = kerberos.get_string("key_tab");
        ldap.use_kerberos_for_password_authentication =
            kerberos.get_bool("use_kerberos_for_password_authentication");
    }

    ldap
}

fn set_ldap_user_federation_data(data: &mut ResourceData, ldap: &LdapUserFederation) {
    data.set_id(&ldap.id);
    data.set("name", ldap.name.as_str());
    data.set("realm_id", ldap.realm_id.as_str());
    data.set("enabled", ldap.enabled);
    data.set("priority", ldap.priority);
    data.set("import_enabled", ldap.import_enabled);
    data.set("edit_mode", ldap.edit_mode.as_str());
    data.set("sync_registrations", ldap.sync_registrations);
    data.set("vendor", ldap.vendor.as_str());
    data.set("username_ldap_attribute", ldap.username_ldap_attribute.as_str());
    data.set("rdn_ldap_attribute", ldap.rdn_ldap_attribute.as_str());
    data.set("uuid_ldap_attribute", ldap.uuid_ldap_attribute.as_str());
    data.set("user_object_classes", ldap.user_object_classes.clone());
    data.set("connection_url", ldap.connection_url.as_str());
    data.set("users_dn", ldap.users_dn.as_str());
    data.set("bind_dn", ldap.bind_dn.as_str());
    if ldap.bind_credential != MASKED_CREDENTIAL {
        data.set("bind_credential", ldap.bind_credential.as_str());
    }
    data.set("custom_user_search_filter", ldap.custom_user_search_filter.as_str());
    data.set("search_scope", ldap.search_scope.as_str());
    data.set("validate_password_policy", ldap.validate_password_policy);
    data.set("trust_email", ldap.trust_email);
    data.set("use_truststore_spi", ldap.use_truststore_spi.as_str());
    data.set("connection_timeout", ldap.connection_timeout.as_str());
    data.set("read_timeout", ldap.read_timeout.as_str());
    data.set("pagination", ldap.pagination);
    data.set("batch_size_for_sync", ldap.batch_size_for_sync);
    data.set("full_sync_period", ldap.full_sync_period);
    data.set("changed_sync_period", ldap.changed_sync_period);

    if ldap.allow_kerberos_authentication {
        data.set(
            "kerberos",
            vec![json!({
                "kerberos_realm": ldap.kerberos_realm,
                "server_principal": ldap.server_principal,
                "key_tab": ldap.key_tab,
                "use_kerberos_for_password_authentication": ldap.use_kerberos_for_password_authentication,
            })],
        );
    } else {
        data.set("kerberos", Value::Array(Vec::new()));
    }

    // Only tracked when configured; Keycloak always reports a policy.
    if data.get_ok("cache").is_some() {
        let mut cache = Map::new();
        cache.insert("policy".into(), json!(ldap.cache_policy));
        if !ldap.max_lifespan.is_empty() {
            cache.insert("max_lifespan".into(), json!(ldap.max_lifespan));
        }
        for (key, value) in [
            ("eviction_day", ldap.eviction_day),
            ("eviction_hour", ldap.eviction_hour),
            ("eviction_minute", ldap.eviction_minute),
        ] {
            if let Some(value) = value.filter(|v| *v >= 0) {
                cache.insert(key.into(), json!(value));
            }
        }
        data.set("cache", vec![Value::Object(cache)]);
    }
}

pub struct LdapUserFederationResource;

#[async_trait::async_trait]
impl Resource for LdapUserFederationResource {
    fn schema(&self) -> Schema {
        ldap_user_federation_schema()
    }

    async fn validate(&self, _keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(get_ldap_user_federation_from_data(data).validate()?)
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mut ldap = get_ldap_user_federation_from_data(data);
        keycloak.new_ldap_user_federation(&mut ldap).await?;
        data.set_id(&ldap.id);
        Ok(())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let ldap = keycloak
            .get_ldap_user_federation(data.get_str("realm_id"), data.id())
            .await?;
        set_ldap_user_federation_data(data, &ldap);
        Ok(())
    }

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let ldap = get_ldap_user_federation_from_data(data);
        keycloak.update_ldap_user_federation(&ldap).await?;
        set_ldap_user_federation_data(data, &ldap);
        Ok(())
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak
            .delete_ldap_user_federation(data.get_str("realm_id"), data.id())
            .await?)
    }

    /// `{{realmId}}/{{userFederationId}}`, optionally followed by the bind
    /// credential, which cannot be read back.
    async fn import(&self, _keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        let parts: Vec<&str> = import_id.split('/').collect();
        let (realm_id, id, bind_credential) = match parts.as_slice() {
            [realm_id, id] if !realm_id.is_empty() && !id.is_empty() => (realm_id, id, None),
            [realm_id, id, credential] if !realm_id.is_empty() && !id.is_empty() => {
                (realm_id, id, Some(credential))
            }
            _ => {
                return Err(ProviderError::InvalidImport(
                    "{{realmId}}/{{userFederationId}}, {{realmId}}/{{userFederationId}}/{{bindCredentials}}"
                        .to_string(),
                ))
            }
        };
        let mut data = ResourceData::default().with_id(*id);
        data.set("realm_id", *realm_id);
        if let Some(credential) = bind_credential {
            data.set("bind_credential", *credential);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn planned(config: Value) -> std::result::Result<ResourceData, ProviderError> {
        let mut config = config.as_object().cloned().unwrap();
        let schema = ldap_user_federation_schema();
        schema.apply_defaults(&mut config);
        schema.validate(&config)?;
        Ok(ResourceData::new(config))
    }

    fn config() -> Value {
        json!({
            "name": "openldap",
            "realm_id": "test",
            "username_ldap_attribute": "cn",
            "rdn_ldap_attribute": "cn",
            "uuid_ldap_attribute": "entryDN",
            "user_object_classes": ["simpleSecurityObject", "organizationalRole"],
            "connection_url": "ldap://openldap",
            "users_dn": "dc=example,dc=org"
        })
    }

    #[test]
    fn defaults_and_blocks() {
        let mut config = config();
        config["cache"] = json!([{"policy": "EVICT_DAILY", "eviction_hour": 2}]);
        config["kerberos"] = json!([{
            "kerberos_realm": "FOO.LOCAL",
            "server_principal": "HTTP/host.foo.com@FOO.LOCAL",
            "key_tab": "/etc/krb5.keytab"
        }]);
        let ldap = get_ldap_user_federation_from_data(&planned(config).unwrap());
        assert_eq!(ldap.edit_mode, "READ_ONLY");
        assert_eq!(ldap.batch_size_for_sync, 1000);
        assert_eq!(ldap.full_sync_period, -1);
        assert!(ldap.pagination);
        assert_eq!(ldap.cache_policy, "EVICT_DAILY");
        assert_eq!(ldap.eviction_hour, Some(2));
        assert_eq!(ldap.eviction_day, Some(-1));
        assert!(ldap.allow_kerberos_authentication);
        assert!(!ldap.use_kerberos_for_password_authentication);
    }

    #[test]
    fn sync_periods_are_disabled_or_positive() {
        let mut config = config();
        config["full_sync_period"] = json!(0);
        let err = planned(config).unwrap_err();
        assert!(err
            .to_string()
            .contains("either -1 (disabled), or greater than zero, got 0"));
    }

    #[test]
    fn masked_credential_is_not_stored() {
        let mut data = planned(config()).unwrap();
        data.set("bind_credential", "secret");
        let ldap = LdapUserFederation {
            bind_credential: MASKED_CREDENTIAL.into(),
            ..get_ldap_user_federation_from_data(&data)
        };
        set_ldap_user_federation_data(&mut data, &ldap);
        assert_eq!(data.get_str("bind_credential"), "secret");
    }
}
