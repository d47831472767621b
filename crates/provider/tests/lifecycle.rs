use kcp_keycloak::{config::Config, Keycloak};
use kcp_provider::{Provider, ProviderError, ResourceData};
use serde_json::{json, Map, Value};
use wiremock::{
    matchers::{body_partial_json, method, path, path_regex, query_param},
    Mock, MockServer, ResponseTemplate,
};

async fn provider(server: &MockServer) -> Provider {
    provider_with(server, Config::default()).await
}

async fn provider_with(server: &MockServer, config: Config) -> Provider {
    Mock::given(method("POST"))
        .and(path_regex(r"^/realms/[^/]+/protocol/openid-connect/token$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "t1",
            "expires_in": 300,
            "refresh_token": "r1",
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
    let keycloak = Keycloak::builder()
        .with_config(config.with_url(&server.uri()).with_credentials("admin", "admin"))
        .build()
        .await
        .unwrap();
    Provider::new().with_keycloak(keycloak)
}

fn config(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn group_is_created_and_read_back() {
    let server = MockServer::start().await;
    let provider = provider(&server).await;
    Mock::given(method("POST"))
        .and(path("/admin/realms/test/groups"))
        .and(body_partial_json(json!({"name": "dev", "attributes": {"team": ["a"]}})))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", format!("{}/admin/realms/test/groups/g1", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/test/groups/g1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "g1",
            "name": "dev",
            "path": "/dev",
            "attributes": {"team": ["a"]}
        })))
        .mount(&server)
        .await;

    let state = provider
        .create(
            "keycloak_group",
            &config(json!({"realm_id": "test", "name": "dev", "attributes": {"team": "a"}})),
        )
        .await
        .unwrap();
    assert_eq!(state.id(), "g1");
    assert_eq!(state.get_str("path"), "/dev");
    assert_eq!(state.get_string_map("attributes")["team"], "a");
}

#[tokio::test]
async fn objects_deleted_elsewhere_leave_state() {
    let server = MockServer::start().await;
    let provider = provider(&server).await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/test/groups/g1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Could not find group by id"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/admin/realms/test/groups/g1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let state = ResourceData::from(json!({"realm_id": "test", "name": "dev"})).with_id("g1");
    let refreshed = provider.read("keycloak_group", state.clone()).await.unwrap();
    assert!(refreshed.is_removed());
    provider.delete("keycloak_group", state).await.unwrap();
}

#[tokio::test]
async fn failed_login_never_forgets_objects() {
    // no token endpoint mounted: the login itself answers 404
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    let keycloak = Keycloak::builder()
        .with_config(
            Config::default()
                .with_url(&server.uri())
                .with_credentials("admin", "admin")
                .with_initial_login(false),
        )
        .build()
        .await
        .unwrap();
    let provider = Provider::new().with_keycloak(keycloak);

    let state = ResourceData::from(json!({"realm_id": "typo", "name": "dev"})).with_id("g1");
    let err = provider.read("keycloak_group", state.clone()).await.unwrap_err();
    assert!(!err.is_not_found());
    assert!(matches!(err, ProviderError::Keycloak(_)));
    let err = provider.delete("keycloak_group", state).await.unwrap_err();
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn server_errors_are_not_swallowed() {
    let server = MockServer::start().await;
    let provider = provider(&server).await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/test/groups/g1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let state = ResourceData::from(json!({"realm_id": "test"})).with_id("g1");
    let err = provider.read("keycloak_group", state).await.unwrap_err();
    assert!(matches!(err, ProviderError::Keycloak(_)));
}

#[tokio::test]
async fn role_policy_is_imported_by_resource_server() {
    let server = MockServer::start().await;
    let provider = provider(&server).await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/test/clients/rs-1/authz/resource-server/policy/role/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "p1",
            "name": "admins",
            "type": "role",
            "logic": "POSITIVE",
            "decisionStrategy": "UNANIMOUS",
            "roles": [{"id": "r1", "required": true}]
        })))
        .mount(&server)
        .await;

    let state = provider
        .import("keycloak_openid_client_role_policy", "test/rs-1/p1")
        .await
        .unwrap();
    assert_eq!(state.id(), "p1");
    assert_eq!(state.get_str("realm_id"), "test");
    assert_eq!(state.get_str("resource_server_id"), "rs-1");
    assert_eq!(state.get_list("role")[0]["required"], json!(true));

    let err = provider
        .import("keycloak_openid_client_role_policy", "rs-1/p1")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidImport(_)));
}

#[tokio::test]
async fn policy_data_source_matches_exact_name() {
    let server = MockServer::start().await;
    let provider = provider(&server).await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/test/clients/rs-1/authz/resource-server/policy"))
        .and(query_param("name", "admins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "p2", "name": "admins-old", "type": "role"},
            {"id": "p1", "name": "admins", "type": "role", "logic": "POSITIVE"}
        ])))
        .mount(&server)
        .await;

    let data = provider
        .read_data_source(
            "keycloak_openid_client_authorization_policy",
            &config(json!({"realm_id": "test", "resource_server_id": "rs-1", "name": "admins"})),
        )
        .await
        .unwrap();
    assert_eq!(data.id(), "p1");
    assert_eq!(data.get_str("type"), "role");
    assert_eq!(data.get_str("logic"), "POSITIVE");
}

#[tokio::test]
async fn mapper_needs_an_existing_identity_provider() {
    let server = MockServer::start().await;
    let provider = provider(&server).await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/test/identity-provider/instances/corp"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/realms/test/identity-provider/instances/corp/mappers"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider
        .create(
            "keycloak_hardcoded_role_identity_provider_mapper",
            &config(json!({
                "realm": "test",
                "name": "admins",
                "identity_provider_alias": "corp",
                "role": "admin"
            })),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "validation error: identity provider with alias corp not found"
    );
}

#[tokio::test]
async fn invalid_configuration_never_reaches_the_server() {
    let server = MockServer::start().await;
    let provider = provider(&server).await;

    let err = provider
        .create(
            "keycloak_openid_client_time_policy",
            &config(json!({
                "realm_id": "test",
                "resource_server_id": "rs-1",
                "name": "office-hours",
                "not_before": "next monday"
            })),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Validation(_)));
    assert!(server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .all(|request| !request.url.path().starts_with("/admin")));
}

/// Creates an LDAP group mapper with a `groups_path` against a server of the
/// given version. Returns the posted component and the resulting state.
async fn create_ldap_group_mapper(version: &str) -> (Value, ResourceData) {
    let server = MockServer::start().await;
    let provider = provider(&server).await;
    Mock::given(method("GET"))
        .and(path("/admin/serverinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "systemInfo": {"version": version}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/realms/test/components"))
        .respond_with(ResponseTemplate::new(201).insert_header(
            "Location",
            format!("{}/admin/realms/test/components/m1", server.uri()),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/test/components/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "m1",
            "name": "groups",
            "providerId": "group-ldap-mapper",
            "providerType": "org.keycloak.storage.ldap.mappers.LDAPStorageMapper",
            "parentId": "f1",
            "config": {
                "groups.dn": ["ou=groups,dc=example,dc=org"],
                "group.name.ldap.attribute": ["cn"],
                "group.object.classes": ["groupOfNames"],
                "preserve.group.inheritance": ["true"],
                "ignore.missing.groups": ["false"],
                "membership.ldap.attribute": ["member"],
                "membership.attribute.type": ["DN"],
                "membership.user.ldap.attribute": ["cn"],
                "mode": ["READ_ONLY"],
                "user.roles.retrieve.strategy": ["LOAD_GROUPS_BY_MEMBER_ATTRIBUTE"],
                "memberof.ldap.attribute": ["memberOf"],
                "drop.non.existing.groups.during.sync": ["false"]
            }
        })))
        .mount(&server)
        .await;

    let state = provider
        .create(
            "keycloak_ldap_group_mapper",
            &config(json!({
                "name": "groups",
                "realm_id": "test",
                "ldap_user_federation_id": "f1",
                "ldap_groups_dn": "ou=groups,dc=example,dc=org",
                "group_name_ldap_attribute": "cn",
                "group_object_classes": ["groupOfNames"],
                "membership_ldap_attribute": "member",
                "membership_user_ldap_attribute": "cn",
                "groups_path": "/ldap"
            })),
        )
        .await
        .unwrap();
    let requests = server.received_requests().await.unwrap();
    let post = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/admin/realms/test/components")
        .unwrap();
    (serde_json::from_slice(&post.body).unwrap(), state)
}

#[tokio::test]
async fn groups_path_is_dropped_for_keycloak_10() {
    let (component, state) = create_ldap_group_mapper("10.0.2").await;
    assert!(component["config"].get("groups.path").is_none());
    assert_eq!(component["config"]["groups.dn"][0], "ou=groups,dc=example,dc=org");
    // nothing came back from the server, the planned value stays
    assert_eq!(state.get_str("groups_path"), "/ldap");
    assert_eq!(state.id(), "m1");
}

#[tokio::test]
async fn groups_path_is_sent_from_keycloak_11_on() {
    let (component, _) = create_ldap_group_mapper("12.0.0").await;
    assert_eq!(component["config"]["groups.path"], json!(["/ldap"]));
}

#[tokio::test]
async fn ldap_mapper_import_defaults_to_configured_realm() {
    let server = MockServer::start().await;
    let provider = provider_with(&server, Config::default().with_realm("acme")).await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/acme/components/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "m1",
            "name": "full name",
            "providerId": "full-name-ldap-mapper",
            "providerType": "org.keycloak.storage.ldap.mappers.LDAPStorageMapper",
            "parentId": "f1",
            "config": {
                "ldap.full.name.attribute": ["cn"],
                "read.only": ["true"],
                "write.only": ["false"]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = provider
        .import("keycloak_ldap_full_name_mapper", "f1/m1")
        .await
        .unwrap();
    assert_eq!(state.id(), "m1");
    assert_eq!(state.get_str("realm_id"), "acme");
    assert_eq!(state.get_str("ldap_user_federation_id"), "f1");
    assert!(state.get_bool("read_only"));
}

#[tokio::test]
async fn generic_protocol_mapper_is_created_on_a_client_scope() {
    let server = MockServer::start().await;
    let provider = provider(&server).await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/test/client-scopes/s1/protocol-mappers/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "m0", "name": "email", "protocol": "openid-connect"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/realms/test/client-scopes/s1/protocol-mappers/models"))
        .and(body_partial_json(json!({
            "name": "department",
            "protocolMapper": "oidc-usermodel-attribute-mapper",
            "config": {"claim.name": "dept"}
        })))
        .respond_with(ResponseTemplate::new(201).insert_header(
            "Location",
            format!(
                "{}/admin/realms/test/client-scopes/s1/protocol-mappers/models/m1",
                server.uri()
            ),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/test/client-scopes/s1/protocol-mappers/models/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "m1",
            "name": "department",
            "protocol": "openid-connect",
            "protocolMapper": "oidc-usermodel-attribute-mapper",
            "config": {"claim.name": "dept", "user.attribute": "department"}
        })))
        .mount(&server)
        .await;

    let state = provider
        .create(
            "keycloak_generic_protocol_mapper",
            &config(json!({
                "realm_id": "test",
                "client_scope_id": "s1",
                "name": "department",
                "protocol": "openid-connect",
                "protocol_mapper": "oidc-usermodel-attribute-mapper",
                "config": {"claim.name": "dept", "user.attribute": "department"}
            })),
        )
        .await
        .unwrap();
    assert_eq!(state.id(), "m1");
    assert_eq!(state.get_str("client_scope_id"), "s1");
    assert_eq!(state.get_string_map("config")["user.attribute"], "department");
}

#[tokio::test]
async fn protocol_mapper_names_are_unique_per_client() {
    let server = MockServer::start().await;
    let provider = provider(&server).await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/test/clients/c1/protocol-mappers/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "m0", "name": "department"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/realms/test/clients/c1/protocol-mappers/models"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider
        .create(
            "keycloak_openid_user_attribute_protocol_mapper",
            &config(json!({
                "realm_id": "test",
                "client_id": "c1",
                "name": "department",
                "user_attribute": "department",
                "claim_name": "dept"
            })),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "validation error: a protocol mapper with name department already exists for this client"
    );
}

#[tokio::test]
async fn protocol_mapper_is_imported_from_a_client() {
    let server = MockServer::start().await;
    let provider = provider(&server).await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/test/clients/c1/protocol-mappers/models/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "m1",
            "name": "department",
            "protocol": "openid-connect",
            "protocolMapper": "oidc-usermodel-attribute-mapper",
            "config": {
                "id.token.claim": "true",
                "access.token.claim": "true",
                "userinfo.token.claim": "false",
                "user.attribute": "department",
                "claim.name": "dept",
                "jsonType.label": "String"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = provider
        .import("keycloak_openid_user_attribute_protocol_mapper", "test/client/c1/m1")
        .await
        .unwrap();
    assert_eq!(state.id(), "m1");
    assert_eq!(state.get_str("client_id"), "c1");
    assert!(state.get_ok("client_scope_id").is_none());
    assert!(!state.get_bool("add_to_userinfo"));
    assert!(!state.get_bool("multivalued"));
    assert_eq!(state.get_str("claim_name"), "dept");

    let err = provider
        .import("keycloak_generic_protocol_mapper", "test/c1/m1")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidImport(_)));
}
