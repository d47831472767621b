use std::marker::PhantomData;

use kcp_keycloak::{
    authorization::{
        AggregatePolicy, AuthorizationGroup, AuthorizationPolicy, ClientPolicy, GroupPolicy,
        RolePolicy, RolePolicyRole, TimePolicy, DECISION_STRATEGIES, LOGICS,
    },
    Keycloak,
};
use serde_json::{json, Value};

use super::authorization::{import_authorization_object, resource_server_schema};
use crate::{
    data::ResourceData,
    error::Result,
    resource::Resource,
    schema::{Attribute, Schema},
    validation::Validator,
};

/// One policy type. The resource around it handles the shared attributes
/// and the client calls.
pub trait PolicyKind: Send + Sync {
    type Policy: AuthorizationPolicy;

    fn extend_schema(schema: Schema) -> Schema;

    fn from_data(data: &ResourceData) -> Self::Policy;

    fn set_data(data: &mut ResourceData, policy: &Self::Policy);
}

fn policy_schema() -> Schema {
    resource_server_schema()
        .attr("name", Attribute::string().required())
        .attr(
            "decision_strategy",
            Attribute::string()
                .default("UNANIMOUS")
                .validate(Validator::string_in_slice(DECISION_STRATEGIES)),
        )
        .attr(
            "logic",
            Attribute::string()
                .default("POSITIVE")
                .validate(Validator::string_in_slice(LOGICS)),
        )
        .attr("description", Attribute::string().optional())
}

/// Writes the attributes every policy carries.
fn set_common_data(
    data: &mut ResourceData,
    policy: &impl AuthorizationPolicy,
    name: &str,
    description: &str,
    decision_strategy: &str,
    logic: &str,
) {
    data.set_id(policy.id());
    data.set("realm_id", policy.realm_id());
    data.set("resource_server_id", policy.resource_server_id());
    data.set("name", name);
    data.set("description", description);
    data.set("decision_strategy", decision_strategy);
    data.set("logic", logic);
}

pub struct AuthorizationPolicyResource<K>(PhantomData<K>);

impl<K> Default for AuthorizationPolicyResource<K> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

#[async_trait::async_trait]
impl<K: PolicyKind + 'static> Resource for AuthorizationPolicyResource<K> {
    fn schema(&self) -> Schema {
        K::extend_schema(policy_schema())
    }

    async fn validate(&self, _keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(K::from_data(data).validate()?)
    }

    async fn create(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let mut policy = K::from_data(data);
        keycloak.new_authorization_policy(&mut policy).await?;
        data.set_id(policy.id());
        Ok(())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let policy: K::Policy = keycloak
            .get_authorization_policy(
                data.get_str("realm_id"),
                data.get_str("resource_server_id"),
                data.id(),
            )
            .await?;
        K::set_data(data, &policy);
        Ok(())
    }

    async fn update(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let policy = K::from_data(data);
        keycloak.update_authorization_policy(&policy).await?;
        K::set_data(data, &policy);
        Ok(())
    }

    async fn delete(&self, keycloak: &Keycloak, data: &ResourceData) -> Result<()> {
        Ok(keycloak
            .delete_authorization_policy(
                data.get_str("realm_id"),
                data.get_str("resource_server_id"),
                data.id(),
            )
            .await?)
    }

    async fn import(&self, _keycloak: &Keycloak, import_id: &str) -> Result<ResourceData> {
        import_authorization_object(import_id, "policy")
    }
}

pub struct Role;

impl PolicyKind for Role {
    type Policy = RolePolicy;

    fn extend_schema(schema: Schema) -> Schema {
        schema
            .attr("type", Attribute::string().computed())
            .attr(
                "role",
                Attribute::block_set(
                    Schema::new()
                        .attr("id", Attribute::string().required())
                        .attr("required", Attribute::bool().default(false)),
                )
                .required()
                .min_items(1),
            )
    }

    fn from_data(data: &ResourceData) -> RolePolicy {
        RolePolicy {
            id: data.id().to_string(),
            realm_id: data.get_string("realm_id"),
            resource_server_id: data.get_string("resource_server_id"),
            name: data.get_string("name"),
            description: data.get_string("description"),
            decision_strategy: data.get_string("decision_strategy"),
            logic: data.get_string("logic"),
            policy_type: "role".to_string(),
            roles: data
                .get_list("role")
                .iter()
                .map(|role| RolePolicyRole {
                    id: role["id"].as_str().unwrap_or_default().to_string(),
                    required: role["required"].as_bool().unwrap_or_default(),
                })
                .collect(),
        }
    }

    fn set_data(data: &mut ResourceData, policy: &RolePolicy) {
        set_common_data(
            data,
            policy,
            &policy.name,
            &policy.description,
            &policy.decision_strategy,
            &policy.logic,
        );
        data.set("type", policy.policy_type.as_str());
        let roles: Vec<Value> = policy
            .roles
            .iter()
            .map(|role| json!({"id": role.id, "required": role.required}))
            .collect();
        data.set("role", roles);
    }
}

pub struct Group;

impl PolicyKind for Group {
    type Policy = GroupPolicy;

    fn extend_schema(schema: Schema) -> Schema {
        schema.attr("groups_claim", Attribute::string().optional()).attr(
            "groups",
            Attribute::block_set(
                Schema::new()
                    .attr("id", Attribute::string().required())
                    .attr("path", Attribute::string().required())
                    .attr("extend_children", Attribute::bool().required()),
            )
            .required()
            .min_items(1),
        )
    }

    fn from_data(data: &ResourceData) -> GroupPolicy {
        GroupPolicy {
            id: data.id().to_string(),
            realm_id: data.get_string("realm_id"),
            resource_server_id: data.get_string("resource_server_id"),
            name: data.get_string("name"),
            description: data.get_string("description"),
            decision_strategy: data.get_string("decision_strategy"),
            logic: data.get_string("logic"),
            policy_type: "group".to_string(),
            groups_claim: data.get_string("groups_claim"),
            groups: data
                .get_list("groups")
                .iter()
                .map(|group| AuthorizationGroup {
                    id: group["id"].as_str().unwrap_or_default().to_string(),
                    path: group["path"].as_str().unwrap_or_default().to_string(),
                    extend_children: group["extend_children"].as_bool().unwrap_or_default(),
                })
                .collect(),
        }
    }

    fn set_data(data: &mut ResourceData, policy: &GroupPolicy) {
        set_common_data(
            data,
            policy,
            &policy.name,
            &policy.description,
            &policy.decision_strategy,
            &policy.logic,
        );
        data.set("groups_claim", policy.groups_claim.as_str());
        let groups: Vec<Value> = policy
            .groups
            .iter()
            .map(|group| {
                json!({
                    "id": group.id,
                    "path": group.path,
                    "extend_children": group.extend_children,
                })
            })
            .collect();
        data.set("groups", groups);
    }
}

pub struct Aggregate;

impl PolicyKind for Aggregate {
    type Policy = AggregatePolicy;

    fn extend_schema(schema: Schema) -> Schema {
        schema.attr("policies", Attribute::string_set().required().min_items(1))
    }

    fn from_data(data: &ResourceData) -> AggregatePolicy {
        AggregatePolicy {
            id: data.id().to_string(),
            realm_id: data.get_string("realm_id"),
            resource_server_id: data.get_string("resource_server_id"),
            name: data.get_string("name"),
            description: data.get_string("description"),
            decision_strategy: data.get_string("decision_strategy"),
            logic: data.get_string("logic"),
            policy_type: "aggregate".to_string(),
            policies: data.get_string_list("policies"),
            ..Default::default()
        }
    }

    fn set_data(data: &mut ResourceData, policy: &AggregatePolicy) {
        set_common_data(
            data,
            policy,
            &policy.name,
            &policy.description,
            &policy.decision_strategy,
            &policy.logic,
        );
        data.set("policies", policy.policies.clone());
    }
}

pub struct Client;

impl PolicyKind for Client {
    type Policy = ClientPolicy;

    fn extend_schema(schema: Schema) -> Schema {
        schema.attr("clients", Attribute::string_set().required().min_items(1))
    }

    fn from_data(data: &ResourceData) -> ClientPolicy {
        ClientPolicy {
            id: data.id().to_string(),
            realm_id: data.get_string("realm_id"),
            resource_server_id: data.get_string("resource_server_id"),
            name: data.get_string("name"),
            description: data.get_string("description"),
            decision_strategy: data.get_string("decision_strategy"),
            logic: data.get_string("logic"),
            policy_type: "client".to_string(),
            clients: data.get_string_list("clients"),
        }
    }

    fn set_data(data: &mut ResourceData, policy: &ClientPolicy) {
        set_common_data(
            data,
            policy,
            &policy.name,
            &policy.description,
            &policy.decision_strategy,
            &policy.logic,
        );
        data.set("clients", policy.clients.clone());
    }
}

pub struct Time;

const TIME_RANGES: &[&str] = &[
    "day_month",
    "day_month_end",
    "month",
    "month_end",
    "year",
    "year_end",
    "hour",
    "hour_end",
    "minute",
    "minute_end",
];

impl PolicyKind for Time {
    type Policy = TimePolicy;

    fn extend_schema(schema: Schema) -> Schema {
        let schema = schema
            .attr("not_before", Attribute::string().optional().validate(Validator::DateTime))
            .attr("not_on_or_after", Attribute::string().optional().validate(Validator::DateTime));
        TIME_RANGES
            .iter()
            .fold(schema, |schema, name| schema.attr(*name, Attribute::string().optional()))
    }

    fn from_data(data: &ResourceData) -> TimePolicy {
        TimePolicy {
            id: data.id().to_string(),
            realm_id: data.get_string("realm_id"),
            resource_server_id: data.get_string("resource_server_id"),
            name: data.get_string("name"),
            description: data.get_string("description"),
            decision_strategy: data.get_string("decision_strategy"),
            logic: data.get_string("logic"),
            policy_type: "time".to_string(),
            not_before: data.get_string("not_before"),
            not_on_or_after: data.get_string("not_on_or_after"),
            day_month: data.get_string("day_month"),
            day_month_end: data.get_string("day_month_end"),
            month: data.get_string("month"),
            month_end: data.get_string("month_end"),
            year: data.get_string("year"),
            year_end: data.get_string("year_end"),
            hour: data.get_string("hour"),
            hour_end: data.get_string("hour_end"),
            minute: data.get_string("minute"),
            minute_end: data.get_string("minute_end"),
        }
    }

    fn set_data(data: &mut ResourceData, policy: &TimePolicy) {
        set_common_data(
            data,
            policy,
            &policy.name,
            &policy.description,
            &policy.decision_strategy,
            &policy.logic,
        );
        data.set("not_before", policy.not_before.as_str());
        data.set("not_on_or_after", policy.not_on_or_after.as_str());
        data.set("day_month", policy.day_month.as_str());
        data.set("day_month_end", policy.day_month_end.as_str());
        data.set("month", policy.month.as_str());
        data.set("month_end", policy.month_end.as_str());
        data.set("year", policy.year.as_str());
        data.set("year_end", policy.year_end.as_str());
        data.set("hour", policy.hour.as_str());
        data.set("hour_end", policy.hour_end.as_str());
        data.set("minute", policy.minute.as_str());
        data.set("minute_end", policy.minute_end.as_str());
    }
}

pub type RolePolicyResource = AuthorizationPolicyResource<Role>;
pub type GroupPolicyResource = AuthorizationPolicyResource<Group>;
pub type AggregatePolicyResource = AuthorizationPolicyResource<Aggregate>;
pub type ClientPolicyResource = AuthorizationPolicyResource<Client>;
pub type TimePolicyResource = AuthorizationPolicyResource<Time>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_blocks_become_policy_roles() {
        let data = ResourceData::from(json!({
            "realm_id": "test",
            "resource_server_id": "rs-1",
            "name": "admins",
            "decision_strategy": "UNANIMOUS",
            "logic": "POSITIVE",
            "role": [{"id": "r-1", "required": true}, {"id": "r-2", "required": false}]
        }));
        let policy = Role::from_data(&data);
        assert_eq!(policy.roles.len(), 2);
        assert!(policy.roles[0].required);
        assert_eq!(policy.roles[1].id, "r-2");

        let mut state = ResourceData::default();
        Role::set_data(&mut state, &policy);
        assert_eq!(state.get_str("resource_server_id"), "rs-1");
        assert_eq!(state.get_list("role")[0]["id"], "r-1");
    }

    #[test]
    fn time_policy_rejects_malformed_dates() {
        let schema = AuthorizationPolicyResource::<Time>::default().schema();
        let mut config = json!({
            "realm_id": "test",
            "resource_server_id": "rs-1",
            "name": "office-hours",
            "not_before": "2024-01-01 08:00:00",
            "hour": "8",
            "hour_end": "18"
        })
        .as_object()
        .cloned()
        .unwrap();
        schema.apply_defaults(&mut config);
        schema.validate(&config).unwrap();

        config.insert("not_on_or_after".into(), json!("tomorrow"));
        assert!(schema.validate(&config).is_err());
    }

    #[test]
    fn client_policy_needs_a_client() {
        let data = ResourceData::from(json!({"name": "cli", "clients": []}));
        assert!(Client::from_data(&data).validate().is_err());
    }
}
