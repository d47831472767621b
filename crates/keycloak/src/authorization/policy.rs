use super::resource_server_url;
use crate::{
    client::encode,
    error::{Error, Result},
    Keycloak,
};

/// A typed policy living under `/policy/{KIND}`.
pub trait AuthorizationPolicy: serde::Serialize + serde::de::DeserializeOwned + Send + Sync {
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn realm_id(&self) -> &str;
    fn resource_server_id(&self) -> &str;
    fn set_scope(&mut self, realm_id: &str, resource_server_id: &str);

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

macro_rules! authorization_policy {
    ($policy:ty, $kind:literal) => {
        impl AuthorizationPolicy for $policy {
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn realm_id(&self) -> &str {
                &self.realm_id
            }

            fn resource_server_id(&self) -> &str {
                &self.resource_server_id
            }

            fn set_scope(&mut self, realm_id: &str, resource_server_id: &str) {
                self.realm_id = realm_id.to_string();
                self.resource_server_id = resource_server_id.to_string();
            }

            fn validate(&self) -> Result<()> {
                self.check()
            }
        }
    };
}

fn require_items(items_len: usize, what: &str) -> Result<()> {
    if items_len == 0 {
        return Err(Error::validation(format!("at least one {what} must be given")));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct RolePolicyRole {
    pub id: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePolicy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip)]
    pub realm_id: String,
    #[serde(skip)]
    pub resource_server_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub decision_strategy: String,
    #[serde(default)]
    pub logic: String,
    #[serde(rename = "type", default)]
    pub policy_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<RolePolicyRole>,
}

impl RolePolicy {
    fn check(&self) -> Result<()> {
        require_items(self.roles.len(), "role")
    }
}

authorization_policy!(RolePolicy, "role");

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationGroup {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default)]
    pub extend_children: bool,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPolicy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip)]
    pub realm_id: String,
    #[serde(skip)]
    pub resource_server_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub decision_strategy: String,
    #[serde(default)]
    pub logic: String,
    #[serde(rename = "type", default)]
    pub policy_type: String,
    #[serde(default)]
    pub groups_claim: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<AuthorizationGroup>,
}

impl GroupPolicy {
    fn check(&self) -> Result<()> {
        require_items(self.groups.len(), "group")
    }
}

authorization_policy!(GroupPolicy, "group");

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatePolicy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip)]
    pub realm_id: String,
    #[serde(skip)]
    pub resource_server_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub decision_strategy: String,
    #[serde(default)]
    pub logic: String,
    #[serde(rename = "type", default)]
    pub policy_type: String,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl AggregatePolicy {
    fn check(&self) -> Result<()> {
        require_items(self.policies.len(), "policy")
    }
}

authorization_policy!(AggregatePolicy, "aggregate");

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPolicy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip)]
    pub realm_id: String,
    #[serde(skip)]
    pub resource_server_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub decision_strategy: String,
    #[serde(default)]
    pub logic: String,
    #[serde(rename = "type", default)]
    pub policy_type: String,
    #[serde(default)]
    pub clients: Vec<String>,
}

impl ClientPolicy {
    fn check(&self) -> Result<()> {
        require_items(self.clients.len(), "client")
    }
}

authorization_policy!(ClientPolicy, "client");

/// Dates are `yyyy-MM-dd HH:mm:ss`; the ranges are plain integers kept as
/// strings because Keycloak returns them that way.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePolicy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip)]
    pub realm_id: String,
    #[serde(skip)]
    pub resource_server_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub decision_strategy: String,
    #[serde(default)]
    pub logic: String,
    #[serde(rename = "type", default)]
    pub policy_type: String,
    #[serde(default)]
    pub not_before: String,
    #[serde(default)]
    pub not_on_or_after: String,
    #[serde(default)]
    pub day_month: String,
    #[serde(default)]
    pub day_month_end: String,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub month_end: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub year_end: String,
    #[serde(default)]
    pub hour: String,
    #[serde(default)]
    pub hour_end: String,
    #[serde(default)]
    pub minute: String,
    #[serde(default)]
    pub minute_end: String,
}

impl TimePolicy {
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

authorization_policy!(TimePolicy, "time");

/// Type independent view returned by the policy search endpoint.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationPolicySummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub decision_strategy: String,
    #[serde(default)]
    pub logic: String,
    #[serde(rename = "type", default)]
    pub policy_type: String,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn policy_url(realm_id: &str, resource_server_id: &str) -> String {
    format!("{}/policy", resource_server_url(realm_id, resource_server_id))
}

impl Keycloak {
    pub async fn new_authorization_policy<P: AuthorizationPolicy>(&self, policy: &mut P) -> Result<()> {
        policy.validate()?;
        let created: serde_json::Value = self
            .post_json(
                &format!(
                    "{}/{}",
                    policy_url(policy.realm_id(), policy.resource_server_id()),
                    P::KIND
                ),
                &*policy,
            )
            .await?;
        let id = created
            .get("id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| Error::Other(format!("created {} policy has no id", P::KIND)))?;
        policy.set_id(id.to_string());
        Ok(())
    }

    pub async fn get_authorization_policy<P: AuthorizationPolicy>(
        &self,
        realm_id: &str,
        resource_server_id: &str,
        id: &str,
    ) -> Result<P> {
        let mut policy: P = self
            .get(&format!(
                "{}/{}/{}",
                policy_url(realm_id, resource_server_id),
                P::KIND,
                encode(id)
            ))
            .await?;
        policy.set_scope(realm_id, resource_server_id);
        Ok(policy)
    }

    pub async fn update_authorization_policy<P: AuthorizationPolicy>(&self, policy: &P) -> Result<()> {
        policy.validate()?;
        self.put(
            &format!(
                "{}/{}/{}",
                policy_url(policy.realm_id(), policy.resource_server_id()),
                P::KIND,
                encode(policy.id())
            ),
            policy,
        )
        .await
    }

    pub async fn delete_authorization_policy(
        &self,
        realm_id: &str,
        resource_server_id: &str,
        id: &str,
    ) -> Result<()> {
        self.delete(&format!(
            "{}/{}",
            policy_url(realm_id, resource_server_id),
            encode(id)
        ))
        .await
    }

    /// Exact name lookup across all policy types.
    pub async fn get_authorization_policy_by_name(
        &self,
        realm_id: &str,
        resource_server_id: &str,
        name: &str,
    ) -> Result<AuthorizationPolicySummary> {
        let policies: Vec<AuthorizationPolicySummary> = self
            .get_with_query(
                &policy_url(realm_id, resource_server_id),
                &[("name", name.to_string())],
            )
            .await?;
        policies
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::not_found(format!("authorization policy {name} not found")))
    }

    /// Policies a permission or aggregate policy depends on.
    pub async fn get_associated_policies(
        &self,
        realm_id: &str,
        resource_server_id: &str,
        id: &str,
    ) -> Result<Vec<AuthorizationPolicySummary>> {
        self.get(&format!(
            "{}/{}/associatedPolicies",
            policy_url(realm_id, resource_server_id),
            encode(id)
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referenced_items_are_required() {
        let policy = AggregatePolicy {
            name: "all".into(),
            ..Default::default()
        };
        assert_eq!(
            policy.validate().unwrap_err().to_string(),
            "validation error: at least one policy must be given"
        );
        let policy = RolePolicy {
            name: "admins".into(),
            roles: vec![RolePolicyRole {
                id: "r1".into(),
                required: true,
            }],
            ..Default::default()
        };
        assert!(policy.validate().is_ok());
        assert_eq!(<RolePolicy as AuthorizationPolicy>::KIND, "role");
    }

    #[test]
    fn group_policy_wire_shape() {
        let policy = GroupPolicy {
            name: "staff".into(),
            groups_claim: "groups".into(),
            groups: vec![AuthorizationGroup {
                id: "g1".into(),
                path: "/staff".into(),
                extend_children: true,
            }],
            policy_type: "group".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["groupsClaim"], "groups");
        assert_eq!(json["groups"][0]["extendChildren"], true);
        assert_eq!(json["type"], "group");
        assert!(json.get("realmId").is_none());
    }
}
