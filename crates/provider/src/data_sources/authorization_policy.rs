use kcp_keycloak::Keycloak;

use crate::{
    data::ResourceData,
    error::Result,
    resource::DataSource,
    schema::{Attribute, Schema},
};

/// Any policy of a resource server, looked up by its exact name.
pub struct AuthorizationPolicyDataSource;

#[async_trait::async_trait]
impl DataSource for AuthorizationPolicyDataSource {
    fn schema(&self) -> Schema {
        Schema::new()
            .attr("realm_id", Attribute::string().required())
            .attr("resource_server_id", Attribute::string().required())
            .attr("name", Attribute::string().required())
            .attr("description", Attribute::string().computed())
            .attr("decision_strategy", Attribute::string().computed())
            .attr("owner", Attribute::string().computed())
            .attr("logic", Attribute::string().computed())
            .attr("policies", Attribute::string_list().computed())
            .attr("resources", Attribute::string_list().computed())
            .attr("scopes", Attribute::string_list().computed())
            .attr("type", Attribute::string().computed())
    }

    async fn read(&self, keycloak: &Keycloak, data: &mut ResourceData) -> Result<()> {
        let policy = keycloak
            .get_authorization_policy_by_name(
                data.get_str("realm_id"),
                data.get_str("resource_server_id"),
                data.get_str("name"),
            )
            .await?;
        data.set_id(&policy.id);
        data.set("description", policy.description.as_str());
        data.set("decision_strategy", policy.decision_strategy.as_str());
        data.set("owner", policy.owner.as_str());
        data.set("logic", policy.logic.as_str());
        data.set("policies", policy.policies);
        data.set("resources", policy.resources);
        data.set("scopes", policy.scopes);
        data.set("type", policy.policy_type.as_str());
        Ok(())
    }
}
