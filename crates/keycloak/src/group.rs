use keycloak::types::GroupRepresentation;

use crate::{
    client::{created_id, Attributes},
    error::{Error, Result},
    types::non_empty,
    Keycloak,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub id: String,
    pub realm_id: String,
    pub parent_id: String,
    pub name: String,
    pub path: String,
    pub sub_groups: Vec<Group>,
    pub realm_roles: Vec<String>,
    pub attributes: Attributes,
}

impl From<GroupRepresentation> for Group {
    fn from(rep: GroupRepresentation) -> Self {
        Self {
            id: rep.id.unwrap_or_default(),
            realm_id: String::new(),
            parent_id: rep.parent_id.unwrap_or_default(),
            name: rep.name.unwrap_or_default(),
            path: rep.path.unwrap_or_default(),
            sub_groups: rep
                .sub_groups
                .unwrap_or_default()
                .into_iter()
                .map(Group::from)
                .collect(),
            realm_roles: rep.realm_roles.unwrap_or_default(),
            attributes: rep.attributes.unwrap_or_default().into_iter().collect(),
        }
    }
}

impl From<&Group> for GroupRepresentation {
    fn from(group: &Group) -> Self {
        Self {
            id: non_empty(&group.id),
            name: Some(group.name.clone()),
            path: non_empty(&group.path),
            attributes: Some(group.attributes.clone().into_iter().collect()),
            ..Default::default()
        }
    }
}

/// Keycloak has no parent pointer on groups. Walk the search result along
/// the group's path until the group itself shows up; its container is the
/// parent.
fn find_parent_group<'a>(
    group: &Group,
    groups: &'a [Group],
    parent: Option<&'a Group>,
) -> Option<Option<&'a Group>> {
    for candidate in groups {
        if candidate.id == group.id {
            return Some(parent);
        }
        if group.path.starts_with(&format!("{}/", candidate.path)) {
            if let Some(found) = find_parent_group(group, &candidate.sub_groups, Some(candidate)) {
                return Some(found);
            }
        }
    }
    None
}

/// Depth first search for the first group named `name`.
fn find_group_by_name<'a>(name: &str, groups: &'a [Group]) -> Option<&'a Group> {
    groups.iter().find_map(|group| {
        if group.name == name {
            Some(group)
        } else {
            find_group_by_name(name, &group.sub_groups)
        }
    })
}

impl Keycloak {
    /// Newer servers report `parentId`; older ones need the search walk.
    async fn group_parent_id(&self, group: &Group) -> Result<String> {
        if !group.parent_id.is_empty() || group.path == format!("/{}", group.name) {
            return Ok(group.parent_id.clone());
        }
        let groups = self.list_groups_with_name(&group.realm_id, &group.name).await?;
        find_parent_group(group, &groups, None)
            .map(|parent| parent.map(|p| p.id.clone()).unwrap_or_default())
            .ok_or_else(|| {
                Error::Other(format!(
                    "unable to determine parent ID for group with path {}",
                    group.path
                ))
            })
    }

    /// Top level groups are created under `/groups`, child groups under
    /// `/groups/{parent}/children`.
    pub async fn new_group(&self, group: &mut Group) -> Result<()> {
        let realm_id = group.realm_id.as_str();
        let parent_id = group.parent_id.as_str();
        let rep = GroupRepresentation::from(&*group);
        let response = if parent_id.is_empty() {
            self.call(|admin| admin.realm_groups_post(realm_id, rep.clone()))
                .await?
        } else {
            self.call(|admin| {
                admin.realm_groups_with_group_id_children_post(realm_id, parent_id, rep.clone())
            })
            .await?
        };
        group.id = created_id(&response, "group")?;
        Ok(())
    }

    pub async fn get_group(&self, realm_id: &str, id: &str) -> Result<Group> {
        let rep = self
            .call(|admin| admin.realm_groups_with_group_id_get(realm_id, id))
            .await?;
        let mut group = Group::from(rep);
        group.realm_id = realm_id.to_string();
        group.parent_id = self.group_parent_id(&group).await?;
        Ok(group)
    }

    pub async fn get_group_by_name(&self, realm_id: &str, name: &str) -> Result<Group> {
        let groups = self.list_groups_with_name(realm_id, name).await?;
        let mut group = find_group_by_name(name, &groups)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("no group with name {name} found")))?;
        group.realm_id = realm_id.to_string();
        group.parent_id = self.group_parent_id(&group).await?;
        Ok(group)
    }

    pub async fn list_groups_with_name(&self, realm_id: &str, name: &str) -> Result<Vec<Group>> {
        let groups = self
            .call(|admin| {
                admin.realm_groups_get(
                    realm_id,
                    None,
                    None,
                    None,
                    None,
                    None,
                    None,
                    Some(name.to_string()),
                    None,
                )
            })
            .await?;
        Ok(groups.into_iter().map(Group::from).collect())
    }

    pub async fn update_group(&self, group: &Group) -> Result<()> {
        self.call(|admin| {
            admin.realm_groups_with_group_id_put(&group.realm_id, &group.id, group.into())
        })
        .await?;
        Ok(())
    }

    pub async fn delete_group(&self, realm_id: &str, id: &str) -> Result<()> {
        self.call(|admin| admin.realm_groups_with_group_id_delete(realm_id, id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keycloak::types::GroupRepresentation;

    use super::{find_group_by_name, find_parent_group, Group};

    fn group(id: &str, name: &str, path: &str, sub_groups: Vec<Group>) -> Group {
        Group {
            id: id.into(),
            name: name.into(),
            path: path.into(),
            sub_groups,
            ..Default::default()
        }
    }

    fn tree() -> Vec<Group> {
        vec![
            group(
                "1",
                "team",
                "/team",
                vec![group(
                    "2",
                    "dev",
                    "/team/dev",
                    vec![group("3", "team", "/team/dev/team", vec![])],
                )],
            ),
            group("4", "other", "/other", vec![]),
        ]
    }

    #[test]
    fn parent_is_found_along_the_path() {
        let groups = tree();
        let nested = group("3", "team", "/team/dev/team", vec![]);
        let parent = find_parent_group(&nested, &groups, None).unwrap().unwrap();
        assert_eq!(parent.id, "2");
        let top = group("1", "team", "/team", vec![]);
        assert!(find_parent_group(&top, &groups, None).unwrap().is_none());
        let unknown = group("9", "x", "/team/x", vec![]);
        assert!(find_parent_group(&unknown, &groups, None).is_none());
    }

    #[test]
    fn nested_groups_keep_their_parent() {
        let rep: GroupRepresentation = serde_json::from_value(serde_json::json!({
            "id": "3",
            "name": "team",
            "path": "/team/dev/team",
            "parentId": "2",
            "attributes": {"cost-center": ["42"]}
        }))
        .unwrap();
        let group = Group::from(rep);
        assert_eq!(group.parent_id, "2");
        assert_eq!(group.attributes["cost-center"], vec!["42".to_string()]);
        let body = serde_json::to_value(GroupRepresentation::from(&group)).unwrap();
        assert!(body.get("parentId").is_none());
        assert_eq!(body["name"], "team");
    }

    #[test]
    fn depth_first_name_lookup() {
        let groups = tree();
        assert_eq!(find_group_by_name("dev", &groups).unwrap().id, "2");
        assert_eq!(find_group_by_name("team", &groups).unwrap().id, "1");
        assert!(find_group_by_name("missing", &groups).is_none());
    }
}
