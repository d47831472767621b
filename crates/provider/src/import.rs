//! Parsing of import ids into the coordinates a resource needs to read an
//! existing object.

use crate::error::{ProviderError, Result};

/// Location of a mapper: the realm, the object it hangs off (LDAP
/// federation, identity provider, client, ...) and its own id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperImportId {
    pub realm: String,
    pub parent_id: String,
    pub id: String,
}

/// An object that lives directly in a realm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmScopedImportId {
    pub realm: String,
    pub id: String,
}

fn segments<'a>(import_id: &'a str, formats: &str) -> Result<Vec<&'a str>> {
    let parts: Vec<&str> = import_id.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ProviderError::InvalidImport(formats.to_string()));
    }
    Ok(parts)
}

/// `{{realm}}/{{parentId}}/{{mapperId}}`, or `{{parentId}}/{{mapperId}}` in
/// the default realm.
pub fn parse_mapper_import_id(import_id: &str, default_realm: &str) -> Result<MapperImportId> {
    const FORMATS: &str =
        "{{realm}}/{{parentId}}/{{mapperId}}, {{parentId}}/{{mapperId}}";
    match segments(import_id, FORMATS)?.as_slice() {
        [realm, parent_id, id] => Ok(MapperImportId {
            realm: realm.to_string(),
            parent_id: parent_id.to_string(),
            id: id.to_string(),
        }),
        [parent_id, id] => Ok(MapperImportId {
            realm: default_realm.to_string(),
            parent_id: parent_id.to_string(),
            id: id.to_string(),
        }),
        _ => Err(ProviderError::InvalidImport(FORMATS.to_string())),
    }
}

/// `{{realm}}/{{id}}`, or `{{id}}` in the default realm.
pub fn parse_realm_scoped_import_id(
    import_id: &str,
    default_realm: &str,
) -> Result<RealmScopedImportId> {
    const FORMATS: &str = "{{realm}}/{{id}}, {{id}}";
    match segments(import_id, FORMATS)?.as_slice() {
        [realm, id] => Ok(RealmScopedImportId {
            realm: realm.to_string(),
            id: id.to_string(),
        }),
        [id] => Ok(RealmScopedImportId {
            realm: default_realm.to_string(),
            id: id.to_string(),
        }),
        _ => Err(ProviderError::InvalidImport(FORMATS.to_string())),
    }
}

/// Exactly three segments, for objects whose parent cannot be defaulted:
/// identity provider mappers (`realm/alias/id`) and authorization objects
/// (`realm/resourceServerId/id`). `formats` names the segments in errors.
pub fn parse_three_part_import_id(import_id: &str, formats: &str) -> Result<MapperImportId> {
    match segments(import_id, formats)?.as_slice() {
        [realm, parent_id, id] => Ok(MapperImportId {
            realm: realm.to_string(),
            parent_id: parent_id.to_string(),
            id: id.to_string(),
        }),
        _ => Err(ProviderError::InvalidImport(formats.to_string())),
    }
}

/// Location of a protocol mapper; exactly one of `client_id` and
/// `client_scope_id` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMapperImportId {
    pub realm_id: String,
    pub client_id: String,
    pub client_scope_id: String,
    pub id: String,
}

/// `{{realmId}}/client/{{clientId}}/{{protocolMapperId}}` or
/// `{{realmId}}/client-scope/{{clientScopeId}}/{{protocolMapperId}}`.
pub fn parse_protocol_mapper_import_id(import_id: &str) -> Result<ProtocolMapperImportId> {
    const FORMATS: &str = "{{realmId}}/client/{{clientId}}/{{protocolMapperId}}, {{realmId}}/client-scope/{{clientScopeId}}/{{protocolMapperId}}";
    let (realm, kind, parent_id, id) = match segments(import_id, FORMATS)?.as_slice() {
        [realm, kind, parent_id, id] => (*realm, *kind, *parent_id, *id),
        _ => return Err(ProviderError::InvalidImport(FORMATS.to_string())),
    };
    let (client_id, client_scope_id) = match kind {
        "client" => (parent_id, ""),
        "client-scope" => ("", parent_id),
        _ => return Err(ProviderError::InvalidImport(FORMATS.to_string())),
    };
    Ok(ProtocolMapperImportId {
        realm_id: realm.to_string(),
        client_id: client_id.to_string(),
        client_scope_id: client_scope_id.to_string(),
        id: id.to_string(),
    })
}

pub fn parse_realm_import_id(import_id: &str) -> Result<String> {
    const FORMATS: &str = "{{realm}}";
    match segments(import_id, FORMATS)?.as_slice() {
        [realm] => Ok(realm.to_string()),
        _ => Err(ProviderError::InvalidImport(FORMATS.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapper_ids_with_and_without_realm() {
        let id = parse_mapper_import_id("test/ldap-1/mapper-1", "master").unwrap();
        assert_eq!(
            id,
            MapperImportId {
                realm: "test".into(),
                parent_id: "ldap-1".into(),
                id: "mapper-1".into(),
            }
        );
        let id = parse_mapper_import_id("ldap-1/mapper-1", "master").unwrap();
        assert_eq!(id.realm, "master");
        assert_eq!(id.parent_id, "ldap-1");
        assert_eq!(id.id, "mapper-1");
    }

    #[test]
    fn mapper_ids_with_wrong_shape() {
        for bad in ["mapper-1", "a/b/c/d", "test//mapper-1", "/ldap-1/mapper-1", ""] {
            let err = parse_mapper_import_id(bad, "master").unwrap_err();
            assert!(matches!(err, ProviderError::InvalidImport(_)), "{bad}");
        }
        assert_eq!(
            parse_mapper_import_id("x", "master").unwrap_err().to_string(),
            "Invalid import. Supported import formats: {{realm}}/{{parentId}}/{{mapperId}}, {{parentId}}/{{mapperId}}"
        );
    }

    #[test]
    fn realm_scoped_ids() {
        let id = parse_realm_scoped_import_id("group-1", "acme").unwrap();
        assert_eq!((id.realm.as_str(), id.id.as_str()), ("acme", "group-1"));
        let id = parse_realm_scoped_import_id("test/group-1", "acme").unwrap();
        assert_eq!(id.realm, "test");
        assert!(parse_realm_scoped_import_id("a/b/c", "acme").is_err());
    }

    #[test]
    fn three_part_ids_have_no_default() {
        let formats = "{{realm}}/{{identityProviderAlias}}/{{identityProviderMapperId}}";
        assert!(parse_three_part_import_id("test/idp/m1", formats).is_ok());
        let err = parse_three_part_import_id("idp/m1", formats).unwrap_err();
        assert!(err.to_string().ends_with(formats));
        assert_eq!(parse_realm_import_id("test").unwrap(), "test");
        assert!(parse_realm_import_id("test/x").is_err());
    }

    #[test]
    fn protocol_mapper_ids_name_their_owner() {
        let id = parse_protocol_mapper_import_id("test/client/c1/m1").unwrap();
        assert_eq!(
            id,
            ProtocolMapperImportId {
                realm_id: "test".into(),
                client_id: "c1".into(),
                client_scope_id: String::new(),
                id: "m1".into(),
            }
        );
        let id = parse_protocol_mapper_import_id("test/client-scope/s1/m1").unwrap();
        assert_eq!(id.client_scope_id, "s1");
        assert!(id.client_id.is_empty());

        for bad in ["test/role/r1/m1", "test/c1/m1", "test/client//m1", "a/client/b/c/d"] {
            let err = parse_protocol_mapper_import_id(bad).unwrap_err();
            assert!(matches!(err, ProviderError::InvalidImport(_)), "{bad}");
        }
    }
}
