use std::collections::BTreeMap;

use semver::Version;

use crate::{
    error::{Error, Result},
    Keycloak,
};

/// Keycloak releases that change the behaviour of some resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display, strum::IntoStaticStr)]
pub enum KeycloakVersion {
    #[strum(serialize = "6.0.0")]
    V6,
    #[strum(serialize = "7.0.0")]
    V7,
    #[strum(serialize = "11.0.0")]
    V11,
    #[strum(serialize = "12.0.0")]
    V12,
    #[strum(serialize = "13.0.0")]
    V13,
    #[strum(serialize = "20.0.0")]
    V20,
    #[strum(serialize = "22.0.0")]
    V22,
    #[strum(serialize = "24.0.0")]
    V24,
    #[strum(serialize = "25.0.0")]
    V25,
    #[strum(serialize = "26.0.0")]
    V26,
}

impl KeycloakVersion {
    pub fn version(self) -> Version {
        let (major, minor, patch) = match self {
            KeycloakVersion::V6 => (6, 0, 0),
            KeycloakVersion::V7 => (7, 0, 0),
            KeycloakVersion::V11 => (11, 0, 0),
            KeycloakVersion::V12 => (12, 0, 0),
            KeycloakVersion::V13 => (13, 0, 0),
            KeycloakVersion::V20 => (20, 0, 0),
            KeycloakVersion::V22 => (22, 0, 0),
            KeycloakVersion::V24 => (24, 0, 0),
            KeycloakVersion::V25 => (25, 0, 0),
            KeycloakVersion::V26 => (26, 0, 0),
        };
        Version::new(major, minor, patch)
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub server_time: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct Theme {
    pub name: String,
    #[serde(default)]
    pub locales: Vec<String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(default)]
    pub system_info: SystemInfo,
    #[serde(default)]
    pub themes: BTreeMap<String, Vec<Theme>>,
}

impl ServerInfo {
    pub fn theme_is_installed(&self, theme_type: &str, name: &str) -> bool {
        self.themes
            .get(theme_type)
            .is_some_and(|themes| themes.iter().any(|t| t.name == name))
    }
}

/// Parses versions like `26.0.5`, `26.0.0-SNAPSHOT` or `7.6.0.GA`.
/// Qualifiers are dropped so snapshots compare equal to their release.
pub fn parse_version(raw: &str) -> Result<Version> {
    let mut parts = raw
        .split(['.', '-'])
        .map_while(|p| p.parse::<u64>().ok());
    let major = parts
        .next()
        .ok_or_else(|| Error::Other(format!("unable to parse keycloak version {raw:?}")))?;
    let minor = parts.next().unwrap_or_default();
    let patch = parts.next().unwrap_or_default();
    Ok(Version::new(major, minor, patch))
}

/// Maps a Red Hat SSO product version to the Keycloak release it ships.
pub fn red_hat_sso_to_keycloak(version: &Version) -> Result<Version> {
    match (version.major, version.minor) {
        (7, 4) => Ok(Version::new(9, 0, 3)),
        (7, 5) => Ok(Version::new(15, 0, 2)),
        (7, 6) => Ok(Version::new(18, 0, 0)),
        _ => Err(Error::Other(format!(
            "unable to map red hat sso version {version} to a keycloak version"
        ))),
    }
}

impl Keycloak {
    pub async fn server_info(&self) -> Result<ServerInfo> {
        self.get("/serverinfo").await
    }

    /// Server version, fetched once per handle.
    pub async fn version(&self) -> Result<&Version> {
        self.version_cell()
            .get_or_try_init(|| async {
                let info = self.server_info().await?;
                let version = parse_version(&info.system_info.version)?;
                let version = if self.config().red_hat_sso() {
                    red_hat_sso_to_keycloak(&version)?
                } else {
                    version
                };
                tracing::debug!("keycloak server version {version}");
                Ok::<_, Error>(version)
            })
            .await
    }

    pub async fn version_is_greater_than_or_equal_to(
        &self,
        version: KeycloakVersion,
    ) -> Result<bool> {
        Ok(*self.version().await? >= version.version())
    }
}

#[cfg(test)]
mod tests {
    use semver::Version;

    use super::{parse_version, red_hat_sso_to_keycloak, KeycloakVersion, ServerInfo};

    #[test]
    fn parse_lenient_versions() {
        assert_eq!(parse_version("26.0.5").unwrap(), Version::new(26, 0, 5));
        assert_eq!(
            parse_version("26.0.0-SNAPSHOT").unwrap(),
            Version::new(26, 0, 0)
        );
        assert_eq!(parse_version("7.6.0.GA").unwrap(), Version::new(7, 6, 0));
        assert_eq!(parse_version("11").unwrap(), Version::new(11, 0, 0));
        assert!(parse_version("unknown").is_err());
    }

    #[test]
    fn snapshot_satisfies_its_release() {
        let v = parse_version("11.0.0-SNAPSHOT").unwrap();
        assert!(v >= KeycloakVersion::V11.version());
        assert!(v < KeycloakVersion::V12.version());
    }

    #[test]
    fn red_hat_sso_mapping() {
        let kc = red_hat_sso_to_keycloak(&parse_version("7.6.0.GA").unwrap()).unwrap();
        assert_eq!(kc, Version::new(18, 0, 0));
        assert!(red_hat_sso_to_keycloak(&Version::new(8, 0, 0)).is_err());
    }

    #[test]
    fn version_names() {
        assert_eq!(KeycloakVersion::V11.to_string(), "11.0.0");
    }

    #[test]
    fn theme_lookup() {
        let info: ServerInfo = serde_json::from_value(serde_json::json!({
            "systemInfo": {"version": "26.0.5"},
            "themes": {"login": [{"name": "keycloak"}, {"name": "custom"}]}
        }))
        .unwrap();
        assert!(info.theme_is_installed("login", "custom"));
        assert!(!info.theme_is_installed("login", "missing"));
        assert!(!info.theme_is_installed("account", "custom"));
    }
}
