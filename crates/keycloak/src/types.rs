use serde::{de, de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;

/// Empty strings are left out of representations.
pub(crate) fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Representations carry durations as `i32` seconds.
pub(crate) fn seconds(value: i64) -> i32 {
    value.clamp(i32::MIN.into(), i32::MAX.into()) as i32
}

/// Moves a value between two serde shapes of the same JSON, e.g. a typed
/// config struct and the string map of a representation.
pub(crate) fn convert<T, U>(value: &T) -> Result<U>
where
    T: Serialize + ?Sized,
    U: DeserializeOwned,
{
    Ok(serde_json::from_value(serde_json::to_value(value)?)?)
}

/// Boolean that Keycloak stores as the string `"true"` / `"false"` inside
/// attribute and config maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolQuoted(pub bool);

impl From<bool> for BoolQuoted {
    fn from(value: bool) -> Self {
        BoolQuoted(value)
    }
}

impl From<BoolQuoted> for bool {
    fn from(value: BoolQuoted) -> Self {
        value.0
    }
}

impl Serialize for BoolQuoted {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(if self.0 { "true" } else { "false" })
    }
}

impl<'de> Deserialize<'de> for BoolQuoted {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Str(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(BoolQuoted(b)),
            Raw::Str(s) if s.is_empty() => Ok(BoolQuoted(false)),
            Raw::Str(s) => s
                .parse::<bool>()
                .map(BoolQuoted)
                .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(&s), &"a boolean")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{convert, non_empty, seconds, BoolQuoted};

    #[test]
    fn accepts_strings_and_bools() {
        let v: BoolQuoted = serde_json::from_str("\"true\"").unwrap();
        assert!(v.0);
        let v: BoolQuoted = serde_json::from_str("false").unwrap();
        assert!(!v.0);
        let v: BoolQuoted = serde_json::from_str("\"\"").unwrap();
        assert!(!v.0);
        assert!(serde_json::from_str::<BoolQuoted>("\"yes\"").is_err());
        assert_eq!(serde_json::to_string(&BoolQuoted(true)).unwrap(), "\"true\"");
    }

    #[test]
    fn representation_helpers() {
        assert_eq!(non_empty(""), None);
        assert_eq!(non_empty("x").as_deref(), Some("x"));
        assert_eq!(seconds(300), 300);
        assert_eq!(seconds(i64::MAX), i32::MAX);

        #[derive(serde::Serialize, serde::Deserialize)]
        struct Flags {
            #[serde(rename = "sync.enabled")]
            sync: BoolQuoted,
        }
        let map: HashMap<String, String> = convert(&Flags { sync: BoolQuoted(true) }).unwrap();
        assert_eq!(map["sync.enabled"], "true");
        let flags: Flags = convert(&map).unwrap();
        assert!(flags.sync.0);
    }
}
