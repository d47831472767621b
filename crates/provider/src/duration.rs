//! Duration attributes. Users write `1h30m`; Keycloak stores seconds or
//! milliseconds.

use kcp_keycloak::duration::{
    duration_string_from_seconds, durations_equal, seconds_from_duration_string,
};

use crate::{data::ResourceData, error::Result};

/// Seconds for a duration attribute, `None` when unset.
pub fn get_duration_seconds(data: &ResourceData, key: &str) -> Result<Option<i64>> {
    let raw = data.get_str(key);
    if raw.is_empty() {
        return Ok(None);
    }
    let seconds = seconds_from_duration_string(raw)?;
    Ok(seconds.parse().ok())
}

/// Stores `seconds` as a duration string unless the attribute already holds
/// an equivalent one, so `60m` does not flip to `1h0m0s` on every read.
pub fn set_duration_seconds(data: &mut ResourceData, key: &str, seconds: Option<i64>) -> Result<()> {
    let formatted = match seconds {
        Some(seconds) if seconds > 0 => duration_string_from_seconds(&seconds.to_string())?,
        _ => String::new(),
    };
    if !suppress_duration_diff(data.get_str(key), &formatted) {
        data.set(key, formatted);
    }
    Ok(())
}

/// Equivalent durations produce no diff.
pub fn suppress_duration_diff(old: &str, new: &str) -> bool {
    if old.is_empty() || new.is_empty() {
        return old == new;
    }
    durations_equal(old, new)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn seconds_round_trip_through_attributes() {
        let mut data = ResourceData::from(json!({"lifespan": "60m"}));
        assert_eq!(get_duration_seconds(&data, "lifespan").unwrap(), Some(3600));
        set_duration_seconds(&mut data, "lifespan", Some(3600)).unwrap();
        assert_eq!(data.get_str("lifespan"), "60m");
        set_duration_seconds(&mut data, "lifespan", Some(5400)).unwrap();
        assert_eq!(data.get_str("lifespan"), "1h30m0s");
        set_duration_seconds(&mut data, "lifespan", None).unwrap();
        assert_eq!(data.get_str("lifespan"), "");
        assert_eq!(get_duration_seconds(&data, "lifespan").unwrap(), None);
    }

    #[test]
    fn diff_suppression() {
        assert!(suppress_duration_diff("1h", "3600s"));
        assert!(!suppress_duration_diff("1h", "30m"));
        assert!(!suppress_duration_diff("", "1h"));
    }
}
