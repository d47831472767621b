//! Per-attribute value checks run at plan time.

use regex::Regex;
use serde_json::Value;

pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub type CustomValidator = fn(&Value) -> Result<(), String>;

#[derive(Debug, Clone)]
pub enum Validator {
    StringInSlice(&'static [&'static str]),
    StringMatch(Regex, &'static str),
    IntBetween(i64, i64),
    IntAtLeast(i64),
    /// Duration strings such as `1h30m`.
    Duration,
    /// Timestamps in [`DATE_TIME_FORMAT`].
    DateTime,
    Custom(CustomValidator),
}

impl Validator {
    pub fn string_in_slice(values: &'static [&'static str]) -> Self {
        Validator::StringInSlice(values)
    }

    pub fn string_match(regex: &Regex, message: &'static str) -> Self {
        Validator::StringMatch(regex.clone(), message)
    }

    /// Checks one value. Null values are never checked; requiredness is the
    /// schema's concern.
    pub fn check(&self, name: &str, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            Validator::StringInSlice(values) => {
                let s = expect_str(name, value)?;
                if values.contains(&s) {
                    Ok(())
                } else {
                    Err(format!(
                        "expected {name} to be one of {values:?}, got {s}"
                    ))
                }
            }
            Validator::StringMatch(regex, message) => {
                let s = expect_str(name, value)?;
                if regex.is_match(s) {
                    Ok(())
                } else if message.is_empty() {
                    Err(format!(
                        "invalid value for {name} (should match {})",
                        regex.as_str()
                    ))
                } else {
                    Err(format!("invalid value for {name} ({message})"))
                }
            }
            Validator::IntBetween(min, max) => {
                let i = expect_int(name, value)?;
                if (*min..=*max).contains(&i) {
                    Ok(())
                } else {
                    Err(format!(
                        "expected {name} to be in the range ({min} - {max}), got {i}"
                    ))
                }
            }
            Validator::IntAtLeast(min) => {
                let i = expect_int(name, value)?;
                if i >= *min {
                    Ok(())
                } else {
                    Err(format!("expected {name} to be at least ({min}), got {i}"))
                }
            }
            Validator::Duration => {
                let s = expect_str(name, value)?;
                if s.is_empty() {
                    return Ok(());
                }
                kcp_keycloak::duration::parse_duration(s)
                    .map(|_| ())
                    .map_err(|err| format!("{name}: {err}"))
            }
            Validator::DateTime => {
                let s = expect_str(name, value)?;
                if s.is_empty() {
                    return Ok(());
                }
                chrono::NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT)
                    .map(|_| ())
                    .map_err(|err| {
                        format!("{name}: {s:?} is not a timestamp like 2006-01-02 15:04:05 ({err})")
                    })
            }
            Validator::Custom(f) => f(value).map_err(|err| format!("{name}: {err}")),
        }
    }
}

fn expect_str<'a>(name: &str, value: &'a Value) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected type of {name} to be string"))
}

fn expect_int(name: &str, value: &Value) -> Result<i64, String> {
    value
        .as_i64()
        .ok_or_else(|| format!("expected type of {name} to be integer"))
}

#[cfg(test)]
mod tests {
    use regex::Regex;
    use serde_json::json;

    use super::Validator;

    #[test]
    fn string_checks() {
        let v = Validator::string_in_slice(&["DN", "UID"]);
        assert!(v.check("type", &json!("DN")).is_ok());
        assert!(v.check("type", &json!("CN")).is_err());
        assert!(v.check("type", &json!(1)).is_err());

        let filter = Regex::new(r"^\(.+\)$").unwrap();
        let v = Validator::string_match(&filter, "must start with '(' and end with ')'");
        assert!(v.check("filter", &json!("(cn=*)")).is_ok());
        let err = v.check("filter", &json!("cn=*")).unwrap_err();
        assert_eq!(
            err,
            "invalid value for filter (must start with '(' and end with ')')"
        );
    }

    #[test]
    fn int_checks() {
        assert!(Validator::IntBetween(0, 6).check("day", &json!(6)).is_ok());
        assert!(Validator::IntBetween(0, 6).check("day", &json!(7)).is_err());
        assert!(Validator::IntAtLeast(1).check("n", &json!(0)).is_err());
    }

    #[test]
    fn duration_and_timestamp() {
        assert!(Validator::Duration.check("lifespan", &json!("1h30m")).is_ok());
        assert!(Validator::Duration.check("lifespan", &json!("soon")).is_err());
        assert!(Validator::DateTime
            .check("not_before", &json!("2024-01-02 03:04:05"))
            .is_ok());
        assert!(Validator::DateTime
            .check("not_before", &json!("2024-01-02T03:04:05Z"))
            .is_err());
        assert!(Validator::Duration.check("lifespan", &json!(null)).is_ok());
    }
}
