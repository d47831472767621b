//! Duration strings in the `1h30m` notation used across resource
//! attributes, and their millisecond or second encodings on the wire.

use std::time::Duration;

use crate::error::{Error, Result};

fn invalid(raw: &str) -> Error {
    Error::Other(format!("time: invalid duration {raw:?}"))
}

/// Parses `300ms`, `1.5h`, `2h45m` or `0`. Negative durations are rejected.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let s = raw.strip_prefix('+').unwrap_or(raw);
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() || s.starts_with('-') {
        return Err(invalid(raw));
    }
    let mut total_nanos: f64 = 0.0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| invalid(raw))?;
        if number_len == 0 {
            return Err(invalid(raw));
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid(raw))?;
        rest = &rest[number_len..];
        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid(raw)),
        };
        total_nanos += value * nanos_per_unit;
        rest = &rest[unit_len..];
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Formats like Go's `time.Duration.String` at millisecond precision:
/// `0s`, `500ms`, `1m30s`, `1h0m0s`, `1.5s`.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms == 0 {
        return "0s".to_string();
    }
    if ms < 1000 {
        return format!("{ms}ms");
    }
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let fraction = ms % 1000;
    let seconds = if fraction == 0 {
        format!("{seconds}s")
    } else {
        let fraction = format!("{fraction:03}");
        format!("{seconds}.{}s", fraction.trim_end_matches('0'))
    };
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}")
    } else {
        seconds
    }
}

pub fn milliseconds_from_duration_string(raw: &str) -> Result<String> {
    Ok(parse_duration(raw)?.as_millis().to_string())
}

pub fn duration_string_from_milliseconds(ms: &str) -> Result<String> {
    let ms: u64 = ms.trim().parse().map_err(|_| invalid(ms))?;
    Ok(format_duration(Duration::from_millis(ms)))
}

pub fn seconds_from_duration_string(raw: &str) -> Result<String> {
    Ok(parse_duration(raw)?.as_secs().to_string())
}

pub fn duration_string_from_seconds(seconds: &str) -> Result<String> {
    let seconds: u64 = seconds.trim().parse().map_err(|_| invalid(seconds))?;
    Ok(format_duration(Duration::from_secs(seconds)))
}

/// Two duration strings describe the same span, e.g. `1h` and `60m`.
pub fn durations_equal(a: &str, b: &str) -> bool {
    match (parse_duration(a), parse_duration(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parse_go_durations() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn format_go_durations() {
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn wire_encodings() {
        assert_eq!(milliseconds_from_duration_string("1m").unwrap(), "60000");
        assert_eq!(duration_string_from_milliseconds("60000").unwrap(), "1m0s");
        assert_eq!(seconds_from_duration_string("1h").unwrap(), "3600");
        assert_eq!(duration_string_from_seconds("1800").unwrap(), "30m0s");
        assert!(duration_string_from_seconds("soon").is_err());
    }

    #[test]
    fn equivalent_durations() {
        assert!(durations_equal("1h", "60m"));
        assert!(durations_equal("1h0m0s", "3600s"));
        assert!(!durations_equal("1h", "1m"));
    }
}
