use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::warn;

/// 时间范围的后端表示：相对秒数或绝对 ISO-8601 时间戳。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeRangeSpec {
    Relative(u64),
    Absolute(String),
}

impl TimeRangeSpec {
    /// Wire value for the `range` parameter.
    pub fn into_value(self) -> Value {
        match self {
            TimeRangeSpec::Relative(seconds) => Value::from(seconds),
            TimeRangeSpec::Absolute(ts) => Value::from(ts),
        }
    }
}

/// 将人类可读的时间范围转换为 Graylog 期望的格式。
///
/// The relative-search endpoint takes a duration in seconds; absolute ranges
/// are ISO-8601 strings passed through verbatim. An unrecognized value is
/// still passed through as a best-effort absolute range (with a warning) so
/// the backend stays the final arbiter of validity. Pure, never fails.
pub fn normalize(time_range: &str) -> Option<TimeRangeSpec> {
    if time_range.is_empty() {
        return None;
    }

    if let Some(seconds) = parse_relative(time_range) {
        return Some(TimeRangeSpec::Relative(seconds));
    }

    if !is_iso_timestamp(time_range) {
        warn!("unrecognized time range format: {time_range}");
    }
    Some(TimeRangeSpec::Absolute(time_range.to_string()))
}

/// `<integer><unit>`，unit ∈ {s, m, h, d, w}。
fn parse_relative(time_range: &str) -> Option<u64> {
    let (idx, unit) = time_range.char_indices().last()?;
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86400,
        'w' => 604800,
        _ => return None,
    };
    let value = &time_range[..idx];
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<u64>().ok()?.checked_mul(multiplier)
}

fn is_iso_timestamp(input: &str) -> bool {
    DateTime::parse_from_rfc3339(input).is_ok()
        || NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(input, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_units_convert_to_seconds() {
        let cases = [
            ("30s", 30),
            ("5m", 300),
            ("2h", 7200),
            ("3d", 259200),
            ("1w", 604800),
            ("24h", 86400),
        ];
        for (input, expected) in cases {
            assert_eq!(
                normalize(input),
                Some(TimeRangeSpec::Relative(expected)),
                "input {input}"
            );
        }
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn iso_timestamps_pass_through_verbatim() {
        let ts = "2024-01-01T12:00:00Z";
        assert_eq!(normalize(ts), Some(TimeRangeSpec::Absolute(ts.into())));

        let naive = "2024-01-01T12:00:00";
        assert_eq!(
            normalize(naive),
            Some(TimeRangeSpec::Absolute(naive.into()))
        );
    }

    #[test]
    fn unparseable_input_is_best_effort_absolute() {
        assert_eq!(
            normalize("invalid"),
            Some(TimeRangeSpec::Absolute("invalid".into()))
        );
        // 小数和负数不是合法的相对范围
        assert_eq!(
            normalize("2.5h"),
            Some(TimeRangeSpec::Absolute("2.5h".into()))
        );
        assert_eq!(
            normalize("-2h"),
            Some(TimeRangeSpec::Absolute("-2h".into()))
        );
    }

    #[test]
    fn bare_unit_is_not_relative() {
        assert_eq!(normalize("h"), Some(TimeRangeSpec::Absolute("h".into())));
    }

    #[test]
    fn wire_values() {
        assert_eq!(
            TimeRangeSpec::Relative(3600).into_value(),
            serde_json::json!(3600)
        );
        assert_eq!(
            TimeRangeSpec::Absolute("2024-01-01T00:00:00Z".into()).into_value(),
            serde_json::json!("2024-01-01T00:00:00Z")
        );
    }
}
