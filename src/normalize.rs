//! 响应规整：把 Graylog 原始响应整理成稳定的输出形状。

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::model::{NormalizedResponse, ResponseMetadata};

/// Level keyword groups in priority order; the first matching group wins.
const LEVEL_PATTERNS: [&str; 4] = [
    r"(?i)\b(ERROR|CRITICAL|FATAL)\b",
    r"(?i)\b(WARN|WARNING)\b",
    r"(?i)\b(INFO|INFORMATION)\b",
    r"(?i)\b(DEBUG|TRACE)\b",
];

/// 从消息文本中提取日志级别（大写）。没有命中任何关键字时返回 None。
pub fn extract_log_level(message: &str) -> Option<String> {
    for pattern in LEVEL_PATTERNS {
        if let Some(caps) = Regex::new(pattern).ok().and_then(|re| re.captures(message)) {
            return Some(caps[1].to_uppercase());
        }
    }
    None
}

/// 单条日志的统一格式。
///
/// Timestamp/message/source pass through verbatim, `level` falls back to a
/// scan of the message text, every other field is copied through at the top
/// level and the whole original entry survives under `raw`.
pub fn format_log_entry(entry: &Map<String, Value>) -> Value {
    let mut formatted = Map::new();
    formatted.insert(
        "timestamp".into(),
        entry.get("timestamp").cloned().unwrap_or(Value::Null),
    );
    formatted.insert(
        "message".into(),
        entry.get("message").cloned().unwrap_or_else(|| json!("")),
    );
    formatted.insert(
        "source".into(),
        entry.get("source").cloned().unwrap_or_else(|| json!("")),
    );

    match entry.get("level") {
        Some(level) if !level.is_null() => {
            formatted.insert("level".into(), level.clone());
        }
        _ => {
            let text = entry.get("message").and_then(Value::as_str).unwrap_or("");
            if let Some(level) = extract_log_level(text) {
                formatted.insert("level".into(), Value::from(level));
            }
        }
    }

    for (key, value) in entry {
        if !matches!(key.as_str(), "timestamp" | "message" | "source" | "level") {
            formatted.insert(key.clone(), value.clone());
        }
    }

    formatted.insert("raw".into(), Value::Object(entry.clone()));
    Value::Object(formatted)
}

/// 原始搜索响应 → NormalizedResponse。
///
/// Graylog wraps each hit under a `message` key; wrappers without one are
/// skipped rather than failing the whole response.
pub fn parse_search_response(response: &Value) -> NormalizedResponse {
    let total_results = response
        .get("total_results")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let execution_time = response
        .get("execution_time")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    let metadata = ResponseMetadata {
        query: response
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        time_range: response.get("timerange").cloned().unwrap_or_else(|| json!({})),
        fields: response.get("fields").cloned().unwrap_or_else(|| json!([])),
    };

    let messages = response
        .get("messages")
        .and_then(Value::as_array)
        .map(|wrappers| {
            wrappers
                .iter()
                .filter_map(|wrapper| wrapper.get("message").and_then(Value::as_object))
                .map(format_log_entry)
                .collect()
        })
        .unwrap_or_default();

    NormalizedResponse {
        total_results,
        execution_time,
        messages,
        metadata,
    }
}
