use serde_json::json;

use graylog_search_mcp::normalize;

#[test]
fn graylog_search_response_normalizes_to_stable_shape() {
    let raw = json!({
        "query": "level:ERROR",
        "total_results": 3,
        "execution_time": 42.0,
        "timerange": { "type": "relative", "range": 3600 },
        "fields": ["message", "source"],
        "messages": [
            {
                "index": "graylog_42",
                "message": {
                    "_id": "abc",
                    "timestamp": "2024-01-01T12:00:00.000Z",
                    "message": "ERROR: connection refused",
                    "source": "web-1",
                    "facility": "nginx"
                }
            },
            {
                "message": {
                    "timestamp": "2024-01-01T12:00:01.000Z",
                    "message": "request ok",
                    "source": "web-2",
                    "level": 6
                }
            },
            { "index": "graylog_42" }
        ]
    });

    let normalized = normalize::parse_search_response(&raw);
    let value = serde_json::to_value(&normalized).unwrap();

    assert_eq!(value["total_results"], json!(3));
    assert_eq!(value["execution_time"], json!(42.0));
    assert_eq!(value["metadata"]["query"], json!("level:ERROR"));
    assert_eq!(value["metadata"]["time_range"]["range"], json!(3600));
    assert_eq!(value["metadata"]["fields"], json!(["message", "source"]));

    let messages = value["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2, "wrapper without message object is skipped");

    // 第一条：level 从消息文本推导，透传字段保留，raw 无损
    assert_eq!(messages[0]["level"], json!("ERROR"));
    assert_eq!(messages[0]["facility"], json!("nginx"));
    assert_eq!(messages[0]["_id"], json!("abc"));
    assert_eq!(messages[0]["raw"]["source"], json!("web-1"));

    // 第二条：显式 level 原样保留
    assert_eq!(messages[1]["level"], json!(6));
}

#[test]
fn level_keyword_priority_is_stable() {
    // 同一行里出现多个级别时，高优先级组先命中
    assert_eq!(
        normalize::extract_log_level("WARNING then ERROR happened").as_deref(),
        Some("ERROR")
    );
    assert_eq!(
        normalize::extract_log_level("debug output with a warning").as_deref(),
        Some("WARNING")
    );
    assert_eq!(
        normalize::extract_log_level("information only").as_deref(),
        Some("INFORMATION")
    );
}
