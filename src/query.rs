//! 查询翻译层：把简化的请求参数翻译成 Graylog 原生的搜索/聚合参数。

use serde_json::{Map, Value};

use crate::error::{GraylogError, Result};
use crate::model::{AggregationParams, SearchRequest};
use crate::timerange;

/// Graylog 相对搜索端点的通用路径。
pub const RELATIVE_SEARCH_PATH: &str = "/api/search/universal/relative";

/// 流搜索的结果条数上限。
const STREAM_LIMIT_MAX: u64 = 100;
const AGGREGATION_SIZE_MAX: u64 = 100;

/// SearchRequest → GET 查询参数。
///
/// Sort is combined as `field:direction`, the time range defaults to "1h",
/// fields are comma-joined in order and a stream id becomes a single-element
/// `streams` list. Optional booleans appear only when explicitly set, so the
/// backend can tell "unset" from "false".
pub fn build_search_params(request: &SearchRequest) -> Result<Map<String, Value>> {
    if request.query.trim().is_empty() {
        return Err(GraylogError::MissingQuery);
    }

    let mut params = Map::new();
    params.insert("query".into(), Value::from(request.query.clone()));
    params.insert("limit".into(), Value::from(request.limit));
    params.insert("offset".into(), Value::from(request.offset));

    if let Some(sort) = &request.sort {
        params.insert(
            "sort".into(),
            Value::from(format!("{}:{}", sort, request.sort_direction)),
        );
    }

    let time_range = request.time_range.as_deref().unwrap_or("1h");
    if let Some(spec) = timerange::normalize(time_range) {
        params.insert("range".into(), spec.into_value());
    }

    if let Some(fields) = &request.fields {
        params.insert("fields".into(), Value::from(fields.join(",")));
    }

    // 后端期望流过滤是一个列表，即使只有一个流。
    if let Some(stream_id) = &request.stream_id {
        params.insert(
            "streams".into(),
            Value::Array(vec![Value::from(stream_id.clone())]),
        );
    }

    if let Some(decorate) = request.decorate {
        params.insert("decorate".into(), Value::from(decorate));
    }
    if let Some(filter) = &request.filter {
        params.insert("filter".into(), Value::from(filter.clone()));
    }
    if let Some(highlight) = request.highlight {
        params.insert("highlight".into(), Value::from(highlight));
    }

    Ok(params)
}

/// 流范围搜索的收紧规则：强制 stream_id、空查询改为通配符、limit 收敛到 [1, 100]。
pub fn scope_to_stream(stream_id: &str, mut request: SearchRequest) -> Result<SearchRequest> {
    if stream_id.trim().is_empty() {
        return Err(GraylogError::MissingStreamId);
    }

    request.stream_id = Some(stream_id.to_string());

    if request.query.trim().is_empty() {
        request.query = "*".to_string();
    }

    request.limit = request.limit.clamp(1, STREAM_LIMIT_MAX);

    Ok(request)
}

/// (query, time_range, AggregationParams) → POST 请求体。
///
/// The aggregation type is part of the endpoint address, not the body; all
/// types share this body shape.
pub fn build_aggregation_body(
    query: &str,
    time_range: &str,
    aggregation: &AggregationParams,
) -> Result<Map<String, Value>> {
    if query.trim().is_empty() {
        return Err(GraylogError::MissingQuery);
    }
    if aggregation.field.trim().is_empty() {
        return Err(GraylogError::MissingField);
    }

    let spec = timerange::normalize(time_range).ok_or(GraylogError::InvalidTimeRange)?;

    let mut body = Map::new();
    body.insert("query".into(), Value::from(query));
    body.insert("range".into(), spec.into_value());
    body.insert("field".into(), Value::from(aggregation.field.clone()));
    body.insert(
        "size".into(),
        Value::from(aggregation.size.clamp(1, AGGREGATION_SIZE_MAX)),
    );

    if let Some(interval) = &aggregation.interval {
        body.insert("interval".into(), Value::from(interval.clone()));
    }

    Ok(body)
}

/// 聚合端点：相对搜索路径 + 聚合类型后缀。
pub fn aggregation_path(aggregation: &AggregationParams) -> String {
    format!("{}/{}", RELATIVE_SEARCH_PATH, aggregation.kind.as_str())
}

/// 把参数表压平成 GET 查询键值对。数组展开为重复的键（requests 语义）。
pub fn to_query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len());
    for (key, value) in params {
        match value {
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), scalar_string(item)));
                }
            }
            other => pairs.push((key.clone(), scalar_string(other))),
        }
    }
    pairs
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            ..SearchRequest::default()
        }
    }

    #[test]
    fn empty_query_is_rejected() {
        assert!(matches!(
            build_search_params(&request("")),
            Err(GraylogError::MissingQuery)
        ));
        assert!(matches!(
            build_search_params(&request("   ")),
            Err(GraylogError::MissingQuery)
        ));
    }

    #[test]
    fn defaults_produce_one_hour_range() {
        let params = build_search_params(&request("*")).unwrap();
        assert_eq!(params["query"], json!("*"));
        assert_eq!(params["limit"], json!(50));
        assert_eq!(params["offset"], json!(0));
        assert_eq!(params["range"], json!(3600));
        assert!(!params.contains_key("sort"));
        assert!(!params.contains_key("fields"));
        assert!(!params.contains_key("streams"));
    }

    #[test]
    fn sort_combines_field_and_direction() {
        let mut req = request("*");
        req.sort = Some("timestamp".into());
        let params = build_search_params(&req).unwrap();
        assert_eq!(params["sort"], json!("timestamp:desc"));

        req.sort_direction = crate::model::SortDirection::Asc;
        let params = build_search_params(&req).unwrap();
        assert_eq!(params["sort"], json!("timestamp:asc"));
    }

    #[test]
    fn fields_are_comma_joined_in_order() {
        let mut req = request("*");
        req.fields = Some(vec!["message".into(), "level".into(), "source".into()]);
        let params = build_search_params(&req).unwrap();
        assert_eq!(params["fields"], json!("message,level,source"));
    }

    #[test]
    fn stream_id_becomes_single_element_list() {
        let mut req = request("*");
        req.stream_id = Some("S1".into());
        let params = build_search_params(&req).unwrap();
        assert_eq!(params["streams"], json!(["S1"]));
    }

    #[test]
    fn absolute_time_range_passes_through() {
        let mut req = request("*");
        req.time_range = Some("2024-01-01T00:00:00Z".into());
        let params = build_search_params(&req).unwrap();
        assert_eq!(params["range"], json!("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn tristate_booleans_are_omitted_when_unset() {
        let params = build_search_params(&request("*")).unwrap();
        assert!(!params.contains_key("decorate"));
        assert!(!params.contains_key("highlight"));
        assert!(!params.contains_key("filter"));

        let mut req = request("*");
        req.decorate = Some(false);
        req.highlight = Some(true);
        req.filter = Some("source:nginx".into());
        let params = build_search_params(&req).unwrap();
        assert_eq!(params["decorate"], json!(false));
        assert_eq!(params["highlight"], json!(true));
        assert_eq!(params["filter"], json!("source:nginx"));
    }

    #[test]
    fn stream_scoping_rejects_empty_id() {
        assert!(matches!(
            scope_to_stream("", request("*")),
            Err(GraylogError::MissingStreamId)
        ));
    }

    #[test]
    fn stream_scoping_rewrites_blank_query_to_wildcard() {
        let scoped = scope_to_stream("S1", request("")).unwrap();
        assert_eq!(scoped.query, "*");
        let scoped = scope_to_stream("S1", request("   ")).unwrap();
        assert_eq!(scoped.query, "*");
        let scoped = scope_to_stream("S1", request("level:ERROR")).unwrap();
        assert_eq!(scoped.query, "level:ERROR");
    }

    #[test]
    fn stream_scoping_clamps_limit() {
        let mut req = request("*");
        req.limit = 0;
        assert_eq!(scope_to_stream("S1", req).unwrap().limit, 1);

        let mut req = request("*");
        req.limit = 500;
        assert_eq!(scope_to_stream("S1", req).unwrap().limit, 100);

        let mut req = request("*");
        req.limit = 30;
        assert_eq!(scope_to_stream("S1", req).unwrap().limit, 30);
    }

    #[test]
    fn stream_scoping_overrides_existing_stream_id() {
        let mut req = request("*");
        req.stream_id = Some("other".into());
        let scoped = scope_to_stream("S1", req).unwrap();
        assert_eq!(scoped.stream_id.as_deref(), Some("S1"));
    }

    #[test]
    fn aggregation_rejections_precede_everything() {
        let agg = AggregationParams {
            kind: crate::model::AggregationType::Terms,
            field: "source".into(),
            size: 10,
            interval: None,
        };
        assert!(matches!(
            build_aggregation_body("", "1h", &agg),
            Err(GraylogError::MissingQuery)
        ));

        let empty_field = AggregationParams {
            field: String::new(),
            ..agg.clone()
        };
        assert!(matches!(
            build_aggregation_body("*", "1h", &empty_field),
            Err(GraylogError::MissingField)
        ));

        assert!(matches!(
            build_aggregation_body("*", "", &agg),
            Err(GraylogError::InvalidTimeRange)
        ));
    }

    #[test]
    fn aggregation_body_shape() {
        let agg = AggregationParams {
            kind: crate::model::AggregationType::DateHistogram,
            field: "timestamp".into(),
            size: 500,
            interval: Some("1h".into()),
        };
        let body = build_aggregation_body("level:ERROR", "24h", &agg).unwrap();
        assert_eq!(body["query"], json!("level:ERROR"));
        assert_eq!(body["range"], json!(86400));
        assert_eq!(body["field"], json!("timestamp"));
        assert_eq!(body["size"], json!(100)); // clamped
        assert_eq!(body["interval"], json!("1h"));

        assert_eq!(
            aggregation_path(&agg),
            "/api/search/universal/relative/date_histogram"
        );
    }

    #[test]
    fn query_pairs_expand_arrays_into_repeated_keys() {
        let mut req = request("*");
        req.stream_id = Some("S1".into());
        req.decorate = Some(true);
        let params = build_search_params(&req).unwrap();
        let pairs = to_query_pairs(&params);

        assert!(pairs.contains(&("streams".into(), "S1".into())));
        assert!(pairs.contains(&("decorate".into(), "true".into())));
        assert!(pairs.contains(&("limit".into(), "50".into())));
        assert!(pairs.contains(&("range".into(), "3600".into())));
    }
}
