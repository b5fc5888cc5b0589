use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 日志搜索请求。未显式设置的布尔参数保持 None，上线时整个键被省略。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub time_range: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub sort_direction: SortDirection,
    #[serde(default)]
    pub stream_id: Option<String>,
    #[serde(default)]
    pub decorate: Option<bool>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub highlight: Option<bool>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            time_range: None,
            fields: None,
            limit: default_limit(),
            offset: 0,
            sort: None,
            sort_direction: SortDirection::default(),
            stream_id: None,
            decorate: None,
            filter: None,
            highlight: None,
        }
    }
}

fn default_limit() -> u64 {
    50
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

/// 聚合类型决定端点子资源，请求体的形状对所有类型一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationType {
    Terms,
    DateHistogram,
    Cardinality,
    Stats,
    Min,
    Max,
    Avg,
    Sum,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Terms => "terms",
            AggregationType::DateHistogram => "date_histogram",
            AggregationType::Cardinality => "cardinality",
            AggregationType::Stats => "stats",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
            AggregationType::Avg => "avg",
            AggregationType::Sum => "sum",
        }
    }
}

/// Aggregation shape handed to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationParams {
    #[serde(rename = "type")]
    pub kind: AggregationType,
    #[serde(default)]
    pub field: String,
    #[serde(default = "default_size")]
    pub size: u64,
    #[serde(default)]
    pub interval: Option<String>,
}

fn default_size() -> u64 {
    10
}

/// `get_log_statistics` 工具的入参。
#[derive(Debug, Clone, Deserialize)]
pub struct AggregationRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub time_range: String,
    pub aggregation_type: AggregationType,
    #[serde(default)]
    pub field: String,
    #[serde(default = "default_size")]
    pub size: u64,
    #[serde(default)]
    pub interval: Option<String>,
}

/// `search_stream_logs` 工具的入参（流 id 必填，其余同搜索请求）。
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSearchRequest {
    #[serde(default)]
    pub stream_id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub time_range: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl StreamSearchRequest {
    pub fn into_search_request(self) -> SearchRequest {
        SearchRequest {
            query: self.query,
            time_range: self.time_range,
            fields: self.fields,
            limit: self.limit,
            stream_id: Some(self.stream_id),
            ..SearchRequest::default()
        }
    }
}

/// 规整后的搜索响应：总数、耗时、展开的消息列表和查询元数据。
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedResponse {
    pub total_results: u64,
    pub execution_time: f64,
    pub messages: Vec<Value>,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub query: String,
    pub time_range: Value,
    pub fields: Value,
}
