use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::error;

use crate::client::GraylogClient;
use crate::error::{GraylogError, Result};
use crate::model::{
    AggregationParams, AggregationRequest, AggregationType, SearchRequest, StreamSearchRequest,
};
use crate::normalize;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    code: i32,
    message: String,
}

pub async fn run_stdio(client: Arc<GraylogClient>) -> Result<()> {
    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = reader.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let req: RpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                write_response(
                    &mut stdout,
                    RpcResponse {
                        jsonrpc: "2.0",
                        id: Value::Null,
                        result: None,
                        error: Some(RpcError {
                            code: -32700,
                            message: format!("parse error: {e}"),
                        }),
                    },
                )
                .await?;
                continue;
            }
        };

        // Notifications carry no id and expect no reply.
        if req.id.is_null() && req.method.starts_with("notifications/") {
            continue;
        }

        let resp = process_request(&client, req).await;
        write_response(&mut stdout, resp).await?;
    }

    Ok(())
}

pub async fn process_request(client: &GraylogClient, req: RpcRequest) -> RpcResponse {
    match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "notifications/initialized" => RpcResponse {
            jsonrpc: "2.0",
            id: req.id,
            result: Some(Value::Bool(true)),
            error: None,
        },
        "tools/list" | "list_tools" => handle_list_tools(&req),
        "tools/call" => {
            #[derive(Deserialize)]
            struct CallParams {
                name: String,
                #[serde(default)]
                arguments: Value,
            }
            let params: CallParams = match serde_json::from_value(req.params.clone()) {
                Ok(p) => p,
                Err(e) => return rpc_error(&req, -32602, format!("invalid params: {e}")),
            };
            match dispatch_tool(client, &params.name, params.arguments).await {
                // MCP 标准要求工具结果包装成 content 块
                Ok(result) => {
                    let text = serde_json::to_string_pretty(&result)
                        .unwrap_or_else(|_| result.to_string());
                    RpcResponse {
                        jsonrpc: "2.0",
                        id: req.id,
                        result: Some(json!({
                            "content": [{ "type": "text", "text": text }]
                        })),
                        error: None,
                    }
                }
                Err(e) => tool_error(&req, e),
            }
        }
        method if TOOL_NAMES.contains(&method) => {
            let method = method.to_string();
            match dispatch_tool(client, &method, req.params.clone()).await {
                Ok(result) => RpcResponse {
                    jsonrpc: "2.0",
                    id: req.id,
                    result: Some(result),
                    error: None,
                },
                Err(e) => tool_error(&req, e),
            }
        }
        other => rpc_error(&req, -32601, format!("method not found: {other}")),
    }
}

const TOOL_NAMES: [&str; 11] = [
    "search_logs",
    "get_log_statistics",
    "list_streams",
    "get_stream_info",
    "search_stream_logs",
    "get_system_info",
    "test_connection",
    "get_error_logs",
    "get_log_count_by_level",
    "search_streams_by_name",
    "get_last_event_from_stream",
];

async fn dispatch_tool(client: &GraylogClient, name: &str, args: Value) -> Result<Value> {
    match name {
        "search_logs" => {
            let request: SearchRequest = decode_params(args)?;
            client.search_logs(&request).await
        }
        "get_log_statistics" => {
            let request: AggregationRequest = decode_params(args)?;
            let aggregation = AggregationParams {
                kind: request.aggregation_type,
                field: request.field,
                size: request.size,
                interval: request.interval,
            };
            client
                .get_log_statistics(&request.query, &request.time_range, &aggregation)
                .await
        }
        "list_streams" => {
            let streams = client.list_streams().await?;
            Ok(json!({ "streams": streams }))
        }
        "get_stream_info" => {
            #[derive(Deserialize)]
            struct Params {
                #[serde(default)]
                stream_id: String,
            }
            let params: Params = decode_params(args)?;
            client.get_stream_info(&params.stream_id).await
        }
        "search_stream_logs" => {
            let request: StreamSearchRequest = decode_params(args)?;
            let stream_id = request.stream_id.clone();
            client
                .search_stream_logs(&stream_id, request.into_search_request())
                .await
        }
        "get_system_info" => client.get_system_info().await,
        "test_connection" => {
            let connected = client.test_connection().await;
            Ok(json!({ "connected": connected, "endpoint": client.endpoint() }))
        }
        "get_error_logs" => {
            #[derive(Deserialize)]
            struct Params {
                #[serde(default = "default_time_range")]
                time_range: String,
                #[serde(default = "default_error_limit")]
                limit: u64,
            }
            fn default_error_limit() -> u64 {
                100
            }
            let params: Params = decode_params(args)?;
            let request = SearchRequest {
                query: "level:ERROR OR level:CRITICAL OR level:FATAL".to_string(),
                time_range: Some(params.time_range),
                fields: Some(vec![
                    "message".into(),
                    "level".into(),
                    "source".into(),
                    "timestamp".into(),
                ]),
                limit: params.limit,
                ..SearchRequest::default()
            };
            let raw = client.search_logs(&request).await?;
            // 错误日志走规整通道，输出稳定的形状
            Ok(serde_json::to_value(normalize::parse_search_response(&raw))
                .unwrap_or(Value::Null))
        }
        "get_log_count_by_level" => {
            #[derive(Deserialize)]
            struct Params {
                #[serde(default = "default_time_range")]
                time_range: String,
            }
            let params: Params = decode_params(args)?;
            let aggregation = AggregationParams {
                kind: AggregationType::Terms,
                field: "level".to_string(),
                size: 10,
                interval: None,
            };
            client
                .get_log_statistics("*", &params.time_range, &aggregation)
                .await
        }
        "search_streams_by_name" => {
            #[derive(Deserialize)]
            struct Params {
                #[serde(default)]
                stream_name: String,
            }
            let params: Params = decode_params(args)?;
            let streams = client.list_streams().await?;
            Ok(filter_streams_by_name(&streams, &params.stream_name))
        }
        "get_last_event_from_stream" => {
            #[derive(Deserialize)]
            struct Params {
                #[serde(default)]
                stream_id: String,
                #[serde(default = "default_time_range")]
                time_range: String,
            }
            let params: Params = decode_params(args)?;
            let request = SearchRequest {
                query: "*".to_string(),
                time_range: Some(params.time_range),
                limit: 1,
                stream_id: Some(params.stream_id.clone()),
                ..SearchRequest::default()
            };
            client.search_stream_logs(&params.stream_id, request).await
        }
        other => Err(GraylogError::InvalidRequest(format!(
            "unknown tool: {other}"
        ))),
    }
}

fn default_time_range() -> String {
    "1h".to_string()
}

fn decode_params<T: serde::de::DeserializeOwned>(args: Value) -> Result<T> {
    // 工具既接受对象参数也接受 null（全部走默认值）
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| GraylogError::InvalidRequest(format!("invalid params: {e}")))
}

/// 按标题做大小写不敏感的子串匹配。
pub fn filter_streams_by_name(streams: &[Value], stream_name: &str) -> Value {
    let needle = stream_name.to_lowercase();
    let matches: Vec<Value> = streams
        .iter()
        .filter(|stream| {
            stream
                .get("title")
                .and_then(Value::as_str)
                .map(|title| title.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
        .map(|stream| {
            json!({
                "id": stream.get("id").cloned().unwrap_or(Value::Null),
                "title": stream.get("title").cloned().unwrap_or(Value::Null),
                "description": stream.get("description").cloned().unwrap_or(Value::Null),
                "disabled": stream.get("disabled").cloned().unwrap_or(json!(false)),
            })
        })
        .collect();

    json!({
        "search_term": stream_name,
        "total_matches": matches.len(),
        "matches": matches,
    })
}

fn handle_initialize(req: &RpcRequest) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0",
        id: req.id.clone(),
        result: Some(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        })),
        error: None,
    }
}

async fn write_response(stdout: &mut tokio::io::Stdout, resp: RpcResponse) -> Result<()> {
    let line = serde_json::to_string(&resp).unwrap_or_else(|_| "{}".to_string());
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

fn rpc_error(req: &RpcRequest, code: i32, message: String) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0",
        id: req.id.clone(),
        result: None,
        error: Some(RpcError { code, message }),
    }
}

fn tool_error(req: &RpcRequest, err: GraylogError) -> RpcResponse {
    error!(method = %req.method, "tool call failed: {err}");
    let code = match err {
        GraylogError::InvalidRequest(_) => -32602,
        _ => -32002,
    };
    rpc_error(req, code, err.to_string())
}

fn handle_list_tools(req: &RpcRequest) -> RpcResponse {
    let search_properties = json!({
        "query": { "type": "string", "description": "Search query (Elasticsearch syntax)" },
        "time_range": { "type": ["string", "null"], "description": "Time range, e.g. '1h', '24h', '7d' or an ISO-8601 timestamp. Defaults to '1h'." },
        "fields": { "type": ["array", "null"], "items": { "type": "string" } },
        "limit": { "type": "integer", "default": 50 },
        "offset": { "type": "integer", "default": 0 },
        "sort": { "type": ["string", "null"] },
        "sort_direction": { "type": "string", "enum": ["asc", "desc"], "default": "desc" },
        "stream_id": { "type": ["string", "null"] },
        "decorate": { "type": ["boolean", "null"] },
        "filter": { "type": ["string", "null"] },
        "highlight": { "type": ["boolean", "null"] }
    });

    let tools = vec![
        json!({
            "name": "search_logs",
            "description": "Search logs in Graylog using Elasticsearch query syntax.",
            "inputSchema": {
                "type": "object",
                "required": ["query"],
                "properties": search_properties
            }
        }),
        json!({
            "name": "get_log_statistics",
            "description": "Run an aggregation (terms, date_histogram, cardinality, stats, min, max, avg, sum) over matching logs.",
            "inputSchema": {
                "type": "object",
                "required": ["query", "time_range", "aggregation_type", "field"],
                "properties": {
                    "query": { "type": "string" },
                    "time_range": { "type": "string" },
                    "aggregation_type": { "type": "string", "enum": ["terms", "date_histogram", "cardinality", "stats", "min", "max", "avg", "sum"] },
                    "field": { "type": "string" },
                    "size": { "type": "integer", "default": 10 },
                    "interval": { "type": ["string", "null"], "description": "Bucket interval, required for date_histogram" }
                }
            }
        }),
        json!({
            "name": "list_streams",
            "description": "List all available Graylog streams.",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        json!({
            "name": "get_stream_info",
            "description": "Get detailed information about a specific Graylog stream.",
            "inputSchema": {
                "type": "object",
                "required": ["stream_id"],
                "properties": { "stream_id": { "type": "string" } }
            }
        }),
        json!({
            "name": "search_stream_logs",
            "description": "Search logs within a specific Graylog stream. Empty query means '*'; limit is capped at 100.",
            "inputSchema": {
                "type": "object",
                "required": ["stream_id"],
                "properties": {
                    "stream_id": { "type": "string" },
                    "query": { "type": "string" },
                    "time_range": { "type": ["string", "null"] },
                    "fields": { "type": ["array", "null"], "items": { "type": "string" } },
                    "limit": { "type": "integer", "default": 50 }
                }
            }
        }),
        json!({
            "name": "get_system_info",
            "description": "Get Graylog system information and status.",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        json!({
            "name": "test_connection",
            "description": "Test connection to the Graylog server.",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        json!({
            "name": "get_error_logs",
            "description": "Get error-level logs (ERROR/CRITICAL/FATAL) from the given time range, normalized.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "time_range": { "type": "string", "default": "1h" },
                    "limit": { "type": "integer", "default": 100 }
                }
            }
        }),
        json!({
            "name": "get_log_count_by_level",
            "description": "Get log counts aggregated by log level.",
            "inputSchema": {
                "type": "object",
                "properties": { "time_range": { "type": "string", "default": "1h" } }
            }
        }),
        json!({
            "name": "search_streams_by_name",
            "description": "Find streams whose title contains the given name (case-insensitive).",
            "inputSchema": {
                "type": "object",
                "required": ["stream_name"],
                "properties": { "stream_name": { "type": "string" } }
            }
        }),
        json!({
            "name": "get_last_event_from_stream",
            "description": "Get the most recent log message from a specific stream.",
            "inputSchema": {
                "type": "object",
                "required": ["stream_id"],
                "properties": {
                    "stream_id": { "type": "string" },
                    "time_range": { "type": "string", "default": "1h" }
                }
            }
        }),
    ];

    RpcResponse {
        jsonrpc: "2.0",
        id: req.id.clone(),
        result: Some(json!({ "tools": tools })),
        error: None,
    }
}
