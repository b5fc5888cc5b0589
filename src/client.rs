//! Graylog API 客户端：单一的 perform_request 出口加上各工具操作。

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{GraylogError, Result};
use crate::model::{AggregationParams, SearchRequest};
use crate::query;

pub struct GraylogClient {
    http: reqwest::Client,
    base_url: String,
}

impl GraylogClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&config.auth_header())
            .map_err(|e| GraylogError::Config(format!("invalid credentials: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.graylog.timeout_secs))
            .danger_accept_invalid_certs(!config.graylog.verify_ssl)
            .build()?;

        Ok(Self {
            http,
            base_url: config.graylog.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    /// 所有操作共用的传输出口。401 被单独识别为认证失败。
    async fn perform_request(
        &self,
        method: Method,
        path: &str,
        params: Option<&Map<String, Value>>,
        body: Option<&Map<String, Value>>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "graylog request");

        let mut request = self.http.request(method, &url);
        if let Some(params) = params {
            let pairs = query::to_query_pairs(params);
            debug!(?pairs, "query params");
            request = request.query(&pairs);
        }
        if let Some(body) = body {
            debug!(body = %serde_json::Value::Object(body.clone()), "request body");
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(%status, "graylog response");

        if status == StatusCode::UNAUTHORIZED {
            let text = response.text().await.unwrap_or_default();
            error!("authentication failed - check your username and password: {text}");
            return Err(GraylogError::Unauthorized(text));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(%status, "graylog api request failed: {text}");
            return Err(GraylogError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(response.json().await?)
    }

    /// 搜索日志。GET 到通用相对搜索端点，原样返回后端 JSON。
    pub async fn search_logs(&self, request: &SearchRequest) -> Result<Value> {
        let params = query::build_search_params(request)?;
        self.perform_request(Method::GET, query::RELATIVE_SEARCH_PATH, Some(&params), None)
            .await
    }

    /// 聚合统计。聚合类型决定端点子资源。
    pub async fn get_log_statistics(
        &self,
        search_query: &str,
        time_range: &str,
        aggregation: &AggregationParams,
    ) -> Result<Value> {
        let body = query::build_aggregation_body(search_query, time_range, aggregation)?;
        let path = query::aggregation_path(aggregation);
        self.perform_request(Method::POST, &path, None, Some(&body)).await
    }

    /// 列出所有流。缺 `streams` 键时返回空列表。
    pub async fn list_streams(&self) -> Result<Vec<Value>> {
        let response = self
            .perform_request(Method::GET, "/api/streams", None, None)
            .await?;
        Ok(response
            .get("streams")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// 单个流的详细信息。
    pub async fn get_stream_info(&self, stream_id: &str) -> Result<Value> {
        if stream_id.trim().is_empty() {
            return Err(GraylogError::MissingStreamId);
        }
        let path = format!("/api/streams/{}", urlencoding::encode(stream_id));
        self.perform_request(Method::GET, &path, None, None).await
    }

    /// 限定在某个流内搜索：空查询改为通配符，limit 收敛到 [1, 100]。
    pub async fn search_stream_logs(
        &self,
        stream_id: &str,
        request: SearchRequest,
    ) -> Result<Value> {
        let scoped = query::scope_to_stream(stream_id, request)?;
        debug!(stream_id, query = %scoped.query, "searching stream");
        self.search_logs(&scoped).await
    }

    /// 系统信息，同时用作连通性探测。
    pub async fn get_system_info(&self) -> Result<Value> {
        self.perform_request(Method::GET, "/api/system", None, None).await
    }

    /// 连通性探测：唯一吞掉错误的操作，降级为布尔值。
    pub async fn test_connection(&self) -> bool {
        match self.get_system_info().await {
            Ok(_) => {
                info!("graylog connection successful");
                true
            }
            Err(GraylogError::Unauthorized(_)) => {
                error!("connection test failed: authentication rejected");
                false
            }
            Err(e) => {
                warn!("connection test failed: {e}");
                false
            }
        }
    }
}
