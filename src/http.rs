use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use crate::client::GraylogClient;
use crate::config::Config;
use crate::error::{GraylogError, Result};

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<GraylogClient>,
    pub config: Config,
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health_check": "/health_check",
            "mcp_server": "Available via MCP protocol (stdio)"
        }
    }))
}

/// 健康检查：探测降级为布尔值，所以这里总是 200。
async fn health_check_handler(State(state): State<AppState>) -> impl IntoResponse {
    let connected = state.client.test_connection().await;
    Json(json!({
        "status": if connected { "healthy" } else { "unhealthy" },
        "graylog_connected": connected,
        "graylog_endpoint": state.config.graylog.endpoint,
        "server_config": {
            "host": state.config.server.http_addr,
            "port": state.config.server.http_port
        }
    }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health_check", get(health_check_handler))
        .with_state(state)
}

pub async fn serve_http(config: Config) -> Result<()> {
    let client = Arc::new(GraylogClient::new(&config)?);
    let addr = format!("{}:{}", config.server.http_addr, config.server.http_port);
    let router = build_router(AppState { client, config });

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| GraylogError::Config(format!("bind {addr} failed: {e}")))?;
    tracing::info!("HTTP server listening on http://{addr}");
    axum::serve(listener, router).await.map_err(|e| e.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        let config = Config::default();
        AppState {
            client: Arc::new(GraylogClient::new(&config).unwrap()),
            config,
        }
    }

    #[tokio::test]
    async fn root_reports_server_info() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let info: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(info["endpoints"]["health_check"], "/health_check");
        assert!(info["name"].is_string());
    }
}
