use std::env;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use graylog_search_mcp::client::GraylogClient;
use graylog_search_mcp::config::{Config, ServerMode};
use graylog_search_mcp::error::Result;
use graylog_search_mcp::http::serve_http;
use graylog_search_mcp::mcp::run_stdio;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout 留给 stdio RPC 通道，日志全部走 stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => Config::load_from_path(std::path::Path::new(path))?,
        None => Config::from_env(),
    };

    tracing::info!("graylog endpoint: {}", config.graylog.endpoint);
    if config.is_default_credentials() {
        tracing::warn!("using default configuration - set GRAYLOG_* environment variables for production");
    }

    let client = Arc::new(GraylogClient::new(&config)?);

    // 启动时探测一次连通性，失败只告警不退出
    if client.test_connection().await {
        tracing::info!("successfully connected to graylog");
    } else {
        tracing::warn!("failed to connect to graylog - check configuration");
    }

    match config.server.mode {
        ServerMode::Http => serve_http(config).await?,
        ServerMode::Stdio => run_stdio(client).await?,
        ServerMode::Both => {
            let stdio_client = client.clone();
            let http_task = tokio::spawn(async move { serve_http(config).await });
            let stdio_task = tokio::spawn(async move { run_stdio(stdio_client).await });
            http_task.await.expect("http task panicked")?;
            stdio_task.await.expect("stdio task panicked")?;
        }
    }

    Ok(())
}
