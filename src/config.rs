use std::env;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{GraylogError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    #[default]
    Stdio,
    Http,
    Both,
}

/// Graylog 连接配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraylogConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub verify_ssl: bool,
    pub timeout_secs: u64,
}

impl Default for GraylogConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            verify_ssl: true,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub mode: ServerMode,
    pub http_addr: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: ServerMode::Stdio,
            http_addr: "0.0.0.0".to_string(),
            http_port: 8000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graylog: GraylogConfig,
    pub server: ServerConfig,
}

impl Config {
    /// 从 YAML/JSON 文件加载（按扩展名判断），再叠加环境变量。
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&raw)
                .map_err(|e| GraylogError::Config(format!("{}: {e}", path.display())))?,
            _ => serde_yaml::from_str(&raw)
                .map_err(|e| GraylogError::Config(format!("{}: {e}", path.display())))?,
        };
        config.apply_env();
        Ok(config)
    }

    /// 仅从环境变量构造（没有配置文件的场景）。
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// `GRAYLOG_*` / `MCP_SERVER_*` 环境变量覆盖文件配置。
    fn apply_env(&mut self) {
        if let Ok(endpoint) = env::var("GRAYLOG_ENDPOINT") {
            self.graylog.endpoint = endpoint;
        }
        if let Ok(username) = env::var("GRAYLOG_USERNAME") {
            self.graylog.username = username;
        }
        if let Ok(password) = env::var("GRAYLOG_PASSWORD") {
            self.graylog.password = password;
        }
        if let Ok(verify) = env::var("GRAYLOG_VERIFY_SSL") {
            if let Ok(parsed) = verify.parse() {
                self.graylog.verify_ssl = parsed;
            }
        }
        if let Ok(timeout) = env::var("GRAYLOG_TIMEOUT") {
            if let Ok(parsed) = timeout.parse() {
                self.graylog.timeout_secs = parsed;
            }
        }
        if let Ok(mode) = env::var("MCP_SERVER_MODE") {
            match mode.to_lowercase().as_str() {
                "stdio" => self.server.mode = ServerMode::Stdio,
                "http" => self.server.mode = ServerMode::Http,
                "both" => self.server.mode = ServerMode::Both,
                _ => {}
            }
        }
        if let Ok(addr) = env::var("MCP_SERVER_HOST") {
            self.server.http_addr = addr;
        }
        if let Ok(port) = env::var("MCP_SERVER_PORT") {
            if let Ok(parsed) = port.parse() {
                self.server.http_port = parsed;
            }
        }
    }

    /// Basic 认证头。
    pub fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.graylog.username, self.graylog.password);
        format!("Basic {}", BASE64.encode(credentials))
    }

    /// 默认的 admin/admin@localhost 配置只适合本地试用。
    pub fn is_default_credentials(&self) -> bool {
        self.graylog.username == "admin"
            && self.graylog.password == "admin"
            && self.graylog.endpoint == "http://localhost:9000"
    }
}
