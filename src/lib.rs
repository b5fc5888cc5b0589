//! Graylog 日志查询 MCP 服务核心库。
//! 查询翻译与响应规整是纯函数，传输与分发只做薄封装。

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod model;
pub mod normalize;
pub mod query;
pub mod timerange;
