use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraylogError>;

#[derive(Debug, Error)]
pub enum GraylogError {
    #[error("query parameter is required")]
    MissingQuery,

    #[error("aggregation field is required")]
    MissingField,

    #[error("stream id is required")]
    MissingStreamId,

    #[error("valid time range is required")]
    InvalidTimeRange,

    #[error("authentication failed (401): {0}")]
    Unauthorized(String),

    #[error("graylog api error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("无效请求: {0}")]
    InvalidRequest(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
