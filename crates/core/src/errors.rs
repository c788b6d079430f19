use thiserror::Error;

/// 采集管道错误类型定义
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("消息代理错误: {0}")]
    Broker(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("元数据查询错误: {0}")]
    Metadata(String),

    #[error("录音未找到: {recording_id}")]
    RecordingNotFound { recording_id: String },

    #[error("编曲生成错误: {0}")]
    Generation(String),

    #[error("持久化错误: {0}")]
    Persistence(String),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的Result类型
pub type IngestResult<T> = std::result::Result<T, IngestError>;

impl IngestError {
    pub fn broker<S: Into<String>>(msg: S) -> Self {
        Self::Broker(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn recording_not_found<S: Into<String>>(recording_id: S) -> Self {
        Self::RecordingNotFound {
            recording_id: recording_id.into(),
        }
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Serialization(err.to_string())
    }
}
